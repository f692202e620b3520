use crate::auth::{ProfileResolver, ServerKeys};
use crate::config::ServerConfig;
use crate::dispatch::{AsyncPool, HandlerTable, MainHandle};
use crate::session::Session;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Process-wide state every handler can reach.
pub struct ServerContext {
    pub config: ServerConfig,
    /// Present in online mode only
    pub keys: Option<ServerKeys>,
    pub resolver: Arc<dyn ProfileResolver>,
    pub handlers: HandlerTable,
    pub main: MainHandle,
    pub pool: AsyncPool,
    pub online_players: Arc<AtomicUsize>,
}

impl ServerContext {
    pub fn online_count(&self) -> usize {
        self.online_players.load(Ordering::Relaxed)
    }
}

/// What a handler receives alongside the packet.
#[derive(Clone)]
pub struct NetworkContext {
    pub session: Arc<Session>,
    pub server: Arc<ServerContext>,
}

impl NetworkContext {
    pub fn new(session: Arc<Session>, server: Arc<ServerContext>) -> Self {
        Self { session, server }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::auth::OfflineResolver;
    use crate::dispatch::spawn_main_thread;
    use crate::game::GameState;
    use crate::handlers::handler_table;
    use crate::session::Outbound;
    use tokio::runtime::Handle;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// An offline server context with one fresh session. Needs a tokio runtime.
    pub fn network_context(config: ServerConfig) -> (NetworkContext, UnboundedReceiver<Outbound>) {
        let online_players = Arc::new(AtomicUsize::new(0));
        let server = ServerContext {
            pool: AsyncPool::new(config.async_workers, Handle::current()),
            config,
            keys: None,
            resolver: Arc::new(OfflineResolver),
            handlers: handler_table(),
            main: spawn_main_thread(GameState::new(online_players.clone())).unwrap(),
            online_players,
        };
        let (session, outbound) = Session::new(7, "127.0.0.1:50000".parse().unwrap());
        (NetworkContext::new(Arc::new(session), Arc::new(server)), outbound)
    }
}
