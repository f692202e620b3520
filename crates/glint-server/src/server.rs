use crate::auth::{MojangResolver, OfflineResolver, ProfileResolver, ServerKeys};
use crate::config::ServerConfig;
use crate::connection::handle_connection;
use crate::context::ServerContext;
use crate::dispatch::{spawn_main_thread, AsyncPool};
use crate::game::GameState;
use crate::handlers::handler_table;
use glint_common::Result;
use glint_logger::log;
use glint_logger::LogSeverity::{Error, Info};
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::runtime::Handle;

/// A bound listener plus everything connections share.
pub struct Server {
    listener: TcpListener,
    context: Arc<ServerContext>,
}

impl Server {
    /// Binds `config.bind` and starts the main thread. Must run inside a tokio runtime.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(&config.bind).await?;
        let context = Arc::new(build_context(config)?);
        Ok(Self { listener, context })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn context(&self) -> Arc<ServerContext> {
        self.context.clone()
    }

    /// Accepts connections until the listener fails.
    pub async fn serve(self) -> Result<()> {
        log(format!("Listening on {}", self.listener.local_addr()?), Info);
        let mut next_id: u64 = 1;
        loop {
            let (socket, _) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    log(format!("Failed to accept connection: {}", e), Error);
                    continue;
                }
            };
            tokio::spawn(handle_connection(socket, next_id, self.context.clone()));
            next_id = next_id.wrapping_add(1);
        }
    }
}

fn build_context(config: ServerConfig) -> Result<ServerContext> {
    let (keys, resolver): (Option<ServerKeys>, Arc<dyn ProfileResolver>) = if config.online_mode {
        log("Generating 1024-bit RSA key pair".to_owned(), Info);
        (
            Some(ServerKeys::generate()?),
            Arc::new(MojangResolver::new(config.session_server.clone())),
        )
    } else {
        (None, Arc::new(OfflineResolver))
    };

    let online_players = Arc::new(AtomicUsize::new(0));
    let main = spawn_main_thread(
        GameState::new(online_players.clone()).with_max_players(config.max_players),
    )?;
    let pool = AsyncPool::new(config.async_workers, Handle::current());

    Ok(ServerContext {
        config,
        keys,
        resolver,
        handlers: handler_table(),
        main,
        pool,
        online_players,
    })
}

/// Binds and serves until a fatal error.
pub async fn run(config: ServerConfig) -> Result<()> {
    Server::bind(config).await?.serve().await
}
