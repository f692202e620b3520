use crate::context::NetworkContext;
use crate::game::GameState;
use crate::session::Session;
use futures::future::BoxFuture;
use futures::FutureExt;
use glint_common::{GlintError, Result};
use glint_logger::log;
use glint_logger::LogSeverity::{Debug, Error, Info, Warning};
use glint_protocol::{Packet, PacketKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Semaphore};

pub type IoHandler = fn(&NetworkContext, Packet) -> Result<()>;
pub type MainHandler = fn(&NetworkContext, &mut GameState, Packet) -> Result<()>;
pub type AsyncHandler = fn(NetworkContext, Packet) -> BoxFuture<'static, Result<()>>;

pub type MainJob = Box<dyn FnOnce(&mut GameState) + Send>;
pub type AsyncJob = BoxFuture<'static, ()>;

/// Where a handler runs. Fixed when the handler is registered.
#[derive(Clone, Copy)]
pub enum Handler {
    /// Inline on the connection task. Must not block.
    Io(IoHandler),
    /// On the game thread, in arrival order.
    Main(MainHandler),
    /// On the bounded async pool, in arrival order per connection.
    Async(AsyncHandler),
}

#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<PacketKind, Handler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a game-logic handler. This is the default affinity.
    pub fn register(&mut self, kind: PacketKind, handler: MainHandler) -> &mut Self {
        self.handlers.insert(kind, Handler::Main(handler));
        self
    }

    /// Registers a handler that is safe to run on the connection task.
    pub fn register_io(&mut self, kind: PacketKind, handler: IoHandler) -> &mut Self {
        self.handlers.insert(kind, Handler::Io(handler));
        self
    }

    pub fn register_async(&mut self, kind: PacketKind, handler: AsyncHandler) -> &mut Self {
        self.handlers.insert(kind, Handler::Async(handler));
        self
    }

    pub fn get(&self, kind: PacketKind) -> Option<Handler> {
        self.handlers.get(&kind).copied()
    }
}

/// Logs a handler failure and closes the session with the matching reason.
pub fn fail(context: &NetworkContext, error: &GlintError) {
    log(format!("Closing {}: {}", context.session, error), Error);
    context.session.close_with(error);
}

/// Routes a decoded packet to its handler's execution context.
pub fn dispatch(context: &NetworkContext, packet: Packet) -> Result<()> {
    let kind = packet.kind();
    let handler = match context.server.handlers.get(kind) {
        Some(handler) => handler,
        None => {
            log(format!("No handler for {:?} from {}", kind, context.session), Warning);
            return Ok(());
        }
    };

    match handler {
        Handler::Io(handle) => handle(context, packet),
        Handler::Main(handle) => {
            let job_context = context.clone();
            context.server.main.submit(Box::new(move |game| {
                if job_context.session.is_closed() {
                    return;
                }
                if let Err(e) = handle(&job_context, game, packet) {
                    fail(&job_context, &e);
                }
            }))
        }
        Handler::Async(handle) => {
            let job_context = context.clone();
            context.server.pool.submit(
                &context.session,
                async move {
                    if job_context.session.is_closed() {
                        return;
                    }
                    if let Err(e) = handle(job_context.clone(), packet).await {
                        fail(&job_context, &e);
                    }
                }
                .boxed(),
            )
        }
    }
}

/// Sender side of the game thread's queue.
#[derive(Clone)]
pub struct MainHandle {
    sender: mpsc::UnboundedSender<MainJob>,
}

impl MainHandle {
    pub fn submit(&self, job: MainJob) -> Result<()> {
        self.sender
            .send(job)
            .map_err(|_| GlintError::Server("main thread has stopped".to_owned()))
    }
}

/// Starts the `glint-main` thread. It owns `game` and runs queued jobs one at a
/// time until every [`MainHandle`] is dropped.
pub fn spawn_main_thread(mut game: GameState) -> Result<MainHandle> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<MainJob>();
    std::thread::Builder::new()
        .name("glint-main".to_owned())
        .spawn(move || {
            log("Main thread started".to_owned(), Debug);
            while let Some(job) = receiver.blocking_recv() {
                job(&mut game);
            }
            log("Main thread stopped".to_owned(), Info);
        })?;
    Ok(MainHandle { sender })
}

/// Bounded pool for slow work. Each session gets one lane so its jobs stay in order.
#[derive(Clone)]
pub struct AsyncPool {
    permits: Arc<Semaphore>,
    runtime: Handle,
}

impl AsyncPool {
    pub fn new(workers: usize, runtime: Handle) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            runtime,
        }
    }

    pub fn submit(&self, session: &Session, job: AsyncJob) -> Result<()> {
        session
            .lane
            .get_or_init(|| self.spawn_lane())
            .send(job)
            .map_err(|_| GlintError::Server(format!("async lane of session {} stopped", session.id())))
    }

    fn spawn_lane(&self) -> mpsc::UnboundedSender<AsyncJob> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<AsyncJob>();
        let permits = self.permits.clone();
        self.runtime.spawn(async move {
            while let Some(job) = receiver.recv().await {
                let _permit = match permits.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                job.await;
            }
        });
        sender
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn session(id: u64) -> Session {
        Session::new(id, "127.0.0.1:1".parse().unwrap()).0
    }

    #[test]
    fn test_main_thread_runs_jobs_in_order() {
        let main = spawn_main_thread(GameState::new(Arc::new(AtomicUsize::new(0)))).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = std::sync::mpsc::channel();

        for index in 0..100 {
            let seen = seen.clone();
            main.submit(Box::new(move |_game| {
                assert_eq!(std::thread::current().name(), Some("glint-main"));
                seen.lock().unwrap().push(index);
            }))
            .unwrap();
        }
        main.submit(Box::new(move |_game| done_tx.send(()).unwrap())).unwrap();
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(*seen.lock().unwrap(), (0..100).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_async_lane_keeps_per_session_order() {
        let pool = AsyncPool::new(2, Handle::current());
        let sessions = [session(1), session(2), session(3)];
        let order = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();

        for step in 0..10u64 {
            for session in &sessions {
                let order = order.clone();
                let done_tx = done_tx.clone();
                let id = session.id();
                pool.submit(
                    session,
                    async move {
                        // later jobs are faster, so ordering comes from the lane
                        tokio::time::sleep(Duration::from_millis(10 - step)).await;
                        order.lock().unwrap().push((id, step));
                        let _ = done_tx.send(());
                    }
                    .boxed(),
                )
                .unwrap();
            }
        }
        for _ in 0..30 {
            done_rx.recv().await.unwrap();
        }

        let order = order.lock().unwrap();
        for id in 1..=3 {
            let steps: Vec<u64> = order
                .iter()
                .filter(|(session, _)| *session == id)
                .map(|(_, step)| *step)
                .collect();
            assert_eq!(steps, (0..10).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn test_pool_bounds_concurrency() {
        let pool = AsyncPool::new(2, Handle::current());
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let sessions: Vec<Session> = (0..6).map(session).collect();

        for session in &sessions {
            let running = running.clone();
            let peak = peak.clone();
            let done_tx = done_tx.clone();
            pool.submit(
                session,
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    let _ = done_tx.send(());
                }
                .boxed(),
            )
            .unwrap();
        }
        for _ in 0..6 {
            done_rx.recv().await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
