use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Context as _;
use tracing::info;

use crate::config::ServerConfig;
use crate::connector::acceptor::{Acceptor, ThreadSleeper};
use crate::connector::adapter::Adapter;
use crate::connector::poller::{Poller, PollerHandle};
use crate::connector::processor;
use crate::connector::worker::WorkerPool;
use crate::connector::Lifecycle;
use crate::container::context::Context;
use crate::http::session::SessionStore;

struct Runtime {
    acceptor_thread: JoinHandle<()>,
    poller_thread: JoinHandle<()>,
    poller_handle: PollerHandle,
    pool: WorkerPool,
    /// Clone of the listener, kept to unblock the acceptor on stop.
    stop_listener: TcpListener,
}

/// The HTTP endpoint: binds the listener and runs the acceptor, poller and
/// worker threads.
///
/// Thread layout at runtime:
///
/// ```text
///   acceptor ──register──▶ poller ──readable──▶ worker pool
///       ▲                    ▲                      │
///       │                    └──── switch/close ────┘
///   TcpListener
/// ```
pub struct HttpConnector {
    config: ServerConfig,
    context: Arc<Context>,
    store: Arc<SessionStore>,
    listener: Option<TcpListener>,
    local_addr: Option<SocketAddr>,
    running: Arc<AtomicBool>,
    runtime: Option<Runtime>,
}

impl HttpConnector {
    pub fn new(config: ServerConfig, context: Arc<Context>, store: Arc<SessionStore>) -> Self {
        Self {
            config,
            context,
            store,
            listener: None,
            local_addr: None,
            running: Arc::new(AtomicBool::new(false)),
            runtime: None,
        }
    }

    /// The bound address, available after `init`. With a port-zero
    /// configuration this is where the kernel actually put us.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl Lifecycle for HttpConnector {
    /// Binds the listener without starting any threads.
    fn init(&mut self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .with_context(|| format!("failed to bind {}", self.config.listen_addr))?;
        self.local_addr = Some(listener.local_addr()?);
        self.listener = Some(listener);
        Ok(())
    }

    /// Spawns the poller, worker pool and acceptor, in that order.
    fn start(&mut self) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .context("endpoint not initialized")?;
        let stop_listener = listener.try_clone()?;
        self.running.store(true, Ordering::Release);

        let (poller, poller_handle) = Poller::new(self.config.read_buffer_size)?;
        let pool = WorkerPool::new(self.config.workers)?;

        let adapter = Arc::new(Adapter::new(self.context.clone(), self.store.clone()));
        let workers = pool.handle();
        let dispatch_handle = poller_handle.clone();
        let poller_thread = thread::Builder::new().name("poller".to_string()).spawn(
            move || {
                poller.run(move |conn, token| {
                    let adapter = adapter.clone();
                    let poller = dispatch_handle.clone();
                    workers.execute(move || processor::process(conn, token, &adapter, &poller));
                });
            },
        )?;

        let acceptor = Acceptor::new(
            listener,
            poller_handle.clone(),
            self.running.clone(),
            Box::new(ThreadSleeper),
        );
        let acceptor_thread = thread::Builder::new()
            .name("acceptor".to_string())
            .spawn(move || acceptor.run())?;

        if let Some(addr) = self.local_addr {
            info!("Listening on {}", addr);
        }

        self.runtime = Some(Runtime {
            acceptor_thread,
            poller_thread,
            poller_handle,
            pool,
            stop_listener,
        });
        Ok(())
    }

    /// Stops accepting, closes every connection, then drains the workers.
    fn stop(&mut self) -> anyhow::Result<()> {
        let runtime = match self.runtime.take() {
            Some(runtime) => runtime,
            None => return Ok(()),
        };

        self.running.store(false, Ordering::Release);
        Acceptor::shutdown_listener(&runtime.stop_listener);
        let _ = runtime.acceptor_thread.join();

        // The poller drops its worker handle when it exits, which lets the
        // pool's channel close.
        runtime.poller_handle.shutdown();
        let _ = runtime.poller_thread.join();

        runtime.pool.shutdown();
        info!("Endpoint stopped");
        Ok(())
    }
}
