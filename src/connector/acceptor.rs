use std::net::TcpListener;
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::connector::poller::PollerHandle;

const INIT_ERR_DELAY_MS: u64 = 50;
const MAX_ERR_DELAY_MS: u64 = 1_600;

/// Sleep abstraction so the accept-error backoff is testable without real
/// delays.
pub trait Sleeper: Send {
    fn sleep(&self, duration: Duration);
}

/// Production sleeper, backed by `thread::sleep`.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Exponential backoff for consecutive accept failures: 50ms doubling up to
/// 1.6s, reset on the first successful accept.
pub struct Backoff {
    delay_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

impl Backoff {
    pub fn new() -> Self {
        Self { delay_ms: 0 }
    }

    /// Advances to the next delay in the sequence.
    pub fn next(&mut self) -> Duration {
        self.delay_ms = if self.delay_ms == 0 {
            INIT_ERR_DELAY_MS
        } else {
            (self.delay_ms * 2).min(MAX_ERR_DELAY_MS)
        };
        Duration::from_millis(self.delay_ms)
    }

    pub fn reset(&mut self) {
        self.delay_ms = 0;
    }
}

/// Dedicated accept thread.
///
/// Blocks on `accept` in a loop; each accepted socket is switched to
/// non-blocking mode, gets `TCP_NODELAY`, and is handed to the poller for
/// registration. Transient accept errors (file descriptor exhaustion and
/// the like) back off exponentially instead of spinning.
///
/// Stopping: [`Acceptor::shutdown_listener`] is called on the listener's fd
/// from another thread, which makes the blocked `accept` return an error;
/// the loop then observes the cleared running flag and exits.
pub struct Acceptor {
    listener: TcpListener,
    poller: PollerHandle,
    running: Arc<AtomicBool>,
    sleeper: Box<dyn Sleeper>,
}

impl Acceptor {
    pub fn new(
        listener: TcpListener,
        poller: PollerHandle,
        running: Arc<AtomicBool>,
        sleeper: Box<dyn Sleeper>,
    ) -> Self {
        Self {
            listener,
            poller,
            running,
            sleeper,
        }
    }

    /// Unblocks a pending `accept` so a stopping acceptor can observe its
    /// flag. Safe to call from any thread.
    pub fn shutdown_listener(listener: &TcpListener) {
        unsafe {
            libc::shutdown(listener.as_raw_fd(), libc::SHUT_RDWR);
        }
    }

    pub fn run(mut self) {
        let mut backoff = Backoff::new();
        let mut delay: Option<Duration> = None;

        while self.running.load(Ordering::Acquire) {
            if let Some(delay) = delay.take() {
                self.sleeper.sleep(delay);
            }

            match self.listener.accept() {
                Ok((stream, peer)) => {
                    backoff.reset();
                    if let Err(err) = self.hand_off(stream, peer) {
                        info!("Dropping connection from {}: {}", peer, err);
                    }
                }
                Err(err) => {
                    if !self.running.load(Ordering::Acquire) {
                        break;
                    }
                    info!("Accept failed: {}", err);
                    delay = Some(backoff.next());
                }
            }
        }
        info!("Acceptor stopped");
    }

    fn hand_off(
        &mut self,
        stream: std::net::TcpStream,
        peer: std::net::SocketAddr,
    ) -> std::io::Result<()> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        let stream = mio::net::TcpStream::from_std(stream);
        debug!("Accepted connection from {}", peer);
        self.poller.register(stream, peer);
        Ok(())
    }
}
