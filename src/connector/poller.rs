use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use mio::net::TcpStream;
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token, Waker};
use slab::Slab;
use tracing::{debug, error, info, warn};

use crate::connector::connection::{Connection, Drain};

/// Token reserved for the cross-thread waker; connection tokens are slab
/// keys and never reach this value.
const WAKER_TOKEN: Token = Token(usize::MAX);

/// Control messages sent to the poller thread from acceptor and workers.
pub enum PollerEvent {
    /// A freshly accepted socket to register for read readiness.
    Register(TcpStream, SocketAddr),
    /// Re-arm read interest (a worker finished without a complete request).
    SwitchToRead(Token),
    /// Arm write interest (a response was queued on the connection).
    SwitchToWrite(Token),
    /// Close the connection and drop its state.
    Close(Token),
    /// Close every connection and stop the poller thread.
    Shutdown,
}

/// Cloneable sending side of the poller's control channel.
///
/// Every send is followed by a wake so the poller observes the message even
/// while parked in `poll`.
#[derive(Clone)]
pub struct PollerHandle {
    tx: Sender<PollerEvent>,
    waker: Arc<Waker>,
}

impl PollerHandle {
    pub fn register(&self, stream: TcpStream, peer: SocketAddr) {
        self.send(PollerEvent::Register(stream, peer));
    }

    pub fn switch_to_read(&self, token: Token) {
        self.send(PollerEvent::SwitchToRead(token));
    }

    pub fn switch_to_write(&self, token: Token) {
        self.send(PollerEvent::SwitchToWrite(token));
    }

    pub fn close(&self, token: Token) {
        self.send(PollerEvent::Close(token));
    }

    pub fn shutdown(&self) {
        self.send(PollerEvent::Shutdown);
    }

    fn send(&self, event: PollerEvent) {
        // Both can only fail once the poller thread is gone, at which point
        // the message is moot.
        if self.tx.send(event).is_ok() {
            let _ = self.waker.wake();
        }
    }
}

struct Entry {
    conn: Arc<Connection>,
    /// Interest currently registered with the multiplexer; `None` while a
    /// worker owns the connection.
    interest: Option<Interest>,
}

/// The readiness multiplexer, run on a single dedicated thread.
///
/// The poller owns every connection's registration. Sockets alternate
/// between read interest and write interest, never both:
///
/// - readable: read interest is dropped and the connection is dispatched to
///   a worker, which guarantees one worker per connection at a time;
/// - writable: the write queue is drained here on the poller thread, then
///   the socket either switches back to read interest or closes.
///
/// All cross-thread mutation goes through [`PollerHandle`] messages.
pub struct Poller {
    poll: Poll,
    rx: Receiver<PollerEvent>,
    connections: Slab<Entry>,
    read_buffer_size: usize,
}

impl Poller {
    pub fn new(read_buffer_size: usize) -> io::Result<(Self, PollerHandle)> {
        let poll = Poll::new()?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKER_TOKEN)?);
        let (tx, rx) = crossbeam_channel::unbounded();

        let poller = Self {
            poll,
            rx,
            connections: Slab::new(),
            read_buffer_size,
        };
        Ok((poller, PollerHandle { tx, waker }))
    }

    /// The poller event loop. `dispatch` is invoked for every connection
    /// whose socket became readable, after its read interest was dropped.
    /// Returns when a `Shutdown` message arrives.
    pub fn run(mut self, dispatch: impl Fn(Arc<Connection>, Token)) {
        let mut events = Events::with_capacity(1024);

        loop {
            if let Err(err) = self.poll.poll(&mut events, None) {
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                error!("Poll failed: {}", err);
                break;
            }

            for event in events.iter() {
                if event.token() == WAKER_TOKEN {
                    continue;
                }
                if event.is_readable() {
                    self.handle_readable(event.token(), &dispatch);
                } else if event.is_writable() {
                    self.handle_writable(event.token());
                } else if event.is_error() || event.is_read_closed() || event.is_write_closed() {
                    // hangup/error without readiness; nothing left to do
                    self.close_connection(event.token());
                }
            }

            if self.drain_control_queue() {
                break;
            }
        }

        self.shutdown_all_connections();
        info!("Poller stopped");
    }

    /// Applies queued control messages; returns true on `Shutdown`.
    fn drain_control_queue(&mut self) -> bool {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                PollerEvent::Register(stream, peer) => self.register_connection(stream, peer),
                PollerEvent::SwitchToRead(token) => {
                    if let Err(err) = self.set_interest(token, Interest::READABLE) {
                        warn!("Failed to arm read interest: {}", err);
                        self.close_connection(token);
                    }
                }
                PollerEvent::SwitchToWrite(token) => {
                    if let Err(err) = self.set_interest(token, Interest::WRITABLE) {
                        warn!("Failed to arm write interest: {}", err);
                        self.close_connection(token);
                    }
                }
                PollerEvent::Close(token) => self.close_connection(token),
                PollerEvent::Shutdown => return true,
            }
        }
        false
    }

    fn register_connection(&mut self, stream: TcpStream, peer: SocketAddr) {
        let conn = Arc::new(Connection::new(stream, peer, self.read_buffer_size));
        let token = Token(self.connections.insert(Entry {
            conn,
            interest: None,
        }));

        if let Err(err) = self.set_interest(token, Interest::READABLE) {
            warn!("Failed to register connection from {}: {}", peer, err);
            self.connections.remove(token.0);
            return;
        }
        debug!("Registered connection from {}", peer);
    }

    fn handle_readable(&mut self, token: Token, dispatch: &impl Fn(Arc<Connection>, Token)) {
        let conn = match self.connections.get(token.0) {
            Some(entry) => entry.conn.clone(),
            None => return,
        };
        // Drop read interest before dispatch: exactly one worker reads this
        // socket until it hands control back.
        if let Err(err) = self.clear_interest(token) {
            warn!("Failed to clear read interest: {}", err);
            self.close_connection(token);
            return;
        }
        dispatch(conn, token);
    }

    fn handle_writable(&mut self, token: Token) {
        let conn = match self.connections.get(token.0) {
            Some(entry) => entry.conn.clone(),
            None => return,
        };

        match conn.drain_write_queue() {
            Ok(Drain::Empty) => {
                if conn.close_after_write() {
                    self.close_connection(token);
                } else if let Err(err) = self.set_interest(token, Interest::READABLE) {
                    warn!("Failed to re-arm read interest: {}", err);
                    self.close_connection(token);
                }
            }
            // Socket full; the next writable event resumes the drain.
            Ok(Drain::Pending) => {}
            Err(err) => {
                debug!("Write failed for {}: {}", conn.peer_addr(), err);
                self.close_connection(token);
            }
        }
    }

    fn set_interest(&mut self, token: Token, interest: Interest) -> io::Result<()> {
        let entry = self
            .connections
            .get_mut(token.0)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unknown connection"))?;
        let fd = entry.conn.raw_fd();
        let mut source = SourceFd(&fd);
        match entry.interest {
            Some(_) => self.poll.registry().reregister(&mut source, token, interest)?,
            None => self.poll.registry().register(&mut source, token, interest)?,
        }
        entry.interest = Some(interest);
        Ok(())
    }

    fn clear_interest(&mut self, token: Token) -> io::Result<()> {
        let entry = self
            .connections
            .get_mut(token.0)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unknown connection"))?;
        if entry.interest.take().is_some() {
            let fd = entry.conn.raw_fd();
            self.poll.registry().deregister(&mut SourceFd(&fd))?;
        }
        Ok(())
    }

    fn close_connection(&mut self, token: Token) {
        if !self.connections.contains(token.0) {
            return;
        }
        let _ = self.clear_interest(token);
        let entry = self.connections.remove(token.0);
        entry.conn.release();
        debug!("Closed connection from {}", entry.conn.peer_addr());
    }

    fn shutdown_all_connections(&mut self) {
        let tokens: Vec<Token> = self.connections.iter().map(|(key, _)| Token(key)).collect();
        for token in tokens {
            self.close_connection(token);
        }
    }
}
