use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Buf, Bytes, BytesMut};
use mio::net::TcpStream;
use parking_lot::{Mutex, MutexGuard};

use crate::http::parser::RequestParser;

/// One pending unit of output: an in-memory buffer or a file segment sent
/// with `sendfile`.
pub enum WriteTask {
    Buffer(Bytes),
    File(FileTask),
}

/// A file segment queued for zero-copy transfer.
///
/// The file stays open for the lifetime of the task; `offset` advances as
/// the kernel copies bytes directly from the page cache to the socket.
pub struct FileTask {
    file: File,
    offset: libc::off_t,
    remaining: u64,
}

impl FileTask {
    /// Opens the file and captures its length as the transfer size.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let remaining = file.metadata()?.len();
        Ok(Self {
            file,
            offset: 0,
            remaining,
        })
    }

    /// Sends as much of the remaining segment as the socket accepts.
    ///
    /// Returns `Ok(true)` when the segment is fully sent, `Ok(false)` when
    /// the socket is full (try again on the next writable event).
    fn send(&mut self, socket_fd: RawFd) -> io::Result<bool> {
        while self.remaining > 0 {
            let sent = unsafe {
                libc::sendfile(
                    socket_fd,
                    self.file.as_raw_fd(),
                    &mut self.offset,
                    self.remaining as usize,
                )
            };
            if sent < 0 {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::WouldBlock => return Ok(false),
                    io::ErrorKind::Interrupted => continue,
                    _ => return Err(err),
                }
            }
            self.remaining -= sent as u64;
        }
        Ok(true)
    }
}

/// Incremental read state, owned by whichever worker currently processes
/// this connection. The poller guarantees a single reader by dropping read
/// interest before dispatching.
pub struct ReadState {
    /// Reusable read buffer; sized once from configuration.
    pub chunk: Vec<u8>,
    /// Bytes received but not yet consumed by the parser.
    pub pending: BytesMut,
    /// Parser carrying its position across partial reads.
    pub parser: RequestParser,
}

/// Outcome of draining the write queue.
#[derive(Debug, PartialEq, Eq)]
pub enum Drain {
    /// Every queued task was written in full.
    Empty,
    /// The socket filled up; tasks remain queued.
    Pending,
}

/// Per-connection state shared between the poller and worker threads.
///
/// The socket itself is read by one worker at a time (enforced by interest
/// handoff) and written only on the poller thread, which drains the write
/// queue in FIFO order.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    read: Mutex<ReadState>,
    write_queue: Mutex<VecDeque<WriteTask>>,
    close_after_write: AtomicBool,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr, read_buffer_size: usize) -> Self {
        Self {
            stream,
            peer,
            read: Mutex::new(ReadState {
                chunk: vec![0; read_buffer_size],
                pending: BytesMut::new(),
                parser: RequestParser::new(),
            }),
            write_queue: Mutex::new(VecDeque::new()),
            close_after_write: AtomicBool::new(false),
        }
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    pub fn raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn read_state(&self) -> MutexGuard<'_, ReadState> {
        self.read.lock()
    }

    /// Appends a task to the write queue. Output order is the enqueue order.
    pub fn enqueue(&self, task: WriteTask) {
        self.write_queue.lock().push_back(task);
    }

    /// Marks the connection for closing once the write queue drains.
    pub fn set_close_after_write(&self, close: bool) {
        self.close_after_write.store(close, Ordering::Release);
    }

    pub fn close_after_write(&self) -> bool {
        self.close_after_write.load(Ordering::Acquire)
    }

    /// Writes queued tasks until the queue empties or the socket blocks.
    ///
    /// Called on the poller thread only. On error the remaining queue is
    /// dropped, releasing any open file handles.
    pub fn drain_write_queue(&self) -> io::Result<Drain> {
        let mut queue = self.write_queue.lock();

        while let Some(task) = queue.front_mut() {
            let finished = match task {
                WriteTask::Buffer(buf) => match self.write_buffer(buf) {
                    Ok(finished) => finished,
                    Err(err) => {
                        queue.clear();
                        return Err(err);
                    }
                },
                WriteTask::File(file_task) => match file_task.send(self.raw_fd()) {
                    Ok(finished) => finished,
                    Err(err) => {
                        queue.clear();
                        return Err(err);
                    }
                },
            };

            if !finished {
                return Ok(Drain::Pending);
            }
            queue.pop_front();
        }

        Ok(Drain::Empty)
    }

    fn write_buffer(&self, buf: &mut Bytes) -> io::Result<bool> {
        while !buf.is_empty() {
            match (&self.stream).write(buf) {
                Ok(n) => buf.advance(n),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(true)
    }

    /// Drops all queued output, releasing file handles. Called when the
    /// connection closes before the queue drains.
    pub fn release(&self) {
        self.write_queue.lock().clear();
    }
}
