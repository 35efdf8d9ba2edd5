use std::io::{self, Read};
use std::sync::Arc;

use mio::Token;
use tracing::{debug, warn};

use crate::connector::adapter::Adapter;
use crate::connector::connection::{Connection, FileTask, WriteTask};
use crate::connector::poller::PollerHandle;
use crate::http::response::Response;
use crate::http::sender;

/// Processes one readiness dispatch for a connection, on a worker thread.
///
/// Reads until the socket would block, feeds the incremental parser, and
/// either hands interest back to the poller (request still incomplete) or
/// runs the request through the adapter, queues the response and arms write
/// interest. Parse errors and EOF close the connection.
pub fn process(conn: Arc<Connection>, token: Token, adapter: &Adapter, poller: &PollerHandle) {
    let mut guard = conn.read_state();
    let state = &mut *guard;

    loop {
        let mut stream = conn.stream();
        match stream.read(&mut state.chunk) {
            Ok(0) => {
                debug!("Peer {} closed the connection", conn.peer_addr());
                poller.close(token);
                return;
            }
            Ok(n) => state.pending.extend_from_slice(&state.chunk[..n]),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                debug!("Read failed for {}: {}", conn.peer_addr(), err);
                poller.close(token);
                return;
            }
        }
    }

    let mut request = match state.parser.feed(&mut state.pending) {
        Ok(Some(request)) => request,
        Ok(None) => {
            // Request incomplete; wait for more bytes.
            poller.switch_to_read(token);
            return;
        }
        Err(err) => {
            warn!("Malformed request from {}: {}", conn.peer_addr(), err);
            poller.close(token);
            return;
        }
    };
    drop(guard);

    let mut response = adapter.service(&mut request);

    let keep_alive = request.keep_alive();
    response.set_header(
        "Connection",
        if keep_alive { "keep-alive" } else { "close" },
    );
    conn.set_close_after_write(!keep_alive);

    enqueue_response(&conn, &mut response);
    poller.switch_to_write(token);
}

/// Queues the serialized response. File bodies become a header buffer plus
/// a zero-copy file task; if the file cannot be opened at this point the
/// response is replaced by a 500.
fn enqueue_response(conn: &Arc<Connection>, response: &mut Response) {
    if let Some(path) = response.file_body().map(|p| p.to_path_buf()) {
        match FileTask::open(&path) {
            Ok(task) => {
                conn.enqueue(WriteTask::Buffer(sender::encode_headers(response)));
                conn.enqueue(WriteTask::File(task));
            }
            Err(err) => {
                warn!("Failed to open {}: {}", path.display(), err);
                let mut fallback = Response::new();
                fallback.set_status(500);
                fallback.set_header("Content-Type", "text/plain");
                fallback.set_header("Connection", "close");
                fallback.set_body("Internal Server Error");
                conn.set_close_after_write(true);
                conn.enqueue(WriteTask::Buffer(sender::encode(&fallback)));
            }
        }
    } else {
        conn.enqueue(WriteTask::Buffer(sender::encode(response)));
    }
}
