//! Non-blocking connector.
//!
//! This module implements the socket machinery that feeds the container:
//! accepting connections, multiplexing readiness, and moving bytes.
//!
//! # Architecture
//!
//! - **`endpoint`**: Binds the listener and owns the thread lifecycle
//! - **`acceptor`**: Blocking accept loop with exponential error backoff
//! - **`poller`**: Single-threaded readiness multiplexer over all sockets
//! - **`connection`**: Per-socket state, write queue and zero-copy transfer
//! - **`worker`**: Thread pool running request processing
//! - **`processor`**: Read/parse/dispatch cycle for one readiness event
//! - **`adapter`**: Hands parsed requests to the container
//!
//! # Connection flow
//!
//! ```text
//!   accept ──▶ register ──▶ readable ──▶ worker: read + parse
//!                 ▲                           │
//!                 │              incomplete   │   complete
//!                 │          ┌── switch to ◀──┴──▶ adapter → container
//!                 │          │     read                │
//!                 │          ▼                         ▼
//!              poller ◀── switch to write ◀── response queued
//!                 │
//!                 └─ writable: drain queue → keep-alive ? read : close
//! ```
//!
//! Interest is exclusive: a socket is registered for reading or for
//! writing, never both, and read interest is dropped while a worker owns
//! the connection.

pub mod acceptor;
pub mod adapter;
pub mod connection;
pub mod endpoint;
pub mod poller;
pub mod processor;
pub mod worker;

/// Common lifecycle for connector components: bind resources, start
/// threads, stop in reverse order. `stop` is idempotent.
pub trait Lifecycle {
    fn init(&mut self) -> anyhow::Result<()>;
    fn start(&mut self) -> anyhow::Result<()>;
    fn stop(&mut self) -> anyhow::Result<()>;
}
