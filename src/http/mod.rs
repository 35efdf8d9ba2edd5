//! HTTP protocol implementation.
//!
//! This module implements the HTTP/1.1 protocol layer: parsing incoming
//! requests incrementally, representing requests and responses, serializing
//! responses, and managing client sessions.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`parser`**: Incremental HTTP request parser, resumable across reads
//! - **`request`**: HTTP request representation with cookies and session access
//! - **`response`**: HTTP response representation with in-memory or file bodies
//! - **`sender`**: Serializes HTTP responses to wire bytes
//! - **`session`**: Concurrent session store keyed by the `JSESSIONID` cookie
//!
//! # Parse State Machine
//!
//! Because sockets are non-blocking, a request can arrive in arbitrary
//! fragments. The parser keeps its position across `feed` calls:
//!
//! ```text
//!        ┌──────────────┐
//!        │  START_LINE  │ ← Accumulate until CRLF, then parse method/URI/version
//!        └──────┬───────┘
//!               │ Start line parsed
//!               ▼
//!        ┌──────────────┐
//!        │   HEADERS    │ ← One header per CRLF line, blank line ends headers
//!        └──────┬───────┘
//!               │ Blank line
//!               ├─ Content-Length > 0 → BODY
//!               └─ otherwise → COMPLETE
//!               ▼
//!        ┌──────────────┐
//!        │     BODY     │ ← Accumulate exactly Content-Length bytes
//!        └──────┬───────┘
//!               │ Body complete
//!               ▼
//!           COMPLETE → Request built, parser resets for the next request
//! ```

pub mod parser;
pub mod request;
pub mod response;
pub mod sender;
pub mod session;
