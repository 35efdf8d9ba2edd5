//! Handler container.
//!
//! This module manages application handlers and their lifecycle, independent
//! of the socket and protocol machinery in `connector`:
//!
//! - **`context`**: Registry of routes and handlers, startup/shutdown lifecycle
//! - **`wrapper`**: Per-handler lifecycle wrapper (lazy or eager loading)
//! - **`mapper`**: URL pattern matching with servlet-style priority
//! - **`static_files`**: Built-in handler serving files from a document root
//!
//! # Request routing
//!
//! ```text
//!   request path
//!        │
//!        ▼
//!   ┌─────────┐   exact → prefix → extension → default
//!   │ Mapper  │ ─────────────────────────────────────→ HandlerWrapper
//!   └─────────┘                                             │
//!                                            load if needed │
//!                                                           ▼
//!                                                   Handler::service
//! ```

pub mod context;
pub mod mapper;
pub mod static_files;
pub mod wrapper;
