//! Atrium - Non-blocking HTTP/1.1 Application Server
//!
//! Core library: connector (acceptor/poller/workers), handler container
//! and the HTTP protocol layer.

pub mod config;
pub mod connector;
pub mod container;
pub mod http;
