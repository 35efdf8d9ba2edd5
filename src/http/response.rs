use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The response entity: in-memory bytes or a file reference for zero-copy
/// transfer. Setting one clears the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    None,
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// A mutable HTTP response accumulator.
///
/// Handlers fill in status, headers and a body; the connector serializes it
/// (or streams the file body with zero-copy) once processing is done. Created
/// fresh per request-processing cycle.
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: Body,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Body::None,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Sets an in-memory body and the matching `Content-Length` header,
    /// replacing any file body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        let body = body.into();
        self.headers
            .insert("Content-Length".to_string(), body.len().to_string());
        self.body = Body::Bytes(body);
    }

    /// Sets a file-reference body for zero-copy transfer, replacing any
    /// in-memory body. `Content-Length` is the caller's responsibility (it
    /// comes from the file metadata).
    pub fn set_file_body(&mut self, path: impl Into<PathBuf>) {
        self.body = Body::File(path.into());
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn has_file_body(&self) -> bool {
        matches!(self.body, Body::File(_))
    }

    pub fn file_body(&self) -> Option<&Path> {
        match &self.body {
            Body::File(path) => Some(path),
            _ => None,
        }
    }

    /// Configures a 302 redirect to `location` with an empty body.
    pub fn send_redirect(&mut self, location: &str) {
        self.status = 302;
        self.headers
            .insert("Location".to_string(), location.to_string());
        self.headers
            .insert("Content-Length".to_string(), "0".to_string());
        self.body = Body::None;
    }

    /// The reason phrase sent on the status line.
    pub fn reason_phrase(&self) -> &'static str {
        reason_phrase(self.status)
    }
}

/// Maps a status code to its reason phrase; unrecognized codes render as
/// "Unknown Status".
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown Status",
    }
}
