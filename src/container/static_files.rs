use std::path::PathBuf;

use tracing::debug;

use crate::container::wrapper::Handler;
use crate::http::request::Request;
use crate::http::response::Response;

/// The handler behind the default `/` mapping: serves files from a document
/// root.
///
/// Files are never read into memory here. The handler resolves the path,
/// checks it stays inside the document root, and sets a file-reference body
/// plus `Content-Length`; the connector streams the content with zero-copy
/// transfer. Missing files, directories and escape attempts all get a plain
/// 404.
pub struct StaticResourceHandler {
    doc_root: PathBuf,
}

impl StaticResourceHandler {
    pub fn new(doc_root: impl Into<PathBuf>) -> Self {
        Self {
            doc_root: doc_root.into(),
        }
    }
}

impl Handler for StaticResourceHandler {
    fn service(&self, request: &mut Request, response: &mut Response) -> anyhow::Result<()> {
        let mut path = request.path().trim_start_matches('/');
        if path.is_empty() {
            path = "index.html";
        }

        let root = match self.doc_root.canonicalize() {
            Ok(root) => root,
            Err(_) => {
                not_found(response);
                return Ok(());
            }
        };

        // canonicalize resolves `..` and symlinks, so a containment check on
        // the result is enough to keep requests inside the document root
        let file = match root.join(path).canonicalize() {
            Ok(file) if file.starts_with(&root) && file.is_file() => file,
            _ => {
                debug!("Static resource not found: {}", request.path());
                not_found(response);
                return Ok(());
            }
        };

        let length = file.metadata()?.len();
        response.set_status(200);
        response.set_header("Content-Type", mime_type(path));
        response.set_header("Content-Length", length.to_string());
        response.set_file_body(file);
        Ok(())
    }
}

fn not_found(response: &mut Response) {
    response.set_status(404);
    response.set_header("Content-Type", "text/plain");
    response.set_body("Not Found");
}

/// MIME type by file extension, defaulting to `text/plain`.
pub fn mime_type(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        _ => "text/plain",
    }
}
