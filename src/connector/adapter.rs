use std::sync::Arc;

use tracing::{debug, error};

use crate::container::context::Context;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::session::{SessionStore, SESSION_COOKIE};

/// Bridges the connector to the container.
///
/// Resolves the request path through the context's mapper, dispatches to
/// the matched handler, and applies the protocol-level post-processing
/// (session cookie). Handler errors become a 500 without tearing down the
/// connection; an unmatched path becomes a 404.
pub struct Adapter {
    context: Arc<Context>,
    store: Arc<SessionStore>,
}

impl Adapter {
    pub fn new(context: Arc<Context>, store: Arc<SessionStore>) -> Self {
        Self { context, store }
    }

    /// Runs one request through the container and returns the response.
    pub fn service(&self, request: &mut Request) -> Response {
        request.bind_session_store(self.store.clone());
        let mut response = Response::new();

        let wrapper = match self.context.resolve(request.path()) {
            Some(wrapper) => wrapper,
            None => {
                debug!("No handler for {}", request.path());
                response.set_status(404);
                response.set_header("Content-Type", "text/plain");
                response.set_body("Not Found");
                return response;
            }
        };

        if let Err(err) = wrapper.service(&self.context, request, &mut response) {
            error!("Handler {} failed: {:#}", wrapper.name(), err);
            response.set_status(500);
            response.set_header("Content-Type", "text/plain");
            response.set_body("Internal Server Error");
            return response;
        }

        // Only a session created during this request gets a cookie; known
        // sessions already carry theirs.
        if request.is_new_session() {
            if let Some(session) = request.session(false) {
                response.set_header(
                    "Set-Cookie",
                    format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, session.id()),
                );
            }
        }

        response
    }
}
