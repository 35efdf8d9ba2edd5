use std::collections::HashMap;
use std::sync::Arc;

use crate::http::session::{self, Session, SessionStore, SESSION_COOKIE};

/// HTTP request methods.
///
/// Represents the HTTP method/verb of a request. The connector parses any of
/// these; which ones a handler supports is the handler's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
}

impl Method {
    /// Parses an HTTP method from a string (case-sensitive, uppercase).
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            _ => None,
        }
    }
}

/// A parsed HTTP request.
///
/// Immutable once built by the parser, except for the lazily derived parts:
/// the cookie map and the session reference, both resolved on first access.
/// Query parameters are already merged from the URI query string and, for
/// form-encoded bodies, from the body.
pub struct Request {
    method: Method,
    uri: String,
    version: String,
    headers: HashMap<String, String>,
    body: String,
    query_params: HashMap<String, String>,

    cookies: Option<HashMap<String, String>>,
    session: Option<Arc<Session>>,
    new_session: bool,
    store: Option<Arc<SessionStore>>,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        uri: String,
        version: String,
        headers: HashMap<String, String>,
        body: String,
        query_params: HashMap<String, String>,
    ) -> Self {
        Self {
            method,
            uri,
            version,
            headers,
            body,
            query_params,
            cookies: None,
            session: None,
            new_session: false,
            store: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The raw request URI, including any query string.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The request path: the URI up to (not including) the `?`.
    pub fn path(&self) -> &str {
        match self.uri.find('?') {
            Some(idx) => &self.uri[..idx],
            None => &self.uri,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Retrieves a header value by name, case-sensitive as received.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Retrieves a query/form parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|v| v.as_str())
    }

    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// The cookie map, parsed from the `Cookie` header on first access.
    pub fn cookies(&mut self) -> &HashMap<String, String> {
        let headers = &self.headers;
        self.cookies.get_or_insert_with(|| {
            headers
                .get("Cookie")
                .map(|v| parse_cookies(v))
                .unwrap_or_default()
        })
    }

    pub fn cookie(&mut self, name: &str) -> Option<String> {
        self.cookies().get(name).cloned()
    }

    /// Binds the session store used by [`Request::session`]. Called by the
    /// adapter before the request is dispatched to a handler.
    pub fn bind_session_store(&mut self, store: Arc<SessionStore>) {
        self.store = Some(store);
    }

    /// Resolves this request's session.
    ///
    /// The session id comes from the `JSESSIONID` cookie. If the cookie is
    /// absent and `create` is true, a fresh random id is generated and the
    /// request is flagged as having created a new session, which later drives
    /// the `Set-Cookie` response header. With `create` false and no existing
    /// session, returns `None` with no side effect.
    pub fn session(&mut self, create: bool) -> Option<Arc<Session>> {
        if self.session.is_none() {
            let store = self.store.clone()?;
            match self.cookie(SESSION_COOKIE) {
                Some(id) => {
                    self.session = store.get_or_create(&id, create);
                }
                None => {
                    if !create {
                        return None;
                    }
                    let id = session::generate_session_id();
                    self.new_session = true;
                    self.session = store.get_or_create(&id, true);
                }
            }
        }
        self.session.clone()
    }

    /// Whether [`Request::session`] created a new session during this request.
    pub fn is_new_session(&self) -> bool {
        self.new_session
    }

    /// Removes the resolved session from the store, if any.
    pub fn invalidate_session(&mut self) {
        if let (Some(store), Some(session)) = (self.store.as_ref(), self.session.take()) {
            store.remove(session.id());
        }
    }

    /// Whether the connection should remain open after the response.
    ///
    /// True only for an explicit `Connection: keep-alive`.
    pub fn keep_alive(&self) -> bool {
        self.header("Connection")
            .map(|v| v.eq_ignore_ascii_case("keep-alive"))
            .unwrap_or(false)
    }
}

fn parse_cookies(value: &str) -> HashMap<String, String> {
    value
        .split(';')
        .filter_map(|part| {
            let (name, value) = part.split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_headers(headers: HashMap<String, String>) -> Request {
        Request::new(
            Method::GET,
            "/index.html?a=1".to_string(),
            "HTTP/1.1".to_string(),
            headers,
            String::new(),
            HashMap::new(),
        )
    }

    #[test]
    fn path_strips_query_string() {
        let req = request_with_headers(HashMap::new());
        assert_eq!(req.path(), "/index.html");
        assert_eq!(req.uri(), "/index.html?a=1");
    }

    #[test]
    fn cookies_parse_lazily() {
        let mut headers = HashMap::new();
        headers.insert(
            "Cookie".to_string(),
            "JSESSIONID=abc; theme=dark".to_string(),
        );
        let mut req = request_with_headers(headers);

        assert_eq!(req.cookie("JSESSIONID").as_deref(), Some("abc"));
        assert_eq!(req.cookie("theme").as_deref(), Some("dark"));
        assert_eq!(req.cookie("missing"), None);
    }

    #[test]
    fn keep_alive_requires_explicit_header() {
        let req = request_with_headers(HashMap::new());
        assert!(!req.keep_alive());

        let mut headers = HashMap::new();
        headers.insert("Connection".to_string(), "keep-alive".to_string());
        assert!(request_with_headers(headers).keep_alive());

        let mut headers = HashMap::new();
        headers.insert("Connection".to_string(), "close".to_string());
        assert!(!request_with_headers(headers).keep_alive());
    }
}
