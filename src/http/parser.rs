use std::collections::HashMap;
use std::fmt;

use bytes::{Buf, BytesMut};

use crate::http::request::{Method, Request};

const CONTENT_LENGTH: &str = "Content-Length";
const CONTENT_TYPE: &str = "Content-Type";
const X_WWW_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Fatal parse failures. Any of these close the connection without a
/// response.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// The start line did not split into exactly method, URI and version.
    InvalidStartLine,
    /// The method token is not a recognized HTTP method.
    InvalidMethod,
    /// A header line is missing its colon, has an empty or space-containing
    /// name, or an empty value.
    InvalidHeader,
    /// The `Content-Length` value is not a valid number.
    InvalidContentLength,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidStartLine => write!(f, "invalid request start line"),
            ParseError::InvalidMethod => write!(f, "invalid request method"),
            ParseError::InvalidHeader => write!(f, "invalid request header"),
            ParseError::InvalidContentLength => write!(f, "invalid Content-Length value"),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StartLine,
    Headers,
    Body,
}

/// Incremental (resumable) HTTP/1.1 request parser.
///
/// One instance lives per connection. [`RequestParser::feed`] tolerates the
/// request arriving split across any number of calls, including splits
/// mid-line or mid-body, by accumulating a current-line buffer and the
/// completed header lines across calls.
///
/// State machine: START_LINE → HEADERS → BODY → COMPLETE. On completion the
/// accumulated state is drained into a [`Request`] and the parser resets
/// itself, ready for the next request on the same connection.
pub struct RequestParser {
    state: State,
    current_line: Vec<u8>,
    start_line: Option<(Method, String, String)>,
    headers: HashMap<String, String>,
    content_length: usize,
    body: Vec<u8>,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            state: State::StartLine,
            current_line: Vec::new(),
            start_line: None,
            headers: HashMap::new(),
            content_length: 0,
            body: Vec::new(),
        }
    }

    /// Consumes bytes from `buf` and advances the parse.
    ///
    /// Returns `Ok(Some(request))` once a complete request has been
    /// assembled, `Ok(None)` when more data is needed. Bytes beyond the end
    /// of a completed request are left in `buf` for the next call; the
    /// parser resets itself after producing a request.
    pub fn feed(&mut self, buf: &mut BytesMut) -> Result<Option<Request>, ParseError> {
        let mut consumed = 0;
        let mut complete = false;

        while consumed < buf.len() {
            let byte = buf[consumed];
            consumed += 1;

            match self.state {
                State::StartLine | State::Headers => {
                    self.current_line.push(byte);
                    if !line_complete(&self.current_line) {
                        continue;
                    }
                    let line = take_line(&mut self.current_line);

                    if self.state == State::StartLine {
                        self.start_line = Some(parse_start_line(&line)?);
                        self.state = State::Headers;
                    } else if line.is_empty() {
                        // end of headers
                        self.content_length = self.extract_content_length()?;
                        if self.content_length > 0 {
                            self.state = State::Body;
                        } else {
                            complete = true;
                            break;
                        }
                    } else {
                        let (name, value) = parse_header_line(&line)?;
                        self.headers.insert(name, value);
                    }
                }
                State::Body => {
                    self.body.push(byte);
                    if self.body.len() == self.content_length {
                        complete = true;
                        break;
                    }
                }
            }
        }

        buf.advance(consumed);

        if complete {
            // COMPLETE is only reachable after the start line parsed
            if let Some(start_line) = self.start_line.take() {
                let request = self.build_request(start_line);
                self.reset();
                return Ok(Some(request));
            }
            return Err(ParseError::InvalidStartLine);
        }
        Ok(None)
    }

    fn extract_content_length(&self) -> Result<usize, ParseError> {
        match self.headers.get(CONTENT_LENGTH) {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidContentLength),
            None => Ok(0),
        }
    }

    fn build_request(&mut self, start_line: (Method, String, String)) -> Request {
        let (method, uri, version) = start_line;
        let headers = std::mem::take(&mut self.headers);
        let body = String::from_utf8_lossy(&self.body).into_owned();

        // Query parameters: URI query string first, then (for form-encoded
        // bodies) the body, with body values winning on duplicate names.
        let mut query_params = HashMap::new();
        if let Some(idx) = uri.find('?') {
            merge_form_params(&mut query_params, &uri[idx + 1..]);
        }
        let form_encoded = headers
            .get(CONTENT_TYPE)
            .map(|v| v.eq_ignore_ascii_case(X_WWW_FORM_URLENCODED))
            .unwrap_or(false);
        if form_encoded {
            merge_form_params(&mut query_params, &body);
        }

        Request::new(method, uri, version, headers, body, query_params)
    }

    fn reset(&mut self) {
        self.state = State::StartLine;
        self.current_line.clear();
        self.start_line = None;
        self.headers.clear();
        self.content_length = 0;
        self.body.clear();
    }
}

fn line_complete(line: &[u8]) -> bool {
    line.len() >= 2 && line[line.len() - 2] == b'\r' && line[line.len() - 1] == b'\n'
}

/// Takes the accumulated line without its CRLF terminator, clearing the
/// accumulator for the next line.
fn take_line(current_line: &mut Vec<u8>) -> String {
    let line = String::from_utf8_lossy(&current_line[..current_line.len() - 2]).into_owned();
    current_line.clear();
    line
}

fn parse_start_line(line: &str) -> Result<(Method, String, String), ParseError> {
    let tokens: Vec<&str> = line.split(' ').collect();
    if tokens.len() != 3 {
        return Err(ParseError::InvalidStartLine);
    }
    let method = Method::from_str(tokens[0]).ok_or(ParseError::InvalidMethod)?;
    Ok((method, tokens[1].to_string(), tokens[2].to_string()))
}

fn parse_header_line(line: &str) -> Result<(String, String), ParseError> {
    let colon = line.find(':').ok_or(ParseError::InvalidHeader)?;
    if colon == 0 {
        return Err(ParseError::InvalidHeader);
    }

    let name = line[..colon].trim();
    let value = line[colon + 1..].trim();
    if name.contains(' ') || value.is_empty() {
        return Err(ParseError::InvalidHeader);
    }

    Ok((name.to_string(), value.to_string()))
}

fn merge_form_params(params: &mut HashMap<String, String>, encoded: &str) {
    for (name, value) in url::form_urlencoded::parse(encoded.as_bytes()) {
        params.insert(name.into_owned(), value.into_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_get_in_one_feed() {
        let mut parser = RequestParser::new();
        let mut buf = BytesMut::from(&b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n"[..]);

        let request = parser.feed(&mut buf).unwrap().unwrap();
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.uri(), "/");
        assert_eq!(request.version(), "HTTP/1.1");
        assert_eq!(request.header("Host"), Some("example.com"));
        assert!(buf.is_empty());
    }

    #[test]
    fn incomplete_request_needs_more_data() {
        let mut parser = RequestParser::new();
        let mut buf = BytesMut::from(&b"GET / HTTP/1.1\r\nHost: exa"[..]);

        assert!(parser.feed(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());

        buf.extend_from_slice(b"mple.com\r\n\r\n");
        let request = parser.feed(&mut buf).unwrap().unwrap();
        assert_eq!(request.header("Host"), Some("example.com"));
    }
}
