//! Response serialization.
//!
//! Turns a [`Response`] into wire bytes. For in-memory bodies the whole
//! response is one buffer; for file bodies only the status line and headers
//! are serialized here and the file content follows via zero-copy transfer
//! on the connection's write queue.

use bytes::{BufMut, Bytes, BytesMut};

use crate::http::response::{Body, Response};

/// Serializes the complete response: status line, headers, blank line and
/// the in-memory body (if any).
pub fn encode(response: &Response) -> Bytes {
    let mut buf = encode_prelude(response);
    if let Body::Bytes(body) = response.body() {
        buf.put_slice(body);
    }
    buf.freeze()
}

/// Serializes only the status line and headers (plus the blank line). Used
/// for file bodies, where the content is streamed separately.
pub fn encode_headers(response: &Response) -> Bytes {
    encode_prelude(response).freeze()
}

fn encode_prelude(response: &Response) -> BytesMut {
    let mut buf = BytesMut::with_capacity(256);

    buf.put_slice(
        format!(
            "HTTP/1.1 {} {}\r\n",
            response.status(),
            response.reason_phrase()
        )
        .as_bytes(),
    );

    let mut wrote_content_length = false;
    for (name, value) in response.headers() {
        if name.eq_ignore_ascii_case("Content-Length") {
            wrote_content_length = true;
        }
        buf.put_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    // Bodiless responses still advertise a length so keep-alive clients know
    // where the response ends.
    if !wrote_content_length && !response.has_file_body() {
        buf.put_slice(b"Content-Length: 0\r\n");
    }

    buf.put_slice(b"\r\n");
    buf
}
