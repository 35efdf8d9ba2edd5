use bytes::BytesMut;

use atrium::http::parser::{ParseError, RequestParser};
use atrium::http::request::Method;

fn parse_whole(raw: &[u8]) -> atrium::http::request::Request {
    let mut parser = RequestParser::new();
    let mut buf = BytesMut::from(raw);
    parser
        .feed(&mut buf)
        .expect("parse failed")
        .expect("request incomplete")
}

#[test]
fn test_parse_simple_get_request() {
    let req = parse_whole(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n");

    assert_eq!(req.method(), &Method::GET);
    assert_eq!(req.uri(), "/");
    assert_eq!(req.version(), "HTTP/1.1");
    assert_eq!(req.header("Host"), Some("example.com"));
}

#[test]
fn test_parse_post_request_with_body() {
    let req = parse_whole(b"POST /api HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello");

    assert_eq!(req.method(), &Method::POST);
    assert_eq!(req.body(), "hello");
}

#[test]
fn test_split_at_every_boundary_matches_one_shot() {
    let raw: &[u8] =
        b"POST /user/login HTTP/1.1\r\nHost: localhost\r\nContent-Length: 11\r\n\r\nuser=test01";

    for split in 1..raw.len() {
        let mut parser = RequestParser::new();
        let mut buf = BytesMut::from(&raw[..split]);
        let first = parser.feed(&mut buf).expect("first feed failed");
        assert!(first.is_none(), "completed early at split {split}");

        buf.extend_from_slice(&raw[split..]);
        let req = parser
            .feed(&mut buf)
            .expect("second feed failed")
            .unwrap_or_else(|| panic!("incomplete at split {split}"));

        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.uri(), "/user/login");
        assert_eq!(req.header("Content-Length"), Some("11"));
        assert_eq!(req.body(), "user=test01");
    }
}

#[test]
fn test_body_truncated_to_content_length() {
    let mut parser = RequestParser::new();
    let mut buf =
        BytesMut::from(&b"POST /api HTTP/1.1\r\nContent-Length: 10\r\n\r\n0123456789EXTRA"[..]);

    let req = parser.feed(&mut buf).unwrap().unwrap();
    assert_eq!(req.body(), "0123456789");
    // bytes beyond the declared length stay in the buffer
    assert_eq!(&buf[..], b"EXTRA");
}

#[test]
fn test_pipelined_second_request_preserved() {
    let mut parser = RequestParser::new();
    let mut buf = BytesMut::from(
        &b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\nHost: example.com\r\n\r\n"[..],
    );

    let first = parser.feed(&mut buf).unwrap().unwrap();
    assert_eq!(first.uri(), "/a");

    let second = parser.feed(&mut buf).unwrap().unwrap();
    assert_eq!(second.uri(), "/b");
    assert_eq!(second.header("Host"), Some("example.com"));
    assert!(buf.is_empty());
}

#[test]
fn test_parse_invalid_start_line() {
    let mut parser = RequestParser::new();
    let mut buf = BytesMut::from(&b"GET /missing-version\r\n\r\n"[..]);

    assert!(matches!(
        parser.feed(&mut buf),
        Err(ParseError::InvalidStartLine)
    ));
}

#[test]
fn test_parse_invalid_http_method() {
    let mut parser = RequestParser::new();
    let mut buf = BytesMut::from(&b"INVALID / HTTP/1.1\r\n\r\n"[..]);

    assert!(matches!(parser.feed(&mut buf), Err(ParseError::InvalidMethod)));
}

#[test]
fn test_parse_malformed_header() {
    let mut parser = RequestParser::new();
    let mut buf = BytesMut::from(&b"GET / HTTP/1.1\r\nBrokenHeader\r\n\r\n"[..]);

    assert!(matches!(parser.feed(&mut buf), Err(ParseError::InvalidHeader)));
}

#[test]
fn test_parse_malformed_content_length() {
    let mut parser = RequestParser::new();
    let mut buf = BytesMut::from(&b"POST / HTTP/1.1\r\nContent-Length: ten\r\n\r\n"[..]);

    assert!(matches!(
        parser.feed(&mut buf),
        Err(ParseError::InvalidContentLength)
    ));
}

#[test]
fn test_query_string_and_form_body_merge() {
    let req = parse_whole(
        b"POST /search?q=rust&page=1 HTTP/1.1\r\n\
          Content-Type: application/x-www-form-urlencoded\r\n\
          Content-Length: 16\r\n\r\n\
          q=servers&sort=a",
    );

    // body values win over the query string on duplicate names
    assert_eq!(req.parameter("q"), Some("servers"));
    assert_eq!(req.parameter("page"), Some("1"));
    assert_eq!(req.parameter("sort"), Some("a"));
}

#[test]
fn test_form_decoding_handles_percent_escapes() {
    let req = parse_whole(
        b"POST /user/login HTTP/1.1\r\n\
          Content-Type: application/x-www-form-urlencoded\r\n\
          Content-Length: 25\r\n\r\n\
          name=a%20b&email=x%40y.io",
    );

    assert_eq!(req.parameter("name"), Some("a b"));
    assert_eq!(req.parameter("email"), Some("x@y.io"));
}

#[test]
fn test_parse_various_http_methods() {
    let methods = vec![
        ("GET", Method::GET),
        ("POST", Method::POST),
        ("PUT", Method::PUT),
        ("DELETE", Method::DELETE),
        ("HEAD", Method::HEAD),
        ("OPTIONS", Method::OPTIONS),
        ("PATCH", Method::PATCH),
    ];

    for (method_str, expected_method) in methods {
        let raw = format!("{} / HTTP/1.1\r\n\r\n", method_str);
        let req = parse_whole(raw.as_bytes());
        assert_eq!(req.method(), &expected_method);
    }
}

#[test]
fn test_parse_request_with_empty_body() {
    let req = parse_whole(b"POST /api HTTP/1.1\r\nContent-Length: 0\r\n\r\n");
    assert_eq!(req.body().len(), 0);
}
