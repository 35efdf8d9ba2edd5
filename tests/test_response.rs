use atrium::http::response::{reason_phrase, Body, Response};
use atrium::http::sender;

#[test]
fn test_reason_phrases() {
    assert_eq!(reason_phrase(200), "OK");
    assert_eq!(reason_phrase(302), "Found");
    assert_eq!(reason_phrase(404), "Not Found");
    assert_eq!(reason_phrase(500), "Internal Server Error");
    assert_eq!(reason_phrase(418), "Unknown Status");
}

#[test]
fn test_set_body_sets_content_length() {
    let mut resp = Response::new();
    resp.set_body("hello world");

    assert_eq!(resp.header("Content-Length"), Some("11"));
    assert_eq!(resp.body(), &Body::Bytes(b"hello world".to_vec()));
}

#[test]
fn test_file_body_replaces_bytes_body() {
    let mut resp = Response::new();
    resp.set_body("inline");
    resp.set_file_body("/srv/www/index.html");

    assert!(resp.has_file_body());
    assert_eq!(
        resp.file_body().unwrap().to_str().unwrap(),
        "/srv/www/index.html"
    );

    resp.set_body("inline again");
    assert!(!resp.has_file_body());
}

#[test]
fn test_send_redirect() {
    let mut resp = Response::new();
    resp.set_body("stale");
    resp.send_redirect("/index.html");

    assert_eq!(resp.status(), 302);
    assert_eq!(resp.header("Location"), Some("/index.html"));
    assert_eq!(resp.header("Content-Length"), Some("0"));
    assert_eq!(resp.body(), &Body::None);
}

#[test]
fn test_encoded_redirect_wire_format() {
    let mut resp = Response::new();
    resp.send_redirect("/user/login_failed.html");

    let text = String::from_utf8(sender::encode(&resp).to_vec()).unwrap();
    assert!(text.starts_with("HTTP/1.1 302 Found\r\n"));
    assert!(text.contains("Location: /user/login_failed.html\r\n"));
    assert!(text.ends_with("\r\n\r\n"));
}
