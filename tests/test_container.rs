use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use bytes::BytesMut;

use atrium::container::context::Context;
use atrium::container::wrapper::{ContainerAware, Handler, HandlerFactory};
use atrium::http::parser::RequestParser;
use atrium::http::request::Request;
use atrium::http::response::Response;

fn parse_request(raw: &[u8]) -> Request {
    let mut parser = RequestParser::new();
    let mut buf = BytesMut::from(raw);
    parser.feed(&mut buf).unwrap().unwrap()
}

struct CountingHandler {
    inits: Arc<AtomicUsize>,
    destroys: Arc<AtomicUsize>,
}

impl Handler for CountingHandler {
    fn init(&self) -> anyhow::Result<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn service(&self, _request: &mut Request, response: &mut Response) -> anyhow::Result<()> {
        response.set_body("counted");
        Ok(())
    }

    fn destroy(&self) {
        self.destroys.fetch_add(1, Ordering::SeqCst);
    }
}

fn counting_factory(inits: Arc<AtomicUsize>, destroys: Arc<AtomicUsize>) -> HandlerFactory {
    Box::new(move || {
        Box::new(CountingHandler {
            inits: inits.clone(),
            destroys: destroys.clone(),
        })
    })
}

struct FailingHandler;

impl Handler for FailingHandler {
    fn init(&self) -> anyhow::Result<()> {
        anyhow::bail!("refusing to start")
    }

    fn service(&self, _request: &mut Request, _response: &mut Response) -> anyhow::Result<()> {
        Ok(())
    }
}

#[test]
fn test_lazy_handler_loads_once_on_first_request() {
    let inits = Arc::new(AtomicUsize::new(0));
    let destroys = Arc::new(AtomicUsize::new(0));

    let context = Context::new();
    context.add_route("/count", -1, counting_factory(inits.clone(), destroys.clone()));
    context.startup().unwrap();

    assert_eq!(inits.load(Ordering::SeqCst), 0);

    let wrapper = context.resolve("/count").unwrap();
    for _ in 0..3 {
        let mut req = parse_request(b"GET /count HTTP/1.1\r\n\r\n");
        let mut resp = Response::new();
        wrapper.service(&context, &mut req, &mut resp).unwrap();
    }
    assert_eq!(inits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_eager_handler_loads_at_startup() {
    let inits = Arc::new(AtomicUsize::new(0));
    let destroys = Arc::new(AtomicUsize::new(0));

    let context = Context::new();
    context.add_route("/count", 0, counting_factory(inits.clone(), destroys.clone()));
    context.startup().unwrap();

    assert_eq!(inits.load(Ordering::SeqCst), 1);
    assert!(context.resolve("/count").unwrap().is_loaded());
}

#[test]
fn test_eager_init_failure_aborts_startup() {
    let context = Context::new();
    context.add_route("/bad", 0, Box::new(|| Box::new(FailingHandler)));

    assert!(context.startup().is_err());
}

#[test]
fn test_lazy_init_failure_surfaces_per_request() {
    let context = Context::new();
    context.add_route("/bad", -1, Box::new(|| Box::new(FailingHandler)));
    context.startup().unwrap();

    let wrapper = context.resolve("/bad").unwrap();
    let mut req = parse_request(b"GET /bad HTTP/1.1\r\n\r\n");
    let mut resp = Response::new();
    assert!(wrapper.service(&context, &mut req, &mut resp).is_err());
    assert!(!wrapper.is_loaded());
}

#[test]
fn test_shutdown_destroys_only_loaded_handlers() {
    let loaded_inits = Arc::new(AtomicUsize::new(0));
    let loaded_destroys = Arc::new(AtomicUsize::new(0));
    let lazy_inits = Arc::new(AtomicUsize::new(0));
    let lazy_destroys = Arc::new(AtomicUsize::new(0));

    let context = Context::new();
    context.add_route(
        "/loaded",
        0,
        counting_factory(loaded_inits.clone(), loaded_destroys.clone()),
    );
    context.add_route(
        "/lazy",
        -1,
        counting_factory(lazy_inits.clone(), lazy_destroys.clone()),
    );
    context.startup().unwrap();

    context.shutdown_all();

    assert_eq!(loaded_destroys.load(Ordering::SeqCst), 1);
    // never loaded, so no destroy callback
    assert_eq!(lazy_destroys.load(Ordering::SeqCst), 0);
}

#[test]
fn test_destroyed_handler_refuses_requests() {
    let inits = Arc::new(AtomicUsize::new(0));
    let destroys = Arc::new(AtomicUsize::new(0));

    let context = Context::new();
    context.add_route("/count", 0, counting_factory(inits, destroys));
    context.startup().unwrap();

    let wrapper = context.resolve("/count").unwrap();
    wrapper.destroy();

    let mut req = parse_request(b"GET /count HTTP/1.1\r\n\r\n");
    let mut resp = Response::new();
    assert!(wrapper.service(&context, &mut req, &mut resp).is_err());
}

struct AwareHandler {
    container: OnceLock<Arc<Context>>,
}

impl Handler for AwareHandler {
    fn service(&self, _request: &mut Request, response: &mut Response) -> anyhow::Result<()> {
        let context = self
            .container
            .get()
            .ok_or_else(|| anyhow::anyhow!("container not injected"))?;
        let greeting = context
            .attribute::<String>("greeting")
            .ok_or_else(|| anyhow::anyhow!("missing greeting"))?;
        response.set_body(greeting.as_str());
        Ok(())
    }

    fn as_container_aware(&self) -> Option<&dyn ContainerAware> {
        Some(self)
    }
}

impl ContainerAware for AwareHandler {
    fn set_container(&self, context: Arc<Context>) {
        let _ = self.container.set(context);
    }
}

#[test]
fn test_container_aware_handler_gets_context() {
    let context = Context::new();
    context.set_attribute("greeting", "hello from context".to_string());
    context.add_route(
        "/aware",
        0,
        Box::new(|| {
            Box::new(AwareHandler {
                container: OnceLock::new(),
            })
        }),
    );
    context.startup().unwrap();

    let wrapper = context.resolve("/aware").unwrap();
    let mut req = parse_request(b"GET /aware HTTP/1.1\r\n\r\n");
    let mut resp = Response::new();
    wrapper.service(&context, &mut req, &mut resp).unwrap();

    match resp.body() {
        atrium::http::response::Body::Bytes(bytes) => {
            assert_eq!(bytes.as_slice(), b"hello from context")
        }
        other => panic!("unexpected body: {other:?}"),
    }
}
