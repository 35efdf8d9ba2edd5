use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use nix::sys::signal::{self, SigHandler, Signal};

use atrium::config::Config;
use atrium::connector::endpoint::HttpConnector;
use atrium::connector::Lifecycle;
use atrium::container::context::Context;
use atrium::container::static_files::StaticResourceHandler;
use atrium::http::session::SessionStore;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load("config.yaml")?;

    let context = Context::new();
    let doc_root = cfg.static_files.doc_root.clone();
    context.add_route(
        "/",
        0,
        Box::new(move || Box::new(StaticResourceHandler::new(doc_root.clone()))),
    );
    context.startup()?;

    let store = std::sync::Arc::new(SessionStore::new());
    let mut connector = HttpConnector::new(cfg.server.clone(), context.clone(), store);
    connector.init()?;
    connector.start()?;

    unsafe {
        signal::signal(Signal::SIGINT, SigHandler::Handler(handle_sigint))?;
    }
    while !SHUTDOWN.load(Ordering::SeqCst) {
        thread::park_timeout(Duration::from_millis(200));
    }
    tracing::info!("Shutdown signal received");

    connector.stop()?;
    context.shutdown_all();

    Ok(())
}
