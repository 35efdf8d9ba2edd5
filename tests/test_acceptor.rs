use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use atrium::connector::acceptor::{Acceptor, Sleeper};
use atrium::connector::poller::Poller;

/// Records backoff delays instead of sleeping, and stops the acceptor once
/// enough failures were observed.
struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
    running: Arc<AtomicBool>,
    limit: usize,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        let mut delays = self.delays.lock();
        delays.push(duration);
        if delays.len() >= self.limit {
            self.running.store(false, Ordering::Release);
        }
    }
}

#[test]
fn test_accept_errors_back_off_exponentially() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    // a shut-down listener makes every accept fail immediately
    Acceptor::shutdown_listener(&listener);

    let (_poller, handle) = Poller::new(8 * 1024).unwrap();
    let running = Arc::new(AtomicBool::new(true));
    let delays = Arc::new(Mutex::new(Vec::new()));

    let sleeper = RecordingSleeper {
        delays: delays.clone(),
        running: running.clone(),
        limit: 7,
    };
    let acceptor = Acceptor::new(listener, handle, running, Box::new(sleeper));
    acceptor.run();

    let recorded: Vec<u64> = delays.lock().iter().map(|d| d.as_millis() as u64).collect();
    assert_eq!(recorded, vec![50, 100, 200, 400, 800, 1600, 1600]);
}
