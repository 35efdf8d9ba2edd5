use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of worker threads fed over a channel.
///
/// Workers run request processing so the poller thread never blocks on
/// application code. Dropping the sender (in `shutdown`) ends the workers
/// once in-flight jobs finish.
pub struct WorkerPool {
    tx: Sender<Job>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<Job>();
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let rx: Receiver<Job> = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || {
                    for job in rx {
                        job();
                    }
                    debug!("Worker {} stopped", id);
                })?;
            handles.push(handle);
        }

        Ok(Self { tx, handles })
    }

    /// Queues a job; ignored after shutdown began.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) {
        let _ = self.tx.send(Box::new(job));
    }

    /// A cloneable submission handle, detached from the pool's lifetime.
    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            tx: self.tx.clone(),
        }
    }

    /// Finishes in-flight jobs and joins every worker.
    ///
    /// Outstanding [`WorkerHandle`]s keep the channel open; their jobs run
    /// until every handle is dropped.
    pub fn shutdown(self) {
        drop(self.tx);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

/// Cloneable job submitter for a [`WorkerPool`].
#[derive(Clone)]
pub struct WorkerHandle {
    tx: Sender<Job>,
}

impl WorkerHandle {
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) {
        let _ = self.tx.send(Box::new(job));
    }
}
