use std::sync::mpsc;
use std::thread::{self, ThreadId};

use crate::models::error::CaptureError;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Shutdown,
}

/// Serial execution context for every capture-graph mutation.
///
/// One named worker thread drains a FIFO of jobs. Setup, teardown, camera
/// switches, platform events and detection delivery all run here, so they
/// never interleave.
pub struct SerialQueue {
    handle: QueueHandle,
    worker: Option<thread::JoinHandle<()>>,
}

/// Cloneable sender side of a `SerialQueue`, handed to platform callbacks.
#[derive(Clone)]
pub struct QueueHandle {
    sender: mpsc::Sender<Message>,
    thread_id: ThreadId,
}

impl SerialQueue {
    pub fn new(label: &str) -> Result<Self, CaptureError> {
        let (sender, receiver) = mpsc::channel::<Message>();

        let worker = thread::Builder::new()
            .name(label.to_string())
            .spawn(move || {
                while let Ok(Message::Run(job)) = receiver.recv() {
                    job();
                }
                log::debug!("session queue shut down");
            })
            .map_err(|e| {
                log::error!("failed to spawn session queue '{}': {}", label, e);
                CaptureError::QueueUnavailable
            })?;

        let thread_id = worker.thread().id();
        Ok(Self {
            handle: QueueHandle { sender, thread_id },
            worker: Some(worker),
        })
    }

    pub fn handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) -> Result<(), CaptureError> {
        self.handle.dispatch(job)
    }

    pub fn sync<R: Send + 'static>(
        &self,
        job: impl FnOnce() -> R + Send + 'static,
    ) -> Result<R, CaptureError> {
        self.handle.sync(job)
    }

    /// Block until every job enqueued before this call has run.
    pub fn flush(&self) -> Result<(), CaptureError> {
        self.handle.sync(|| ())
    }
}

impl QueueHandle {
    /// Whether the caller is already running on the queue thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Enqueue a job without waiting for it.
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) -> Result<(), CaptureError> {
        self.sender
            .send(Message::Run(Box::new(job)))
            .map_err(|_| CaptureError::QueueUnavailable)
    }

    /// Run a job on the queue and wait for its result.
    ///
    /// Runs inline when called from the queue thread itself, so delegate
    /// callbacks can issue commands without deadlocking.
    pub fn sync<R: Send + 'static>(
        &self,
        job: impl FnOnce() -> R + Send + 'static,
    ) -> Result<R, CaptureError> {
        if self.is_current() {
            return Ok(job());
        }

        let (tx, rx) = mpsc::sync_channel(1);
        self.dispatch(move || {
            let _ = tx.send(job());
        })?;
        rx.recv().map_err(|_| CaptureError::QueueUnavailable)
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // Jobs queued before this point still run; later dispatches fail.
        let _ = self.handle.sender.send(Message::Shutdown);
        if !self.handle.is_current() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn jobs_run_in_fifo_order() {
        let queue = SerialQueue::new("test-fifo").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..50 {
            let seen = Arc::clone(&seen);
            queue.dispatch(move || seen.lock().push(i)).unwrap();
        }
        queue.flush().unwrap();

        assert_eq!(*seen.lock(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn sync_returns_job_result() {
        let queue = SerialQueue::new("test-sync").unwrap();
        assert_eq!(queue.sync(|| 6 * 7).unwrap(), 42);
    }

    #[test]
    fn sync_from_queue_thread_runs_inline() {
        let queue = SerialQueue::new("test-reentrant").unwrap();
        let handle = queue.handle();

        let nested = queue
            .sync(move || {
                assert!(handle.is_current());
                handle.sync(|| "inner").unwrap()
            })
            .unwrap();

        assert_eq!(nested, "inner");
    }

    #[test]
    fn jobs_run_off_the_caller_thread() {
        let queue = SerialQueue::new("test-thread").unwrap();
        let handle = queue.handle();

        assert!(!handle.is_current());
        let name = queue
            .sync(|| thread::current().name().map(str::to_string))
            .unwrap();
        assert_eq!(name.as_deref(), Some("test-thread"));
    }

    #[test]
    fn drop_waits_for_pending_jobs() {
        let counter = Arc::new(Mutex::new(0));
        {
            let queue = SerialQueue::new("test-drop").unwrap();
            for _ in 0..10 {
                let counter = Arc::clone(&counter);
                queue.dispatch(move || *counter.lock() += 1).unwrap();
            }
        }
        assert_eq!(*counter.lock(), 10);
    }
}
