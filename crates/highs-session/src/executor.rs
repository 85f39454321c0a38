//! Background execution of long-running engine operations.
//!
//! Each session owns one [`Coordinator`]: a dedicated worker thread fed by a
//! FIFO channel, and the resource it guards. At most one submitted operation
//! is outstanding at a time.
//!
//! ```text
//! caller thread                         worker thread
//!   submit("Run", job) ──► Idle→Running ──► lock resource
//!                                            job(&mut R)
//!                                            Running→Idle
//!   Ticket / callback  ◄──────────────────── completion(result)
//! ```
//!
//! A second submit while Running is rejected with
//! [`SessionError::SolveInProgress`]; it is never queued behind the first.

use crate::error::SessionError;
use parking_lot::Mutex;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Callback invoked exactly once with the outcome of a submitted operation.
pub type Completion = Box<dyn FnOnce(Result<(), SessionError>) + Send + 'static>;

type Job<R> = Box<dyn FnOnce(&mut R) -> Result<(), SessionError> + Send + 'static>;

struct Task<R> {
    operation: &'static str,
    job: Job<R>,
    completion: Completion,
}

pub struct Coordinator<R: Send + 'static> {
    resource: Arc<Mutex<R>>,
    running: Arc<AtomicBool>,
    sender: Option<mpsc::Sender<Task<R>>>,
    worker: Option<JoinHandle<()>>,
}

impl<R: Send + 'static> Coordinator<R> {
    /// Take ownership of `resource` and start the worker thread.
    pub fn new(resource: R, thread_name: impl Into<String>) -> Result<Self, SessionError> {
        let resource = Arc::new(Mutex::new(resource));
        let running = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = mpsc::channel::<Task<R>>();

        let worker = {
            let resource = Arc::clone(&resource);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name(thread_name.into())
                .spawn(move || worker_loop(&receiver, &resource, &running))
                .map_err(|err| {
                    warn!(
                        component = "executor",
                        operation = "spawn",
                        status = "error",
                        error = %err,
                        "Failed to start session worker"
                    );
                    SessionError::EngineUnavailable
                })?
        };

        Ok(Self {
            resource,
            running,
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Whether a submitted operation has not finished yet.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Queue `job` on the worker; `completion` receives its result.
    pub fn submit<F>(
        &self,
        operation: &'static str,
        job: F,
        completion: Completion,
    ) -> Result<(), SessionError>
    where
        F: FnOnce(&mut R) -> Result<(), SessionError> + Send + 'static,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(
                component = "executor",
                operation,
                status = "warn",
                "Rejected operation while another is running"
            );
            return Err(SessionError::SolveInProgress { operation });
        }

        let task = Task {
            operation,
            job: Box::new(job),
            completion,
        };
        let sent = self
            .sender
            .as_ref()
            .ok_or(SessionError::EngineUnavailable)
            .and_then(|sender| sender.send(task).map_err(|_| SessionError::EngineUnavailable));
        if let Err(err) = sent {
            self.running.store(false, Ordering::Release);
            return Err(err);
        }

        debug!(
            component = "executor",
            operation,
            status = "start",
            "Submitted background operation"
        );
        Ok(())
    }

    /// Like [`Coordinator::submit`], returning a [`Ticket`] for the result.
    pub fn submit_ticket<F>(&self, operation: &'static str, job: F) -> Result<Ticket, SessionError>
    where
        F: FnOnce(&mut R) -> Result<(), SessionError> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let completion: Completion = Box::new(move |result| {
            // The caller may have dropped the ticket.
            let _ = sender.send(result);
        });
        self.submit(operation, job, completion)?;
        Ok(Ticket {
            operation,
            receiver,
        })
    }

    /// Run `f` on the caller's thread, unless an operation is outstanding.
    pub fn with<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut R) -> T,
    ) -> Result<T, SessionError> {
        if self.is_running() {
            debug!(
                component = "executor",
                operation,
                status = "warn",
                "Rejected call while an operation is running"
            );
            return Err(SessionError::SolveInProgress { operation });
        }
        let mut guard = self.resource.lock();
        Ok(f(&mut *guard))
    }
}

fn worker_loop<R>(receiver: &mpsc::Receiver<Task<R>>, resource: &Mutex<R>, running: &AtomicBool) {
    while let Ok(task) = receiver.recv() {
        let Task {
            operation,
            job,
            completion,
        } = task;

        let result = {
            let mut guard = resource.lock();
            catch_unwind(AssertUnwindSafe(|| job(&mut *guard)))
                .unwrap_or(Err(SessionError::OperationFailed { operation }))
        };
        match &result {
            Ok(()) => debug!(
                component = "executor",
                operation,
                status = "success",
                "Background operation finished"
            ),
            Err(err) => warn!(
                component = "executor",
                operation,
                status = "error",
                error = %err,
                "Background operation failed"
            ),
        }

        running.store(false, Ordering::Release);
        if catch_unwind(AssertUnwindSafe(|| completion(result))).is_err() {
            warn!(
                component = "executor",
                operation,
                status = "error",
                "Completion callback panicked"
            );
        }
    }
}

impl<R: Send + 'static> Drop for Coordinator<R> {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop once the queue drains.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            // A completion callback may drop the last handle on the worker itself.
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

impl<R: Send + 'static> std::fmt::Debug for Coordinator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Handle on the result of a submitted operation.
///
/// Await it from async code, or call [`Ticket::wait`] from a thread that is
/// not driving an async runtime.
#[derive(Debug)]
#[must_use = "dropping a ticket discards the operation's result"]
pub struct Ticket {
    operation: &'static str,
    receiver: oneshot::Receiver<Result<(), SessionError>>,
}

impl Ticket {
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Block the current thread until the operation completes.
    pub fn wait(self) -> Result<(), SessionError> {
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(SessionError::EngineUnavailable))
    }

    /// The result, if the operation has completed.
    pub fn try_result(&mut self) -> Option<Result<(), SessionError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(SessionError::EngineUnavailable)),
        }
    }
}

impl Future for Ticket {
    type Output = Result<(), SessionError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(SessionError::EngineUnavailable)))
    }
}
