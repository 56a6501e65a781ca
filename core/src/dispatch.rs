//! Asynchronous dispatch of requests onto a bounded worker pool.
//!
//! # Design
//! `Dispatcher` owns a tokio runtime and uses only its blocking pool: each
//! submitted request becomes one `spawn_blocking` task that runs the blocking
//! `HttpClient` and then calls the completion closure on that worker thread.
//! The pool is capped by `ClientConfig::max_workers`; further submissions
//! wait in the runtime's queue without blocking the submitter.
//!
//! Every accepted submission completes exactly once. The completion closure
//! lives in a `Completion` guard that fires a failure from `Drop` if the task
//! is discarded before it ran, e.g. during runtime shutdown.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::client::{next_request_id, HttpClient};
use crate::error::HttpcError;
use crate::http::{HttpRequest, HttpResponse, RequestState};

pub type Outcome = Result<HttpResponse, HttpcError>;

/// Runs requests on worker threads and reports each result exactly once.
#[derive(Debug)]
pub struct Dispatcher {
    runtime: Runtime,
    client: Arc<HttpClient>,
}

impl Dispatcher {
    pub fn new(client: Arc<HttpClient>) -> Result<Self, HttpcError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(client.config().max_workers.max(1))
            .thread_name("httpc-worker")
            .build()
            .map_err(|e| HttpcError::Runtime(e.to_string()))?;
        Ok(Self { runtime, client })
    }

    /// Queue `request` and return its log id immediately. `on_complete`
    /// runs later on a worker thread, never inside this call.
    pub fn submit<F>(&self, request: HttpRequest, on_complete: F) -> u64
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let id = next_request_id();
        tracing::debug!(id, state = %RequestState::Pending, method = %request.method, "request");

        let client = Arc::clone(&self.client);
        let completion = Completion::new(id, on_complete);
        self.runtime.spawn_blocking(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                client.execute_with_id(id, &request)
            }))
            .unwrap_or_else(|_| {
                tracing::error!(id, "request worker panicked");
                Err(HttpcError::Panicked)
            });
            completion.complete(outcome);
        });
        id
    }

    /// Deliver `error` through the same worker path as `submit`, for
    /// submissions that were rejected before a request could be built.
    pub fn reject<F>(&self, error: HttpcError, on_complete: F) -> u64
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let id = next_request_id();
        tracing::debug!(id, state = %RequestState::Failed, error = %error, "request rejected");

        let completion = Completion::new(id, on_complete);
        self.runtime.spawn_blocking(move || completion.complete(Err(error)));
        id
    }
}

/// Holds a completion closure until it has been called once.
struct Completion<F>
where
    F: FnOnce(Outcome),
{
    id: u64,
    on_complete: Option<F>,
}

impl<F> Completion<F>
where
    F: FnOnce(Outcome),
{
    fn new(id: u64, on_complete: F) -> Self {
        Self {
            id,
            on_complete: Some(on_complete),
        }
    }

    fn complete(mut self, outcome: Outcome) {
        if let Some(f) = self.on_complete.take() {
            f(outcome);
        }
    }
}

impl<F> Drop for Completion<F>
where
    F: FnOnce(Outcome),
{
    fn drop(&mut self) {
        if let Some(f) = self.on_complete.take() {
            tracing::warn!(id = self.id, "request dropped before running");
            f(Err(HttpcError::Runtime("request dropped before running".to_string())));
        }
    }
}
