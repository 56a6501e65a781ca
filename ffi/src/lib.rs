//! C-ABI wrapper around `httpc-core`.
//!
//! # Overview
//! Exports three functions with the layouts declared in `include/httpc.h`:
//! - `httpc` runs one request on the calling thread and returns the response,
//!   or null when no response could be obtained.
//! - `httpc_async` copies its arguments, queues the request, and returns at
//!   once. The callback later runs exactly once on a worker thread with the
//!   response (or null) and the caller's context pointer.
//! - `httpc_free` releases a response and everything it owns; null is a no-op.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - One process-wide engine (client + dispatcher) is built lazily from
//!   `ClientConfig::from_env()` and never mutated afterwards.
//! - Any status code is a non-null response. Transport failures and
//!   malformed arguments both surface as null.
//! - The context pointer is never dereferenced, only handed back.

pub mod logging;
pub mod marshal;
pub mod types;

use std::ffi::c_void;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::{Arc, OnceLock};

use httpc_core::{ClientConfig, Dispatcher, HttpClient, HttpRequest, HttpcError, Outcome};

use marshal::MarshalError;
use types::*;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct Engine {
    client: Arc<HttpClient>,
    dispatcher: Option<Dispatcher>,
}

static ENGINE: OnceLock<Engine> = OnceLock::new();

fn engine() -> &'static Engine {
    ENGINE.get_or_init(|| {
        logging::init();
        let config = ClientConfig::from_env();
        tracing::debug!(?config, "initialising httpc engine");

        let client = Arc::new(HttpClient::new(config));
        let dispatcher = match Dispatcher::new(Arc::clone(&client)) {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::error!(error = %e, "async dispatch unavailable");
                None
            }
        };
        Engine { client, dispatcher }
    })
}

/// Caller-owned context pointer, carried to the callback untouched.
struct Context(*mut c_void);

// The engine never dereferences the pointer; it only moves it to the worker
// that invokes the callback.
unsafe impl Send for Context {}

impl Context {
    fn as_ptr(&self) -> *mut c_void {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Exported functions
// ---------------------------------------------------------------------------

/// Send an HTTP request and block until the response has been read.
///
/// `headers` and `body` may be null. Returns null if no response could be
/// obtained (malformed arguments, DNS/connect/TLS failure, timeout). Any
/// received status code, 4xx and 5xx included, yields a non-null response.
/// The caller must release the result with `httpc_free`.
#[unsafe(no_mangle)]
pub extern "C" fn httpc(
    method: *const c_char,
    url: *const c_char,
    headers: *const FfiHeaders,
    body: *const c_char,
) -> *mut FfiHttpResponse {
    catch_unwind(|| {
        let request = match unsafe { marshal::read_request(method, url, headers, body) } {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "httpc: rejected arguments");
                return ptr::null_mut();
            }
        };
        match engine().client.execute(&request) {
            Ok(resp) => FfiHttpResponse::from_core(resp),
            Err(_) => ptr::null_mut(),
        }
    })
    .unwrap_or_else(|_| {
        tracing::error!("httpc: panic while executing request");
        ptr::null_mut()
    })
}

/// Send an HTTP request without blocking.
///
/// All arguments are copied before this returns, so the caller may free them
/// immediately. `callback(response, context)` is invoked exactly once, on a
/// worker thread, after the request finishes; `response` follows the same
/// null/non-null rule as `httpc` and must be released with `httpc_free`.
/// Malformed arguments still produce one callback, with a null response.
/// A null `callback` makes this call a no-op.
#[unsafe(no_mangle)]
pub extern "C" fn httpc_async(
    callback: FfiHttpCallback,
    context: *mut c_void,
    method: *const c_char,
    url: *const c_char,
    headers: *const FfiHeaders,
    body: *const c_char,
) {
    let Some(callback) = callback else {
        tracing::warn!("httpc_async: null callback, request dropped");
        return;
    };
    let context = Context(context);

    let request = catch_unwind(|| unsafe { marshal::read_request(method, url, headers, body) })
        .unwrap_or(Err(MarshalError::Panicked));

    let on_complete = move |outcome: Outcome| {
        let response = match outcome {
            Ok(resp) => FfiHttpResponse::from_core(resp),
            Err(_) => ptr::null_mut(),
        };
        unsafe { callback(response, context.as_ptr()) };
    };

    // Resolve the engine before `on_complete` moves anywhere, so a panic
    // during initialisation cannot swallow the callback.
    let resolved = match catch_unwind(engine) {
        Ok(e) => Some(e),
        Err(_) => {
            tracing::error!("httpc_async: panic while initialising engine");
            None
        }
    };

    let submitted = catch_unwind(AssertUnwindSafe(|| dispatch(resolved, request, on_complete)));
    if submitted.is_err() {
        tracing::error!("httpc_async: panic while submitting request");
    }
}

/// Route one async submission: queue it, reject it through the pool, or fall
/// back to a dedicated thread when there is no pool. `on_complete` runs
/// exactly once in every case.
fn dispatch<F>(engine: Option<&Engine>, request: Result<HttpRequest, MarshalError>, on_complete: F)
where
    F: FnOnce(Outcome) + Send + 'static,
{
    let Some(dispatcher) = engine.and_then(|e| e.dispatcher.as_ref()) else {
        deliver_on_thread(on_complete, HttpcError::Runtime("no worker pool".to_string()));
        return;
    };
    match request {
        Ok(request) => {
            dispatcher.submit(request, on_complete);
        }
        Err(e) => {
            tracing::warn!(error = %e, "httpc_async: rejected arguments");
            dispatcher.reject(e.into(), on_complete);
        }
    }
}

/// Free an `HttpResponse` returned by `httpc` or passed to an `httpc_async`
/// callback, including its body, content type, header list and every header
/// string. Safe to call with null. Calling it twice on the same pointer is
/// undefined.
#[unsafe(no_mangle)]
pub extern "C" fn httpc_free(resp: *mut FfiHttpResponse) {
    if resp.is_null() {
        return;
    }
    let _ = catch_unwind(|| unsafe { FfiHttpResponse::free(resp) });
}

/// Last-resort delivery when the worker pool could not be created: a
/// dedicated thread keeps the callback off the submitting thread.
fn deliver_on_thread<F>(on_complete: F, error: HttpcError)
where
    F: FnOnce(Outcome) + Send + 'static,
{
    let slot = Arc::new(std::sync::Mutex::new(Some((on_complete, error))));
    let worker_slot = Arc::clone(&slot);
    let spawned = std::thread::Builder::new()
        .name("httpc-fallback".to_string())
        .spawn(move || {
            if let Some((f, e)) = worker_slot.lock().ok().and_then(|mut s| s.take()) {
                f(Err(e));
            }
        });
    if let Err(e) = spawned {
        tracing::error!(error = %e, "could not spawn fallback thread, completing inline");
        if let Some((f, e)) = slot.lock().ok().and_then(|mut s| s.take()) {
            f(Err(e));
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
