//! HTTP(S) client engine behind the `httpc` C ABI.
//!
//! # Overview
//! Executes one request at a time against a remote server and reports the
//! completed transaction (any status code) or a failure to obtain one. The
//! same executor backs both the blocking path and the worker-pool path.
//!
//! # Design
//! - `HttpClient` wraps a shared `ureq::Agent`; 4xx/5xx are data, not errors.
//! - `Target` strips URL userinfo into a `Basic` authorization value; a
//!   caller-supplied `Authorization` header takes precedence.
//! - `Dispatcher` runs requests on a bounded blocking pool and calls each
//!   completion closure exactly once, on a worker thread.
//! - All types own their data so a request can outlive the caller's buffers.
//!   Raw pointers and C layouts live in the `httpc-ffi` crate only.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod target;

pub use client::HttpClient;
pub use config::ClientConfig;
pub use dispatch::{Dispatcher, Outcome};
pub use error::HttpcError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestState};
pub use target::{join_url, Target};
