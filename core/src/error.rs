//! Error types for the HTTP client engine.
//!
//! # Design
//! A completed HTTP transaction is never an error here, whatever its status
//! code. Every variant below means "no response could be produced", which the
//! C boundary collapses into a null `HttpResponse*`. The variants stay
//! distinct so logs can say why.

use thiserror::Error;

/// Errors returned by `HttpClient::execute` and delivered by `Dispatcher`.
#[derive(Debug, Error)]
pub enum HttpcError {
    /// The method token is not one of GET, DELETE, HEAD, OPTIONS, POST, PUT, PATCH.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// The URL could not be parsed or is not an absolute http(s) URL.
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A request header name or value is not valid on the wire.
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// A boundary caller passed null, inconsistent or non-UTF-8 arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The global request timeout elapsed before the response was read.
    #[error("request timed out")]
    Timeout,

    /// DNS resolution, TCP connect, TLS handshake or socket I/O failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The response body is larger than `ClientConfig::max_body_bytes`.
    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: u64 },

    /// Any other transport-level failure reported by the HTTP stack.
    #[error("transport error: {0}")]
    Transport(String),

    /// The async worker pool could not be created.
    #[error("worker pool unavailable: {0}")]
    Runtime(String),

    /// Request execution panicked on a worker.
    #[error("request worker panicked")]
    Panicked,
}

impl HttpcError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpcError::Timeout)
    }

    pub fn is_connect(&self) -> bool {
        matches!(self, HttpcError::Connection(_))
    }

    /// True when the caller handed us something unusable, as opposed to the
    /// network failing underneath a well-formed request.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            HttpcError::UnsupportedMethod(_)
                | HttpcError::InvalidUrl { .. }
                | HttpcError::InvalidHeader { .. }
                | HttpcError::InvalidArgument(_)
        )
    }
}

impl From<ureq::Error> for HttpcError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Timeout(_) => HttpcError::Timeout,
            ureq::Error::HostNotFound => HttpcError::Connection("host not found".to_owned()),
            ureq::Error::Io(e) => HttpcError::Connection(e.to_string()),
            other => HttpcError::Transport(other.to_string()),
        }
    }
}
