//! Blocking request executor backed by a shared `ureq::Agent`.
//!
//! # Design
//! `HttpClient` owns one agent (connection pool and TLS configuration) built
//! from `ClientConfig`, and is shared by reference between the synchronous
//! path and every async worker. `execute` never turns a status code into an
//! error: a 404 or 503 is returned as a normal `HttpResponse`, and only a
//! failure to complete the transaction produces `Err`.

use std::io::Read as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderName, HeaderValue};

use crate::config::ClientConfig;
use crate::error::HttpcError;
use crate::http::{HttpRequest, HttpResponse, RequestState};
use crate::target::Target;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id used to correlate log events of one request.
pub(crate) fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// Executes HTTP(S) requests on the calling thread.
#[derive(Debug)]
pub struct HttpClient {
    agent: ureq::Agent,
    config: ClientConfig,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .max_redirects(config.max_redirects)
            .user_agent(config.user_agent.as_str())
            // Status codes are data, not errors.
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Perform one request, blocking until the response body has been read.
    pub fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, HttpcError> {
        self.execute_with_id(next_request_id(), request)
    }

    pub(crate) fn execute_with_id(
        &self,
        id: u64,
        request: &HttpRequest,
    ) -> Result<HttpResponse, HttpcError> {
        let started = Instant::now();
        tracing::debug!(id, state = %RequestState::Executing, method = %request.method, "request");

        let result = self.run(request);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(resp) => tracing::debug!(
                id,
                state = %RequestState::Completed,
                status = resp.status,
                body_len = resp.body.len(),
                elapsed_ms,
                "request"
            ),
            Err(e) => tracing::warn!(
                id,
                state = %RequestState::Failed,
                error = %e,
                timeout = e.is_timeout(),
                connect = e.is_connect(),
                invalid_input = e.is_invalid_input(),
                elapsed_ms,
                "request"
            ),
        }
        result
    }

    fn run(&self, request: &HttpRequest) -> Result<HttpResponse, HttpcError> {
        let target = Target::parse(&request.url)?;
        // Userinfo is already stripped, so the target is safe to log.
        tracing::trace!(url = target.as_str(), "resolved request target");

        let mut builder = http::Request::builder()
            .method(http::Method::from(request.method))
            .uri(target.as_str());

        // `HeaderMap` keeps repeated names in caller order but groups them,
        // so order across different names follows the map.
        for (name, value) in &request.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| HttpcError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_bytes(value.as_bytes()).map_err(|e| HttpcError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            builder = builder.header(header_name, header_value);
        }

        // Caller-supplied Authorization wins over URL userinfo.
        if let Some(basic) = target.basic_auth() {
            if !request.has_header(AUTHORIZATION.as_str()) {
                builder = builder.header(AUTHORIZATION, basic);
            }
        }

        let result = if request.method.carries_body() {
            let body = request.body.clone().unwrap_or_default().into_bytes();
            let req = builder.body(body).map_err(build_error)?;
            self.agent.run(req)
        } else {
            if request.body.is_some() {
                tracing::debug!(method = %request.method, "ignoring request body for method without body");
            }
            let req = builder.body(()).map_err(build_error)?;
            self.agent.run(req)
        };

        let response = result.map_err(HttpcError::from)?;
        read_response(response, self.config.max_body_bytes)
    }
}

fn build_error(err: http::Error) -> HttpcError {
    HttpcError::Transport(format!("could not build request: {err}"))
}

/// Drain a ureq response into an owned `HttpResponse`.
fn read_response(
    response: http::Response<ureq::Body>,
    limit: u64,
) -> Result<HttpResponse, HttpcError> {
    let (parts, body) = response.into_parts();

    let mut bytes = Vec::new();
    body.into_reader()
        .take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::TimedOut => HttpcError::Timeout,
            _ => HttpcError::Connection(e.to_string()),
        })?;
    if bytes.len() as u64 > limit {
        return Err(HttpcError::BodyTooLarge { limit });
    }

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    let headers = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    Ok(HttpResponse {
        status: parts.status.as_u16(),
        content_type,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    fn client() -> HttpClient {
        HttpClient::new(ClientConfig::default())
    }

    #[test]
    fn request_ids_are_unique() {
        let a = next_request_id();
        let b = next_request_id();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_url_fails_without_network() {
        let req = HttpRequest::new(HttpMethod::Get, "::not-a-url::");
        let err = client().execute(&req).unwrap_err();
        assert!(matches!(err, HttpcError::InvalidUrl { .. }));
    }

    #[test]
    fn unsupported_scheme_fails_without_network() {
        let req = HttpRequest::new(HttpMethod::Get, "gopher://example.com/");
        let err = client().execute(&req).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn invalid_header_name_fails_without_network() {
        let req = HttpRequest::new(HttpMethod::Get, "http://127.0.0.1:9/").header("Bad Name", "x");
        let err = client().execute(&req).unwrap_err();
        assert!(matches!(err, HttpcError::InvalidHeader { ref name, .. } if name == "Bad Name"));
    }

    #[test]
    fn invalid_header_value_fails_without_network() {
        let req = HttpRequest::new(HttpMethod::Get, "http://127.0.0.1:9/").header("X-Bad", "a\r\nb");
        let err = client().execute(&req).unwrap_err();
        assert!(matches!(err, HttpcError::InvalidHeader { .. }));
    }

    #[test]
    fn config_is_kept() {
        let c = HttpClient::new(ClientConfig::default().max_body_bytes(7));
        assert_eq!(c.config().max_body_bytes, 7);
    }
}
