//! Client configuration.
//!
//! Built once per process and read-only afterwards. Defaults can be
//! overridden through `HTTPC_*` environment variables via
//! [`ClientConfig::from_env`].

use std::str::FromStr;
use std::time::Duration;

pub const ENV_TIMEOUT_SECS: &str = "HTTPC_TIMEOUT_SECS";
pub const ENV_MAX_REDIRECTS: &str = "HTTPC_MAX_REDIRECTS";
pub const ENV_USER_AGENT: &str = "HTTPC_USER_AGENT";
pub const ENV_MAX_BODY_BYTES: &str = "HTTPC_MAX_BODY_BYTES";
pub const ENV_MAX_WORKERS: &str = "HTTPC_MAX_WORKERS";

/// Configuration shared by the sync client and the async dispatcher.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound on one request, connect through last body byte.
    pub timeout: Duration,

    /// Redirects followed before giving up; 0 disables following.
    pub max_redirects: u32,

    /// Sent unless the caller supplies its own `User-Agent`.
    pub user_agent: String,

    /// Larger response bodies fail the request.
    pub max_body_bytes: u64,

    /// Upper bound on concurrently executing async requests.
    pub max_workers: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_redirects: 10,
            user_agent: format!("httpc/{}", env!("CARGO_PKG_VERSION")),
            max_body_bytes: 10 * 1024 * 1024,
            max_workers: 64,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with `HTTPC_*` overrides applied from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides taken from `lookup`. Unparsable values are
    /// logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(secs) = parse_var::<f64>(&lookup, ENV_TIMEOUT_SECS) {
            match Duration::try_from_secs_f64(secs) {
                Ok(timeout) if !timeout.is_zero() => config.timeout = timeout,
                _ => tracing::warn!(key = ENV_TIMEOUT_SECS, secs, "ignoring non-positive timeout"),
            }
        }
        if let Some(n) = parse_var(&lookup, ENV_MAX_REDIRECTS) {
            config.max_redirects = n;
        }
        if let Some(ua) = lookup(ENV_USER_AGENT).filter(|s| !s.trim().is_empty()) {
            config.user_agent = ua;
        }
        if let Some(n) = parse_var(&lookup, ENV_MAX_BODY_BYTES) {
            config.max_body_bytes = n;
        }
        if let Some(n) = parse_var::<usize>(&lookup, ENV_MAX_WORKERS) {
            config.max_workers = n.max(1);
        }
        config
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = max;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_redirects, 10);
        assert!(config.user_agent.starts_with("httpc/"));
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_workers, 64);
    }

    #[test]
    fn overrides_are_applied() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_TIMEOUT_SECS, "2.5"),
            (ENV_MAX_REDIRECTS, "0"),
            (ENV_USER_AGENT, "custom-agent/1"),
            (ENV_MAX_BODY_BYTES, "1024"),
            (ENV_MAX_WORKERS, "4"),
        ]));
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.max_redirects, 0);
        assert_eq!(config.user_agent, "custom-agent/1");
        assert_eq!(config.max_body_bytes, 1024);
        assert_eq!(config.max_workers, 4);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_TIMEOUT_SECS, "-3"),
            (ENV_MAX_REDIRECTS, "many"),
            (ENV_USER_AGENT, "   "),
            (ENV_MAX_WORKERS, "0"),
        ]));
        let defaults = ClientConfig::default();
        assert_eq!(config.timeout, defaults.timeout);
        assert_eq!(config.max_redirects, defaults.max_redirects);
        assert_eq!(config.user_agent, defaults.user_agent);
        assert_eq!(config.max_workers, 1);
    }

    #[test]
    fn builder_pattern() {
        let config = ClientConfig::new()
            .timeout(Duration::from_secs(5))
            .max_workers(0)
            .user_agent("x");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_workers, 1);
        assert_eq!(config.user_agent, "x");
    }
}
