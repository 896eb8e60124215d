//! HTTP Transport over a Pooled `ureq` Session
//!
//! ## Overview
//!
//! Implements the core [`Transport`] seam with plain synchronous HTTP(S).
//! One `ureq` agent is built at construction and reused for every request,
//! so TCP connections and TLS sessions are pooled across ticks instead of
//! being re-established per packet.
//!
//! ## Error Mapping
//!
//! The core distinguishes three request failure modes and reacts to each
//! differently, so `ureq` errors are mapped carefully:
//!
//! | `ureq` failure                  | core error                  |
//! |---------------------------------|-----------------------------|
//! | transport, I/O kind (timeouts)  | `TransportError::OutOfRetries` |
//! | transport, any other kind       | `TransportError::Transport` |
//! | status >= 400                   | `TransportError::Status`    |
//! | body unreadable after success   | `TransportError::Transport` |
//!
//! I/O-kind failures land on `OutOfRetries` because with a per-request
//! timeout configured they mean the session kept the link but gave up
//! waiting, which the delivery channel treats as worth backing off and
//! retrying. Everything else transport-shaped means the link itself is
//! suspect and triggers reassociation.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use airlift_core::{Transport, TransportError};

use crate::ConnectionStats;

/// HTTP configuration errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Configuration rejected at construction
    #[error("configuration error: {0}")]
    Config(String),
}

/// Authentication methods
#[derive(Clone)]
pub enum AuthMethod {
    /// No authentication
    None,
    /// Bearer token
    Bearer(String),
    /// API key in a named header
    ApiKey {
        /// Header name carrying the key
        header: String,
        /// The key itself
        value: String,
    },
}

/// HTTP transport configuration
#[derive(Clone)]
pub struct HttpConfig {
    /// Base URL of the collector
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Authentication method
    pub auth: AuthMethod,
    /// Custom headers added to every request
    pub headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl HttpConfig {
    /// Create a configuration for the given collector base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(5),
            auth: AuthMethod::None,
            headers: HashMap::new(),
            user_agent: format!("airlift/{}", airlift_core::VERSION),
        }
    }

    /// Set bearer token authentication
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthMethod::Bearer(token.into());
        self
    }

    /// Set API key authentication
    pub fn api_key(mut self, header: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth = AuthMethod::ApiKey {
            header: header.into(),
            value: value.into(),
        };
        self
    }

    /// Set the per-request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Add a custom header to every request
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Synchronous HTTP transport over a pooled `ureq` agent
pub struct HttpTransport {
    config: HttpConfig,
    agent: ureq::Agent,
    stats: ConnectionStats,
}

impl HttpTransport {
    /// Build the transport, validating the configuration
    pub fn new(config: HttpConfig) -> Result<Self, HttpError> {
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(HttpError::Config(
                "base URL must start with http:// or https://".into(),
            ));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();

        Ok(Self {
            config,
            agent,
            stats: ConnectionStats::default(),
        })
    }

    /// Join a path onto the configured base URL
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Request-level statistics
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Apply authentication and standing headers
    fn build_request(&self, mut request: ureq::Request) -> ureq::Request {
        match &self.config.auth {
            AuthMethod::None => {}
            AuthMethod::Bearer(token) => {
                request = request.set("Authorization", &format!("Bearer {token}"));
            }
            AuthMethod::ApiKey { header, value } => {
                request = request.set(header, value);
            }
        }

        for (name, value) in &self.config.headers {
            request = request.set(name, value);
        }

        request.set("Accept", "application/json")
    }
}

/// Map a `ureq` failure onto the core error taxonomy
fn map_error(error: ureq::Error) -> TransportError {
    match error {
        ureq::Error::Status(code, _) => TransportError::Status(code),
        ureq::Error::Transport(transport) => {
            if matches!(transport.kind(), ureq::ErrorKind::Io) {
                TransportError::OutOfRetries
            } else {
                TransportError::Transport
            }
        }
    }
}

impl Transport for HttpTransport {
    fn get(&mut self, url: &str) -> Result<String, TransportError> {
        let request = self.build_request(self.agent.get(url));

        match request.call() {
            Ok(response) => {
                let body = response.into_string().map_err(|e| {
                    log::warn!("http: response body unreadable: {e}");
                    self.stats.requests_failed += 1;
                    TransportError::Transport
                })?;
                self.stats.requests_ok += 1;
                Ok(body)
            }
            Err(e) => {
                log::debug!("http: GET {url} failed: {e}");
                self.stats.requests_failed += 1;
                Err(map_error(e))
            }
        }
    }

    fn post(&mut self, url: &str, body: &[u8]) -> Result<(), TransportError> {
        let request = self
            .build_request(self.agent.post(url))
            .set("Content-Type", "application/json");

        match request.send_bytes(body) {
            Ok(_) => {
                self.stats.requests_ok += 1;
                self.stats.bytes_sent += body.len() as u64;
                Ok(())
            }
            Err(e) => {
                log::debug!("http: POST {url} failed: {e}");
                self.stats.requests_failed += 1;
                Err(map_error(e))
            }
        }
    }
}
