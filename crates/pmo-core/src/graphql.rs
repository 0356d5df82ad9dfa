//! Minimal GraphQL client for the tracker endpoint.
//!
//! Two transports share one envelope parser: `CurlTransport` shells out to
//! `curl` with the payload on stdin, `HttpTransport` uses a blocking reqwest
//! client. Both bound every call with the configured timeout and neither
//! retries.

use crate::config::{Config, TransportKind};
use crate::credentials::KeySource;
use crate::error::{PmoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::time::Duration;
use wait_timeout::ChildExt;

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GraphqlRequest {
    pub query: String,
    pub variables: serde_json::Value,
}

impl GraphqlRequest {
    pub fn new(query: impl Into<String>, variables: serde_json::Value) -> Self {
        Self {
            query: query.into(),
            variables,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    data: Option<serde_json::Value>,
    errors: Option<Vec<GraphqlErrorItem>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorItem {
    message: String,
}

/// Decode a response body into its `data` payload.
pub fn parse_envelope(body: &str) -> Result<serde_json::Value> {
    let envelope: GraphqlEnvelope = serde_json::from_str(body).map_err(|e| {
        PmoError::UnexpectedResponse(format!("{e}: {}", truncate_for_error(body)))
    })?;

    if let Some(errors) = envelope.errors.filter(|e| !e.is_empty()) {
        let message = errors
            .into_iter()
            .map(|error| error.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(PmoError::Graphql(message));
    }

    envelope
        .data
        .ok_or_else(|| PmoError::UnexpectedResponse("response has no data payload".to_string()))
}

fn truncate_for_error(body: &str) -> String {
    const MAX_LEN: usize = 200;
    if body.chars().count() <= MAX_LEN {
        body.to_owned()
    } else {
        format!("{}...", body.chars().take(MAX_LEN).collect::<String>())
    }
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

pub trait GraphqlTransport {
    /// Send one request and return the `data` payload.
    fn execute(&self, request: &GraphqlRequest) -> Result<serde_json::Value>;
}

impl<T: GraphqlTransport + ?Sized> GraphqlTransport for Box<T> {
    fn execute(&self, request: &GraphqlRequest) -> Result<serde_json::Value> {
        (**self).execute(request)
    }
}

/// Resolves the key on first use and reuses it for the rest of the process.
struct LazyKey {
    source: KeySource,
    key: OnceLock<String>,
}

impl LazyKey {
    fn new(source: KeySource) -> Self {
        Self {
            source,
            key: OnceLock::new(),
        }
    }

    fn get(&self) -> Result<&str> {
        if let Some(key) = self.key.get() {
            return Ok(key);
        }
        let resolved = self.source.resolve()?;
        Ok(self.key.get_or_init(|| resolved))
    }
}

// ---------------------------------------------------------------------------
// CurlTransport
// ---------------------------------------------------------------------------

pub struct CurlTransport {
    endpoint: String,
    key: LazyKey,
    timeout: Duration,
    program: String,
}

impl fmt::Debug for CurlTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurlTransport")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CurlTransport {
    pub fn new(endpoint: impl Into<String>, keys: KeySource, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            key: LazyKey::new(keys),
            timeout,
            program: "curl".to_string(),
        }
    }

    fn command(&self, api_key: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-sS", "-X", "POST", &self.endpoint])
            .args(["-H", "Content-Type: application/json"])
            .arg("-H")
            .arg(format!("Authorization: {api_key}"))
            .args(["--data-binary", "@-"]);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl GraphqlTransport for CurlTransport {
    fn execute(&self, request: &GraphqlRequest) -> Result<serde_json::Value> {
        let api_key = self.key.get()?;
        let payload = serde_json::to_vec(request)?;

        let mut child = self
            .command(api_key)
            .spawn()
            .map_err(|e| PmoError::Transport(format!("failed to spawn {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .map_err(|e| PmoError::Transport(format!("failed to write request: {e}")))?;
        }

        // Drain both pipes off-thread so a large response cannot block the
        // child while we wait on it.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(endpoint = %self.endpoint, "curl request timed out");
                return Err(PmoError::Timeout(self.timeout.as_secs()));
            }
        };

        let body = stdout.map(collect).unwrap_or_default();
        if !status.success() {
            let err = stderr.map(collect).unwrap_or_default();
            return Err(PmoError::Transport(format!(
                "curl exited with {status}: {}",
                truncate_for_error(err.trim())
            )));
        }
        parse_envelope(&body)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: std::thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

pub struct HttpTransport {
    endpoint: String,
    key: LazyKey,
    timeout: Duration,
    client: reqwest::blocking::Client,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, keys: KeySource, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("pmo/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| PmoError::Transport(format!("failed to initialise HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            key: LazyKey::new(keys),
            timeout,
            client,
        })
    }
}

impl GraphqlTransport for HttpTransport {
    fn execute(&self, request: &GraphqlRequest) -> Result<serde_json::Value> {
        let api_key = self.key.get()?;
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", api_key)
            .json(request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    PmoError::Timeout(self.timeout.as_secs())
                } else {
                    PmoError::Transport(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| PmoError::Transport(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(PmoError::Transport(format!(
                "endpoint returned HTTP {status}: {}",
                truncate_for_error(&body)
            )));
        }
        parse_envelope(&body)
    }
}

/// Transport selected by `remote.transport`.
pub fn build_transport(config: &Config) -> Result<Box<dyn GraphqlTransport>> {
    let keys = KeySource::from_config(&config.credentials);
    let timeout = Duration::from_secs(config.remote.timeout_secs.max(1));
    let endpoint = config.remote.endpoint.clone();
    Ok(match config.remote.transport {
        TransportKind::Curl => Box::new(CurlTransport::new(endpoint, keys, timeout)),
        TransportKind::Http => Box::new(HttpTransport::new(endpoint, keys, timeout)?),
    })
}
