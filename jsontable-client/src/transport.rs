/// Transport abstraction and the reqwest-backed HTTP implementation

use crate::envelope::{Action, ACTION};
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use jsontable_core::{ClientConfig, RetryPolicy};
use reqwest::Url;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// A decoded JSON response body
pub type JsonObject = Map<String, Value>;

/// HTTP verb used to deliver an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// Envelope members become query-string parameters
    Get,
    /// Envelope is sent as the JSON request body
    Post,
}

/// Executes one request against an endpoint and returns the decoded body.
///
/// Retries, if any, happen inside the transport and are invisible to callers.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, endpoint: &Url, method: HttpMethod, envelope: &JsonObject) -> Result<JsonObject>;
}

/// HTTP transport with basic auth, request timeout and exponential backoff.
///
/// Reads are retried on any transient failure. Writes are retried only when
/// the service explicitly refused them (429, 503), so a timed-out insert is
/// never sent twice.
pub struct HttpTransport {
    client: reqwest::Client,
    username: Option<String>,
    password: Option<String>,
    retry: RetryPolicy,
}

impl HttpTransport {
    /// Build a transport from configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .build()
            .map_err(|e| ClientError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            username: config.username.clone(),
            password: config.password.clone(),
            retry: config.retry.clone(),
        })
    }

    async fn send_once(&self, endpoint: &Url, method: HttpMethod, envelope: &JsonObject) -> Result<JsonObject> {
        let mut request = match method {
            HttpMethod::Post => self.client.post(endpoint.clone()).json(envelope),
            HttpMethod::Get => {
                let pairs: Vec<(&str, String)> = envelope
                    .iter()
                    .map(|(k, v)| match v {
                        Value::String(s) => (k.as_str(), s.clone()),
                        other => (k.as_str(), other.to_string()),
                    })
                    .collect();
                self.client.get(endpoint.clone()).query(&pairs)
            }
        };
        if let Some(user) = &self.username {
            request = request.basic_auth(user, self.password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        match response.json::<Value>().await? {
            Value::Object(obj) => Ok(obj),
            other => Err(ClientError::MalformedResponse(format!(
                "expected a JSON object, got: {}",
                truncate(&other.to_string(), 200)
            ))),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, endpoint: &Url, method: HttpMethod, envelope: &JsonObject) -> Result<JsonObject> {
        let idempotent = is_idempotent(envelope);
        let mut attempt = 0;
        loop {
            match self.send_once(endpoint, method, envelope).await {
                Ok(obj) => {
                    debug!(%endpoint, attempts = attempt + 1, "request completed");
                    return Ok(obj);
                }
                Err(e) if retryable(&e, idempotent) && self.retry.should_retry(attempt) => {
                    let backoff = self.retry.backoff_duration(attempt);
                    warn!(
                        %endpoint,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Unknown actions count as writes
fn is_idempotent(envelope: &JsonObject) -> bool {
    envelope
        .get(ACTION)
        .and_then(Value::as_str)
        .and_then(Action::parse)
        .map_or(false, |action| action.is_idempotent())
}

fn retryable(error: &ClientError, idempotent: bool) -> bool {
    if idempotent {
        error.is_retryable()
    } else {
        error.is_retryable_write()
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
