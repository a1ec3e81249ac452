//! Rate-limited request layer.
//!
//! Every call sleeps before the attempt, throttling responses (429/403) are
//! retried forever with an escalating delay, and credential rejections
//! (401/400) surface as a terminal [`ClientError::Authentication`] that is
//! never retried. The wall-clock sleep is the backpressure protecting the
//! remote API; callers are expected to run strictly sequentially.

mod transport;

pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, RequestMethod};

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

/// Default seconds to wait before each request.
pub const DEFAULT_REQUEST_DELAY_SECS: u64 = 1;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Credentials were rejected. Terminal: callers must abort the batch.
    #[error("authentication rejected with status {status}")]
    Authentication { status: u16, body: String },

    /// Any other non-success, non-throttling status.
    #[error("request failed with status {status}")]
    Status { status: u16 },

    /// The request never produced a response (connect/TLS/read failure).
    #[error("transport failure: {0}")]
    Transport(#[source] anyhow::Error),

    /// A 2xx response whose body was not the expected JSON.
    #[error("invalid JSON in response body: {0}")]
    InvalidBody(#[source] serde_json::Error),
}

impl ClientError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, ClientError::Authentication { .. })
    }
}

/// HTTP client enforcing a mandatory inter-request delay.
pub struct RateLimitedClient {
    transport: Arc<dyn HttpTransport>,
    base_delay_secs: u64,
}

impl RateLimitedClient {
    pub fn new(transport: Arc<dyn HttpTransport>, base_delay_secs: u64) -> Self {
        Self {
            transport,
            base_delay_secs,
        }
    }

    pub async fn get(&self, url: &str) -> Result<Value, ClientError> {
        self.request(RequestMethod::Get, url, None).await
    }

    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value, ClientError> {
        self.request(RequestMethod::Post, url, body).await
    }

    /// Issue a request, retrying on throttling.
    ///
    /// The delay starts at the configured base for every new request and only
    /// escalates while the server keeps throttling: below 10 seconds it grows
    /// by 5, above it doubles. Throttling retries are unbounded; the remote
    /// limit is assumed transient.
    pub async fn request(
        &self,
        method: RequestMethod,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let mut delay = self.base_delay_secs;
        loop {
            tokio::time::sleep(Duration::from_secs(delay)).await;
            let response = self
                .transport
                .send(method, url, body)
                .await
                .map_err(ClientError::Transport)?;
            match response.status {
                401 | 400 => {
                    error!(
                        "authentication rejected (status {}): {}",
                        response.status, response.body
                    );
                    return Err(ClientError::Authentication {
                        status: response.status,
                        body: response.body,
                    });
                }
                429 | 403 => {
                    delay = if delay > 10 { delay * 2 } else { delay + 5 };
                    warn!("rate limit exceeded, retrying in {}s", delay);
                }
                _ if response.is_success() => {
                    if response.body.trim().is_empty() {
                        return Ok(Value::Null);
                    }
                    return serde_json::from_str(&response.body).map_err(ClientError::InvalidBody);
                }
                status => {
                    return Err(ClientError::Status { status });
                }
            }
        }
    }
}
