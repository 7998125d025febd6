use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response: refused, reset, timed out.
    #[error("network failure: {0}")]
    Network(String),
    /// The relay answered with a non-success status.
    #[error("relay responded with HTTP {0}")]
    Status(u16),
    /// The relay answered but the body was not JSON.
    #[error("unreadable response body: {0}")]
    Body(String),
}

/// The HTTP surface the relay client needs. Implemented over reqwest in
/// production and by scripted fakes in tests.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<(), TransportError>;

    async fn get_json(&self, url: &str) -> Result<Value, TransportError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RelayTransport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<(), TransportError> {
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = resp.status();
        debug!(url, %status, "relay POST");
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(())
    }

    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = resp.status();
        debug!(url, %status, "relay GET");
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))
    }
}
