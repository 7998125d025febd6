use crate::config::RelayConfig;
use crate::envelope::unwrap_latest;
use crate::transport::{HttpTransport, RelayTransport, TransportError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tandem_core::RelayTopic;
use tracing::{debug, info, warn};

/// Publishes and fetches JSON blobs by topic against a public,
/// last-write-wins key-value relay.
///
/// Nothing here raises: failures come back as `false` or `None` after
/// being logged. A fetch never reflects more than the newest publish to
/// a topic, and may lag behind it.
#[derive(Clone)]
pub struct RelayClient {
    config: RelayConfig,
    transport: Arc<dyn RelayTransport>,
}

impl RelayClient {
    pub fn new(config: RelayConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config.request_timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: RelayConfig, transport: Arc<dyn RelayTransport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub async fn publish<T: Serialize + ?Sized>(&self, topic: &RelayTopic, payload: &T) -> bool {
        let body = match serde_json::to_value(payload) {
            Ok(body) => body,
            Err(e) => {
                warn!(%topic, error = %e, "payload is not JSON-serialisable; not publishing");
                return false;
            }
        };

        let url = self.config.publish_url(topic.as_str());
        let result = match self.transport.post_json(&url, &body).await {
            Err(TransportError::Network(reason)) => match self.config.proxied(&url) {
                Some(proxied) => {
                    warn!(%topic, %reason, "relay unreachable; retrying publish through proxy");
                    self.transport.post_json(&proxied, &body).await
                }
                None => Err(TransportError::Network(reason)),
            },
            other => other,
        };

        match result {
            Ok(()) => {
                debug!(%topic, "published");
                true
            }
            Err(e) => {
                warn!(%topic, error = %e, "publish failed");
                false
            }
        }
    }

    /// One attempt at reading the newest value for `topic`.
    pub async fn fetch<T: DeserializeOwned>(&self, topic: &RelayTopic) -> Option<T> {
        let url = self.config.fetch_url(topic.as_str());
        let result = match self.transport.get_json(&url).await {
            Err(TransportError::Network(reason)) => match self.config.proxied(&url) {
                Some(proxied) => {
                    warn!(%topic, %reason, "relay unreachable; retrying fetch through proxy");
                    self.transport.get_json(&proxied).await
                }
                None => Err(TransportError::Network(reason)),
            },
            other => other,
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                debug!(%topic, error = %e, "fetch failed");
                return None;
            }
        };

        let Some(content) = unwrap_latest(response) else {
            debug!(%topic, "relay has nothing for topic");
            return None;
        };
        decode_content(topic, content)
    }

    /// Polls `topic` until a value decodes or `max_attempts` are spent,
    /// sleeping a fixed `delay` between attempts.
    pub async fn fetch_with_retry<T: DeserializeOwned>(
        &self,
        topic: &RelayTopic,
        max_attempts: u32,
        delay: Duration,
    ) -> Option<T> {
        for attempt in 1..=max_attempts {
            if let Some(value) = self.fetch(topic).await {
                info!(%topic, attempt, "fetched");
                return Some(value);
            }
            debug!(%topic, attempt, max_attempts, "attempt found nothing");
            if attempt < max_attempts {
                tokio::time::sleep(delay).await;
            }
        }

        warn!(%topic, max_attempts, "giving up on topic");
        None
    }
}

fn decode_content<T: DeserializeOwned>(topic: &RelayTopic, content: Value) -> Option<T> {
    match serde_json::from_value(content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(%topic, error = %e, "relay content has unexpected shape");
            None
        }
    }
}
