use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_RELAY_URL: &str = "https://dweet.io";
pub const DEFAULT_PROXY_PREFIX: &str = "https://corsproxy.io/?url=";

/// Where the relay lives and how to reach it when it cannot be reached
/// directly.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub base_url: String,
    /// Prepended to the percent-encoded target URL for the single
    /// fallback attempt. `None` disables the fallback.
    pub proxy_prefix: Option<String>,
    #[serde(with = "millis")]
    pub request_timeout: Duration,
}

impl RelayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn without_proxy(mut self) -> Self {
        self.proxy_prefix = None;
        self
    }

    pub fn with_proxy(mut self, prefix: impl Into<String>) -> Self {
        self.proxy_prefix = Some(prefix.into());
        self
    }

    pub(crate) fn publish_url(&self, topic: &str) -> String {
        format!("{}/dweet/for/{}", self.base_url.trim_end_matches('/'), topic)
    }

    pub(crate) fn fetch_url(&self, topic: &str) -> String {
        format!(
            "{}/get/latest/dweet/for/{}",
            self.base_url.trim_end_matches('/'),
            topic
        )
    }

    pub(crate) fn proxied(&self, target: &str) -> Option<String> {
        let prefix = self.proxy_prefix.as_deref()?;
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
        Some(format!("{prefix}{encoded}"))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_RELAY_URL.to_owned(),
            proxy_prefix: Some(DEFAULT_PROXY_PREFIX.to_owned()),
            request_timeout: Duration::from_secs(10),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
