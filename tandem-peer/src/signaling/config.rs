use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tandem_core::utils::DEFAULT_APP;
use tandem_core::ShareLink;
use url::Url;

pub const DEFAULT_SHARE_BASE: &str = "http://localhost:8080/";
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 10;
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Prefix of every relay topic.
    pub app: String,
    /// Page the share link points at; only its query string is replaced.
    pub share_base: String,
    pub fetch_attempts: u32,
    #[serde(deserialize_with = "millis")]
    pub fetch_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app: DEFAULT_APP.to_owned(),
            share_base: DEFAULT_SHARE_BASE.to_owned(),
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            fetch_delay: DEFAULT_FETCH_DELAY,
        }
    }
}

impl SessionConfig {
    pub fn share_url(&self, link: &ShareLink) -> Result<Url, url::ParseError> {
        let base = Url::parse(&self.share_base)?;
        Ok(link.to_url(&base))
    }
}

fn millis<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    u64::deserialize(d).map(Duration::from_millis)
}
