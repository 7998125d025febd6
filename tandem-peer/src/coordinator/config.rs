use crate::engine::EngineConfig;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Upper bound on how long a handshake step waits for ICE gathering
/// before handing out whatever description exists.
pub const DEFAULT_GATHER_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_CHANNEL_LABEL: &str = "data";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub engine: EngineConfig,
    #[serde(deserialize_with = "millis")]
    pub gather_timeout: Duration,
    pub channel_label: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            gather_timeout: DEFAULT_GATHER_TIMEOUT,
            channel_label: DEFAULT_CHANNEL_LABEL.to_owned(),
        }
    }
}

fn millis<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    u64::deserialize(d).map(Duration::from_millis)
}
