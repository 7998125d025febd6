use chrono::Utc;
use dashmap::DashMap;
use tandem_core::{SdpType, SessionId};
use tracing::debug;

/// Session-scoped store for encoded descriptions, consulted when the relay
/// cannot be reached. Each entry has a companion `_timestamp` key meant for
/// pruning, which nothing performs yet.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: DashMap<String, String>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(session_id: &SessionId, sdp_type: SdpType) -> String {
        format!("sdp_{}_{}", session_id, sdp_type)
    }

    fn timestamp_key(session_id: &SessionId, sdp_type: SdpType) -> String {
        format!("{}_timestamp", Self::key(session_id, sdp_type))
    }

    pub fn put(&self, session_id: &SessionId, sdp_type: SdpType, encoded: &str) {
        let key = Self::key(session_id, sdp_type);
        debug!(%key, "caching description locally");
        self.entries.insert(key, encoded.to_owned());
        self.entries.insert(
            Self::timestamp_key(session_id, sdp_type),
            Utc::now().timestamp_millis().to_string(),
        );
    }

    pub fn get(&self, session_id: &SessionId, sdp_type: SdpType) -> Option<String> {
        self.entries
            .get(&Self::key(session_id, sdp_type))
            .map(|entry| entry.value().clone())
    }

    /// Epoch milliseconds at which the entry was last written.
    pub fn stored_at(&self, session_id: &SessionId, sdp_type: SdpType) -> Option<i64> {
        self.entries
            .get(&Self::timestamp_key(session_id, sdp_type))
            .and_then(|entry| entry.value().parse().ok())
    }

    /// Number of cached descriptions, not counting timestamp keys.
    pub fn len(&self) -> usize {
        self.entries.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
