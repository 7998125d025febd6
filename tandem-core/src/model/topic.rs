use crate::model::description::SdpType;
use crate::model::session::{Role, SessionId};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    Offer,
    Answer,
    Ice(Role),
}

impl TopicKind {
    pub fn description(sdp_type: SdpType) -> Self {
        match sdp_type {
            SdpType::Offer => TopicKind::Offer,
            SdpType::Answer => TopicKind::Answer,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            TopicKind::Offer => "offer",
            TopicKind::Answer => "answer",
            TopicKind::Ice(Role::Offerer) => "ice-offerer",
            TopicKind::Ice(Role::Answerer) => "ice-answerer",
        }
    }
}

/// Relay slot name: `<app>-<sessionId>-<kind>`.
///
/// The session id is the only namespacing; anybody who knows it can read
/// or overwrite the slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelayTopic(String);

impl RelayTopic {
    pub fn new(app: &str, session_id: &SessionId, kind: TopicKind) -> Self {
        Self(format!("{}-{}-{}", app, session_id, kind.suffix()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelayTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
