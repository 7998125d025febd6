use crate::model::session::{Role, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One connectivity proposal, in the shape browsers emit from
/// `RTCIceCandidate.toJSON()`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default)]
    pub sdp_mid: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_m_line_index: None,
            sdp_mid: None,
        }
    }
}

/// A candidate as observed by one side of a session.
///
/// The relay keeps only the newest write per topic, so a record becomes
/// unreachable as soon as the next one is published.
#[derive(Debug, Clone, PartialEq)]
pub struct IceCandidateRecord {
    pub session_id: SessionId,
    pub role: Role,
    pub candidate: IceCandidate,
    pub timestamp: DateTime<Utc>,
}

impl IceCandidateRecord {
    pub fn new(session_id: SessionId, role: Role, candidate: IceCandidate) -> Self {
        Self {
            session_id,
            role,
            candidate,
            timestamp: Utc::now(),
        }
    }
}
