use crate::codec::{self, CodecError};
use crate::model::candidate::IceCandidate;
use crate::model::description::{SdpType, SessionDescription};
use crate::utils::DEFAULT_STUN_SERVERS;
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }

    /// The public STUN list every engine falls back to.
    pub fn public_stun() -> Vec<Self> {
        vec![Self {
            urls: DEFAULT_STUN_SERVERS.iter().map(|s| s.to_string()).collect(),
            username: None,
            credential: None,
        }]
    }
}

/// Relay body for an offer or answer. `sdp` carries the codec-encoded
/// [`SessionDescription`], never the raw SDP text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DescriptionEnvelope {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
    pub timestamp: i64,
}

impl DescriptionEnvelope {
    pub fn seal(description: &SessionDescription) -> Result<Self, CodecError> {
        Ok(Self {
            sdp_type: description.sdp_type,
            sdp: codec::encode(description)?,
            timestamp: Utc::now().timestamp_millis(),
        })
    }

    /// Decodes the carried description. `None` means the payload is not
    /// usable yet and the caller may retry.
    pub fn open(&self) -> Option<SessionDescription> {
        let description: SessionDescription = codec::decode(&self.sdp)?;
        if description.sdp_type != self.sdp_type {
            tracing::warn!(
                envelope = %self.sdp_type,
                inner = %description.sdp_type,
                "description type does not match its envelope"
            );
            return None;
        }
        Some(description)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateEnvelope {
    pub candidate: IceCandidate,
    pub timestamp: i64,
}

impl CandidateEnvelope {
    pub fn new(candidate: IceCandidate) -> Self {
        Self {
            candidate,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}
