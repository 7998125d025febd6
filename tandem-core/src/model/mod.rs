mod candidate;
mod description;
mod session;
mod share;
mod signaling;
mod topic;

pub use candidate::{IceCandidate, IceCandidateRecord};
pub use description::{SdpType, SessionDescription, SessionDescriptor};
pub use session::{Role, SESSION_ID_LEN, SessionId, SessionIdError};
pub use share::{LinkKind, ShareLink, ShareLinkError};
pub use signaling::{CandidateEnvelope, DescriptionEnvelope, IceServerConfig};
pub use topic::{RelayTopic, TopicKind};
