use crate::engine::{ConnectionState, DataChannel, GatheringState};
use std::fmt;
use std::sync::Arc;
use tandem_core::IceCandidate;

/// Everything an engine reports back to its coordinator.
pub enum EngineEvent {
    /// A local connectivity candidate was discovered.
    CandidateDiscovered(IceCandidate),

    GatheringStateChanged(GatheringState),

    ConnectionStateChanged(ConnectionState),

    /// The remote side opened a data channel (responder only).
    ChannelAccepted(Arc<dyn DataChannel>),

    ChannelOpen,

    ChannelClosed,

    ChannelError(String),

    /// A text frame arrived on the data channel.
    ChannelMessage(String),
}

impl fmt::Debug for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineEvent::CandidateDiscovered(c) => {
                f.debug_tuple("CandidateDiscovered").field(c).finish()
            }
            EngineEvent::GatheringStateChanged(s) => {
                f.debug_tuple("GatheringStateChanged").field(s).finish()
            }
            EngineEvent::ConnectionStateChanged(s) => {
                f.debug_tuple("ConnectionStateChanged").field(s).finish()
            }
            EngineEvent::ChannelAccepted(ch) => {
                f.debug_tuple("ChannelAccepted").field(&ch.label()).finish()
            }
            EngineEvent::ChannelOpen => f.write_str("ChannelOpen"),
            EngineEvent::ChannelClosed => f.write_str("ChannelClosed"),
            EngineEvent::ChannelError(e) => f.debug_tuple("ChannelError").field(e).finish(),
            EngineEvent::ChannelMessage(m) => {
                f.debug_tuple("ChannelMessage").field(&m.len()).finish()
            }
        }
    }
}
