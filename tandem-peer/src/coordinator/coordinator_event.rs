use crate::coordinator::SignalingPhase;
use crate::engine::ConnectionState;
use serde_json::Value;
use tandem_core::IceCandidate;

/// What observers of a [`ConnectionCoordinator`](super::ConnectionCoordinator) see.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    PhaseChanged(SignalingPhase),

    ConnectionStateChanged(ConnectionState),

    ChannelOpen,

    ChannelClosed,

    /// A well-formed JSON message arrived on the data channel.
    Message(Value),

    /// A local candidate was discovered and should be published.
    LocalCandidate(IceCandidate),
}

/// Outcome of handing a remote candidate to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateDisposition {
    /// Passed to the engine.
    Applied,
    /// Held until the remote description is committed.
    Queued,
    /// Dropped: the coordinator is closed, the queue is full, or the
    /// engine refused it.
    Rejected,
}
