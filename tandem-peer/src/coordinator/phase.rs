use std::fmt;

/// Where a coordinator is in its handshake.
///
/// Offerer: `Idle → CreatingOffer → GatheringIce → OfferReady →
/// AwaitingAnswer → Connecting → Connected | Closed | Failed`.
///
/// Answerer: `Idle → ReceivedOffer → CreatingAnswer → GatheringIce →
/// AnswerReady → Connecting → Connected | Closed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalingPhase {
    Idle,
    CreatingOffer,
    ReceivedOffer,
    CreatingAnswer,
    GatheringIce,
    OfferReady,
    AnswerReady,
    AwaitingAnswer,
    Connecting,
    Connected,
    Closed,
    Failed,
}

impl SignalingPhase {
    /// `Closed` and `Failed` are final; `Connected` may still fall to
    /// either.
    pub fn is_terminal(self) -> bool {
        matches!(self, SignalingPhase::Closed | SignalingPhase::Failed)
    }
}

impl fmt::Display for SignalingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalingPhase::Idle => "idle",
            SignalingPhase::CreatingOffer => "creatingOffer",
            SignalingPhase::ReceivedOffer => "receivedOffer",
            SignalingPhase::CreatingAnswer => "creatingAnswer",
            SignalingPhase::GatheringIce => "gatheringIce",
            SignalingPhase::OfferReady => "offerReady",
            SignalingPhase::AnswerReady => "answerReady",
            SignalingPhase::AwaitingAnswer => "awaitingAnswer",
            SignalingPhase::Connecting => "connecting",
            SignalingPhase::Connected => "connected",
            SignalingPhase::Closed => "closed",
            SignalingPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}
