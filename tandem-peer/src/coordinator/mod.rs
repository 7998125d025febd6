mod config;
#[allow(clippy::module_inception)]
mod coordinator;
mod coordinator_event;
mod event_bus;
mod phase;

pub use config::{CoordinatorConfig, DEFAULT_CHANNEL_LABEL, DEFAULT_GATHER_TIMEOUT};
pub use coordinator::ConnectionCoordinator;
pub use coordinator_event::{CandidateDisposition, CoordinatorEvent};
pub use event_bus::{EventBus, Subscription};
pub use phase::SignalingPhase;

use crate::engine::EngineError;
use tandem_core::SdpType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("handshake already started")]
    AlreadyStarted,
    #[error("coordinator is closed")]
    Closed,
    #[error("remote description already committed")]
    RemoteAlreadyCommitted,
    #[error("expected {expected:?} description, got {got:?}")]
    UnexpectedDescription { expected: SdpType, got: SdpType },
    #[error(transparent)]
    Engine(#[from] EngineError),
}
