mod config;
mod signaling_session;

pub use config::{DEFAULT_FETCH_ATTEMPTS, DEFAULT_FETCH_DELAY, DEFAULT_SHARE_BASE, SessionConfig};
pub use signaling_session::SignalingSession;

use crate::coordinator::CoordinatorError;
use tandem_core::{CodecError, Role, SessionId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("no session has been started")]
    NoActiveSession,
    #[error("only the {expected} can do that; this session is the {actual}")]
    WrongRole { expected: Role, actual: Role },
    #[error("link for session {0} does not point at an offer")]
    NotAnOffer(SessionId),
    #[error("no offer found for session {0}")]
    OfferUnavailable(SessionId),
    #[error("no answer found for session {0}")]
    AnswerUnavailable(SessionId),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}
