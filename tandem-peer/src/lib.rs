pub mod coordinator;
pub mod engine;
pub mod signaling;

pub use coordinator::*;
pub use engine::{
    ChannelState, ConnectionState, DataChannel, EngineConfig, EngineError, EngineEvent,
    EngineFactory, GatheringState, PeerEngine, RtcEngine, RtcEngineFactory,
};
pub use signaling::*;
