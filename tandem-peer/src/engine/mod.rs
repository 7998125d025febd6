//! The peer-connection capability the coordinator drives.
//!
//! Engines do the actual ICE/DTLS/SCTP work. The coordinator only needs
//! the operations below plus a stream of [`EngineEvent`]s.

mod engine_event;
mod rtc_engine;

pub use engine_event::EngineEvent;
pub use rtc_engine::{RtcEngine, RtcEngineFactory};

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tandem_core::{IceCandidate, IceServerConfig, SessionDescription};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Rtc(#[from] webrtc::Error),
    #[error("engine has no local description")]
    NoLocalDescription,
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ice_servers: IceServerConfig::public_stun(),
        }
    }
}

impl EngineConfig {
    /// No ICE servers at all: host candidates only. Useful on a LAN and in
    /// tests.
    pub fn host_only() -> Self {
        Self {
            ice_servers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::New => "new",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed => "failed",
            ConnectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatheringState {
    New,
    Gathering,
    Complete,
}

/// One ordered, reliable data channel.
#[async_trait]
pub trait DataChannel: Send + Sync {
    fn label(&self) -> String;

    fn ready_state(&self) -> ChannelState;

    async fn send_text(&self, text: String) -> Result<(), EngineError>;

    async fn close(&self) -> Result<(), EngineError>;
}

#[async_trait]
pub trait PeerEngine: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, EngineError>;

    async fn create_answer(&self) -> Result<SessionDescription, EngineError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), EngineError>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), EngineError>;

    /// The current local description, including any candidates gathered so
    /// far.
    async fn local_description(&self) -> Option<SessionDescription>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), EngineError>;

    /// Initiator side only. The responder learns about the channel through
    /// [`EngineEvent::ChannelAccepted`].
    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>, EngineError>;

    async fn close(&self) -> Result<(), EngineError>;
}

/// Builds engines wired to deliver their events into `events`.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn create(
        &self,
        config: &EngineConfig,
        events: mpsc::Sender<EngineEvent>,
    ) -> Result<Arc<dyn PeerEngine>, EngineError>;
}
