use crate::engine::{
    ChannelState, ConnectionState, DataChannel, EngineConfig, EngineError, EngineEvent,
    EngineFactory, GatheringState, PeerEngine,
};
use async_trait::async_trait;
use std::sync::Arc;
use tandem_core::{IceCandidate, SdpType, SessionDescription};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Builds [`RtcEngine`]s on top of webrtc-rs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtcEngineFactory;

#[async_trait]
impl EngineFactory for RtcEngineFactory {
    async fn create(
        &self,
        config: &EngineConfig,
        events: mpsc::Sender<EngineEvent>,
    ) -> Result<Arc<dyn PeerEngine>, EngineError> {
        let engine = RtcEngine::new(config, events).await?;
        Ok(Arc::new(engine))
    }
}

pub struct RtcEngine {
    peer_connection: Arc<RTCPeerConnection>,
    events: mpsc::Sender<EngineEvent>,
}

impl RtcEngine {
    pub async fn new(
        config: &EngineConfig,
        events: mpsc::Sender<EngineEvent>,
    ) -> Result<Self, EngineError> {
        // Codecs are registered even though only a data channel is used;
        // the default interceptors expect them.
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                Box::pin(async move {
                    info!("Peer connection state changed: {}", s);
                    let state = match s {
                        RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => {
                            ConnectionState::New
                        }
                        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
                        RTCPeerConnectionState::Connected => ConnectionState::Connected,
                        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
                        RTCPeerConnectionState::Failed => ConnectionState::Failed,
                        RTCPeerConnectionState::Closed => ConnectionState::Closed,
                    };
                    let _ = tx.send(EngineEvent::ConnectionStateChanged(state)).await;
                })
            },
        ));

        let gather_tx = events.clone();
        peer_connection.on_ice_gathering_state_change(Box::new(
            move |s: RTCIceGathererState| {
                let tx = gather_tx.clone();
                Box::pin(async move {
                    debug!("ICE gathering state: {}", s);
                    let state = match s {
                        RTCIceGathererState::Unspecified | RTCIceGathererState::New => {
                            GatheringState::New
                        }
                        RTCIceGathererState::Gathering => GatheringState::Gathering,
                        RTCIceGathererState::Complete => GatheringState::Complete,
                        RTCIceGathererState::Closed => return,
                    };
                    let _ = tx.send(EngineEvent::GatheringStateChanged(state)).await;
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_m_line_index: init.sdp_mline_index,
                    sdp_mid: init.sdp_mid,
                };
                let _ = tx.send(EngineEvent::CandidateDiscovered(candidate)).await;
            })
        }));

        let dc_tx = events.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let tx = dc_tx.clone();
            Box::pin(async move {
                info!("Accepted remote data channel '{}'", dc.label());
                wire_channel(&dc, tx.clone());
                let channel: Arc<dyn DataChannel> = Arc::new(RtcChannel(dc));
                let _ = tx.send(EngineEvent::ChannelAccepted(channel)).await;
            })
        }));

        Ok(Self {
            peer_connection,
            events,
        })
    }
}

#[async_trait]
impl PeerEngine for RtcEngine {
    async fn create_offer(&self) -> Result<SessionDescription, EngineError> {
        let offer = self.peer_connection.create_offer(None).await?;
        from_rtc(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription, EngineError> {
        let answer = self.peer_connection.create_answer(None).await?;
        from_rtc(answer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), EngineError> {
        self.peer_connection
            .set_local_description(to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), EngineError> {
        self.peer_connection
            .set_remote_description(to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        let desc = self.peer_connection.local_description().await?;
        match from_rtc(desc) {
            Ok(desc) => Some(desc),
            Err(e) => {
                warn!("Local description is not usable: {}", e);
                None
            }
        }
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), EngineError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            ..Default::default()
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>, EngineError> {
        let init = RTCDataChannelInit {
            ordered: Some(true),
            ..Default::default()
        };
        let dc = self
            .peer_connection
            .create_data_channel(label, Some(init))
            .await?;
        wire_channel(&dc, self.events.clone());
        Ok(Arc::new(RtcChannel(dc)))
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Forwards channel lifecycle callbacks into the engine event stream.
fn wire_channel(dc: &Arc<RTCDataChannel>, events: mpsc::Sender<EngineEvent>) {
    let open_tx = events.clone();
    let label = dc.label().to_string();
    dc.on_open(Box::new(move || {
        Box::pin(async move {
            info!("DataChannel '{}' open", label);
            let _ = open_tx.send(EngineEvent::ChannelOpen).await;
        })
    }));

    let close_tx = events.clone();
    dc.on_close(Box::new(move || {
        let tx = close_tx.clone();
        Box::pin(async move {
            let _ = tx.send(EngineEvent::ChannelClosed).await;
        })
    }));

    let error_tx = events.clone();
    dc.on_error(Box::new(move |err: webrtc::Error| {
        let tx = error_tx.clone();
        Box::pin(async move {
            let _ = tx.send(EngineEvent::ChannelError(err.to_string())).await;
        })
    }));

    let msg_tx = events;
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = msg_tx.clone();
        Box::pin(async move {
            match String::from_utf8(msg.data.to_vec()) {
                Ok(text) => {
                    let _ = tx.send(EngineEvent::ChannelMessage(text)).await;
                }
                Err(_) => warn!("Dropping non-UTF-8 frame of {} bytes", msg.data.len()),
            }
        })
    }));
}

struct RtcChannel(Arc<RTCDataChannel>);

#[async_trait]
impl DataChannel for RtcChannel {
    fn label(&self) -> String {
        self.0.label().to_string()
    }

    fn ready_state(&self) -> ChannelState {
        match self.0.ready_state() {
            RTCDataChannelState::Unspecified | RTCDataChannelState::Connecting => {
                ChannelState::Connecting
            }
            RTCDataChannelState::Open => ChannelState::Open,
            RTCDataChannelState::Closing => ChannelState::Closing,
            RTCDataChannelState::Closed => ChannelState::Closed,
        }
    }

    async fn send_text(&self, text: String) -> Result<(), EngineError> {
        self.0.send_text(text).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.0.close().await?;
        Ok(())
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, EngineError> {
    let rtc = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
    };
    Ok(rtc)
}

fn from_rtc(desc: RTCSessionDescription) -> Result<SessionDescription, EngineError> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        other => {
            return Err(EngineError::Other(format!(
                "unsupported description type {other}"
            )));
        }
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: desc.sdp,
    })
}
