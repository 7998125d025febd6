use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use tandem_core::{IceCandidate, SessionDescription};
use tandem_peer::{
    ChannelState, DataChannel, EngineConfig, EngineError, EngineEvent, EngineFactory,
    GatheringState, PeerEngine,
};

/// How a fake engine behaves once its local description is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gathering {
    /// Reports one host candidate, then gathering complete.
    Completes,
    /// Starts gathering and never finishes.
    Stalls,
}

pub fn host_candidate(n: u8) -> IceCandidate {
    IceCandidate {
        candidate: format!("candidate:{n} 1 udp 2122260223 192.168.1.{n} 5000{n} typ host"),
        sdp_m_line_index: Some(0),
        sdp_mid: Some("0".into()),
    }
}

/// In-memory stand-in for a data channel. Counts writes.
pub struct FakeChannel {
    label: String,
    state: Mutex<ChannelState>,
    writes: Mutex<Vec<String>>,
}

impl FakeChannel {
    pub fn new(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            state: Mutex::new(ChannelState::Connecting),
            writes: Mutex::new(Vec::new()),
        })
    }

    pub fn set_state(&self, state: ChannelState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataChannel for FakeChannel {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn ready_state(&self) -> ChannelState {
        *self.state.lock().unwrap()
    }

    async fn send_text(&self, text: String) -> Result<(), EngineError> {
        self.writes.lock().unwrap().push(text);
        Ok(())
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.set_state(ChannelState::Closed);
        Ok(())
    }
}

/// Scriptable engine. Records every remote candidate it is handed.
pub struct FakeEngine {
    events: mpsc::Sender<EngineEvent>,
    gathering: Gathering,
    local: Mutex<Option<SessionDescription>>,
    remote: Mutex<Option<SessionDescription>>,
    added: Mutex<Vec<IceCandidate>>,
    channel: Mutex<Option<Arc<FakeChannel>>>,
    close_calls: AtomicUsize,
}

impl FakeEngine {
    /// Pushes an event as if the underlying stack had fired it.
    pub async fn emit(&self, event: EngineEvent) {
        self.events
            .send(event)
            .await
            .expect("coordinator stopped listening");
    }

    pub fn added_candidates(&self) -> Vec<IceCandidate> {
        self.added.lock().unwrap().clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.remote.lock().unwrap().clone()
    }

    pub fn channel(&self) -> Option<Arc<FakeChannel>> {
        self.channel.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerEngine for FakeEngine {
    async fn create_offer(&self) -> Result<SessionDescription, EngineError> {
        Ok(SessionDescription::offer("v=0\r\ns=fake-offer\r\n"))
    }

    async fn create_answer(&self) -> Result<SessionDescription, EngineError> {
        if self.remote.lock().unwrap().is_none() {
            return Err(EngineError::Other("no remote offer".into()));
        }
        Ok(SessionDescription::answer("v=0\r\ns=fake-answer\r\n"))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), EngineError> {
        *self.local.lock().unwrap() = Some(desc);

        let events = self.events.clone();
        let gathering = self.gathering;
        tokio::spawn(async move {
            let _ = events
                .send(EngineEvent::GatheringStateChanged(GatheringState::Gathering))
                .await;
            if gathering == Gathering::Completes {
                let _ = events
                    .send(EngineEvent::CandidateDiscovered(host_candidate(7)))
                    .await;
                let _ = events
                    .send(EngineEvent::GatheringStateChanged(GatheringState::Complete))
                    .await;
            }
        });
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), EngineError> {
        let mut remote = self.remote.lock().unwrap();
        if remote.is_some() {
            return Err(EngineError::Other("remote description already set".into()));
        }
        *remote = Some(desc);
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        let local = self.local.lock().unwrap().clone()?;
        // mimic an SDP with whatever was gathered so far
        let sdp = match self.gathering {
            Gathering::Completes => format!("{}a=candidate:7\r\n", local.sdp),
            Gathering::Stalls => local.sdp,
        };
        Some(SessionDescription {
            sdp_type: local.sdp_type,
            sdp,
        })
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), EngineError> {
        if self.remote.lock().unwrap().is_none() {
            return Err(EngineError::Other("candidate before remote description".into()));
        }
        self.added.lock().unwrap().push(candidate);
        Ok(())
    }

    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>, EngineError> {
        let channel = FakeChannel::new(label);
        *self.channel.lock().unwrap() = Some(channel.clone());
        Ok(channel)
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out [`FakeEngine`]s and keeps a handle to the last one built.
pub struct FakeEngineFactory {
    gathering: Gathering,
    built: Mutex<Option<Arc<FakeEngine>>>,
}

impl FakeEngineFactory {
    pub fn new(gathering: Gathering) -> Arc<Self> {
        Arc::new(Self {
            gathering,
            built: Mutex::new(None),
        })
    }

    pub fn engine(&self) -> Arc<FakeEngine> {
        self.built
            .lock()
            .unwrap()
            .clone()
            .expect("no engine built yet")
    }
}

#[async_trait]
impl EngineFactory for FakeEngineFactory {
    async fn create(
        &self,
        _config: &EngineConfig,
        events: mpsc::Sender<EngineEvent>,
    ) -> Result<Arc<dyn PeerEngine>, EngineError> {
        let engine = Arc::new(FakeEngine {
            events,
            gathering: self.gathering,
            local: Mutex::new(None),
            remote: Mutex::new(None),
            added: Mutex::new(Vec::new()),
            channel: Mutex::new(None),
            close_calls: AtomicUsize::new(0),
        });
        *self.built.lock().unwrap() = Some(engine.clone());
        Ok(engine)
    }
}
