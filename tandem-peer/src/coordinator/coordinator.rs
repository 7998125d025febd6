use crate::coordinator::event_bus::{EventBus, Subscription};
use crate::coordinator::{
    CandidateDisposition, CoordinatorConfig, CoordinatorError, CoordinatorEvent, SignalingPhase,
};
use crate::engine::{
    ChannelState, ConnectionState, DataChannel, EngineError, EngineEvent, EngineFactory,
    GatheringState, PeerEngine,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tandem_core::{IceCandidate, Role, SdpType, SessionDescription};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const EVENT_BUFFER: usize = 256;

/// Remote candidates held before the remote description lands. Past this
/// the peer is misbehaving and further candidates are rejected.
const MAX_PENDING_CANDIDATES: usize = 64;

/// Drives one peer connection through a non-trickle offer/answer
/// handshake and owns its data channel.
///
/// Engine callbacks are drained by a single pump task, so state updates
/// and observer notifications happen in the order the engine reported
/// them.
pub struct ConnectionCoordinator {
    factory: Arc<dyn EngineFactory>,
    config: CoordinatorConfig,
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<CoordinatorState>,
    gathering: watch::Sender<GatheringState>,
    events: EventBus<CoordinatorEvent>,
}

struct CoordinatorState {
    role: Option<Role>,
    phase: SignalingPhase,
    connection: ConnectionState,
    engine: Option<Arc<dyn PeerEngine>>,
    channel: Option<Arc<dyn DataChannel>>,
    remote_committed: bool,
    pending_candidates: Vec<IceCandidate>,
    pump: Option<JoinHandle<()>>,
}

impl CoordinatorState {
    /// Moves forward only. Returns whether the phase actually changed.
    fn advance(&mut self, next: SignalingPhase) -> bool {
        if self.phase == next || self.phase.is_terminal() {
            return false;
        }
        if !next.is_terminal() && rank(next) <= rank(self.phase) {
            debug!("Ignoring phase {} while in {}", next, self.phase);
            return false;
        }
        debug!("Phase {} -> {}", self.phase, next);
        self.phase = next;
        true
    }
}

fn rank(phase: SignalingPhase) -> u8 {
    match phase {
        SignalingPhase::Idle => 0,
        SignalingPhase::CreatingOffer | SignalingPhase::ReceivedOffer => 1,
        SignalingPhase::CreatingAnswer => 2,
        SignalingPhase::GatheringIce => 3,
        SignalingPhase::OfferReady | SignalingPhase::AnswerReady => 4,
        SignalingPhase::AwaitingAnswer => 5,
        SignalingPhase::Connecting => 6,
        SignalingPhase::Connected => 7,
        SignalingPhase::Closed | SignalingPhase::Failed => 8,
    }
}

impl Shared {
    fn set_phase(&self, next: SignalingPhase) {
        let changed = self.state.lock().advance(next);
        if changed {
            self.events.emit(&CoordinatorEvent::PhaseChanged(next));
        }
    }

    fn fail(&self, err: &CoordinatorError) {
        error!("Handshake failed: {}", err);
        self.set_phase(SignalingPhase::Failed);
    }

    fn handle_engine_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::CandidateDiscovered(candidate) => {
                self.events.emit(&CoordinatorEvent::LocalCandidate(candidate));
            }

            EngineEvent::GatheringStateChanged(state) => {
                self.gathering.send_replace(state);
            }

            EngineEvent::ConnectionStateChanged(state) => self.on_connection_state(state),

            EngineEvent::ChannelAccepted(channel) => {
                let mut st = self.state.lock();
                if st.phase.is_terminal() {
                    return;
                }
                if st.channel.is_some() {
                    warn!("Ignoring extra data channel '{}'", channel.label());
                    return;
                }
                st.channel = Some(channel);
            }

            EngineEvent::ChannelOpen => self.events.emit(&CoordinatorEvent::ChannelOpen),

            EngineEvent::ChannelClosed => self.events.emit(&CoordinatorEvent::ChannelClosed),

            EngineEvent::ChannelError(e) => warn!("Data channel error: {}", e),

            EngineEvent::ChannelMessage(text) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => self.events.emit(&CoordinatorEvent::Message(value)),
                Err(e) => warn!("Discarding malformed message ({} bytes): {}", text.len(), e),
            },
        }
    }

    fn on_connection_state(&self, state: ConnectionState) {
        let phase = match state {
            ConnectionState::Connecting => Some(SignalingPhase::Connecting),
            ConnectionState::Connected => Some(SignalingPhase::Connected),
            ConnectionState::Failed => Some(SignalingPhase::Failed),
            ConnectionState::Closed => Some(SignalingPhase::Closed),
            ConnectionState::Disconnected => {
                info!("Peer connection disconnected; it may still recover");
                None
            }
            ConnectionState::New => None,
        };

        let phase_changed = {
            let mut st = self.state.lock();
            if st.connection == state {
                return;
            }
            st.connection = state;
            phase.is_some_and(|p| st.advance(p))
        };

        info!("Connection state: {}", state);
        self.events
            .emit(&CoordinatorEvent::ConnectionStateChanged(state));
        if let (true, Some(p)) = (phase_changed, phase) {
            self.events.emit(&CoordinatorEvent::PhaseChanged(p));
        }
    }
}

async fn run_event_pump(shared: Arc<Shared>, mut rx: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = rx.recv().await {
        shared.handle_engine_event(event);
    }
    debug!("Engine event stream ended");
}

impl ConnectionCoordinator {
    pub fn new(factory: Arc<dyn EngineFactory>, config: CoordinatorConfig) -> Self {
        let (gathering, _) = watch::channel(GatheringState::New);
        Self {
            factory,
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(CoordinatorState {
                    role: None,
                    phase: SignalingPhase::Idle,
                    connection: ConnectionState::New,
                    engine: None,
                    channel: None,
                    remote_committed: false,
                    pending_candidates: Vec::new(),
                    pump: None,
                }),
                gathering,
                events: EventBus::new(),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn phase(&self) -> SignalingPhase {
        self.shared.state.lock().phase
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state.lock().connection
    }

    /// `None` until a data channel exists.
    pub fn channel_state(&self) -> Option<ChannelState> {
        let channel = self.shared.state.lock().channel.clone();
        channel.map(|ch| ch.ready_state())
    }

    pub fn role(&self) -> Option<Role> {
        self.shared.state.lock().role
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&CoordinatorEvent) + Send + Sync + 'static,
    {
        self.shared.events.subscribe(handler)
    }

    /// Creates the engine and data channel, makes an offer and returns it
    /// once ICE gathering completes or the gather timeout passes.
    pub async fn begin_as_offerer(&self) -> Result<SessionDescription, CoordinatorError> {
        let engine = self
            .start_engine(Role::Offerer, SignalingPhase::CreatingOffer)
            .await?;
        let result = self.offer_steps(engine.as_ref()).await;
        if let Err(e) = &result {
            self.shared.fail(e);
        }
        result
    }

    async fn offer_steps(
        &self,
        engine: &dyn PeerEngine,
    ) -> Result<SessionDescription, CoordinatorError> {
        let channel = engine
            .create_data_channel(&self.config.channel_label)
            .await?;
        self.shared.state.lock().channel = Some(channel);

        let offer = engine.create_offer().await?;
        engine.set_local_description(offer).await?;
        self.shared.set_phase(SignalingPhase::GatheringIce);

        let desc = self.gathered_description(engine).await?;
        self.shared.set_phase(SignalingPhase::OfferReady);
        info!("Offer ready ({} bytes of SDP)", desc.sdp.len());
        Ok(desc)
    }

    /// Applies a remote offer and returns the local answer once ICE
    /// gathering completes or the gather timeout passes.
    pub async fn begin_as_answerer(
        &self,
        remote_offer: SessionDescription,
    ) -> Result<SessionDescription, CoordinatorError> {
        if remote_offer.sdp_type != SdpType::Offer {
            return Err(CoordinatorError::UnexpectedDescription {
                expected: SdpType::Offer,
                got: remote_offer.sdp_type,
            });
        }

        let engine = self
            .start_engine(Role::Answerer, SignalingPhase::ReceivedOffer)
            .await?;
        let result = self.answer_steps(engine.as_ref(), remote_offer).await;
        if let Err(e) = &result {
            self.shared.fail(e);
        }
        result
    }

    async fn answer_steps(
        &self,
        engine: &dyn PeerEngine,
        remote_offer: SessionDescription,
    ) -> Result<SessionDescription, CoordinatorError> {
        engine.set_remote_description(remote_offer).await?;
        self.flush_pending(engine).await;

        self.shared.set_phase(SignalingPhase::CreatingAnswer);
        let answer = engine.create_answer().await?;
        engine.set_local_description(answer).await?;
        self.shared.set_phase(SignalingPhase::GatheringIce);

        let desc = self.gathered_description(engine).await?;
        self.shared.set_phase(SignalingPhase::AnswerReady);
        info!("Answer ready ({} bytes of SDP)", desc.sdp.len());
        Ok(desc)
    }

    /// Records that the local description has been handed to the relay.
    pub fn mark_published(&self) {
        match self.role() {
            Some(Role::Offerer) => self.shared.set_phase(SignalingPhase::AwaitingAnswer),
            Some(Role::Answerer) => self.shared.set_phase(SignalingPhase::Connecting),
            None => debug!("Nothing published yet; ignoring"),
        }
    }

    /// Offerer side: commits the peer's answer. Does nothing if there is
    /// no engine, either because no handshake was started or because the
    /// coordinator was closed.
    pub async fn complete_with_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), CoordinatorError> {
        let engine = {
            let st = self.shared.state.lock();
            let Some(engine) = st.engine.clone() else {
                debug!("No engine; ignoring remote description");
                return Ok(());
            };
            if st.phase.is_terminal() {
                return Err(CoordinatorError::Closed);
            }
            if st.remote_committed {
                return Err(CoordinatorError::RemoteAlreadyCommitted);
            }
            engine
        };
        if desc.sdp_type != SdpType::Answer {
            return Err(CoordinatorError::UnexpectedDescription {
                expected: SdpType::Answer,
                got: desc.sdp_type,
            });
        }

        if let Err(e) = engine.set_remote_description(desc).await {
            let err = CoordinatorError::from(e);
            self.shared.fail(&err);
            return Err(err);
        }
        self.flush_pending(engine.as_ref()).await;
        self.shared.set_phase(SignalingPhase::Connecting);
        Ok(())
    }

    /// Hands a remote candidate to the engine, or queues it until the
    /// remote description is committed.
    pub async fn submit_remote_ice_candidate(&self, candidate: IceCandidate) -> CandidateDisposition {
        let engine = {
            let mut st = self.shared.state.lock();
            if st.phase.is_terminal() {
                debug!("Coordinator closed; rejecting remote candidate");
                return CandidateDisposition::Rejected;
            }
            match (&st.engine, st.remote_committed) {
                (Some(engine), true) => engine.clone(),
                _ => {
                    if st.pending_candidates.len() >= MAX_PENDING_CANDIDATES {
                        warn!("Pending candidate queue full; rejecting");
                        return CandidateDisposition::Rejected;
                    }
                    st.pending_candidates.push(candidate);
                    debug!(
                        "Queued remote candidate ({} pending)",
                        st.pending_candidates.len()
                    );
                    return CandidateDisposition::Queued;
                }
            }
        };

        match engine.add_ice_candidate(candidate).await {
            Ok(()) => CandidateDisposition::Applied,
            Err(e) => {
                warn!("Engine rejected remote candidate: {}", e);
                CandidateDisposition::Rejected
            }
        }
    }

    /// Serialises `payload` to JSON and writes it to the data channel.
    /// Returns `false` without writing unless the channel is open.
    pub async fn send<T: Serialize + ?Sized>(&self, payload: &T) -> bool {
        let channel = self.shared.state.lock().channel.clone();
        let Some(channel) = channel else {
            warn!("Cannot send: no data channel yet");
            return false;
        };
        let state = channel.ready_state();
        if state != ChannelState::Open {
            warn!("Cannot send: data channel is {:?}", state);
            return false;
        }

        let text = match serde_json::to_string(payload) {
            Ok(text) => text,
            Err(e) => {
                warn!("Cannot send: payload is not JSON-serialisable: {}", e);
                return false;
            }
        };
        match channel.send_text(text).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Data channel write failed: {}", e);
                false
            }
        }
    }

    /// Tears down the channel and engine. Safe to call more than once;
    /// observers hear about it once.
    pub async fn close(&self) {
        let (phase_changed, connection_changed, channel, engine, pump) = {
            let mut st = self.shared.state.lock();
            st.pending_candidates.clear();
            // an explicit close wins over an earlier failure
            let phase_changed = st.phase != SignalingPhase::Closed;
            st.phase = SignalingPhase::Closed;
            let connection_changed = st.connection != ConnectionState::Closed;
            st.connection = ConnectionState::Closed;
            (
                phase_changed,
                connection_changed,
                st.channel.take(),
                st.engine.take(),
                st.pump.take(),
            )
        };

        if let Some(channel) = channel
            && let Err(e) = channel.close().await
        {
            debug!("Closing data channel: {}", e);
        }
        if let Some(engine) = engine
            && let Err(e) = engine.close().await
        {
            warn!("Closing engine: {}", e);
        }
        if let Some(pump) = pump {
            pump.abort();
        }

        if phase_changed {
            info!("Coordinator closed");
            self.shared
                .events
                .emit(&CoordinatorEvent::PhaseChanged(SignalingPhase::Closed));
        }
        if connection_changed {
            self.shared.events.emit(&CoordinatorEvent::ConnectionStateChanged(
                ConnectionState::Closed,
            ));
        }
    }

    async fn start_engine(
        &self,
        role: Role,
        first_phase: SignalingPhase,
    ) -> Result<Arc<dyn PeerEngine>, CoordinatorError> {
        {
            let mut st = self.shared.state.lock();
            if st.phase.is_terminal() {
                return Err(CoordinatorError::Closed);
            }
            if st.role.is_some() {
                return Err(CoordinatorError::AlreadyStarted);
            }
            st.role = Some(role);
        }
        info!("Starting handshake as {}", role.as_str());
        self.shared.set_phase(first_phase);
        self.shared.gathering.send_replace(GatheringState::New);

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let engine = match self.factory.create(&self.config.engine, tx).await {
            Ok(engine) => engine,
            Err(e) => {
                let err = CoordinatorError::from(e);
                self.shared.fail(&err);
                return Err(err);
            }
        };
        let pump = tokio::spawn(run_event_pump(self.shared.clone(), rx));

        let orphaned = {
            let mut st = self.shared.state.lock();
            if st.phase.is_terminal() {
                Some(pump)
            } else {
                st.engine = Some(engine.clone());
                st.pump = Some(pump);
                None
            }
        };
        if let Some(pump) = orphaned {
            // closed while the engine was being built
            pump.abort();
            if let Err(e) = engine.close().await {
                debug!("Closing orphaned engine: {}", e);
            }
            return Err(CoordinatorError::Closed);
        }
        Ok(engine)
    }

    async fn gathered_description(
        &self,
        engine: &dyn PeerEngine,
    ) -> Result<SessionDescription, CoordinatorError> {
        let mut rx = self.shared.gathering.subscribe();
        let limit = self.config.gather_timeout;
        match tokio::time::timeout(limit, rx.wait_for(|s| *s == GatheringState::Complete)).await {
            Ok(Ok(_)) => debug!("ICE gathering complete"),
            Ok(Err(_)) => warn!("Gathering signal went away; using current description"),
            Err(_) => warn!(
                "ICE gathering not complete after {:?}; using partial candidates",
                limit
            ),
        }

        engine
            .local_description()
            .await
            .ok_or(CoordinatorError::Engine(EngineError::NoLocalDescription))
    }

    async fn flush_pending(&self, engine: &dyn PeerEngine) {
        let pending = {
            let mut st = self.shared.state.lock();
            st.remote_committed = true;
            std::mem::take(&mut st.pending_candidates)
        };
        if pending.is_empty() {
            return;
        }
        info!("Applying {} queued remote candidates", pending.len());
        for candidate in pending {
            if let Err(e) = engine.add_ice_candidate(candidate).await {
                warn!("Engine rejected queued candidate: {}", e);
            }
        }
    }
}

impl Drop for ConnectionCoordinator {
    fn drop(&mut self) {
        let (pump, channel, engine) = {
            let mut st = self.shared.state.lock();
            (st.pump.take(), st.channel.take(), st.engine.take())
        };
        if let Some(pump) = pump {
            pump.abort();
        }
        if channel.is_none() && engine.is_none() {
            return;
        }
        // Engine shutdown is async; without a runtime the handles are just dropped.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Coordinator dropped outside a runtime; engine not closed");
            return;
        };
        debug!("Coordinator dropped without close(); closing engine");
        runtime.spawn(async move {
            if let Some(channel) = channel
                && let Err(e) = channel.close().await
            {
                debug!("Closing data channel: {}", e);
            }
            if let Some(engine) = engine
                && let Err(e) = engine.close().await
            {
                warn!("Closing engine: {}", e);
            }
        });
    }
}
