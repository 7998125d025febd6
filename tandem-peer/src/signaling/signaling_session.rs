use crate::coordinator::{
    CandidateDisposition, ConnectionCoordinator, CoordinatorError, CoordinatorEvent, Subscription,
};
use crate::signaling::{SessionConfig, SignalingError};
use parking_lot::Mutex;
use std::sync::Arc;
use tandem_core::codec;
use tandem_core::{
    CandidateEnvelope, DescriptionEnvelope, IceCandidate, IceCandidateRecord, LinkKind, RelayTopic,
    Role, SdpType, SessionDescription, SessionDescriptor, SessionId, ShareLink, TopicKind,
};
use tandem_relay::{RelayClient, SessionCache};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Runs the offer/answer exchange for one coordinator through the relay.
///
/// Offerer: [`start_offer`](Self::start_offer), hand the link over, then
/// [`await_answer`](Self::await_answer). Answerer: [`join`](Self::join).
/// Both sides then call [`poll_remote_candidate`](Self::poll_remote_candidate)
/// until connected.
pub struct SignalingSession {
    config: SessionConfig,
    relay: RelayClient,
    cache: Arc<SessionCache>,
    coordinator: Arc<ConnectionCoordinator>,
    descriptor: Mutex<Option<SessionDescriptor>>,
    last_remote: Mutex<Option<IceCandidateRecord>>,
    candidate_forwarding: Mutex<Option<Subscription>>,
}

impl SignalingSession {
    pub fn new(
        config: SessionConfig,
        relay: RelayClient,
        cache: Arc<SessionCache>,
        coordinator: Arc<ConnectionCoordinator>,
    ) -> Self {
        Self {
            config,
            relay,
            cache,
            coordinator,
            descriptor: Mutex::new(None),
            last_remote: Mutex::new(None),
            candidate_forwarding: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<ConnectionCoordinator> {
        &self.coordinator
    }

    /// The local record of this side's handshake step, once it exists.
    pub fn descriptor(&self) -> Option<SessionDescriptor> {
        self.descriptor.lock().clone()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.descriptor
            .lock()
            .as_ref()
            .map(|d| d.session_id().clone())
    }

    /// The remote candidate most recently taken from the relay.
    pub fn last_remote_candidate(&self) -> Option<IceCandidateRecord> {
        self.last_remote.lock().clone()
    }

    pub async fn start_offer(&self) -> Result<ShareLink, SignalingError> {
        self.ensure_fresh()?;
        let session_id = SessionId::generate();
        info!(%session_id, "starting session as offerer");

        self.forward_local_candidates(&session_id, Role::Offerer);
        let local = self.coordinator.begin_as_offerer().await?;
        self.publish_description(&session_id, &local).await?;
        self.coordinator.mark_published();

        *self.descriptor.lock() = Some(SessionDescriptor::new(
            session_id.clone(),
            Role::Offerer,
            local,
        ));
        Ok(ShareLink::offer(session_id))
    }

    pub async fn await_answer(&self) -> Result<(), SignalingError> {
        let session_id = self.session_as(Role::Offerer)?;

        let answer = self
            .fetch_description(&session_id, SdpType::Answer)
            .await
            .ok_or_else(|| SignalingError::AnswerUnavailable(session_id.clone()))?;
        self.coordinator
            .complete_with_remote_description(answer)
            .await?;
        info!(%session_id, "answer applied");
        Ok(())
    }

    /// Answers the offer behind `link` and returns the link to send back.
    pub async fn join(&self, link: &ShareLink) -> Result<ShareLink, SignalingError> {
        if link.kind != LinkKind::Offer {
            return Err(SignalingError::NotAnOffer(link.session_id.clone()));
        }
        self.ensure_fresh()?;
        let session_id = link.session_id.clone();
        info!(%session_id, "joining session as answerer");

        let offer = self
            .fetch_description(&session_id, SdpType::Offer)
            .await
            .ok_or_else(|| SignalingError::OfferUnavailable(session_id.clone()))?;

        self.forward_local_candidates(&session_id, Role::Answerer);
        let local = self.coordinator.begin_as_answerer(offer).await?;
        self.publish_description(&session_id, &local).await?;
        self.coordinator.mark_published();

        *self.descriptor.lock() = Some(SessionDescriptor::new(
            session_id.clone(),
            Role::Answerer,
            local,
        ));
        Ok(ShareLink::answer(session_id))
    }

    /// One read of the counterpart's candidate topic. `None` when the
    /// relay has nothing new; the slot only ever holds the latest write,
    /// so earlier candidates may have been missed.
    pub async fn poll_remote_candidate(&self) -> Option<CandidateDisposition> {
        let (session_id, role) = {
            let descriptor = self.descriptor.lock();
            let d = descriptor.as_ref()?;
            (d.session_id().clone(), d.role())
        };
        let remote_role = role.opposite();
        let topic = RelayTopic::new(&self.config.app, &session_id, TopicKind::Ice(remote_role));
        let envelope: CandidateEnvelope = self.relay.fetch(&topic).await?;

        {
            let mut last = self.last_remote.lock();
            if last
                .as_ref()
                .is_some_and(|r| r.candidate == envelope.candidate)
            {
                debug!(%topic, "remote candidate unchanged");
                return None;
            }
            *last = Some(IceCandidateRecord::new(
                session_id,
                remote_role,
                envelope.candidate.clone(),
            ));
        }

        let disposition = self
            .coordinator
            .submit_remote_ice_candidate(envelope.candidate)
            .await;
        debug!(%topic, ?disposition, "remote candidate submitted");
        Some(disposition)
    }

    /// Stops publishing candidates and closes the coordinator.
    pub async fn close(&self) {
        if let Some(sub) = self.candidate_forwarding.lock().take() {
            sub.unsubscribe();
        }
        self.coordinator.close().await;
    }

    fn ensure_fresh(&self) -> Result<(), SignalingError> {
        if self.descriptor.lock().is_some() || self.coordinator.role().is_some() {
            return Err(CoordinatorError::AlreadyStarted.into());
        }
        Ok(())
    }

    fn session_as(&self, expected: Role) -> Result<SessionId, SignalingError> {
        let descriptor = self.descriptor.lock();
        let d = descriptor.as_ref().ok_or(SignalingError::NoActiveSession)?;
        if d.role() != expected {
            return Err(SignalingError::WrongRole {
                expected,
                actual: d.role(),
            });
        }
        Ok(d.session_id().clone())
    }

    /// Publishes every local candidate, in discovery order, to this
    /// side's candidate topic.
    fn forward_local_candidates(&self, session_id: &SessionId, role: Role) {
        let (tx, mut rx) = mpsc::unbounded_channel::<IceCandidate>();
        let sub = self.coordinator.subscribe(move |event| {
            if let CoordinatorEvent::LocalCandidate(candidate) = event {
                let _ = tx.send(candidate.clone());
            }
        });

        let relay = self.relay.clone();
        let topic = RelayTopic::new(&self.config.app, session_id, TopicKind::Ice(role));
        let session_id = session_id.clone();
        tokio::spawn(async move {
            while let Some(candidate) = rx.recv().await {
                let record = IceCandidateRecord::new(session_id.clone(), role, candidate);
                debug!(%topic, candidate = %record.candidate.candidate, "publishing local candidate");
                relay
                    .publish(&topic, &CandidateEnvelope::new(record.candidate))
                    .await;
            }
            debug!(%topic, "candidate forwarding stopped");
        });

        if let Some(previous) = self.candidate_forwarding.lock().replace(sub) {
            previous.unsubscribe();
        }
    }

    async fn publish_description(
        &self,
        session_id: &SessionId,
        description: &SessionDescription,
    ) -> Result<(), SignalingError> {
        let envelope = DescriptionEnvelope::seal(description)?;
        let topic = RelayTopic::new(
            &self.config.app,
            session_id,
            TopicKind::description(description.sdp_type),
        );
        if self.relay.publish(&topic, &envelope).await {
            info!(%topic, "description published");
        } else {
            warn!(%topic, "relay publish failed; keeping description in the local cache");
            self.cache
                .put(session_id, description.sdp_type, &envelope.sdp);
        }
        Ok(())
    }

    async fn fetch_description(
        &self,
        session_id: &SessionId,
        sdp_type: SdpType,
    ) -> Option<SessionDescription> {
        let topic = RelayTopic::new(
            &self.config.app,
            session_id,
            TopicKind::description(sdp_type),
        );
        let fetched: Option<DescriptionEnvelope> = self
            .relay
            .fetch_with_retry(&topic, self.config.fetch_attempts, self.config.fetch_delay)
            .await;
        if let Some(envelope) = fetched {
            match envelope.open() {
                Some(description) => return Some(description),
                None => warn!(%topic, "relay envelope did not decode"),
            }
        }

        let encoded = self.cache.get(session_id, sdp_type)?;
        info!(%topic, "using locally cached description");
        let description: SessionDescription = codec::decode(&encoded)?;
        (description.sdp_type == sdp_type).then_some(description)
    }
}
