use std::sync::Arc;

use tandem_core::{DescriptionEnvelope, LinkKind, Role, SdpType, ShareLink};
use tandem_peer::{CandidateDisposition, SignalingPhase};
use tandem_relay::SessionCache;

use crate::integration::{create_test_session, init_tracing};
use crate::utils::{MemoryRelay, host_candidate, settle};

#[tokio::test]
async fn test_full_handshake() {
    init_tracing();

    let relay = MemoryRelay::new();
    let (offerer, offer_engines) = create_test_session(&relay, &Arc::new(SessionCache::new()));
    let (answerer, answer_engines) =
        create_test_session(&relay, &Arc::new(SessionCache::new()));

    // Offerer publishes and hands out a link carrying only the code.
    let link = offerer.start_offer().await.expect("offer should publish");
    assert_eq!(link.kind, LinkKind::Offer);
    let id = link.session_id.clone();

    let stored = relay
        .store()
        .latest(&format!("app-{id}-offer"))
        .expect("offer stored under its topic");
    assert_eq!(stored["type"], "offer");
    assert!(stored["timestamp"].is_i64());
    let envelope: DescriptionEnvelope = serde_json::from_value(stored).unwrap();
    let descriptor = offerer.descriptor().expect("offerer has a descriptor");
    assert_eq!(descriptor.role(), Role::Offerer);
    assert_eq!(descriptor.session_id(), &id);
    assert_eq!(envelope.open().as_ref(), Some(descriptor.description()));
    assert_eq!(
        offerer.coordinator().phase(),
        SignalingPhase::AwaitingAnswer
    );

    // The link survives a trip through a URL.
    let url = offerer.config().share_url(&link).unwrap();
    let received = ShareLink::parse(url.as_str()).unwrap();
    assert_eq!(received, link);

    let reply = answerer.join(&received).await.expect("answerer should join");
    assert_eq!(reply, ShareLink::answer(id.clone()));
    assert_eq!(answerer.coordinator().phase(), SignalingPhase::Connecting);

    let offer_engine = offer_engines.engine();
    let answer_engine = answer_engines.engine();
    assert_eq!(
        answer_engine.remote_description().map(|d| d.sdp_type),
        Some(SdpType::Offer)
    );

    offerer.await_answer().await.expect("answer should apply");
    assert_eq!(
        offer_engine.remote_description().as_ref(),
        answerer.descriptor().as_ref().map(|d| d.description())
    );
    assert_eq!(offerer.coordinator().phase(), SignalingPhase::Connecting);

    // Each side's local candidate landed on its own topic.
    settle().await;
    assert!(relay.store().latest(&format!("app-{id}-ice-offerer")).is_some());
    assert!(relay.store().latest(&format!("app-{id}-ice-answerer")).is_some());

    assert_eq!(
        offerer.poll_remote_candidate().await,
        Some(CandidateDisposition::Applied)
    );
    assert_eq!(
        answerer.poll_remote_candidate().await,
        Some(CandidateDisposition::Applied)
    );
    assert_eq!(offer_engine.added_candidates(), vec![host_candidate(7)]);
    assert_eq!(answer_engine.added_candidates(), vec![host_candidate(7)]);

    // Nothing new on the slot: nothing resubmitted.
    assert_eq!(offerer.poll_remote_candidate().await, None);
    assert_eq!(offer_engine.added_candidates().len(), 1);

    offerer.close().await;
    answerer.close().await;
    assert_eq!(offerer.coordinator().phase(), SignalingPhase::Closed);
}
