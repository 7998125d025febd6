use std::sync::Arc;

use tandem_core::SdpType;
use tandem_peer::SignalingPhase;
use tandem_relay::SessionCache;

use crate::integration::{create_test_session, init_tracing};
use crate::utils::MemoryRelay;

#[tokio::test(start_paused = true)]
async fn test_local_cache_fallback() {
    init_tracing();

    let relay = MemoryRelay::new();
    relay.set_offline(true);
    let cache = Arc::new(SessionCache::new());
    let (offerer, _offer_engines) = create_test_session(&relay, &cache);
    let (answerer, answer_engines) = create_test_session(&relay, &cache);

    let link = offerer
        .start_offer()
        .await
        .expect("an unreachable relay is not fatal");
    let id = link.session_id.clone();
    assert!(cache.get(&id, SdpType::Offer).is_some());
    assert!(cache.stored_at(&id, SdpType::Offer).is_some());

    answerer
        .join(&link)
        .await
        .expect("offer comes from the local cache");
    assert_eq!(
        answer_engines.engine().remote_description().map(|d| d.sdp_type),
        Some(SdpType::Offer)
    );
    assert!(cache.get(&id, SdpType::Answer).is_some());

    offerer
        .await_answer()
        .await
        .expect("answer comes from the local cache");
    assert_eq!(offerer.coordinator().phase(), SignalingPhase::Connecting);

    assert!(relay.store().is_empty());
    assert_eq!(cache.len(), 2);

    offerer.close().await;
    answerer.close().await;
}
