use std::time::Duration;
use tokio::time::Instant;

use tandem_core::SdpType;
use tandem_peer::{DEFAULT_GATHER_TIMEOUT, SignalingPhase};

use crate::integration::{create_test_coordinator, init_tracing};
use crate::utils::Gathering;

#[tokio::test(start_paused = true)]
async fn test_gathering_timeout() {
    init_tracing();

    let (coordinator, _factory) = create_test_coordinator(Gathering::Stalls);

    let started = Instant::now();
    let offer = coordinator
        .begin_as_offerer()
        .await
        .expect("a stalled gather still yields the current description");
    let elapsed = started.elapsed();

    assert_eq!(offer.sdp_type, SdpType::Offer);
    assert_eq!(offer.sdp, "v=0\r\ns=fake-offer\r\n");
    assert!(
        elapsed >= DEFAULT_GATHER_TIMEOUT,
        "resolved before the timeout: {elapsed:?}"
    );
    assert!(
        elapsed < DEFAULT_GATHER_TIMEOUT + Duration::from_secs(1),
        "waited past the timeout: {elapsed:?}"
    );
    assert_eq!(coordinator.phase(), SignalingPhase::OfferReady);

    coordinator.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_answer_gathering_is_bounded_too() {
    init_tracing();

    let (coordinator, _factory) = create_test_coordinator(Gathering::Stalls);
    let remote = tandem_core::SessionDescription::offer("v=0\r\ns=remote\r\n");

    let started = Instant::now();
    let answer = coordinator.begin_as_answerer(remote).await.unwrap();

    assert_eq!(answer.sdp_type, SdpType::Answer);
    assert!(started.elapsed() >= DEFAULT_GATHER_TIMEOUT);
    assert_eq!(coordinator.phase(), SignalingPhase::AnswerReady);

    coordinator.close().await;
}
