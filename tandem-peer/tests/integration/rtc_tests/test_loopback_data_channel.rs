use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use tandem_peer::{
    ChannelState, ConnectionCoordinator, CoordinatorConfig, CoordinatorEvent, EngineConfig,
    RtcEngineFactory,
};

use crate::integration::init_tracing;

/// Timeout for connection establishment and channel opening (ms).
const CONNECTION_TIMEOUT_MS: u64 = 10000;

fn rtc_coordinator() -> ConnectionCoordinator {
    let config = CoordinatorConfig {
        engine: EngineConfig::host_only(),
        ..Default::default()
    };
    ConnectionCoordinator::new(Arc::new(RtcEngineFactory), config)
}

async fn wait_for_open(coordinator: &ConnectionCoordinator) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(CONNECTION_TIMEOUT_MS);
    while tokio::time::Instant::now() < deadline {
        if coordinator.channel_state() == Some(ChannelState::Open) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_loopback_data_channel() {
    init_tracing();

    let offerer = rtc_coordinator();
    let answerer = rtc_coordinator();

    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
    let _sub = answerer.subscribe(move |event| {
        if let CoordinatorEvent::Message(value) = event {
            let _ = msg_tx.send(value.clone());
        }
    });

    // Non-trickle: each description already carries its candidates.
    let offer = offerer.begin_as_offerer().await.expect("offer");
    assert!(offer.sdp.contains("a=candidate"), "offer carries no candidates");
    let answer = answerer.begin_as_answerer(offer).await.expect("answer");
    offerer
        .complete_with_remote_description(answer)
        .await
        .expect("apply answer");

    assert!(wait_for_open(&offerer).await, "offerer channel never opened");
    assert!(wait_for_open(&answerer).await, "answerer channel never opened");

    assert!(offerer.send(&json!({"text": "hello over the wire"})).await);

    let received = tokio::time::timeout(Duration::from_millis(CONNECTION_TIMEOUT_MS), msg_rx.recv())
        .await
        .expect("message timed out")
        .expect("subscription dropped");
    assert_eq!(received, json!({"text": "hello over the wire"}));

    offerer.close().await;
    answerer.close().await;
}
