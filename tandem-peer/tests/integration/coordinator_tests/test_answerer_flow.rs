use tandem_core::{Role, SdpType, SessionDescription};
use tandem_peer::{
    ChannelState, CoordinatorError, EngineEvent, SignalingPhase,
};

use crate::integration::{create_test_coordinator, init_tracing};
use crate::utils::{EventLog, FakeChannel, Gathering, PHASE_TIMEOUT_MS, wait_for_phase};

#[tokio::test]
async fn test_answerer_flow() {
    init_tracing();

    let (coordinator, factory) = create_test_coordinator(Gathering::Completes);
    let (log, _sub) = EventLog::attach(&coordinator);
    let offer = SessionDescription::offer("v=0\r\ns=remote-offer\r\n");

    let answer = coordinator.begin_as_answerer(offer.clone()).await.unwrap();

    assert_eq!(answer.sdp_type, SdpType::Answer);
    assert_eq!(coordinator.role(), Some(Role::Answerer));
    let engine = factory.engine();
    assert_eq!(engine.remote_description(), Some(offer));
    // the answerer never creates a channel of its own
    assert!(engine.channel().is_none());
    assert_eq!(coordinator.channel_state(), None);

    coordinator.mark_published();
    assert_eq!(
        log.phases(),
        vec![
            SignalingPhase::ReceivedOffer,
            SignalingPhase::CreatingAnswer,
            SignalingPhase::GatheringIce,
            SignalingPhase::AnswerReady,
            SignalingPhase::Connecting,
        ]
    );

    let accepted = FakeChannel::new("data");
    engine
        .emit(EngineEvent::ChannelAccepted(accepted.clone()))
        .await;
    accepted.set_state(ChannelState::Open);
    engine
        .emit(EngineEvent::ConnectionStateChanged(
            tandem_peer::ConnectionState::Connected,
        ))
        .await;
    wait_for_phase(&coordinator, SignalingPhase::Connected, PHASE_TIMEOUT_MS)
        .await
        .unwrap();

    assert_eq!(coordinator.channel_state(), Some(ChannelState::Open));
    assert!(coordinator.send(&serde_json::json!({"text": "pong"})).await);
    assert_eq!(accepted.writes(), vec![r#"{"text":"pong"}"#.to_string()]);

    coordinator.close().await;
}

#[tokio::test]
async fn test_answerer_rejects_an_answer() {
    init_tracing();

    let (coordinator, _factory) = create_test_coordinator(Gathering::Completes);
    let err = coordinator
        .begin_as_answerer(SessionDescription::answer("v=0\r\n"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoordinatorError::UnexpectedDescription {
            expected: SdpType::Offer,
            got: SdpType::Answer
        }
    ));
    // nothing was started, so a proper offer can still be handled
    assert_eq!(coordinator.phase(), SignalingPhase::Idle);
    coordinator
        .begin_as_answerer(SessionDescription::offer("v=0\r\n"))
        .await
        .unwrap();

    coordinator.close().await;
}
