use tandem_core::SessionDescription;
use tandem_peer::{CandidateDisposition, SignalingPhase};

use crate::integration::{create_test_coordinator, init_tracing};
use crate::utils::{Gathering, host_candidate};

#[tokio::test]
async fn test_candidate_waits_for_remote_description() {
    init_tracing();

    let (coordinator, factory) = create_test_coordinator(Gathering::Completes);
    coordinator.begin_as_offerer().await.unwrap();
    let engine = factory.engine();

    let early = host_candidate(1);
    assert_eq!(
        coordinator.submit_remote_ice_candidate(early.clone()).await,
        CandidateDisposition::Queued
    );
    assert!(
        engine.added_candidates().is_empty(),
        "candidate reached the engine before the remote description"
    );

    coordinator
        .complete_with_remote_description(SessionDescription::answer("v=0\r\ns=answer\r\n"))
        .await
        .expect("answer should commit");
    assert_eq!(coordinator.phase(), SignalingPhase::Connecting);
    assert_eq!(engine.added_candidates(), vec![early.clone()]);

    let late = host_candidate(2);
    assert_eq!(
        coordinator.submit_remote_ice_candidate(late.clone()).await,
        CandidateDisposition::Applied
    );
    assert_eq!(engine.added_candidates(), vec![early, late]);

    coordinator.close().await;
    assert_eq!(
        coordinator.submit_remote_ice_candidate(host_candidate(3)).await,
        CandidateDisposition::Rejected
    );
    assert_eq!(engine.added_candidates().len(), 2);
}

#[tokio::test]
async fn test_queued_candidates_flush_in_arrival_order() {
    init_tracing();

    let (coordinator, factory) = create_test_coordinator(Gathering::Completes);
    // nothing started yet: still queued, never lost
    for n in 1..=3 {
        assert_eq!(
            coordinator.submit_remote_ice_candidate(host_candidate(n)).await,
            CandidateDisposition::Queued
        );
    }

    coordinator
        .begin_as_answerer(SessionDescription::offer("v=0\r\ns=offer\r\n"))
        .await
        .unwrap();

    assert_eq!(
        factory.engine().added_candidates(),
        vec![host_candidate(1), host_candidate(2), host_candidate(3)]
    );

    coordinator.close().await;
}

#[tokio::test]
async fn test_remote_description_without_handshake_is_ignored() {
    init_tracing();

    let (coordinator, _factory) = create_test_coordinator(Gathering::Completes);
    coordinator
        .complete_with_remote_description(SessionDescription::answer("v=0\r\n"))
        .await
        .expect("no engine means nothing to do");
    assert_eq!(coordinator.phase(), SignalingPhase::Idle);
}

#[tokio::test]
async fn test_remote_description_after_close_is_ignored() {
    init_tracing();

    let (coordinator, factory) = create_test_coordinator(Gathering::Completes);
    coordinator.begin_as_offerer().await.unwrap();
    coordinator.close().await;

    coordinator
        .complete_with_remote_description(SessionDescription::answer("v=0\r\n"))
        .await
        .expect("closed coordinator has no engine to hand the answer to");
    assert_eq!(coordinator.phase(), SignalingPhase::Closed);
    assert!(factory.engine().remote_description().is_none());
}
