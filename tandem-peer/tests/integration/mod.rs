pub mod rtc_tests;
pub mod signaling_tests;

use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

use tandem_peer::{ConnectionCoordinator, CoordinatorConfig, SessionConfig, SignalingSession};
use tandem_relay::SessionCache;

use crate::utils::{FakeEngineFactory, Gathering, MemoryRelay};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_test_coordinator(
    gathering: Gathering,
) -> (Arc<ConnectionCoordinator>, Arc<FakeEngineFactory>) {
    let factory = FakeEngineFactory::new(gathering);
    let coordinator = ConnectionCoordinator::new(factory.clone(), CoordinatorConfig::default());
    (Arc::new(coordinator), factory)
}

pub fn test_session_config() -> SessionConfig {
    SessionConfig {
        app: "app".into(),
        fetch_attempts: 3,
        fetch_delay: Duration::from_millis(10),
        ..Default::default()
    }
}

/// One side of a handshake: a session over a fake engine, talking to
/// `relay`.
pub fn create_test_session(
    relay: &MemoryRelay,
    cache: &Arc<SessionCache>,
) -> (SignalingSession, Arc<FakeEngineFactory>) {
    let (coordinator, factory) = create_test_coordinator(Gathering::Completes);
    let session = SignalingSession::new(
        test_session_config(),
        relay.client(),
        cache.clone(),
        coordinator,
    );
    (session, factory)
}
