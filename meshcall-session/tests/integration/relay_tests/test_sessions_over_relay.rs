use std::sync::Arc;

use meshcall_core::PartnerId;
use meshcall_session::{
    NegotiationState, Session, SessionConfig, SyntheticDevices, WsSignalingChannel,
};

use crate::integration::relay_tests::{TestRelay, start_relay};
use crate::integration::{init_tracing, test_room};
use crate::utils::{
    MockTransportFactory, ObservedEvent, SIGNAL_TIMEOUT_MS, TestObserver, wait_for_removal,
    wait_for_state,
};

async fn relay_session(relay: &TestRelay, id: u32, observer: &TestObserver) -> Session {
    let session = Session::builder(
        Arc::new(SyntheticDevices::new()),
        Arc::new(WsSignalingChannel::new(&relay.url)),
    )
    .config(SessionConfig::default())
    .observer(Arc::new(observer.clone()))
    .transport_factory(Arc::new(MockTransportFactory::new()))
    .spawn();

    session
        .join_room(test_room(), PartnerId(id))
        .await
        .expect("Failed to join room");
    session
}

#[tokio::test]
async fn test_two_sessions_connect_through_relay() {
    init_tracing();

    let relay = start_relay().await;
    let room = test_room();
    let (a_observer, b_observer) = (TestObserver::new(), TestObserver::new());

    let a = relay_session(&relay, 1, &a_observer).await;
    assert!(relay.wait_for_members(&room, 1).await);
    let b = relay_session(&relay, 2, &b_observer).await;

    let a_view = wait_for_state(
        &a,
        PartnerId(2),
        NegotiationState::Connected,
        SIGNAL_TIMEOUT_MS,
    )
    .await;
    let b_view = wait_for_state(
        &b,
        PartnerId(1),
        NegotiationState::Connected,
        SIGNAL_TIMEOUT_MS,
    )
    .await;
    assert_eq!(a_view.map(|s| s.state), Some(NegotiationState::Connected));
    assert_eq!(b_view.map(|s| s.state), Some(NegotiationState::Connected));

    b.hang_up().await.unwrap();
    assert!(wait_for_removal(&a, PartnerId(2), SIGNAL_TIMEOUT_MS).await);
    assert!(
        a_observer
            .wait_for(
                &ObservedEvent::Left {
                    partner: PartnerId(2)
                },
                SIGNAL_TIMEOUT_MS
            )
            .await
    );
    assert!(relay.wait_for_members(&room, 1).await);

    a.hang_up().await.unwrap();
    assert!(relay.wait_for_members(&room, 0).await);
}
