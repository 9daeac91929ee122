use std::sync::Arc;

use meshcall_core::PartnerId;
use meshcall_session::{
    LocalSignalingHub, NegotiationState, Session, SessionConfig, SyntheticDevices,
    TransportConfig,
};

use crate::integration::{init_tracing, test_room};
use crate::utils::{CONNECTION_TIMEOUT_MS, ObservedEvent, TestObserver, wait_for_state};

fn real_session(hub: &LocalSignalingHub, observer: &TestObserver) -> Session {
    let config = SessionConfig {
        transport: TransportConfig::host_only(),
        ..SessionConfig::default()
    };

    Session::builder(Arc::new(SyntheticDevices::new()), Arc::new(hub.channel()))
        .config(config)
        .observer(Arc::new(observer.clone()))
        .spawn()
}

#[tokio::test]
async fn test_two_sessions_negotiate_over_webrtc() {
    init_tracing();

    let hub = LocalSignalingHub::new();
    let (a_observer, b_observer) = (TestObserver::new(), TestObserver::new());
    let a = real_session(&hub, &a_observer);
    let b = real_session(&hub, &b_observer);

    a.join_room(test_room(), PartnerId(1)).await.unwrap();
    b.join_room(test_room(), PartnerId(2)).await.unwrap();

    let a_view = wait_for_state(
        &a,
        PartnerId(2),
        NegotiationState::Connected,
        CONNECTION_TIMEOUT_MS,
    )
    .await;
    let b_view = wait_for_state(
        &b,
        PartnerId(1),
        NegotiationState::Connected,
        CONNECTION_TIMEOUT_MS,
    )
    .await;
    assert_eq!(a_view.map(|s| s.state), Some(NegotiationState::Connected));
    assert_eq!(b_view.map(|s| s.state), Some(NegotiationState::Connected));

    assert!(
        a_observer
            .wait_for(
                &ObservedEvent::Connected {
                    partner: PartnerId(2)
                },
                CONNECTION_TIMEOUT_MS
            )
            .await
    );

    a.hang_up().await.unwrap();
    b.hang_up().await.unwrap();
}
