use meshcall_core::{PartnerId, RoomId, SignalMessage};

use crate::integration::{create_test_session, init_tracing};
use crate::utils::settle;

#[tokio::test]
async fn test_malformed_payloads_are_dropped() {
    init_tracing();

    let t = create_test_session(1).await;
    let partner = PartnerId(5);

    for payload in [
        "not json",
        "[1, 2]",
        "42",
        r#"{"sdp": {"type": "pranswer", "sdp": "v=0"}}"#,
        r#"{"call": "nobody"}"#,
    ] {
        t.signaling.inject_raw(partner, payload).await;
    }
    settle().await;

    assert!(t.session.partners().await.unwrap().is_empty());
    assert_eq!(t.factory.open_count(partner), 0);

    // The session keeps working afterwards.
    t.called_by(partner).await;
}

#[tokio::test]
async fn test_foreign_room_and_echo_are_dropped() {
    init_tracing();

    let t = create_test_session(1).await;

    let payload = meshcall_core::codec::encode(&SignalMessage::Call(PartnerId(5))).unwrap();
    t.signaling
        .inject_into(&RoomId::new("other-room"), PartnerId(5), payload)
        .await;
    t.signaling
        .inject(t.local, SignalMessage::Call(t.local))
        .await;
    settle().await;

    assert!(t.session.partners().await.unwrap().is_empty());
    assert_eq!(t.factory.open_count(PartnerId(5)), 0);
    assert_eq!(t.factory.open_count(t.local), 0);
}
