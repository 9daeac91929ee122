use meshcall_core::codec::UNTAGGED;
use meshcall_core::{PartnerId, SdpKind, SignalMessage};
use meshcall_session::{SessionConfig, SyntheticDevices};
use serde_json::json;

use crate::integration::{create_test_session, create_test_session_with, init_tracing};
use crate::utils::{ObservedEvent, SIGNAL_TIMEOUT_MS, settle};

#[tokio::test]
async fn test_greeting_follows_offer() {
    init_tracing();

    let config = SessionConfig::default().with_display_name("ada");
    let t = create_test_session_with(1, config, SyntheticDevices::new()).await;
    let partner = PartnerId(5);
    t.called_by(partner).await;

    assert!(
        t.signaling
            .wait_for_sent_to(partner, 2, SIGNAL_TIMEOUT_MS)
            .await
    );
    let sent = t.signaling.sent_to(partner).await;
    assert!(matches!(
        &sent[0],
        SignalMessage::SessionDescription(d) if d.kind == SdpKind::Offer
    ));
    assert_eq!(
        sent[1],
        SignalMessage::extension("userinfo", json!({ "name": "ada" }))
    );
}

#[tokio::test]
async fn test_no_greeting_without_display_name() {
    init_tracing();

    let t = create_test_session(1).await;
    let partner = PartnerId(5);
    t.called_by(partner).await;
    settle().await;

    let sent = t.signaling.sent_to(partner).await;
    assert_eq!(sent.len(), 1, "only the offer: {sent:?}");
}

#[tokio::test]
async fn test_extension_reaches_observer() {
    init_tracing();

    let t = create_test_session(1).await;
    let partner = PartnerId(5);
    t.called_by(partner).await;

    t.signaling
        .inject(
            partner,
            SignalMessage::extension("chat", json!({ "text": "hello" })),
        )
        .await;

    let expected = ObservedEvent::Extension {
        partner,
        tag: "chat".into(),
        payload: json!({ "text": "hello" }),
    };
    assert!(t.observer.wait_for(&expected, SIGNAL_TIMEOUT_MS).await);
}

#[tokio::test]
async fn test_unkeyed_objects_reach_observer_whole() {
    init_tracing();

    let t = create_test_session(1).await;
    let partner = PartnerId(5);
    t.called_by(partner).await;

    t.signaling
        .inject_raw(
            partner,
            r#"{"type": "userinfo", "message": {"name": "Ada"}}"#,
        )
        .await;
    t.signaling.inject_raw(partner, "{}").await;

    for payload in [
        json!({ "type": "userinfo", "message": { "name": "Ada" } }),
        json!({}),
    ] {
        let expected = ObservedEvent::Extension {
            partner,
            tag: UNTAGGED.into(),
            payload,
        };
        assert!(t.observer.wait_for(&expected, SIGNAL_TIMEOUT_MS).await);
    }

    let snapshot = t.session.partners().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(t.factory.open_count(partner), 1);
}

#[tokio::test]
async fn test_extension_from_stranger_is_dropped() {
    init_tracing();

    let t = create_test_session(1).await;
    let stranger = PartnerId(9);
    t.signaling
        .inject(stranger, SignalMessage::extension("chat", json!("psst")))
        .await;
    settle().await;

    assert!(t.observer.extensions_from(stranger).await.is_empty());
    assert!(t.session.partners().await.unwrap().is_empty());
    assert_eq!(t.factory.open_count(stranger), 0);
}

#[tokio::test]
async fn test_broadcast_reaches_every_partner() {
    init_tracing();

    let t = create_test_session(1).await;
    for id in [5, 6] {
        t.called_by(PartnerId(id)).await;
    }

    let delivered = t
        .session
        .broadcast("mute", json!({ "audio": true }))
        .await
        .unwrap();
    assert_eq!(delivered, 2);

    let expected = SignalMessage::extension("mute", json!({ "audio": true }));
    for id in [5, 6] {
        let partner = PartnerId(id);
        assert!(
            t.signaling
                .wait_for_sent_to(partner, 2, SIGNAL_TIMEOUT_MS)
                .await
        );
        assert!(t.signaling.sent_to(partner).await.contains(&expected));
    }
    // Extensions are unicast per connection, never a room broadcast.
    assert!(!t.signaling.broadcasts().await.contains(&expected));
}
