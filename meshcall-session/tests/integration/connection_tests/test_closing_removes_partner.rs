use meshcall_core::{PartnerId, SignalMessage};

use crate::integration::{create_test_session, init_tracing};
use crate::utils::{ObservedEvent, SIGNAL_TIMEOUT_MS, settle, wait_for_removal};

#[tokio::test]
async fn test_closing_removes_partner() {
    init_tracing();

    let t = create_test_session(1).await;
    let partner = PartnerId(5);
    t.called_by(partner).await;

    t.signaling
        .inject(partner, SignalMessage::Closing(partner))
        .await;

    assert!(wait_for_removal(&t.session, partner, SIGNAL_TIMEOUT_MS).await);
    let transport = t.factory.latest(partner).unwrap();
    assert!(transport.is_closed(), "transport should be released");
    assert!(
        t.observer
            .wait_for(&ObservedEvent::Left { partner }, SIGNAL_TIMEOUT_MS)
            .await
    );
}

#[tokio::test]
async fn test_closing_is_idempotent() {
    init_tracing();

    let t = create_test_session(1).await;
    let partner = PartnerId(5);
    t.called_by(partner).await;

    for _ in 0..3 {
        t.signaling
            .inject(partner, SignalMessage::Closing(partner))
            .await;
    }
    // Closing from someone we never knew.
    t.signaling
        .inject(PartnerId(9), SignalMessage::Closing(PartnerId(9)))
        .await;

    assert!(wait_for_removal(&t.session, partner, SIGNAL_TIMEOUT_MS).await);
    settle().await;

    assert!(t.session.partners().await.unwrap().is_empty());
    assert_eq!(t.factory.open_count(partner), 1);
    assert_eq!(t.factory.live_count(partner), 0);
    assert_eq!(t.observer.count(&ObservedEvent::Left { partner }).await, 1);
    assert_eq!(
        t.observer
            .count(&ObservedEvent::Left {
                partner: PartnerId(9)
            })
            .await,
        0
    );
}
