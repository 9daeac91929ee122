use meshcall_core::{PartnerId, SessionDescription, SignalMessage};
use meshcall_session::{NegotiationState, TransportEvent};

use crate::integration::{create_test_session, init_tracing};
use crate::utils::{ObservedEvent, SIGNAL_TIMEOUT_MS, settle, snapshot_of, wait_for_removal};

#[tokio::test]
async fn test_transport_failure_closes_only_that_partner() {
    init_tracing();

    let t = create_test_session(1).await;
    let (failing, healthy) = (PartnerId(5), PartnerId(6));
    t.called_by(failing).await;
    t.called_by(healthy).await;

    t.factory
        .latest(failing)
        .unwrap()
        .emit(TransportEvent::Failed("ice failed".into()));

    assert!(wait_for_removal(&t.session, failing, SIGNAL_TIMEOUT_MS).await);
    assert!(t.factory.latest(failing).unwrap().is_closed());
    assert!(
        t.observer
            .wait_for(&ObservedEvent::Left { partner: failing }, SIGNAL_TIMEOUT_MS)
            .await
    );

    let other = snapshot_of(&t.session, healthy).await.unwrap();
    assert_eq!(other.state, NegotiationState::OfferSent);
    assert!(!t.factory.latest(healthy).unwrap().is_closed());
}

#[tokio::test]
async fn test_rejected_offer_drops_partner_without_answer() {
    init_tracing();

    let t = create_test_session(1).await;
    t.factory.fail_remote_descriptions();
    let partner = PartnerId(8);

    t.signaling
        .inject(
            partner,
            SignalMessage::SessionDescription(SessionDescription::offer("garbage")),
        )
        .await;

    assert!(
        t.observer
            .wait_for(&ObservedEvent::Left { partner }, SIGNAL_TIMEOUT_MS)
            .await
    );
    assert!(wait_for_removal(&t.session, partner, SIGNAL_TIMEOUT_MS).await);
    settle().await;
    assert_eq!(t.signaling.answers_to(partner).await, 0);

    // The session itself keeps working.
    t.called_by(PartnerId(9)).await;
}
