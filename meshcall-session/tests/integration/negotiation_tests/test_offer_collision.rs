use meshcall_core::{PartnerId, SessionDescription, SignalMessage};
use meshcall_session::{NegotiationRole, NegotiationState};

use crate::integration::{create_test_session, init_tracing};
use crate::utils::{SIGNAL_TIMEOUT_MS, settle, wait_for_state};

fn remote_offer() -> SignalMessage {
    SignalMessage::SessionDescription(SessionDescription::offer("colliding-offer"))
}

#[tokio::test]
async fn test_lower_id_yields_on_collision() {
    init_tracing();

    // 10 < 20: we are the polite side.
    let t = create_test_session(10).await;
    let partner = PartnerId(20);

    t.session.call(partner).await.unwrap();
    wait_for_state(
        &t.session,
        partner,
        NegotiationState::OfferSent,
        SIGNAL_TIMEOUT_MS,
    )
    .await;

    t.signaling.inject(partner, remote_offer()).await;

    let snapshot = wait_for_state(
        &t.session,
        partner,
        NegotiationState::Connected,
        SIGNAL_TIMEOUT_MS,
    )
    .await
    .unwrap();
    assert_eq!(snapshot.state, NegotiationState::Connected);
    assert_eq!(snapshot.role, Some(NegotiationRole::Callee));

    // Our pending offer was dropped together with its transport.
    let transports = t.factory.transports(partner);
    assert_eq!(transports.len(), 2);
    assert!(transports[0].is_closed());
    assert!(!transports[1].is_closed());
    assert_eq!(transports[1].senders().len(), 2);

    assert!(t.signaling.wait_for_sent_to(partner, 2, SIGNAL_TIMEOUT_MS).await);
    assert_eq!(t.signaling.offers_to(partner).await, 1);
    assert_eq!(t.signaling.answers_to(partner).await, 1);
}

#[tokio::test]
async fn test_higher_id_keeps_its_offer_on_collision() {
    init_tracing();

    // 30 > 20: we are the impolite side.
    let t = create_test_session(30).await;
    let partner = PartnerId(20);

    t.session.call(partner).await.unwrap();
    wait_for_state(
        &t.session,
        partner,
        NegotiationState::OfferSent,
        SIGNAL_TIMEOUT_MS,
    )
    .await;

    t.signaling.inject(partner, remote_offer()).await;
    settle().await;

    let snapshot = wait_for_state(
        &t.session,
        partner,
        NegotiationState::OfferSent,
        SIGNAL_TIMEOUT_MS,
    )
    .await
    .unwrap();
    assert_eq!(snapshot.state, NegotiationState::OfferSent);
    assert_eq!(snapshot.role, Some(NegotiationRole::Caller));
    assert_eq!(t.factory.open_count(partner), 1);
    assert_eq!(t.signaling.answers_to(partner).await, 0);

    // The partner yields and answers our offer.
    t.signaling
        .inject(
            partner,
            SignalMessage::SessionDescription(SessionDescription::answer("their-answer")),
        )
        .await;
    let snapshot = wait_for_state(
        &t.session,
        partner,
        NegotiationState::Connected,
        SIGNAL_TIMEOUT_MS,
    )
    .await
    .unwrap();
    assert_eq!(snapshot.state, NegotiationState::Connected);
}
