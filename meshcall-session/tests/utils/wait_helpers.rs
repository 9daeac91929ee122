use meshcall_core::PartnerId;
use meshcall_session::{NegotiationState, PartnerSnapshot, Session};

/// Timeout for signal exchange through mocks (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 5000;

/// Timeout for real WebRTC negotiation (ms).
pub const CONNECTION_TIMEOUT_MS: u64 = 15000;

pub async fn snapshot_of(session: &Session, partner: PartnerId) -> Option<PartnerSnapshot> {
    session
        .partners()
        .await
        .ok()?
        .into_iter()
        .find(|s| s.partner == partner)
}

/// Poll until `partner` reaches `state`. Returns the last snapshot seen.
pub async fn wait_for_state(
    session: &Session,
    partner: PartnerId,
    state: NegotiationState,
    timeout_ms: u64,
) -> Option<PartnerSnapshot> {
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);

    loop {
        let snapshot = snapshot_of(session, partner).await;
        if snapshot.is_some_and(|s| s.state == state) || start.elapsed() > timeout {
            return snapshot;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

/// Poll until `partner` has no registry entry.
pub async fn wait_for_removal(session: &Session, partner: PartnerId, timeout_ms: u64) -> bool {
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);

    loop {
        if snapshot_of(session, partner).await.is_none() {
            return true;
        }
        if start.elapsed() > timeout {
            return false;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

/// Poll a synchronous condition, e.g. on a mock transport.
pub async fn wait_until<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);

    loop {
        if condition() {
            return true;
        }
        if start.elapsed() > timeout {
            return false;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

/// Let queued work drain when a test asserts that nothing happens.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
}
