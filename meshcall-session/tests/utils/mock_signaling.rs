use anyhow::{Result, bail};
use async_trait::async_trait;
use meshcall_core::{PartnerId, RoomId, SdpKind, SignalMessage, codec};
use meshcall_session::{InboundSignal, SignalingChannel};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// A message the session put on the wire.
#[derive(Debug, Clone)]
pub struct SentSignal {
    pub from: PartnerId,
    pub to: Option<PartnerId>,
    pub message: SignalMessage,
}

struct Joined {
    room: RoomId,
    inbound: mpsc::UnboundedSender<InboundSignal>,
}

/// Mock SignalingChannel that records everything sent and lets tests
/// play the rest of the room.
///
/// # Example
///
/// ```ignore
/// let signaling = MockSignalingChannel::new();
/// // ... session joins ...
/// signaling.inject(PartnerId(5), SignalMessage::Call(PartnerId(5))).await;
/// let offers = signaling.offers_to(PartnerId(5)).await;
/// ```
#[derive(Clone, Default)]
pub struct MockSignalingChannel {
    joined: Arc<Mutex<Option<Joined>>>,
    sent: Arc<Mutex<Vec<SentSignal>>>,
    closed: Arc<Mutex<bool>>,
}

impl MockSignalingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `msg` as if `from` had sent it to the joined room.
    pub async fn inject(&self, from: PartnerId, msg: SignalMessage) {
        let payload = codec::encode(&msg).expect("encodable message");
        self.inject_raw(from, payload).await;
    }

    pub async fn inject_raw(&self, from: PartnerId, payload: impl Into<String>) {
        let room = self.room().await.expect("session has not joined");
        self.inject_into(&room, from, payload).await;
    }

    /// Deliver a payload stamped with an arbitrary room.
    pub async fn inject_into(&self, room: &RoomId, from: PartnerId, payload: impl Into<String>) {
        if let Some(joined) = self.joined.lock().await.as_ref() {
            let _ = joined.inbound.send(InboundSignal {
                from,
                room: room.clone(),
                payload: payload.into(),
            });
        }
    }

    pub async fn room(&self) -> Option<RoomId> {
        self.joined.lock().await.as_ref().map(|j| j.room.clone())
    }

    pub async fn sent(&self) -> Vec<SentSignal> {
        self.sent.lock().await.clone()
    }

    /// Messages unicast to `partner`.
    pub async fn sent_to(&self, partner: PartnerId) -> Vec<SignalMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|s| s.to == Some(partner))
            .map(|s| s.message.clone())
            .collect()
    }

    pub async fn broadcasts(&self) -> Vec<SignalMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|s| s.to.is_none())
            .map(|s| s.message.clone())
            .collect()
    }

    pub async fn descriptions_to(&self, partner: PartnerId, kind: SdpKind) -> usize {
        self.sent_to(partner)
            .await
            .iter()
            .filter(|m| matches!(m, SignalMessage::SessionDescription(d) if d.kind == kind))
            .count()
    }

    pub async fn offers_to(&self, partner: PartnerId) -> usize {
        self.descriptions_to(partner, SdpKind::Offer).await
    }

    pub async fn answers_to(&self, partner: PartnerId) -> usize {
        self.descriptions_to(partner, SdpKind::Answer).await
    }

    pub async fn is_closed(&self) -> bool {
        *self.closed.lock().await
    }

    /// Wait until at least `count` messages were sent to `partner`.
    pub async fn wait_for_sent_to(&self, partner: PartnerId, count: usize, timeout_ms: u64) -> bool {
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(timeout_ms);

        loop {
            if self.sent_to(partner).await.len() >= count {
                return true;
            }
            if start.elapsed() > timeout {
                return false;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl SignalingChannel for MockSignalingChannel {
    async fn join(
        &self,
        room: &RoomId,
        _local: PartnerId,
        inbound: mpsc::UnboundedSender<InboundSignal>,
    ) -> Result<()> {
        let mut joined = self.joined.lock().await;
        if joined.is_some() {
            bail!("already joined");
        }
        *joined = Some(Joined {
            room: room.clone(),
            inbound,
        });
        Ok(())
    }

    async fn send(
        &self,
        _room: &RoomId,
        from: PartnerId,
        to: Option<PartnerId>,
        payload: String,
    ) -> Result<()> {
        let message = codec::decode(&payload)?;
        tracing::debug!("[MockSignaling] {} -> {:?}: {}", from, to, message.label());

        self.sent
            .lock()
            .await
            .push(SentSignal { from, to, message });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        *self.closed.lock().await = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_signaling_records_unicast() {
        let signaling = MockSignalingChannel::new();
        let room = RoomId::new("r");
        let (tx, _rx) = mpsc::unbounded_channel();
        signaling.join(&room, PartnerId(1), tx).await.unwrap();

        let payload = codec::encode(&SignalMessage::Call(PartnerId(1))).unwrap();
        signaling
            .send(&room, PartnerId(1), Some(PartnerId(2)), payload)
            .await
            .unwrap();

        assert_eq!(
            signaling.sent_to(PartnerId(2)).await,
            vec![SignalMessage::Call(PartnerId(1))]
        );
        assert!(signaling.broadcasts().await.is_empty());
    }
}
