use anyhow::Result;
use async_trait::async_trait;
use meshcall_core::{PartnerId, RoomId};
use tokio::sync::mpsc;

/// One raw message from the room, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundSignal {
    pub from: PartnerId,
    pub room: RoomId,
    pub payload: String,
}

/// Room-scoped bus between participants. Delivery is at-least-once and
/// per-sender ordered; a member never receives its own messages.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Become a member of `room`; everything addressed to `local` goes to `inbound`.
    async fn join(
        &self,
        room: &RoomId,
        local: PartnerId,
        inbound: mpsc::UnboundedSender<InboundSignal>,
    ) -> Result<()>;

    /// Unicast to `to`, or broadcast to every other member when `None`.
    async fn send(
        &self,
        room: &RoomId,
        from: PartnerId,
        to: Option<PartnerId>,
        payload: String,
    ) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
