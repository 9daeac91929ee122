use crate::signaling::{InboundSignal, SignalingChannel};
use anyhow::{Result, bail};
use async_trait::async_trait;
use dashmap::DashMap;
use meshcall_core::{PartnerId, RoomId, SignalMessage, codec};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

type Members = DashMap<PartnerId, mpsc::UnboundedSender<InboundSignal>>;

/// In-process room bus. Several sessions in one process talk through
/// channels handed out by the same hub.
#[derive(Clone, Default)]
pub struct LocalSignalingHub {
    rooms: Arc<DashMap<RoomId, Members>>,
}

impl LocalSignalingHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self) -> LocalSignalingChannel {
        LocalSignalingChannel {
            hub: self.clone(),
            membership: Mutex::new(None),
        }
    }

    pub fn members(&self, room: &RoomId) -> Vec<PartnerId> {
        let mut ids: Vec<_> = self
            .rooms
            .get(room)
            .map(|members| members.iter().map(|m| *m.key()).collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Drop a member as if its process died; the others get its closing.
    pub fn disconnect(&self, room: &RoomId, partner: PartnerId) {
        if !self.leave(room, partner) {
            return;
        }

        match codec::encode(&SignalMessage::Closing(partner)) {
            Ok(payload) => self.deliver(room, partner, None, payload),
            Err(e) => warn!("Failed to encode closing for {}: {}", partner, e),
        }
    }

    fn enter(&self, room: &RoomId, partner: PartnerId, tx: mpsc::UnboundedSender<InboundSignal>) {
        let members = self.rooms.entry(room.clone()).or_default();
        if members.insert(partner, tx).is_some() {
            warn!("Partner {} rejoined room '{}'", partner, room);
        }
        info!("Partner {} joined room '{}'", partner, room);
    }

    fn leave(&self, room: &RoomId, partner: PartnerId) -> bool {
        let removed = self
            .rooms
            .get(room)
            .is_some_and(|members| members.remove(&partner).is_some());
        self.rooms.remove_if(room, |_, members| members.is_empty());
        removed
    }

    fn deliver(&self, room: &RoomId, from: PartnerId, to: Option<PartnerId>, payload: String) {
        let Some(members) = self.rooms.get(room) else {
            debug!("Message from {} to empty room '{}' dropped", from, room);
            return;
        };

        let signal = InboundSignal {
            from,
            room: room.clone(),
            payload,
        };

        match to {
            Some(target) => match members.get(&target) {
                Some(tx) if target != from => {
                    let _ = tx.send(signal);
                }
                _ => debug!("No member {} in room '{}'", target, room),
            },
            None => {
                for member in members.iter().filter(|m| *m.key() != from) {
                    let _ = member.value().send(signal.clone());
                }
            }
        }
    }
}

/// One session's membership in a `LocalSignalingHub`.
pub struct LocalSignalingChannel {
    hub: LocalSignalingHub,
    membership: Mutex<Option<(RoomId, PartnerId)>>,
}

#[async_trait]
impl SignalingChannel for LocalSignalingChannel {
    async fn join(
        &self,
        room: &RoomId,
        local: PartnerId,
        inbound: mpsc::UnboundedSender<InboundSignal>,
    ) -> Result<()> {
        let mut membership = self.membership.lock().await;
        if let Some((joined, _)) = membership.as_ref() {
            bail!("channel is already in room '{joined}'");
        }

        self.hub.enter(room, local, inbound);
        *membership = Some((room.clone(), local));
        Ok(())
    }

    async fn send(
        &self,
        room: &RoomId,
        from: PartnerId,
        to: Option<PartnerId>,
        payload: String,
    ) -> Result<()> {
        self.hub.deliver(room, from, to, payload);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if let Some((room, local)) = self.membership.lock().await.take() {
            self.hub.leave(&room, local);
            info!("Partner {} left room '{}'", local, room);
        }
        Ok(())
    }
}
