use axum::extract::ws::Message;
use dashmap::DashMap;
use meshcall_core::{PartnerId, RelayDelivery, RelayFrame, RoomId, SignalMessage, codec};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

struct Member {
    socket: u64,
    tx: mpsc::UnboundedSender<Message>,
}

struct RelayInner {
    rooms: DashMap<RoomId, DashMap<PartnerId, Member>>,
    sockets: AtomicU64,
}

/// Room membership of the WebSocket relay. Stamps senders, routes frames,
/// never echoes back to the sender.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                rooms: DashMap::new(),
                sockets: AtomicU64::new(0),
            }),
        }
    }

    /// Register a socket; returns a token for `remove_member`.
    pub fn add_member(
        &self,
        room: &RoomId,
        partner: PartnerId,
        tx: mpsc::UnboundedSender<Message>,
    ) -> u64 {
        let socket = self.inner.sockets.fetch_add(1, Ordering::Relaxed);
        let members = self.inner.rooms.entry(room.clone()).or_default();
        if members.insert(partner, Member { socket, tx }).is_some() {
            warn!("Partner {} reconnected to room '{}'", partner, room);
        }
        socket
    }

    /// Forget the member unless a newer socket has taken its place.
    pub fn remove_member(&self, room: &RoomId, partner: PartnerId, socket: u64) -> bool {
        let removed = self.inner.rooms.get(room).is_some_and(|members| {
            members
                .remove_if(&partner, |_, m| m.socket == socket)
                .is_some()
        });
        self.inner
            .rooms
            .remove_if(room, |_, members| members.is_empty());
        removed
    }

    pub fn members(&self, room: &RoomId) -> Vec<PartnerId> {
        let mut ids: Vec<_> = self
            .inner
            .rooms
            .get(room)
            .map(|members| members.iter().map(|m| *m.key()).collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn route(&self, room: &RoomId, from: PartnerId, frame: RelayFrame) {
        let delivery = RelayDelivery {
            from,
            room: room.clone(),
            payload: frame.payload,
        };
        let json = match serde_json::to_string(&delivery) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize relay delivery: {}", e);
                return;
            }
        };

        let Some(members) = self.inner.rooms.get(room) else {
            return;
        };

        match frame.to {
            Some(target) if target == from => debug!("Dropped self-addressed frame from {}", from),
            Some(target) => match members.get(&target) {
                Some(member) => {
                    if let Err(e) = member.tx.send(Message::Text(json.into())) {
                        error!("Failed to send WS message to {}: {:?}", target, e);
                    }
                }
                None => warn!(
                    "Attempted to relay to partner {} absent from room '{}'",
                    target, room
                ),
            },
            None => {
                for member in members.iter().filter(|m| *m.key() != from) {
                    let _ = member.tx.send(Message::Text(json.clone().into()));
                }
            }
        }
    }

    /// Tell the rest of the room that `partner` is gone.
    pub fn announce_departure(&self, room: &RoomId, partner: PartnerId) {
        let payload = match codec::encode(&SignalMessage::Closing(partner)) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode closing for {}: {}", partner, e);
                return;
            }
        };

        info!("Announcing departure of {} to room '{}'", partner, room);
        self.route(room, partner, RelayFrame { to: None, payload });
    }
}
