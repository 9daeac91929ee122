use crate::error::SessionError;
use crate::media::{MediaConstraints, MediaSource};
use crate::partner::PartnerSnapshot;
use meshcall_core::{PartnerId, RoomId};
use serde_json::Value;
use tokio::sync::oneshot;

pub type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Requests from `Session` handles to the controller task.
#[derive(Debug)]
pub enum SessionCommand {
    JoinRoom {
        room: RoomId,
        local: PartnerId,
        reply: Reply<()>,
    },

    /// Announce ourselves to the whole room.
    CallAll { reply: Reply<()> },

    /// Open a fresh connection to one partner and offer.
    Call { partner: PartnerId, reply: Reply<()> },

    SwitchMediaSource {
        source: MediaSource,
        reply: Reply<usize>,
    },

    ChangeDevices {
        constraints: MediaConstraints,
        reply: Reply<usize>,
    },

    Broadcast {
        tag: String,
        payload: Value,
        reply: Reply<usize>,
    },

    HangUp { reply: Reply<()> },

    Partners { reply: Reply<Vec<PartnerSnapshot>> },

    LocalMediaSource { reply: Reply<MediaSource> },
}
