use crate::media::TrackSet;
use meshcall_core::{IceCandidate, PartnerId, SessionDescription, SignalMessage};
use serde_json::Value;

/// Work items for one partner's worker, processed strictly in order.
#[derive(Debug)]
pub enum PartnerCommand {
    /// Local side starts negotiation.
    CreateOffer,

    /// Offer or answer from the partner.
    Remote(SessionDescription),

    /// ICE candidate from the partner.
    Ice(IceCandidate),

    /// New outgoing track snapshot. `initial` is set for a fresh
    /// connection, where adding senders is the expected path.
    SyncTracks { tracks: TrackSet, initial: bool },

    /// Opaque payload from the partner for the application.
    Extension { tag: String, payload: Value },

    /// Outbound message to the partner, ordered with negotiation output.
    Send(SignalMessage),
}

impl PartnerCommand {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateOffer => "create-offer",
            Self::Remote(_) => "remote-description",
            Self::Ice(_) => "ice",
            Self::SyncTracks { .. } => "sync-tracks",
            Self::Extension { .. } => "extension",
            Self::Send(_) => "send",
        }
    }
}

/// What a worker reports back to the session controller.
#[derive(Debug, Clone)]
pub enum PartnerEvent {
    /// Negotiation or the transport failed; the connection is gone and
    /// the registry entry for this generation should be dropped.
    Failed {
        partner: PartnerId,
        generation: u64,
        reason: String,
    },
}
