use crate::media::{LocalTrack, MediaKind};
use crate::transport::TransportEvent;
use anyhow::Result;
use async_trait::async_trait;
use meshcall_core::{IceCandidate, PartnerId, SessionDescription};
use tokio::sync::mpsc;

/// One peer-to-peer media link. Owned exclusively by a single partner
/// connection; never shared.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Swap the track of the sender currently carrying `kind`.
    /// Returns `false` when there is no such sender yet.
    async fn replace_track(&self, kind: MediaKind, track: LocalTrack) -> Result<bool>;

    async fn add_track(&self, track: LocalTrack) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Opens transports. `events` is the channel the new transport reports into.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn open(
        &self,
        partner: PartnerId,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>>;
}
