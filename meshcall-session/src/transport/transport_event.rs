use crate::media::MediaKind;
use meshcall_core::IceCandidate;
use std::fmt;
use std::sync::Arc;
use webrtc::track::track_remote::TrackRemote;

/// Events a transport raises for the partner connection that owns it.
/// Each transport gets its own channel, so events of a replaced transport
/// die with it.
pub enum TransportEvent {
    /// A local ICE candidate was gathered; it has to reach the partner.
    CandidateGenerated(IceCandidate),

    /// The partner started sending media.
    RemoteTrack(RemoteTrack),

    /// The link is unusable (ICE failure and the like).
    Failed(String),
}

/// Incoming media track announced by a partner.
#[derive(Clone)]
pub struct RemoteTrack {
    pub kind: MediaKind,
    pub track_id: String,
    pub stream_id: String,
    pub track: Option<Arc<TrackRemote>>,
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("kind", &self.kind)
            .field("track_id", &self.track_id)
            .field("stream_id", &self.stream_id)
            .finish()
    }
}
