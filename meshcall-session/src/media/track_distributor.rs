use crate::error::SessionError;
use crate::media::{LocalMedia, TrackSet};
use crate::partner::{PartnerCommand, PartnerHandle, PartnerRegistry};
use crate::transport::PeerTransport;
use anyhow::Result;
use tracing::debug;

/// What a single sync did to one transport.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrackSyncReport {
    pub added: usize,
    pub replaced: usize,
}

/// Keeps the outgoing tracks of every partner connection in line with
/// the local media source.
pub struct TrackDistributor;

impl TrackDistributor {
    /// Hand the current track snapshot to every live connection.
    /// Returns how many connections received it.
    pub fn sync_all(registry: &PartnerRegistry, media: &LocalMedia) -> usize {
        let tracks = media.track_set();
        let delivered = registry.for_each(|_| PartnerCommand::SyncTracks {
            tracks: tracks.clone(),
            initial: false,
        });

        debug!(
            "Synced {:?} source to {} partner connection(s)",
            media.source(),
            delivered
        );
        delivered
    }

    pub fn sync_one(
        handle: &PartnerHandle,
        tracks: TrackSet,
        initial: bool,
    ) -> Result<(), SessionError> {
        handle.send(PartnerCommand::SyncTracks { tracks, initial })
    }

    /// Replace the track of an existing sender of the same kind, otherwise
    /// add a new sender. Runs inside the partner's worker.
    pub async fn apply(
        transport: &dyn PeerTransport,
        tracks: &TrackSet,
        initial: bool,
    ) -> Result<TrackSyncReport> {
        let mut report = TrackSyncReport::default();
        if tracks.is_empty() {
            debug!("No local tracks to place");
            return Ok(report);
        }

        for (kind, track) in tracks.iter() {
            if transport.replace_track(kind, track.clone()).await? {
                report.replaced += 1;
                continue;
            }

            if !initial {
                debug!("No {} sender to replace, adding one", kind);
            }
            transport.add_track(track.clone()).await?;
            report.added += 1;
        }

        Ok(report)
    }
}
