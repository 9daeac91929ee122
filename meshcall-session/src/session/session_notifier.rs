use crate::error::MediaAcquisitionError;
use crate::session::SessionObserver;
use crate::transport::RemoteTrack;
use meshcall_core::PartnerId;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// One observer callback waiting to be delivered.
#[derive(Debug)]
pub enum SessionEvent {
    PartnerJoined(PartnerId),
    PartnerConnected(PartnerId),
    RemoteTrack(PartnerId, RemoteTrack),
    Extension {
        partner: PartnerId,
        tag: String,
        payload: Value,
    },
    PartnerLeft(PartnerId),
    MediaError(MediaAcquisitionError),
}

/// Queue in front of the application's `SessionObserver`.
///
/// The controller and the partner workers only enqueue; a dedicated task
/// runs the callbacks one at a time, in the order they were raised. A
/// callback may call back into the `Session` or take its time without
/// holding up negotiation or teardown.
#[derive(Clone)]
pub struct SessionNotifier {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionNotifier {
    /// Start the delivery task. It ends once every notifier clone is dropped.
    pub fn spawn(observer: Arc<dyn SessionObserver>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(deliver(observer, rx));
        Self { tx }
    }

    pub fn notify(&self, event: SessionEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!("Observer delivery has stopped, dropped {:?}", e.0);
        }
    }
}

async fn deliver(observer: Arc<dyn SessionObserver>, mut rx: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            SessionEvent::PartnerJoined(partner) => observer.on_partner_joined(partner).await,
            SessionEvent::PartnerConnected(partner) => {
                observer.on_partner_connected(partner).await
            }
            SessionEvent::RemoteTrack(partner, track) => {
                observer.on_remote_track(partner, track).await
            }
            SessionEvent::Extension {
                partner,
                tag,
                payload,
            } => observer.on_extension(partner, &tag, &payload).await,
            SessionEvent::PartnerLeft(partner) => observer.on_partner_left(partner).await,
            SessionEvent::MediaError(error) => observer.on_media_error(&error).await,
        }
    }
    debug!("Observer delivery finished");
}
