use crate::error::MediaAcquisitionError;
use crate::transport::RemoteTrack;
use async_trait::async_trait;
use meshcall_core::PartnerId;
use serde_json::Value;

/// Hooks for the application (UI, chat, recording). Every method has a
/// no-op default; implement the ones you need.
///
/// Callbacks are delivered in order on a task of their own, never on the
/// session or partner actors. Calling back into the `Session` from here is
/// fine; a slow callback only delays the callbacks queued behind it.
#[async_trait]
pub trait SessionObserver: Send + Sync {
    /// A connection to `partner` was created.
    async fn on_partner_joined(&self, _partner: PartnerId) {}

    /// Offer/answer exchange with `partner` completed.
    async fn on_partner_connected(&self, _partner: PartnerId) {}

    async fn on_remote_track(&self, _partner: PartnerId, _track: RemoteTrack) {}

    /// Opaque payload such as `userinfo` or chat text.
    async fn on_extension(&self, _partner: PartnerId, _tag: &str, _payload: &Value) {}

    async fn on_partner_left(&self, _partner: PartnerId) {}

    async fn on_media_error(&self, _error: &MediaAcquisitionError) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

#[async_trait]
impl SessionObserver for NoopObserver {}
