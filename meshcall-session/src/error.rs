use crate::media::DeviceKind;
use meshcall_core::{CodecError, PartnerId};
use thiserror::Error;

/// Local camera/microphone/screen could not be obtained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaAcquisitionError {
    #[error("no {kind} device with id '{device_id}'")]
    DeviceNotFound { kind: DeviceKind, device_id: String },

    #[error("access to {0} was denied")]
    PermissionDenied(DeviceKind),

    #[error("no display source is available for screen sharing")]
    NoDisplaySource,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("local media unavailable: {0}")]
    MediaAcquisition(#[from] MediaAcquisitionError),

    #[error("message for absent partner {0}")]
    StaleMessage(PartnerId),

    #[error("malformed signaling message: {0}")]
    MalformedMessage(#[from] CodecError),

    #[error("inbox of partner {0} is full")]
    InboxFull(PartnerId),

    #[error("negotiation with partner {partner} failed: {reason}")]
    Negotiation { partner: PartnerId, reason: String },

    #[error("negotiation with partner {0} was cancelled")]
    Cancelled(PartnerId),

    #[error("signaling channel error: {0}")]
    Signaling(String),

    #[error("session has not joined a room")]
    NotJoined,

    #[error("session already joined room '{0}'")]
    AlreadyJoined(String),

    #[error("session has shut down")]
    Shutdown,
}

impl SessionError {
    pub(crate) fn negotiation(partner: PartnerId, err: anyhow::Error) -> Self {
        Self::Negotiation {
            partner,
            reason: format!("{err:#}"),
        }
    }

    /// Failures that only concern one partner and never stop the session.
    pub fn is_partner_scoped(&self) -> bool {
        matches!(
            self,
            Self::StaleMessage(_)
                | Self::InboxFull(_)
                | Self::Negotiation { .. }
                | Self::Cancelled(_)
        )
    }
}
