use crate::model::partner::PartnerId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

/// Client -> relay frame. The relay stamps the sender itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<PartnerId>,
    /// Encoded `SignalMessage`.
    pub payload: String,
}

/// Relay -> client frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayDelivery {
    pub from: PartnerId,
    pub room: RoomId,
    pub payload: String,
}
