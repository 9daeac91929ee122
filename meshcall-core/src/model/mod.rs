mod partner;
mod relay;
mod room;
mod signaling;

pub use partner::{PARTNER_ID_RANGE, PartnerId};
pub use relay::{RelayDelivery, RelayFrame};
pub use room::RoomId;
pub use signaling::{IceCandidate, IceServerConfig, SdpKind, SessionDescription, SignalMessage};
