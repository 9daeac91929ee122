mod connection_wrapper;
mod peer_transport;
mod transport_config;
mod transport_event;

pub use connection_wrapper::{ConnectionWrapper, WebRtcTransportFactory};
pub use peer_transport::{PeerTransport, TransportFactory};
pub use transport_config::{ICE_CREDENTIAL_ENV, ICE_URLS_ENV, ICE_USERNAME_ENV, TransportConfig};
pub use transport_event::{RemoteTrack, TransportEvent};
