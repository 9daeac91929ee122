pub mod config;
pub mod error;
pub mod media;
pub mod partner;
pub mod session;
pub mod signaling;
pub mod transport;

pub use config::*;
pub use error::*;
pub use media::*;
pub use partner::*;
pub use session::*;
pub use signaling::*;
pub use transport::*;
