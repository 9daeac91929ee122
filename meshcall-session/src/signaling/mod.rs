mod local_hub;
mod relay_handler;
mod relay_service;
mod signaling_channel;
mod ws_channel;

pub use local_hub::*;
pub use relay_handler::*;
pub use relay_service::*;
pub use signaling_channel::*;
pub use ws_channel::*;
