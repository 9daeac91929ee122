mod partner_command;
mod partner_connection;
mod partner_handle;
mod partner_registry;
mod partner_state;

pub use partner_command::*;
pub use partner_connection::*;
pub use partner_handle::*;
pub use partner_registry::*;
pub use partner_state::*;
