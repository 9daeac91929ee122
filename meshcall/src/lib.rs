pub use meshcall_core::model::{PartnerId, RoomId, SignalMessage};

pub mod model {
    pub use meshcall_core::model::*;
}

pub mod codec {
    pub use meshcall_core::codec::*;
}

#[cfg(feature = "session")]
pub mod session {
    pub use meshcall_session::*;
}
