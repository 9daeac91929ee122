mod local_media;
mod media_devices;
mod synthetic_devices;
mod track_distributor;

pub use local_media::*;
pub use media_devices::*;
pub use synthetic_devices::*;
pub use track_distributor::*;
