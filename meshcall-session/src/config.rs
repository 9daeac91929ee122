use crate::media::MediaConstraints;
use crate::transport::TransportConfig;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub transport: TransportConfig,

    /// Sent to every new partner as a `userinfo` extension when set.
    pub display_name: Option<String>,

    pub media_constraints: MediaConstraints,

    /// Bound of each partner worker's inbox.
    pub partner_inbox_capacity: usize,

    /// Bound of the controller's command queue.
    pub command_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            display_name: None,
            media_constraints: MediaConstraints::default(),
            partner_inbox_capacity: 64,
            command_capacity: 100,
        }
    }
}

impl SessionConfig {
    /// Defaults with ICE servers taken from the environment.
    pub fn from_env() -> Self {
        Self {
            transport: TransportConfig::from_env(),
            ..Self::default()
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}
