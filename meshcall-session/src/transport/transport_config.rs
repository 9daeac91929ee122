use meshcall_core::IceServerConfig;
use meshcall_core::utils::{
    DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2, DEFAULT_STUN_ADDR_3, DEFAULT_STUN_ADDR_4,
};
use serde::Deserialize;
use std::env;

pub const ICE_URLS_ENV: &str = "MESHCALL_ICE_URLS";
pub const ICE_USERNAME_ENV: &str = "MESHCALL_ICE_USERNAME";
pub const ICE_CREDENTIAL_ENV: &str = "MESHCALL_ICE_CREDENTIAL";

/// WebRTC settings (STUN/TURN).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec![
                    DEFAULT_STUN_ADDR.to_owned(),
                    DEFAULT_STUN_ADDR_2.to_owned(),
                    DEFAULT_STUN_ADDR_3.to_owned(),
                    DEFAULT_STUN_ADDR_4.to_owned(),
                ],
                username: None,
                credential: None,
            }],
        }
    }
}

impl TransportConfig {
    /// No ICE servers at all: host candidates only. Used for loopback setups.
    pub fn host_only() -> Self {
        Self {
            ice_servers: Vec::new(),
        }
    }

    /// Reads `MESHCALL_ICE_URLS` (comma separated) plus optional credentials,
    /// falling back to the public STUN servers when the variable is unset.
    pub fn from_env() -> Self {
        let Ok(urls) = env::var(ICE_URLS_ENV) else {
            return Self::default();
        };

        let urls: Vec<String> = urls
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_owned)
            .collect();

        if urls.is_empty() {
            return Self::host_only();
        }

        Self {
            ice_servers: vec![IceServerConfig {
                urls,
                username: env::var(ICE_USERNAME_ENV).ok(),
                credential: env::var(ICE_CREDENTIAL_ENV).ok(),
            }],
        }
    }
}
