use crate::error::MediaAcquisitionError;
use crate::media::LocalStream;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exact device ids to capture from; `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    pub audio_device: Option<String>,
    pub video_device: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    AudioInput,
    VideoInput,
    AudioOutput,
    Display,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AudioInput => "microphone",
            Self::VideoInput => "camera",
            Self::AudioOutput => "speaker",
            Self::Display => "display",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub kind: DeviceKind,
    pub label: String,
}

/// Capture side of the platform: camera, microphone, screen.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn acquire_local_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<LocalStream, MediaAcquisitionError>;

    async fn acquire_display_media(&self) -> Result<LocalStream, MediaAcquisitionError>;

    async fn enumerate_devices(&self) -> Vec<DeviceInfo>;
}
