use crate::error::MediaAcquisitionError;
use crate::media::{
    DeviceInfo, DeviceKind, LocalStream, LocalTrack, MediaConstraints, MediaDevices, MediaKind,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Sample-fed track of the given kind (Opus for audio, VP8 for video).
pub fn synthetic_track(kind: MediaKind, track_id: &str, stream_id: &str) -> LocalTrack {
    let capability = match kind {
        MediaKind::Audio => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            ..Default::default()
        },
        MediaKind::Video => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
    };

    Arc::new(TrackLocalStaticSample::new(
        capability,
        track_id.to_owned(),
        stream_id.to_owned(),
    ))
}

/// In-process device set. Hands out `TrackLocalStaticSample` tracks that an
/// application feeds itself; useful headless and in tests.
pub struct SyntheticDevices {
    devices: Vec<DeviceInfo>,
    denied: HashSet<DeviceKind>,
    display_available: bool,
    streams: AtomicU64,
}

impl Default for SyntheticDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticDevices {
    /// One microphone, one camera, screen sharing available.
    pub fn new() -> Self {
        Self::empty()
            .with_device(DeviceKind::AudioInput, "mic-0", "Synthetic microphone")
            .with_device(DeviceKind::VideoInput, "cam-0", "Synthetic camera")
    }

    pub fn empty() -> Self {
        Self {
            devices: Vec::new(),
            denied: HashSet::new(),
            display_available: true,
            streams: AtomicU64::new(0),
        }
    }

    pub fn with_device(mut self, kind: DeviceKind, device_id: &str, label: &str) -> Self {
        self.devices.push(DeviceInfo {
            device_id: device_id.to_owned(),
            kind,
            label: label.to_owned(),
        });
        self
    }

    /// Simulate the user refusing access to a device kind.
    pub fn deny(mut self, kind: DeviceKind) -> Self {
        self.denied.insert(kind);
        self
    }

    pub fn without_display(mut self) -> Self {
        self.display_available = false;
        self
    }

    fn next_stream_id(&self, prefix: &str) -> String {
        let n = self.streams.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{n}")
    }

    fn pick(&self, kind: DeviceKind, wanted: Option<&str>) -> Result<&DeviceInfo, MediaAcquisitionError> {
        if self.denied.contains(&kind) {
            return Err(MediaAcquisitionError::PermissionDenied(kind));
        }

        let mut candidates = self.devices.iter().filter(|d| d.kind == kind);
        let found = match wanted {
            Some(id) => candidates.find(|d| d.device_id == id),
            None => candidates.next(),
        };

        found.ok_or_else(|| MediaAcquisitionError::DeviceNotFound {
            kind,
            device_id: wanted.unwrap_or("default").to_owned(),
        })
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn acquire_local_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<LocalStream, MediaAcquisitionError> {
        let mic = self.pick(DeviceKind::AudioInput, constraints.audio_device.as_deref())?;
        let cam = self.pick(DeviceKind::VideoInput, constraints.video_device.as_deref())?;

        let stream_id = self.next_stream_id("camera");
        debug!(
            "Acquired synthetic stream {} (mic '{}', camera '{}')",
            stream_id, mic.device_id, cam.device_id
        );

        Ok(LocalStream {
            audio: Some(synthetic_track(
                MediaKind::Audio,
                &format!("{stream_id}-{}", mic.device_id),
                &stream_id,
            )),
            video: Some(synthetic_track(
                MediaKind::Video,
                &format!("{stream_id}-{}", cam.device_id),
                &stream_id,
            )),
            id: stream_id,
        })
    }

    async fn acquire_display_media(&self) -> Result<LocalStream, MediaAcquisitionError> {
        if self.denied.contains(&DeviceKind::Display) {
            return Err(MediaAcquisitionError::PermissionDenied(DeviceKind::Display));
        }
        if !self.display_available {
            return Err(MediaAcquisitionError::NoDisplaySource);
        }

        let stream_id = self.next_stream_id("screen");
        Ok(LocalStream {
            audio: None,
            video: Some(synthetic_track(
                MediaKind::Video,
                &format!("{stream_id}-display"),
                &stream_id,
            )),
            id: stream_id,
        })
    }

    async fn enumerate_devices(&self) -> Vec<DeviceInfo> {
        self.devices.clone()
    }
}
