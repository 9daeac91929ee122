use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::TrackLocal;

pub type LocalTrack = Arc<dyn TrackLocal + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn from_codec_type(kind: RTPCodecType) -> Option<Self> {
        match kind {
            RTPCodecType::Audio => Some(Self::Audio),
            RTPCodecType::Video => Some(Self::Video),
            _ => None,
        }
    }

    pub fn of(track: &LocalTrack) -> Option<Self> {
        Self::from_codec_type(track.kind())
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => f.write_str("audio"),
            Self::Video => f.write_str("video"),
        }
    }
}

/// Where outgoing video comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaSource {
    #[default]
    Camera,
    Screen,
}

/// A captured stream: at most one audio and one video track.
#[derive(Clone)]
pub struct LocalStream {
    pub id: String,
    pub audio: Option<LocalTrack>,
    pub video: Option<LocalTrack>,
}

impl fmt::Debug for LocalStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStream")
            .field("id", &self.id)
            .field("audio", &self.audio.as_ref().map(|t| t.id().to_owned()))
            .field("video", &self.video.as_ref().map(|t| t.id().to_owned()))
            .finish()
    }
}

/// Snapshot of the outgoing tracks. Always delivered as a whole so a
/// connection never sees audio of one source next to video of another.
#[derive(Clone, Default)]
pub struct TrackSet {
    pub audio: Option<LocalTrack>,
    pub video: Option<LocalTrack>,
}

impl TrackSet {
    pub fn is_empty(&self) -> bool {
        self.audio.is_none() && self.video.is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MediaKind, &LocalTrack)> {
        [
            (MediaKind::Video, self.video.as_ref()),
            (MediaKind::Audio, self.audio.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, track)| track.map(|t| (kind, t)))
    }
}

impl fmt::Debug for TrackSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackSet")
            .field("audio", &self.audio.as_ref().map(|t| t.id().to_owned()))
            .field("video", &self.video.as_ref().map(|t| t.id().to_owned()))
            .finish()
    }
}

/// Local capture state owned by the session controller.
#[derive(Debug)]
pub struct LocalMedia {
    camera: LocalStream,
    screen: Option<LocalStream>,
    source: MediaSource,
}

impl LocalMedia {
    pub fn new(camera: LocalStream) -> Self {
        Self {
            camera,
            screen: None,
            source: MediaSource::Camera,
        }
    }

    pub fn source(&self) -> MediaSource {
        self.source
    }

    pub fn camera(&self) -> &LocalStream {
        &self.camera
    }

    pub fn screen(&self) -> Option<&LocalStream> {
        self.screen.as_ref()
    }

    /// Swap in a re-acquired camera stream, returning the old one.
    pub fn replace_camera(&mut self, camera: LocalStream) -> LocalStream {
        std::mem::replace(&mut self.camera, camera)
    }

    pub fn show_screen(&mut self, screen: LocalStream) {
        self.screen = Some(screen);
        self.source = MediaSource::Screen;
    }

    /// Back to the camera; the screen stream is released.
    pub fn show_camera(&mut self) -> Option<LocalStream> {
        self.source = MediaSource::Camera;
        self.screen.take()
    }

    /// Microphone audio plus the current source's video.
    pub fn track_set(&self) -> TrackSet {
        let video = match (self.source, &self.screen) {
            (MediaSource::Screen, Some(screen)) if screen.video.is_some() => screen.video.clone(),
            _ => self.camera.video.clone(),
        };

        TrackSet {
            audio: self.camera.audio.clone(),
            video,
        }
    }
}
