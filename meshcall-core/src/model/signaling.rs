use crate::model::partner::PartnerId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// One half of an offer/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Wire form of an ICE candidate (`RTCIceCandidateInit`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default)]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_mline_index: Option<u16>,
    #[serde(rename = "usernameFragment", default)]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
            username_fragment: None,
        }
    }
}

/// Typed signaling message. The sender id travels next to it.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalMessage {
    /// Presence announcement, asks everyone to connect.
    Call(PartnerId),
    /// Intentional departure.
    Closing(PartnerId),
    IceCandidate(IceCandidate),
    SessionDescription(SessionDescription),
    /// Opaque payload for collaborator modules, never interpreted here.
    Extension { tag: String, payload: Value },
}

impl SignalMessage {
    pub fn extension(tag: impl Into<String>, payload: Value) -> Self {
        Self::Extension {
            tag: tag.into(),
            payload,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Call(_) => "call",
            Self::Closing(_) => "closing",
            Self::IceCandidate(_) => "ice",
            Self::SessionDescription(desc) => match desc.kind {
                SdpKind::Offer => "offer",
                SdpKind::Answer => "answer",
            },
            Self::Extension { tag, .. } if tag.is_empty() => "extension",
            Self::Extension { tag, .. } => tag,
        }
    }
}
