//! Conversion between the JSON wire shapes and [`SignalMessage`].
//!
//! Every signaling payload is a JSON object keyed by the message kind:
//!
//! ```text
//! { "call": 5 }
//! { "closing": 5 }
//! { "ice": { "candidate": "...", "sdpMid": "0", "sdpMLineIndex": 0 } }
//! { "sdp": { "type": "offer", "sdp": "v=0..." } }
//! { "<tag>": <anything> }
//! ```
//!
//! When a payload nominally matches several shapes the known keys win in a
//! fixed order: `closing`, `call`, `ice`, `sdp`. Any other object decodes to
//! [`SignalMessage::Extension`] so newer peers never break older ones: a lone
//! key becomes the tag, anything else is kept whole under [`UNTAGGED`].

use crate::model::{IceCandidate, PartnerId, SessionDescription, SignalMessage};
use serde_json::{Map, Value};
use thiserror::Error;

pub const CALL: &str = "call";
pub const CLOSING: &str = "closing";
pub const ICE: &str = "ice";
pub const SDP: &str = "sdp";

/// Extension tag for objects that are not keyed by a single tag, e.g.
/// `{"type": "userinfo", "message": {...}}`. The payload is the object.
pub const UNTAGGED: &str = "";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is not valid JSON: {0}")]
    NotJson(#[source] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("invalid `{tag}` body: {reason}")]
    InvalidBody { tag: &'static str, reason: String },

    #[error("failed to encode `{tag}` body: {source}")]
    Encode {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
}

pub fn encode(message: &SignalMessage) -> Result<String, CodecError> {
    Ok(encode_value(message)?.to_string())
}

pub fn encode_value(message: &SignalMessage) -> Result<Value, CodecError> {
    let (tag, body) = match message {
        SignalMessage::Call(id) => (CALL.to_owned(), Value::from(id.0)),
        SignalMessage::Closing(id) => (CLOSING.to_owned(), Value::from(id.0)),
        SignalMessage::IceCandidate(candidate) => (ICE.to_owned(), to_body(ICE, candidate)?),
        SignalMessage::SessionDescription(desc) => (SDP.to_owned(), to_body(SDP, desc)?),
        SignalMessage::Extension { tag, payload } if tag == UNTAGGED && payload.is_object() => {
            return Ok(payload.clone());
        }
        SignalMessage::Extension { tag, payload } => (tag.clone(), payload.clone()),
    };

    let mut fields = Map::new();
    fields.insert(tag, body);
    Ok(Value::Object(fields))
}

pub fn decode(payload: &str) -> Result<SignalMessage, CodecError> {
    let value: Value = serde_json::from_str(payload).map_err(CodecError::NotJson)?;
    decode_value(value)
}

pub fn decode_value(value: Value) -> Result<SignalMessage, CodecError> {
    let Value::Object(mut fields) = value else {
        return Err(CodecError::NotAnObject);
    };

    if let Some(body) = fields.remove(CLOSING) {
        return parse_id(CLOSING, body).map(SignalMessage::Closing);
    }
    if let Some(body) = fields.remove(CALL) {
        return parse_id(CALL, body).map(SignalMessage::Call);
    }
    if let Some(body) = fields.remove(ICE) {
        return from_body(ICE, body).map(SignalMessage::IceCandidate);
    }
    if let Some(body) = fields.remove(SDP) {
        return from_body(SDP, body).map(SignalMessage::SessionDescription);
    }

    let single = match fields.len() {
        1 => fields.keys().next().cloned(),
        _ => None,
    };
    if let Some(payload) = single.as_ref().and_then(|tag| fields.remove(tag)) {
        return Ok(SignalMessage::Extension {
            tag: single.unwrap_or_default(),
            payload,
        });
    }

    Ok(SignalMessage::Extension {
        tag: UNTAGGED.to_owned(),
        payload: Value::Object(fields),
    })
}

fn parse_id(tag: &'static str, body: Value) -> Result<PartnerId, CodecError> {
    let id = match &body {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.parse::<PartnerId>().ok().map(|id| id.0),
        _ => None,
    };

    id.map(PartnerId).ok_or_else(|| CodecError::InvalidBody {
        tag,
        reason: format!("expected a participant id, got {body}"),
    })
}

fn from_body<T: serde::de::DeserializeOwned>(tag: &'static str, body: Value) -> Result<T, CodecError> {
    serde_json::from_value(body).map_err(|e| CodecError::InvalidBody {
        tag,
        reason: e.to_string(),
    })
}

fn to_body<T: serde::Serialize>(tag: &str, body: &T) -> Result<Value, CodecError> {
    serde_json::to_value(body).map_err(|source| CodecError::Encode {
        tag: tag.to_owned(),
        source,
    })
}
