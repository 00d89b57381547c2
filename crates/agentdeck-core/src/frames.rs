//! Gateway event frame decoding.
//!
//! The gateway delivers frames shaped as `{event, payload}` with
//! dynamic payloads. Chat payloads are validated here, at the
//! boundary, into a closed tagged union keyed by `state`; unknown
//! states and malformed payloads are ignored, never fatal.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw inbound frame from the gateway event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    pub event: String,
    pub payload: Value,
}

/// A decoded `chat`-class frame. Frames for the same session key are
/// applied in arrival order; order across sessions is not meaningful.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// Streaming partial; `message` carries cumulative text.
    Delta { session_key: String, message: Value },
    /// Terminal message for the current turn.
    Final { session_key: String, message: Value },
    /// The run was aborted before completion.
    Aborted {
        session_key: String,
        error_message: Option<String>,
    },
    /// The gateway reported a failure for this session.
    Error {
        session_key: String,
        error_message: Option<String>,
    },
}

impl ChatEvent {
    pub fn session_key(&self) -> &str {
        match self {
            Self::Delta { session_key, .. }
            | Self::Final { session_key, .. }
            | Self::Aborted { session_key, .. }
            | Self::Error { session_key, .. } => session_key,
        }
    }
}

/// Decode a frame into a [`ChatEvent`].
///
/// Returns `None` for non-`chat` frames, payloads without a session
/// key, and unknown `state` values.
pub fn decode_chat_frame(frame: &EventFrame) -> Option<ChatEvent> {
    if frame.event != "chat" {
        return None;
    }
    let payload = frame.payload.as_object()?;
    let session_key = payload
        .get("sessionKey")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|key| !key.is_empty())?
        .to_string();
    let message = payload.get("message").cloned().unwrap_or(Value::Null);
    let error_message = payload
        .get("errorMessage")
        .and_then(Value::as_str)
        .map(str::to_string);

    match payload.get("state").and_then(Value::as_str)? {
        "delta" => Some(ChatEvent::Delta {
            session_key,
            message,
        }),
        "final" => Some(ChatEvent::Final {
            session_key,
            message,
        }),
        "aborted" => Some(ChatEvent::Aborted {
            session_key,
            error_message,
        }),
        "error" => Some(ChatEvent::Error {
            session_key,
            error_message,
        }),
        _ => None,
    }
}

// ─── Tests ────────────────────────────────────────────────────────
