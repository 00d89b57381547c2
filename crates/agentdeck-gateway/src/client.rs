//! Typed gateway RPC surface.
//!
//! The gateway speaks method-name + JSON-params calls and pushes
//! `{event, payload}` frames on a broadcast stream. [`GatewayClient`]
//! is the seam: the engine talks to the trait, transports implement it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use agentdeck_core::frames::EventFrame;

/// Capacity of the event broadcast channel. Slow subscribers lag and
/// drop rather than block the reader loop.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway io: {0}")]
    Io(#[from] std::io::Error),
    #[error("gateway protocol: {0}")]
    Protocol(String),
    /// The gateway accepted the call but reported a failure.
    #[error("gateway rejected {method}: {message}")]
    Rpc { method: String, message: String },
    #[error("gateway connection closed")]
    Closed,
}

/// One RPC call plus an event subscription. Calls are independent;
/// ordering guarantees apply only to the event stream, per session.
pub trait GatewayClient {
    fn call(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, GatewayError>> + Send;

    /// Subscribe to the live event stream. Each receiver sees every
    /// frame published after the subscription.
    fn subscribe(&self) -> broadcast::Receiver<EventFrame>;
}

// ─── Typed Params ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSendParams {
    pub session_key: String,
    pub message: String,
    /// Delivery hint for the gateway's own routing; always false here,
    /// responses come back on the event stream.
    pub deliver: bool,
}

impl ChatSendParams {
    pub fn new(session_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            message: message.into(),
            deliver: false,
        }
    }
}

/// Settings patch for one session. The outer option controls whether
/// a field is sent at all; an inner `None` goes out as an explicit
/// `null`, which clears the setting gateway-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsPatchParams {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_level: Option<Option<String>>,
}

impl SessionsPatchParams {
    pub fn model(key: impl Into<String>, model: Option<String>) -> Self {
        Self {
            key: key.into(),
            model: Some(model),
            thinking_level: None,
        }
    }

    pub fn thinking_level(key: impl Into<String>, level: Option<String>) -> Self {
        Self {
            key: key.into(),
            model: None,
            thinking_level: Some(level),
        }
    }
}

/// One selectable model as reported by `models.list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelChoice {
    pub id: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the model exposes a tunable reasoning level.
    #[serde(default)]
    pub reasoning: bool,
}

// ─── Typed Calls ──────────────────────────────────────────────────

/// Send a user message into an agent session.
pub async fn chat_send<G: GatewayClient>(
    gateway: &G,
    params: ChatSendParams,
) -> Result<(), GatewayError> {
    let params = serde_json::to_value(&params)
        .map_err(|e| GatewayError::Protocol(e.to_string()))?;
    gateway.call("chat.send", params).await?;
    Ok(())
}

/// Patch per-session settings (model, thinking level).
pub async fn sessions_patch<G: GatewayClient>(
    gateway: &G,
    params: SessionsPatchParams,
) -> Result<(), GatewayError> {
    let params = serde_json::to_value(&params)
        .map_err(|e| GatewayError::Protocol(e.to_string()))?;
    gateway.call("sessions.patch", params).await?;
    Ok(())
}

/// Fetch the selectable model catalog. Accepts either a bare array or
/// a `{models: [...]}` wrapper.
pub async fn models_list<G: GatewayClient>(gateway: &G) -> Result<Vec<ModelChoice>, GatewayError> {
    let result = gateway.call("models.list", Value::Null).await?;
    let list = match &result {
        Value::Array(_) => result.clone(),
        Value::Object(map) => map.get("models").cloned().unwrap_or(Value::Array(vec![])),
        _ => Value::Array(vec![]),
    };
    serde_json::from_value(list).map_err(|e| GatewayError::Protocol(e.to_string()))
}

// ─── Tests ────────────────────────────────────────────────────────
