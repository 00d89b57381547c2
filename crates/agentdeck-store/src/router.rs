//! Session event router: applies decoded chat events to the owning
//! tile via exact session-key lookup.
//!
//! Frames for the same session are applied in arrival order; no
//! reordering or coalescing. A frame whose session matches no tile is
//! an expected race (tile deleted mid-stream) and is dropped silently.

use chrono::{DateTime, Utc};

use agentdeck_core::frames::ChatEvent;
use agentdeck_core::text::{PREVIEW_MAX_CHARS, extract_reasoning, extract_text, preview,
    strip_ui_metadata};
use agentdeck_core::types::TileStatus;

use crate::store::{TilePatch, TileStore};

/// What the router did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A mutation was applied to the addressed tile.
    Applied { project_id: String, tile_id: String },
    /// No tile owns this session key; the frame was dropped.
    UnknownSession,
    /// The frame decoded but carried nothing to apply (e.g. a delta
    /// with no extractable text).
    NoChange,
}

/// Apply one chat event to the store.
pub fn route_chat_event(
    store: &mut TileStore,
    event: &ChatEvent,
    now: DateTime<Utc>,
) -> RouteOutcome {
    let Some(address) = store.address_for_session(event.session_key()).cloned() else {
        tracing::debug!(session_key = event.session_key(), "dropping frame for unknown session");
        return RouteOutcome::UnknownSession;
    };
    let project_id = address.project_id;
    let tile_id = address.tile_id;

    match event {
        ChatEvent::Delta { message, .. } => {
            let text = extract_text(message)
                .map(|t| strip_ui_metadata(&t))
                .filter(|t| !t.is_empty());
            let reasoning = extract_reasoning(message)
                .map(|t| strip_ui_metadata(&t))
                .filter(|t| !t.is_empty());
            if text.is_none() && reasoning.is_none() {
                return RouteOutcome::NoChange;
            }
            let mut patch = TilePatch::status(TileStatus::Running);
            if let Some(text) = text {
                patch.stream_text = Some(Some(text));
            }
            if let Some(reasoning) = reasoning {
                patch.thinking_trace = Some(Some(reasoning));
            }
            store.update_tile(&project_id, &tile_id, patch, now);
            RouteOutcome::Applied { project_id, tile_id }
        }
        ChatEvent::Final { message, .. } => {
            let cleaned = extract_text(message)
                .map(|t| strip_ui_metadata(&t))
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty());

            // Empty finals are heartbeat acknowledgments: no transcript
            // mutation, but the stream still clears and status returns
            // to idle.
            let mut patch = TilePatch {
                status: Some(TileStatus::Idle),
                stream_text: Some(None),
                thinking_trace: Some(None),
                ..TilePatch::default()
            };
            if let Some(cleaned) = cleaned {
                store.append_output(&project_id, &tile_id, cleaned.clone(), now);
                patch.latest_preview = Some(Some(preview(&cleaned, PREVIEW_MAX_CHARS)));
                patch.last_result = Some(Some(cleaned));
            }
            store.update_tile(&project_id, &tile_id, patch, now);
            RouteOutcome::Applied { project_id, tile_id }
        }
        ChatEvent::Aborted { error_message, .. } | ChatEvent::Error { error_message, .. } => {
            if let Some(msg) = error_message.as_deref().filter(|m| !m.trim().is_empty()) {
                store.append_output(&project_id, &tile_id, format!("Error: {msg}"), now);
            }
            store.update_tile(
                &project_id,
                &tile_id,
                TilePatch {
                    status: Some(TileStatus::Error),
                    stream_text: Some(None),
                    thinking_trace: Some(None),
                    ..TilePatch::default()
                },
                now,
            );
            RouteOutcome::Applied { project_id, tile_id }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────
