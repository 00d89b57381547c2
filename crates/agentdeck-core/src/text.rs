//! Text extraction and cleaning for gateway message payloads.
//!
//! The gateway embeds UI-only metadata inside otherwise plain text as
//! `[[key:value]]` spans; [`strip_ui_metadata`] removes them, leaving
//! user-visible content. A heartbeat acknowledgment that consists of
//! nothing but such spans cleans to the empty string.

use serde_json::Value;

/// Maximum characters kept in derived summaries. Durable transcript
/// lines are never truncated.
pub const PREVIEW_MAX_CHARS: usize = 200;

/// Pull assistant text out of a message payload.
///
/// Accepts a bare string, an object with a `text` field, or an object
/// whose `content` is a string or an array of `{type: "text", text}`
/// blocks (joined with newlines). Anything else yields `None`.
pub fn extract_text(payload: &Value) -> Option<String> {
    extract_channel(payload, "text")
}

/// Pull reasoning-channel text out of a message payload: a `reasoning`
/// field, or `thinking`-type content blocks.
pub fn extract_reasoning(payload: &Value) -> Option<String> {
    if let Some(reasoning) = payload.get("reasoning").and_then(Value::as_str) {
        if reasoning.is_empty() {
            return None;
        }
        return Some(reasoning.to_string());
    }
    extract_channel(payload, "thinking")
}

fn extract_channel(payload: &Value, block_type: &str) -> Option<String> {
    match payload {
        Value::String(s) if block_type == "text" => {
            if s.is_empty() {
                None
            } else {
                Some(s.clone())
            }
        }
        Value::Object(map) => {
            if block_type == "text"
                && let Some(text) = map.get("text").and_then(Value::as_str)
            {
                if text.is_empty() {
                    return None;
                }
                return Some(text.to_string());
            }
            match map.get("content") {
                Some(Value::String(s)) if block_type == "text" && !s.is_empty() => Some(s.clone()),
                Some(Value::Array(blocks)) => {
                    let parts: Vec<&str> = blocks
                        .iter()
                        .filter(|b| b.get("type").and_then(Value::as_str) == Some(block_type))
                        .filter_map(|b| b.get("text").and_then(Value::as_str))
                        .filter(|t| !t.is_empty())
                        .collect();
                    if parts.is_empty() {
                        None
                    } else {
                        Some(parts.join("\n"))
                    }
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Strip embedded `[[...]]` UI metadata spans. Pure and deterministic;
/// collapses runs of spaces the removal leaves behind and trims the
/// ends of each line.
pub fn strip_ui_metadata(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("[[") {
        match rest[open..].find("]]") {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + 2..];
            }
            None => break,
        }
    }
    out.push_str(rest);

    let cleaned: Vec<String> = out
        .lines()
        .map(|line| {
            let mut collapsed = String::with_capacity(line.len());
            let mut last_space = false;
            for ch in line.trim().chars() {
                let is_space = ch == ' ';
                if !(is_space && last_space) {
                    collapsed.push(ch);
                }
                last_space = is_space;
            }
            collapsed
        })
        .collect();

    let joined = cleaned.join("\n");
    joined.trim().to_string()
}

/// Truncate text for a derived summary, appending `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

/// Build the outbound instruction for an agent: the message prefixed
/// with the agent's workspace context so the session operates in the
/// right directory.
pub fn build_instruction(workspace_path: Option<&str>, message: &str) -> String {
    match workspace_path {
        Some(path) if !path.trim().is_empty() => {
            format!("[workspace: {}]\n{message}", path.trim())
        }
        _ => message.to_string(),
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_text_from_bare_string() {
        assert_eq!(extract_text(&json!("hello")), Some("hello".into()));
        assert_eq!(extract_text(&json!("")), None);
    }

    #[test]
    fn extract_text_from_text_field() {
        assert_eq!(
            extract_text(&json!({"text": "hi there"})),
            Some("hi there".into())
        );
    }

    #[test]
    fn extract_text_from_content_blocks() {
        let payload = json!({
            "content": [
                {"type": "text", "text": "first"},
                {"type": "thinking", "text": "hmm"},
                {"type": "text", "text": "second"},
            ]
        });
        assert_eq!(extract_text(&payload), Some("first\nsecond".into()));
        assert_eq!(extract_reasoning(&payload), Some("hmm".into()));
    }

    #[test]
    fn extract_text_from_content_string() {
        assert_eq!(
            extract_text(&json!({"content": "inline"})),
            Some("inline".into())
        );
    }

    #[test]
    fn extract_missing_yields_none() {
        assert_eq!(extract_text(&json!({"role": "assistant"})), None);
        assert_eq!(extract_text(&json!(42)), None);
        assert_eq!(extract_reasoning(&json!({"text": "no reasoning"})), None);
    }

    #[test]
    fn extract_reasoning_field() {
        assert_eq!(
            extract_reasoning(&json!({"reasoning": "step one"})),
            Some("step one".into())
        );
    }

    #[test]
    fn strip_removes_metadata_spans() {
        assert_eq!(
            strip_ui_metadata("Done. [[reply_to:42]] See above."),
            "Done. See above."
        );
    }

    #[test]
    fn strip_of_pure_metadata_is_empty() {
        assert_eq!(strip_ui_metadata("[[heartbeat:ok]]"), "");
        assert_eq!(strip_ui_metadata("  [[a:1]] [[b:2]]  "), "");
    }

    #[test]
    fn strip_leaves_plain_text_alone() {
        assert_eq!(strip_ui_metadata("plain reply"), "plain reply");
    }

    #[test]
    fn strip_tolerates_unterminated_span() {
        assert_eq!(strip_ui_metadata("text [[oops"), "text [[oops");
    }

    #[test]
    fn preview_truncates_long_text() {
        let long = "x".repeat(250);
        let p = preview(&long, PREVIEW_MAX_CHARS);
        assert_eq!(p.chars().count(), PREVIEW_MAX_CHARS + 3);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn preview_keeps_short_text() {
        assert_eq!(preview("short", PREVIEW_MAX_CHARS), "short");
    }

    #[test]
    fn build_instruction_prefixes_workspace() {
        assert_eq!(
            build_instruction(Some("/srv/repo"), "fix the bug"),
            "[workspace: /srv/repo]\nfix the bug"
        );
        assert_eq!(build_instruction(None, "fix"), "fix");
        assert_eq!(build_instruction(Some("  "), "fix"), "fix");
    }
}
