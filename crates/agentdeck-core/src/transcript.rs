//! Transcript segmentation: re-derives user / thinking / assistant
//! blocks from a tile's durable output lines plus the live stream.
//!
//! The durable transcript is a flat, append-only line sequence; the
//! reserved markers ([`crate::types::USER_LINE_PREFIX`],
//! [`crate::types::TRACE_LINE_PREFIX`]) classify each line for display.

use crate::types::{is_trace_line, is_user_line, strip_trace_line};

/// One display block: optional user prompt, reasoning asides, and the
/// assistant lines that followed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityBlock {
    pub user: Option<String>,
    pub traces: Vec<String>,
    pub assistant: Vec<String>,
}

/// Segment a transcript into ordered display blocks.
///
/// A user line starts a new block; consecutive trace lines are merged
/// into one trace entry; the live `stream` and `trace` (in-flight
/// partials) are appended to the last block without touching the
/// durable lines.
pub fn segment(lines: &[String], stream: Option<&str>, trace: Option<&str>) -> Vec<ActivityBlock> {
    let mut blocks: Vec<ActivityBlock> = Vec::new();
    let mut trace_buffer: Vec<String> = Vec::new();

    // Anonymous block for content arriving before any user turn.
    fn last_block(blocks: &mut Vec<ActivityBlock>) -> &mut ActivityBlock {
        if blocks.is_empty() {
            blocks.push(ActivityBlock::default());
        }
        let idx = blocks.len() - 1;
        &mut blocks[idx]
    }

    fn flush_trace(blocks: &mut Vec<ActivityBlock>, buffer: &mut Vec<String>) {
        if buffer.is_empty() {
            return;
        }
        let joined = buffer.join("\n");
        last_block(blocks).traces.push(joined);
        buffer.clear();
    }

    for line in lines {
        if is_trace_line(line) {
            trace_buffer.push(strip_trace_line(line).to_string());
            continue;
        }
        flush_trace(&mut blocks, &mut trace_buffer);
        if is_user_line(line) {
            let user = line
                .trim_start()
                .trim_start_matches('>')
                .trim_start()
                .trim_end()
                .to_string();
            blocks.push(ActivityBlock {
                user: if user.is_empty() { None } else { Some(user) },
                traces: Vec::new(),
                assistant: Vec::new(),
            });
            continue;
        }
        if !line.is_empty() {
            last_block(&mut blocks).assistant.push(line.clone());
        }
    }
    flush_trace(&mut blocks, &mut trace_buffer);

    if let Some(live_trace) = trace.map(str::trim).filter(|t| !t.is_empty()) {
        last_block(&mut blocks).traces.push(live_trace.to_string());
    }
    if let Some(live_stream) = stream.map(str::trim).filter(|s| !s.is_empty()) {
        last_block(&mut blocks).assistant.push(live_stream.to_string());
    }

    blocks
}

// ─── Tests ────────────────────────────────────────────────────────
