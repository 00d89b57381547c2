//! Heartbeat schedule canonicalization.
//!
//! The backend stores one duration string (`"30m"`, `"2h"`, `"0m"` =
//! disabled) and one target string (`"last"`, `"none"`, or a channel
//! id). The editable form distinguishes preset from custom values;
//! this module collapses the encodings to one canonical representation
//! and back.

use serde::{Deserialize, Serialize};

use crate::types::CoreError;

/// Preset interval choices offered by the console.
pub const HEARTBEAT_PRESETS: [&str; 7] = ["15m", "30m", "1h", "2h", "6h", "12h", "24h"];

/// Canonical encoding of a disabled schedule.
pub const DISABLED_INTERVAL: &str = "0m";

pub const DEFAULT_INTERVAL: &str = "30m";
pub const DEFAULT_ACK_MAX_CHARS: u32 = 300;

/// Wall-clock window during which heartbeats fire. Present only when
/// explicitly enabled; a disabled window is absent, not marked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveHours {
    pub start: String,
    pub end: String,
}

/// Stored heartbeat configuration, as exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatConfig {
    /// Canonical duration string; `"0m"` disables the schedule.
    pub every: String,
    /// `"last"`, `"none"`, or a custom channel id.
    pub target: String,
    pub include_reasoning: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_hours: Option<ActiveHours>,
    pub ack_max_chars: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            every: DEFAULT_INTERVAL.to_string(),
            target: "last".to_string(),
            include_reasoning: false,
            active_hours: None,
            ack_max_chars: DEFAULT_ACK_MAX_CHARS,
        }
    }
}

// ─── Interval ─────────────────────────────────────────────────────

/// Editable interval form: a known preset, or a custom minute count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalMode {
    Preset(String),
    Custom(u32),
}

/// Parse a stored duration string into minutes.
///
/// `"45m"` → 45, `"2h"` → 120, `"0m"` → 0. A bare number is taken as
/// minutes. Anything non-numeric is an error.
pub fn parse_interval_minutes(every: &str) -> Result<u32, CoreError> {
    let trimmed = every.trim();
    let (digits, factor) = if let Some(rest) = trimmed.strip_suffix('h') {
        (rest, 60)
    } else if let Some(rest) = trimmed.strip_suffix('m') {
        (rest, 1)
    } else {
        (trimmed, 1)
    };
    let value: u32 = digits
        .trim()
        .parse()
        .map_err(|_| CoreError::InvalidInterval(every.to_string()))?;
    Ok(value * factor)
}

/// Encode a custom minute count back to the stored form.
pub fn encode_minutes(minutes: u32) -> String {
    format!("{minutes}m")
}

/// Classify a stored duration for the editable form. Values outside
/// the preset list fall back to custom-entry mode with the derived
/// minute count; unparseable values land in custom mode at the
/// default interval's minutes.
pub fn interval_mode(every: &str) -> IntervalMode {
    if HEARTBEAT_PRESETS.contains(&every) {
        return IntervalMode::Preset(every.to_string());
    }
    match parse_interval_minutes(every) {
        Ok(minutes) if minutes > 0 => IntervalMode::Custom(minutes),
        _ => IntervalMode::Custom(
            parse_interval_minutes(DEFAULT_INTERVAL).expect("default parses"),
        ),
    }
}

/// Validate a custom minute entry before save. Non-positive or
/// non-numeric input blocks the save locally.
pub fn validate_custom_minutes(entry: &str) -> Result<u32, CoreError> {
    let value: u32 = entry
        .trim()
        .parse()
        .map_err(|_| CoreError::Validation("Custom interval must be a positive number.".into()))?;
    if value == 0 {
        return Err(CoreError::Validation(
            "Custom interval must be a positive number.".into(),
        ));
    }
    Ok(value)
}

// ─── Target ───────────────────────────────────────────────────────

/// Editable target form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetMode {
    /// Deliver to the most recently used channel.
    Last,
    /// Run the heartbeat without delivering anywhere.
    None,
    /// Deliver to an explicit channel id.
    Custom(String),
}

/// Classify a stored target string for the editable form.
pub fn target_mode(target: &str) -> TargetMode {
    match target {
        "last" => TargetMode::Last,
        "none" => TargetMode::None,
        other => TargetMode::Custom(other.to_string()),
    }
}

/// Encode the editable target back to the stored form. A custom mode
/// with an empty identifier falls back to `"last"`.
pub fn encode_target(mode: &TargetMode) -> String {
    match mode {
        TargetMode::Last => "last".to_string(),
        TargetMode::None => "none".to_string(),
        TargetMode::Custom(id) => {
            let trimmed = id.trim();
            if trimmed.is_empty() {
                "last".to_string()
            } else {
                trimmed.to_string()
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_classify_as_preset() {
        for preset in HEARTBEAT_PRESETS {
            assert_eq!(interval_mode(preset), IntervalMode::Preset(preset.into()));
        }
    }

    #[test]
    fn minute_suffix_parses_as_is() {
        assert_eq!(parse_interval_minutes("45m").unwrap(), 45);
        assert_eq!(parse_interval_minutes("0m").unwrap(), 0);
    }

    #[test]
    fn hour_suffix_scales_to_minutes() {
        assert_eq!(parse_interval_minutes("2h").unwrap(), 120);
        assert_eq!(parse_interval_minutes("1h").unwrap(), 60);
    }

    #[test]
    fn bare_number_is_minutes() {
        assert_eq!(parse_interval_minutes("90").unwrap(), 90);
    }

    #[test]
    fn garbage_interval_is_error() {
        assert!(parse_interval_minutes("soon").is_err());
        assert!(parse_interval_minutes("").is_err());
    }

    #[test]
    fn non_preset_value_switches_to_custom() {
        assert_eq!(interval_mode("45m"), IntervalMode::Custom(45));
        assert_eq!(interval_mode("3h"), IntervalMode::Custom(180));
    }

    #[test]
    fn unparseable_stored_value_falls_back_to_default_minutes() {
        assert_eq!(interval_mode("whenever"), IntervalMode::Custom(30));
    }

    #[test]
    fn encode_minutes_roundtrip() {
        assert_eq!(encode_minutes(45), "45m");
        assert_eq!(parse_interval_minutes(&encode_minutes(45)).unwrap(), 45);
    }

    #[test]
    fn validate_custom_minutes_rejects_bad_input() {
        assert!(validate_custom_minutes("0").is_err());
        assert!(validate_custom_minutes("-5").is_err());
        assert!(validate_custom_minutes("abc").is_err());
        assert_eq!(validate_custom_minutes(" 45 ").unwrap(), 45);
    }

    #[test]
    fn target_modes_roundtrip() {
        assert_eq!(target_mode("last"), TargetMode::Last);
        assert_eq!(target_mode("none"), TargetMode::None);
        assert_eq!(
            target_mode("chan-77"),
            TargetMode::Custom("chan-77".into())
        );
        assert_eq!(encode_target(&TargetMode::None), "none");
        assert_eq!(encode_target(&TargetMode::Custom("chan-77".into())), "chan-77");
    }

    #[test]
    fn empty_custom_target_falls_back_to_last() {
        assert_eq!(encode_target(&TargetMode::Custom("  ".into())), "last");
    }

    #[test]
    fn config_serde_uses_camel_case() {
        let config = HeartbeatConfig {
            active_hours: Some(ActiveHours {
                start: "08:00".into(),
                end: "18:00".into(),
            }),
            ..HeartbeatConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"includeReasoning\""));
        assert!(json.contains("\"ackMaxChars\""));
        assert!(json.contains("\"activeHours\""));
        let back: HeartbeatConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn absent_active_hours_not_serialized() {
        let json = serde_json::to_string(&HeartbeatConfig::default()).unwrap();
        assert!(!json.contains("activeHours"));
    }
}
