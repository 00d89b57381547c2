//! Agent registry: the shared `agentdeck.json` consumed by the agent
//! runtime.
//!
//! The file is owned by another program and may carry fields this
//! engine knows nothing about, so edits operate on the raw JSON value
//! and only touch the `agents.list` entries they understand. Hand
//! edited configs sometimes carry trailing commas; parsing tolerates
//! them.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};

use agentdeck_core::heartbeat::HeartbeatConfig;

use crate::SyncError;

/// Fields this engine maintains on a registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentEntry {
    pub id: String,
    pub name: Option<String>,
    pub workspace: Option<String>,
}

/// Parse registry JSON, stripping trailing commas before `}` / `]` on
/// a second attempt.
pub fn parse_json_loose(raw: &str) -> Result<Value, serde_json::Error> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(strict_err) => {
            let cleaned = strip_trailing_commas(raw);
            serde_json::from_str(&cleaned).map_err(|_| strict_err)
        }
    }
}

fn strip_trailing_commas(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = raw.chars().collect();
    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            out.push(ch);
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

fn agent_list(config: &Value) -> Vec<&Map<String, Value>> {
    config
        .get("agents")
        .and_then(|a| a.get("list"))
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

fn agent_list_mut(config: &mut Value) -> &mut Vec<Value> {
    if !config.is_object() {
        *config = json!({});
    }
    let Value::Object(root) = config else {
        unreachable!()
    };
    let agents = root.entry("agents").or_insert_with(|| json!({}));
    if !agents.is_object() {
        *agents = json!({});
    }
    let Value::Object(agents) = agents else {
        unreachable!()
    };
    let list = agents.entry("list").or_insert_with(|| json!([]));
    if !list.is_array() {
        *list = json!([]);
    }
    let Value::Array(list) = list else {
        unreachable!()
    };
    list
}

/// Typed view of the entries in `agents.list`.
pub fn read_agent_entries(config: &Value) -> Vec<AgentEntry> {
    agent_list(config)
        .into_iter()
        .filter_map(|entry| {
            Some(AgentEntry {
                id: entry.get("id")?.as_str()?.to_string(),
                name: entry.get("name").and_then(Value::as_str).map(String::from),
                workspace: entry
                    .get("workspace")
                    .and_then(Value::as_str)
                    .map(String::from),
            })
        })
        .collect()
}

/// Insert or update the entry for `agent_id`, preserving fields this
/// engine does not own. Returns whether anything changed.
pub fn upsert_agent_entry(
    config: &mut Value,
    agent_id: &str,
    agent_name: &str,
    workspace_dir: &str,
) -> bool {
    let list = agent_list_mut(config);
    for entry in list.iter_mut() {
        let Some(map) = entry.as_object_mut() else {
            continue;
        };
        if map.get("id").and_then(Value::as_str) != Some(agent_id) {
            continue;
        }
        let mut changed = false;
        if !agent_name.is_empty() && map.get("name").and_then(Value::as_str) != Some(agent_name) {
            map.insert("name".into(), json!(agent_name));
            changed = true;
        }
        if map.get("workspace").and_then(Value::as_str) != Some(workspace_dir) {
            map.insert("workspace".into(), json!(workspace_dir));
            changed = true;
        }
        return changed;
    }
    list.push(json!({
        "id": agent_id,
        "name": agent_name,
        "workspace": workspace_dir,
    }));
    true
}

/// Re-key an entry to a new agent id, updating name and workspace in
/// the same pass. Missing source entries are created under the new id.
pub fn rename_agent_entry(
    config: &mut Value,
    from_agent_id: &str,
    to_agent_id: &str,
    agent_name: &str,
    workspace_dir: &str,
) -> bool {
    let list = agent_list_mut(config);
    for entry in list.iter_mut() {
        let Some(map) = entry.as_object_mut() else {
            continue;
        };
        if map.get("id").and_then(Value::as_str) != Some(from_agent_id) {
            continue;
        }
        map.insert("id".into(), json!(to_agent_id));
        if !agent_name.is_empty() && map.get("name").and_then(Value::as_str) != Some(agent_name) {
            map.insert("name".into(), json!(agent_name));
        }
        if map.get("workspace").and_then(Value::as_str) != Some(workspace_dir) {
            map.insert("workspace".into(), json!(workspace_dir));
        }
        return true;
    }
    list.push(json!({
        "id": to_agent_id,
        "name": agent_name,
        "workspace": workspace_dir,
    }));
    true
}

/// Remove the entry for `agent_id`. Returns whether anything changed.
pub fn remove_agent_entry(config: &mut Value, agent_id: &str) -> bool {
    let list = agent_list_mut(config);
    let before = list.len();
    list.retain(|entry| entry.get("id").and_then(Value::as_str) != Some(agent_id));
    list.len() != before
}

// ─── Heartbeat Override ───────────────────────────────────────────

/// Per-agent heartbeat override and the registry-wide default it
/// shadows. `has_override` reports whether the entry carries its own
/// `heartbeat` block.
pub fn agent_heartbeat(config: &Value, agent_id: &str) -> (HeartbeatConfig, bool) {
    let override_config = agent_list(config)
        .into_iter()
        .find(|entry| entry.get("id").and_then(Value::as_str) == Some(agent_id))
        .and_then(|entry| entry.get("heartbeat"))
        .and_then(|hb| serde_json::from_value(hb.clone()).ok());
    if let Some(hb) = override_config {
        return (hb, true);
    }
    let default = config
        .get("heartbeat")
        .and_then(|hb| serde_json::from_value(hb.clone()).ok())
        .unwrap_or_default();
    (default, false)
}

/// Set or clear the per-agent heartbeat override. Returns whether
/// anything changed; a clear for an agent without an override (or
/// without an entry at all) changes nothing.
pub fn set_agent_heartbeat(
    config: &mut Value,
    agent_id: &str,
    heartbeat: Option<&HeartbeatConfig>,
) -> bool {
    let list = agent_list_mut(config);
    for entry in list.iter_mut() {
        let Some(map) = entry.as_object_mut() else {
            continue;
        };
        if map.get("id").and_then(Value::as_str) != Some(agent_id) {
            continue;
        }
        return match heartbeat {
            Some(hb) => {
                let value = serde_json::to_value(hb).expect("heartbeat serializes");
                if map.get("heartbeat") == Some(&value) {
                    false
                } else {
                    map.insert("heartbeat".into(), value);
                    true
                }
            }
            None => map.remove("heartbeat").is_some(),
        };
    }
    match heartbeat {
        Some(hb) => {
            list.push(json!({
                "id": agent_id,
                "heartbeat": serde_json::to_value(hb).expect("heartbeat serializes"),
            }));
            true
        }
        None => false,
    }
}

// ─── File Access ──────────────────────────────────────────────────

/// Load/save wrapper around the registry file.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Value, SyncError> {
        if !self.path.exists() {
            return Err(SyncError::MissingRegistry(self.path.clone()));
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(parse_json_loose(&raw)?)
    }

    pub fn save(&self, config: &Value) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(config)?)?;
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────
