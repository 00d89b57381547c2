//! State directory layout.
//!
//! Everything lives under one state directory, `$AGENTDECK_STATE_DIR`
//! or `~/.agentdeck`:
//!
//! ```text
//! <state>/projects.json                          tile document
//! <state>/agentdeck.json                         agent registry
//! <state>/projects/<project>/agents/<agent>/     agent workspace
//! <state>/agents/<agent>/                        agent runtime state
//! ```

use std::path::{Path, PathBuf};

pub const STATE_DIR_ENV: &str = "AGENTDECK_STATE_DIR";
pub const DEFAULT_STATE_DIR: &str = "~/.agentdeck";
pub const PROJECTS_DOC_FILENAME: &str = "projects.json";
pub const REGISTRY_FILENAME: &str = "agentdeck.json";

/// Expand a leading `~` against `$HOME`. Paths without one pass
/// through untouched, as does a path when `$HOME` is unset.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home);
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return Path::new(&home).join(rest);
    }
    PathBuf::from(path)
}

/// Resolve the state directory from the environment.
pub fn resolve_state_dir() -> PathBuf {
    let raw = std::env::var(STATE_DIR_ENV).unwrap_or_else(|_| DEFAULT_STATE_DIR.to_string());
    expand_home(&raw)
}

pub fn projects_doc_path(state_dir: &Path) -> PathBuf {
    state_dir.join(PROJECTS_DOC_FILENAME)
}

pub fn registry_path(state_dir: &Path) -> PathBuf {
    state_dir.join(REGISTRY_FILENAME)
}

/// Workspace directory holding an agent's instruction files.
pub fn agent_workspace_dir(state_dir: &Path, project_id: &str, agent_id: &str) -> PathBuf {
    state_dir
        .join("projects")
        .join(project_id)
        .join("agents")
        .join(agent_id)
}

/// Runtime state directory owned by the agent process itself.
pub fn agent_state_dir(state_dir: &Path, agent_id: &str) -> PathBuf {
    state_dir.join("agents").join(agent_id)
}

// ─── Tests ────────────────────────────────────────────────────────
