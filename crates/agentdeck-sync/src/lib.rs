//! Agent-side synchronization: workspace instruction files, the agent
//! registry, and heartbeat settings.
//!
//! Each synchronizer pairs a small editable state machine with an IO
//! trait. The state machines never touch the filesystem; the `Fs*`
//! implementations at the bottom of each pairing do.

pub mod fs_api;
pub mod heartbeat;
pub mod paths;
pub mod registry;
pub mod workspace;

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("agent workspace not found: {0}")]
    MissingWorkspace(PathBuf),
    #[error("{0} exists but is not a file")]
    NotAFile(String),
    #[error("missing registry at {0}")]
    MissingRegistry(PathBuf),
}
