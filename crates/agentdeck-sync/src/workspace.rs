//! Workspace instruction file editing and synchronization.
//!
//! Each agent workspace carries a fixed set of markdown instruction
//! files. The editor holds one buffer per file plus a shared dirty
//! flag; saves always write the full set so the on-disk view and the
//! buffers converge on whatever the filesystem reports back.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SyncError;

/// The fixed instruction file set, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkspaceFileName {
    #[serde(rename = "AGENTS.md")]
    Agents,
    #[serde(rename = "SOUL.md")]
    Soul,
    #[serde(rename = "IDENTITY.md")]
    Identity,
    #[serde(rename = "USER.md")]
    User,
    #[serde(rename = "TOOLS.md")]
    Tools,
    #[serde(rename = "HEARTBEAT.md")]
    Heartbeat,
    #[serde(rename = "MEMORY.md")]
    Memory,
}

impl WorkspaceFileName {
    pub const ALL: [Self; 7] = [
        Self::Agents,
        Self::Soul,
        Self::Identity,
        Self::User,
        Self::Tools,
        Self::Heartbeat,
        Self::Memory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agents => "AGENTS.md",
            Self::Soul => "SOUL.md",
            Self::Identity => "IDENTITY.md",
            Self::User => "USER.md",
            Self::Tools => "TOOLS.md",
            Self::Heartbeat => "HEARTBEAT.md",
            Self::Memory => "MEMORY.md",
        }
    }

    /// Short purpose line shown next to the file name.
    pub fn hint(self) -> &'static str {
        match self {
            Self::Agents => "Operating instructions, priorities, and rules.",
            Self::Soul => "Persona, tone, and boundaries.",
            Self::Identity => "Name, vibe, and emoji.",
            Self::User => "User profile and preferences.",
            Self::Tools => "Local tool notes and conventions.",
            Self::Heartbeat => "Small checklist for heartbeat runs.",
            Self::Memory => "Durable memory for this agent.",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|n| *n == self).unwrap_or(0)
    }
}

impl fmt::Display for WorkspaceFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkspaceFileName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s.trim())
            .ok_or_else(|| format!("unknown workspace file: {s}"))
    }
}

/// On-disk view of one file. An absent file reads as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub name: WorkspaceFileName,
    pub content: String,
    pub exists: bool,
}

/// One pending write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWrite {
    pub name: WorkspaceFileName,
    pub content: String,
}

/// Editable buffer for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBuffer {
    pub content: String,
    pub exists: bool,
}

/// Fetch and store the whole instruction file set.
pub trait WorkspaceFileApi {
    fn fetch(&self) -> impl Future<Output = Result<Vec<FileSnapshot>, SyncError>> + Send;

    /// Persist every file and return the authoritative post-write view.
    fn store(
        &self,
        writes: Vec<FileWrite>,
    ) -> impl Future<Output = Result<Vec<FileSnapshot>, SyncError>> + Send;
}

/// Workspace file editor state plus its synchronization rules:
/// at most one save in flight, and switching tabs autosaves a dirty
/// buffer set without ever blocking the switch itself.
#[derive(Debug)]
pub struct WorkspaceSync<A> {
    api: A,
    buffers: [FileBuffer; 7],
    tab: WorkspaceFileName,
    loading: bool,
    saving: bool,
    dirty: bool,
    error: Option<String>,
}

impl<A: WorkspaceFileApi> WorkspaceSync<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            buffers: Default::default(),
            tab: WorkspaceFileName::Agents,
            loading: false,
            saving: false,
            dirty: false,
            error: None,
        }
    }

    pub fn tab(&self) -> WorkspaceFileName {
        self.tab
    }

    pub fn buffer(&self, name: WorkspaceFileName) -> &FileBuffer {
        &self.buffers[name.index()]
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn apply_snapshot(&mut self, files: Vec<FileSnapshot>) {
        self.buffers = Default::default();
        for file in files {
            self.buffers[file.name.index()] = FileBuffer {
                content: file.content,
                exists: file.exists,
            };
        }
        self.dirty = false;
    }

    /// Replace all buffers from disk. Discards unsaved edits.
    pub async fn load(&mut self) -> Result<(), SyncError> {
        self.loading = true;
        self.error = None;
        let result = self.api.fetch().await;
        self.loading = false;
        match result {
            Ok(files) => {
                self.apply_snapshot(files);
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Record an edit to one buffer.
    pub fn edit(&mut self, name: WorkspaceFileName, content: impl Into<String>) {
        self.buffers[name.index()].content = content.into();
        self.dirty = true;
    }

    /// Write the full buffer set. A save requested while one is in
    /// flight coalesces into a no-op; the running save already carries
    /// the edits it saw.
    pub async fn save(&mut self) -> Result<(), SyncError> {
        if self.saving {
            return Ok(());
        }
        self.saving = true;
        self.error = None;
        let writes = WorkspaceFileName::ALL
            .into_iter()
            .map(|name| FileWrite {
                name,
                content: self.buffers[name.index()].content.clone(),
            })
            .collect();
        let result = self.api.store(writes).await;
        self.saving = false;
        match result {
            Ok(files) => {
                self.apply_snapshot(files);
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Switch the visible tab, autosaving dirty buffers first. The
    /// switch itself always happens, even when the save fails or is
    /// skipped because one is already running.
    pub async fn switch_tab(&mut self, next: WorkspaceFileName) -> Result<(), SyncError> {
        if next == self.tab {
            return Ok(());
        }
        self.tab = next;
        if self.dirty && !self.saving {
            self.save().await?;
        }
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────
