use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Roles & Status ───────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileRole {
    #[default]
    Coding,
    Research,
    Marketing,
}

impl TileRole {
    pub const ALL: [Self; 3] = [Self::Coding, Self::Research, Self::Marketing];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Coding => "coding",
            Self::Research => "research",
            Self::Marketing => "marketing",
        }
    }
}

impl fmt::Display for TileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TileRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coding" => Ok(Self::Coding),
            "research" => Ok(Self::Research),
            "marketing" => Ok(Self::Marketing),
            _ => Err(CoreError::UnknownRole(s.to_string())),
        }
    }
}

/// Per-tile session status. Tiles cycle between these for their entire
/// lifetime; there is no terminal state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileStatus {
    #[default]
    Idle,
    Running,
    Error,
}

impl TileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Spatial ──────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

// ─── Transcript Markers ───────────────────────────────────────────

/// Prefix marking a transcript line as the user's own message.
pub const USER_LINE_PREFIX: &str = "> ";

/// Prefix marking a transcript line as a reasoning aside rather than
/// assistant output.
pub const TRACE_LINE_PREFIX: &str = "[[thinking]] ";

/// True if a durable transcript line is a user message.
pub fn is_user_line(line: &str) -> bool {
    line.trim_start().starts_with('>')
}

/// True if a durable transcript line is a reasoning trace.
pub fn is_trace_line(line: &str) -> bool {
    line.starts_with(TRACE_LINE_PREFIX)
}

/// Wrap reasoning text into its durable transcript form.
pub fn trace_line(text: &str) -> String {
    format!("{TRACE_LINE_PREFIX}{text}")
}

/// Strip the trace marker, returning the bare reasoning text.
pub fn strip_trace_line(line: &str) -> &str {
    line.strip_prefix(TRACE_LINE_PREFIX).unwrap_or(line)
}

// ─── Tile & Project ───────────────────────────────────────────────

/// One agent session tile: the authoritative mutable record behind a
/// canvas tile, chat panel, and feed entry.
///
/// Owned exclusively by its parent [`Project`]. `session_key` is
/// unique across all tiles in a project at any instant and correlates
/// the tile to exactly one gateway conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTile {
    pub id: String,
    /// Identity of the underlying agent process; used to resolve
    /// workspace and registry artifacts externally.
    pub agent_id: String,
    pub name: String,
    pub role: TileRole,
    pub avatar_seed: String,
    pub session_key: String,
    /// `None` means "use the gateway default".
    pub model: Option<String>,
    pub thinking_level: Option<String>,
    pub status: TileStatus,
    /// Durable transcript: ordered, append-only. Lines are classified
    /// for display via [`is_user_line`] / [`is_trace_line`].
    pub output_lines: Vec<String>,
    /// In-flight partial assistant response. Wholesale-replaced on
    /// every delta event (the gateway sends cumulative text).
    pub stream_text: Option<String>,
    /// In-flight partial reasoning aside; mirrors `stream_text` for
    /// the reasoning channel.
    pub thinking_trace: Option<String>,
    /// Not-yet-sent user input for this tile.
    pub draft: String,
    pub last_result: Option<String>,
    pub latest_preview: Option<String>,
    pub position: Point,
    pub size: Size,
    /// Archived tiles are excluded from active views but retained.
    pub archived_at: Option<DateTime<Utc>>,
}

impl AgentTile {
    /// Build a fresh idle tile with an empty transcript.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        agent_id: String,
        name: String,
        role: TileRole,
        session_key: String,
        position: Point,
        size: Size,
    ) -> Self {
        let avatar_seed = agent_id.clone();
        Self {
            id,
            agent_id,
            name,
            role,
            avatar_seed,
            session_key,
            model: None,
            thinking_level: None,
            status: TileStatus::Idle,
            output_lines: Vec::new(),
            stream_text: None,
            thinking_trace: None,
            draft: String::new(),
            last_result: None,
            latest_preview: None,
            position,
            size,
            archived_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Workspace root this project's agents operate in.
    pub repo_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Insertion order is creation order and drives default layout.
    pub tiles: Vec<AgentTile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
}

/// Current document schema version.
pub const DOC_VERSION: u32 = 2;

/// Persisted root document. Exclusively owned by the document store;
/// the engine reads/writes it whole through load/save calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectsDoc {
    pub version: u32,
    pub active_project_id: Option<String>,
    pub projects: Vec<Project>,
}

impl Default for ProjectsDoc {
    fn default() -> Self {
        Self {
            version: DOC_VERSION,
            active_project_id: None,
            projects: Vec::new(),
        }
    }
}

/// Anything that can be archived without being removed.
pub trait Archivable {
    fn archived_at(&self) -> Option<DateTime<Utc>>;
}

impl Archivable for AgentTile {
    fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.archived_at
    }
}

impl Archivable for Project {
    fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.archived_at
    }
}

/// Filter a slice down to active or archived items.
pub fn filter_archived<T: Archivable + Clone>(items: &[T], archived: bool) -> Vec<T> {
    items
        .iter()
        .filter(|item| item.archived_at().is_some() == archived)
        .cloned()
        .collect()
}

// ─── Error ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("unknown tile role: {0}")]
    UnknownRole(String),
    #[error("invalid heartbeat interval: {0}")]
    InvalidInterval(String),
    #[error("{0}")]
    Validation(String),
}

// ─── Tests ────────────────────────────────────────────────────────
