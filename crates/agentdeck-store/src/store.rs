//! The tile store: sole mutator of the in-memory tile collection.
//!
//! Single-threaded, deterministic, no IO. Every mutation no-ops when
//! the project or tile no longer exists; a concurrent deletion must
//! never turn into an error here. An explicit `session_key → address`
//! index makes event routing a lookup rather than a scan, and makes
//! the "no match → drop" case a testable miss.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use agentdeck_core::types::{
    AgentTile, Point, Project, ProjectsDoc, Size, TileStatus, filter_archived,
};

/// Default size for newly created tiles, in world units.
pub const DEFAULT_TILE_SIZE: Size = Size {
    width: 360.0,
    height: 260.0,
};

/// Base position for the first tile in a project.
const PLACEMENT_BASE: Point = Point { x: 120.0, y: 120.0 };

/// Cascade step between successive tiles so new tiles never fully
/// overlap existing ones.
const PLACEMENT_STEP: Point = Point { x: 48.0, y: 40.0 };

/// Address of a tile within the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileAddress {
    pub project_id: String,
    pub tile_id: String,
}

/// Shallow-merge patch for [`AgentTile`]. `None` leaves a field
/// untouched; for nullable fields the outer option is "patch or not"
/// and the inner option is the new value. Applying the same patch
/// twice is idempotent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TilePatch {
    pub name: Option<String>,
    pub status: Option<TileStatus>,
    pub model: Option<Option<String>>,
    pub thinking_level: Option<Option<String>>,
    pub draft: Option<String>,
    pub stream_text: Option<Option<String>>,
    pub thinking_trace: Option<Option<String>>,
    pub last_result: Option<Option<String>>,
    pub latest_preview: Option<Option<String>>,
    pub avatar_seed: Option<String>,
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub archived_at: Option<Option<DateTime<Utc>>>,
}

impl TilePatch {
    pub fn status(status: TileStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Authoritative in-memory collection of projects and tiles.
#[derive(Debug, Default)]
pub struct TileStore {
    doc: ProjectsDoc,
    session_index: HashMap<String, TileAddress>,
}

impl TileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a loaded document, rebuilding the session index.
    pub fn from_doc(doc: ProjectsDoc) -> Self {
        let mut store = Self {
            doc,
            session_index: HashMap::new(),
        };
        store.rebuild_index();
        store
    }

    /// Replace the whole document (e.g. after an external refresh).
    pub fn replace_doc(&mut self, doc: ProjectsDoc) {
        self.doc = doc;
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.session_index.clear();
        for project in &self.doc.projects {
            for tile in &project.tiles {
                self.session_index.insert(
                    tile.session_key.clone(),
                    TileAddress {
                        project_id: project.id.clone(),
                        tile_id: tile.id.clone(),
                    },
                );
            }
        }
    }

    // ── Reads ────────────────────────────────────────────────────

    pub fn doc(&self) -> &ProjectsDoc {
        &self.doc
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.doc.projects.iter().find(|p| p.id == project_id)
    }

    /// First non-archived project, the console's working project.
    pub fn active_project(&self) -> Option<&Project> {
        self.doc.projects.iter().find(|p| p.archived_at.is_none())
    }

    pub fn tile(&self, project_id: &str, tile_id: &str) -> Option<&AgentTile> {
        self.project(project_id)?
            .tiles
            .iter()
            .find(|t| t.id == tile_id)
    }

    /// Resolve the owning tile for a gateway session key.
    pub fn address_for_session(&self, session_key: &str) -> Option<&TileAddress> {
        self.session_index.get(session_key)
    }

    /// Non-archived tiles of a project, in creation order.
    pub fn active_tiles(&self, project_id: &str) -> Vec<AgentTile> {
        self.project(project_id)
            .map(|p| filter_archived(&p.tiles, false))
            .unwrap_or_default()
    }

    /// Cascade placement for the next tile in a project.
    pub fn next_placement(&self, project_id: &str) -> (Point, Size) {
        let count = self
            .project(project_id)
            .map(|p| p.tiles.len())
            .unwrap_or(0) as f64;
        (
            Point::new(
                PLACEMENT_BASE.x + PLACEMENT_STEP.x * count,
                PLACEMENT_BASE.y + PLACEMENT_STEP.y * count,
            ),
            DEFAULT_TILE_SIZE,
        )
    }

    // ── Mutations ────────────────────────────────────────────────

    fn project_mut(&mut self, project_id: &str) -> Option<&mut Project> {
        self.doc.projects.iter_mut().find(|p| p.id == project_id)
    }

    fn tile_mut(&mut self, project_id: &str, tile_id: &str) -> Option<&mut AgentTile> {
        self.project_mut(project_id)?
            .tiles
            .iter_mut()
            .find(|t| t.id == tile_id)
    }

    fn touch(&mut self, project_id: &str, now: DateTime<Utc>) {
        if let Some(project) = self.project_mut(project_id) {
            project.updated_at = now;
        }
    }

    /// Insert an already-built tile. Returns false if the project is gone.
    pub fn insert_tile(&mut self, project_id: &str, tile: AgentTile, now: DateTime<Utc>) -> bool {
        let address = TileAddress {
            project_id: project_id.to_string(),
            tile_id: tile.id.clone(),
        };
        let session_key = tile.session_key.clone();
        let Some(project) = self.project_mut(project_id) else {
            return false;
        };
        project.tiles.push(tile);
        project.updated_at = now;
        self.session_index.insert(session_key, address);
        true
    }

    /// Remove a tile, returning the removed record for cleanup.
    pub fn remove_tile(
        &mut self,
        project_id: &str,
        tile_id: &str,
        now: DateTime<Utc>,
    ) -> Option<AgentTile> {
        let project = self.project_mut(project_id)?;
        let index = project.tiles.iter().position(|t| t.id == tile_id)?;
        let removed = project.tiles.remove(index);
        project.updated_at = now;
        self.session_index.remove(&removed.session_key);
        Some(removed)
    }

    /// Shallow-merge a patch into a tile. Returns false on a miss.
    pub fn update_tile(
        &mut self,
        project_id: &str,
        tile_id: &str,
        patch: TilePatch,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(tile) = self.tile_mut(project_id, tile_id) else {
            return false;
        };
        if let Some(name) = patch.name {
            tile.name = name;
        }
        if let Some(status) = patch.status {
            tile.status = status;
        }
        if let Some(model) = patch.model {
            tile.model = model;
        }
        if let Some(thinking_level) = patch.thinking_level {
            tile.thinking_level = thinking_level;
        }
        if let Some(draft) = patch.draft {
            tile.draft = draft;
        }
        if let Some(stream_text) = patch.stream_text {
            tile.stream_text = stream_text;
        }
        if let Some(thinking_trace) = patch.thinking_trace {
            tile.thinking_trace = thinking_trace;
        }
        if let Some(last_result) = patch.last_result {
            tile.last_result = last_result;
        }
        if let Some(latest_preview) = patch.latest_preview {
            tile.latest_preview = latest_preview;
        }
        if let Some(avatar_seed) = patch.avatar_seed {
            tile.avatar_seed = avatar_seed;
        }
        if let Some(position) = patch.position {
            tile.position = position;
        }
        if let Some(size) = patch.size {
            tile.size = size;
        }
        if let Some(archived_at) = patch.archived_at {
            tile.archived_at = archived_at;
        }
        self.touch(project_id, now);
        true
    }

    /// Append one durable transcript line. Never drops or reorders.
    pub fn append_output(
        &mut self,
        project_id: &str,
        tile_id: &str,
        line: impl Into<String>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(tile) = self.tile_mut(project_id, tile_id) else {
            return false;
        };
        tile.output_lines.push(line.into());
        self.touch(project_id, now);
        true
    }

    /// Replace the in-flight stream text wholesale. The gateway sends
    /// cumulative text, so replacement (never concatenation) is the
    /// contract here.
    pub fn set_stream(
        &mut self,
        project_id: &str,
        tile_id: &str,
        value: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        self.update_tile(
            project_id,
            tile_id,
            TilePatch {
                stream_text: Some(value),
                ..TilePatch::default()
            },
            now,
        )
    }

    /// Replace the in-flight reasoning trace wholesale.
    pub fn set_thinking_trace(
        &mut self,
        project_id: &str,
        tile_id: &str,
        value: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        self.update_tile(
            project_id,
            tile_id,
            TilePatch {
                thinking_trace: Some(value),
                ..TilePatch::default()
            },
            now,
        )
    }

    /// Rename a tile (display name only; registry updates are the
    /// caller's concern).
    pub fn rename_tile(
        &mut self,
        project_id: &str,
        tile_id: &str,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> bool {
        self.update_tile(
            project_id,
            tile_id,
            TilePatch {
                name: Some(name.into()),
                ..TilePatch::default()
            },
            now,
        )
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use agentdeck_core::types::TileRole;
    use chrono::Utc;

    fn seed_store() -> TileStore {
        let now = Utc::now();
        let tile = AgentTile::new(
            "t1".into(),
            "a1".into(),
            "Scout".into(),
            TileRole::Coding,
            "agent:a1:main".into(),
            Point::new(120.0, 120.0),
            DEFAULT_TILE_SIZE,
        );
        TileStore::from_doc(ProjectsDoc {
            version: 2,
            active_project_id: Some("p1".into()),
            projects: vec![Project {
                id: "p1".into(),
                name: "Studio".into(),
                repo_path: "/srv/studio".into(),
                created_at: now,
                updated_at: now,
                tiles: vec![tile],
                archived_at: None,
            }],
        })
    }

    #[test]
    fn session_index_built_from_doc() {
        let store = seed_store();
        let address = store.address_for_session("agent:a1:main").unwrap();
        assert_eq!(address.project_id, "p1");
        assert_eq!(address.tile_id, "t1");
        assert!(store.address_for_session("agent:ghost:main").is_none());
    }

    #[test]
    fn insert_updates_index_and_order() {
        let mut store = seed_store();
        let (position, size) = store.next_placement("p1");
        let tile = AgentTile::new(
            "t2".into(),
            "a2".into(),
            "Probe".into(),
            TileRole::Research,
            "agent:a2:main".into(),
            position,
            size,
        );
        assert!(store.insert_tile("p1", tile, Utc::now()));
        let project = store.project("p1").unwrap();
        assert_eq!(project.tiles.len(), 2);
        assert_eq!(project.tiles[1].id, "t2");
        assert!(store.address_for_session("agent:a2:main").is_some());
    }

    #[test]
    fn insert_into_missing_project_is_noop() {
        let mut store = seed_store();
        let tile = AgentTile::new(
            "t9".into(),
            "a9".into(),
            "Ghost".into(),
            TileRole::Coding,
            "agent:a9:main".into(),
            Point::default(),
            DEFAULT_TILE_SIZE,
        );
        assert!(!store.insert_tile("nope", tile, Utc::now()));
        assert!(store.address_for_session("agent:a9:main").is_none());
    }

    #[test]
    fn remove_clears_index() {
        let mut store = seed_store();
        let removed = store.remove_tile("p1", "t1", Utc::now()).unwrap();
        assert_eq!(removed.session_key, "agent:a1:main");
        assert!(store.address_for_session("agent:a1:main").is_none());
        assert!(store.remove_tile("p1", "t1", Utc::now()).is_none());
    }

    #[test]
    fn update_missing_tile_is_noop() {
        let mut store = seed_store();
        assert!(!store.update_tile("p1", "ghost", TilePatch::status(TileStatus::Running), Utc::now()));
        assert!(!store.update_tile("ghost", "t1", TilePatch::status(TileStatus::Running), Utc::now()));
    }

    #[test]
    fn patch_is_shallow_and_idempotent() {
        let mut store = seed_store();
        let patch = TilePatch {
            status: Some(TileStatus::Running),
            model: Some(Some("openai/gpt-5".into())),
            ..TilePatch::default()
        };
        assert!(store.update_tile("p1", "t1", patch.clone(), Utc::now()));
        assert!(store.update_tile("p1", "t1", patch, Utc::now()));
        let tile = store.tile("p1", "t1").unwrap();
        assert_eq!(tile.status, TileStatus::Running);
        assert_eq!(tile.model.as_deref(), Some("openai/gpt-5"));
        // untouched fields survive
        assert_eq!(tile.name, "Scout");
    }

    #[test]
    fn nullable_patch_distinguishes_clear_from_skip() {
        let mut store = seed_store();
        store.set_stream("p1", "t1", Some("partial".into()), Utc::now());
        assert_eq!(
            store.tile("p1", "t1").unwrap().stream_text.as_deref(),
            Some("partial")
        );
        store.set_stream("p1", "t1", None, Utc::now());
        assert!(store.tile("p1", "t1").unwrap().stream_text.is_none());
    }

    #[test]
    fn stream_replaces_not_appends() {
        let mut store = seed_store();
        store.set_stream("p1", "t1", Some("Hello".into()), Utc::now());
        store.set_stream("p1", "t1", Some("Hello world".into()), Utc::now());
        assert_eq!(
            store.tile("p1", "t1").unwrap().stream_text.as_deref(),
            Some("Hello world")
        );
    }

    #[test]
    fn append_output_preserves_order() {
        let mut store = seed_store();
        store.append_output("p1", "t1", "> first", Utc::now());
        store.append_output("p1", "t1", "reply", Utc::now());
        let tile = store.tile("p1", "t1").unwrap();
        assert_eq!(tile.output_lines, vec!["> first", "reply"]);
        assert!(!store.append_output("p1", "ghost", "x", Utc::now()));
    }

    #[test]
    fn placement_cascades_with_tile_count() {
        let store = seed_store();
        let (p, s) = store.next_placement("p1");
        assert!((p.x - 168.0).abs() < 1e-9);
        assert!((p.y - 160.0).abs() < 1e-9);
        assert_eq!(s, DEFAULT_TILE_SIZE);
    }

    #[test]
    fn active_tiles_excludes_archived() {
        let mut store = seed_store();
        store.update_tile(
            "p1",
            "t1",
            TilePatch {
                archived_at: Some(Some(Utc::now())),
                ..TilePatch::default()
            },
            Utc::now(),
        );
        assert!(store.active_tiles("p1").is_empty());
        assert_eq!(store.project("p1").unwrap().tiles.len(), 1);
    }
}
