//! Whole-document JSON persistence for the projects store.
//!
//! The engine never assumes transactional multi-writer safety: it
//! reads the full document, mutates in memory, and writes the full
//! document back.

use std::path::{Path, PathBuf};

use agentdeck_core::types::ProjectsDoc;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("document parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Load/save contract for the persisted projects document.
pub trait DocumentStore {
    fn load(&self) -> Result<ProjectsDoc, StoreError>;
    fn save(&self, doc: &ProjectsDoc) -> Result<(), StoreError>;
}

/// File-backed JSON document store.
#[derive(Debug, Clone)]
pub struct JsonDocumentStore {
    path: PathBuf,
}

impl JsonDocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for JsonDocumentStore {
    /// Read the full document. A missing file is an empty versioned
    /// document, not an error.
    fn load(&self) -> Result<ProjectsDoc, StoreError> {
        if !self.path.exists() {
            return Ok(ProjectsDoc::default());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let doc: ProjectsDoc = serde_json::from_str(&raw)?;
        Ok(doc)
    }

    /// Write the full document, creating parent directories as needed.
    fn save(&self, doc: &ProjectsDoc) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(doc)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use agentdeck_core::types::{DOC_VERSION, Project};
    use chrono::Utc;

    #[test]
    fn missing_file_loads_empty_doc() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDocumentStore::new(dir.path().join("projects.json"));
        let doc = store.load().unwrap();
        assert_eq!(doc.version, DOC_VERSION);
        assert!(doc.projects.is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDocumentStore::new(dir.path().join("nested/projects.json"));

        let now = Utc::now();
        let doc = ProjectsDoc {
            version: DOC_VERSION,
            active_project_id: Some("p1".into()),
            projects: vec![Project {
                id: "p1".into(),
                name: "Studio".into(),
                repo_path: "/srv/studio".into(),
                created_at: now,
                updated_at: now,
                tiles: Vec::new(),
                archived_at: None,
            }],
        };

        store.save(&doc).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonDocumentStore::new(path);
        assert!(matches!(store.load(), Err(StoreError::Parse(_))));
    }
}
