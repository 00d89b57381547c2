//! Filesystem-backed workspace file access and agent artifact cleanup.

use std::fs;
use std::path::{Path, PathBuf};

use crate::SyncError;
use crate::paths::{agent_state_dir, agent_workspace_dir};
use crate::workspace::{FileSnapshot, FileWrite, WorkspaceFileApi, WorkspaceFileName};

/// Direct filesystem implementation of [`WorkspaceFileApi`], rooted at
/// one agent's workspace directory.
#[derive(Debug, Clone)]
pub struct FsWorkspaceApi {
    workspace_dir: PathBuf,
}

impl FsWorkspaceApi {
    pub fn new(workspace_dir: PathBuf) -> Self {
        Self { workspace_dir }
    }

    pub fn for_agent(state_dir: &Path, project_id: &str, agent_id: &str) -> Self {
        Self::new(agent_workspace_dir(state_dir, project_id, agent_id))
    }

    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    fn read_one(&self, name: WorkspaceFileName) -> Result<FileSnapshot, SyncError> {
        let path = self.workspace_dir.join(name.as_str());
        if !path.exists() {
            return Ok(FileSnapshot {
                name,
                content: String::new(),
                exists: false,
            });
        }
        if !path.is_file() {
            return Err(SyncError::NotAFile(name.as_str().to_string()));
        }
        Ok(FileSnapshot {
            name,
            content: fs::read_to_string(&path)?,
            exists: true,
        })
    }

    fn snapshot_all(&self) -> Result<Vec<FileSnapshot>, SyncError> {
        WorkspaceFileName::ALL
            .into_iter()
            .map(|name| self.read_one(name))
            .collect()
    }

    fn require_dir(&self) -> Result<(), SyncError> {
        if !self.workspace_dir.is_dir() {
            return Err(SyncError::MissingWorkspace(self.workspace_dir.clone()));
        }
        Ok(())
    }
}

impl WorkspaceFileApi for FsWorkspaceApi {
    async fn fetch(&self) -> Result<Vec<FileSnapshot>, SyncError> {
        self.require_dir()?;
        self.snapshot_all()
    }

    async fn store(&self, writes: Vec<FileWrite>) -> Result<Vec<FileSnapshot>, SyncError> {
        self.require_dir()?;
        // Check every target before touching any of them; a file
        // shadowed by a directory fails the whole batch up front.
        for write in &writes {
            let path = self.workspace_dir.join(write.name.as_str());
            if path.exists() && !path.is_file() {
                return Err(SyncError::NotAFile(write.name.as_str().to_string()));
            }
        }
        for write in &writes {
            fs::write(self.workspace_dir.join(write.name.as_str()), &write.content)?;
        }
        self.snapshot_all()
    }
}

// ─── Agent artifacts ──────────────────────────────────────────────

/// Create an agent's workspace directory if it does not exist yet.
pub fn ensure_agent_workspace(
    state_dir: &Path,
    project_id: &str,
    agent_id: &str,
) -> Result<PathBuf, SyncError> {
    let dir = agent_workspace_dir(state_dir, project_id, agent_id);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn remove_dir_if_exists(path: &Path, label: &str, warnings: &mut Vec<String>) {
    if !path.exists() {
        warnings.push(format!("{label} not found at {}.", path.display()));
        return;
    }
    if !path.is_dir() {
        warnings.push(format!("{label} path is not a directory: {}", path.display()));
        return;
    }
    if let Err(err) = fs::remove_dir_all(path) {
        warnings.push(format!("{label} not removed: {err}"));
    }
}

/// Delete an agent's workspace and runtime state directories.
///
/// Cleanup is best-effort: every miss or failure becomes a warning for
/// the caller to surface, never an error that blocks tile removal.
pub fn delete_agent_artifacts(state_dir: &Path, project_id: &str, agent_id: &str) -> Vec<String> {
    let mut warnings = Vec::new();
    remove_dir_if_exists(
        &agent_workspace_dir(state_dir, project_id, agent_id),
        "Agent workspace",
        &mut warnings,
    );
    remove_dir_if_exists(
        &agent_state_dir(state_dir, agent_id),
        "Agent state",
        &mut warnings,
    );
    warnings
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace_with_soul() -> (TempDir, FsWorkspaceApi) {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("SOUL.md"), "be kind").unwrap();
        let api = FsWorkspaceApi::new(dir.path().to_path_buf());
        (dir, api)
    }

    #[tokio::test]
    async fn fetch_reports_absent_files_as_empty() {
        let (_dir, api) = workspace_with_soul();
        let files = api.fetch().await.unwrap();
        assert_eq!(files.len(), 7);
        let soul = files
            .iter()
            .find(|f| f.name == WorkspaceFileName::Soul)
            .unwrap();
        assert!(soul.exists);
        assert_eq!(soul.content, "be kind");
        let memory = files
            .iter()
            .find(|f| f.name == WorkspaceFileName::Memory)
            .unwrap();
        assert!(!memory.exists);
        assert_eq!(memory.content, "");
    }

    #[tokio::test]
    async fn fetch_on_missing_workspace_errors() {
        let api = FsWorkspaceApi::new(PathBuf::from("/nonexistent/agentdeck-test"));
        assert!(matches!(
            api.fetch().await,
            Err(SyncError::MissingWorkspace(_))
        ));
    }

    #[tokio::test]
    async fn store_writes_then_returns_fresh_view() {
        let (dir, api) = workspace_with_soul();
        let files = api
            .store(vec![FileWrite {
                name: WorkspaceFileName::Memory,
                content: "durable fact".into(),
            }])
            .await
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("MEMORY.md")).unwrap(),
            "durable fact"
        );
        let memory = files
            .iter()
            .find(|f| f.name == WorkspaceFileName::Memory)
            .unwrap();
        assert!(memory.exists);
    }

    #[tokio::test]
    async fn store_rejects_batch_when_target_is_a_directory() {
        let (dir, api) = workspace_with_soul();
        fs::create_dir(dir.path().join("TOOLS.md")).unwrap();
        let result = api
            .store(vec![
                FileWrite {
                    name: WorkspaceFileName::Agents,
                    content: "rules".into(),
                },
                FileWrite {
                    name: WorkspaceFileName::Tools,
                    content: "notes".into(),
                },
            ])
            .await;
        assert!(matches!(result, Err(SyncError::NotAFile(_))));
        // Nothing was written.
        assert!(!dir.path().join("AGENTS.md").exists());
    }

    #[test]
    fn delete_artifacts_warns_on_missing_dirs() {
        let state = TempDir::new().unwrap();
        let warnings = delete_agent_artifacts(state.path(), "p1", "ghost");
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("Agent workspace not found"));
        assert!(warnings[1].contains("Agent state not found"));
    }

    #[test]
    fn delete_artifacts_removes_both_dirs() {
        let state = TempDir::new().unwrap();
        let workspace = ensure_agent_workspace(state.path(), "p1", "scout").unwrap();
        fs::write(workspace.join("SOUL.md"), "x").unwrap();
        let agent_state = agent_state_dir(state.path(), "scout");
        fs::create_dir_all(&agent_state).unwrap();

        let warnings = delete_agent_artifacts(state.path(), "p1", "scout");
        assert!(warnings.is_empty());
        assert!(!workspace.exists());
        assert!(!agent_state.exists());
    }
}
