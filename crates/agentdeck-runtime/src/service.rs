//! Session service: ties the tile store, document persistence, the
//! gateway, and agent artifacts together.
//!
//! All tile mutations flow through here so the persisted document
//! stays the source of truth: lifecycle changes save before they are
//! acknowledged, transcript-affecting events save as they commit, and
//! agent artifact cleanup degrades to warnings instead of blocking.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use agentdeck_core::frames::{ChatEvent, EventFrame, decode_chat_frame};
use agentdeck_core::text::build_instruction;
use agentdeck_core::types::{AgentTile, Project, TileRole, TileStatus};
use agentdeck_gateway::client::{
    ChatSendParams, GatewayClient, GatewayError, ModelChoice, SessionsPatchParams, chat_send,
    models_list, sessions_patch,
};
use agentdeck_store::document::{DocumentStore, StoreError};
use agentdeck_store::ids::{new_agent_id, new_project_id, new_tile_id, session_key_for};
use agentdeck_store::router::{RouteOutcome, route_chat_event};
use agentdeck_store::store::{TileAddress, TilePatch, TileStore};
use agentdeck_sync::SyncError;
use agentdeck_sync::fs_api::{delete_agent_artifacts, ensure_agent_workspace};
use agentdeck_sync::paths::{agent_workspace_dir, registry_path};
use agentdeck_sync::registry::{RegistryStore, remove_agent_entry, upsert_agent_entry};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("unknown project: {0}")]
    UnknownProject(String),
    #[error("unknown tile: {0}")]
    UnknownTile(String),
}

pub struct SessionService<G, D> {
    gateway: G,
    docs: D,
    store: TileStore,
    state_dir: PathBuf,
    registry: RegistryStore,
}

impl<G: GatewayClient, D: DocumentStore> SessionService<G, D> {
    /// Load the persisted document and build the service around it.
    pub fn open(gateway: G, docs: D, state_dir: PathBuf) -> Result<Self, ServiceError> {
        let doc = docs.load()?;
        let registry = RegistryStore::new(registry_path(&state_dir));
        Ok(Self {
            gateway,
            docs,
            store: TileStore::from_doc(doc),
            state_dir,
            registry,
        })
    }

    pub fn store(&self) -> &TileStore {
        &self.store
    }

    /// Subscribe to the gateway event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EventFrame> {
        self.gateway.subscribe()
    }

    fn persist(&self) -> Result<(), ServiceError> {
        self.docs.save(self.store.doc())?;
        Ok(())
    }

    /// Resolve an explicit project id, falling back to the active one.
    pub fn resolve_project(&self, project_id: Option<&str>) -> Result<String, ServiceError> {
        match project_id {
            Some(id) => {
                if self.store.project(id).is_none() {
                    return Err(ServiceError::UnknownProject(id.to_string()));
                }
                Ok(id.to_string())
            }
            None => self
                .store
                .active_project()
                .map(|p| p.id.clone())
                .ok_or_else(|| ServiceError::UnknownProject("<active>".to_string())),
        }
    }

    /// Resolve the active project, bootstrapping a `default` project
    /// on a fresh document so first-run commands have somewhere to
    /// land.
    pub fn ensure_active_project(&mut self, now: DateTime<Utc>) -> Result<String, ServiceError> {
        if let Some(project) = self.store.active_project() {
            return Ok(project.id.clone());
        }
        let mut candidate = self.store.doc().clone();
        let id = match candidate.projects.first() {
            Some(project) => project.id.clone(),
            None => {
                let repo_path = std::env::current_dir()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                let project = Project {
                    id: new_project_id(),
                    name: "default".to_string(),
                    repo_path,
                    created_at: now,
                    updated_at: now,
                    tiles: Vec::new(),
                    archived_at: None,
                };
                let id = project.id.clone();
                candidate.projects.push(project);
                id
            }
        };
        candidate.active_project_id = Some(id.clone());
        self.docs.save(&candidate)?;
        self.store.replace_doc(candidate);
        Ok(id)
    }

    fn workspace_path(&self, project_id: &str, agent_id: &str) -> String {
        agent_workspace_dir(&self.state_dir, project_id, agent_id)
            .display()
            .to_string()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Create a tile and its agent scaffolding. The document is saved
    /// before the in-memory store picks up the new tile; artifact and
    /// registry failures degrade to warnings.
    pub fn create_tile(
        &mut self,
        project_id: &str,
        name: &str,
        role: TileRole,
        now: DateTime<Utc>,
    ) -> Result<(TileAddress, Vec<String>), ServiceError> {
        let agent_id = new_agent_id(name);
        let tile_id = new_tile_id();
        let (position, size) = self.store.next_placement(project_id);
        let tile = AgentTile::new(
            tile_id.clone(),
            agent_id.clone(),
            name.to_string(),
            role,
            session_key_for(&agent_id),
            position,
            size,
        );

        let mut candidate = self.store.doc().clone();
        let Some(project) = candidate.projects.iter_mut().find(|p| p.id == project_id) else {
            return Err(ServiceError::UnknownProject(project_id.to_string()));
        };
        project.tiles.push(tile);
        project.updated_at = now;
        self.docs.save(&candidate)?;
        self.store.replace_doc(candidate);

        let mut warnings = Vec::new();
        let workspace = match ensure_agent_workspace(&self.state_dir, project_id, &agent_id) {
            Ok(dir) => dir.display().to_string(),
            Err(err) => {
                warnings.push(format!("Agent workspace not created: {err}"));
                self.workspace_path(project_id, &agent_id)
            }
        };
        match self.registry.load() {
            Ok(mut config) => {
                if upsert_agent_entry(&mut config, &agent_id, name, &workspace)
                    && let Err(err) = self.registry.save(&config)
                {
                    warnings.push(format!("Agent config not updated: {err}"));
                }
            }
            Err(err) => warnings.push(format!("Agent config not updated: {err}")),
        }

        Ok((
            TileAddress {
                project_id: project_id.to_string(),
                tile_id,
            },
            warnings,
        ))
    }

    /// Remove a tile, its workspace, its runtime state, and its
    /// registry entry. Cleanup failures become warnings; only losing
    /// the document write itself is an error.
    pub fn delete_tile(
        &mut self,
        project_id: &str,
        tile_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, ServiceError> {
        let Some(tile) = self.store.tile(project_id, tile_id) else {
            return Err(ServiceError::UnknownTile(tile_id.to_string()));
        };
        let agent_id = tile.agent_id.clone();

        let warnings = if agent_id.trim().is_empty() {
            vec![format!("Missing agent id for tile {tile_id}; skipped agent cleanup.")]
        } else {
            let mut warnings = delete_agent_artifacts(&self.state_dir, project_id, &agent_id);
            match self.registry.load() {
                Ok(mut config) => {
                    if remove_agent_entry(&mut config, &agent_id)
                        && let Err(err) = self.registry.save(&config)
                    {
                        warnings.push(format!("Agent config not updated: {err}"));
                    }
                }
                Err(err) => warnings.push(format!("Agent config not updated: {err}")),
            }
            warnings
        };

        self.store.remove_tile(project_id, tile_id, now);
        self.persist()?;
        Ok(warnings)
    }

    /// Rename a tile and keep the agent registry in step.
    pub fn rename_tile(
        &mut self,
        project_id: &str,
        tile_id: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, ServiceError> {
        let name = name.trim();
        let Some(tile) = self.store.tile(project_id, tile_id) else {
            return Err(ServiceError::UnknownTile(tile_id.to_string()));
        };
        let agent_id = tile.agent_id.clone();
        if name.is_empty() {
            return Ok(Vec::new());
        }
        self.store.rename_tile(project_id, tile_id, name, now);
        self.persist()?;

        let mut warnings = Vec::new();
        let workspace = self.workspace_path(project_id, &agent_id);
        match self.registry.load() {
            Ok(mut config) => {
                if upsert_agent_entry(&mut config, &agent_id, name, &workspace)
                    && let Err(err) = self.registry.save(&config)
                {
                    warnings.push(format!("Agent config not updated: {err}"));
                }
            }
            Err(err) => warnings.push(format!("Agent config not updated: {err}")),
        }
        Ok(warnings)
    }

    /// Re-roll the avatar without touching the agent identity.
    pub fn shuffle_avatar(
        &mut self,
        project_id: &str,
        tile_id: &str,
        seed: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let seed = seed.trim();
        if seed.is_empty() {
            return Ok(());
        }
        if self.store.tile(project_id, tile_id).is_none() {
            return Err(ServiceError::UnknownTile(tile_id.to_string()));
        }
        self.store.update_tile(
            project_id,
            tile_id,
            TilePatch {
                avatar_seed: Some(seed.to_string()),
                ..TilePatch::default()
            },
            now,
        );
        self.persist()
    }

    // ── Messaging ────────────────────────────────────────────────

    /// Send one user message into a tile's session. The user line and
    /// running status commit locally before the gateway call; a
    /// gateway failure marks the tile errored and surfaces the error.
    pub async fn send_message(
        &mut self,
        project_id: &str,
        tile_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        let Some(tile) = self.store.tile(project_id, tile_id) else {
            return Err(ServiceError::UnknownTile(tile_id.to_string()));
        };
        let session_key = tile.session_key.clone();
        let workspace = self.workspace_path(project_id, &tile.agent_id);

        self.store
            .append_output(project_id, tile_id, format!("> {trimmed}"), now);
        self.store.update_tile(
            project_id,
            tile_id,
            TilePatch {
                status: Some(TileStatus::Running),
                draft: Some(String::new()),
                ..TilePatch::default()
            },
            now,
        );
        self.persist()?;

        let params = ChatSendParams::new(
            session_key,
            build_instruction(Some(workspace.as_str()), trimmed),
        );
        if let Err(err) = chat_send(&self.gateway, params).await {
            // The tile may have been deleted while the call was out.
            if self.store.tile(project_id, tile_id).is_some() {
                self.store
                    .append_output(project_id, tile_id, format!("Error: {err}"), now);
                self.store.update_tile(
                    project_id,
                    tile_id,
                    TilePatch::status(TileStatus::Error),
                    now,
                );
                self.persist()?;
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Send one message to every active tile in a project. Per-tile
    /// failures are logged and skipped; returns how many sends landed.
    pub async fn broadcast(
        &mut self,
        project_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, ServiceError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        let targets: Vec<(String, String, String)> = self
            .store
            .active_tiles(project_id)
            .iter()
            .map(|t| (t.id.clone(), t.session_key.clone(), t.agent_id.clone()))
            .collect();

        let mut delivered = 0;
        for (tile_id, session_key, agent_id) in targets {
            self.store.update_tile(
                project_id,
                &tile_id,
                TilePatch::status(TileStatus::Running),
                now,
            );
            let workspace = self.workspace_path(project_id, &agent_id);
            let params = ChatSendParams::new(
                session_key,
                build_instruction(Some(workspace.as_str()), &format!("[Group Chat] {trimmed}")),
            );
            match chat_send(&self.gateway, params).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::error!(tile_id, error = %err, "group send failed");
                }
            }
        }
        self.persist()?;
        Ok(delivered)
    }

    // ── Session Settings ─────────────────────────────────────────

    /// Change (or clear) the session model, gateway first.
    pub async fn set_model(
        &mut self,
        project_id: &str,
        tile_id: &str,
        model: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let Some(tile) = self.store.tile(project_id, tile_id) else {
            return Err(ServiceError::UnknownTile(tile_id.to_string()));
        };
        let session_key = tile.session_key.clone();
        sessions_patch(
            &self.gateway,
            SessionsPatchParams::model(session_key, model.clone()),
        )
        .await?;
        self.store.update_tile(
            project_id,
            tile_id,
            TilePatch {
                model: Some(model),
                ..TilePatch::default()
            },
            now,
        );
        self.persist()
    }

    /// Change (or clear) the session thinking level, gateway first.
    pub async fn set_thinking_level(
        &mut self,
        project_id: &str,
        tile_id: &str,
        level: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let Some(tile) = self.store.tile(project_id, tile_id) else {
            return Err(ServiceError::UnknownTile(tile_id.to_string()));
        };
        let session_key = tile.session_key.clone();
        sessions_patch(
            &self.gateway,
            SessionsPatchParams::thinking_level(session_key, level.clone()),
        )
        .await?;
        self.store.update_tile(
            project_id,
            tile_id,
            TilePatch {
                thinking_level: Some(level),
                ..TilePatch::default()
            },
            now,
        );
        self.persist()
    }

    pub async fn list_models(&self) -> Result<Vec<ModelChoice>, ServiceError> {
        Ok(models_list(&self.gateway).await?)
    }

    // ── Events ───────────────────────────────────────────────────

    /// Apply one gateway frame. Deltas mutate only in memory; frames
    /// that touch the durable transcript or terminal status also save
    /// the document.
    pub fn handle_frame(
        &mut self,
        frame: &EventFrame,
        now: DateTime<Utc>,
    ) -> Result<Option<RouteOutcome>, ServiceError> {
        let Some(event) = decode_chat_frame(frame) else {
            return Ok(None);
        };
        let durable = !matches!(event, ChatEvent::Delta { .. });
        let outcome = route_chat_event(&mut self.store, &event, now);
        if durable && matches!(outcome, RouteOutcome::Applied { .. }) {
            self.persist()?;
        }
        Ok(Some(outcome))
    }
}

// ─── Tests ────────────────────────────────────────────────────────
