//! Heartbeat settings form and its reconciliation with the registry.
//!
//! The form holds the editable decomposition of one stored
//! [`HeartbeatConfig`]: an enabled flag on top of the `"0m"` encoding,
//! preset-versus-custom interval entry, and the target mode split out
//! from the raw target string. Saving re-canonicalizes the form, and
//! validation failures stay local so a bad custom interval never
//! reaches the registry.

use agentdeck_core::heartbeat::{
    ActiveHours, DEFAULT_ACK_MAX_CHARS, DEFAULT_INTERVAL, DISABLED_INTERVAL, HeartbeatConfig,
    IntervalMode, TargetMode, encode_minutes, encode_target, interval_mode, target_mode,
    validate_custom_minutes,
};
use agentdeck_core::types::CoreError;

use crate::SyncError;
use crate::registry::{RegistryStore, agent_heartbeat, set_agent_heartbeat};

/// Stored config plus whether it comes from a per-agent override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatSnapshot {
    pub config: HeartbeatConfig,
    pub has_override: bool,
}

/// One save: the canonical config and whether it should be stored as a
/// per-agent override or revert the agent to the shared default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatUpdate {
    pub config: HeartbeatConfig,
    pub override_default: bool,
}

/// Read and write one agent's heartbeat settings.
pub trait HeartbeatApi {
    fn fetch(&self) -> impl Future<Output = Result<HeartbeatSnapshot, SyncError>> + Send;

    fn store(
        &self,
        update: HeartbeatUpdate,
    ) -> impl Future<Output = Result<HeartbeatSnapshot, SyncError>> + Send;
}

/// Editable heartbeat form state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatForm {
    pub has_override: bool,
    pub enabled: bool,
    /// Selected preset value; meaningful only in preset mode.
    pub every: String,
    pub custom_interval: bool,
    /// Raw text of the custom minutes field; validated on save.
    pub custom_minutes: String,
    pub target: TargetMode,
    pub include_reasoning: bool,
    pub active_hours_enabled: bool,
    pub active_start: String,
    pub active_end: String,
    /// Raw text of the ack limit field; non-numeric falls back to the
    /// default on save.
    pub ack_max_chars: String,
}

impl Default for HeartbeatForm {
    fn default() -> Self {
        Self {
            has_override: false,
            enabled: true,
            every: DEFAULT_INTERVAL.to_string(),
            custom_interval: false,
            custom_minutes: "45".to_string(),
            target: TargetMode::Last,
            include_reasoning: false,
            active_hours_enabled: false,
            active_start: "08:00".to_string(),
            active_end: "18:00".to_string(),
            ack_max_chars: DEFAULT_ACK_MAX_CHARS.to_string(),
        }
    }
}

impl HeartbeatForm {
    /// Decompose a stored snapshot into the editable form.
    pub fn from_snapshot(snapshot: &HeartbeatSnapshot) -> Self {
        let config = &snapshot.config;
        let enabled = config.every != DISABLED_INTERVAL;
        let mut form = Self {
            has_override: snapshot.has_override,
            enabled,
            include_reasoning: config.include_reasoning,
            ack_max_chars: config.ack_max_chars.to_string(),
            target: target_mode(&config.target),
            ..Self::default()
        };
        match interval_mode(&config.every) {
            IntervalMode::Preset(every) => {
                form.custom_interval = false;
                form.every = every;
            }
            IntervalMode::Custom(minutes) => {
                form.custom_interval = true;
                form.custom_minutes = minutes.to_string();
            }
        }
        if !enabled {
            form.every = DEFAULT_INTERVAL.to_string();
            form.custom_interval = false;
        }
        if let Some(hours) = &config.active_hours {
            form.active_hours_enabled = true;
            form.active_start = hours.start.clone();
            form.active_end = hours.end.clone();
        }
        form
    }

    /// Canonicalize the form for saving. Fails locally on an invalid
    /// custom interval; nothing reaches the registry in that case.
    pub fn to_update(&self) -> Result<HeartbeatUpdate, CoreError> {
        let every = if !self.enabled {
            DISABLED_INTERVAL.to_string()
        } else if self.custom_interval {
            encode_minutes(validate_custom_minutes(&self.custom_minutes)?)
        } else {
            self.every.trim().to_string()
        };
        let ack_max_chars = self
            .ack_max_chars
            .trim()
            .parse()
            .unwrap_or(DEFAULT_ACK_MAX_CHARS);
        let active_hours = (self.active_hours_enabled
            && !self.active_start.is_empty()
            && !self.active_end.is_empty())
        .then(|| ActiveHours {
            start: self.active_start.clone(),
            end: self.active_end.clone(),
        });
        Ok(HeartbeatUpdate {
            config: HeartbeatConfig {
                every,
                target: encode_target(&self.target),
                include_reasoning: self.include_reasoning,
                active_hours,
                ack_max_chars,
            },
            override_default: self.has_override,
        })
    }
}

/// Drives the form against a [`HeartbeatApi`]: load decodes, edits
/// mark the form dirty, save validates then writes. At most one save
/// runs at a time; a save requested mid-save is dropped.
#[derive(Debug)]
pub struct HeartbeatSyncer<A> {
    api: A,
    form: HeartbeatForm,
    loading: bool,
    saving: bool,
    dirty: bool,
    error: Option<String>,
}

impl<A: HeartbeatApi> HeartbeatSyncer<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            form: HeartbeatForm::default(),
            loading: false,
            saving: false,
            dirty: false,
            error: None,
        }
    }

    pub fn form(&self) -> &HeartbeatForm {
        &self.form
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Apply a field edit through a closure. Any edit claims a
    /// per-agent override and marks the form dirty; the override is
    /// only released through [`Self::set_override`].
    pub fn edit(&mut self, apply: impl FnOnce(&mut HeartbeatForm)) {
        apply(&mut self.form);
        self.form.has_override = true;
        self.dirty = true;
    }

    /// Toggle the schedule. Flipping it back off still leaves the
    /// agent overridden until the override itself is cleared.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.edit(|form| form.enabled = enabled);
    }

    /// Set or clear the per-agent override directly. Clearing reverts
    /// the agent to the shared default on the next save.
    pub fn set_override(&mut self, has_override: bool) {
        self.form.has_override = has_override;
        self.dirty = true;
    }

    pub async fn load(&mut self) -> Result<(), SyncError> {
        self.loading = true;
        self.error = None;
        let result = self.api.fetch().await;
        self.loading = false;
        match result {
            Ok(snapshot) => {
                self.form = HeartbeatForm::from_snapshot(&snapshot);
                self.dirty = false;
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn save(&mut self) -> Result<(), SyncError> {
        if self.saving {
            return Ok(());
        }
        let update = match self.form.to_update() {
            Ok(update) => update,
            Err(err) => {
                self.error = Some(err.to_string());
                return Ok(());
            }
        };
        self.saving = true;
        self.error = None;
        let result = self.api.store(update).await;
        self.saving = false;
        match result {
            Ok(snapshot) => {
                self.form.has_override = snapshot.has_override;
                self.dirty = false;
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }
}

// ─── Registry-backed API ──────────────────────────────────────────

/// [`HeartbeatApi`] over the agent registry file.
#[derive(Debug, Clone)]
pub struct RegistryHeartbeatApi {
    store: RegistryStore,
    agent_id: String,
}

impl RegistryHeartbeatApi {
    pub fn new(store: RegistryStore, agent_id: impl Into<String>) -> Self {
        Self {
            store,
            agent_id: agent_id.into(),
        }
    }
}

impl HeartbeatApi for RegistryHeartbeatApi {
    async fn fetch(&self) -> Result<HeartbeatSnapshot, SyncError> {
        let config = self.store.load()?;
        let (heartbeat, has_override) = agent_heartbeat(&config, &self.agent_id);
        Ok(HeartbeatSnapshot {
            config: heartbeat,
            has_override,
        })
    }

    async fn store(&self, update: HeartbeatUpdate) -> Result<HeartbeatSnapshot, SyncError> {
        let mut config = self.store.load()?;
        let changed = if update.override_default {
            set_agent_heartbeat(&mut config, &self.agent_id, Some(&update.config))
        } else {
            set_agent_heartbeat(&mut config, &self.agent_id, None)
        };
        if changed {
            self.store.save(&config)?;
        }
        let (heartbeat, has_override) = agent_heartbeat(&config, &self.agent_id);
        Ok(HeartbeatSnapshot {
            config: heartbeat,
            has_override,
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────
