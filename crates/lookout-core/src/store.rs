//! Persisted face/alert/settings store.
//!
//! One JSON document holds the whole dashboard state. It is loaded once
//! at startup, kept in memory, and written back on every mutation.
//! Durability is best-effort: a failed write is logged and the in-memory
//! mutation is kept.

use crate::types::{Alert, Face, FacePatch, NewAlert, NewFace, Settings, SettingsPatch};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// The single durable record: everything the dashboard persists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub faces: Vec<Face>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub settings: Settings,
}

/// Swappable persistence capability behind the store.
pub trait PersistenceAdapter: Send {
    /// Load the last persisted state. `None` means nothing has been
    /// persisted yet (first run), which is not an error.
    fn load(&self) -> Result<Option<StoreState>, StoreError>;

    /// Durably write a snapshot of the current state.
    fn save(&self, state: &StoreState) -> Result<(), StoreError>;
}

/// JSON-file adapter: the whole state under one file path.
pub struct JsonFileAdapter {
    path: PathBuf,
}

impl JsonFileAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceAdapter for JsonFileAdapter {
    fn load(&self) -> Result<Option<StoreState>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, state: &StoreState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crash mid-write cannot truncate the
        // previous snapshot.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory adapter for tests and demo sessions. Never fails.
#[derive(Default)]
pub struct InMemoryAdapter {
    snapshot: Mutex<Option<StoreState>>,
}

impl PersistenceAdapter for InMemoryAdapter {
    fn load(&self) -> Result<Option<StoreState>, StoreError> {
        Ok(self.snapshot.lock().unwrap().clone())
    }

    fn save(&self, state: &StoreState) -> Result<(), StoreError> {
        *self.snapshot.lock().unwrap() = Some(state.clone());
        Ok(())
    }
}

/// Handle shared between the daemon's tasks. Mutations are short and
/// synchronous, so a plain mutex is enough; the lock is never held
/// across an await.
pub type SharedStore = Arc<Mutex<Store>>;

/// The dashboard's only mutable state: faces, alerts and settings,
/// re-persisted through the adapter on every mutation.
pub struct Store {
    state: StoreState,
    adapter: Box<dyn PersistenceAdapter>,
}

impl Store {
    /// Open a store backed by `adapter`, loading any persisted state.
    pub fn open(adapter: Box<dyn PersistenceAdapter>) -> Result<Self, StoreError> {
        let state = adapter.load()?.unwrap_or_default();
        Ok(Self { state, adapter })
    }

    /// Volatile store for tests and demo mode.
    pub fn in_memory() -> Self {
        Self {
            state: StoreState::default(),
            adapter: Box::new(InMemoryAdapter::default()),
        }
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    pub fn faces(&self) -> &[Face] {
        &self.state.faces
    }

    pub fn face(&self, id: u32) -> Option<&Face> {
        self.state.faces.iter().find(|f| f.id == id)
    }

    /// Alerts, most recent first.
    pub fn alerts(&self) -> &[Alert] {
        &self.state.alerts
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    /// Add a face. The id is one past the highest existing id (1 for an
    /// empty collection), so ids stay unique and strictly increasing
    /// even after removals within a session.
    pub fn add_face(&mut self, new: NewFace) -> Face {
        let face = Face {
            id: next_id(self.state.faces.iter().map(|f| f.id)),
            name: new.name,
            image: new.image,
            kind: new.kind,
            created_at: Utc::now(),
        };
        self.state.faces.push(face.clone());
        self.persist();
        face
    }

    /// Remove a face. Removing an unknown id is a no-op so that expiry
    /// sweeps stay idempotent.
    pub fn remove_face(&mut self, id: u32) -> bool {
        let before = self.state.faces.len();
        self.state.faces.retain(|f| f.id != id);
        let removed = self.state.faces.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    /// Merge `patch` into the face with `id`. Unknown ids are a no-op.
    /// `id` and `created_at` are not part of the patch type and cannot
    /// be rewritten.
    pub fn update_face(&mut self, id: u32, patch: FacePatch) -> Option<Face> {
        let face = self.state.faces.iter_mut().find(|f| f.id == id)?;
        if let Some(name) = patch.name {
            face.name = name;
        }
        if let Some(image) = patch.image {
            face.image = image;
        }
        if let Some(kind) = patch.kind {
            face.kind = kind;
        }
        let updated = face.clone();
        self.persist();
        Some(updated)
    }

    /// Record an alert at the head of the history (most recent first).
    pub fn add_alert(&mut self, new: NewAlert) -> Alert {
        let alert = Alert {
            id: next_id(self.state.alerts.iter().map(|a| a.id)),
            time: new.time,
            kind: new.kind,
            image: new.image,
        };
        self.state.alerts.insert(0, alert.clone());
        self.persist();
        alert
    }

    pub fn clear_alerts(&mut self) {
        if self.state.alerts.is_empty() {
            return;
        }
        self.state.alerts.clear();
        self.persist();
    }

    /// Shallow-merge a settings patch into the single settings record.
    pub fn update_settings(&mut self, patch: SettingsPatch) -> Settings {
        let s = &mut self.state.settings;
        if let Some(email) = patch.email {
            s.email = email;
        }
        if let Some(telegram) = patch.telegram {
            s.telegram = telegram;
        }
        if let Some(notifications) = patch.notifications {
            s.notifications = notifications;
        }
        if let Some(sensitivity) = patch.sensitivity {
            s.sensitivity = sensitivity;
        }
        if let Some(email_alerts) = patch.email_alerts {
            s.email_alerts = email_alerts;
        }
        if let Some(telegram_alerts) = patch.telegram_alerts {
            s.telegram_alerts = telegram_alerts;
        }
        let settings = s.clone();
        self.persist();
        settings
    }

    /// Best-effort durability: the in-memory mutation has already been
    /// applied and is never rolled back on a failed write.
    fn persist(&self) {
        if let Err(err) = self.adapter.save(&self.state) {
            tracing::warn!(error = %err, "failed to persist state; in-memory state kept");
        }
    }
}

fn next_id(ids: impl Iterator<Item = u32>) -> u32 {
    ids.max().map_or(1, |max| max + 1)
}
