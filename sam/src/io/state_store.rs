//! Persistence of maturity and mental-health state (`<state_dir>/state.json`).

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::maturity::MaturityTracker;
use crate::core::mental_health::MentalHealthMonitor;
use crate::core::performance::PerformanceMetrics;

/// Everything the engine needs to resume where it stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub maturity: MaturityTracker,
    pub mental_health: MentalHealthMonitor,
    #[serde(default)]
    pub performance: PerformanceMetrics,
    pub saved_at: DateTime<Utc>,
}

/// Load-at-start, save-after-mutation store for engine state.
pub trait StateStore {
    /// Returns `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<EngineSnapshot>>;
    fn save(&self, snapshot: &EngineSnapshot) -> Result<()>;
}

/// Pretty JSON file written atomically (temp file + rename).
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub const FILE_NAME: &'static str = "state.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<Option<EngineSnapshot>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no saved state");
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("read state {}", self.path.display()))?;
        let snapshot: EngineSnapshot = serde_json::from_str(&contents)
            .with_context(|| format!("parse state {}", self.path.display()))?;
        debug!(
            path = %self.path.display(),
            level = %snapshot.maturity.level(),
            "state loaded"
        );
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &EngineSnapshot) -> Result<()> {
        debug!(path = %self.path.display(), level = %snapshot.maturity.level(), "writing state");
        let mut buf = serde_json::to_string_pretty(snapshot).context("serialize state")?;
        buf.push('\n');
        super::write_atomic(&self.path, &buf, "json.tmp")
    }
}

/// In-process store; keeps the last saved snapshot.
///
/// Clones share the same slot, so a test can keep a handle after boxing one
/// into an engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    snapshot: Rc<RefCell<Option<EngineSnapshot>>>,
    saves: Rc<Cell<usize>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: EngineSnapshot) -> Self {
        let store = Self::default();
        *store.snapshot.borrow_mut() = Some(snapshot);
        store
    }

    pub fn saves(&self) -> usize {
        self.saves.get()
    }

    pub fn last(&self) -> Option<EngineSnapshot> {
        self.snapshot.borrow().clone()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<EngineSnapshot>> {
        Ok(self.snapshot.borrow().clone())
    }

    fn save(&self, snapshot: &EngineSnapshot) -> Result<()> {
        *self.snapshot.borrow_mut() = Some(snapshot.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
