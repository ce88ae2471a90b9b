//! Side-effecting collaborators for the decision engine.
//!
//! Each boundary the engine talks to (persistence, traces, policy, resources,
//! personality matrix) sits behind a narrow trait so tests can swap in fakes.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub mod config;
pub mod personality;
pub mod policy;
pub mod request;
pub mod resources;
pub mod state_store;
pub mod trace_sink;

/// Write `contents` next to `path` with `tmp_extension`, then rename over it.
pub(crate) fn write_atomic(path: &Path, contents: &str, tmp_extension: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension(tmp_extension);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
