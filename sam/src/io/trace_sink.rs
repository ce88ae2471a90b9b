//! Decision trace emission (`<state_dir>/traces.jsonl`).

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::trace::DecisionTrace;

/// Receives one trace per completed Act phase.
pub trait TraceSink {
    fn emit(&self, trace: &DecisionTrace) -> Result<()>;
}

/// Appends one JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonlTraceSink {
    path: PathBuf,
}

impl JsonlTraceSink {
    pub const FILE_NAME: &'static str = "traces.jsonl";

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

impl TraceSink for JsonlTraceSink {
    fn emit(&self, trace: &DecisionTrace) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let mut line = serde_json::to_string(trace).context("serialize decision trace")?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open trace log {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append trace {}", self.path.display()))?;
        debug!(trace_id = %trace.trace_id, path = %self.path.display(), "trace emitted");
        Ok(())
    }
}

/// Discards traces (tracing disabled in config).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn emit(&self, _trace: &DecisionTrace) -> Result<()> {
        Ok(())
    }
}

/// Read back every trace in a JSONL file.
pub fn read_traces(path: &Path) -> Result<Vec<DecisionTrace>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read trace log {}", path.display()))?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("parse trace {} line {}", path.display(), idx + 1))
        })
        .collect()
}
