//! Engine configuration stored under `<state_dir>/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::evaluate::AvailableResources;
use crate::core::mental_health::MonitorSettings;
use crate::core::types::MaturityLevel;
use crate::core::utility::{QualityBaselines, WeightVector};

/// Engine configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to the
/// values a fresh infant-level engine runs with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Maturity level for a fresh engine with no persisted state.
    pub initial_level: MaturityLevel,

    /// Intervention cooldown and rolling history capacities.
    pub mental_health: MonitorSettings,

    /// Fixed sub-scores used by the quality heuristics.
    pub quality: QualityBaselines,

    pub policy: PolicyConfig,

    /// Static figures served by the resource inventory.
    pub resources: AvailableResources,

    pub trace: TraceConfig,

    /// Weights resolved by the personality matrix, averaged into scoring.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality_matrix: Option<WeightVector>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Deny plans whose risk estimate exceeds this value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_risk: Option<f64>,

    /// Deny plans carrying any of these policy tags or tool references.
    pub denied_tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TraceConfig {
    /// Append decision traces to `<state_dir>/traces.jsonl`.
    pub enabled: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_level: MaturityLevel::Infant,
            mental_health: MonitorSettings::default(),
            quality: QualityBaselines::default(),
            policy: PolicyConfig::default(),
            resources: AvailableResources::default(),
            trace: TraceConfig::default(),
            personality_matrix: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        let mh = &self.mental_health;
        if mh.intervention_cooldown_secs < 0 {
            return Err(anyhow!("mental_health.intervention_cooldown_secs must be >= 0"));
        }
        if mh.decision_history == 0 || mh.thought_patterns == 0 || mh.emotional_events == 0 {
            return Err(anyhow!("mental_health history capacities must be > 0"));
        }
        self.quality.validate().map_err(|err| anyhow!(err))?;
        if let Some(max_risk) = self.policy.max_risk {
            if !(0.0..=1.0).contains(&max_risk) {
                return Err(anyhow!("policy.max_risk must be within [0, 1]"));
            }
        }
        if self.policy.denied_tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(anyhow!("policy.denied_tags must not contain empty entries"));
        }
        let res = &self.resources;
        if res.compute_capacity < 0.0 || res.memory_capacity < 0.0 || res.time_budget_secs < 0.0 {
            return Err(anyhow!("resources figures must be >= 0"));
        }
        if let Some(weights) = &self.personality_matrix {
            let values = [
                weights.goal,
                weights.quality,
                weights.risk,
                weights.spend,
                weights.novelty,
                weights.rigor,
                weights.safety,
            ];
            if values.iter().any(|value| !(0.0..=1.0).contains(value)) {
                return Err(anyhow!("personality_matrix weights must be within [0, 1]"));
            }
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EngineConfig::default()`.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        let cfg = EngineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EngineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EngineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    super::write_atomic(path, &buf, "toml.tmp")
}
