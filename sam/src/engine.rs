//! The decision engine facade.
//!
//! Gates each request against the maturity envelope and the mental-health
//! intervention check, runs the orientation cycle, converts cycle failures into
//! the fixed fallback response and persists state after every mutation.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, instrument, warn};

use crate::core::maturity::{MaturitySummary, MaturityTracker};
use crate::core::mental_health::{
    EmotionalEventKind, Intervention, MentalHealthMonitor, MentalHealthSummary, ThoughtPattern,
};
use crate::core::performance::PerformanceMetrics;
use crate::core::request::{DecisionRequest, DecisionResponse};
use crate::core::types::{MaturityLevel, MentalHealthStatus, ResponseKind};
use crate::core::utility::UtilityEngine;
use crate::io::config::{EngineConfig, load_config};
use crate::io::personality::{FixedMatrix, PersonalityMatrix};
use crate::io::policy::{PolicyCheck, RulePolicy};
use crate::io::resources::{ResourceInventory, StaticInventory};
use crate::io::state_store::{EngineSnapshot, JsonStateStore, StateStore};
use crate::io::trace_sink::{JsonlTraceSink, NullTraceSink, TraceSink};
use crate::orientation::{Collaborators, Orientation};

pub const CONFIG_FILE: &str = "config.toml";

/// Confidence of the fixed response returned when a cycle fails.
pub const CYCLE_FAILURE_CONFIDENCE: f64 = 0.1;
/// Recursive-loop count at which requests are refused outright.
const RECURSIVE_LOOP_LIMIT: u32 = 3;

const CONSTRAINT_RECOMMENDATIONS: [&str; 3] = [
    "Reduce complexity or urgency",
    "Wait for mental health to stabilize",
    "Request human assistance",
];
const CYCLE_FAILURE_RECOMMENDATIONS: [&str; 2] =
    ["Use simpler approach", "Request human assistance"];
/// Refused requests never run Learn, so metrics cannot settle on their own.
pub const RESET_TO_RESUME: &str =
    "Reset mental health metrics to resume; refused requests do not lower them";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineInfo {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: f64,
    /// Cycles completed by this process.
    pub cycles: u64,
}

/// Envelope the current maturity level imposes on requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConstraints {
    pub max_complexity: f64,
    pub max_urgency: f64,
    pub confidence_threshold: f64,
    pub risk_tolerance: f64,
    pub supervision_level: f64,
    pub requires_approval: bool,
    pub fallback_plans: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub engine: EngineInfo,
    pub maturity: MaturitySummary,
    pub mental_health: MentalHealthSummary,
    pub performance: PerformanceMetrics,
    pub current_constraints: CurrentConstraints,
}

pub struct DecisionEngine {
    config: EngineConfig,
    orientation: Orientation,
    maturity: MaturityTracker,
    monitor: MentalHealthMonitor,
    performance: PerformanceMetrics,
    inventory: Box<dyn ResourceInventory>,
    policy: Box<dyn PolicyCheck>,
    traces: Box<dyn TraceSink>,
    personality_matrix: Option<Box<dyn PersonalityMatrix>>,
    store: Box<dyn StateStore>,
    started_at: DateTime<Utc>,
}

impl DecisionEngine {
    /// Build an engine from `config`, resuming whatever `store` holds.
    ///
    /// Traces are discarded until a sink is attached with
    /// [`DecisionEngine::with_trace_sink`].
    pub fn new(config: EngineConfig, store: Box<dyn StateStore>) -> Result<Self> {
        config.validate()?;
        let (maturity, mut monitor, performance) = match store.load().context("load engine state")? {
            Some(snapshot) => {
                info!(
                    level = %snapshot.maturity.level(),
                    status = %snapshot.mental_health.status(),
                    "resuming saved state"
                );
                let mut maturity = snapshot.maturity;
                maturity.resync_profile();
                (maturity, snapshot.mental_health, snapshot.performance)
            }
            None => {
                info!(level = %config.initial_level, "starting fresh state");
                (
                    MaturityTracker::new(config.initial_level),
                    MentalHealthMonitor::new(config.mental_health, None),
                    PerformanceMetrics::default(),
                )
            }
        };
        monitor.apply_settings(config.mental_health);

        let personality_matrix = config
            .personality_matrix
            .map(|weights| Box::new(FixedMatrix::new(weights)) as Box<dyn PersonalityMatrix>);
        Ok(Self {
            orientation: Orientation::new(UtilityEngine::new(config.quality)),
            maturity,
            monitor,
            performance,
            inventory: Box::new(StaticInventory::new(config.resources)),
            policy: Box::new(RulePolicy::from_config(&config.policy)),
            traces: Box::new(NullTraceSink),
            personality_matrix,
            store,
            started_at: Utc::now(),
            config,
        })
    }

    /// Open the engine stored under `state_dir` (config, state and traces).
    ///
    /// `initial_level` only applies when no state has been saved yet.
    pub fn open(state_dir: &Path, initial_level: Option<MaturityLevel>) -> Result<Self> {
        let mut config = load_config(&state_dir.join(CONFIG_FILE))?;
        if let Some(level) = initial_level {
            config.initial_level = level;
        }
        let trace_enabled = config.trace.enabled;
        let engine = Self::new(config, Box::new(JsonStateStore::in_dir(state_dir)))?;
        Ok(if trace_enabled {
            engine.with_trace_sink(Box::new(JsonlTraceSink::in_dir(state_dir)))
        } else {
            engine
        })
    }

    pub fn with_policy(mut self, policy: Box<dyn PolicyCheck>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_trace_sink(mut self, traces: Box<dyn TraceSink>) -> Self {
        self.traces = traces;
        self
    }

    pub fn with_inventory(mut self, inventory: Box<dyn ResourceInventory>) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn with_personality_matrix(mut self, matrix: Option<Box<dyn PersonalityMatrix>>) -> Self {
        self.personality_matrix = matrix;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn maturity(&self) -> &MaturityTracker {
        &self.maturity
    }

    pub fn mental_health(&self) -> &MentalHealthMonitor {
        &self.monitor
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance
    }

    /// Decide on `request`. Always returns a well-formed response.
    #[instrument(skip_all, fields(urgency = request.urgency, complexity = request.complexity))]
    pub fn decide(&mut self, mut request: DecisionRequest) -> DecisionResponse {
        let start = Instant::now();
        self.performance.record_request();
        if request.personality.is_none() {
            request.personality = self.monitor.personality().cloned();
        }
        let response = self.gate_and_run(&request, start);
        self.persist();
        response
    }

    fn gate_and_run(&mut self, request: &DecisionRequest, start: Instant) -> DecisionResponse {
        if let Err(reason) = request.validate() {
            warn!(reason = %reason, "invalid request");
            return self.refusal(
                ResponseKind::ConstraintViolation,
                0.0,
                vec![format!("Invalid request: {reason}")],
                to_strings(&CONSTRAINT_RECOMMENDATIONS),
            );
        }

        let violations = self.constraint_violations(request);
        if !violations.is_empty() {
            warn!(count = violations.len(), "request violates current constraints");
            return self.refusal(
                ResponseKind::ConstraintViolation,
                0.0,
                violations,
                to_strings(&CONSTRAINT_RECOMMENDATIONS),
            );
        }

        if self.monitor.should_intervene() {
            warn!(status = %self.monitor.status(), "mental health intervention required");
            let mut recommendations = self.monitor.intervention_recommendations();
            recommendations.push(RESET_TO_RESUME.to_string());
            return self.refusal(
                ResponseKind::InterventionRequired,
                0.0,
                vec!["Mental health intervention required".to_string()],
                recommendations,
            );
        }

        let collaborators = Collaborators {
            inventory: self.inventory.as_ref(),
            policy: self.policy.as_ref(),
            traces: self.traces.as_ref(),
            personality_matrix: self.personality_matrix.as_deref(),
        };
        match self.orientation.run_cycle(
            request,
            &mut self.maturity,
            &mut self.monitor,
            &collaborators,
        ) {
            Ok(outcome) => {
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                self.performance
                    .record_success(outcome.response.confidence, elapsed_ms);
                if let Some(level) = outcome.progressed {
                    info!(level = %level, "maturity level advanced");
                }
                for intervention in &outcome.interventions {
                    info!(?intervention, "intervention applied after decision");
                }
                outcome.response
            }
            Err(err) => {
                error!(err = %format!("{err:#}"), "decision cycle failed");
                self.performance.record_failure();
                self.refusal(
                    ResponseKind::CycleFailed,
                    CYCLE_FAILURE_CONFIDENCE,
                    vec![format!("Decision cycle failed: {err:#}")],
                    to_strings(&CYCLE_FAILURE_RECOMMENDATIONS),
                )
            }
        }
    }

    /// Reasons the request falls outside what the engine may currently handle.
    pub fn constraint_violations(&self, request: &DecisionRequest) -> Vec<String> {
        let level = self.maturity.level();
        let metrics = self.monitor.metrics();
        let mut reasons = Vec::new();
        if !self.maturity.can_handle_complexity(request.complexity) {
            reasons.push(format!(
                "Complexity {:.2} exceeds maturity level {level}",
                request.complexity
            ));
        }
        if !self.maturity.can_handle_urgency(request.urgency) {
            reasons.push(format!(
                "Urgency {:.2} exceeds maturity level {level}",
                request.urgency
            ));
        }
        if metrics.status() == MentalHealthStatus::Overwhelmed {
            reasons.push("Mental health status is overwhelmed".to_string());
        }
        if metrics.recursive_loop_count >= RECURSIVE_LOOP_LIMIT {
            reasons.push("Too many recursive loops detected".to_string());
        }
        reasons
    }

    fn refusal(
        &self,
        kind: ResponseKind,
        confidence: f64,
        warnings: Vec<String>,
        recommendations: Vec<String>,
    ) -> DecisionResponse {
        DecisionResponse::refusal(
            kind,
            confidence,
            self.monitor.status(),
            self.maturity.level(),
            warnings,
            recommendations,
        )
    }

    pub fn status(&self) -> EngineStatus {
        let profile = self.maturity.profile();
        let config = self.maturity.config();
        EngineStatus {
            engine: EngineInfo {
                started_at: self.started_at,
                uptime_secs: (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0,
                cycles: self.orientation.cycles(),
            },
            maturity: self.maturity.summary(),
            mental_health: self.monitor.summary(),
            performance: self.performance,
            current_constraints: CurrentConstraints {
                max_complexity: config.max_complexity,
                max_urgency: config.max_urgency,
                confidence_threshold: profile.confidence_threshold,
                risk_tolerance: profile.risk_tolerance,
                supervision_level: profile.supervision_level,
                requires_approval: config.requires_approval,
                fallback_plans: config.fallback_plans,
            },
        }
    }

    pub fn record_thought_pattern(&mut self, pattern: ThoughtPattern) {
        self.monitor.update_from_thought_pattern(pattern);
        self.persist();
    }

    pub fn record_emotional_event(
        &mut self,
        kind: EmotionalEventKind,
        intensity: f64,
        context: Map<String, Value>,
    ) {
        self.monitor.record_emotional_event(kind, intensity, context);
        self.persist();
    }

    pub fn reset_mental_health(&mut self) {
        self.monitor.reset(Utc::now());
        self.persist();
    }

    /// Operator override; maturity only moves forward.
    pub fn force_progression(&mut self, level: MaturityLevel) -> Result<()> {
        self.maturity
            .force_progression(level)
            .map_err(|err| anyhow!(err))?;
        info!(level = %level, "forced maturity progression");
        self.persist();
        Ok(())
    }

    /// Age the profile; returns the new level if that unlocked a progression.
    pub fn advance_age(&mut self, months: u32) -> Option<MaturityLevel> {
        let progressed = self.maturity.advance_age(months);
        self.persist();
        progressed
    }

    pub fn intervention_recommendations(&self) -> Vec<String> {
        self.monitor.intervention_recommendations()
    }

    pub fn should_intervene(&self) -> bool {
        self.monitor.should_intervene()
    }

    /// Run the maturity tracker's intervention check against current metrics.
    pub fn reconcile_mental_health(&mut self) -> Vec<Intervention> {
        let applied = self
            .maturity
            .update_mental_health(&mut self.monitor, Utc::now());
        self.persist();
        applied
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            maturity: self.maturity.clone(),
            mental_health: self.monitor.clone(),
            performance: self.performance,
            saved_at: Utc::now(),
        }
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(&self.snapshot()) {
            error!(err = %format!("{err:#}"), "failed to save engine state");
        }
    }

    /// Final save. Unlike routine saves, a failure here is returned.
    pub fn shutdown(self) -> Result<()> {
        self.store
            .save(&self.snapshot())
            .context("save engine state on shutdown")?;
        info!(
            decisions = self.performance.successful_decisions,
            level = %self.maturity.level(),
            status = %self.monitor.status(),
            "decision engine shut down"
        );
        Ok(())
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}
