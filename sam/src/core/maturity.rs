//! Maturity levels, experience accrual and the forward-only progression machine.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::core::mental_health::{Intervention, MentalHealthMetrics, MentalHealthMonitor};
use crate::core::types::{DecisionSummary, MaturityLevel, MentalHealthStatus};

/// Decisions inspected by the track-record readiness check.
pub const READINESS_WINDOW: usize = 50;
/// Decisions in the window that must exceed [`READINESS_SUCCESS_RATE`].
pub const READINESS_MIN_SUCCESSES: usize = 30;
pub const READINESS_SUCCESS_RATE: f64 = 0.8;
const EXPERIENCE_PER_MONTH: u64 = 100;
const LEARNING_EVENT_HISTORY: usize = 200;
const COMPLEX_TASK_THRESHOLD: f64 = 0.7;
const SUPERVISION_BOOST: f64 = 0.2;
const BURNOUT_INTERVENTION: f64 = 0.8;

/// Fixed configuration for one maturity level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelConfig {
    pub level: MaturityLevel,
    pub min_age_months: u32,
    pub confidence_threshold: f64,
    pub supervision_level: f64,
    pub risk_tolerance: f64,
    pub exploration_rate: f64,
    pub learning_rate: f64,
    pub max_complexity: f64,
    pub max_urgency: f64,
    pub requires_approval: bool,
    pub fallback_plans: usize,
    pub recursive_loop_threshold: u32,
    pub addictive_behavior_threshold: f64,
}

const LEVEL_CONFIGS: [LevelConfig; 4] = [
    LevelConfig {
        level: MaturityLevel::Infant,
        min_age_months: 0,
        confidence_threshold: 0.9,
        supervision_level: 0.95,
        risk_tolerance: 0.1,
        exploration_rate: 0.1,
        learning_rate: 0.8,
        max_complexity: 0.3,
        max_urgency: 0.5,
        requires_approval: true,
        fallback_plans: 3,
        recursive_loop_threshold: 2,
        addictive_behavior_threshold: 0.3,
    },
    LevelConfig {
        level: MaturityLevel::Child,
        min_age_months: 6,
        confidence_threshold: 0.8,
        supervision_level: 0.7,
        risk_tolerance: 0.3,
        exploration_rate: 0.3,
        learning_rate: 0.7,
        max_complexity: 0.6,
        max_urgency: 0.7,
        requires_approval: true,
        fallback_plans: 2,
        recursive_loop_threshold: 3,
        addictive_behavior_threshold: 0.4,
    },
    LevelConfig {
        level: MaturityLevel::Adolescent,
        min_age_months: 18,
        confidence_threshold: 0.7,
        supervision_level: 0.4,
        risk_tolerance: 0.5,
        exploration_rate: 0.5,
        learning_rate: 0.6,
        max_complexity: 0.8,
        max_urgency: 0.8,
        requires_approval: false,
        fallback_plans: 1,
        recursive_loop_threshold: 4,
        addictive_behavior_threshold: 0.5,
    },
    LevelConfig {
        level: MaturityLevel::Adult,
        min_age_months: 36,
        confidence_threshold: 0.6,
        supervision_level: 0.1,
        risk_tolerance: 0.7,
        exploration_rate: 0.7,
        learning_rate: 0.5,
        max_complexity: 1.0,
        max_urgency: 1.0,
        requires_approval: false,
        fallback_plans: 1,
        recursive_loop_threshold: 5,
        addictive_behavior_threshold: 0.6,
    },
];

pub fn level_config(level: MaturityLevel) -> &'static LevelConfig {
    match level {
        MaturityLevel::Infant => &LEVEL_CONFIGS[0],
        MaturityLevel::Child => &LEVEL_CONFIGS[1],
        MaturityLevel::Adolescent => &LEVEL_CONFIGS[2],
        MaturityLevel::Adult => &LEVEL_CONFIGS[3],
    }
}

/// Current stage plus the operating parameters taken from its table row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaturityProfile {
    pub level: MaturityLevel,
    pub age_months: u32,
    pub experience_points: u64,
    pub confidence_threshold: f64,
    pub supervision_level: f64,
    pub risk_tolerance: f64,
    pub exploration_rate: f64,
    pub learning_rate: f64,
}

impl MaturityProfile {
    /// Profile for a fresh engine at `level`, aged to the level's minimum.
    pub fn at_level(level: MaturityLevel) -> Self {
        let config = level_config(level);
        let mut profile = Self {
            level,
            age_months: config.min_age_months,
            experience_points: 0,
            confidence_threshold: 0.0,
            supervision_level: 0.0,
            risk_tolerance: 0.0,
            exploration_rate: 0.0,
            learning_rate: 0.0,
        };
        profile.adopt(config);
        profile
    }

    /// Restore the level-derived fields from the level table. Supervision
    /// raised by interventions is kept but never drops below the table value.
    pub fn resync(&mut self) {
        let supervision = self.supervision_level;
        self.adopt(level_config(self.level));
        if supervision.is_finite() {
            self.supervision_level = supervision.clamp(self.supervision_level, 1.0);
        }
    }

    fn adopt(&mut self, config: &LevelConfig) {
        self.level = config.level;
        self.confidence_threshold = config.confidence_threshold;
        self.supervision_level = config.supervision_level;
        self.risk_tolerance = config.risk_tolerance;
        self.exploration_rate = config.exploration_rate;
        self.learning_rate = config.learning_rate;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningEventKind {
    SuccessfulDecision,
    FailedDecision,
    ComplexTask,
    SafetyViolation,
    MentalHealthIntervention,
    BurnoutIntervention,
    RecursiveLoopDetected,
    AddictiveBehaviorDetected,
    MaturityProgression,
}

impl LearningEventKind {
    pub fn base_points(self) -> u64 {
        match self {
            LearningEventKind::SuccessfulDecision => 10,
            LearningEventKind::FailedDecision => 5,
            LearningEventKind::ComplexTask => 15,
            LearningEventKind::SafetyViolation => 2,
            LearningEventKind::MentalHealthIntervention => 3,
            LearningEventKind::BurnoutIntervention
            | LearningEventKind::RecursiveLoopDetected
            | LearningEventKind::AddictiveBehaviorDetected
            | LearningEventKind::MaturityProgression => 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<f64>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub detail: Map<String, Value>,
}

impl LearningOutcome {
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.detail.insert(key.to_string(), value.into());
        self
    }
}

/// Base points scaled by quality, then by `1 + complexity`, truncated at each
/// step and floored at 1.
pub fn experience_gain(kind: LearningEventKind, outcome: &LearningOutcome) -> u64 {
    let mut points = kind.base_points() as f64;
    if let Some(quality) = outcome.quality {
        points = (points * quality).trunc();
    }
    if let Some(complexity) = outcome.complexity {
        points = (points * (1.0 + complexity)).trunc();
    }
    if points < 1.0 { 1 } else { points as u64 }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEvent {
    pub kind: LearningEventKind,
    pub outcome: LearningOutcome,
    pub level: MaturityLevel,
    pub points: u64,
    pub at: DateTime<Utc>,
}

/// Individual readiness conditions for the next level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    pub next_level: MaturityLevel,
    pub age: bool,
    pub experience: bool,
    pub stable_status: bool,
    pub low_strain: bool,
    pub track_record: bool,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.age && self.experience && self.stable_status && self.low_strain && self.track_record
    }
}

/// Evaluate every progression condition against `next_level`.
pub fn assess_readiness<'a>(
    profile: &MaturityProfile,
    mental_health: &MentalHealthMetrics,
    decisions: impl IntoIterator<Item = &'a DecisionSummary>,
    next_level: MaturityLevel,
) -> Readiness {
    let min_age = level_config(next_level).min_age_months;
    let decisions: Vec<&DecisionSummary> = decisions.into_iter().collect();
    let successes = decisions
        .iter()
        .skip(decisions.len().saturating_sub(READINESS_WINDOW))
        .filter(|decision| decision.success_rate > READINESS_SUCCESS_RATE)
        .count();
    Readiness {
        next_level,
        age: profile.age_months >= min_age,
        experience: profile.experience_points >= u64::from(min_age) * EXPERIENCE_PER_MONTH,
        stable_status: mental_health.status() == MentalHealthStatus::Stable,
        low_strain: mental_health.stress_level <= 0.7 && mental_health.burnout_risk <= 0.5,
        track_record: successes >= READINESS_MIN_SUCCESSES,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaturitySummary {
    pub level: MaturityLevel,
    pub age_months: u32,
    pub experience_points: u64,
    pub confidence_threshold: f64,
    pub supervision_level: f64,
    pub risk_tolerance: f64,
    pub exploration_rate: f64,
    pub learning_rate: f64,
    pub mental_health_status: MentalHealthStatus,
    pub stress_level: f64,
    pub burnout_risk: f64,
    pub total_decisions: u64,
    pub total_learning_events: u64,
    pub readiness: Option<Readiness>,
}

/// Owner of the maturity profile.
///
/// Holds a copy of the latest mental-health metrics for readiness checks; the
/// metrics themselves are only changed through [`MentalHealthMonitor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaturityTracker {
    profile: MaturityProfile,
    #[serde(default)]
    mental_health: MentalHealthMetrics,
    #[serde(default)]
    recent_decisions: VecDeque<DecisionSummary>,
    #[serde(default)]
    learning_events: VecDeque<LearningEvent>,
    #[serde(default)]
    total_decisions: u64,
    #[serde(default)]
    total_learning_events: u64,
}

impl MaturityTracker {
    pub fn new(level: MaturityLevel) -> Self {
        Self::from_profile(MaturityProfile::at_level(level))
    }

    pub fn from_profile(profile: MaturityProfile) -> Self {
        Self {
            profile,
            mental_health: MentalHealthMetrics::default(),
            recent_decisions: VecDeque::new(),
            learning_events: VecDeque::new(),
            total_decisions: 0,
            total_learning_events: 0,
        }
    }

    pub fn profile(&self) -> &MaturityProfile {
        &self.profile
    }

    /// Re-derive level-bound profile fields after loading saved state.
    /// Returns true when the saved values had drifted from the level table.
    pub fn resync_profile(&mut self) -> bool {
        let saved = self.profile;
        self.profile.resync();
        let drifted = self.profile != saved;
        if drifted {
            warn!(level = %self.profile.level, "saved maturity profile differs from level table; restored");
        }
        drifted
    }

    pub fn level(&self) -> MaturityLevel {
        self.profile.level
    }

    pub fn config(&self) -> &'static LevelConfig {
        level_config(self.profile.level)
    }

    pub fn can_handle_complexity(&self, complexity: f64) -> bool {
        complexity <= self.config().max_complexity
    }

    pub fn can_handle_urgency(&self, urgency: f64) -> bool {
        urgency <= self.config().max_urgency
    }

    pub fn requires_approval(&self) -> bool {
        self.config().requires_approval
    }

    pub fn fallback_plan_count(&self) -> usize {
        self.config().fallback_plans
    }

    pub fn learning_events(&self) -> impl Iterator<Item = &LearningEvent> {
        self.learning_events.iter()
    }

    /// Record a completed decision with its experience events.
    ///
    /// Returns the new level when the decision triggered a progression.
    pub fn record_decision(&mut self, decision: &DecisionSummary) -> Option<MaturityLevel> {
        self.recent_decisions.push_back(decision.clone());
        while self.recent_decisions.len() > READINESS_WINDOW {
            self.recent_decisions.pop_front();
        }
        self.total_decisions += 1;

        let before = self.profile.level;
        let outcome = LearningOutcome::default()
            .with_quality(decision.success_rate)
            .with_complexity(decision.complexity);
        if decision.succeeded() {
            self.record_learning_event(LearningEventKind::SuccessfulDecision, outcome.clone());
        } else {
            self.record_learning_event(
                LearningEventKind::FailedDecision,
                LearningOutcome::default().with_complexity(decision.complexity),
            );
        }
        if decision.complexity > COMPLEX_TASK_THRESHOLD {
            self.record_learning_event(LearningEventKind::ComplexTask, outcome);
        }
        (self.profile.level != before).then_some(self.profile.level)
    }

    /// Award experience for an event and reassess progression.
    pub fn record_learning_event(
        &mut self,
        kind: LearningEventKind,
        outcome: LearningOutcome,
    ) -> u64 {
        let points = self.log_event(kind, outcome);
        self.assess_progression();
        points
    }

    fn log_event(&mut self, kind: LearningEventKind, outcome: LearningOutcome) -> u64 {
        let points = experience_gain(kind, &outcome);
        self.profile.experience_points += points;
        self.learning_events.push_back(LearningEvent {
            kind,
            outcome,
            level: self.profile.level,
            points,
            at: Utc::now(),
        });
        while self.learning_events.len() > LEARNING_EVENT_HISTORY {
            self.learning_events.pop_front();
        }
        self.total_learning_events += 1;
        info!(?kind, points, total = self.profile.experience_points, "experience gained");
        points
    }

    pub fn readiness(&self) -> Option<Readiness> {
        let next = self.profile.level.next()?;
        Some(assess_readiness(
            &self.profile,
            &self.mental_health,
            &self.recent_decisions,
            next,
        ))
    }

    pub fn is_ready_for_next_level(&self) -> bool {
        self.readiness().is_some_and(|readiness| readiness.is_ready())
    }

    /// Advance at most one level when every readiness condition holds.
    fn assess_progression(&mut self) -> Option<MaturityLevel> {
        let readiness = self.readiness()?;
        if !readiness.is_ready() {
            return None;
        }
        self.progress_to(readiness.next_level);
        Some(readiness.next_level)
    }

    fn progress_to(&mut self, level: MaturityLevel) {
        let from = self.profile.level;
        self.profile.adopt(level_config(level));
        info!(%from, to = %level, "maturity progression");
        let outcome = LearningOutcome::default()
            .with_detail("from_level", from.as_str())
            .with_detail("to_level", level.as_str())
            .with_detail("age_months", self.profile.age_months)
            .with_detail("experience_points", self.profile.experience_points);
        self.log_event(LearningEventKind::MaturityProgression, outcome);
    }

    /// Operator override: jump forward to `level` regardless of readiness.
    pub fn force_progression(&mut self, level: MaturityLevel) -> Result<(), String> {
        if level <= self.profile.level {
            return Err(format!(
                "cannot move from {} to {level}: maturity only moves forward",
                self.profile.level
            ));
        }
        self.progress_to(level);
        Ok(())
    }

    pub fn advance_age(&mut self, months: u32) -> Option<MaturityLevel> {
        self.profile.age_months = self.profile.age_months.saturating_add(months);
        self.assess_progression()
    }

    /// Take the monitor's latest metrics and run level-specific interventions.
    pub fn update_mental_health(
        &mut self,
        monitor: &mut MentalHealthMonitor,
        now: DateTime<Utc>,
    ) -> Vec<Intervention> {
        let config = self.config();
        let metrics = *monitor.metrics();
        let mut applied = Vec::new();

        if metrics.recursive_loop_count >= config.recursive_loop_threshold {
            warn!(
                count = metrics.recursive_loop_count,
                threshold = config.recursive_loop_threshold,
                "recursive loop threshold exceeded"
            );
            monitor.apply_intervention(Intervention::RecursiveLoopReset, now);
            self.profile.supervision_level =
                (self.profile.supervision_level + SUPERVISION_BOOST).min(1.0);
            applied.push(Intervention::RecursiveLoopReset);
        }
        if metrics.addictive_behavior_score >= config.addictive_behavior_threshold {
            warn!(
                score = metrics.addictive_behavior_score,
                threshold = config.addictive_behavior_threshold,
                "addictive behavior threshold exceeded"
            );
            monitor.apply_intervention(Intervention::AddictiveBehaviorReset, now);
            applied.push(Intervention::AddictiveBehaviorReset);
        }
        if metrics.burnout_risk > BURNOUT_INTERVENTION {
            warn!(burnout = metrics.burnout_risk, "high burnout risk");
            monitor.apply_intervention(Intervention::BurnoutRelief, now);
            applied.push(Intervention::BurnoutRelief);
        }

        self.mental_health = *monitor.metrics();
        for intervention in &applied {
            let (kind, detail) = match intervention {
                Intervention::RecursiveLoopReset => (
                    LearningEventKind::RecursiveLoopDetected,
                    Value::from(self.profile.supervision_level),
                ),
                Intervention::AddictiveBehaviorReset => (
                    LearningEventKind::AddictiveBehaviorDetected,
                    Value::from(self.mental_health.impulse_control_score),
                ),
                Intervention::BurnoutRelief => (
                    LearningEventKind::BurnoutIntervention,
                    Value::from(self.mental_health.burnout_risk),
                ),
            };
            let outcome = LearningOutcome::default()
                .with_detail("intervention", format!("{intervention:?}"))
                .with_detail("value", detail);
            self.record_learning_event(kind, outcome);
        }
        applied
    }

    pub fn summary(&self) -> MaturitySummary {
        MaturitySummary {
            level: self.profile.level,
            age_months: self.profile.age_months,
            experience_points: self.profile.experience_points,
            confidence_threshold: self.profile.confidence_threshold,
            supervision_level: self.profile.supervision_level,
            risk_tolerance: self.profile.risk_tolerance,
            exploration_rate: self.profile.exploration_rate,
            learning_rate: self.profile.learning_rate,
            mental_health_status: self.mental_health.status(),
            stress_level: self.mental_health.stress_level,
            burnout_risk: self.mental_health.burnout_risk,
            total_decisions: self.total_decisions,
            total_learning_events: self.total_learning_events,
            readiness: self.readiness(),
        }
    }
}
