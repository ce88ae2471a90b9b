//! Mental-health metrics, status derivation and the pattern-detecting monitor.
//!
//! Status is never stored: [`MentalHealthMetrics::status`] derives it from the
//! numeric fields through [`STATUS_RULES`], so no caller can set it directly.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::core::request::PersonalityProfile;
use crate::core::types::{DecisionSummary, MentalHealthStatus, clamp01};

/// Numeric metric a threshold rule reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Stress,
    Excitement,
    Stability,
    Burnout,
    RecursiveLoops,
    Addictive,
}

/// Comparison a threshold rule applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Above(f64),
    AtLeast(f64),
    Below(f64),
}

impl Bound {
    fn holds(self, value: f64) -> bool {
        match self {
            Bound::Above(limit) => value > limit,
            Bound::AtLeast(limit) => value >= limit,
            Bound::Below(limit) => value < limit,
        }
    }
}

/// Status derivation in priority order. First match wins; otherwise `stable`.
pub const STATUS_RULES: [(Metric, Bound, MentalHealthStatus); 5] = [
    (Metric::Stress, Bound::Above(0.7), MentalHealthStatus::Stressed),
    (Metric::Excitement, Bound::Above(0.8), MentalHealthStatus::Excited),
    (
        Metric::RecursiveLoops,
        Bound::AtLeast(3.0),
        MentalHealthStatus::Recursive,
    ),
    (
        Metric::Addictive,
        Bound::AtLeast(0.6),
        MentalHealthStatus::Addictive,
    ),
    (
        Metric::Burnout,
        Bound::AtLeast(0.8),
        MentalHealthStatus::Overwhelmed,
    ),
];

/// Hard thresholds for `should_intervene`. Any single match suffices.
pub const INTERVENTION_RULES: [(Metric, Bound); 6] = [
    (Metric::Stress, Bound::Above(0.8)),
    (Metric::Excitement, Bound::Above(0.9)),
    (Metric::RecursiveLoops, Bound::AtLeast(3.0)),
    (Metric::Addictive, Bound::Above(0.7)),
    (Metric::Burnout, Bound::Above(0.8)),
    (Metric::Stability, Bound::Below(0.3)),
];

const DECAY_RATE: f64 = 0.05;
const VOLATILITY_LIMIT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MentalHealthMetrics {
    pub stress_level: f64,
    pub excitement_level: f64,
    pub emotional_stability: f64,
    pub burnout_risk: f64,
    pub recursive_loop_count: u32,
    pub addictive_behavior_score: f64,
    pub impulse_control_score: f64,
}

impl Default for MentalHealthMetrics {
    fn default() -> Self {
        Self {
            stress_level: 0.0,
            excitement_level: 0.0,
            emotional_stability: 1.0,
            burnout_risk: 0.0,
            recursive_loop_count: 0,
            addictive_behavior_score: 0.0,
            impulse_control_score: 1.0,
        }
    }
}

impl MentalHealthMetrics {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Stress => self.stress_level,
            Metric::Excitement => self.excitement_level,
            Metric::Stability => self.emotional_stability,
            Metric::Burnout => self.burnout_risk,
            Metric::RecursiveLoops => f64::from(self.recursive_loop_count),
            Metric::Addictive => self.addictive_behavior_score,
        }
    }

    pub fn status(&self) -> MentalHealthStatus {
        STATUS_RULES
            .iter()
            .find(|(metric, bound, _)| bound.holds(self.value(*metric)))
            .map_or(MentalHealthStatus::Stable, |(_, _, status)| *status)
    }

    /// True when any hard intervention threshold is crossed.
    pub fn crosses_intervention_threshold(&self) -> bool {
        INTERVENTION_RULES
            .iter()
            .any(|(metric, bound)| bound.holds(self.value(*metric)))
    }

    pub fn snapshot(&self) -> MentalHealthSnapshot {
        MentalHealthSnapshot {
            status: self.status(),
            metrics: *self,
        }
    }
}

/// Metrics together with their derived status, as recorded in traces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MentalHealthSnapshot {
    pub status: MentalHealthStatus,
    pub metrics: MentalHealthMetrics,
}

/// Recommendations surfaced for a non-stable status.
pub fn recommendations_for(status: MentalHealthStatus) -> &'static [&'static str] {
    match status {
        MentalHealthStatus::Stable => &[],
        MentalHealthStatus::Stressed => &[
            "Reduce task complexity",
            "Increase planning time",
            "Take breaks between decisions",
            "Use simpler decision strategies",
        ],
        MentalHealthStatus::Excited => &[
            "Implement cooling-off periods",
            "Add validation steps",
            "Review decisions before execution",
            "Reduce novelty-seeking behavior",
        ],
        MentalHealthStatus::Recursive => &[
            "Break circular thought patterns",
            "Introduce external constraints",
            "Use different problem-solving approaches",
            "Implement thought termination techniques",
        ],
        MentalHealthStatus::Addictive => &[
            "Reduce validation-seeking behavior",
            "Focus on intrinsic motivation",
            "Implement delayed gratification",
            "Diversify goal types",
        ],
        MentalHealthStatus::Overwhelmed => &[
            "Reduce workload",
            "Implement stress management techniques",
            "Increase supervision and support",
            "Focus on simpler tasks",
        ],
    }
}

/// An observed reasoning pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtPattern {
    #[serde(rename = "type")]
    pub pattern_type: String,
    #[serde(default)]
    pub repetition_count: u32,
    #[serde(default)]
    pub similarity_score: f64,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl ThoughtPattern {
    pub fn new(pattern_type: impl Into<String>, repetition_count: u32, similarity_score: f64) -> Self {
        Self {
            pattern_type: pattern_type.into(),
            repetition_count,
            similarity_score,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_io(mut self, inputs: &[&str], outputs: &[&str]) -> Self {
        self.inputs = inputs.iter().map(ToString::to_string).collect();
        self.outputs = outputs.iter().map(ToString::to_string).collect();
        self
    }

    /// Each pattern consumes something the other produces.
    fn is_circular_with(&self, other: &ThoughtPattern) -> bool {
        let feeds = |from: &ThoughtPattern, to: &ThoughtPattern| {
            from.outputs.iter().any(|output| to.inputs.contains(output))
        };
        feeds(self, other) && feeds(other, self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionalEventKind {
    Success,
    Failure,
    Surprise,
    Validation,
    Rejection,
    #[serde(other)]
    Other,
}

impl EmotionalEventKind {
    /// Emotional-stability change per unit of intensity.
    fn stability_delta(self) -> f64 {
        match self {
            EmotionalEventKind::Success => 0.02,
            EmotionalEventKind::Failure => -0.03,
            EmotionalEventKind::Surprise => -0.01,
            EmotionalEventKind::Validation => 0.01,
            EmotionalEventKind::Rejection => -0.02,
            EmotionalEventKind::Other => 0.0,
        }
    }
}

impl std::str::FromStr for EmotionalEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            "surprise" => Ok(Self::Surprise),
            "validation" => Ok(Self::Validation),
            "rejection" => Ok(Self::Rejection),
            other => Err(format!(
                "unknown emotional event '{other}' (expected success, failure, surprise, validation, rejection)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalEvent {
    pub kind: EmotionalEventKind,
    pub intensity: f64,
    #[serde(default)]
    pub context: Map<String, Value>,
    pub at: DateTime<Utc>,
}

/// Corrective action applied to the metrics by the maturity tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intervention {
    /// Clears the recursive-loop counter.
    RecursiveLoopReset,
    /// Clears the addictive-behavior score and restores some impulse control.
    AddictiveBehaviorReset,
    /// Relieves stress and burnout risk and steadies emotions.
    BurnoutRelief,
}

/// Capacities and cooldown for the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub intervention_cooldown_secs: i64,
    pub decision_history: usize,
    pub thought_patterns: usize,
    pub emotional_events: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            intervention_cooldown_secs: 1800,
            decision_history: 100,
            thought_patterns: 50,
            emotional_events: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentalHealthSummary {
    pub status: MentalHealthStatus,
    pub metrics: MentalHealthMetrics,
    pub decisions_recorded: usize,
    pub thought_patterns_recorded: usize,
    pub emotional_events_recorded: usize,
    pub last_intervention: Option<DateTime<Utc>>,
    pub should_intervene: bool,
    pub recommendations: Vec<String>,
}

/// Owner of the mental-health metrics and their rolling histories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentalHealthMonitor {
    metrics: MentalHealthMetrics,
    #[serde(default)]
    personality: Option<PersonalityProfile>,
    #[serde(default)]
    decisions: VecDeque<DecisionSummary>,
    #[serde(default)]
    thought_patterns: VecDeque<ThoughtPattern>,
    #[serde(default)]
    emotional_events: VecDeque<EmotionalEvent>,
    #[serde(default)]
    last_intervention: Option<DateTime<Utc>>,
    #[serde(default)]
    settings: MonitorSettings,
}

impl Default for MentalHealthMonitor {
    fn default() -> Self {
        Self::new(MonitorSettings::default(), None)
    }
}

impl MentalHealthMonitor {
    pub fn new(settings: MonitorSettings, personality: Option<PersonalityProfile>) -> Self {
        Self {
            metrics: MentalHealthMetrics::default(),
            personality,
            decisions: VecDeque::new(),
            thought_patterns: VecDeque::new(),
            emotional_events: VecDeque::new(),
            last_intervention: None,
            settings,
        }
    }

    pub fn metrics(&self) -> &MentalHealthMetrics {
        &self.metrics
    }

    pub fn status(&self) -> MentalHealthStatus {
        self.metrics.status()
    }

    pub fn snapshot(&self) -> MentalHealthSnapshot {
        self.metrics.snapshot()
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Replace capacities and cooldown, trimming histories to fit.
    pub fn apply_settings(&mut self, settings: MonitorSettings) {
        self.settings = settings;
        trim(&mut self.decisions, settings.decision_history);
        trim(&mut self.thought_patterns, settings.thought_patterns);
        trim(&mut self.emotional_events, settings.emotional_events);
    }

    pub fn personality(&self) -> Option<&PersonalityProfile> {
        self.personality.as_ref()
    }

    pub fn set_personality(&mut self, personality: Option<PersonalityProfile>) {
        self.personality = personality;
    }

    pub fn decisions(&self) -> impl Iterator<Item = &DecisionSummary> {
        self.decisions.iter()
    }

    pub fn update_from_decision(&mut self, decision: &DecisionSummary) {
        push_bounded(
            &mut self.decisions,
            decision.clone(),
            self.settings.decision_history,
        );

        self.apply_decision_impact(decision);
        self.decay();
        self.detect_addictive_behavior();
        self.detect_impulsivity();
        self.detect_burnout();

        debug!(status = %self.status(), "mental health updated from decision");
    }

    fn apply_decision_impact(&mut self, decision: &DecisionSummary) {
        let m = &mut self.metrics;
        let mut stress_increase =
            (0.3 * decision.complexity + 0.4 * decision.urgency) * (1.0 - decision.confidence);
        if !decision.succeeded() {
            stress_increase *= 1.5;
        }
        m.stress_level = clamp01(m.stress_level + stress_increase);

        if decision.succeeded() && decision.confidence > 0.8 {
            m.excitement_level = clamp01(m.excitement_level + 0.1 * decision.confidence);
        }
        if decision.complexity > 0.8 && decision.urgency > 0.8 {
            m.burnout_risk = clamp01(m.burnout_risk + 0.05);
        }
    }

    /// Natural settling; analytical personalities settle faster.
    fn decay(&mut self) {
        let rate = match &self.personality {
            Some(p) if p.analytical > 0.7 => DECAY_RATE * 1.2,
            Some(p) if p.analytical < 0.3 => DECAY_RATE * 0.8,
            _ => DECAY_RATE,
        };
        self.metrics.stress_level = clamp01(self.metrics.stress_level - rate);
        self.metrics.excitement_level = clamp01(self.metrics.excitement_level - rate);
    }

    fn detect_addictive_behavior(&mut self) {
        if self.decisions.len() < 10 {
            return;
        }
        let recent = recent(&self.decisions, 20);
        let seeking = recent.iter().filter(|d| d.seeking_approval).count();
        if seeking as f64 > recent.len() as f64 * 0.3 {
            self.metrics.addictive_behavior_score =
                clamp01(self.metrics.addictive_behavior_score + 0.1);
            warn!(seeking, window = recent.len(), "excessive validation seeking detected");
        }
    }

    fn detect_impulsivity(&mut self) {
        if self.decisions.len() < 5 {
            return;
        }
        let recent = recent(&self.decisions, 10);
        let impulsive = recent
            .iter()
            .filter(|d| d.planning_secs < 1.0 && d.complexity > 0.5)
            .count();
        if impulsive as f64 > recent.len() as f64 * 0.4 {
            self.metrics.impulse_control_score =
                clamp01(self.metrics.impulse_control_score - 0.05);
            warn!(impulsive, window = recent.len(), "impulse control issues detected");
        }
    }

    fn detect_burnout(&mut self) {
        if self.metrics.stress_level <= 0.7
            || self.metrics.burnout_risk <= 0.5
            || self.decisions.len() < 10
        {
            return;
        }
        let recent = recent(&self.decisions, 10);
        let successes = recent.iter().filter(|d| d.succeeded()).count();
        if (successes as f64) / (recent.len() as f64) < 0.6 {
            self.metrics.burnout_risk = clamp01(self.metrics.burnout_risk + 0.1);
            warn!(successes, "burnout indicators detected");
        }
    }

    pub fn update_from_thought_pattern(&mut self, pattern: ThoughtPattern) {
        if pattern.repetition_count > 3 && pattern.similarity_score > 0.8 {
            self.metrics.recursive_loop_count += 1;
            warn!(pattern = %pattern.pattern_type, "potential recursive loop detected");
        }
        if pattern.pattern_type == "validation_seeking" && pattern.repetition_count > 2 {
            self.metrics.addictive_behavior_score =
                clamp01(self.metrics.addictive_behavior_score + 0.1);
        }
        if pattern.pattern_type == "impulsive" && pattern.repetition_count > 1 {
            self.metrics.impulse_control_score =
                clamp01(self.metrics.impulse_control_score - 0.05);
        }

        push_bounded(
            &mut self.thought_patterns,
            pattern,
            self.settings.thought_patterns,
        );
        self.detect_circular_references();
    }

    fn detect_circular_references(&mut self) {
        if self.thought_patterns.len() < 5 {
            return;
        }
        let recent = recent(&self.thought_patterns, 10);
        let mut circular = 0;
        for (i, first) in recent.iter().enumerate() {
            circular += recent[i + 1..]
                .iter()
                .filter(|second| first.is_circular_with(second))
                .count();
        }
        if circular >= 2 {
            self.metrics.recursive_loop_count += 1;
            warn!(circular, "circular references detected in thought patterns");
        }
    }

    pub fn record_emotional_event(
        &mut self,
        kind: EmotionalEventKind,
        intensity: f64,
        context: Map<String, Value>,
    ) {
        let intensity = clamp01(intensity);
        self.metrics.emotional_stability =
            clamp01(self.metrics.emotional_stability + kind.stability_delta() * intensity);
        push_bounded(
            &mut self.emotional_events,
            EmotionalEvent {
                kind,
                intensity,
                context,
                at: Utc::now(),
            },
            self.settings.emotional_events,
        );
        self.check_emotional_volatility();
    }

    fn check_emotional_volatility(&mut self) {
        if self.emotional_events.len() < 10 {
            return;
        }
        let intensities: Vec<f64> = recent(&self.emotional_events, 20)
            .iter()
            .map(|event| event.intensity)
            .collect();
        let volatility = std_dev(&intensities);
        if volatility > VOLATILITY_LIMIT {
            self.metrics.emotional_stability = clamp01(self.metrics.emotional_stability - 0.05);
            warn!(volatility, "high emotional volatility detected");
        }
    }

    /// Apply a corrective action and start the intervention cooldown.
    pub fn apply_intervention(&mut self, intervention: Intervention, now: DateTime<Utc>) {
        let m = &mut self.metrics;
        match intervention {
            Intervention::RecursiveLoopReset => {
                m.recursive_loop_count = 0;
            }
            Intervention::AddictiveBehaviorReset => {
                m.addictive_behavior_score = 0.0;
                m.impulse_control_score = clamp01(m.impulse_control_score + 0.1);
            }
            Intervention::BurnoutRelief => {
                m.stress_level = clamp01(m.stress_level - 0.3);
                m.burnout_risk = clamp01(m.burnout_risk - 0.3);
                m.emotional_stability = clamp01(m.emotional_stability + 0.1);
            }
        }
        self.last_intervention = Some(now);
        info!(?intervention, status = %self.status(), "mental health intervention applied");
    }

    pub fn should_intervene(&self) -> bool {
        self.should_intervene_at(Utc::now())
    }

    pub fn should_intervene_at(&self, now: DateTime<Utc>) -> bool {
        if let Some(last) = self.last_intervention {
            let cooldown = Duration::seconds(self.settings.intervention_cooldown_secs);
            if now - last < cooldown {
                return false;
            }
        }
        self.metrics.crosses_intervention_threshold()
    }

    pub fn intervention_recommendations(&self) -> Vec<String> {
        recommendations_for(self.status())
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Restore stable metrics. Counts as an intervention for the cooldown.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.metrics = MentalHealthMetrics::default();
        self.last_intervention = Some(now);
        info!("mental health metrics reset to stable state");
    }

    pub fn summary(&self) -> MentalHealthSummary {
        MentalHealthSummary {
            status: self.status(),
            metrics: self.metrics,
            decisions_recorded: self.decisions.len(),
            thought_patterns_recorded: self.thought_patterns.len(),
            emotional_events_recorded: self.emotional_events.len(),
            last_intervention: self.last_intervention,
            should_intervene: self.should_intervene(),
            recommendations: self.intervention_recommendations(),
        }
    }

    /// Counts of recorded emotional events by kind.
    pub fn emotion_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.emotional_events {
            let key = serde_json::to_value(event.kind)
                .ok()
                .and_then(|value| value.as_str().map(ToString::to_string))
                .unwrap_or_else(|| "other".to_string());
            *counts.entry(key).or_insert(0) += 1;
        }
        counts
    }
}

fn push_bounded<T>(buffer: &mut VecDeque<T>, item: T, capacity: usize) {
    buffer.push_back(item);
    trim(buffer, capacity);
}

fn trim<T>(buffer: &mut VecDeque<T>, capacity: usize) {
    while buffer.len() > capacity.max(1) {
        buffer.pop_front();
    }
}

fn recent<T>(buffer: &VecDeque<T>, count: usize) -> Vec<&T> {
    buffer.iter().skip(buffer.len().saturating_sub(count)).collect()
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{GoalType, MaturityLevel};
    use uuid::Uuid;

    fn decision(complexity: f64, urgency: f64, confidence: f64, ready: bool) -> DecisionSummary {
        DecisionSummary {
            plan_id: Uuid::new_v4(),
            goal: "goal".to_string(),
            goal_type: GoalType::Tool,
            complexity,
            urgency,
            confidence,
            success_rate: if ready { confidence } else { 0.0 },
            ready_for_execution: ready,
            seeking_approval: false,
            planning_secs: 2.0,
            vsp: 0.0,
            mental_health_status: MentalHealthStatus::Stable,
            maturity_level: MaturityLevel::Adult,
        }
    }

    #[test]
    fn status_follows_priority_order() {
        let mut metrics = MentalHealthMetrics::default();
        assert_eq!(metrics.status(), MentalHealthStatus::Stable);

        metrics.burnout_risk = 0.8;
        assert_eq!(metrics.status(), MentalHealthStatus::Overwhelmed);
        metrics.addictive_behavior_score = 0.6;
        assert_eq!(metrics.status(), MentalHealthStatus::Addictive);
        metrics.recursive_loop_count = 3;
        assert_eq!(metrics.status(), MentalHealthStatus::Recursive);
        metrics.excitement_level = 0.81;
        assert_eq!(metrics.status(), MentalHealthStatus::Excited);
        metrics.stress_level = 0.71;
        assert_eq!(metrics.status(), MentalHealthStatus::Stressed);
    }

    #[test]
    fn status_thresholds_are_strict_for_stress() {
        let metrics = MentalHealthMetrics {
            stress_level: 0.7,
            ..MentalHealthMetrics::default()
        };
        assert_eq!(metrics.status(), MentalHealthStatus::Stable);
    }

    #[test]
    fn failed_decision_amplifies_stress_then_decays() {
        let mut monitor = MentalHealthMonitor::default();
        monitor.update_from_decision(&decision(0.5, 0.5, 0.5, false));
        // (0.15 + 0.2) * 0.5 * 1.5 = 0.2625, minus decay 0.05
        assert!((monitor.metrics().stress_level - 0.2125).abs() < 1e-9);
    }

    #[test]
    fn confident_success_raises_excitement() {
        let mut monitor = MentalHealthMonitor::default();
        monitor.update_from_decision(&decision(0.2, 0.2, 0.9, true));
        // 0.09 gained, 0.05 decayed
        assert!((monitor.metrics().excitement_level - 0.04).abs() < 1e-9);
    }

    #[test]
    fn analytical_personality_decays_faster() {
        let analytical = PersonalityProfile {
            analytical: 0.9,
            ..PersonalityProfile::default()
        };
        let mut fast = MentalHealthMonitor::new(MonitorSettings::default(), Some(analytical));
        let mut normal = MentalHealthMonitor::default();
        let d = decision(0.8, 0.8, 0.2, true);
        fast.update_from_decision(&d);
        normal.update_from_decision(&d);
        assert!(fast.metrics().stress_level < normal.metrics().stress_level);
    }

    #[test]
    fn repeated_similar_patterns_flip_status_to_recursive() {
        let mut monitor = MentalHealthMonitor::default();
        for _ in 0..4 {
            monitor.update_from_thought_pattern(ThoughtPattern::new("loop", 4, 0.9));
        }
        assert!(monitor.metrics().recursive_loop_count >= 3);
        assert_eq!(monitor.status(), MentalHealthStatus::Recursive);
    }

    #[test]
    fn circular_patterns_increment_loop_count() {
        let mut monitor = MentalHealthMonitor::default();
        for _ in 0..4 {
            monitor.update_from_thought_pattern(ThoughtPattern::new("filler", 0, 0.0));
        }
        monitor.update_from_thought_pattern(
            ThoughtPattern::new("a", 0, 0.0).with_io(&["y"], &["x"]),
        );
        assert_eq!(monitor.metrics().recursive_loop_count, 0);

        // Two more patterns that feed the first one and each other.
        monitor.update_from_thought_pattern(
            ThoughtPattern::new("b", 0, 0.0).with_io(&["x"], &["y"]),
        );
        assert_eq!(monitor.metrics().recursive_loop_count, 0);
        monitor.update_from_thought_pattern(
            ThoughtPattern::new("c", 0, 0.0).with_io(&["x", "y"], &["x", "y"]),
        );
        assert_eq!(monitor.metrics().recursive_loop_count, 1);
    }

    #[test]
    fn validation_seeking_patterns_raise_addictive_score() {
        let mut monitor = MentalHealthMonitor::default();
        monitor.update_from_thought_pattern(ThoughtPattern::new("validation_seeking", 3, 0.1));
        monitor.update_from_thought_pattern(ThoughtPattern::new("impulsive", 2, 0.1));
        assert!((monitor.metrics().addictive_behavior_score - 0.1).abs() < 1e-9);
        assert!((monitor.metrics().impulse_control_score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn approval_seeking_history_raises_addictive_score() {
        let mut monitor = MentalHealthMonitor::default();
        for _ in 0..10 {
            let mut d = decision(0.2, 0.2, 0.9, true);
            d.seeking_approval = true;
            monitor.update_from_decision(&d);
        }
        assert!(monitor.metrics().addictive_behavior_score >= 0.1);
    }

    #[test]
    fn hasty_complex_decisions_lower_impulse_control() {
        let mut monitor = MentalHealthMonitor::default();
        for _ in 0..5 {
            let mut d = decision(0.6, 0.2, 0.9, true);
            d.planning_secs = 0.01;
            monitor.update_from_decision(&d);
        }
        assert!(monitor.metrics().impulse_control_score < 1.0);
    }

    #[test]
    fn emotional_events_shift_stability() {
        let mut monitor = MentalHealthMonitor::default();
        monitor.record_emotional_event(EmotionalEventKind::Failure, 1.0, Map::new());
        assert!((monitor.metrics().emotional_stability - 0.97).abs() < 1e-9);
        monitor.record_emotional_event(EmotionalEventKind::Success, 0.5, Map::new());
        assert!((monitor.metrics().emotional_stability - 0.98).abs() < 1e-9);
        assert_eq!(monitor.emotion_counts().get("failure"), Some(&1));
    }

    #[test]
    fn volatile_emotions_reduce_stability() {
        let mut monitor = MentalHealthMonitor::default();
        for i in 0..10 {
            let intensity = if i % 2 == 0 { 0.0 } else { 1.0 };
            monitor.record_emotional_event(EmotionalEventKind::Other, intensity, Map::new());
        }
        // std dev 0.5 > 0.3 on the tenth event
        assert!((monitor.metrics().emotional_stability - 0.95).abs() < 1e-9);
    }

    #[test]
    fn should_intervene_respects_cooldown() {
        let mut monitor = MentalHealthMonitor::default();
        let now = Utc::now();
        for _ in 0..3 {
            monitor.update_from_thought_pattern(ThoughtPattern::new("loop", 4, 0.9));
        }
        assert!(monitor.should_intervene_at(now));

        monitor.apply_intervention(Intervention::BurnoutRelief, now);
        assert!(!monitor.should_intervene_at(now + Duration::seconds(60)));
        assert!(monitor.should_intervene_at(now + Duration::seconds(1801)));
    }

    #[test]
    fn interventions_adjust_metrics() {
        let mut monitor = MentalHealthMonitor::default();
        monitor.metrics.recursive_loop_count = 5;
        monitor.metrics.addictive_behavior_score = 0.8;
        monitor.metrics.impulse_control_score = 0.5;
        monitor.metrics.stress_level = 0.9;
        monitor.metrics.burnout_risk = 0.85;
        monitor.metrics.emotional_stability = 0.5;
        let now = Utc::now();

        monitor.apply_intervention(Intervention::RecursiveLoopReset, now);
        monitor.apply_intervention(Intervention::AddictiveBehaviorReset, now);
        monitor.apply_intervention(Intervention::BurnoutRelief, now);

        let m = monitor.metrics();
        assert_eq!(m.recursive_loop_count, 0);
        assert_eq!(m.addictive_behavior_score, 0.0);
        assert!((m.impulse_control_score - 0.6).abs() < 1e-9);
        assert!((m.stress_level - 0.6).abs() < 1e-9);
        assert!((m.burnout_risk - 0.55).abs() < 1e-9);
        assert!((m.emotional_stability - 0.6).abs() < 1e-9);
    }

    #[test]
    fn recommendations_track_status() {
        let mut monitor = MentalHealthMonitor::default();
        assert!(monitor.intervention_recommendations().is_empty());
        monitor.metrics.stress_level = 0.75;
        let recs = monitor.intervention_recommendations();
        assert_eq!(recs.len(), 4);
        assert_eq!(recs[0], "Reduce task complexity");
    }

    #[test]
    fn reset_restores_defaults_and_starts_cooldown() {
        let mut monitor = MentalHealthMonitor::default();
        monitor.metrics.stress_level = 0.95;
        let now = Utc::now();
        monitor.reset(now);
        assert_eq!(*monitor.metrics(), MentalHealthMetrics::default());
        assert_eq!(monitor.summary().last_intervention, Some(now));
    }

    #[test]
    fn histories_are_bounded() {
        let settings = MonitorSettings {
            thought_patterns: 3,
            ..MonitorSettings::default()
        };
        let mut monitor = MentalHealthMonitor::new(settings, None);
        for i in 0..6 {
            monitor.update_from_thought_pattern(ThoughtPattern::new(format!("p{i}"), 0, 0.0));
        }
        assert_eq!(monitor.summary().thought_patterns_recorded, 3);
    }
}
