//! Sense and Evaluate derivations: perturbation, risk, decoding mode and the
//! requirement records attached to each trace.

use serde::{Deserialize, Serialize};

use crate::core::budget::Allocation;
use crate::core::classifier::GoalAnalysis;
use crate::core::mental_health::MentalHealthMetrics;
use crate::core::types::{DecodingMode, GoalType, MaturityLevel, MentalHealthStatus, clamp01};

/// Availability figures reported by the resource inventory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailableResources {
    pub compute_capacity: f64,
    pub memory_capacity: f64,
    pub time_budget_secs: f64,
    pub tool_count: u32,
    pub api_rate_limit: f64,
}

impl Default for AvailableResources {
    fn default() -> Self {
        Self {
            compute_capacity: 0.8,
            memory_capacity: 0.7,
            time_budget_secs: 300.0,
            tool_count: 15,
            api_rate_limit: 0.9,
        }
    }
}

impl AvailableResources {
    /// Whether an allocation fits inside the reported availability.
    pub fn can_allocate(&self, allocation: &Allocation) -> bool {
        allocation.gpu <= self.compute_capacity && allocation.seconds <= self.time_budget_secs
    }
}

/// Bounded instability score `V_SP` in `[0, 1]`.
pub fn perturbation(complexity: f64, urgency: f64, metrics: &MentalHealthMetrics) -> f64 {
    let indicators = [
        (complexity > 0.8, 0.3),
        (urgency > 0.8, 0.2),
        (metrics.status() != MentalHealthStatus::Stable, 0.2),
        (metrics.stress_level > 0.7, 0.15),
        (metrics.emotional_stability < 0.5, 0.1),
    ];
    clamp01(sum_active(&indicators))
}

pub fn risk_score(
    complexity: f64,
    urgency: f64,
    status: MentalHealthStatus,
    level: MaturityLevel,
    vsp: f64,
) -> f64 {
    let indicators = [
        (complexity > 0.8, 0.3),
        (urgency > 0.8, 0.2),
        (status != MentalHealthStatus::Stable, 0.2),
        (level == MaturityLevel::Infant, 0.15),
        (vsp > 0.7, 0.15),
    ];
    clamp01(sum_active(&indicators))
}

fn sum_active(indicators: &[(bool, f64)]) -> f64 {
    indicators
        .iter()
        .filter(|(active, _)| *active)
        .map(|(_, increment)| increment)
        .sum()
}

/// `crisis` beats `deep` beats `flow`.
pub fn decoding_mode(urgency: f64, complexity: f64, goal_type: GoalType, vsp: f64) -> DecodingMode {
    if urgency > 0.9 || vsp > 0.8 {
        DecodingMode::Crisis
    } else if complexity > 0.7 || matches!(goal_type, GoalType::Analyze | GoalType::Plan) {
        DecodingMode::Deep
    } else {
        DecodingMode::Flow
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    pub tokens: f64,
    pub seconds: f64,
    pub gpu: f64,
    pub memory_mb: f64,
}

pub fn resource_requirements(complexity: f64) -> ResourceRequirements {
    let scale = 1.0 + complexity;
    ResourceRequirements {
        tokens: 1000.0 * scale,
        seconds: 30.0 * scale,
        gpu: (0.1 * scale).min(1.0),
        memory_mb: 100.0 * scale,
    }
}

/// Limits implied by the current mental state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MentalHealthConstraints {
    pub max_complexity: Option<f64>,
    pub max_urgency: Option<f64>,
    pub max_risk: Option<f64>,
    pub require_validation: bool,
}

pub fn mental_health_constraints(metrics: &MentalHealthMetrics) -> MentalHealthConstraints {
    let mut constraints = MentalHealthConstraints::default();
    if metrics.stress_level > 0.8 {
        constraints.max_complexity = Some(0.5);
        constraints.max_urgency = Some(0.6);
    }
    if metrics.emotional_stability < 0.4 {
        constraints.require_validation = true;
        constraints.max_risk = Some(0.3);
    }
    constraints
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuccessCriteria {
    pub min_quality: f64,
    pub time_limit_secs: f64,
    pub min_accuracy: f64,
}

const DEFAULT_TIME_LIMIT_SECS: f64 = 300.0;

pub fn success_criteria(goal_type: GoalType, time_limit: Option<f64>) -> SuccessCriteria {
    SuccessCriteria {
        min_quality: 0.7,
        time_limit_secs: time_limit.unwrap_or(DEFAULT_TIME_LIMIT_SECS),
        min_accuracy: if goal_type == GoalType::Answer { 0.8 } else { 0.6 },
    }
}

/// Everything Evaluate derives for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub analysis: GoalAnalysis,
    /// The larger of the requested and estimated complexity.
    pub effective_complexity: f64,
    pub risk_score: f64,
    pub mode: DecodingMode,
    pub requirements: ResourceRequirements,
    pub constraints: MentalHealthConstraints,
    pub criteria: SuccessCriteria,
}
