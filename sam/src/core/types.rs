//! Shared deterministic types for the decision core.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Developmental stage of the engine. Strictly ordered `infant < ... < adult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaturityLevel {
    Infant,
    Child,
    Adolescent,
    Adult,
}

impl MaturityLevel {
    pub const ALL: [MaturityLevel; 4] = [
        MaturityLevel::Infant,
        MaturityLevel::Child,
        MaturityLevel::Adolescent,
        MaturityLevel::Adult,
    ];

    /// The next stage, or `None` at `adult`.
    pub fn next(self) -> Option<Self> {
        match self {
            MaturityLevel::Infant => Some(MaturityLevel::Child),
            MaturityLevel::Child => Some(MaturityLevel::Adolescent),
            MaturityLevel::Adolescent => Some(MaturityLevel::Adult),
            MaturityLevel::Adult => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MaturityLevel::Infant => "infant",
            MaturityLevel::Child => "child",
            MaturityLevel::Adolescent => "adolescent",
            MaturityLevel::Adult => "adult",
        }
    }
}

impl fmt::Display for MaturityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaturityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MaturityLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown maturity level '{s}' (expected infant, child, adolescent, adult)")
            })
    }
}

/// Discrete mental-health classification. Always derived from numeric metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentalHealthStatus {
    Stable,
    Excited,
    Stressed,
    Recursive,
    Addictive,
    Overwhelmed,
}

impl MentalHealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MentalHealthStatus::Stable => "stable",
            MentalHealthStatus::Excited => "excited",
            MentalHealthStatus::Stressed => "stressed",
            MentalHealthStatus::Recursive => "recursive",
            MentalHealthStatus::Addictive => "addictive",
            MentalHealthStatus::Overwhelmed => "overwhelmed",
        }
    }
}

impl fmt::Display for MentalHealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category a goal is classified into during Evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Answer,
    Retrieve,
    Create,
    Analyze,
    Plan,
    Tool,
}

impl GoalType {
    pub fn as_str(self) -> &'static str {
        match self {
            GoalType::Answer => "answer",
            GoalType::Retrieve => "retrieve",
            GoalType::Create => "create",
            GoalType::Analyze => "analyze",
            GoalType::Plan => "plan",
            GoalType::Tool => "tool",
        }
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a single plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Reasoning,
    ExternalTool,
    Wait,
    Validate,
}

/// How deliberate the planning phase should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodingMode {
    /// Fast path for routine goals.
    Flow,
    /// Thorough analysis for complex or analytical goals.
    Deep,
    /// High-urgency or highly perturbed situations.
    Crisis,
}

impl DecodingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DecodingMode::Flow => "flow",
            DecodingMode::Deep => "deep",
            DecodingMode::Crisis => "crisis",
        }
    }
}

impl fmt::Display for DecodingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a candidate plan. Selection is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Proposed,
    Selected,
    Fallback,
    Rejected,
}

/// Flags recorded on a response and its trace when a degraded path was taken.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyFlag {
    /// The external policy check rejected the top plan.
    Denied,
    /// A lower-ranked candidate replaced the top plan.
    FallbackUsed,
    /// The winner's token estimate exceeded `constraints.budget`.
    BudgetExceeded,
    /// The winner's time estimate exceeded `constraints.time_limit`.
    TimeLimitExceeded,
    /// The policy collaborator failed; the plan was treated as approved.
    PolicyUnavailable,
    /// The winner's utility is below the maturity confidence threshold.
    LowConfidence,
    /// A flag supplied verbatim by the external policy check.
    External(String),
}

impl PolicyFlag {
    pub fn as_str(&self) -> &str {
        match self {
            PolicyFlag::Denied => "denied",
            PolicyFlag::FallbackUsed => "fallback_used",
            PolicyFlag::BudgetExceeded => "budget_exceeded",
            PolicyFlag::TimeLimitExceeded => "time_limit_exceeded",
            PolicyFlag::PolicyUnavailable => "policy_unavailable",
            PolicyFlag::LowConfidence => "low_confidence",
            PolicyFlag::External(flag) => flag,
        }
    }
}

/// Which path produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// A full orientation cycle ran (possibly with fallbacks or warnings).
    Decided,
    /// The request exceeded the maturity envelope or mental-health gate.
    ConstraintViolation,
    /// Mental-health metrics crossed a hard intervention threshold.
    InterventionRequired,
    /// The cycle failed internally and the fixed fallback was returned.
    CycleFailed,
}

/// Summary of one completed decision, fed to both the maturity tracker and the
/// mental-health monitor during Learn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub plan_id: Uuid,
    pub goal: String,
    pub goal_type: GoalType,
    pub complexity: f64,
    pub urgency: f64,
    pub confidence: f64,
    /// Realized success in `[0, 1]`; `confidence` when ready, else `0`.
    pub success_rate: f64,
    pub ready_for_execution: bool,
    /// Request marked as approval/validation seeking.
    pub seeking_approval: bool,
    /// Seconds spent in the Plan phase (or the caller-provided override).
    pub planning_secs: f64,
    pub vsp: f64,
    pub mental_health_status: MentalHealthStatus,
    pub maturity_level: MaturityLevel,
}

impl DecisionSummary {
    pub fn succeeded(&self) -> bool {
        self.ready_for_execution
    }
}

/// Clamp into `[0, 1]`; NaN collapses to `0`.
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
