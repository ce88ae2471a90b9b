//! Write-once audit record for one orientation cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::budget::Allocation;
use crate::core::evaluate::{AvailableResources, Evaluation};
use crate::core::maturity::MaturityProfile;
use crate::core::mental_health::MentalHealthSnapshot;
use crate::core::plan::{Estimates, Strategy};
use crate::core::selector::ScoredPlan;
use crate::core::types::{DecodingMode, GoalType, PlanStatus, PolicyFlag};
use crate::core::utility::{FactorBreakdown, WeightVector};

/// One scored candidate as recorded in a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTrace {
    pub plan_id: Uuid,
    pub strategy: Strategy,
    pub status: PlanStatus,
    pub step_count: usize,
    pub estimates: Estimates,
    pub utility: f64,
    pub breakdown: FactorBreakdown,
    pub explanation: String,
}

impl From<&ScoredPlan> for CandidateTrace {
    fn from(candidate: &ScoredPlan) -> Self {
        Self {
            plan_id: candidate.plan.id,
            strategy: candidate.plan.strategy,
            status: candidate.plan.status,
            step_count: candidate.plan.step_count(),
            estimates: candidate.plan.estimates,
            utility: candidate.score.utility,
            breakdown: candidate.score.breakdown,
            explanation: candidate.score.explanation.clone(),
        }
    }
}

/// Safety guard evaluated during Act and whether it passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardOutcome {
    pub guard: String,
    pub passed: bool,
}

impl GuardOutcome {
    pub fn new(guard: &str, passed: bool) -> Self {
        Self {
            guard: guard.to_string(),
            passed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    pub trace_id: Uuid,
    pub request_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub goal: String,
    pub goal_type: GoalType,
    pub perturbation: f64,
    pub mode: DecodingMode,
    pub evaluation: Evaluation,
    pub weights: WeightVector,
    pub candidates: Vec<CandidateTrace>,
    pub winner_id: Uuid,
    pub selection_reasons: Vec<String>,
    pub guards: Vec<GuardOutcome>,
    pub allocation: Allocation,
    pub resources: AvailableResources,
    pub policy_flags: Vec<PolicyFlag>,
    pub warnings: Vec<String>,
    pub mental_health: MentalHealthSnapshot,
    pub maturity: MaturityProfile,
}
