//! Candidate action plans and the strategy templates that produce them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::types::{DecodingMode, GoalType, MaturityLevel, PlanStatus, StepKind};

/// Policy tag attached to every generated plan.
pub const NO_PII_EXFIL: &str = "no_pii_exfil";

const STEP_TOKENS: u32 = 500;
const STEP_SECONDS: u32 = 10;
const STEP_GPU: f64 = 0.1;
const LOCAL_MODEL: &str = "local_20B";

/// Candidate generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Conservative,
    Balanced,
    Aggressive,
}

/// Fixed parameters for one strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanTemplate {
    pub steps: usize,
    pub quality: f64,
    pub risk: f64,
    pub spend: f64,
    /// Lowest maturity level allowed to use this strategy.
    pub min_level: MaturityLevel,
}

impl Strategy {
    /// Template order, which is also the candidate order.
    pub const ALL: [Strategy; 3] = [
        Strategy::Conservative,
        Strategy::Balanced,
        Strategy::Aggressive,
    ];

    pub fn template(self) -> PlanTemplate {
        match self {
            Strategy::Conservative => PlanTemplate {
                steps: 3,
                quality: 0.8,
                risk: 0.2,
                spend: 0.6,
                min_level: MaturityLevel::Infant,
            },
            Strategy::Balanced => PlanTemplate {
                steps: 5,
                quality: 0.7,
                risk: 0.4,
                spend: 0.8,
                min_level: MaturityLevel::Infant,
            },
            Strategy::Aggressive => PlanTemplate {
                steps: 7,
                quality: 0.6,
                risk: 0.6,
                spend: 1.0,
                min_level: MaturityLevel::Adolescent,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Conservative => "conservative",
            Strategy::Balanced => "balanced",
            Strategy::Aggressive => "aggressive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanGoal {
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    pub spec: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepBudget {
    pub tokens: u32,
    pub seconds: u32,
    pub gpu: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default)]
    pub args: Map<String, Value>,
    pub budget: StepBudget,
}

impl PlanStep {
    /// True when the tool reference or any argument mentions `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        let in_tool = self
            .tool
            .as_deref()
            .is_some_and(|tool| tool.contains(needle));
        in_tool
            || self.args.iter().any(|(key, value)| {
                key.contains(needle) || value.to_string().contains(needle)
            })
    }
}

/// Estimates carried by a plan, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimates {
    pub quality: f64,
    pub risk: f64,
    pub spend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionProfile {
    pub mode: DecodingMode,
    pub model: String,
}

/// A candidate plan. Immutable after scoring apart from `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub id: Uuid,
    pub request_id: Uuid,
    pub strategy: Strategy,
    pub goal: PlanGoal,
    pub steps: Vec<PlanStep>,
    pub estimates: Estimates,
    pub profile: ExecutionProfile,
    pub policies: Vec<String>,
    pub rationale: String,
    pub status: PlanStatus,
}

impl ActionPlan {
    pub fn from_template(
        strategy: Strategy,
        request_id: Uuid,
        goal_type: GoalType,
        goal_spec: &str,
        mode: DecodingMode,
    ) -> Self {
        let template = strategy.template();
        let steps = (0..template.steps).map(template_step).collect();
        Self {
            id: Uuid::new_v4(),
            request_id,
            strategy,
            goal: PlanGoal {
                goal_type,
                spec: goal_spec.to_string(),
            },
            steps,
            estimates: Estimates {
                quality: template.quality,
                risk: template.risk,
                spend: template.spend,
            },
            profile: ExecutionProfile {
                mode,
                model: format!("{}_{LOCAL_MODEL}", mode.as_str()),
            },
            policies: vec![NO_PII_EXFIL.to_string()],
            rationale: format!(
                "Strategy: {} - {} steps, quality {}, risk {}",
                strategy.as_str(),
                template.steps,
                template.quality,
                template.risk
            ),
            status: PlanStatus::Proposed,
        }
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn count_steps(&self, kind: StepKind) -> usize {
        self.steps.iter().filter(|step| step.kind == kind).count()
    }

    pub fn tools(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter_map(|step| step.tool.clone())
            .collect()
    }

    pub fn has_policy(&self, policy: &str) -> bool {
        self.policies.iter().any(|tag| tag == policy)
    }

    /// Serializable digest submitted to the external policy check.
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            plan_id: self.id,
            strategy: self.strategy,
            goal_type: self.goal.goal_type,
            step_count: self.step_count(),
            tools: self.tools(),
            estimates: self.estimates,
            policies: self.policies.clone(),
            mode: self.profile.mode,
        }
    }
}

/// Even step indices reason, odd ones call an external tool.
fn template_step(index: usize) -> PlanStep {
    let (kind, tool) = if index % 2 == 0 {
        (StepKind::Reasoning, None)
    } else {
        (StepKind::ExternalTool, Some(format!("tool_{index}")))
    };
    PlanStep {
        id: format!("step_{index}"),
        kind,
        tool,
        args: Map::new(),
        budget: StepBudget {
            tokens: STEP_TOKENS,
            seconds: STEP_SECONDS,
            gpu: STEP_GPU,
        },
    }
}

/// Plan summary handed across the policy boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub plan_id: Uuid,
    pub strategy: Strategy,
    pub goal_type: GoalType,
    pub step_count: usize,
    pub tools: Vec<String>,
    pub estimates: Estimates,
    pub policies: Vec<String>,
    pub mode: DecodingMode,
}

/// Generate candidates in template order, filtered by maturity level.
pub fn generate_candidates(
    request_id: Uuid,
    goal_type: GoalType,
    goal_spec: &str,
    mode: DecodingMode,
    level: MaturityLevel,
) -> Vec<ActionPlan> {
    Strategy::ALL
        .into_iter()
        .filter(|strategy| level >= strategy.template().min_level)
        .map(|strategy| ActionPlan::from_template(strategy, request_id, goal_type, goal_spec, mode))
        .collect()
}
