//! Deterministic goal classification and complexity estimation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::request::context_flag;
use crate::core::types::{GoalType, clamp01};

/// Ordered keyword rules. The first rule with a matching keyword wins.
pub const GOAL_RULES: &[(GoalType, &[&str])] = &[
    (GoalType::Answer, &["answer", "what", "how", "why"]),
    (GoalType::Retrieve, &["find", "search", "retrieve", "get"]),
    (GoalType::Create, &["create", "generate", "make", "build"]),
    (
        GoalType::Analyze,
        &["analyze", "examine", "study", "investigate"],
    ),
    (GoalType::Plan, &["plan", "strategy", "approach"]),
];

const BASE_COMPLEXITY: f64 = 0.5;

/// Keyword groups that raise the complexity estimate. Each group counts once.
const COMPLEXITY_KEYWORDS: &[(&[&str], f64)] = &[
    (&["analyze", "complex"], 0.2),
    (&["create", "generate"], 0.15),
    (&["plan", "strategy"], 0.1),
];

/// Context flags that raise the complexity estimate.
const COMPLEXITY_CONTEXT: &[(&str, f64)] = &[
    ("requires_external_data", 0.1),
    ("requires_multiple_steps", 0.15),
    ("time_sensitive", 0.1),
];

/// Classify a goal by case-insensitive substring containment.
///
/// Falls back to [`GoalType::Tool`] when no rule matches.
pub fn classify_goal(goal: &str) -> GoalType {
    let lowered = goal.to_lowercase();
    GOAL_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map_or(GoalType::Tool, |(goal_type, _)| *goal_type)
}

/// Keyword and context based complexity estimate in `[0, 1]`.
pub fn estimate_complexity(goal: &str, context: &Map<String, Value>) -> f64 {
    let lowered = goal.to_lowercase();
    let keyword_bonus: f64 = COMPLEXITY_KEYWORDS
        .iter()
        .filter(|(keywords, _)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(_, bonus)| bonus)
        .sum();
    let context_bonus: f64 = COMPLEXITY_CONTEXT
        .iter()
        .filter(|(flag, _)| context_flag(context, flag))
        .map(|(_, bonus)| bonus)
        .sum();
    clamp01(BASE_COMPLEXITY + keyword_bonus + context_bonus)
}

/// Goal analysis produced during Evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalAnalysis {
    pub goal_type: GoalType,
    pub estimated_complexity: f64,
    pub requires_external_tools: bool,
    pub estimated_steps: usize,
}

pub fn analyze_goal(goal: &str, context: &Map<String, Value>) -> GoalAnalysis {
    let goal_type = classify_goal(goal);
    let estimated_complexity = estimate_complexity(goal, context);
    let estimated_steps = match goal_type {
        GoalType::Answer | GoalType::Tool => 3,
        GoalType::Retrieve | GoalType::Plan => 4,
        GoalType::Create | GoalType::Analyze => 5,
    };
    GoalAnalysis {
        goal_type,
        estimated_complexity,
        requires_external_tools: matches!(goal_type, GoalType::Retrieve | GoalType::Tool)
            || context_flag(context, "requires_external_data"),
        estimated_steps,
    }
}
