//! Request and response envelopes for the decision engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::types::{
    DecodingMode, MaturityLevel, MentalHealthStatus, PolicyFlag, ResponseKind, clamp01,
};

/// Caller-supplied personality traits. Each trait lies in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalityProfile {
    pub tone: String,
    pub assertiveness: f64,
    pub patience: f64,
    pub humor: f64,
    pub creativity: f64,
    pub analytical: f64,
    pub social: f64,
}

impl Default for PersonalityProfile {
    fn default() -> Self {
        Self {
            tone: "neutral".to_string(),
            assertiveness: 0.5,
            patience: 0.5,
            humor: 0.5,
            creativity: 0.5,
            analytical: 0.5,
            social: 0.5,
        }
    }
}

impl PersonalityProfile {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("assertiveness", self.assertiveness),
            ("patience", self.patience),
            ("humor", self.humor),
            ("creativity", self.creativity),
            ("analytical", self.analytical),
            ("social", self.social),
        ] {
            check_unit(&format!("personality.{name}"), value)?;
        }
        Ok(())
    }
}

/// A single decision request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub goal: String,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default)]
    pub constraints: Map<String, Value>,
    #[serde(default = "default_level")]
    pub urgency: f64,
    #[serde(default = "default_level")]
    pub complexity: f64,
    #[serde(default)]
    pub personality: Option<PersonalityProfile>,
}

fn default_level() -> f64 {
    0.5
}

impl DecisionRequest {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            context: Map::new(),
            constraints: Map::new(),
            urgency: default_level(),
            complexity: default_level(),
            personality: None,
        }
    }

    pub fn with_urgency(mut self, urgency: f64) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    pub fn with_constraint(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.constraints.insert(key.to_string(), value.into());
        self
    }

    pub fn with_personality(mut self, personality: PersonalityProfile) -> Self {
        self.personality = Some(personality);
        self
    }

    /// Checks numeric ranges. Schema-level checks live in `io::request`.
    pub fn validate(&self) -> Result<(), String> {
        if self.goal.trim().is_empty() {
            return Err("goal must not be empty".to_string());
        }
        check_unit("urgency", self.urgency)?;
        check_unit("complexity", self.complexity)?;
        if let Some(personality) = &self.personality {
            personality.validate()?;
        }
        Ok(())
    }

    /// Truthiness of a context key. Missing keys are false.
    pub fn context_flag(&self, key: &str) -> bool {
        context_flag(&self.context, key)
    }

    pub fn context_number(&self, key: &str) -> Option<f64> {
        self.context.get(key).and_then(Value::as_f64)
    }

    /// Token budget from `constraints.budget`.
    pub fn budget(&self) -> Option<f64> {
        self.constraints.get("budget").and_then(Value::as_f64)
    }

    /// Wall-clock allowance in seconds from `constraints.time_limit`.
    pub fn time_limit(&self) -> Option<f64> {
        self.constraints.get("time_limit").and_then(Value::as_f64)
    }
}

/// Truthiness of a JSON value: `false`, `null`, `0`, `""`, `[]` and `{}` are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(entries) => !entries.is_empty(),
    }
}

pub fn context_flag(context: &Map<String, Value>, key: &str) -> bool {
    context.get(key).is_some_and(is_truthy)
}

fn check_unit(name: &str, value: f64) -> Result<(), String> {
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{name} {value:.2} outside [0, 1]"));
    }
    Ok(())
}

/// Result of `DecisionEngine::decide`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub kind: ResponseKind,
    pub plan_id: Uuid,
    pub confidence: f64,
    pub mental_health_status: MentalHealthStatus,
    pub maturity_level: MaturityLevel,
    pub trace_id: Uuid,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub mode: Option<DecodingMode>,
    #[serde(default)]
    pub policy_flags: Vec<PolicyFlag>,
    #[serde(default)]
    pub fallback_used: bool,
    #[serde(default)]
    pub ready_for_execution: bool,
    pub created_at: DateTime<Utc>,
}

impl DecisionResponse {
    /// A response that did not run the full cycle.
    pub fn refusal(
        kind: ResponseKind,
        confidence: f64,
        mental_health_status: MentalHealthStatus,
        maturity_level: MaturityLevel,
        warnings: Vec<String>,
        recommendations: Vec<String>,
    ) -> Self {
        Self {
            kind,
            plan_id: Uuid::new_v4(),
            confidence: clamp01(confidence),
            mental_health_status,
            maturity_level,
            trace_id: Uuid::new_v4(),
            warnings,
            recommendations,
            mode: None,
            policy_flags: Vec::new(),
            fallback_used: false,
            ready_for_execution: false,
            created_at: Utc::now(),
        }
    }

    pub fn has_flag(&self, flag: &PolicyFlag) -> bool {
        self.policy_flags.contains(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_defaults_fill_missing_fields() {
        let request: DecisionRequest =
            serde_json::from_value(json!({ "goal": "Test decision" })).expect("parse");
        assert_eq!(request.urgency, 0.5);
        assert_eq!(request.complexity, 0.5);
        assert!(request.context.is_empty());
        assert!(request.personality.is_none());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let err = DecisionRequest::new("x").with_urgency(1.5).validate().unwrap_err();
        assert!(err.contains("urgency"));

        let err = DecisionRequest::new("  ").validate().unwrap_err();
        assert!(err.contains("goal"));

        let personality = PersonalityProfile {
            analytical: 2.0,
            ..PersonalityProfile::default()
        };
        let err = DecisionRequest::new("x")
            .with_personality(personality)
            .validate()
            .unwrap_err();
        assert!(err.contains("personality.analytical"));
    }

    #[test]
    fn context_flags_follow_json_truthiness() {
        let request = DecisionRequest::new("x")
            .with_context("high_stakes", true)
            .with_context("time_sensitive", 0)
            .with_context("requires_analysis", "yes");
        assert!(request.context_flag("high_stakes"));
        assert!(!request.context_flag("time_sensitive"));
        assert!(request.context_flag("requires_analysis"));
        assert!(!request.context_flag("missing"));
    }

    #[test]
    fn constraints_expose_budget_and_time_limit() {
        let request = DecisionRequest::new("x")
            .with_constraint("budget", 500)
            .with_constraint("time_limit", 12.5);
        assert_eq!(request.budget(), Some(500.0));
        assert_eq!(request.time_limit(), Some(12.5));
    }
}
