//! Policy checks applied to the selected plan during Act.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::plan::PlanSummary;
use crate::io::config::PolicyConfig;

/// Answer from a policy collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl PolicyVerdict {
    pub fn approve() -> Self {
        Self {
            approved: true,
            ..Self::default()
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }
}

pub trait PolicyCheck {
    fn check(&self, plan: &PlanSummary) -> Result<PolicyVerdict>;
}

/// Approves every plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllPolicy;

impl PolicyCheck for AllowAllPolicy {
    fn check(&self, _plan: &PlanSummary) -> Result<PolicyVerdict> {
        Ok(PolicyVerdict::approve())
    }
}

/// Static rules from `[policy]` in config.
#[derive(Debug, Clone, Default)]
pub struct RulePolicy {
    max_risk: Option<f64>,
    denied_tags: Vec<String>,
}

impl RulePolicy {
    pub fn from_config(config: &PolicyConfig) -> Self {
        Self {
            max_risk: config.max_risk,
            denied_tags: config.denied_tags.clone(),
        }
    }

    fn denied_tag<'a>(&'a self, plan: &PlanSummary) -> Option<&'a str> {
        self.denied_tags
            .iter()
            .find(|tag| {
                plan.policies.iter().any(|policy| policy == *tag)
                    || plan.tools.iter().any(|tool| tool == *tag)
            })
            .map(String::as_str)
    }
}

impl PolicyCheck for RulePolicy {
    fn check(&self, plan: &PlanSummary) -> Result<PolicyVerdict> {
        if let Some(max_risk) = self.max_risk {
            if plan.estimates.risk > max_risk {
                debug!(plan_id = %plan.plan_id, risk = plan.estimates.risk, max_risk, "policy denied on risk");
                return Ok(PolicyVerdict::deny(format!(
                    "risk {:.2} exceeds policy limit {:.2}",
                    plan.estimates.risk, max_risk
                ))
                .with_flag("risk_limit"));
            }
        }
        if let Some(tag) = self.denied_tag(plan) {
            debug!(plan_id = %plan.plan_id, tag, "policy denied on tag");
            return Ok(PolicyVerdict::deny(format!("plan uses denied tag {tag}"))
                .with_flag(format!("denied:{tag}")));
        }
        Ok(PolicyVerdict::approve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plan::Strategy;
    use crate::test_support::plan;

    fn summary(strategy: Strategy) -> PlanSummary {
        plan(strategy).summary()
    }

    #[test]
    fn allow_all_approves() {
        let verdict = AllowAllPolicy
            .check(&summary(Strategy::Aggressive))
            .expect("check");
        assert!(verdict.approved);
        assert!(verdict.reason.is_none());
    }

    /// Verifies risk limits deny riskier plans and pass safer ones.
    #[test]
    fn rule_policy_denies_over_risk_limit() {
        let policy = RulePolicy::from_config(&PolicyConfig {
            max_risk: Some(0.3),
            denied_tags: Vec::new(),
        });
        let denied = policy.check(&summary(Strategy::Balanced)).expect("check");
        assert!(!denied.approved);
        assert!(denied.reason.as_deref().unwrap_or_default().contains("risk"));
        assert_eq!(denied.flags, vec!["risk_limit".to_string()]);

        let approved = policy.check(&summary(Strategy::Conservative)).expect("check");
        assert!(approved.approved);
    }

    #[test]
    fn rule_policy_denies_tool_tags() {
        let policy = RulePolicy::from_config(&PolicyConfig {
            max_risk: None,
            denied_tags: vec!["tool_5".to_string()],
        });
        // Balanced plans stop at tool_3; aggressive ones reach tool_5.
        assert!(policy.check(&summary(Strategy::Balanced)).expect("check").approved);
        let verdict = policy.check(&summary(Strategy::Aggressive)).expect("check");
        assert!(!verdict.approved);
        assert_eq!(verdict.flags, vec!["denied:tool_5".to_string()]);
    }
}
