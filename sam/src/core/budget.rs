//! Resource allocation estimates and post-hoc budget checks.
//!
//! Budgets are compared after plan generation; nothing here enforces a running
//! deadline.

use serde::{Deserialize, Serialize};

use crate::core::plan::ActionPlan;

pub const TOKENS_PER_SPEND: f64 = 2000.0;
pub const SECONDS_PER_SPEND: f64 = 60.0;
pub const GPU_PER_SPEND: f64 = 0.2;

/// Resources a plan is expected to consume, proportional to its spend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub tokens: f64,
    pub seconds: f64,
    pub gpu: f64,
}

pub fn allocation_for(plan: &ActionPlan) -> Allocation {
    let spend = plan.estimates.spend;
    Allocation {
        tokens: spend * TOKENS_PER_SPEND,
        seconds: spend * SECONDS_PER_SPEND,
        gpu: spend * GPU_PER_SPEND,
    }
}

/// Caller-supplied ceilings from the request constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetLimits {
    pub tokens: Option<f64>,
    pub seconds: Option<f64>,
}

impl BudgetLimits {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_none() && self.seconds.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCheck {
    pub tokens_exceeded: bool,
    pub time_exceeded: bool,
}

impl BudgetCheck {
    pub fn fits(&self) -> bool {
        !self.tokens_exceeded && !self.time_exceeded
    }
}

pub fn check_allocation(allocation: &Allocation, limits: &BudgetLimits) -> BudgetCheck {
    BudgetCheck {
        tokens_exceeded: limits.tokens.is_some_and(|limit| allocation.tokens > limit),
        time_exceeded: limits.seconds.is_some_and(|limit| allocation.seconds > limit),
    }
}

pub fn check_plan(plan: &ActionPlan, limits: &BudgetLimits) -> BudgetCheck {
    check_allocation(&allocation_for(plan), limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plan::Strategy;
    use crate::core::types::{DecodingMode, GoalType};
    use uuid::Uuid;

    fn plan(strategy: Strategy) -> ActionPlan {
        ActionPlan::from_template(strategy, Uuid::new_v4(), GoalType::Tool, "x", DecodingMode::Flow)
    }

    #[test]
    fn allocation_scales_with_spend() {
        let allocation = allocation_for(&plan(Strategy::Conservative));
        assert!((allocation.tokens - 1200.0).abs() < 1e-9);
        assert!((allocation.seconds - 36.0).abs() < 1e-9);
        assert!((allocation.gpu - 0.12).abs() < 1e-9);
    }

    #[test]
    fn missing_limits_always_fit() {
        let check = check_plan(&plan(Strategy::Aggressive), &BudgetLimits::default());
        assert!(check.fits());
    }

    #[test]
    fn limits_flag_each_dimension() {
        let limits = BudgetLimits {
            tokens: Some(1500.0),
            seconds: Some(40.0),
        };
        assert!(check_plan(&plan(Strategy::Conservative), &limits).fits());

        let check = check_plan(&plan(Strategy::Balanced), &limits);
        assert!(check.tokens_exceeded);
        assert!(check.time_exceeded);

        let tokens_only = BudgetLimits {
            tokens: Some(1700.0),
            seconds: None,
        };
        let check = check_plan(&plan(Strategy::Balanced), &tokens_only);
        assert!(!check.tokens_exceeded && !check.time_exceeded);
    }
}
