//! Test-only builders and fake collaborators.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::{Result, anyhow};
use uuid::Uuid;

use crate::core::evaluate::AvailableResources;
use crate::core::maturity::MaturityTracker;
use crate::core::mental_health::MentalHealthMonitor;
use crate::core::plan::{ActionPlan, PlanSummary, Strategy};
use crate::core::request::{DecisionRequest, PersonalityProfile};
use crate::core::trace::DecisionTrace;
use crate::core::types::{DecodingMode, GoalType, MaturityLevel};
use crate::core::utility::WeightVector;
use crate::io::personality::PersonalityMatrix;
use crate::io::policy::{AllowAllPolicy, PolicyCheck, PolicyVerdict};
use crate::io::resources::{ResourceInventory, StaticInventory};
use crate::io::trace_sink::TraceSink;
use crate::orientation::{Collaborators, Orientation};

/// Request with default urgency and complexity and no context.
pub fn request(goal: &str) -> DecisionRequest {
    DecisionRequest::new(goal)
}

pub fn analytical_personality() -> PersonalityProfile {
    PersonalityProfile {
        analytical: 0.9,
        ..PersonalityProfile::default()
    }
}

pub fn creative_personality() -> PersonalityProfile {
    PersonalityProfile {
        creativity: 0.9,
        ..PersonalityProfile::default()
    }
}

/// Analysis plan built from the `strategy` template.
pub fn plan(strategy: Strategy) -> ActionPlan {
    ActionPlan::from_template(
        strategy,
        Uuid::new_v4(),
        GoalType::Analyze,
        "analyze sales",
        DecodingMode::Deep,
    )
}

/// Trace from one adult-level cycle over in-memory fakes.
pub fn sample_trace() -> DecisionTrace {
    let fakes = Fakes::default();
    let mut maturity = MaturityTracker::new(MaturityLevel::Adult);
    let mut monitor = MentalHealthMonitor::default();
    Orientation::default()
        .run_cycle(
            &request("analyze trends"),
            &mut maturity,
            &mut monitor,
            &fakes.collaborators(),
        )
        .expect("sample cycle")
        .trace
}

/// Default in-memory collaborators.
#[derive(Debug, Default)]
pub struct Fakes {
    pub inventory: StaticInventory,
    pub policy: AllowAllPolicy,
    pub traces: MemoryTraceSink,
}

impl Fakes {
    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            inventory: &self.inventory,
            policy: &self.policy,
            traces: &self.traces,
            personality_matrix: None,
        }
    }
}

/// Keeps every emitted trace. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryTraceSink {
    traces: Rc<RefCell<Vec<DecisionTrace>>>,
}

impl MemoryTraceSink {
    pub fn len(&self) -> usize {
        self.traces.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.borrow().is_empty()
    }

    pub fn last(&self) -> Option<DecisionTrace> {
        self.traces.borrow().last().cloned()
    }

    pub fn traces(&self) -> Vec<DecisionTrace> {
        self.traces.borrow().clone()
    }
}

impl TraceSink for MemoryTraceSink {
    fn emit(&self, trace: &DecisionTrace) -> Result<()> {
        self.traces.borrow_mut().push(trace.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FailingTraceSink;

impl TraceSink for FailingTraceSink {
    fn emit(&self, _trace: &DecisionTrace) -> Result<()> {
        Err(anyhow!("trace sink offline"))
    }
}

/// Denies plans with a fixed reason and counts checks. `first(n, ..)`
/// denies only the first `n` checks and approves the rest.
#[derive(Debug, Default)]
pub struct DenyPolicy {
    reason: String,
    limit: Option<usize>,
    checked: Cell<usize>,
    seen: RefCell<Vec<PlanSummary>>,
}

impl DenyPolicy {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
            ..Self::default()
        }
    }

    pub fn first(limit: usize, reason: &str) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new(reason)
        }
    }

    pub fn checked(&self) -> usize {
        self.checked.get()
    }

    pub fn seen(&self) -> Vec<PlanSummary> {
        self.seen.borrow().clone()
    }
}

impl PolicyCheck for DenyPolicy {
    fn check(&self, plan: &PlanSummary) -> Result<PolicyVerdict> {
        let count = self.checked.get() + 1;
        self.checked.set(count);
        self.seen.borrow_mut().push(plan.clone());
        if self.limit.is_some_and(|limit| count > limit) {
            return Ok(PolicyVerdict::approve());
        }
        Ok(PolicyVerdict::deny(self.reason.clone()).with_flag("external_access_denied"))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FailingPolicy;

impl PolicyCheck for FailingPolicy {
    fn check(&self, _plan: &PlanSummary) -> Result<PolicyVerdict> {
        Err(anyhow!("policy service unreachable"))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FailingInventory;

impl ResourceInventory for FailingInventory {
    fn snapshot(&self) -> Result<AvailableResources> {
        Err(anyhow!("inventory unavailable"))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FailingMatrix;

impl PersonalityMatrix for FailingMatrix {
    fn resolve_weights(
        &self,
        _personality: Option<&PersonalityProfile>,
        _level: MaturityLevel,
    ) -> Result<WeightVector> {
        Err(anyhow!("matrix offline"))
    }
}
