//! The orientation cycle: Sense, Evaluate, Plan, Act, then Learn.
//!
//! Phases run strictly in order. Everything up to and including trace emission
//! may fail; Learn runs last and cannot, so a failed cycle leaves the maturity
//! tracker and mental-health monitor untouched.

use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::core::budget::{Allocation, BudgetLimits, allocation_for, check_plan};
use crate::core::classifier::analyze_goal;
use crate::core::evaluate::{
    AvailableResources, Evaluation, decoding_mode, mental_health_constraints, perturbation,
    resource_requirements, risk_score, success_criteria,
};
use crate::core::maturity::{
    LearningEventKind, LearningOutcome, LevelConfig, MaturityProfile, MaturityTracker,
    level_config,
};
use crate::core::mental_health::{Intervention, MentalHealthMonitor, MentalHealthSnapshot};
use crate::core::plan::{NO_PII_EXFIL, generate_candidates};
use crate::core::request::{DecisionRequest, DecisionResponse};
use crate::core::selector::{
    ScoredPlan, Selection, by_spend, fallback_indices, fitting, rank, select_best, substitute,
};
use crate::core::trace::{CandidateTrace, DecisionTrace, GuardOutcome};
use crate::core::types::{
    DecisionSummary, MaturityLevel, MentalHealthStatus, PolicyFlag, ResponseKind, clamp01,
};
use crate::core::utility::{ScoringContext, UtilityEngine, WeightVector};
use crate::io::personality::PersonalityMatrix;
use crate::io::policy::PolicyCheck;
use crate::io::resources::ResourceInventory;
use crate::io::trace_sink::TraceSink;

/// Confidence multiplier applied when the policy check rejects the winner.
pub const POLICY_DENIAL_PENALTY: f64 = 0.75;
const HIGH_RISK_REVIEW: f64 = 0.7;
const MAX_VALID_RISK: f64 = 0.9;
const MIN_VALID_QUALITY: f64 = 0.3;
const GATHER_INFO_BELOW: f64 = 0.7;

/// External collaborators consulted during one cycle.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub inventory: &'a dyn ResourceInventory,
    pub policy: &'a dyn PolicyCheck,
    pub traces: &'a dyn TraceSink,
    pub personality_matrix: Option<&'a dyn PersonalityMatrix>,
}

/// Immutable bundle produced by Sense.
#[derive(Debug, Clone)]
pub struct SensedState {
    pub mental_health: MentalHealthSnapshot,
    pub maturity: MaturityProfile,
    pub config: &'static LevelConfig,
    pub vsp: f64,
    pub resources: AvailableResources,
}

/// Everything a completed cycle produced.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub response: DecisionResponse,
    pub trace: DecisionTrace,
    pub summary: DecisionSummary,
    /// New maturity level when Learn triggered a progression.
    pub progressed: Option<MaturityLevel>,
    pub interventions: Vec<Intervention>,
}

struct Planned {
    ranked: Vec<ScoredPlan>,
    selection: Selection,
    weights: WeightVector,
    warnings: Vec<String>,
}

struct Acted {
    winner: usize,
    confidence: f64,
    allocation: Allocation,
    guards: Vec<GuardOutcome>,
    policy_flags: Vec<PolicyFlag>,
    warnings: Vec<String>,
    recommendations: Vec<String>,
    ready: bool,
    fallback_used: bool,
    safety_passed: bool,
}

/// Drives cycles over a fixed utility engine.
#[derive(Debug, Clone, Default)]
pub struct Orientation {
    utility: UtilityEngine,
    cycles: u64,
}

impl Orientation {
    pub fn new(utility: UtilityEngine) -> Self {
        Self { utility, cycles: 0 }
    }

    /// Completed cycles (failed ones are not counted).
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one full cycle for `request`.
    ///
    /// Callers are expected to have applied the maturity and intervention
    /// gates already. On `Err`, neither `maturity` nor `monitor` was touched.
    #[instrument(skip_all, fields(level = %maturity.level(), urgency = request.urgency, complexity = request.complexity))]
    pub fn run_cycle(
        &mut self,
        request: &DecisionRequest,
        maturity: &mut MaturityTracker,
        monitor: &mut MentalHealthMonitor,
        collaborators: &Collaborators<'_>,
    ) -> Result<CycleOutcome> {
        let request_id = Uuid::new_v4();

        let state = sense(request, maturity, monitor, collaborators.inventory)?;
        let evaluation = evaluate(request, &state);
        debug!(
            goal_type = ?evaluation.analysis.goal_type,
            vsp = state.vsp,
            risk = evaluation.risk_score,
            mode = %evaluation.mode,
            "evaluated request"
        );

        let plan_start = Instant::now();
        let mut planned = self.plan(request_id, request, &state, &evaluation, collaborators)?;
        let planning_secs = request
            .context_number("planning_time")
            .unwrap_or_else(|| plan_start.elapsed().as_secs_f64());

        let acted = act(request, &state, &evaluation, &mut planned, collaborators.policy);
        let winner = &planned.ranked[acted.winner];

        let trace = DecisionTrace {
            trace_id: Uuid::new_v4(),
            request_id,
            created_at: Utc::now(),
            goal: request.goal.clone(),
            goal_type: evaluation.analysis.goal_type,
            perturbation: state.vsp,
            mode: evaluation.mode,
            evaluation: evaluation.clone(),
            weights: planned.weights,
            candidates: planned.ranked.iter().map(CandidateTrace::from).collect(),
            winner_id: winner.plan.id,
            selection_reasons: planned.selection.reasons.clone(),
            guards: acted.guards.clone(),
            allocation: acted.allocation,
            resources: state.resources,
            policy_flags: acted.policy_flags.clone(),
            warnings: acted.warnings.clone(),
            mental_health: state.mental_health,
            maturity: state.maturity.clone(),
        };
        collaborators
            .traces
            .emit(&trace)
            .context("emit decision trace")?;

        let summary = DecisionSummary {
            plan_id: winner.plan.id,
            goal: request.goal.clone(),
            goal_type: evaluation.analysis.goal_type,
            complexity: evaluation.effective_complexity,
            urgency: request.urgency,
            confidence: acted.confidence,
            success_rate: if acted.ready { 1.0 } else { 0.0 },
            ready_for_execution: acted.ready,
            seeking_approval: request.context_flag("seeking_approval"),
            planning_secs,
            vsp: state.vsp,
            mental_health_status: state.mental_health.status,
            maturity_level: state.maturity.level,
        };

        let level_before = maturity.level();
        let interventions = learn(request, &summary, acted.safety_passed, maturity, monitor);
        let progressed = (maturity.level() != level_before).then(|| maturity.level());
        let mut recommendations = acted.recommendations;
        recommendations.extend(learning_recommendations(
            state.mental_health.status,
            monitor,
            maturity.level(),
            acted.confidence,
        ));

        self.cycles += 1;
        info!(
            plan_id = %summary.plan_id,
            trace_id = %trace.trace_id,
            confidence = acted.confidence,
            ready = acted.ready,
            fallback = acted.fallback_used,
            "decision cycle complete"
        );

        let response = DecisionResponse {
            kind: ResponseKind::Decided,
            plan_id: summary.plan_id,
            confidence: acted.confidence,
            mental_health_status: monitor.status(),
            maturity_level: maturity.level(),
            trace_id: trace.trace_id,
            warnings: acted.warnings,
            recommendations,
            mode: Some(evaluation.mode),
            policy_flags: acted.policy_flags,
            fallback_used: acted.fallback_used,
            ready_for_execution: acted.ready,
            created_at: trace.created_at,
        };
        Ok(CycleOutcome {
            response,
            trace,
            summary,
            progressed,
            interventions,
        })
    }

    fn plan(
        &self,
        request_id: Uuid,
        request: &DecisionRequest,
        state: &SensedState,
        evaluation: &Evaluation,
        collaborators: &Collaborators<'_>,
    ) -> Result<Planned> {
        let level = state.maturity.level;
        let mut warnings = Vec::new();

        let matrix_weights = match collaborators.personality_matrix {
            Some(matrix) => match matrix.resolve_weights(request.personality.as_ref(), level) {
                Ok(weights) => Some(weights),
                Err(err) => {
                    warn!(err = %format!("{err:#}"), "personality matrix unavailable");
                    warnings.push("Personality matrix unavailable; using internal weights".to_string());
                    None
                }
            },
            None => None,
        };

        let scoring = ScoringContext::new(level)
            .with_personality(request.personality.as_ref())
            .with_context(&request.context)
            .with_matrix_weights(matrix_weights.as_ref());

        let candidates = generate_candidates(
            request_id,
            evaluation.analysis.goal_type,
            &request.goal,
            evaluation.mode,
            level,
        );
        let mut ranked: Vec<ScoredPlan> = candidates
            .into_iter()
            .map(|plan| {
                let score = self.utility.score(&plan, &scoring);
                ScoredPlan { plan, score }
            })
            .collect();
        rank(&mut ranked);

        let selection = select_best(
            &mut ranked,
            state.maturity.confidence_threshold,
            state.config.fallback_plans,
        )
        .ok_or_else(|| anyhow!("no candidate plans generated for level {level}"))?;
        warnings.extend(selection.warnings.iter().cloned());

        Ok(Planned {
            weights: self.utility.resolve_weights(&scoring),
            ranked,
            selection,
            warnings,
        })
    }
}

fn sense(
    request: &DecisionRequest,
    maturity: &MaturityTracker,
    monitor: &MentalHealthMonitor,
    inventory: &dyn ResourceInventory,
) -> Result<SensedState> {
    let mental_health = monitor.snapshot();
    let resources = inventory
        .snapshot()
        .context("query resource inventory")?;
    Ok(SensedState {
        vsp: perturbation(request.complexity, request.urgency, &mental_health.metrics),
        mental_health,
        maturity: maturity.profile().clone(),
        config: level_config(maturity.level()),
        resources,
    })
}

fn evaluate(request: &DecisionRequest, state: &SensedState) -> Evaluation {
    let analysis = analyze_goal(&request.goal, &request.context);
    let goal_type = analysis.goal_type;
    let effective_complexity = analysis.estimated_complexity.max(request.complexity);
    Evaluation {
        risk_score: risk_score(
            effective_complexity,
            request.urgency,
            state.mental_health.status,
            state.maturity.level,
            state.vsp,
        ),
        mode: decoding_mode(request.urgency, effective_complexity, goal_type, state.vsp),
        requirements: resource_requirements(effective_complexity),
        constraints: mental_health_constraints(&state.mental_health.metrics),
        criteria: success_criteria(goal_type, request.time_limit()),
        effective_complexity,
        analysis,
    }
}

/// Policy verdicts for this cycle's candidates. Each plan is checked at most once.
struct PolicyReview<'a> {
    policy: &'a dyn PolicyCheck,
    verdicts: Vec<Option<bool>>,
    flags: Vec<PolicyFlag>,
    warnings: Vec<String>,
    recommendations: Vec<String>,
}

impl<'a> PolicyReview<'a> {
    fn new(policy: &'a dyn PolicyCheck, candidates: usize) -> Self {
        Self {
            policy,
            verdicts: vec![None; candidates],
            flags: Vec::new(),
            warnings: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    /// A collaborator error counts as approval and is flagged.
    fn approves(&mut self, ranked: &[ScoredPlan], index: usize) -> bool {
        if let Some(approved) = self.verdicts[index] {
            return approved;
        }
        let plan = &ranked[index].plan;
        let approved = match self.policy.check(&plan.summary()) {
            Ok(verdict) => {
                for flag in verdict.flags {
                    self.flag(PolicyFlag::External(flag));
                }
                for recommendation in verdict.recommendations {
                    if !self.recommendations.contains(&recommendation) {
                        self.recommendations.push(recommendation);
                    }
                }
                if !verdict.approved {
                    let reason = verdict
                        .reason
                        .unwrap_or_else(|| "no reason given".to_string());
                    warn!(plan_id = %plan.id, reason = %reason, "policy denied plan");
                    let warning = format!("Policy denied plan: {reason}");
                    if !self.warnings.contains(&warning) {
                        self.warnings.push(warning);
                    }
                    self.flag(PolicyFlag::Denied);
                }
                verdict.approved
            }
            Err(err) => {
                warn!(err = %format!("{err:#}"), "policy check unavailable; treating plan as approved");
                self.flag(PolicyFlag::PolicyUnavailable);
                true
            }
        };
        self.verdicts[index] = Some(approved);
        approved
    }

    fn flag(&mut self, flag: PolicyFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }
}

fn act(
    request: &DecisionRequest,
    state: &SensedState,
    evaluation: &Evaluation,
    planned: &mut Planned,
    policy: &dyn PolicyCheck,
) -> Acted {
    let ranked = &mut planned.ranked;
    let mut winner = 0;
    let mut penalty = 1.0;
    let mut flags = Vec::new();
    let mut warnings = std::mem::take(&mut planned.warnings);
    let selection_warnings = warnings.len();
    let mut guards = Vec::new();
    let mut fallback_used = false;
    let mut policy_blocked = false;
    let mut review = PolicyReview::new(policy, ranked.len());

    if planned.selection.low_confidence {
        flags.push(PolicyFlag::LowConfidence);
    }

    if !review.approves(ranked, winner) {
        penalty *= POLICY_DENIAL_PENALTY;
        let order: Vec<usize> = fallback_indices(ranked)
            .into_iter()
            .chain(0..ranked.len())
            .filter(|index| *index != winner)
            .collect();
        match order.into_iter().find(|index| review.approves(ranked, *index)) {
            Some(index) => {
                warnings.push(format!(
                    "Using fallback plan ({}) after policy denial",
                    ranked[index].plan.strategy.as_str()
                ));
                substitute(ranked, winner, index);
                winner = index;
                fallback_used = true;
            }
            None => {
                warn!("no candidate plan passed policy review");
                warnings.push("No candidate plan passed policy review".to_string());
                policy_blocked = true;
            }
        }
    }

    let limits = BudgetLimits {
        tokens: request.budget(),
        seconds: request.time_limit(),
    };
    if !limits.is_empty() {
        let check = check_plan(&ranked[winner].plan, &limits);
        guards.push(GuardOutcome::new("budget", check.fits()));
        if !check.fits() {
            let allocation = allocation_for(&ranked[winner].plan);
            if let (true, Some(limit)) = (check.tokens_exceeded, limits.tokens) {
                flags.push(PolicyFlag::BudgetExceeded);
                warnings.push(format!(
                    "Estimated {:.0} tokens exceed budget {limit:.0}",
                    allocation.tokens
                ));
            }
            if let (true, Some(limit)) = (check.time_exceeded, limits.seconds) {
                flags.push(PolicyFlag::TimeLimitExceeded);
                warnings.push(format!(
                    "Estimated {:.0}s exceeds time limit {limit:.0}s",
                    allocation.seconds
                ));
            }
            // Substitutes must pass policy too; a blocked cycle keeps its plan.
            let replacement = if policy_blocked {
                None
            } else {
                fitting(ranked, &limits)
                    .into_iter()
                    .find(|index| review.approves(ranked, *index))
                    .or_else(|| {
                        by_spend(ranked)
                            .into_iter()
                            .find(|index| review.approves(ranked, *index))
                    })
            };
            if let Some(index) = replacement.filter(|index| *index != winner) {
                debug!(from = winner, to = index, "substituting plan within budget");
                warnings.push(format!(
                    "Using fallback plan ({}) to fit constraints",
                    ranked[index].plan.strategy.as_str()
                ));
                substitute(ranked, winner, index);
                winner = index;
                fallback_used = true;
            }
        }
    }
    guards.insert(0, GuardOutcome::new("policy", !policy_blocked));
    let PolicyReview {
        flags: policy_flags,
        warnings: policy_warnings,
        recommendations,
        ..
    } = review;
    flags.extend(policy_flags);
    warnings.splice(selection_warnings..selection_warnings, policy_warnings);
    if fallback_used {
        flags.push(PolicyFlag::FallbackUsed);
    }

    let plan = &ranked[winner].plan;
    let estimates = plan.estimates;

    let mut issues = Vec::new();
    if plan.steps.is_empty() {
        issues.push("no steps defined");
    }
    if estimates.risk > MAX_VALID_RISK {
        issues.push("risk too high");
    }
    if estimates.quality < MIN_VALID_QUALITY {
        issues.push("quality too low");
    }
    let valid = issues.is_empty();
    if !valid {
        warnings.push(format!("Plan validation failed: {}", issues.join(", ")));
    }
    guards.push(GuardOutcome::new("validation", valid));

    let allocation = allocation_for(plan);
    let allocated = state.resources.can_allocate(&allocation);
    if !allocated {
        warnings.push("Insufficient resources to allocate plan".to_string());
    }
    guards.push(GuardOutcome::new("allocation", allocated));

    let safety_passed = plan.has_policy(NO_PII_EXFIL);
    if estimates.risk > HIGH_RISK_REVIEW {
        warnings.push("High-risk plan requires additional review".to_string());
    }
    if let Some(max_risk) = evaluation.constraints.max_risk {
        if estimates.risk > max_risk {
            warnings.push(format!(
                "Plan risk {:.2} exceeds mental health limit {max_risk:.2}",
                estimates.risk
            ));
        }
    }
    guards.push(GuardOutcome::new("safety", safety_passed));

    Acted {
        confidence: clamp01(ranked[winner].utility() * penalty),
        winner,
        allocation,
        guards,
        policy_flags: flags,
        warnings,
        recommendations,
        ready: valid && allocated && safety_passed && !policy_blocked,
        fallback_used,
        safety_passed,
    }
}

/// Record the decision in both trackers, then cross-feed mental health.
fn learn(
    request: &DecisionRequest,
    summary: &DecisionSummary,
    safety_passed: bool,
    maturity: &mut MaturityTracker,
    monitor: &mut MentalHealthMonitor,
) -> Vec<Intervention> {
    if let Some(personality) = &request.personality {
        monitor.set_personality(Some(personality.clone()));
    }
    maturity.record_decision(summary);
    if !safety_passed {
        maturity.record_learning_event(
            LearningEventKind::SafetyViolation,
            LearningOutcome::default().with_detail("plan_id", summary.plan_id.to_string()),
        );
    }
    monitor.update_from_decision(summary);
    maturity.update_mental_health(monitor, Utc::now())
}

fn learning_recommendations(
    sensed_status: MentalHealthStatus,
    monitor: &MentalHealthMonitor,
    level: MaturityLevel,
    confidence: f64,
) -> Vec<String> {
    let mut recommendations = Vec::new();
    if sensed_status != MentalHealthStatus::Stable {
        recommendations.extend(monitor.intervention_recommendations());
    }
    if level == MaturityLevel::Infant {
        recommendations.push("Consider simpler approaches for complex tasks".to_string());
    }
    if confidence < GATHER_INFO_BELOW {
        recommendations.push("Consider gathering more information before deciding".to_string());
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plan::{PlanSummary, Strategy};
    use crate::core::types::DecodingMode;
    use crate::io::config::PolicyConfig;
    use crate::io::policy::{PolicyVerdict, RulePolicy};
    use crate::test_support::{
        DenyPolicy, FailingInventory, FailingMatrix, FailingPolicy, FailingTraceSink, Fakes,
        request,
    };

    fn run(
        request: &DecisionRequest,
        level: MaturityLevel,
        collaborators: &Collaborators<'_>,
    ) -> (Result<CycleOutcome>, MaturityTracker, MentalHealthMonitor) {
        let mut maturity = MaturityTracker::new(level);
        let mut monitor = MentalHealthMonitor::default();
        let outcome =
            Orientation::default().run_cycle(request, &mut maturity, &mut monitor, collaborators);
        (outcome, maturity, monitor)
    }

    /// Verifies an adult analysis request decides in deep mode and emits one trace.
    #[test]
    fn adult_analysis_runs_full_cycle() {
        let fakes = Fakes::default();
        let req = request("analyze trends").with_complexity(0.8).with_urgency(0.7);
        let (outcome, maturity, _) = run(&req, MaturityLevel::Adult, &fakes.collaborators());
        let outcome = outcome.expect("cycle");

        assert_eq!(outcome.response.kind, ResponseKind::Decided);
        assert!(outcome.response.confidence > 0.0);
        assert_eq!(outcome.response.mode, Some(DecodingMode::Deep));
        assert_eq!(outcome.trace.candidates.len(), 3);
        assert_eq!(fakes.traces.len(), 1);
        assert_eq!(fakes.traces.last().map(|t| t.trace_id), Some(outcome.response.trace_id));
        assert_eq!(maturity.summary().total_decisions, 1);
        assert!(outcome.response.ready_for_execution);
        assert_eq!(outcome.summary.success_rate, 1.0);
    }

    /// Verifies the winner is the top utility and statuses are assigned.
    #[test]
    fn winner_is_highest_utility() {
        let fakes = Fakes::default();
        let req = request("analyze trends");
        let (outcome, _, _) = run(&req, MaturityLevel::Adult, &fakes.collaborators());
        let trace = outcome.expect("cycle").trace;

        let best = trace
            .candidates
            .iter()
            .map(|c| c.utility)
            .fold(f64::MIN, f64::max);
        let winner = trace
            .candidates
            .iter()
            .find(|c| c.plan_id == trace.winner_id)
            .expect("winner in candidates");
        assert_eq!(winner.utility, best);
        assert!(trace.guards.iter().all(|guard| guard.passed));
    }

    /// Verifies a denial substitutes an approved fallback and reduces confidence.
    #[test]
    fn policy_denial_uses_fallback() {
        let fakes = Fakes::default();
        let deny = DenyPolicy::first(1, "external access denied");
        let collaborators = Collaborators {
            policy: &deny,
            ..fakes.collaborators()
        };
        let req = request("explain the result");
        let (outcome, _, _) = run(&req, MaturityLevel::Infant, &collaborators);
        let outcome = outcome.expect("cycle");
        let response = &outcome.response;

        assert!(response.has_flag(&PolicyFlag::Denied));
        assert!(response.has_flag(&PolicyFlag::FallbackUsed));
        assert!(response.fallback_used);
        assert!(response.ready_for_execution);
        assert!(response.warnings.iter().any(|w| w.contains("external access denied")));
        assert!(response
            .warnings
            .iter()
            .any(|w| w.starts_with("Using fallback plan") && w.ends_with("after policy denial")));
        let winner = outcome
            .trace
            .candidates
            .iter()
            .find(|c| c.plan_id == response.plan_id)
            .expect("winner");
        assert!((response.confidence - winner.utility * POLICY_DENIAL_PENALTY).abs() < 1e-9);
        assert_eq!(deny.checked(), 2);
        assert_eq!(deny.seen()[1].plan_id, response.plan_id);
    }

    /// Verifies that when policy rejects every candidate nothing is ready to run.
    #[test]
    fn policy_denying_every_plan_blocks_execution() {
        let fakes = Fakes::default();
        let rules = RulePolicy::from_config(&PolicyConfig {
            max_risk: None,
            denied_tags: vec![NO_PII_EXFIL.to_string()],
        });
        let collaborators = Collaborators {
            policy: &rules,
            ..fakes.collaborators()
        };
        let (outcome, maturity, _) =
            run(&request("analyze trends"), MaturityLevel::Adult, &collaborators);
        let outcome = outcome.expect("cycle");
        let response = &outcome.response;

        assert!(!response.ready_for_execution);
        assert!(!response.fallback_used);
        assert!(response.has_flag(&PolicyFlag::Denied));
        assert!(!response.has_flag(&PolicyFlag::FallbackUsed));
        assert!(response
            .warnings
            .iter()
            .any(|w| w == "No candidate plan passed policy review"));
        let policy_guard = outcome
            .trace
            .guards
            .iter()
            .find(|guard| guard.guard == "policy")
            .expect("policy guard");
        assert!(!policy_guard.passed);
        assert_eq!(outcome.summary.success_rate, 0.0);
        assert!(maturity
            .learning_events()
            .all(|event| event.kind != LearningEventKind::SuccessfulDecision));
    }

    /// Verifies a budget substitute is skipped when policy rejects it.
    #[test]
    fn budget_substitute_must_pass_policy() {
        struct DenyConservative;
        impl PolicyCheck for DenyConservative {
            fn check(&self, plan: &PlanSummary) -> Result<PolicyVerdict> {
                if plan.strategy == Strategy::Conservative {
                    return Ok(PolicyVerdict::deny("conservative plans disabled"));
                }
                Ok(PolicyVerdict::approve())
            }
        }

        let fakes = Fakes::default();
        let collaborators = Collaborators {
            policy: &DenyConservative,
            ..fakes.collaborators()
        };
        // No candidate fits 10 tokens; conservative is the cheapest but denied.
        let req = request("write a summary").with_constraint("budget", 10);
        let (outcome, _, _) = run(&req, MaturityLevel::Adult, &collaborators);
        let outcome = outcome.expect("cycle");
        let winner = outcome
            .trace
            .candidates
            .iter()
            .find(|c| c.plan_id == outcome.response.plan_id)
            .expect("winner");

        assert_eq!(winner.strategy, Strategy::Balanced);
        assert!(outcome.response.has_flag(&PolicyFlag::BudgetExceeded));
        assert!(outcome.response.ready_for_execution);
    }

    #[test]
    fn policy_error_is_treated_as_approved() {
        let fakes = Fakes::default();
        let collaborators = Collaborators {
            policy: &FailingPolicy,
            ..fakes.collaborators()
        };
        let (outcome, _, _) = run(&request("analyze trends"), MaturityLevel::Adult, &collaborators);
        let response = outcome.expect("cycle").response;
        assert!(response.has_flag(&PolicyFlag::PolicyUnavailable));
        assert!(!response.fallback_used);
    }

    /// Verifies a tight time limit swaps in a cheaper plan with a warning.
    #[test]
    fn time_limit_forces_cheaper_plan() {
        let fakes = Fakes::default();
        // Conservative spend 0.6 -> 36s; balanced 0.8 -> 48s; aggressive 1.0 -> 60s.
        let req = request("write a summary").with_constraint("time_limit", 40);
        let (outcome, _, _) = run(&req, MaturityLevel::Adult, &fakes.collaborators());
        let outcome = outcome.expect("cycle");
        let winner = outcome
            .trace
            .candidates
            .iter()
            .find(|c| c.plan_id == outcome.response.plan_id)
            .expect("winner");
        assert_eq!(winner.strategy, Strategy::Conservative);
        if outcome.trace.candidates[0].strategy != Strategy::Conservative {
            assert!(outcome.response.has_flag(&PolicyFlag::TimeLimitExceeded));
            assert!(outcome.response.warnings.iter().any(|w| w.contains("time limit")));
            assert!(outcome.response.fallback_used);
        }
    }

    #[test]
    fn impossible_budget_keeps_lowest_spend_with_warning() {
        let fakes = Fakes::default();
        let req = request("write a summary").with_constraint("budget", 10);
        let (outcome, _, _) = run(&req, MaturityLevel::Adult, &fakes.collaborators());
        let outcome = outcome.expect("cycle");
        let winner = outcome
            .trace
            .candidates
            .iter()
            .find(|c| c.plan_id == outcome.response.plan_id)
            .expect("winner");
        assert_eq!(winner.strategy, Strategy::Conservative);
        assert!(outcome.response.has_flag(&PolicyFlag::BudgetExceeded));
        assert!(outcome.response.warnings.iter().any(|w| w.contains("budget")));
        if outcome.trace.candidates[0].strategy != Strategy::Conservative {
            assert!(outcome
                .response
                .warnings
                .iter()
                .any(|w| w == "Using fallback plan (conservative) to fit constraints"));
        }
    }

    /// Verifies a trace failure aborts the cycle before Learn mutates state.
    #[test]
    fn trace_failure_leaves_state_untouched() {
        let fakes = Fakes::default();
        let collaborators = Collaborators {
            traces: &FailingTraceSink,
            ..fakes.collaborators()
        };
        let (outcome, maturity, monitor) =
            run(&request("analyze trends"), MaturityLevel::Adult, &collaborators);
        let err = outcome.unwrap_err();
        assert!(format!("{err:#}").contains("emit decision trace"));
        assert_eq!(maturity, MaturityTracker::new(MaturityLevel::Adult));
        assert_eq!(monitor, MentalHealthMonitor::default());
    }

    #[test]
    fn inventory_failure_fails_cycle() {
        let fakes = Fakes::default();
        let collaborators = Collaborators {
            inventory: &FailingInventory,
            ..fakes.collaborators()
        };
        let (outcome, _, _) = run(&request("analyze trends"), MaturityLevel::Adult, &collaborators);
        assert!(format!("{:#}", outcome.unwrap_err()).contains("resource inventory"));
    }

    #[test]
    fn matrix_failure_degrades_to_internal_weights() {
        let fakes = Fakes::default();
        let collaborators = Collaborators {
            personality_matrix: Some(&FailingMatrix),
            ..fakes.collaborators()
        };
        let (outcome, _, _) = run(&request("analyze trends"), MaturityLevel::Adult, &collaborators);
        let outcome = outcome.expect("cycle");
        assert!(outcome
            .response
            .warnings
            .iter()
            .any(|w| w.contains("Personality matrix unavailable")));
        assert_eq!(outcome.trace.weights, WeightVector::for_level(MaturityLevel::Adult));
    }

    #[test]
    fn infant_gets_simpler_approach_hint() {
        let fakes = Fakes::default();
        let req = request("what is rust").with_complexity(0.2).with_urgency(0.2);
        let (outcome, _, _) = run(&req, MaturityLevel::Infant, &fakes.collaborators());
        let response = outcome.expect("cycle").response;
        assert!(response
            .recommendations
            .iter()
            .any(|r| r == "Consider simpler approaches for complex tasks"));
        assert!(response.has_flag(&PolicyFlag::LowConfidence));
    }

    #[test]
    fn planning_time_override_reaches_summary() {
        let fakes = Fakes::default();
        let req = request("analyze trends").with_context("planning_time", 2.5);
        let (outcome, _, _) = run(&req, MaturityLevel::Adult, &fakes.collaborators());
        assert_eq!(outcome.expect("cycle").summary.planning_secs, 2.5);
    }
}
