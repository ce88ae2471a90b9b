//! End-to-end scenarios for `DecisionEngine`.
//!
//! Each test drives the public engine API over in-memory state and fake
//! collaborators, then checks the response together with the persisted
//! maturity and mental-health state.

use sam::core::maturity::{LearningEventKind, level_config};
use sam::core::mental_health::ThoughtPattern;
use sam::core::types::{DecodingMode, MaturityLevel, MentalHealthStatus, PolicyFlag, ResponseKind};
use sam::engine::{CYCLE_FAILURE_CONFIDENCE, DecisionEngine, RESET_TO_RESUME};
use sam::io::config::{EngineConfig, PolicyConfig};
use sam::io::state_store::{EngineSnapshot, MemoryStateStore};
use sam::test_support::{
    DenyPolicy, FailingTraceSink, MemoryTraceSink, analytical_personality, creative_personality,
    request,
};

fn engine_at(level: MaturityLevel) -> (DecisionEngine, MemoryStateStore) {
    let store = MemoryStateStore::new();
    let config = EngineConfig {
        initial_level: level,
        ..EngineConfig::default()
    };
    let engine = DecisionEngine::new(config, Box::new(store.clone())).expect("engine");
    (engine, store)
}

/// Verifies an infant refuses work beyond its envelope without running a cycle.
#[test]
fn infant_refuses_complex_urgent_request() {
    let (engine, store) = engine_at(MaturityLevel::Infant);
    let traces = MemoryTraceSink::default();
    let mut engine = engine.with_trace_sink(Box::new(traces.clone()));

    let response = engine.decide(request("launch the rocket").with_complexity(0.9).with_urgency(0.9));

    assert_eq!(response.kind, ResponseKind::ConstraintViolation);
    assert_eq!(response.confidence, 0.0);
    assert!(!response.ready_for_execution);
    assert!(response
        .warnings
        .iter()
        .any(|w| w.contains("exceeds maturity level infant")));
    assert!(traces.is_empty());
    assert_eq!(engine.performance().total_requests, 1);
    assert_eq!(engine.performance().refused(), 1);
    assert_eq!(store.saves(), 1);
}

/// Verifies an adult completes an analysis request in deep mode.
#[test]
fn adult_analysis_decides_in_deep_mode() {
    let (engine, store) = engine_at(MaturityLevel::Adult);
    let traces = MemoryTraceSink::default();
    let mut engine = engine.with_trace_sink(Box::new(traces.clone()));

    let response = engine.decide(request("analyze trends").with_complexity(0.8).with_urgency(0.7));

    assert_eq!(response.kind, ResponseKind::Decided);
    assert!(response.confidence > 0.0);
    assert_eq!(response.mode, Some(DecodingMode::Deep));
    assert_eq!(response.maturity_level, MaturityLevel::Adult);
    assert_eq!(traces.len(), 1);
    assert_eq!(traces.last().map(|t| t.trace_id), Some(response.trace_id));

    let saved = store.last().expect("snapshot saved");
    assert_eq!(saved.performance.successful_decisions, 1);
    assert_eq!(saved.maturity.summary().total_decisions, 1);
}

/// Verifies repeated similar thoughts mark the engine recursive and that
/// reconciliation resets the counter and raises supervision.
#[test]
fn recursive_thoughts_are_detected_and_reconciled() {
    let (mut engine, _store) = engine_at(MaturityLevel::Infant);
    for _ in 0..4 {
        engine.record_thought_pattern(ThoughtPattern::new("analysis", 4, 0.9));
    }

    let metrics = *engine.mental_health().metrics();
    assert!(metrics.recursive_loop_count >= 3);
    assert_eq!(engine.mental_health().status(), MentalHealthStatus::Recursive);
    assert!(engine.should_intervene());

    let refused = engine.decide(request("what is rust").with_complexity(0.1).with_urgency(0.1));
    assert_eq!(refused.kind, ResponseKind::ConstraintViolation);
    assert!(refused
        .warnings
        .iter()
        .any(|w| w == "Too many recursive loops detected"));

    let supervision_before = engine.maturity().profile().supervision_level;
    let applied = engine.reconcile_mental_health();

    assert!(!applied.is_empty());
    assert_eq!(engine.mental_health().metrics().recursive_loop_count, 0);
    let expected = (supervision_before + 0.2).min(1.0);
    assert!((engine.maturity().profile().supervision_level - expected).abs() < 1e-9);
    assert_eq!(engine.mental_health().status(), MentalHealthStatus::Stable);
}

/// Verifies personality traits change the weights recorded in the trace.
#[test]
fn personality_shifts_resolved_weights() {
    let (engine, _store) = engine_at(MaturityLevel::Adult);
    let traces = MemoryTraceSink::default();
    let mut engine = engine.with_trace_sink(Box::new(traces.clone()));

    engine.decide(request("analyze trends").with_personality(analytical_personality()));
    engine.decide(request("analyze trends").with_personality(creative_personality()));

    let recorded = traces.traces();
    assert_eq!(recorded.len(), 2);
    assert_ne!(recorded[0].weights, recorded[1].weights);
}

/// Verifies a policy denial falls back to another plan with a reduced score.
#[test]
fn policy_denial_falls_back() {
    let (engine, _store) = engine_at(MaturityLevel::Child);
    let mut engine =
        engine.with_policy(Box::new(DenyPolicy::first(1, "external access denied")));

    let response = engine.decide(request("explain the result").with_complexity(0.3).with_urgency(0.3));

    assert_eq!(response.kind, ResponseKind::Decided);
    assert!(response.has_flag(&PolicyFlag::Denied));
    assert!(response.fallback_used);
    assert!(response.ready_for_execution);
    assert!(response
        .warnings
        .iter()
        .any(|w| w.starts_with("Policy denied plan")));
    assert!(response
        .warnings
        .iter()
        .any(|w| w.starts_with("Using fallback plan")));
}

/// Verifies a configured rule that rejects every candidate leaves nothing
/// ready to execute and earns no success credit.
#[test]
fn policy_rejecting_all_plans_is_not_ready() {
    let store = MemoryStateStore::new();
    let config = EngineConfig {
        initial_level: MaturityLevel::Child,
        policy: PolicyConfig {
            max_risk: None,
            denied_tags: vec!["no_pii_exfil".to_string()],
        },
        ..EngineConfig::default()
    };
    let mut engine = DecisionEngine::new(config, Box::new(store)).expect("engine");

    let response = engine.decide(request("explain the result").with_complexity(0.3).with_urgency(0.3));

    assert_eq!(response.kind, ResponseKind::Decided);
    assert!(!response.ready_for_execution);
    assert!(!response.fallback_used);
    assert!(response.has_flag(&PolicyFlag::Denied));
    assert!(response
        .warnings
        .iter()
        .any(|w| w == "No candidate plan passed policy review"));
    assert!(engine
        .maturity()
        .learning_events()
        .all(|event| event.kind != LearningEventKind::SuccessfulDecision));
}

/// Verifies executable decisions alone build the track record an infant
/// needs to become a child.
#[test]
fn successful_decisions_progress_infant_to_child() {
    let (mut engine, _store) = engine_at(MaturityLevel::Infant);
    engine.advance_age(6);

    let mut decided = 0;
    while engine.maturity().level() == MaturityLevel::Infant && decided < 60 {
        // Each cycle adds a little stress that refused requests cannot shed.
        if decided % 10 == 9 {
            engine.reset_mental_health();
        }
        let response = engine.decide(request("what is rust").with_complexity(0.1).with_urgency(0.0));
        assert_eq!(response.kind, ResponseKind::Decided);
        assert!(response.ready_for_execution);
        decided += 1;
    }

    assert_eq!(engine.maturity().level(), MaturityLevel::Child);
    assert!(engine.maturity().profile().experience_points >= 600);
    assert!(decided >= 30);
}

/// Verifies an intervention refusal points at the reset that clears it.
#[test]
fn intervention_refusal_persists_until_reset() {
    let (mut engine, _store) = engine_at(MaturityLevel::Adult);
    let demanding = || request("analyze trends").with_complexity(0.8).with_urgency(0.8);

    let mut refused = None;
    for _ in 0..100 {
        let response = engine.decide(demanding());
        if response.kind == ResponseKind::InterventionRequired {
            refused = Some(response);
            break;
        }
    }
    let refused = refused.expect("sustained load triggers an intervention");
    assert!(refused.recommendations.iter().any(|r| r == RESET_TO_RESUME));

    let metrics_before = *engine.mental_health().metrics();
    let again = engine.decide(demanding());
    assert_eq!(again.kind, ResponseKind::InterventionRequired);
    assert_eq!(*engine.mental_health().metrics(), metrics_before);

    engine.reset_mental_health();
    assert_eq!(engine.decide(demanding()).kind, ResponseKind::Decided);
}

/// Verifies a budget below every candidate keeps the cheapest plan and warns.
#[test]
fn tight_budget_flags_and_warns() {
    let (mut engine, _store) = engine_at(MaturityLevel::Adult);
    let response = engine.decide(request("write a summary").with_constraint("budget", 10));

    assert_eq!(response.kind, ResponseKind::Decided);
    assert!(response.has_flag(&PolicyFlag::BudgetExceeded));
    assert!(response.warnings.iter().any(|w| w.contains("exceed budget")));
}

/// Verifies a cycle failure returns the fixed fallback and leaves learning untouched.
#[test]
fn trace_failure_returns_cycle_failure() {
    let (engine, store) = engine_at(MaturityLevel::Adult);
    let mut engine = engine.with_trace_sink(Box::new(FailingTraceSink));

    let response = engine.decide(request("analyze trends"));

    assert_eq!(response.kind, ResponseKind::CycleFailed);
    assert_eq!(response.confidence, CYCLE_FAILURE_CONFIDENCE);
    assert_eq!(
        response.recommendations,
        vec!["Use simpler approach", "Request human assistance"]
    );
    assert_eq!(engine.maturity().summary().total_decisions, 0);
    assert_eq!(engine.performance().failed_decisions, 1);
    assert_eq!(store.last().map(|s| s.performance.failed_decisions), Some(1));
}

/// Verifies invalid numeric inputs are refused before any cycle runs.
#[test]
fn out_of_range_urgency_is_refused() {
    let (mut engine, _store) = engine_at(MaturityLevel::Adult);
    let response = engine.decide(request("analyze trends").with_urgency(1.4));

    assert_eq!(response.kind, ResponseKind::ConstraintViolation);
    assert!(response.warnings[0].starts_with("Invalid request"));
}

/// Verifies confidence stays in `[0, 1]` and maturity never regresses.
#[test]
fn confidence_bounded_and_level_monotonic() {
    let (mut engine, _store) = engine_at(MaturityLevel::Infant);
    let goals = [
        "answer a basic question",
        "analyze data and create report",
        "plan the migration",
        "write a poem",
        "search the docs",
    ];
    let mut last_level = engine.maturity().level();
    for i in 0..40 {
        let goal = goals[i % goals.len()];
        let complexity = (i % 10) as f64 / 10.0;
        let urgency = ((i * 3) % 10) as f64 / 10.0;
        let response = engine.decide(
            request(goal)
                .with_complexity(complexity)
                .with_urgency(urgency),
        );
        assert!((0.0..=1.0).contains(&response.confidence));
        let level = engine.maturity().level();
        assert!(level >= last_level);
        last_level = level;
        if i % 8 == 0 {
            engine.advance_age(6);
        }
    }
    assert!(engine.force_progression(last_level).is_err());
}

/// Verifies hand-edited level parameters are restored from the level table on load.
#[test]
fn resumed_profile_matches_level_table() {
    let (mut engine, store) = engine_at(MaturityLevel::Child);
    engine.decide(request("explain the result").with_complexity(0.3).with_urgency(0.3));
    let saved = store.last().expect("snapshot saved");
    let experience = saved.maturity.profile().experience_points;

    let mut value = serde_json::to_value(&saved).expect("serialize snapshot");
    value["maturity"]["profile"]["confidence_threshold"] = serde_json::json!(0.05);
    value["maturity"]["profile"]["risk_tolerance"] = serde_json::json!(1.0);
    let edited: EngineSnapshot = serde_json::from_value(value).expect("edited snapshot");

    let resumed = DecisionEngine::new(
        EngineConfig::default(),
        Box::new(MemoryStateStore::with_snapshot(edited)),
    )
    .expect("resume");
    let profile = resumed.maturity().profile();
    let table = level_config(MaturityLevel::Child);
    assert_eq!(profile.level, MaturityLevel::Child);
    assert_eq!(profile.confidence_threshold, table.confidence_threshold);
    assert_eq!(profile.risk_tolerance, table.risk_tolerance);
    assert_eq!(profile.experience_points, experience);
}

/// Verifies state saved by one engine is resumed by the next.
#[test]
fn state_survives_restart() {
    let (mut engine, store) = engine_at(MaturityLevel::Child);
    engine.decide(request("explain the result").with_complexity(0.3).with_urgency(0.3));
    engine.force_progression(MaturityLevel::Adult).expect("promote");
    engine.shutdown().expect("shutdown");

    let resumed = DecisionEngine::new(
        EngineConfig {
            initial_level: MaturityLevel::Infant,
            ..EngineConfig::default()
        },
        Box::new(store.clone()),
    )
    .expect("resume");
    assert_eq!(resumed.maturity().level(), MaturityLevel::Adult);
    assert_eq!(resumed.performance().successful_decisions, 1);
}
