//! Deterministic ranking and selection of scored candidates.

use std::cmp::Ordering;

use crate::core::budget::{BudgetLimits, check_plan};
use crate::core::plan::ActionPlan;
use crate::core::types::PlanStatus;
use crate::core::utility::UtilityResult;

/// A candidate together with its score for this cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPlan {
    pub plan: ActionPlan,
    pub score: UtilityResult,
}

impl ScoredPlan {
    pub fn utility(&self) -> f64 {
        self.score.utility
    }
}

/// Sort descending by utility. Ties keep template order.
pub fn rank(candidates: &mut [ScoredPlan]) {
    candidates.sort_by(|a, b| {
        b.utility()
            .partial_cmp(&a.utility())
            .unwrap_or(Ordering::Equal)
    });
}

/// Outcome of picking the top-ranked candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub warnings: Vec<String>,
    pub low_confidence: bool,
}

/// Select the head of a ranked list and mark statuses.
///
/// Returns `None` for an empty list. Index 0 becomes `selected`, the next
/// `fallback_count - 1` become `fallback`, the rest `rejected`.
pub fn select_best(
    ranked: &mut [ScoredPlan],
    confidence_threshold: f64,
    fallback_count: usize,
) -> Option<Selection> {
    let fallbacks = fallback_count.saturating_sub(1);
    for (index, candidate) in ranked.iter_mut().enumerate() {
        candidate.plan.status = match index {
            0 => PlanStatus::Selected,
            i if i <= fallbacks => PlanStatus::Fallback,
            _ => PlanStatus::Rejected,
        };
    }

    let winner = ranked.first()?;
    let confidence = winner.utility();
    let mut reasons = Vec::new();
    if confidence > 0.7 {
        reasons.push("high utility score".to_string());
    }
    if winner.score.quality > 0.7 {
        reasons.push("high quality estimate".to_string());
    }
    if winner.score.risk < 0.5 {
        reasons.push("low risk estimate".to_string());
    }

    let low_confidence = confidence < confidence_threshold;
    let warnings = if low_confidence {
        vec![format!(
            "Low confidence ({confidence:.3} < {confidence_threshold:.3})"
        )]
    } else {
        Vec::new()
    };

    Some(Selection {
        confidence,
        reasons,
        warnings,
        low_confidence,
    })
}

/// Indices of prepared fallbacks, best first.
pub fn fallback_indices(ranked: &[ScoredPlan]) -> Vec<usize> {
    ranked
        .iter()
        .enumerate()
        .filter(|(_, candidate)| candidate.plan.status == PlanStatus::Fallback)
        .map(|(index, _)| index)
        .collect()
}

/// Swap the winner for the candidate at `index`.
pub fn substitute(ranked: &mut [ScoredPlan], winner: usize, index: usize) {
    if winner == index {
        return;
    }
    ranked[winner].plan.status = PlanStatus::Rejected;
    ranked[index].plan.status = PlanStatus::Selected;
}

/// Indices whose allocation fits `limits`, in ranked order.
pub fn fitting(ranked: &[ScoredPlan], limits: &BudgetLimits) -> Vec<usize> {
    ranked
        .iter()
        .enumerate()
        .filter(|(_, candidate)| check_plan(&candidate.plan, limits).fits())
        .map(|(index, _)| index)
        .collect()
}

/// Indices by ascending spend estimate. Earlier rank wins ties.
pub fn by_spend(ranked: &[ScoredPlan]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..ranked.len()).collect();
    order.sort_by(|&a, &b| {
        ranked[a]
            .plan
            .estimates
            .spend
            .partial_cmp(&ranked[b].plan.estimates.spend)
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plan::{Strategy, generate_candidates};
    use crate::core::types::{DecodingMode, GoalType, MaturityLevel};
    use crate::core::utility::{ScoringContext, UtilityEngine};
    use uuid::Uuid;

    fn scored(level: MaturityLevel) -> Vec<ScoredPlan> {
        let engine = UtilityEngine::default();
        generate_candidates(Uuid::new_v4(), GoalType::Analyze, "x", DecodingMode::Deep, level)
            .into_iter()
            .map(|plan| {
                let score = engine.score(&plan, &ScoringContext::new(level));
                ScoredPlan { plan, score }
            })
            .collect()
    }

    #[test]
    fn rank_orders_by_descending_utility() {
        let mut candidates = scored(MaturityLevel::Adult);
        rank(&mut candidates);
        assert!(
            candidates
                .windows(2)
                .all(|pair| pair[0].utility() >= pair[1].utility())
        );
        assert_eq!(candidates[0].plan.strategy, Strategy::Conservative);
    }

    #[test]
    fn select_best_marks_statuses_and_warns_on_low_confidence() {
        let mut candidates = scored(MaturityLevel::Adult);
        rank(&mut candidates);
        let selection = select_best(&mut candidates, 0.6, 2).expect("selection");
        assert!(selection.low_confidence);
        assert!(selection.warnings[0].starts_with("Low confidence (0.119 < 0.600)"));
        assert!(selection.reasons.contains(&"low risk estimate".to_string()));
        assert_eq!(candidates[0].plan.status, PlanStatus::Selected);
        assert_eq!(candidates[1].plan.status, PlanStatus::Fallback);
        assert_eq!(candidates[2].plan.status, PlanStatus::Rejected);
        assert_eq!(fallback_indices(&candidates), vec![1]);
    }

    #[test]
    fn select_best_on_empty_list_is_none() {
        let mut empty: Vec<ScoredPlan> = Vec::new();
        assert!(select_best(&mut empty, 0.5, 1).is_none());
    }

    #[test]
    fn fitting_keeps_only_candidates_within_budget() {
        let mut candidates = scored(MaturityLevel::Adult);
        rank(&mut candidates);
        let limits = BudgetLimits {
            tokens: Some(1300.0),
            seconds: None,
        };
        // Only the conservative plan (1200 tokens) fits.
        assert_eq!(fitting(&candidates, &limits), vec![0]);
        let order = by_spend(&candidates);
        assert_eq!(order.len(), 3);
        assert_eq!(order[0], 0);
        assert!(order.windows(2).all(|pair| {
            candidates[pair[0]].plan.estimates.spend <= candidates[pair[1]].plan.estimates.spend
        }));
    }

    #[test]
    fn substitute_swaps_statuses() {
        let mut candidates = scored(MaturityLevel::Child);
        rank(&mut candidates);
        select_best(&mut candidates, 0.8, 3).expect("selection");
        substitute(&mut candidates, 0, 1);
        assert_eq!(candidates[0].plan.status, PlanStatus::Rejected);
        assert_eq!(candidates[1].plan.status, PlanStatus::Selected);
    }
}
