//! Multi-factor plan scoring.
//!
//! `U = clamp01(w_g·G + w_q·Q − w_r·R − w_s·S)`. The weight vector starts from a
//! per-level table, is optionally averaged with an external personality matrix,
//! then tilted by personality traits and context flags. Scoring is a pure
//! function of its inputs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::plan::{ActionPlan, NO_PII_EXFIL};
use crate::core::request::{PersonalityProfile, context_flag};
use crate::core::types::{GoalType, MaturityLevel, StepKind, clamp01};

/// Trait value above which a personality tilt applies.
const TRAIT_TILT_THRESHOLD: f64 = 0.7;
const HIGH_COMPONENT: f64 = 0.7;
const LOW_COMPONENT: f64 = 0.4;
const BASE_GOAL_SATISFACTION: f64 = 0.5;
/// Share of the plan's own quality estimate in Q; the rest comes from heuristics.
const QUALITY_ESTIMATE_SHARE: f64 = 0.7;

/// Seven-key weight vector. The first four drive `U`; the personality factors
/// (`novelty`, `rigor`, `safety`) are reported in the breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    pub goal: f64,
    pub quality: f64,
    pub risk: f64,
    pub spend: f64,
    pub novelty: f64,
    pub rigor: f64,
    pub safety: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightKey {
    Goal,
    Quality,
    Risk,
    Spend,
    Novelty,
    Rigor,
    Safety,
}

type Tilt = &'static [(WeightKey, f64)];

const ANALYTICAL_TILT: Tilt = &[
    (WeightKey::Quality, 1.2),
    (WeightKey::Risk, 1.1),
    (WeightKey::Goal, 0.9),
    (WeightKey::Rigor, 1.3),
    (WeightKey::Novelty, 0.8),
];
const CREATIVE_TILT: Tilt = &[
    (WeightKey::Goal, 1.1),
    (WeightKey::Quality, 1.1),
    (WeightKey::Spend, 0.9),
    (WeightKey::Novelty, 1.4),
    (WeightKey::Rigor, 0.8),
];
const SOCIAL_TILT: Tilt = &[
    (WeightKey::Goal, 1.05),
    (WeightKey::Spend, 0.95),
    (WeightKey::Safety, 1.1),
];
const ASSERTIVE_TILT: Tilt = &[
    (WeightKey::Risk, 0.8),
    (WeightKey::Goal, 1.05),
    (WeightKey::Safety, 0.9),
];
const PATIENT_TILT: Tilt = &[
    (WeightKey::Quality, 1.1),
    (WeightKey::Spend, 0.9),
    (WeightKey::Rigor, 1.2),
    (WeightKey::Novelty, 0.9),
];

const CONTEXT_TILTS: &[(&str, Tilt)] = &[
    (
        "high_stakes",
        &[
            (WeightKey::Safety, 1.3),
            (WeightKey::Quality, 1.2),
            (WeightKey::Risk, 0.7),
        ],
    ),
    (
        "time_sensitive",
        &[(WeightKey::Spend, 1.2), (WeightKey::Rigor, 0.8)],
    ),
    (
        "requires_creativity",
        &[(WeightKey::Novelty, 1.3), (WeightKey::Goal, 1.1)],
    ),
    (
        "requires_analysis",
        &[(WeightKey::Rigor, 1.3), (WeightKey::Quality, 1.2)],
    ),
];

impl WeightVector {
    /// Base weights for a maturity level.
    pub fn for_level(level: MaturityLevel) -> Self {
        let (goal, quality, risk, spend, novelty, rigor, safety) = match level {
            MaturityLevel::Infant => (0.4, 0.3, 0.2, 0.1, 0.1, 0.8, 0.9),
            MaturityLevel::Child => (0.35, 0.3, 0.2, 0.15, 0.2, 0.7, 0.8),
            MaturityLevel::Adolescent => (0.3, 0.3, 0.2, 0.2, 0.4, 0.6, 0.7),
            MaturityLevel::Adult => (0.25, 0.3, 0.2, 0.25, 0.6, 0.5, 0.6),
        };
        Self {
            goal,
            quality,
            risk,
            spend,
            novelty,
            rigor,
            safety,
        }
    }

    pub fn get(&self, key: WeightKey) -> f64 {
        match key {
            WeightKey::Goal => self.goal,
            WeightKey::Quality => self.quality,
            WeightKey::Risk => self.risk,
            WeightKey::Spend => self.spend,
            WeightKey::Novelty => self.novelty,
            WeightKey::Rigor => self.rigor,
            WeightKey::Safety => self.safety,
        }
    }

    fn slot(&mut self, key: WeightKey) -> &mut f64 {
        match key {
            WeightKey::Goal => &mut self.goal,
            WeightKey::Quality => &mut self.quality,
            WeightKey::Risk => &mut self.risk,
            WeightKey::Spend => &mut self.spend,
            WeightKey::Novelty => &mut self.novelty,
            WeightKey::Rigor => &mut self.rigor,
            WeightKey::Safety => &mut self.safety,
        }
    }

    fn apply(&mut self, tilt: Tilt) {
        for &(key, factor) in tilt {
            *self.slot(key) *= factor;
        }
    }

    /// Key-wise mean with an externally resolved vector.
    pub fn averaged_with(&self, other: &WeightVector) -> Self {
        Self {
            goal: (self.goal + other.goal) / 2.0,
            quality: (self.quality + other.quality) / 2.0,
            risk: (self.risk + other.risk) / 2.0,
            spend: (self.spend + other.spend) / 2.0,
            novelty: (self.novelty + other.novelty) / 2.0,
            rigor: (self.rigor + other.rigor) / 2.0,
            safety: (self.safety + other.safety) / 2.0,
        }
    }

    pub fn core_sum(&self) -> f64 {
        self.goal + self.quality + self.risk + self.spend
    }

    fn normalize_core(&mut self) {
        let sum = self.core_sum();
        if sum > 0.0 {
            self.goal /= sum;
            self.quality /= sum;
            self.risk /= sum;
            self.spend /= sum;
        }
    }

    fn clamp_personality_factors(&mut self) {
        self.novelty = clamp01(self.novelty);
        self.rigor = clamp01(self.rigor);
        self.safety = clamp01(self.safety);
    }
}

/// Heuristic sub-scores for the quality component. Fixed-value assessors are
/// exposed as tunable constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityBaselines {
    pub relevance: f64,
    pub recall: f64,
    pub freshness: f64,
    pub accessibility: f64,
    pub usefulness: f64,
    pub originality: f64,
    pub analysis_accuracy: f64,
    pub insight: f64,
    pub actionability: f64,
    pub effectiveness: f64,
    pub reliability: f64,
}

impl Default for QualityBaselines {
    fn default() -> Self {
        Self {
            relevance: 0.7,
            recall: 0.7,
            freshness: 0.6,
            accessibility: 0.8,
            usefulness: 0.7,
            originality: 0.6,
            analysis_accuracy: 0.7,
            insight: 0.6,
            actionability: 0.7,
            effectiveness: 0.7,
            reliability: 0.7,
        }
    }
}

impl QualityBaselines {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("relevance", self.relevance),
            ("recall", self.recall),
            ("freshness", self.freshness),
            ("accessibility", self.accessibility),
            ("usefulness", self.usefulness),
            ("originality", self.originality),
            ("analysis_accuracy", self.analysis_accuracy),
            ("insight", self.insight),
            ("actionability", self.actionability),
            ("effectiveness", self.effectiveness),
            ("reliability", self.reliability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("quality baseline {name} {value} outside [0, 1]"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QualityFactor {
    AnswerAccuracy,
    Completeness,
    Relevance,
    Clarity,
    Precision,
    Recall,
    Freshness,
    Accessibility,
    Creativity,
    Usefulness,
    Originality,
    Depth,
    AnalysisAccuracy,
    Insight,
    Actionability,
    Feasibility,
    Efficiency,
    Robustness,
    Effectiveness,
    Reliability,
    Safety,
}

fn quality_factors(goal_type: GoalType) -> &'static [(QualityFactor, f64)] {
    use QualityFactor as F;
    match goal_type {
        GoalType::Answer => &[
            (F::AnswerAccuracy, 0.4),
            (F::Completeness, 0.3),
            (F::Relevance, 0.2),
            (F::Clarity, 0.1),
        ],
        GoalType::Retrieve => &[
            (F::Precision, 0.4),
            (F::Recall, 0.3),
            (F::Freshness, 0.2),
            (F::Accessibility, 0.1),
        ],
        GoalType::Create => &[
            (F::Creativity, 0.3),
            (F::Usefulness, 0.3),
            (F::Completeness, 0.2),
            (F::Originality, 0.2),
        ],
        GoalType::Analyze => &[
            (F::Depth, 0.4),
            (F::AnalysisAccuracy, 0.3),
            (F::Insight, 0.2),
            (F::Actionability, 0.1),
        ],
        GoalType::Plan => &[
            (F::Feasibility, 0.3),
            (F::Completeness, 0.3),
            (F::Efficiency, 0.2),
            (F::Robustness, 0.2),
        ],
        GoalType::Tool => &[
            (F::Effectiveness, 0.4),
            (F::Efficiency, 0.3),
            (F::Reliability, 0.2),
            (F::Safety, 0.1),
        ],
    }
}

/// Goal-satisfaction bonus rule for one goal type.
struct GoalRule {
    /// Step kind counted for the shape bonus; `None` counts every step.
    counted: Option<StepKind>,
    min_steps: usize,
    shape_bonus: f64,
    quality_above: f64,
    quality_bonus: f64,
}

fn goal_rule(goal_type: GoalType) -> Option<GoalRule> {
    let rule = |counted, min_steps, shape_bonus, quality_above, quality_bonus| GoalRule {
        counted,
        min_steps,
        shape_bonus,
        quality_above,
        quality_bonus,
    };
    match goal_type {
        GoalType::Answer => Some(rule(None, 3, 0.2, 0.7, 0.1)),
        GoalType::Retrieve => Some(rule(Some(StepKind::ExternalTool), 2, 0.15, 0.6, 0.1)),
        GoalType::Create => Some(rule(Some(StepKind::Reasoning), 2, 0.2, 0.6, 0.1)),
        GoalType::Analyze => Some(rule(None, 4, 0.2, 0.7, 0.15)),
        GoalType::Plan => Some(rule(None, 3, 0.15, 0.6, 0.1)),
        GoalType::Tool => None,
    }
}

/// Raw value, weight and signed contribution of one component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorContribution {
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
}

impl FactorContribution {
    fn new(value: f64, weight: f64, sign: f64) -> Self {
        Self {
            value,
            weight,
            contribution: sign * value * weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonalityFactors {
    pub novelty: f64,
    pub rigor: f64,
    pub safety: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorBreakdown {
    pub goal_satisfaction: FactorContribution,
    pub quality: FactorContribution,
    pub risk: FactorContribution,
    pub spend: FactorContribution,
    pub personality_factors: PersonalityFactors,
}

/// Score of one candidate plan in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilityResult {
    pub plan_id: Uuid,
    pub goal_satisfaction: f64,
    pub quality: f64,
    pub risk: f64,
    pub spend: f64,
    pub weights: WeightVector,
    pub utility: f64,
    pub breakdown: FactorBreakdown,
    pub explanation: String,
}

/// Inputs besides the plan itself.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub level: MaturityLevel,
    pub personality: Option<&'a PersonalityProfile>,
    pub context: Option<&'a Map<String, Value>>,
    /// Weights resolved by an external personality matrix, if any.
    pub matrix_weights: Option<&'a WeightVector>,
}

impl<'a> ScoringContext<'a> {
    pub fn new(level: MaturityLevel) -> Self {
        Self {
            level,
            personality: None,
            context: None,
            matrix_weights: None,
        }
    }

    pub fn with_personality(mut self, personality: Option<&'a PersonalityProfile>) -> Self {
        self.personality = personality;
        self
    }

    pub fn with_context(mut self, context: &'a Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_matrix_weights(mut self, weights: Option<&'a WeightVector>) -> Self {
        self.matrix_weights = weights;
        self
    }

    fn flag(&self, key: &str) -> bool {
        self.context.is_some_and(|context| context_flag(context, key))
    }
}

/// Stateless scorer configured with quality baselines.
#[derive(Debug, Clone, Default)]
pub struct UtilityEngine {
    baselines: QualityBaselines,
}

impl UtilityEngine {
    pub fn new(baselines: QualityBaselines) -> Self {
        Self { baselines }
    }

    pub fn score(&self, plan: &ActionPlan, scoring: &ScoringContext<'_>) -> UtilityResult {
        let weights = self.resolve_weights(scoring);

        let goal_satisfaction = self.goal_satisfaction(plan, scoring);
        let quality = self.quality(plan);
        let risk = self.risk(plan, scoring);
        let spend = self.spend(plan);

        let breakdown = FactorBreakdown {
            goal_satisfaction: FactorContribution::new(goal_satisfaction, weights.goal, 1.0),
            quality: FactorContribution::new(quality, weights.quality, 1.0),
            risk: FactorContribution::new(risk, weights.risk, -1.0),
            spend: FactorContribution::new(spend, weights.spend, -1.0),
            personality_factors: PersonalityFactors {
                novelty: weights.novelty,
                rigor: weights.rigor,
                safety: weights.safety,
            },
        };
        let utility = clamp01(
            breakdown.goal_satisfaction.contribution
                + breakdown.quality.contribution
                + breakdown.risk.contribution
                + breakdown.spend.contribution,
        );

        UtilityResult {
            plan_id: plan.id,
            goal_satisfaction,
            quality,
            risk,
            spend,
            weights,
            utility,
            breakdown,
            explanation: explain(goal_satisfaction, quality, risk, spend, utility),
        }
    }

    /// Level table, averaged with the matrix, tilted by personality (then
    /// renormalized) and finally by context flags.
    pub fn resolve_weights(&self, scoring: &ScoringContext<'_>) -> WeightVector {
        let mut weights = WeightVector::for_level(scoring.level);
        if let Some(external) = scoring.matrix_weights {
            weights = weights.averaged_with(external);
        }

        if let Some(personality) = scoring.personality {
            for (trait_value, tilt) in [
                (personality.analytical, ANALYTICAL_TILT),
                (personality.creativity, CREATIVE_TILT),
                (personality.social, SOCIAL_TILT),
                (personality.assertiveness, ASSERTIVE_TILT),
                (personality.patience, PATIENT_TILT),
            ] {
                if trait_value > TRAIT_TILT_THRESHOLD {
                    weights.apply(tilt);
                }
            }
            weights.normalize_core();
            weights.clamp_personality_factors();
        }

        for (flag, tilt) in CONTEXT_TILTS {
            if scoring.flag(flag) {
                weights.apply(tilt);
            }
        }
        weights.clamp_personality_factors();
        weights
    }

    fn goal_satisfaction(&self, plan: &ActionPlan, scoring: &ScoringContext<'_>) -> f64 {
        let mut score = BASE_GOAL_SATISFACTION;
        let quality = plan.estimates.quality;

        if let Some(rule) = goal_rule(plan.goal.goal_type) {
            let counted = match rule.counted {
                Some(kind) => plan.count_steps(kind),
                None => plan.step_count(),
            };
            if counted >= rule.min_steps {
                score += rule.shape_bonus;
            }
            if quality > rule.quality_above {
                score += rule.quality_bonus;
            }
        }

        if scoring.flag("requires_external_data") && plan.count_steps(StepKind::ExternalTool) > 0 {
            score += 0.1;
        }
        if scoring.flag("time_sensitive") && plan.estimates.spend < 0.8 {
            score += 0.1;
        }
        score.min(1.0)
    }

    fn quality(&self, plan: &ActionPlan) -> f64 {
        let heuristic: f64 = quality_factors(plan.goal.goal_type)
            .iter()
            .map(|&(factor, weight)| self.assess(factor, plan) * weight)
            .sum();
        (QUALITY_ESTIMATE_SHARE * plan.estimates.quality
            + (1.0 - QUALITY_ESTIMATE_SHARE) * heuristic)
            .min(1.0)
    }

    fn assess(&self, factor: QualityFactor, plan: &ActionPlan) -> f64 {
        let steps = plan.step_count() as f64;
        let reasoning = plan.count_steps(StepKind::Reasoning) as f64;
        let tools = plan.count_steps(StepKind::ExternalTool) as f64;
        let b = &self.baselines;
        let score = match factor {
            QualityFactor::AnswerAccuracy => 0.5 + 0.1 * reasoning,
            QualityFactor::Completeness => 0.4 + 0.1 * steps,
            QualityFactor::Relevance => b.relevance,
            QualityFactor::Clarity => {
                if plan.step_count() <= 5 {
                    0.8
                } else {
                    0.6
                }
            }
            QualityFactor::Precision => 0.5 + 0.1 * tools,
            QualityFactor::Recall => b.recall,
            QualityFactor::Freshness => b.freshness,
            QualityFactor::Accessibility => b.accessibility,
            QualityFactor::Creativity | QualityFactor::Depth => 0.4 + 0.15 * reasoning,
            QualityFactor::Usefulness => b.usefulness,
            QualityFactor::Originality => b.originality,
            QualityFactor::AnalysisAccuracy => b.analysis_accuracy,
            QualityFactor::Insight => b.insight,
            QualityFactor::Actionability => b.actionability,
            QualityFactor::Feasibility => {
                if plan.step_count() <= 4 {
                    0.8
                } else {
                    0.6
                }
            }
            QualityFactor::Efficiency => 1.0 - plan.estimates.spend,
            QualityFactor::Robustness => 0.5 + 0.1 * steps,
            QualityFactor::Effectiveness => b.effectiveness,
            QualityFactor::Reliability => b.reliability,
            QualityFactor::Safety => 1.0 - plan.estimates.risk,
        };
        clamp01(score)
    }

    fn risk(&self, plan: &ActionPlan, scoring: &ScoringContext<'_>) -> f64 {
        let mut risk = plan.estimates.risk;
        risk += 0.1 * plan.count_steps(StepKind::ExternalTool) as f64;
        if plan.step_count() > 5 {
            risk += 0.1;
        }
        if plan.estimates.spend > 0.8 {
            risk += 0.1;
        }
        if plan.has_policy(NO_PII_EXFIL) && plan.steps.iter().any(|step| step.mentions("data")) {
            risk += 0.2;
        }
        if scoring.flag("sensitive_data") {
            risk += 0.2;
        }
        if scoring.flag("high_stakes") {
            risk += 0.15;
        }
        risk.min(1.0)
    }

    fn spend(&self, plan: &ActionPlan) -> f64 {
        let mut spend = plan.estimates.spend;
        spend += (0.05 * plan.step_count() as f64).min(0.2);
        spend += 0.1 * plan.count_steps(StepKind::ExternalTool) as f64;
        if plan.estimates.quality > 0.8 {
            spend += 0.1;
        }
        spend.min(1.0)
    }
}

fn explain(goal: f64, quality: f64, risk: f64, spend: f64, utility: f64) -> String {
    let labels: Vec<String> = [
        ("goal satisfaction", goal),
        ("quality", quality),
        ("risk", risk),
        ("resource cost", spend),
    ]
    .into_iter()
    .filter_map(|(name, value)| {
        if value > HIGH_COMPONENT {
            Some(format!("high {name}"))
        } else if value < LOW_COMPONENT {
            Some(format!("low {name}"))
        } else {
            None
        }
    })
    .collect();

    let overall = if utility > HIGH_COMPONENT {
        "High utility"
    } else if utility > LOW_COMPONENT {
        "Moderate utility"
    } else {
        "Low utility"
    };

    if labels.is_empty() {
        format!("{overall} with balanced characteristics")
    } else {
        format!("{overall} due to {}", labels.join(", "))
    }
}
