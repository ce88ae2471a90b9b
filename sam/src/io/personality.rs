//! External personality matrix consulted while scoring.

use anyhow::{Result, anyhow};

use crate::core::request::PersonalityProfile;
use crate::core::types::MaturityLevel;
use crate::core::utility::WeightVector;

/// Resolves a seven-key weight vector that scoring averages with its own.
pub trait PersonalityMatrix {
    fn resolve_weights(
        &self,
        personality: Option<&PersonalityProfile>,
        level: MaturityLevel,
    ) -> Result<WeightVector>;
}

/// Returns the same vector for every request (`personality_matrix` in config).
#[derive(Debug, Clone, Copy)]
pub struct FixedMatrix {
    weights: WeightVector,
}

impl FixedMatrix {
    pub fn new(weights: WeightVector) -> Self {
        Self { weights }
    }
}

impl PersonalityMatrix for FixedMatrix {
    fn resolve_weights(
        &self,
        _personality: Option<&PersonalityProfile>,
        _level: MaturityLevel,
    ) -> Result<WeightVector> {
        let w = &self.weights;
        let values = [w.goal, w.quality, w.risk, w.spend, w.novelty, w.rigor, w.safety];
        if values.iter().any(|value| !value.is_finite()) {
            return Err(anyhow!("personality matrix weights must be finite"));
        }
        Ok(self.weights)
    }
}
