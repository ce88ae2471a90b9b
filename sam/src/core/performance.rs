//! Request counters and running averages reported by `status`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceMetrics {
    pub total_requests: u64,
    /// Requests that completed a full orientation cycle.
    pub successful_decisions: u64,
    /// Requests whose cycle failed and fell back.
    pub failed_decisions: u64,
    /// Mean confidence over completed cycles.
    pub average_confidence: f64,
    /// Mean wall-clock milliseconds over completed cycles.
    pub average_response_ms: f64,
}

impl PerformanceMetrics {
    pub fn record_request(&mut self) {
        self.total_requests += 1;
    }

    pub fn record_success(&mut self, confidence: f64, elapsed_ms: f64) {
        self.successful_decisions += 1;
        let n = self.successful_decisions as f64;
        self.average_confidence += (confidence - self.average_confidence) / n;
        self.average_response_ms += (elapsed_ms - self.average_response_ms) / n;
    }

    pub fn record_failure(&mut self) {
        self.failed_decisions += 1;
    }

    /// Requests refused at the gate (neither decided nor failed).
    pub fn refused(&self) -> u64 {
        self.total_requests
            .saturating_sub(self.successful_decisions + self.failed_decisions)
    }
}
