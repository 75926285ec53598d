use serde::{Deserialize, Serialize};

/// Tunable scoring policy. Defaults reproduce the published assessment rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Inherent baseline risk before any response modifiers.
    pub base_score: f64,
    /// Phase weighting applied to the modified baseline.
    pub phase_weight: f64,
    pub thresholds: RiskThresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_score: 10.0,
            phase_weight: 1.3,
            thresholds: RiskThresholds::default(),
        }
    }
}

/// Inclusive lower bounds of each tier above `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub medium: f64,
    pub high: f64,
    pub very_high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 13.0,
            high: 18.0,
            very_high: 22.0,
        }
    }
}
