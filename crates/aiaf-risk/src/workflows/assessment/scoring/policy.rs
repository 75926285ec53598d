use super::super::domain::{FocusCategory, RiskTier};
use super::config::RiskThresholds;

/// Half-open interval lookup; each boundary belongs to the tier above it.
pub fn classify_risk(score: f64, thresholds: &RiskThresholds) -> RiskTier {
    if score < thresholds.medium {
        RiskTier::Low
    } else if score < thresholds.high {
        RiskTier::Medium
    } else if score < thresholds.very_high {
        RiskTier::High
    } else {
        RiskTier::VeryHigh
    }
}

pub fn applicable_focus_categories(tier: RiskTier) -> Vec<FocusCategory> {
    match tier {
        RiskTier::Low => Vec::new(),
        RiskTier::Medium => vec![FocusCategory::Baseline],
        RiskTier::High => vec![FocusCategory::Baseline, FocusCategory::Additional],
        RiskTier::VeryHigh => vec![
            FocusCategory::Baseline,
            FocusCategory::Additional,
            FocusCategory::Sme,
        ],
    }
}
