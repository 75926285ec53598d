mod config;
mod policy;
mod rules;

pub use config::{RiskThresholds, ScoringConfig};
pub use policy::{applicable_focus_categories, classify_risk};
pub use rules::compute_score;

use std::collections::BTreeMap;

use super::domain::{FocusCategory, QuestionId, ResponseId, RiskTier, Selection, TagId};
use serde::{Deserialize, Serialize};

/// Stateless scorer that applies the scoring configuration to a selection set.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(&self, selections: &BTreeMap<QuestionId, Selection>) -> ScoreSummary {
        let score = compute_score(selections, &self.config);
        let tier = classify_risk(score, &self.config.thresholds);

        ScoreSummary {
            score,
            tier,
            focus_categories: applicable_focus_categories(tier),
            components: rules::score_components(selections),
        }
    }
}

/// One selection's contribution, kept so a result can be audited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub question_id: QuestionId,
    pub response_id: ResponseId,
    pub modifier: f64,
    pub tag_id: TagId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub score: f64,
    pub tier: RiskTier,
    pub focus_categories: Vec<FocusCategory>,
    pub components: Vec<ScoreComponent>,
}
