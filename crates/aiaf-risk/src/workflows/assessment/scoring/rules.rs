use std::collections::BTreeMap;

use super::super::domain::{QuestionId, Selection};
use super::config::ScoringConfig;
use super::ScoreComponent;

/// `(base + Σ modifier) × phase_weight`. Summation order follows question id, so the
/// result does not depend on the order answers arrived in.
pub fn compute_score(selections: &BTreeMap<QuestionId, Selection>, config: &ScoringConfig) -> f64 {
    let total_modifier: f64 = selections.values().map(|selection| selection.modifier).sum();
    (config.base_score + total_modifier) * config.phase_weight
}

pub(crate) fn score_components(selections: &BTreeMap<QuestionId, Selection>) -> Vec<ScoreComponent> {
    selections
        .values()
        .map(|selection| ScoreComponent {
            question_id: selection.question_id,
            response_id: selection.response_id,
            modifier: selection.modifier,
            tag_id: selection.tag_id.clone(),
        })
        .collect()
}
