use tracing::debug;

use super::catalog::TreatmentDirectory;
use super::domain::{FocusAnswer, TreatmentEntry};

/// Treatments for every failed answer, in directory order, each entry at most once.
///
/// An answer matches on RiskID when it carries one, otherwise on TagID. Answers with
/// neither key match nothing.
pub fn resolve<'a, I>(failed_answers: I, directory: &TreatmentDirectory) -> Vec<TreatmentEntry>
where
    I: IntoIterator<Item = &'a FocusAnswer>,
{
    let failed: Vec<&FocusAnswer> = failed_answers
        .into_iter()
        .filter(|answer| answer.is_failed())
        .collect();

    if failed.is_empty() {
        return Vec::new();
    }

    let resolved: Vec<TreatmentEntry> = directory
        .entries()
        .iter()
        .filter(|entry| failed.iter().any(|answer| matches_entry(answer, entry)))
        .cloned()
        .collect();
    debug!(failed = failed.len(), resolved = resolved.len(), "resolved treatments");
    resolved
}

fn matches_entry(answer: &FocusAnswer, entry: &TreatmentEntry) -> bool {
    match (&answer.risk_id, &answer.tag_id) {
        (Some(risk_id), _) => *risk_id == entry.risk_id,
        (None, Some(tag_id)) => *tag_id == entry.tag_id,
        (None, None) => false,
    }
}
