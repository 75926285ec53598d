//! AI assurance risk assessment.
//!
//! A user describes the system under review, answers every context question, and
//! receives a weighted risk score with its tier. A seeded sample of yes/no focus
//! questions follows; each "No" pulls the matching suggestions out of the treatment
//! directory. Sessions are values kept by a [`SessionRepository`], one per user.

pub(crate) mod catalog;
pub mod domain;
pub mod report;
pub mod repository;
pub mod router;
pub(crate) mod sampler;
pub(crate) mod scoring;
pub mod service;
pub(crate) mod session;
pub(crate) mod treatment;

#[cfg(test)]
mod tests;

pub use catalog::{
    AssessmentDataset, ContextRow, FocusQuestionPool, MalformedDataError, QuestionCatalog,
    TagTaxonomy, TreatmentDirectory,
};
pub use domain::{
    Answer, AssessmentStage, FocusAnswer, FocusCategory, FocusQuestion, FocusQuestionId, Question,
    QuestionId, Response, ResponseId, RiskId, RiskKey, RiskTier, Selection, TagDefinition, TagId,
    TreatmentEntry,
};
pub use report::{AssessmentReport, FocusOutcome, FocusQuestionView, SelectedResponseView};
pub use repository::{RepositoryError, SessionId, SessionRecord, SessionRepository};
pub use router::assessment_router;
pub use sampler::{sample, FocusQuestionSampler, SamplerConfig, SamplingError};
pub use scoring::{
    applicable_focus_categories, classify_risk, compute_score, RiskThresholds, ScoreComponent,
    ScoreSummary, ScoringConfig, ScoringEngine,
};
pub use service::{AssessmentService, AssessmentServiceError, DEFAULT_IDLE_TIMEOUT};
pub use session::{AssessmentError, AssessmentSession, ValidationError};
pub use treatment::resolve;
