use chrono::{DateTime, Utc};
use serde::Serialize;

use super::catalog::AssessmentDataset;
use super::domain::{
    Answer, AssessmentStage, FocusCategory, FocusQuestionId, QuestionId, ResponseId, RiskId,
    RiskTier, TagId, TreatmentEntry,
};
use super::repository::{SessionId, SessionRecord};

/// Read-only view of a session, shaped for rendering after any stage.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentReport {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub use_case: String,
    pub stage: AssessmentStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_tier: Option<RiskTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_tier_label: Option<&'static str>,
    pub focus_categories: Vec<FocusCategory>,
    pub selected_responses: Vec<SelectedResponseView>,
    pub focus_questions: Vec<FocusQuestionView>,
    pub treatments: Vec<TreatmentEntry>,
    pub focus_outcome: FocusOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectedResponseView {
    pub question_id: QuestionId,
    pub question_text: String,
    pub response_id: ResponseId,
    pub response_title: String,
    pub response_description: String,
    pub modifier: f64,
    pub tag_id: TagId,
    pub tag_label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FocusQuestionView {
    pub focus_question_id: FocusQuestionId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_id: Option<RiskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<TagId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Answer>,
}

/// What the focus answers amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusOutcome {
    Pending,
    NoRisksIdentified,
    RisksIdentified,
    /// Some answers were "No" but no directory entry matched them.
    UnmatchedRisks,
}

impl FocusOutcome {
    pub const fn summary(self) -> &'static str {
        match self {
            FocusOutcome::Pending => "focus questions not answered yet",
            FocusOutcome::NoRisksIdentified => {
                "all focus questions were marked 'Yes'; no new risks identified"
            }
            FocusOutcome::RisksIdentified => "risks identified; see suggested treatments",
            FocusOutcome::UnmatchedRisks => {
                "some focus questions were marked 'No' but no treatment is on file"
            }
        }
    }
}

impl AssessmentReport {
    pub fn from_record(record: &SessionRecord, dataset: &AssessmentDataset) -> Self {
        let session = &record.session;

        let selected_responses = session
            .selections()
            .values()
            .filter_map(|selection| {
                let question = dataset.catalog.question(selection.question_id)?;
                let response = question.response(selection.response_id)?;
                Some(SelectedResponseView {
                    question_id: question.question_id,
                    question_text: question.text.clone(),
                    response_id: response.response_id,
                    response_title: response.title.clone(),
                    response_description: response.description.clone(),
                    modifier: selection.modifier,
                    tag_id: selection.tag_id.clone(),
                    tag_label: dataset.tags.label_for(&selection.tag_id),
                })
            })
            .collect();

        let focus_questions = session
            .sampled_focus_questions()
            .unwrap_or_default()
            .iter()
            .map(|question| FocusQuestionView {
                focus_question_id: question.focus_question_id.clone(),
                text: question.text.clone(),
                risk_id: question.risk_id.clone(),
                tag_id: question.tag_id.clone(),
                answer: session
                    .focus_answers()
                    .get(&question.focus_question_id)
                    .map(|answer| answer.answer),
            })
            .collect();

        let focus_outcome = if session.stage() < AssessmentStage::FocusQuestionsAnswered {
            FocusOutcome::Pending
        } else if session.focus_answers().values().all(|answer| !answer.is_failed()) {
            FocusOutcome::NoRisksIdentified
        } else if session.treatments().is_empty() {
            FocusOutcome::UnmatchedRisks
        } else {
            FocusOutcome::RisksIdentified
        };

        Self {
            session_id: record.session_id.clone(),
            started_at: record.started_at,
            last_active_at: record.last_active_at,
            use_case: session.use_case().to_string(),
            stage: session.stage(),
            risk_score: session.risk_score(),
            risk_tier: session.risk_tier(),
            risk_tier_label: session.risk_tier().map(RiskTier::label),
            focus_categories: session
                .scoring()
                .map(|summary| summary.focus_categories.clone())
                .unwrap_or_default(),
            selected_responses,
            focus_questions,
            treatments: session.treatments().to_vec(),
            focus_outcome,
        }
    }
}
