use std::collections::BTreeMap;
use std::fmt::Display;

use super::catalog::{FocusQuestionPool, QuestionCatalog, TreatmentDirectory};
use super::domain::{
    Answer, AssessmentStage, FocusAnswer, FocusQuestion, FocusQuestionId, QuestionId, ResponseId,
    RiskTier, Selection, TreatmentEntry,
};
use super::sampler::{FocusQuestionSampler, SamplingError};
use super::scoring::{ScoreSummary, ScoringEngine};
use super::treatment;

/// Incomplete or inconsistent user input. The session is left unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("please describe the use case before starting the assessment")]
    BlankUseCase,
    #[error("question {0} is not part of the assessment")]
    UnknownQuestion(QuestionId),
    #[error("question {question_id} has no response {}", .response_id.0)]
    UnknownResponse {
        question_id: QuestionId,
        response_id: ResponseId,
    },
    #[error("unanswered questions: {}", join(.0))]
    UnansweredQuestions(Vec<QuestionId>),
    #[error("unanswered focus questions: {}", join(.0))]
    UnansweredFocusQuestions(Vec<FocusQuestionId>),
    #[error("focus question {0} was not part of the generated sample")]
    UnknownFocusQuestion(FocusQuestionId),
}

fn join<T: Display>(ids: &[T]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssessmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    #[error("cannot {operation} while the assessment is at stage {stage}")]
    OutOfOrder {
        operation: &'static str,
        stage: AssessmentStage,
    },
}

/// One user's pass through the assessment.
///
/// Stages only move forward. Re-running a stage re-enters it and never moves the
/// session back. Every operation either completes fully or returns an error with
/// the session untouched.
#[derive(Debug, Clone, Default)]
pub struct AssessmentSession {
    stage: AssessmentStage,
    use_case: String,
    selections: BTreeMap<QuestionId, Selection>,
    scoring: Option<ScoreSummary>,
    sampled_focus_questions: Option<Vec<FocusQuestion>>,
    focus_answers: BTreeMap<FocusQuestionId, FocusAnswer>,
    treatments: Vec<TreatmentEntry>,
}

impl AssessmentSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intake → ContextQuestionsOpen.
    pub fn begin(&mut self, use_case: &str) -> Result<(), AssessmentError> {
        self.require(
            self.stage == AssessmentStage::Intake,
            "record the use case",
        )?;

        let use_case = use_case.trim();
        if use_case.is_empty() {
            return Err(ValidationError::BlankUseCase.into());
        }

        self.use_case = use_case.to_string();
        self.stage = AssessmentStage::ContextQuestionsOpen;
        Ok(())
    }

    /// Records or replaces the answer to one context question.
    pub fn submit_selection(
        &mut self,
        catalog: &QuestionCatalog,
        question_id: QuestionId,
        response_id: ResponseId,
    ) -> Result<&Selection, AssessmentError> {
        self.require(
            self.stage >= AssessmentStage::ContextQuestionsOpen,
            "answer context questions",
        )?;

        let question = catalog
            .question(question_id)
            .ok_or(ValidationError::UnknownQuestion(question_id))?;
        let response =
            question
                .response(response_id)
                .ok_or(ValidationError::UnknownResponse {
                    question_id,
                    response_id,
                })?;

        let selection = Selection {
            question_id,
            response_id,
            modifier: response.modifier(),
            tag_id: response.tag_id.clone(),
        };
        self.selections.insert(question_id, selection);

        Ok(&self.selections[&question_id])
    }

    /// ContextQuestionsOpen → ResponsesSubmitted. Needs one selection per catalog question.
    pub fn submit_all_selections(
        &mut self,
        catalog: &QuestionCatalog,
        engine: &ScoringEngine,
    ) -> Result<&ScoreSummary, AssessmentError> {
        self.require(
            self.stage >= AssessmentStage::ContextQuestionsOpen,
            "submit responses",
        )?;

        let unanswered: Vec<QuestionId> = catalog
            .question_ids()
            .filter(|question_id| !self.selections.contains_key(question_id))
            .collect();
        if !unanswered.is_empty() {
            return Err(ValidationError::UnansweredQuestions(unanswered).into());
        }

        let summary = engine.score(&self.selections);
        self.stage = self.stage.max(AssessmentStage::ResponsesSubmitted);
        Ok(&*self.scoring.insert(summary))
    }

    /// ResponsesSubmitted → FocusQuestionsGenerated. Draws once; later calls return
    /// the same sample.
    pub fn generate_focus_questions(
        &mut self,
        pool: &FocusQuestionPool,
        sampler: &FocusQuestionSampler,
    ) -> Result<&[FocusQuestion], AssessmentError> {
        self.require(self.scoring.is_some(), "generate focus questions")?;

        if self.sampled_focus_questions.is_none() {
            self.sampled_focus_questions = Some(sampler.draw(pool)?);
        }
        self.stage = self.stage.max(AssessmentStage::FocusQuestionsGenerated);

        Ok(self.sampled_focus_questions.as_deref().unwrap_or_default())
    }

    /// FocusQuestionsGenerated → FocusQuestionsAnswered. Replaces earlier answers
    /// wholesale and returns the treatments for every "No".
    pub fn submit_focus_answers(
        &mut self,
        answers: &BTreeMap<FocusQuestionId, Answer>,
        directory: &TreatmentDirectory,
    ) -> Result<&[TreatmentEntry], AssessmentError> {
        let sampled = match &self.sampled_focus_questions {
            Some(sampled) => sampled,
            None => {
                return Err(AssessmentError::OutOfOrder {
                    operation: "answer focus questions",
                    stage: self.stage,
                })
            }
        };

        if let Some(unknown) = answers.keys().find(|id| {
            !sampled
                .iter()
                .any(|question| &question.focus_question_id == *id)
        }) {
            return Err(ValidationError::UnknownFocusQuestion(unknown.clone()).into());
        }

        let missing: Vec<FocusQuestionId> = sampled
            .iter()
            .filter(|question| !answers.contains_key(&question.focus_question_id))
            .map(|question| question.focus_question_id.clone())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::UnansweredFocusQuestions(missing).into());
        }

        let focus_answers: BTreeMap<FocusQuestionId, FocusAnswer> = sampled
            .iter()
            .filter_map(|question| {
                let answer = *answers.get(&question.focus_question_id)?;
                Some((
                    question.focus_question_id.clone(),
                    FocusAnswer {
                        focus_question_id: question.focus_question_id.clone(),
                        answer,
                        risk_id: question.risk_id.clone(),
                        tag_id: question.tag_id.clone(),
                    },
                ))
            })
            .collect();

        self.treatments = treatment::resolve(focus_answers.values(), directory);
        self.focus_answers = focus_answers;
        self.stage = AssessmentStage::FocusQuestionsAnswered;

        Ok(&self.treatments)
    }

    fn require(&self, allowed: bool, operation: &'static str) -> Result<(), AssessmentError> {
        if allowed {
            Ok(())
        } else {
            Err(AssessmentError::OutOfOrder {
                operation,
                stage: self.stage,
            })
        }
    }

    pub fn stage(&self) -> AssessmentStage {
        self.stage
    }

    pub fn use_case(&self) -> &str {
        &self.use_case
    }

    pub fn selections(&self) -> &BTreeMap<QuestionId, Selection> {
        &self.selections
    }

    pub fn scoring(&self) -> Option<&ScoreSummary> {
        self.scoring.as_ref()
    }

    pub fn risk_score(&self) -> Option<f64> {
        self.scoring.as_ref().map(|summary| summary.score)
    }

    pub fn risk_tier(&self) -> Option<RiskTier> {
        self.scoring.as_ref().map(|summary| summary.tier)
    }

    pub fn sampled_focus_questions(&self) -> Option<&[FocusQuestion]> {
        self.sampled_focus_questions.as_deref()
    }

    pub fn focus_answers(&self) -> &BTreeMap<FocusQuestionId, FocusAnswer> {
        &self.focus_answers
    }

    pub fn treatments(&self) -> &[TreatmentEntry] {
        &self.treatments
    }
}
