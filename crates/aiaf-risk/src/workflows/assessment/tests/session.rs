use std::collections::BTreeMap;

use super::common::*;
use crate::workflows::assessment::catalog::TreatmentDirectory;
use crate::workflows::assessment::domain::{
    Answer, AssessmentStage, FocusQuestionId, QuestionId, ResponseId, RiskTier,
};
use crate::workflows::assessment::sampler::SamplingError;
use crate::workflows::assessment::session::{
    AssessmentError, AssessmentSession, ValidationError,
};

fn started() -> AssessmentSession {
    let mut session = AssessmentSession::new();
    session.begin(USE_CASE).expect("use case accepted");
    session
}

fn answered(response_id: i64) -> AssessmentSession {
    let catalog = catalog();
    let mut session = started();
    for question_id in [1, 2] {
        session
            .submit_selection(&catalog, QuestionId(question_id), ResponseId(response_id))
            .expect("selection accepted");
    }
    session
}

fn scored() -> AssessmentSession {
    let mut session = answered(1);
    session
        .submit_all_selections(&catalog(), &engine())
        .expect("submission accepted");
    session
}

fn with_focus_questions() -> AssessmentSession {
    let mut session = scored();
    session
        .generate_focus_questions(&focus_pool(), &sampler())
        .expect("focus questions drawn");
    session
}

fn all_answers(session: &AssessmentSession, answer: Answer) -> BTreeMap<FocusQuestionId, Answer> {
    session
        .sampled_focus_questions()
        .expect("sample present")
        .iter()
        .map(|question| (question.focus_question_id.clone(), answer))
        .collect()
}

#[test]
fn begin_trims_and_opens_context_questions() {
    let mut session = AssessmentSession::new();
    session.begin("  Facial recognition kiosk \n").expect("accepted");

    assert_eq!(session.use_case(), USE_CASE);
    assert_eq!(session.stage(), AssessmentStage::ContextQuestionsOpen);
}

#[test]
fn blank_use_case_keeps_session_at_intake() {
    let mut session = AssessmentSession::new();
    let error = session.begin("   ").expect_err("blank rejected");

    assert_eq!(error, AssessmentError::Validation(ValidationError::BlankUseCase));
    assert_eq!(session.stage(), AssessmentStage::Intake);
}

#[test]
fn begin_twice_is_out_of_order() {
    let mut session = started();
    match session.begin("Another system") {
        Err(AssessmentError::OutOfOrder { stage, .. }) => {
            assert_eq!(stage, AssessmentStage::ContextQuestionsOpen)
        }
        other => panic!("expected out-of-order error, got {other:?}"),
    }
    assert_eq!(session.use_case(), USE_CASE);
}

#[test]
fn selection_before_intake_is_out_of_order() {
    let mut session = AssessmentSession::new();
    let error = session
        .submit_selection(&catalog(), QuestionId(1), ResponseId(1))
        .expect_err("intake not done");
    assert!(matches!(error, AssessmentError::OutOfOrder { .. }));
    assert!(session.selections().is_empty());
}

#[test]
fn unknown_question_and_response_are_rejected() {
    let catalog = catalog();
    let mut session = started();

    let error = session
        .submit_selection(&catalog, QuestionId(99), ResponseId(1))
        .expect_err("unknown question");
    assert_eq!(
        error,
        AssessmentError::Validation(ValidationError::UnknownQuestion(QuestionId(99)))
    );

    let error = session
        .submit_selection(&catalog, QuestionId(1), ResponseId(7))
        .expect_err("unknown response");
    assert_eq!(
        error,
        AssessmentError::Validation(ValidationError::UnknownResponse {
            question_id: QuestionId(1),
            response_id: ResponseId(7),
        })
    );
    assert!(session.selections().is_empty());
}

#[test]
fn reselecting_replaces_the_previous_answer() {
    let catalog = catalog();
    let mut session = started();
    session
        .submit_selection(&catalog, QuestionId(1), ResponseId(1))
        .expect("first answer");
    let selection = session
        .submit_selection(&catalog, QuestionId(1), ResponseId(2))
        .expect("second answer")
        .clone();

    assert_eq!(selection.response_id, ResponseId(2));
    assert_eq!(selection.modifier, 0.0);
    assert_eq!(session.selections().len(), 1);
}

#[test]
fn submitting_with_an_unanswered_question_leaves_score_unset() {
    let catalog = catalog();
    let mut session = started();
    session
        .submit_selection(&catalog, QuestionId(1), ResponseId(1))
        .expect("answer");

    let error = session
        .submit_all_selections(&catalog, &engine())
        .expect_err("question 2 unanswered");

    assert_eq!(
        error,
        AssessmentError::Validation(ValidationError::UnansweredQuestions(vec![QuestionId(2)]))
    );
    assert!(session.risk_score().is_none());
    assert!(session.risk_tier().is_none());
    assert_eq!(session.stage(), AssessmentStage::ContextQuestionsOpen);
}

#[test]
fn full_submission_scores_and_classifies() {
    let session = scored();

    let score = session.risk_score().expect("score set");
    assert!(approx_eq(score, 16.9), "unexpected score {score}");
    assert_eq!(session.risk_tier(), Some(RiskTier::Medium));
    assert_eq!(session.stage(), AssessmentStage::ResponsesSubmitted);
}

#[test]
fn zero_modifier_responses_score_exactly_thirteen() {
    let mut session = answered(2);
    let summary = session
        .submit_all_selections(&catalog(), &engine())
        .expect("submission accepted");

    assert_eq!(summary.score, 13.0);
    assert_eq!(summary.tier, RiskTier::Medium);
}

#[test]
fn focus_questions_require_a_score() {
    let mut session = answered(1);
    let error = session
        .generate_focus_questions(&focus_pool(), &sampler())
        .expect_err("not scored yet");
    assert!(matches!(error, AssessmentError::OutOfOrder { .. }));
    assert!(session.sampled_focus_questions().is_none());
}

#[test]
fn focus_questions_are_drawn_once() {
    let mut session = scored();
    let first = session
        .generate_focus_questions(&focus_pool(), &sampler())
        .expect("first draw")
        .to_vec();
    let second = session
        .generate_focus_questions(&focus_pool(), &sampler())
        .expect("second draw")
        .to_vec();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    assert_eq!(session.stage(), AssessmentStage::FocusQuestionsGenerated);
}

#[test]
fn small_pool_reports_insufficient_pool() {
    let mut session = scored();
    let error = session
        .generate_focus_questions(&small_pool(), &sampler())
        .expect_err("pool too small");

    assert_eq!(
        error,
        AssessmentError::Sampling(SamplingError::InsufficientPool {
            requested: 3,
            available: 2,
        })
    );
    assert_eq!(session.stage(), AssessmentStage::ResponsesSubmitted);
    assert!(session.sampled_focus_questions().is_none());
}

#[test]
fn answers_before_generation_are_out_of_order() {
    let mut session = scored();
    let error = session
        .submit_focus_answers(&BTreeMap::new(), &TreatmentDirectory::builtin())
        .expect_err("nothing sampled");
    assert!(matches!(error, AssessmentError::OutOfOrder { .. }));
}

#[test]
fn missing_focus_answers_are_listed() {
    let mut session = with_focus_questions();
    let mut answers = all_answers(&session, Answer::Yes);
    let dropped = answers.keys().next().cloned().expect("one answer");
    answers.remove(&dropped);

    let error = session
        .submit_focus_answers(&answers, &TreatmentDirectory::builtin())
        .expect_err("answer missing");
    assert_eq!(
        error,
        AssessmentError::Validation(ValidationError::UnansweredFocusQuestions(vec![dropped]))
    );
    assert!(session.focus_answers().is_empty());
}

#[test]
fn answers_for_unsampled_questions_are_rejected() {
    let mut session = with_focus_questions();
    let mut answers = all_answers(&session, Answer::Yes);
    answers.insert(key("FQ99"), Answer::No);

    let error = session
        .submit_focus_answers(&answers, &TreatmentDirectory::builtin())
        .expect_err("unknown id");
    assert_eq!(
        error,
        AssessmentError::Validation(ValidationError::UnknownFocusQuestion(key("FQ99")))
    );
}

#[test]
fn all_yes_answers_yield_no_treatments() {
    let mut session = with_focus_questions();
    let answers = all_answers(&session, Answer::Yes);

    let treatments = session
        .submit_focus_answers(&answers, &TreatmentDirectory::builtin())
        .expect("answers accepted");

    assert!(treatments.is_empty());
    assert_eq!(session.stage(), AssessmentStage::FocusQuestionsAnswered);
}

#[test]
fn one_no_answer_returns_exactly_the_matching_entry() {
    let mut session = with_focus_questions();
    let failed = session.sampled_focus_questions().expect("sample")[0].clone();
    let mut answers = all_answers(&session, Answer::Yes);
    answers.insert(failed.focus_question_id.clone(), Answer::No);

    let treatments = session
        .submit_focus_answers(&answers, &TreatmentDirectory::builtin())
        .expect("answers accepted")
        .to_vec();

    assert_eq!(treatments.len(), 1);
    assert_eq!(Some(treatments[0].risk_id.clone()), failed.risk_id);
}

#[test]
fn resubmitting_responses_never_moves_the_stage_back() {
    let mut session = with_focus_questions();
    let answers = all_answers(&session, Answer::Yes);
    session
        .submit_focus_answers(&answers, &TreatmentDirectory::builtin())
        .expect("answers accepted");

    session
        .submit_selection(&catalog(), QuestionId(1), ResponseId(2))
        .expect("answer changed");
    let summary = session
        .submit_all_selections(&catalog(), &engine())
        .expect("rescored")
        .clone();

    assert!(approx_eq(summary.score, (10.0 + 1.5) * 1.3));
    assert_eq!(session.stage(), AssessmentStage::FocusQuestionsAnswered);
}
