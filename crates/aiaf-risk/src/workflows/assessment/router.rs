use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{Answer, FocusQuestionId, QuestionId, ResponseId};
use super::repository::{RepositoryError, SessionId, SessionRepository};
use super::report::AssessmentReport;
use super::service::{AssessmentService, AssessmentServiceError};
use super::session::{AssessmentError, ValidationError};

/// Router builder exposing the assessment workflow over HTTP.
pub fn assessment_router<R>(service: Arc<AssessmentService<R>>) -> Router
where
    R: SessionRepository + 'static,
{
    Router::new()
        .route("/api/v1/questions", get(questions_handler::<R>))
        .route("/api/v1/assessments", post(start_handler::<R>))
        .route(
            "/api/v1/assessments/:session_id",
            get(report_handler::<R>).delete(end_handler::<R>),
        )
        .route(
            "/api/v1/assessments/:session_id/selections/:question_id",
            put(selection_handler::<R>),
        )
        .route(
            "/api/v1/assessments/:session_id/submit",
            post(submit_handler::<R>),
        )
        .route(
            "/api/v1/assessments/:session_id/focus-questions",
            post(focus_questions_handler::<R>),
        )
        .route(
            "/api/v1/assessments/:session_id/focus-answers",
            post(focus_answers_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartRequest {
    pub use_case: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SelectionRequest {
    pub response_id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FocusAnswersRequest {
    pub answers: BTreeMap<FocusQuestionId, Answer>,
}

pub(crate) async fn questions_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
) -> Response
where
    R: SessionRepository + 'static,
{
    (StatusCode::OK, axum::Json(service.questions())).into_response()
}

pub(crate) async fn start_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    axum::Json(request): axum::Json<StartRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.start(&request.use_case) {
        Ok(record) => {
            let report = AssessmentReport::from_record(&record, service.dataset());
            (StatusCode::CREATED, axum::Json(report)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn report_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.report(&SessionId(session_id)) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn end_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.end(&SessionId(session_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn selection_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path((session_id, question_id)): Path<(String, i64)>,
    axum::Json(request): axum::Json<SelectionRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.select(
        &SessionId(session_id),
        QuestionId(question_id),
        ResponseId(request.response_id),
    ) {
        Ok(selection) => (StatusCode::OK, axum::Json(selection)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.submit(&SessionId(session_id)) {
        Ok(summary) => {
            let payload = json!({
                "score": summary.score,
                "tier": summary.tier,
                "tier_label": summary.tier.label(),
                "focus_categories": summary.focus_categories,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn focus_questions_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.generate_focus_questions(&SessionId(session_id)) {
        Ok(questions) => (StatusCode::OK, axum::Json(questions)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn focus_answers_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<FocusAnswersRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let session_id = SessionId(session_id);
    let outcome = service
        .answer_focus_questions(&session_id, &request.answers)
        .and_then(|_| service.report(&session_id));

    match outcome {
        Ok(report) => {
            let payload = json!({
                "treatments": report.treatments,
                "focus_outcome": report.focus_outcome,
                "summary": report.focus_outcome.summary(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn error_response(error: AssessmentServiceError) -> Response {
    let (status, payload) = match &error {
        AssessmentServiceError::Assessment(AssessmentError::Validation(
            ValidationError::UnansweredQuestions(unanswered),
        )) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "error": error.to_string(),
                "unanswered": unanswered,
            }),
        ),
        AssessmentServiceError::Assessment(AssessmentError::Validation(
            ValidationError::UnansweredFocusQuestions(unanswered),
        )) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "error": error.to_string(),
                "unanswered": unanswered,
            }),
        ),
        AssessmentServiceError::Assessment(
            AssessmentError::Validation(_) | AssessmentError::Sampling(_),
        ) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": error.to_string() }),
        ),
        AssessmentServiceError::Assessment(AssessmentError::OutOfOrder { .. }) => (
            StatusCode::CONFLICT,
            json!({ "error": error.to_string() }),
        ),
        AssessmentServiceError::Repository(RepositoryError::NotFound) => (
            StatusCode::NOT_FOUND,
            json!({ "error": "assessment session not found" }),
        ),
        AssessmentServiceError::Repository(RepositoryError::Conflict) => (
            StatusCode::CONFLICT,
            json!({ "error": "assessment session already exists" }),
        ),
        AssessmentServiceError::Repository(RepositoryError::Unavailable(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": error.to_string() }),
        ),
    };

    (status, axum::Json(payload)).into_response()
}
