use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::workflows::assessment::catalog::{
    AssessmentDataset, ContextRow, FocusQuestionPool, QuestionCatalog, TagTaxonomy,
    TreatmentDirectory,
};
use crate::workflows::assessment::domain::{
    FocusQuestion, QuestionId, Response as ContextResponse, ResponseId, RiskKey, TagDefinition,
};
use crate::workflows::assessment::repository::{
    RepositoryError, SessionId, SessionRecord, SessionRepository,
};
use crate::workflows::assessment::sampler::{FocusQuestionSampler, SamplerConfig};
use crate::workflows::assessment::scoring::{ScoringConfig, ScoringEngine};
use crate::workflows::assessment::{assessment_router, AssessmentService};

pub(super) const USE_CASE: &str = "Facial recognition kiosk";

pub(super) fn key(raw: &str) -> RiskKey {
    RiskKey::parse(raw).expect("valid key")
}

fn context_row(
    line: u64,
    question_id: i64,
    text: &str,
    response_id: i64,
    title: &str,
    modifiers: Vec<f64>,
    tag: &str,
) -> ContextRow {
    ContextRow {
        line,
        question_id: QuestionId(question_id),
        question_text: text.to_string(),
        response: ContextResponse {
            response_id: ResponseId(response_id),
            title: title.to_string(),
            description: format!("{title} for question {question_id}"),
            modifiers,
            tag_id: key(tag),
        },
    }
}

/// Two questions; response 1 adds +1.5, response 2 adds nothing.
pub(super) fn catalog() -> QuestionCatalog {
    QuestionCatalog::from_rows(vec![
        context_row(2, 1, "Does the system process biometric data?", 1, "Yes", vec![1.5], "T002"),
        context_row(3, 1, "Does the system process biometric data?", 2, "No", Vec::new(), "T001"),
        context_row(4, 2, "Do decisions reach people without review?", 1, "Yes", vec![1.5], "T003"),
        context_row(5, 2, "Do decisions reach people without review?", 2, "No", vec![0.0], "T003"),
    ])
    .expect("fixture catalog builds")
}

pub(super) fn focus_question(id: &str, risk: &str) -> FocusQuestion {
    FocusQuestion {
        focus_question_id: key(id),
        text: format!("Has control {id} been evidenced?"),
        risk_id: RiskKey::parse(risk),
        tag_id: None,
    }
}

/// Every question carries a RiskID that matches exactly one built-in treatment.
pub(super) fn focus_pool() -> FocusQuestionPool {
    FocusQuestionPool::from_questions(vec![
        (3, focus_question("FQ01", "R001")),
        (4, focus_question("FQ02", "R002")),
        (5, focus_question("FQ03", "R003")),
        (6, focus_question("FQ04", "R005")),
    ])
    .expect("fixture pool builds")
}

pub(super) fn small_pool() -> FocusQuestionPool {
    FocusQuestionPool::from_questions(vec![
        (3, focus_question("FQ01", "R001")),
        (4, focus_question("FQ02", "R002")),
    ])
    .expect("fixture pool builds")
}

pub(super) fn tags() -> TagTaxonomy {
    TagTaxonomy::new(vec![
        TagDefinition {
            tag_id: key("T001"),
            label: "Data Protection".to_string(),
            description: String::new(),
        },
        TagDefinition {
            tag_id: key("T002"),
            label: "Biometrics".to_string(),
            description: String::new(),
        },
    ])
}

pub(super) fn dataset() -> AssessmentDataset {
    AssessmentDataset {
        catalog: catalog(),
        focus_pool: focus_pool(),
        treatments: TreatmentDirectory::builtin(),
        tags: tags(),
    }
}

pub(super) fn engine() -> ScoringEngine {
    ScoringEngine::new(ScoringConfig::default())
}

pub(super) fn sampler() -> FocusQuestionSampler {
    FocusQuestionSampler::new(SamplerConfig::default())
}

pub(super) fn approx_eq(left: f64, right: f64) -> bool {
    (left - right).abs() < 1e-9
}

pub(super) fn build_service() -> (AssessmentService<MemoryRepository>, Arc<MemoryRepository>) {
    build_service_with(dataset())
}

pub(super) fn build_service_with(
    dataset: AssessmentDataset,
) -> (AssessmentService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = AssessmentService::new(
        Arc::new(dataset),
        repository.clone(),
        ScoringConfig::default(),
        SamplerConfig::default(),
    );
    (service, repository)
}

pub(super) fn router_with_service<R>(service: AssessmentService<R>) -> axum::Router
where
    R: SessionRepository + 'static,
{
    assessment_router(Arc::new(service))
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl MemoryRepository {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.session_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.session_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: SessionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.session_id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn remove(&self, id: &SessionId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn remove_idle(&self, cutoff: DateTime<Utc>) -> Result<Vec<SessionId>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let expired: Vec<SessionId> = guard
            .values()
            .filter(|record| record.last_active_at < cutoff)
            .map(|record| record.session_id.clone())
            .collect();
        for id in &expired {
            guard.remove(id);
        }
        Ok(expired)
    }
}

pub(super) struct UnavailableRepository;

impl SessionRepository for UnavailableRepository {
    fn insert(&self, _record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("session store offline".to_string()))
    }

    fn update(&self, _record: SessionRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("session store offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("session store offline".to_string()))
    }

    fn remove(&self, _id: &SessionId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("session store offline".to_string()))
    }

    fn remove_idle(&self, _cutoff: DateTime<Utc>) -> Result<Vec<SessionId>, RepositoryError> {
        Err(RepositoryError::Unavailable("session store offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
