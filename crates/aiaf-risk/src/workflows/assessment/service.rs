use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use super::catalog::AssessmentDataset;
use super::domain::{
    Answer, FocusQuestion, FocusQuestionId, Question, QuestionId, ResponseId, Selection,
    TreatmentEntry,
};
use super::report::AssessmentReport;
use super::repository::{RepositoryError, SessionId, SessionRecord, SessionRepository};
use super::sampler::{FocusQuestionSampler, SamplerConfig};
use super::scoring::{ScoreSummary, ScoringConfig, ScoringEngine};
use super::session::{AssessmentError, AssessmentSession};

/// Service composing the shared dataset, session repository, scorer and sampler.
pub struct AssessmentService<R> {
    dataset: Arc<AssessmentDataset>,
    repository: Arc<R>,
    engine: Arc<ScoringEngine>,
    sampler: Arc<FocusQuestionSampler>,
    idle_timeout: Duration,
    session_locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

/// Sessions untouched for this long are discarded unless configured otherwise.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("asm-{id:06}"))
}

impl<R> AssessmentService<R>
where
    R: SessionRepository + 'static,
{
    pub fn new(
        dataset: Arc<AssessmentDataset>,
        repository: Arc<R>,
        scoring: ScoringConfig,
        sampler: SamplerConfig,
    ) -> Self {
        Self {
            dataset,
            repository,
            engine: Arc::new(ScoringEngine::new(scoring)),
            sampler: Arc::new(FocusQuestionSampler::new(sampler)),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn dataset(&self) -> &AssessmentDataset {
        &self.dataset
    }

    pub fn questions(&self) -> Vec<Question> {
        self.dataset
            .catalog
            .questions_in_ascending_id_order()
            .cloned()
            .collect()
    }

    /// Create a session and record the use case in one step.
    pub fn start(&self, use_case: &str) -> Result<SessionRecord, AssessmentServiceError> {
        let mut session = AssessmentSession::new();
        session.begin(use_case)?;

        let record = SessionRecord::new(next_session_id(), session);
        let stored = self.repository.insert(record)?;
        info!(session = %stored.session_id, "assessment started");
        Ok(stored)
    }

    pub fn select(
        &self,
        session_id: &SessionId,
        question_id: QuestionId,
        response_id: ResponseId,
    ) -> Result<Selection, AssessmentServiceError> {
        self.with_session(session_id, |session, dataset| {
            session
                .submit_selection(&dataset.catalog, question_id, response_id)
                .cloned()
        })
    }

    pub fn submit(&self, session_id: &SessionId) -> Result<ScoreSummary, AssessmentServiceError> {
        let summary = self.with_session(session_id, |session, dataset| {
            session
                .submit_all_selections(&dataset.catalog, &self.engine)
                .cloned()
        })?;
        info!(
            session = %session_id,
            score = summary.score,
            tier = summary.tier.label(),
            "context responses scored"
        );
        Ok(summary)
    }

    pub fn generate_focus_questions(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<FocusQuestion>, AssessmentServiceError> {
        let questions = self.with_session(session_id, |session, dataset| {
            session
                .generate_focus_questions(&dataset.focus_pool, &self.sampler)
                .map(<[FocusQuestion]>::to_vec)
        })?;
        info!(session = %session_id, count = questions.len(), "focus questions ready");
        Ok(questions)
    }

    pub fn answer_focus_questions(
        &self,
        session_id: &SessionId,
        answers: &BTreeMap<FocusQuestionId, Answer>,
    ) -> Result<Vec<TreatmentEntry>, AssessmentServiceError> {
        let treatments = self.with_session(session_id, |session, dataset| {
            session
                .submit_focus_answers(answers, &dataset.treatments)
                .map(<[TreatmentEntry]>::to_vec)
        })?;
        info!(
            session = %session_id,
            treatments = treatments.len(),
            "focus answers recorded"
        );
        Ok(treatments)
    }

    pub fn report(&self, session_id: &SessionId) -> Result<AssessmentReport, AssessmentServiceError> {
        let record = self.live_record(session_id, Utc::now())?;
        Ok(AssessmentReport::from_record(&record, &self.dataset))
    }

    /// Discard the session once the user is done with it.
    pub fn end(&self, session_id: &SessionId) -> Result<(), AssessmentServiceError> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().expect("session lock poisoned");

        let removed = self.repository.remove(session_id);
        self.forget_lock(session_id);
        removed?;
        info!(session = %session_id, "assessment ended");
        Ok(())
    }

    /// Removes every session idle for longer than the configured timeout.
    pub fn sweep_expired(&self) -> Result<usize, AssessmentServiceError> {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> Result<usize, AssessmentServiceError> {
        let Ok(idle_timeout) = chrono::Duration::from_std(self.idle_timeout) else {
            return Ok(0);
        };
        let Some(cutoff) = now.checked_sub_signed(idle_timeout) else {
            return Ok(0);
        };

        let expired = self.repository.remove_idle(cutoff)?;
        for session_id in &expired {
            self.forget_lock(session_id);
            info!(session = %session_id, "idle assessment expired");
        }
        Ok(expired.len())
    }

    /// Applies `operation` to a copy of the stored session and writes it back only on
    /// success, so failed stages leave no trace. The per-session lock is held from
    /// fetch to write-back, so concurrent calls on one session run one after another.
    fn with_session<T, F>(&self, session_id: &SessionId, operation: F) -> Result<T, AssessmentServiceError>
    where
        F: FnOnce(&mut AssessmentSession, &AssessmentDataset) -> Result<T, AssessmentError>,
    {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().expect("session lock poisoned");

        let now = Utc::now();
        let mut record = self.live_record(session_id, now)?;

        let value = operation(&mut record.session, &self.dataset)?;
        record.last_active_at = now;
        self.repository.update(record)?;
        Ok(value)
    }

    /// Fetches a session, discarding it instead when it has sat idle past the timeout.
    fn live_record(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, AssessmentServiceError> {
        let record = self
            .repository
            .fetch(session_id)?
            .ok_or(RepositoryError::NotFound)?;

        if !self.is_expired(&record, now) {
            return Ok(record);
        }

        match self.repository.remove(session_id) {
            Ok(()) | Err(RepositoryError::NotFound) => {}
            Err(other) => return Err(other.into()),
        }
        self.forget_lock(session_id);
        info!(session = %session_id, "idle assessment expired");
        Err(RepositoryError::NotFound.into())
    }

    fn is_expired(&self, record: &SessionRecord, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(record.last_active_at)
            .to_std()
            .map(|idle| idle >= self.idle_timeout)
            .unwrap_or(false)
    }

    fn session_lock(&self, session_id: &SessionId) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().expect("session lock table poisoned");
        locks.entry(session_id.clone()).or_default().clone()
    }

    fn forget_lock(&self, session_id: &SessionId) {
        self.session_locks
            .lock()
            .expect("session lock table poisoned")
            .remove(session_id);
    }
}

/// Error raised by the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
