use aiaf_risk::config::AssessmentSettings;
use aiaf_risk::error::AppError;
use aiaf_risk::workflows::assessment::{
    AssessmentService, RepositoryError, SessionId, SessionRecord, SessionRepository,
};
use aiaf_risk::workflows::sheets::SheetImporter;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local session store; sessions vanish on restart.
#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl SessionRepository for InMemorySessionRepository {
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
        if guard.contains_key(&record.session_id) {
            guard.insert(record.session_id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
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

#[cfg(test)]
impl InMemorySessionRepository {
    pub(crate) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

/// Loads the workbook named by `settings` and wires a service around a fresh store.
pub(crate) fn build_service(
    settings: &AssessmentSettings,
) -> Result<AssessmentService<InMemorySessionRepository>, AppError> {
    let dataset = SheetImporter::from_dir(&settings.data_dir)?;
    Ok(AssessmentService::new(
        Arc::new(dataset),
        Arc::new(InMemorySessionRepository::default()),
        settings.scoring.clone(),
        settings.sampler,
    )
    .with_idle_timeout(settings.session_idle_timeout))
}
