use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::AssessmentSession;

/// Identifier handed to the caller when a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Repository record wrapping a live session with its bookkeeping.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    /// Last successful change; idle expiry counts from here.
    pub last_active_at: DateTime<Utc>,
    pub session: AssessmentSession,
}

impl SessionRecord {
    pub fn new(session_id: SessionId, session: AssessmentSession) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            started_at: now,
            last_active_at: now,
            session,
        }
    }
}

/// Storage abstraction so each user gets an isolated session without global state.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError>;
    fn update(&self, record: SessionRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError>;
    fn remove(&self, id: &SessionId) -> Result<(), RepositoryError>;
    /// Drops every record last active before `cutoff` and returns their ids.
    fn remove_idle(&self, cutoff: DateTime<Utc>) -> Result<Vec<SessionId>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("session already exists")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}
