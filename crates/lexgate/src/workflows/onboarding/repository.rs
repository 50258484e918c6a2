use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{ApplicationId, ApplicationRecord, ApplicationStatus, Role};

/// Storage abstraction so the onboarding service can be exercised in isolation.
///
/// Implementations enforce two constraints themselves: ids are unique, and an
/// e-mail address belongs to at most one application that is not rejected.
pub trait EntityStore: Send + Sync {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
    fn by_email(&self, email: &str) -> Result<Vec<ApplicationRecord>, RepositoryError>;
    fn list(&self, role: Role) -> Result<Vec<ApplicationRecord>, RepositoryError>;

    /// Compare-and-set on status: only succeeds while the record is `expected`.
    fn transition(
        &self,
        id: &ApplicationId,
        expected: ApplicationStatus,
        next: StatusChange,
    ) -> Result<ApplicationRecord, RepositoryError>;
}

/// Data written by a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: ApplicationStatus,
    pub reviewed_by: String,
    pub reviewed_at: DateTime<Utc>,
    pub rejection_reason: Option<String>,
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("an application with this email already exists")]
    EmailTaken,
    #[error("record not found")]
    NotFound,
    #[error("record is {current}, not {expected}")]
    StatusMismatch {
        expected: ApplicationStatus,
        current: ApplicationStatus,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Process-local entity store backed by a mutex-guarded map.
#[derive(Default, Clone)]
pub struct MemoryEntityStore {
    records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
}

impl MemoryEntityStore {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<ApplicationId, ApplicationRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("entity store lock poisoned".to_string()))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|guard| guard.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntityStore for MemoryEntityStore {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        let email_taken = guard.values().any(|existing| {
            existing.email == record.email && existing.status != ApplicationStatus::Rejected
        });
        if email_taken {
            return Err(RepositoryError::EmailTaken);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn by_email(&self, email: &str) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Ok(self
            .lock()?
            .values()
            .filter(|record| record.email == email)
            .cloned()
            .collect())
    }

    fn list(&self, role: Role) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let mut records: Vec<ApplicationRecord> = self
            .lock()?
            .values()
            .filter(|record| record.role() == role)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    fn transition(
        &self,
        id: &ApplicationId,
        expected: ApplicationStatus,
        next: StatusChange,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.lock()?;
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if record.status != expected {
            return Err(RepositoryError::StatusMismatch {
                expected,
                current: record.status,
            });
        }
        record.status = next.status;
        record.reviewed_by = Some(next.reviewed_by);
        record.reviewed_at = Some(next.reviewed_at);
        record.rejection_reason = next.rejection_reason;
        Ok(record.clone())
    }
}
