use chrono::{DateTime, Utc};
use tenant_scope::IsolationError;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::repo::RepoError;

/// Domain-specific errors using thiserror.
///
/// Idempotent replays (duplicate deletion request, purge of a completed
/// request) are deliberately not errors; they surface as success values
/// with an `already_processed` marker in the logs.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Missing or mismatched tenant id. Aborts the operation.
    #[error(transparent)]
    Isolation(#[from] IsolationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// The retention window is a hard gate, not a hint.
    #[error("retention window not elapsed: purge scheduled for {scheduled_purge_at}")]
    RetentionNotElapsed { scheduled_purge_at: DateTime<Utc> },

    #[error("validation failed: {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// The audit sink refused the event; the enclosing transition must be
    /// considered not committed.
    #[error("audit write rejected: {message}")]
    AuditRejected { message: String },

    #[error("database error: {message}")]
    Database { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn retention_not_elapsed(scheduled_purge_at: DateTime<Utc>) -> Self {
        Self::RetentionNotElapsed { scheduled_purge_at }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn audit_rejected(message: impl Into<String>) -> Self {
        Self::AuditRejected {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<RepoError> for DomainError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Isolation(e) => Self::Isolation(e),
            RepoError::Other(e) => Self::database(e.to_string()),
        }
    }
}
