use chrono::{DateTime, Utc};
use tenant_scope::IsolationError;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::error::DomainError;

/// Errors that are safe to expose to other modules. Storage and audit-sink
/// detail is collapsed into `Internal`; nothing here ever carries raw
/// database text or personal data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RgpdError {
    /// Missing or mismatched tenant id. Fatal, never retried.
    #[error("tenant isolation violation")]
    IsolationViolation,

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// Purge attempted before the scheduled window. Safe to retry once the
    /// window has passed.
    #[error("retention window not elapsed (scheduled for {scheduled_purge_at})")]
    RetentionNotElapsed { scheduled_purge_at: DateTime<Utc> },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("internal error")]
    Internal,
}

impl RgpdError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<IsolationError> for RgpdError {
    fn from(_: IsolationError) -> Self {
        Self::IsolationViolation
    }
}

impl From<DomainError> for RgpdError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Isolation(_) => Self::IsolationViolation,
            DomainError::NotFound { entity, id } => Self::NotFound { entity, id },
            DomainError::RetentionNotElapsed { scheduled_purge_at } => {
                Self::RetentionNotElapsed { scheduled_purge_at }
            }
            DomainError::Validation { field, message } => Self::Validation {
                message: format!("{field}: {message}"),
            },
            // Storage and audit failures stay behind the contract boundary.
            DomainError::AuditRejected { .. }
            | DomainError::Database { .. }
            | DomainError::Internal { .. } => Self::Internal,
        }
    }
}
