//! Audit event emitter.
//!
//! Every register/orchestrator mutation emits exactly one event per state
//! transition, synchronously, before the mutation is applied: a rejected
//! event aborts the transition with storage untouched, and a crash between
//! the accepted event and the mutation costs at most a duplicate event,
//! never an unaudited change. Event
//! metadata is a typed map that can only hold counts, day spans, timestamps
//! and machine tags; display names, emails and free text are
//! unrepresentable by construction, and the serialized form is re-checked
//! before the sink sees it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenant_scope::TenantScope;
use uuid::Uuid;

use crate::contract::model::{Actor, ActorScope};
use crate::domain::error::DomainError;
use crate::domain::ports::{AuditSink, Clock};

/// Audit event names, one per state transition.
pub mod event {
    pub const CONSENT_GRANTED: &str = "consent.granted";
    pub const CONSENT_REVOKED: &str = "consent.revoked";
    pub const USER_DATA_EXPORTED: &str = "user.data.exported";
    pub const DELETION_REQUESTED: &str = "rgpd.deletion.requested";
    pub const DELETION_COMPLETED: &str = "rgpd.deletion.completed";
    pub const SUSPENSION_CREATED: &str = "user.suspension.created";
    pub const SUSPENSION_LIFTED: &str = "user.suspension.lifted";
    pub const OPPOSITION_CREATED: &str = "rgpd.opposition.created";
    pub const OPPOSITION_REVIEWED: &str = "rgpd.opposition.reviewed";
    pub const DISPUTE_CREATED: &str = "rgpd.dispute.created";
    pub const DISPUTE_REVIEW_STARTED: &str = "rgpd.dispute.review_started";
    pub const DISPUTE_REVIEWED: &str = "rgpd.dispute.reviewed";
    pub const RETENTION_PURGE_COMPLETED: &str = "retention.purge.completed";
}

/// A metadata value. No free-text variant exists on purpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuditValue {
    Count(u64),
    Days(i64),
    Timestamp(DateTime<Utc>),
    /// Short machine identifier, validated against [`is_safe_tag`].
    Tag(String),
}

/// Category-safe event metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditMetadata {
    entries: BTreeMap<String, AuditValue>,
}

/// Machine tags are short, lowercase, and cannot contain `@` or spaces, so
/// neither emails nor prose fit through this gate.
pub fn is_safe_tag(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | ':' | '-'))
}

impl AuditMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(mut self, key: &'static str, value: u64) -> Self {
        self.entries.insert(key.to_owned(), AuditValue::Count(value));
        self
    }

    pub fn days(mut self, key: &'static str, value: i64) -> Self {
        self.entries.insert(key.to_owned(), AuditValue::Days(value));
        self
    }

    pub fn timestamp(mut self, key: &'static str, value: DateTime<Utc>) -> Self {
        self.entries
            .insert(key.to_owned(), AuditValue::Timestamp(value));
        self
    }

    /// Record a caller-supplied identifier only when it passes tag
    /// validation; otherwise the entry is omitted and the event still
    /// carries its counts.
    pub fn tag_if_safe(mut self, key: &'static str, value: &str) -> Self {
        if is_safe_tag(value) {
            self.entries
                .insert(key.to_owned(), AuditValue::Tag(value.to_owned()));
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&AuditValue> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn validate(&self) -> Result<(), DomainError> {
        for (key, value) in &self.entries {
            if let AuditValue::Tag(tag) = value {
                if !is_safe_tag(tag) {
                    return Err(DomainError::validation(
                        "audit_metadata",
                        format!("unsafe tag for key '{key}'"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub event_name: String,
    pub actor_scope: ActorScope,
    pub actor_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub target_id: Option<Uuid>,
    pub metadata: AuditMetadata,
    pub occurred_at: DateTime<Utc>,
}

/// Builds validated events and appends them synchronously to the sink.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>, clock: Arc<dyn Clock>) -> Self {
        Self { sink, clock }
    }

    /// Append one event. On failure the caller must treat the enclosing
    /// transition as not committed and propagate the error.
    pub async fn record(
        &self,
        event_name: &'static str,
        actor: Actor,
        scope: Option<&TenantScope>,
        target_id: Option<Uuid>,
        metadata: AuditMetadata,
    ) -> Result<(), DomainError> {
        let event = AuditEvent {
            id: Uuid::new_v4(),
            event_name: event_name.to_owned(),
            actor_scope: actor.scope,
            actor_id: actor.id,
            tenant_id: scope.map(TenantScope::tenant_uuid),
            target_id,
            metadata,
            occurred_at: self.clock.now(),
        };

        validate_privacy(&event)?;

        self.sink
            .append(event)
            .await
            .map_err(|e| DomainError::audit_rejected(e.to_string()))
    }
}

/// Last line of defense: the serialized metadata must not look like it
/// carries an address or prose.
fn validate_privacy(event: &AuditEvent) -> Result<(), DomainError> {
    event.metadata.validate()?;

    let serialized = serde_json::to_string(&event.metadata)
        .map_err(|e| DomainError::internal(e.to_string()))?;
    if serialized.contains('@') {
        return Err(DomainError::validation(
            "audit_metadata",
            "serialized metadata contains an email-like pattern",
        ));
    }
    Ok(())
}
