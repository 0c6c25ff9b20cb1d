use async_trait::async_trait;

use crate::domain::audit::AuditEvent;

/// Append-only audit sink. A failed append must abort the enclosing state
/// transition, so implementations should only return `Ok` once the event
/// is durably accepted.
///
/// Concurrent writes from many tenants are expected; events only need to
/// be totally ordered per tenant, not globally.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, event: AuditEvent) -> anyhow::Result<()>;
}
