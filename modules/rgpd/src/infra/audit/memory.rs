//! In-memory audit sink for tests and embedded use.

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::audit::AuditEvent;
use crate::domain::ports::AuditSink;

#[derive(Default)]
pub struct MemoryAuditSink {
    events: RwLock<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// All events, in append order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().clone()
    }

    /// Events of one tenant, in append order.
    pub fn events_for_tenant(&self, tenant_id: Uuid) -> Vec<AuditEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.tenant_id == Some(tenant_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, event: AuditEvent) -> anyhow::Result<()> {
        self.events.write().push(event);
        Ok(())
    }
}

/// Sink that refuses every append; used to verify transitions abort when
/// the audit trail is unavailable.
#[derive(Default)]
pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn append(&self, _event: AuditEvent) -> anyhow::Result<()> {
        anyhow::bail!("audit sink unavailable")
    }
}
