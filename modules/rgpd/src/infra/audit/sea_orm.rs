//! Database-backed audit sink. Rows go into the append-only
//! `rgpd_audit_events` table; nothing in the engine ever updates or
//! deletes them.

use anyhow::Context;
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};

use crate::domain::audit::AuditEvent;
use crate::domain::ports::AuditSink;
use crate::infra::storage::entities::audit_events;

pub struct SeaOrmAuditSink<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmAuditSink<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<C> AuditSink for SeaOrmAuditSink<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn append(&self, event: AuditEvent) -> anyhow::Result<()> {
        let metadata =
            serde_json::to_value(&event.metadata).context("serialize audit metadata failed")?;
        let m = audit_events::ActiveModel {
            id: Set(event.id),
            event_name: Set(event.event_name),
            actor_scope: Set(event.actor_scope.as_str().to_owned()),
            actor_id: Set(event.actor_id),
            tenant_id: Set(event.tenant_id),
            target_id: Set(event.target_id),
            metadata: Set(metadata),
            occurred_at: Set(event.occurred_at),
        };
        let _ = m
            .insert(&self.conn)
            .await
            .context("append audit event failed")?;
        Ok(())
    }
}
