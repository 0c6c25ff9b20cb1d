//! Retention and purge scheduler.
//!
//! A synchronous batch entry point meant to be driven by an external
//! cron-equivalent. Each run is scoped to exactly one tenant; runs for
//! different tenants are fully independent.

use std::sync::Arc;

use chrono::Duration;
use tenant_scope::TenantScope;
use tracing::{info, instrument, warn};

use crate::config::RgpdConfig;
use crate::contract::model::{Actor, PurgeCounts, PurgeJobReport, RetentionPolicy};
use crate::domain::audit::{event, AuditMetadata, AuditRecorder};
use crate::domain::error::DomainError;
use crate::domain::ports::{BlobStore, Clock};
use crate::domain::repo::{BundlesRepository, RequestsRepository, UsageRepository};
use crate::domain::requests::DsrService;

#[derive(Clone)]
pub struct RetentionService {
    requests: Arc<dyn RequestsRepository>,
    usage: Arc<dyn UsageRepository>,
    bundles: Arc<dyn BundlesRepository>,
    blobs: Arc<dyn BlobStore>,
    dsr: DsrService,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
    config: RgpdConfig,
}

impl RetentionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        requests: Arc<dyn RequestsRepository>,
        usage: Arc<dyn UsageRepository>,
        bundles: Arc<dyn BundlesRepository>,
        blobs: Arc<dyn BlobStore>,
        dsr: DsrService,
        audit: AuditRecorder,
        clock: Arc<dyn Clock>,
        config: RgpdConfig,
    ) -> Self {
        Self {
            requests,
            usage,
            bundles,
            blobs,
            dsr,
            audit,
            clock,
            config,
        }
    }

    /// One tenant-scoped retention pass: purge due deletion requests
    /// through the orchestrator, drop usage records beyond their window
    /// and crypto-shred expired export bundles.
    ///
    /// With `dry_run` the report carries the counts that would be affected
    /// and storage is left untouched. Re-running immediately after a
    /// successful pass reports zero further deletions.
    #[instrument(
        name = "rgpd.retention.tenant_purge_job",
        skip(self, scope),
        fields(tenant = %scope, dry_run = dry_run)
    )]
    pub async fn run_tenant_purge_job(
        &self,
        scope: &TenantScope,
        actor: Actor,
        dry_run: bool,
    ) -> Result<PurgeJobReport, DomainError> {
        let now = self.clock.now();
        let usage_cutoff = now - Duration::days(self.config.usage_retention_days);

        let due = self.requests.list_due_deletions(scope, now).await?;
        let aged_usage = self.usage.count_older_than(scope, usage_cutoff).await?;
        let expired = self.bundles.list_expired(scope, now).await?;

        if dry_run {
            return Ok(PurgeJobReport {
                tenant_id: scope.tenant_uuid(),
                dry_run: true,
                requests_processed: due.len() as u64,
                deleted: PurgeCounts::default(),
                aged_usage_records: aged_usage,
                expired_bundles: expired.len() as u64,
            });
        }

        // Audit the pass before any destructive work; the counts are the
        // ones this run is about to act on.
        self.audit
            .record(
                event::RETENTION_PURGE_COMPLETED,
                actor,
                Some(scope),
                None,
                AuditMetadata::new()
                    .count("due_requests", due.len() as u64)
                    .count("aged_usage_records", aged_usage)
                    .count("expired_bundles", expired.len() as u64),
            )
            .await?;

        let mut deleted = PurgeCounts::default();
        let mut requests_processed = 0u64;
        for request in due {
            let outcome = self.dsr.purge(actor, request.id).await?;
            if !outcome.already_completed {
                requests_processed += 1;
                deleted.add(&outcome.deleted);
            }
        }

        let aged_usage_records = self.usage.delete_older_than(scope, usage_cutoff).await?;

        let mut expired_bundles = 0u64;
        for bundle in expired {
            let shredded = self
                .blobs
                .delete(bundle.id)
                .await
                .map_err(|e| DomainError::internal(e.to_string()))?;
            if !shredded {
                warn!(bundle_id = %bundle.id, "expired bundle artifact already absent");
            }
            if self.bundles.delete(scope, bundle.id).await? {
                expired_bundles += 1;
            }
        }

        info!(
            requests_processed,
            aged_usage_records, expired_bundles, "retention pass completed"
        );
        Ok(PurgeJobReport {
            tenant_id: scope.tenant_uuid(),
            dry_run: false,
            requests_processed,
            deleted,
            aged_usage_records,
            expired_bundles,
        })
    }

    /// Category-specific purge of AI usage records under an explicit
    /// policy. Returns the number of rows deleted (or that would be,
    /// with `dry_run`).
    #[instrument(
        name = "rgpd.retention.purge_usage_records",
        skip(self, scope),
        fields(tenant = %scope, retention_days = policy.retention_days, dry_run = dry_run)
    )]
    pub async fn purge_usage_records(
        &self,
        scope: &TenantScope,
        actor: Actor,
        policy: RetentionPolicy,
        dry_run: bool,
    ) -> Result<u64, DomainError> {
        if policy.retention_days < 0 {
            return Err(DomainError::validation(
                "retention_days",
                "must not be negative",
            ));
        }

        let cutoff = self.clock.now() - Duration::days(policy.retention_days);
        let affected = self.usage.count_older_than(scope, cutoff).await?;
        if dry_run {
            return Ok(affected);
        }

        self.audit
            .record(
                event::RETENTION_PURGE_COMPLETED,
                actor,
                Some(scope),
                None,
                AuditMetadata::new()
                    .tag_if_safe("category", "usage_records")
                    .days("retention_days", policy.retention_days)
                    .count("rows_deleted", affected),
            )
            .await?;

        let deleted = self.usage.delete_older_than(scope, cutoff).await?;

        info!(deleted, "usage records purged");
        Ok(deleted)
    }
}
