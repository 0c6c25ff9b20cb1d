//! Data-subject request orchestrator: export bundles and the
//! soft-delete -> scheduled-purge -> hard-delete sequence.

use std::sync::Arc;

use chrono::Duration;
use tenant_scope::TenantScope;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::RgpdConfig;
use crate::contract::model::{
    Actor, DataSubjectRequest, DeletionOutcome, ExportBundle, ExportSnapshot, ExportedConsent,
    ExportedProfile, ExportedUsage, PurgeCounts, PurgeOutcome, RequestKind, RequestStatus,
};
use crate::domain::audit::{event, AuditMetadata, AuditRecorder};
use crate::domain::error::DomainError;
use crate::domain::ports::{BlobStore, Clock};
use crate::domain::repo::{
    BundlesRepository, ConsentRepository, RequestsRepository, StoredBundle, UsageRepository,
    UsersRepository,
};
use crate::infra::crypto::ExportCipher;

/// Coordinates export and deletion requests over the storage and blob
/// ports. Deletion is a two-phase lifecycle: soft-delete hides the data
/// immediately, the purge after the retention window removes it for good.
#[derive(Clone)]
pub struct DsrService {
    users: Arc<dyn UsersRepository>,
    consents: Arc<dyn ConsentRepository>,
    usage: Arc<dyn UsageRepository>,
    requests: Arc<dyn RequestsRepository>,
    bundles: Arc<dyn BundlesRepository>,
    blobs: Arc<dyn BlobStore>,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
    config: RgpdConfig,
}

impl DsrService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UsersRepository>,
        consents: Arc<dyn ConsentRepository>,
        usage: Arc<dyn UsageRepository>,
        requests: Arc<dyn RequestsRepository>,
        bundles: Arc<dyn BundlesRepository>,
        blobs: Arc<dyn BlobStore>,
        audit: AuditRecorder,
        clock: Arc<dyn Clock>,
        config: RgpdConfig,
    ) -> Self {
        Self {
            users,
            consents,
            usage,
            requests,
            bundles,
            blobs,
            audit,
            clock,
            config,
        }
    }

    /// Assemble a P0/P1-only snapshot (profile, latest consents, usage
    /// metadata), seal it with a fresh per-bundle key and store the
    /// ciphertext. Returns the bundle reference; contents never reach the
    /// audit log.
    #[instrument(
        name = "rgpd.dsr.export",
        skip(self, scope),
        fields(tenant = %scope, user_id = %user_id)
    )]
    pub async fn export_user_data(
        &self,
        scope: &TenantScope,
        actor: Actor,
        user_id: Uuid,
    ) -> Result<ExportBundle, DomainError> {
        let user = self
            .users
            .find_by_id(scope, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user_id))?;

        let consents = self.consents.latest_per_purpose(scope, user_id).await?;
        let usage = self.usage.list_by_user(scope, user_id).await?;

        let snapshot = ExportSnapshot {
            profile: ExportedProfile {
                user_id: user.id,
                display_name: user.display_name,
                created_at: user.created_at,
            },
            consents: consents
                .iter()
                .map(|c| ExportedConsent {
                    purpose: c.purpose.clone(),
                    granted: c.granted,
                    granted_at: c.granted_at,
                    revoked_at: c.revoked_at,
                })
                .collect(),
            usage: usage
                .iter()
                .map(|u| ExportedUsage {
                    kind: u.kind.clone(),
                    created_at: u.created_at,
                })
                .collect(),
        };

        let plaintext =
            serde_json::to_vec(&snapshot).map_err(|e| DomainError::internal(e.to_string()))?;
        let cipher = ExportCipher::generate();
        let sealed = cipher
            .seal(&plaintext)
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let now = self.clock.now();
        let bundle = StoredBundle {
            id: Uuid::new_v4(),
            tenant_id: scope.tenant_uuid(),
            user_id,
            created_at: now,
            expires_at: now + Duration::days(self.config.export_ttl_days),
            key_hex: cipher.key_hex(),
        };

        // Audit before anything is stored; a refused event leaves no
        // bundle, blob or request row behind.
        self.audit
            .record(
                event::USER_DATA_EXPORTED,
                actor,
                Some(scope),
                Some(user_id),
                AuditMetadata::new()
                    .days("ttl_days", self.config.export_ttl_days)
                    .count("consents", snapshot.consents.len() as u64)
                    .count("usage_records", snapshot.usage.len() as u64),
            )
            .await?;

        self.blobs
            .put(bundle.id, sealed)
            .await
            .map_err(|e| DomainError::internal(e.to_string()))?;
        self.bundles.insert(scope, bundle.clone()).await?;

        // Exports complete synchronously, so the request row is recorded
        // already completed.
        let request = DataSubjectRequest {
            id: Uuid::new_v4(),
            tenant_id: scope.tenant_uuid(),
            user_id,
            kind: RequestKind::Export,
            status: RequestStatus::Completed,
            created_at: now,
            scheduled_purge_at: None,
            completed_at: Some(now),
        };
        self.requests.insert(scope, request).await?;

        info!("export bundle created");
        Ok(bundle.to_public())
    }

    /// Decrypt a bundle for download. A bundle past its TTL is treated as
    /// absent, exactly like one that was never created.
    #[instrument(
        name = "rgpd.dsr.open_export",
        skip(self, scope),
        fields(tenant = %scope, bundle_id = %bundle_id)
    )]
    pub async fn open_export(
        &self,
        scope: &TenantScope,
        bundle_id: Uuid,
    ) -> Result<Option<ExportSnapshot>, DomainError> {
        let Some(bundle) = self.bundles.find_by_id(scope, bundle_id).await? else {
            return Ok(None);
        };
        if self.clock.now() >= bundle.expires_at {
            debug!("bundle expired, treating as absent");
            return Ok(None);
        }

        let Some(sealed) = self
            .blobs
            .get(bundle_id)
            .await
            .map_err(|e| DomainError::internal(e.to_string()))?
        else {
            return Ok(None);
        };

        let cipher = ExportCipher::from_hex(&bundle.key_hex)
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let plaintext = cipher
            .open(&sealed)
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let snapshot = serde_json::from_slice(&plaintext)
            .map_err(|e| DomainError::internal(e.to_string()))?;
        Ok(Some(snapshot))
    }

    /// Soft-delete the user and dependent records and schedule the purge.
    /// Idempotent: a second request returns the existing pending request
    /// unchanged.
    #[instrument(
        name = "rgpd.dsr.request_deletion",
        skip(self, scope),
        fields(tenant = %scope, user_id = %user_id)
    )]
    pub async fn request_deletion(
        &self,
        scope: &TenantScope,
        actor: Actor,
        user_id: Uuid,
    ) -> Result<DeletionOutcome, DomainError> {
        // Idempotence first: once soft-deleted the user is invisible to
        // find_by_id, so the replay check cannot rely on it.
        if let Some(existing) = self.requests.find_pending_deletion(scope, user_id).await? {
            info!(already_processed = true, request_id = %existing.id, "deletion already requested");
            return Ok(DeletionOutcome {
                request: existing,
                newly_created: false,
            });
        }

        self.users
            .find_by_id(scope, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user_id))?;

        let now = self.clock.now();
        let scheduled_purge_at = now + Duration::days(self.config.deletion_retention_days);

        // Audit before the soft-deletes; a refused event leaves the user
        // fully visible and the call fails.
        self.audit
            .record(
                event::DELETION_REQUESTED,
                actor,
                Some(scope),
                Some(user_id),
                AuditMetadata::new()
                    .days("retention_days", self.config.deletion_retention_days)
                    .timestamp("scheduled_purge_at", scheduled_purge_at),
            )
            .await?;

        self.users.soft_delete(scope, user_id, now).await?;
        let consents_hidden = self
            .consents
            .soft_delete_by_user(scope, user_id, now)
            .await?;
        let usage_hidden = self.usage.soft_delete_by_user(scope, user_id, now).await?;

        let request = DataSubjectRequest {
            id: Uuid::new_v4(),
            tenant_id: scope.tenant_uuid(),
            user_id,
            kind: RequestKind::Deletion,
            status: RequestStatus::Pending,
            created_at: now,
            scheduled_purge_at: Some(scheduled_purge_at),
            completed_at: None,
        };
        self.requests.insert(scope, request.clone()).await?;

        info!(
            consents_hidden,
            usage_hidden, "user soft-deleted, purge scheduled"
        );
        Ok(DeletionOutcome {
            request,
            newly_created: true,
        })
    }

    /// Hard-delete everything the deletion request covers and crypto-shred
    /// export bundles. Point of no return; the retention gate is
    /// re-checked immediately before destructive work begins. Purging a
    /// completed request reports zero deletions instead of failing.
    #[instrument(name = "rgpd.dsr.purge", skip(self), fields(request_id = %request_id))]
    pub async fn purge(&self, actor: Actor, request_id: Uuid) -> Result<PurgeOutcome, DomainError> {
        let request = self
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| DomainError::not_found("request", request_id))?;

        // The scheduler calls with the request id only; the owning tenant
        // is recovered from the request row and everything destructive
        // below runs under that scope.
        let scope = TenantScope::new(Some(request.tenant_id))?;

        if request.kind != RequestKind::Deletion {
            return Err(DomainError::validation(
                "kind",
                "only deletion requests can be purged",
            ));
        }
        if request.status == RequestStatus::Completed {
            info!(already_processed = true, "request already purged");
            return Ok(PurgeOutcome {
                request_id,
                already_completed: true,
                deleted: PurgeCounts::default(),
            });
        }

        let scheduled_purge_at = request
            .scheduled_purge_at
            .ok_or_else(|| DomainError::validation("scheduled_purge_at", "missing on request"))?;
        if self.clock.now() < scheduled_purge_at {
            return Err(DomainError::retention_not_elapsed(scheduled_purge_at));
        }

        // Double check the gate with a fresh reading just before the
        // destructive section; the entry check above may be arbitrarily
        // stale by the time we get here.
        let now = self.clock.now();
        if now < scheduled_purge_at {
            return Err(DomainError::retention_not_elapsed(scheduled_purge_at));
        }

        // Audit before the point of no return. The destructive section
        // never starts without a durably accepted completion event, so a
        // sink failure here aborts with every row still in place.
        let user_id = request.user_id;
        self.audit
            .record(
                event::DELETION_COMPLETED,
                actor,
                Some(&scope),
                Some(user_id),
                AuditMetadata::new().timestamp("scheduled_purge_at", scheduled_purge_at),
            )
            .await?;

        let consents = self.consents.hard_delete_by_user(&scope, user_id).await?;
        let usage_records = self.usage.hard_delete_by_user(&scope, user_id).await?;

        let mut bundles = 0u64;
        for bundle in self.bundles.list_by_user(&scope, user_id).await? {
            let shredded = self
                .blobs
                .delete(bundle.id)
                .await
                .map_err(|e| DomainError::internal(e.to_string()))?;
            if !shredded {
                warn!(bundle_id = %bundle.id, "bundle artifact already absent");
            }
            if self.bundles.delete(&scope, bundle.id).await? {
                bundles += 1;
            }
        }

        let users = self.users.hard_delete(&scope, user_id).await?;
        self.requests.mark_completed(request_id, now).await?;

        let deleted = PurgeCounts {
            users,
            consents,
            usage_records,
            bundles,
        };

        info!(total = deleted.total(), "purge completed");
        Ok(PurgeOutcome {
            request_id,
            already_completed: false,
            deleted,
        })
    }
}
