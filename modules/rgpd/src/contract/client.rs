use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::error::RgpdError;
use crate::contract::model::{
    Actor, Consent, ConsentDecision, DeletionOutcome, Dispute, DisputeResolution, ExportBundle,
    ExportSnapshot, Opposition, PurgeJobReport, PurgeOutcome, Suspension,
};

/// Public API of the lifecycle engine for other modules to consume.
///
/// Tenant-scoped operations take the caller's tenant id as an `Option`;
/// passing `None` (or the nil uuid) is rejected with an isolation error
/// before anything is touched. `purge_request` is the one platform-scope
/// operation: the owning tenant is recovered from the request itself.
#[async_trait]
pub trait RgpdApi: Send + Sync {
    // --- consent ledger ---

    /// Record consent for one purpose. Always appends a ledger row.
    async fn grant_consent(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        user_id: Uuid,
        purpose: &str,
    ) -> Result<Consent, RgpdError>;

    /// Revoke the latest granted row for the purpose. Returns false when
    /// there was nothing to revoke.
    async fn revoke_consent(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        user_id: Uuid,
        purpose: &str,
    ) -> Result<bool, RgpdError>;

    /// Latest-wins decision for one purpose; `Unknown` when no row exists.
    async fn get_consent(
        &self,
        tenant_id: Option<Uuid>,
        user_id: Uuid,
        purpose: &str,
    ) -> Result<ConsentDecision, RgpdError>;

    /// Latest row per purpose for one user.
    async fn list_consents(
        &self,
        tenant_id: Option<Uuid>,
        user_id: Uuid,
    ) -> Result<Vec<Consent>, RgpdError>;

    // --- data-subject requests ---

    /// Build and seal an export bundle for the user.
    async fn request_export(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        user_id: Uuid,
    ) -> Result<ExportBundle, RgpdError>;

    /// Decrypt a bundle for download; expired bundles read as absent.
    async fn open_export(
        &self,
        tenant_id: Option<Uuid>,
        bundle_id: Uuid,
    ) -> Result<Option<ExportSnapshot>, RgpdError>;

    /// Soft-delete the user and schedule the purge. Idempotent.
    async fn request_deletion(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        user_id: Uuid,
    ) -> Result<DeletionOutcome, RgpdError>;

    /// Hard-delete everything a due deletion request covers. Scheduler or
    /// platform admin only.
    async fn purge_request(
        &self,
        actor: Actor,
        request_id: Uuid,
    ) -> Result<PurgeOutcome, RgpdError>;

    // --- registers ---

    async fn create_suspension(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        user_id: Uuid,
        reason: &str,
    ) -> Result<Suspension, RgpdError>;

    async fn lift_suspension(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        suspension_id: Uuid,
    ) -> Result<Suspension, RgpdError>;

    async fn create_opposition(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        user_id: Uuid,
        reason: &str,
    ) -> Result<Opposition, RgpdError>;

    async fn review_opposition(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        opposition_id: Uuid,
        admin_response: &str,
    ) -> Result<Opposition, RgpdError>;

    async fn create_dispute(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        user_id: Uuid,
        decision_ref: &str,
        reason: &str,
    ) -> Result<Dispute, RgpdError>;

    async fn review_dispute(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        dispute_id: Uuid,
        resolution: DisputeResolution,
        admin_response: &str,
    ) -> Result<Dispute, RgpdError>;

    /// Open disputes whose review SLA already elapsed.
    async fn find_exceeding_sla(
        &self,
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<Dispute>, RgpdError>;

    // --- retention ---

    /// One tenant-scoped retention pass; `dry_run` only reports.
    async fn run_tenant_purge_job(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        dry_run: bool,
    ) -> Result<PurgeJobReport, RgpdError>;
}
