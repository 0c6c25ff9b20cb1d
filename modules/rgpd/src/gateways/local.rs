//! Local in-process implementation of [`RgpdApi`].
//!
//! The gateway is the isolation boundary: it turns the caller-supplied
//! tenant id into a validated [`TenantScope`] before any service runs, and
//! projects rich domain errors into the safe contract enum on the way out.

use async_trait::async_trait;
use tenant_scope::TenantScope;
use uuid::Uuid;

use crate::contract::client::RgpdApi;
use crate::contract::error::RgpdError;
use crate::contract::model::{
    Actor, Consent, ConsentDecision, DeletionOutcome, Dispute, DisputeResolution, ExportBundle,
    ExportSnapshot, Opposition, PurgeJobReport, PurgeOutcome, Suspension,
};
use crate::domain::consent::ConsentService;
use crate::domain::registers::{DisputeService, OppositionService, SuspensionService};
use crate::domain::requests::DsrService;
use crate::domain::retention::RetentionService;

pub struct RgpdLocalClient {
    consent: ConsentService,
    suspensions: SuspensionService,
    oppositions: OppositionService,
    disputes: DisputeService,
    dsr: DsrService,
    retention: RetentionService,
}

impl RgpdLocalClient {
    pub fn new(
        consent: ConsentService,
        suspensions: SuspensionService,
        oppositions: OppositionService,
        disputes: DisputeService,
        dsr: DsrService,
        retention: RetentionService,
    ) -> Self {
        Self {
            consent,
            suspensions,
            oppositions,
            disputes,
            dsr,
            retention,
        }
    }

    fn scope(tenant_id: Option<Uuid>) -> Result<TenantScope, RgpdError> {
        TenantScope::new(tenant_id).map_err(Into::into)
    }
}

#[async_trait]
impl RgpdApi for RgpdLocalClient {
    async fn grant_consent(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        user_id: Uuid,
        purpose: &str,
    ) -> Result<Consent, RgpdError> {
        let scope = Self::scope(tenant_id)?;
        self.consent
            .grant(&scope, actor, user_id, purpose)
            .await
            .map_err(Into::into)
    }

    async fn revoke_consent(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        user_id: Uuid,
        purpose: &str,
    ) -> Result<bool, RgpdError> {
        let scope = Self::scope(tenant_id)?;
        self.consent
            .revoke(&scope, actor, user_id, purpose)
            .await
            .map_err(Into::into)
    }

    async fn get_consent(
        &self,
        tenant_id: Option<Uuid>,
        user_id: Uuid,
        purpose: &str,
    ) -> Result<ConsentDecision, RgpdError> {
        let scope = Self::scope(tenant_id)?;
        self.consent
            .get(&scope, user_id, purpose)
            .await
            .map_err(Into::into)
    }

    async fn list_consents(
        &self,
        tenant_id: Option<Uuid>,
        user_id: Uuid,
    ) -> Result<Vec<Consent>, RgpdError> {
        let scope = Self::scope(tenant_id)?;
        self.consent
            .list(&scope, user_id)
            .await
            .map_err(Into::into)
    }

    async fn request_export(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        user_id: Uuid,
    ) -> Result<ExportBundle, RgpdError> {
        let scope = Self::scope(tenant_id)?;
        self.dsr
            .export_user_data(&scope, actor, user_id)
            .await
            .map_err(Into::into)
    }

    async fn open_export(
        &self,
        tenant_id: Option<Uuid>,
        bundle_id: Uuid,
    ) -> Result<Option<ExportSnapshot>, RgpdError> {
        let scope = Self::scope(tenant_id)?;
        self.dsr
            .open_export(&scope, bundle_id)
            .await
            .map_err(Into::into)
    }

    async fn request_deletion(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        user_id: Uuid,
    ) -> Result<DeletionOutcome, RgpdError> {
        let scope = Self::scope(tenant_id)?;
        self.dsr
            .request_deletion(&scope, actor, user_id)
            .await
            .map_err(Into::into)
    }

    async fn purge_request(
        &self,
        actor: Actor,
        request_id: Uuid,
    ) -> Result<PurgeOutcome, RgpdError> {
        self.dsr.purge(actor, request_id).await.map_err(Into::into)
    }

    async fn create_suspension(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        user_id: Uuid,
        reason: &str,
    ) -> Result<Suspension, RgpdError> {
        let scope = Self::scope(tenant_id)?;
        self.suspensions
            .create(&scope, actor, user_id, reason)
            .await
            .map_err(Into::into)
    }

    async fn lift_suspension(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        suspension_id: Uuid,
    ) -> Result<Suspension, RgpdError> {
        let scope = Self::scope(tenant_id)?;
        self.suspensions
            .lift(&scope, actor, suspension_id)
            .await
            .map_err(Into::into)
    }

    async fn create_opposition(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        user_id: Uuid,
        reason: &str,
    ) -> Result<Opposition, RgpdError> {
        let scope = Self::scope(tenant_id)?;
        self.oppositions
            .create(&scope, actor, user_id, reason)
            .await
            .map_err(Into::into)
    }

    async fn review_opposition(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        opposition_id: Uuid,
        admin_response: &str,
    ) -> Result<Opposition, RgpdError> {
        let scope = Self::scope(tenant_id)?;
        self.oppositions
            .review(&scope, actor, opposition_id, admin_response)
            .await
            .map_err(Into::into)
    }

    async fn create_dispute(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        user_id: Uuid,
        decision_ref: &str,
        reason: &str,
    ) -> Result<Dispute, RgpdError> {
        let scope = Self::scope(tenant_id)?;
        self.disputes
            .create(&scope, actor, user_id, decision_ref, reason)
            .await
            .map_err(Into::into)
    }

    async fn review_dispute(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        dispute_id: Uuid,
        resolution: DisputeResolution,
        admin_response: &str,
    ) -> Result<Dispute, RgpdError> {
        let scope = Self::scope(tenant_id)?;
        self.disputes
            .review(&scope, actor, dispute_id, resolution, admin_response)
            .await
            .map_err(Into::into)
    }

    async fn find_exceeding_sla(
        &self,
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<Dispute>, RgpdError> {
        let scope = Self::scope(tenant_id)?;
        self.disputes
            .find_exceeding_sla(&scope)
            .await
            .map_err(Into::into)
    }

    async fn run_tenant_purge_job(
        &self,
        tenant_id: Option<Uuid>,
        actor: Actor,
        dry_run: bool,
    ) -> Result<PurgeJobReport, RgpdError> {
        let scope = Self::scope(tenant_id)?;
        self.retention
            .run_tenant_purge_job(&scope, actor, dry_run)
            .await
            .map_err(Into::into)
    }
}
