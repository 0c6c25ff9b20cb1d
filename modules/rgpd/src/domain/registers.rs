//! Suspension, opposition and dispute registers: three small state
//! machines over (tenant, user) keys.
//!
//! Terminal transitions (opposition review, dispute resolution/rejection)
//! require a non-empty admin response, enforced here at the boundary rather
//! than left to caller discipline. Listings enrich entries with the
//! subject's display name only; no contact fields cross this layer.

use std::sync::Arc;

use tenant_scope::TenantScope;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::RgpdConfig;
use crate::contract::model::{
    Actor, Dispute, DisputeResolution, DisputeStatus, Opposition, OppositionStatus,
    RegisterListing, Suspension, SuspensionStatus,
};
use crate::domain::audit::{event, AuditMetadata, AuditRecorder};
use crate::domain::error::DomainError;
use crate::domain::ports::Clock;
use crate::domain::repo::{
    DisputesRepository, OppositionsRepository, SuspensionsRepository, UsersRepository,
};

const MAX_REASON_LENGTH: usize = 2000;

fn validate_reason(field: &'static str, reason: &str) -> Result<(), DomainError> {
    if reason.trim().is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    if reason.chars().count() > MAX_REASON_LENGTH {
        return Err(DomainError::validation(
            field,
            format!("longer than {MAX_REASON_LENGTH} characters"),
        ));
    }
    Ok(())
}

fn validate_admin_response(response: &str) -> Result<(), DomainError> {
    if response.trim().is_empty() {
        return Err(DomainError::validation(
            "admin_response",
            "required for a terminal review state",
        ));
    }
    Ok(())
}

async fn subject_name(
    users: &Arc<dyn UsersRepository>,
    scope: &TenantScope,
    user_id: Uuid,
) -> Result<Option<String>, DomainError> {
    Ok(users
        .find_by_id(scope, user_id)
        .await?
        .map(|u| u.display_name))
}

/// Restriction-of-processing register (ACTIVE/LIFTED). Also the component
/// that maintains the user row's `data_suspended` flag.
#[derive(Clone)]
pub struct SuspensionService {
    suspensions: Arc<dyn SuspensionsRepository>,
    users: Arc<dyn UsersRepository>,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
}

impl SuspensionService {
    pub fn new(
        suspensions: Arc<dyn SuspensionsRepository>,
        users: Arc<dyn UsersRepository>,
        audit: AuditRecorder,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            suspensions,
            users,
            audit,
            clock,
        }
    }

    #[instrument(
        name = "rgpd.suspension.create",
        skip(self, scope, reason),
        fields(tenant = %scope, user_id = %user_id)
    )]
    pub async fn create(
        &self,
        scope: &TenantScope,
        actor: Actor,
        user_id: Uuid,
        reason: &str,
    ) -> Result<Suspension, DomainError> {
        validate_reason("reason", reason)?;

        self.users
            .find_by_id(scope, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user_id))?;

        if let Some(existing) = self.suspensions.find_active_for_user(scope, user_id).await? {
            debug!(already_processed = true, "suspension already active");
            return Ok(existing);
        }

        let now = self.clock.now();
        let suspension = Suspension {
            id: Uuid::new_v4(),
            tenant_id: scope.tenant_uuid(),
            user_id,
            status: SuspensionStatus::Active,
            reason: reason.to_owned(),
            created_at: now,
            lifted_at: None,
            lifted_by: None,
        };

        // Audit before the register row and the flag flip.
        self.audit
            .record(
                event::SUSPENSION_CREATED,
                actor,
                Some(scope),
                Some(user_id),
                AuditMetadata::new(),
            )
            .await?;

        let flagged = self
            .users
            .set_suspended(scope, user_id, true, Some(reason.to_owned()), now)
            .await?;
        if !flagged {
            // The user vanished between the existence check and the flip.
            return Err(DomainError::not_found("user", user_id));
        }
        self.suspensions.insert(scope, suspension.clone()).await?;

        info!("processing suspended");
        Ok(suspension)
    }

    /// Lifting clears the active flag but retains the row as history.
    /// Lifting an already-lifted suspension is a no-op.
    #[instrument(
        name = "rgpd.suspension.lift",
        skip(self, scope),
        fields(tenant = %scope, suspension_id = %suspension_id)
    )]
    pub async fn lift(
        &self,
        scope: &TenantScope,
        actor: Actor,
        suspension_id: Uuid,
    ) -> Result<Suspension, DomainError> {
        let mut suspension = self
            .suspensions
            .find_by_id(scope, suspension_id)
            .await?
            .ok_or_else(|| DomainError::not_found("suspension", suspension_id))?;

        if suspension.status == SuspensionStatus::Lifted {
            debug!(already_processed = true, "suspension already lifted");
            return Ok(suspension);
        }

        let now = self.clock.now();
        suspension.status = SuspensionStatus::Lifted;
        suspension.lifted_at = Some(now);
        suspension.lifted_by = actor.id;

        self.audit
            .record(
                event::SUSPENSION_LIFTED,
                actor,
                Some(scope),
                Some(suspension.user_id),
                AuditMetadata::new(),
            )
            .await?;

        let flagged = self
            .users
            .set_suspended(scope, suspension.user_id, false, None, now)
            .await?;
        if !flagged {
            return Err(DomainError::not_found("user", suspension.user_id));
        }
        self.suspensions.update(scope, suspension.clone()).await?;

        info!("suspension lifted");
        Ok(suspension)
    }

    pub async fn find_by_tenant(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<RegisterListing<Suspension>>, DomainError> {
        let entries = self.suspensions.find_by_tenant(scope).await?;
        let mut listings = Vec::with_capacity(entries.len());
        for entry in entries {
            let subject_name = subject_name(&self.users, scope, entry.user_id).await?;
            listings.push(RegisterListing {
                entry,
                subject_name,
            });
        }
        Ok(listings)
    }

    pub async fn find_active(&self, scope: &TenantScope) -> Result<Vec<Suspension>, DomainError> {
        Ok(self.suspensions.find_active(scope).await?)
    }
}

/// Objection-to-processing register (PENDING/REVIEWED).
#[derive(Clone)]
pub struct OppositionService {
    oppositions: Arc<dyn OppositionsRepository>,
    users: Arc<dyn UsersRepository>,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
}

impl OppositionService {
    pub fn new(
        oppositions: Arc<dyn OppositionsRepository>,
        users: Arc<dyn UsersRepository>,
        audit: AuditRecorder,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            oppositions,
            users,
            audit,
            clock,
        }
    }

    #[instrument(
        name = "rgpd.opposition.create",
        skip(self, scope, reason),
        fields(tenant = %scope, user_id = %user_id)
    )]
    pub async fn create(
        &self,
        scope: &TenantScope,
        actor: Actor,
        user_id: Uuid,
        reason: &str,
    ) -> Result<Opposition, DomainError> {
        validate_reason("reason", reason)?;

        self.users
            .find_by_id(scope, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user_id))?;

        let opposition = Opposition {
            id: Uuid::new_v4(),
            tenant_id: scope.tenant_uuid(),
            user_id,
            status: OppositionStatus::Pending,
            reason: reason.to_owned(),
            admin_response: None,
            created_at: self.clock.now(),
            reviewed_by: None,
            reviewed_at: None,
        };

        self.audit
            .record(
                event::OPPOSITION_CREATED,
                actor,
                Some(scope),
                Some(user_id),
                AuditMetadata::new(),
            )
            .await?;

        self.oppositions.insert(scope, opposition.clone()).await?;

        info!("opposition recorded");
        Ok(opposition)
    }

    /// Reviewing requires a non-empty admin response and a pending entry.
    #[instrument(
        name = "rgpd.opposition.review",
        skip(self, scope, admin_response),
        fields(tenant = %scope, opposition_id = %opposition_id)
    )]
    pub async fn review(
        &self,
        scope: &TenantScope,
        actor: Actor,
        opposition_id: Uuid,
        admin_response: &str,
    ) -> Result<Opposition, DomainError> {
        validate_admin_response(admin_response)?;

        let mut opposition = self
            .oppositions
            .find_by_id(scope, opposition_id)
            .await?
            .ok_or_else(|| DomainError::not_found("opposition", opposition_id))?;

        if opposition.status != OppositionStatus::Pending {
            return Err(DomainError::validation(
                "status",
                "opposition is not pending review",
            ));
        }

        opposition.status = OppositionStatus::Reviewed;
        opposition.admin_response = Some(admin_response.to_owned());
        opposition.reviewed_by = actor.id;
        opposition.reviewed_at = Some(self.clock.now());

        self.audit
            .record(
                event::OPPOSITION_REVIEWED,
                actor,
                Some(scope),
                Some(opposition.user_id),
                AuditMetadata::new(),
            )
            .await?;

        self.oppositions.update(scope, opposition.clone()).await?;

        info!("opposition reviewed");
        Ok(opposition)
    }

    pub async fn find_by_tenant(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<RegisterListing<Opposition>>, DomainError> {
        let entries = self.oppositions.find_by_tenant(scope).await?;
        let mut listings = Vec::with_capacity(entries.len());
        for entry in entries {
            let subject_name = subject_name(&self.users, scope, entry.user_id).await?;
            listings.push(RegisterListing {
                entry,
                subject_name,
            });
        }
        Ok(listings)
    }

    pub async fn find_pending(&self, scope: &TenantScope) -> Result<Vec<Opposition>, DomainError> {
        Ok(self.oppositions.find_pending(scope).await?)
    }
}

/// Automated-decision dispute register with a human-review SLA.
#[derive(Clone)]
pub struct DisputeService {
    disputes: Arc<dyn DisputesRepository>,
    users: Arc<dyn UsersRepository>,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
    config: RgpdConfig,
}

impl DisputeService {
    pub fn new(
        disputes: Arc<dyn DisputesRepository>,
        users: Arc<dyn UsersRepository>,
        audit: AuditRecorder,
        clock: Arc<dyn Clock>,
        config: RgpdConfig,
    ) -> Self {
        Self {
            disputes,
            users,
            audit,
            clock,
            config,
        }
    }

    /// The reason length gate is a content-quality gate, not a security
    /// gate: disputes go to human review and need enough substance to act
    /// on.
    #[instrument(
        name = "rgpd.dispute.create",
        skip(self, scope, reason),
        fields(tenant = %scope, user_id = %user_id)
    )]
    pub async fn create(
        &self,
        scope: &TenantScope,
        actor: Actor,
        user_id: Uuid,
        decision_ref: &str,
        reason: &str,
    ) -> Result<Dispute, DomainError> {
        let chars = reason.trim().chars().count();
        if chars < self.config.dispute_reason_min_chars {
            return Err(DomainError::validation(
                "reason",
                format!(
                    "shorter than {} characters",
                    self.config.dispute_reason_min_chars
                ),
            ));
        }
        if chars > self.config.dispute_reason_max_chars {
            return Err(DomainError::validation(
                "reason",
                format!(
                    "longer than {} characters",
                    self.config.dispute_reason_max_chars
                ),
            ));
        }
        if decision_ref.trim().is_empty() {
            return Err(DomainError::validation("decision_ref", "must not be empty"));
        }

        self.users
            .find_by_id(scope, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user_id))?;

        let now = self.clock.now();
        let dispute = Dispute {
            id: Uuid::new_v4(),
            tenant_id: scope.tenant_uuid(),
            user_id,
            decision_ref: decision_ref.to_owned(),
            reason: reason.to_owned(),
            status: DisputeStatus::Pending,
            admin_response: None,
            created_at: now,
            sla_deadline: now + chrono::Duration::days(self.config.dispute_sla_days),
            reviewed_by: None,
            reviewed_at: None,
            resolved_at: None,
        };

        self.audit
            .record(
                event::DISPUTE_CREATED,
                actor,
                Some(scope),
                Some(user_id),
                AuditMetadata::new()
                    .days("sla_days", self.config.dispute_sla_days)
                    .timestamp("sla_deadline", dispute.sla_deadline),
            )
            .await?;

        self.disputes.insert(scope, dispute.clone()).await?;

        info!("dispute recorded");
        Ok(dispute)
    }

    /// PENDING -> UNDER_REVIEW. Claims the dispute for a reviewer without
    /// deciding it.
    #[instrument(
        name = "rgpd.dispute.begin_review",
        skip(self, scope),
        fields(tenant = %scope, dispute_id = %dispute_id)
    )]
    pub async fn begin_review(
        &self,
        scope: &TenantScope,
        actor: Actor,
        dispute_id: Uuid,
    ) -> Result<Dispute, DomainError> {
        let mut dispute = self
            .disputes
            .find_by_id(scope, dispute_id)
            .await?
            .ok_or_else(|| DomainError::not_found("dispute", dispute_id))?;

        if dispute.status != DisputeStatus::Pending {
            return Err(DomainError::validation("status", "dispute is not pending"));
        }

        dispute.status = DisputeStatus::UnderReview;
        dispute.reviewed_by = actor.id;
        dispute.reviewed_at = Some(self.clock.now());

        self.audit
            .record(
                event::DISPUTE_REVIEW_STARTED,
                actor,
                Some(scope),
                Some(dispute.user_id),
                AuditMetadata::new(),
            )
            .await?;

        self.disputes.update(scope, dispute.clone()).await?;

        info!("dispute moved under review");
        Ok(dispute)
    }

    /// Terminal transition to RESOLVED or REJECTED; only open disputes
    /// qualify and the admin response is mandatory.
    #[instrument(
        name = "rgpd.dispute.review",
        skip(self, scope, admin_response),
        fields(tenant = %scope, dispute_id = %dispute_id)
    )]
    pub async fn review(
        &self,
        scope: &TenantScope,
        actor: Actor,
        dispute_id: Uuid,
        resolution: DisputeResolution,
        admin_response: &str,
    ) -> Result<Dispute, DomainError> {
        validate_admin_response(admin_response)?;

        let mut dispute = self
            .disputes
            .find_by_id(scope, dispute_id)
            .await?
            .ok_or_else(|| DomainError::not_found("dispute", dispute_id))?;

        if !dispute.status.is_open() {
            return Err(DomainError::validation(
                "status",
                "dispute is already decided",
            ));
        }

        let now = self.clock.now();
        dispute.status = match resolution {
            DisputeResolution::Resolved => DisputeStatus::Resolved,
            DisputeResolution::Rejected => DisputeStatus::Rejected,
        };
        dispute.admin_response = Some(admin_response.to_owned());
        dispute.reviewed_by = actor.id;
        dispute.reviewed_at = Some(now);
        dispute.resolved_at = Some(now);

        self.audit
            .record(
                event::DISPUTE_REVIEWED,
                actor,
                Some(scope),
                Some(dispute.user_id),
                AuditMetadata::new().tag_if_safe("outcome", dispute.status.as_str()),
            )
            .await?;

        self.disputes.update(scope, dispute.clone()).await?;

        info!("dispute decided");
        Ok(dispute)
    }

    pub async fn find_by_tenant(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<RegisterListing<Dispute>>, DomainError> {
        let entries = self.disputes.find_by_tenant(scope).await?;
        let mut listings = Vec::with_capacity(entries.len());
        for entry in entries {
            let subject_name = subject_name(&self.users, scope, entry.user_id).await?;
            listings.push(RegisterListing {
                entry,
                subject_name,
            });
        }
        Ok(listings)
    }

    pub async fn find_pending(&self, scope: &TenantScope) -> Result<Vec<Dispute>, DomainError> {
        Ok(self.disputes.find_pending(scope).await?)
    }

    /// Open disputes older than the SLA window, by timestamp comparison.
    #[instrument(name = "rgpd.dispute.find_exceeding_sla", skip(self, scope), fields(tenant = %scope))]
    pub async fn find_exceeding_sla(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<Dispute>, DomainError> {
        let now = self.clock.now();
        Ok(self.disputes.find_exceeding_sla(scope, now).await?)
    }
}
