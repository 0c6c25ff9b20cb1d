//! Consent ledger: append-only per-purpose consent records.

use std::sync::Arc;

use tenant_scope::TenantScope;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::contract::model::{Actor, Consent, ConsentDecision};
use crate::domain::audit::{event, AuditMetadata, AuditRecorder};
use crate::domain::error::DomainError;
use crate::domain::ports::Clock;
use crate::domain::repo::{ConsentRepository, UsersRepository};

const MAX_PURPOSE_LENGTH: usize = 128;

/// Ledger semantics: a grant always inserts a new row, a revoke flips only
/// the latest row for the exact key, and the latest row wins on reads.
/// Purposes are isolated keys; "analytics" never implies "marketing".
#[derive(Clone)]
pub struct ConsentService {
    consents: Arc<dyn ConsentRepository>,
    users: Arc<dyn UsersRepository>,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
}

impl ConsentService {
    pub fn new(
        consents: Arc<dyn ConsentRepository>,
        users: Arc<dyn UsersRepository>,
        audit: AuditRecorder,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            consents,
            users,
            audit,
            clock,
        }
    }

    #[instrument(
        name = "rgpd.consent.grant",
        skip(self, scope),
        fields(tenant = %scope, user_id = %user_id, purpose = %purpose)
    )]
    pub async fn grant(
        &self,
        scope: &TenantScope,
        actor: Actor,
        user_id: Uuid,
        purpose: &str,
    ) -> Result<Consent, DomainError> {
        validate_purpose(purpose)?;

        self.users
            .find_by_id(scope, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user_id))?;

        let now = self.clock.now();
        let consent = Consent {
            id: Uuid::new_v4(),
            tenant_id: scope.tenant_uuid(),
            user_id,
            purpose: purpose.to_owned(),
            granted: true,
            granted_at: now,
            revoked_at: None,
            deleted_at: None,
        };

        // Audit first: if the sink refuses the event, no ledger row is
        // written and the grant reports failure.
        self.audit
            .record(
                event::CONSENT_GRANTED,
                actor,
                Some(scope),
                Some(user_id),
                AuditMetadata::new().tag_if_safe("purpose", purpose),
            )
            .await?;

        self.consents.insert(scope, consent.clone()).await?;

        info!("consent granted");
        Ok(consent)
    }

    /// Returns true when a granted row was actually revoked; revoking twice
    /// (or revoking a never-granted purpose) is a no-op.
    #[instrument(
        name = "rgpd.consent.revoke",
        skip(self, scope),
        fields(tenant = %scope, user_id = %user_id, purpose = %purpose)
    )]
    pub async fn revoke(
        &self,
        scope: &TenantScope,
        actor: Actor,
        user_id: Uuid,
        purpose: &str,
    ) -> Result<bool, DomainError> {
        validate_purpose(purpose)?;

        self.users
            .find_by_id(scope, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user_id))?;

        let latest_granted = self
            .consents
            .latest(scope, user_id, purpose)
            .await?
            .is_some_and(|c| c.granted);
        if !latest_granted {
            debug!(already_processed = true, "nothing to revoke");
            return Ok(false);
        }

        // Audit before the flip; a concurrent revoke between the check and
        // the flip costs an extra event, never a missing one.
        self.audit
            .record(
                event::CONSENT_REVOKED,
                actor,
                Some(scope),
                Some(user_id),
                AuditMetadata::new().tag_if_safe("purpose", purpose),
            )
            .await?;

        let now = self.clock.now();
        let changed = self
            .consents
            .revoke_latest(scope, user_id, purpose, now)
            .await?;
        if changed {
            info!("consent revoked");
        }
        Ok(changed)
    }

    /// Latest-wins read. No matching row means `Unknown`, which callers
    /// must distinguish from an explicit `Revoked`.
    #[instrument(
        name = "rgpd.consent.get",
        skip(self, scope),
        fields(tenant = %scope, user_id = %user_id, purpose = %purpose)
    )]
    pub async fn get(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        purpose: &str,
    ) -> Result<ConsentDecision, DomainError> {
        validate_purpose(purpose)?;

        let decision = match self.consents.latest(scope, user_id, purpose).await? {
            None => ConsentDecision::Unknown,
            Some(row) if row.granted => ConsentDecision::Granted {
                granted_at: row.granted_at,
            },
            Some(row) => ConsentDecision::Revoked {
                // A revoked latest row always carries its revocation time.
                revoked_at: row.revoked_at.unwrap_or(row.granted_at),
            },
        };
        Ok(decision)
    }

    /// Latest row per purpose for one user.
    #[instrument(
        name = "rgpd.consent.list",
        skip(self, scope),
        fields(tenant = %scope, user_id = %user_id)
    )]
    pub async fn list(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
    ) -> Result<Vec<Consent>, DomainError> {
        let consents = self.consents.latest_per_purpose(scope, user_id).await?;
        debug!("listed {} consent purposes", consents.len());
        Ok(consents)
    }
}

fn validate_purpose(purpose: &str) -> Result<(), DomainError> {
    if purpose.trim().is_empty() {
        return Err(DomainError::validation("purpose", "must not be empty"));
    }
    if purpose.len() > MAX_PURPOSE_LENGTH {
        return Err(DomainError::validation(
            "purpose",
            format!("longer than {MAX_PURPOSE_LENGTH} characters"),
        ));
    }
    Ok(())
}
