//! Ports for the domain layer: persistence operations the domain needs.
//!
//! Every method on tenant-scoped data takes a [`TenantScope`] as its first
//! parameter; implementations filter by the scope's tenant id and
//! re-validate fetched rows with [`TenantScope::assert_owns`]. The only
//! unscoped lookup is [`RequestsRepository::find_by_id`], which the purge
//! path uses to recover the owning tenant from the request row itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tenant_scope::{IsolationError, TenantOwned, TenantScope};
use thiserror::Error;
use uuid::Uuid;

use crate::contract::model::{
    Consent, DataSubjectRequest, Dispute, ExportBundle, Opposition, Suspension, UsageRecord, User,
};

/// Repository failures. Isolation violations keep their own class so the
/// domain can refuse to downgrade them; everything else is opaque storage
/// trouble.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Isolation(#[from] IsolationError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// Insert a fully-formed user. Service computes id/fingerprint/timestamps.
    async fn insert(&self, scope: &TenantScope, user: User) -> RepoResult<()>;

    /// Load a visible (not soft-deleted) user by id.
    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> RepoResult<Option<User>>;

    /// Lookup by email fingerprint, excluding soft-deleted rows.
    async fn find_by_email_fingerprint(
        &self,
        scope: &TenantScope,
        fingerprint: &str,
    ) -> RepoResult<Option<User>>;

    /// All visible users of the tenant.
    async fn list_by_tenant(&self, scope: &TenantScope) -> RepoResult<Vec<User>>;

    /// Flip the data-suspension flag. Returns false when the user is absent.
    async fn set_suspended(
        &self,
        scope: &TenantScope,
        id: Uuid,
        suspended: bool,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> RepoResult<bool>;

    /// Mark the row invisible to every normal read path. Returns false when
    /// the user is absent or already soft-deleted.
    async fn soft_delete(&self, scope: &TenantScope, id: Uuid, at: DateTime<Utc>)
        -> RepoResult<bool>;

    /// Physically remove the row, soft-deleted or not. Returns rows removed.
    async fn hard_delete(&self, scope: &TenantScope, id: Uuid) -> RepoResult<u64>;
}

#[async_trait]
pub trait ConsentRepository: Send + Sync {
    /// Append one ledger row. Existing rows are never updated by a grant.
    async fn insert(&self, scope: &TenantScope, consent: Consent) -> RepoResult<()>;

    /// Latest visible row for the exact (user, purpose) key.
    async fn latest(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        purpose: &str,
    ) -> RepoResult<Option<Consent>>;

    /// Latest visible row per purpose for one user.
    async fn latest_per_purpose(&self, scope: &TenantScope, user_id: Uuid)
        -> RepoResult<Vec<Consent>>;

    /// Flip the latest granted row for the key to revoked, atomically with
    /// respect to concurrent grants on the same key. Returns true when a
    /// row changed; revoking an already-revoked or unknown purpose is a
    /// no-op returning false.
    async fn revoke_latest(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        purpose: &str,
        at: DateTime<Utc>,
    ) -> RepoResult<bool>;

    async fn soft_delete_by_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> RepoResult<u64>;

    async fn hard_delete_by_user(&self, scope: &TenantScope, user_id: Uuid) -> RepoResult<u64>;
}

#[async_trait]
pub trait RequestsRepository: Send + Sync {
    async fn insert(&self, scope: &TenantScope, request: DataSubjectRequest) -> RepoResult<()>;

    /// Platform-scope lookup used by the purge path; the caller rebuilds a
    /// scope from the stored tenant id before touching anything else.
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<DataSubjectRequest>>;

    /// Pending deletion request for a user, if any (idempotence check).
    async fn find_pending_deletion(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
    ) -> RepoResult<Option<DataSubjectRequest>>;

    /// Request history (exports and deletions) for one user.
    async fn list_by_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
    ) -> RepoResult<Vec<DataSubjectRequest>>;

    /// Transition Pending -> Completed. Returns false when the request was
    /// already completed.
    async fn mark_completed(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<bool>;

    /// Pending deletion requests whose purge date is at or before `now`.
    async fn list_due_deletions(
        &self,
        scope: &TenantScope,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<DataSubjectRequest>>;
}

/// Persisted bundle row: the public reference plus the sealing key. Row +
/// blob deletion together are the crypto-shred.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBundle {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub key_hex: String,
}

impl StoredBundle {
    pub fn to_public(&self) -> ExportBundle {
        ExportBundle {
            id: self.id,
            tenant_id: self.tenant_id,
            user_id: self.user_id,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

impl TenantOwned for StoredBundle {
    fn owning_tenant(&self) -> Uuid {
        self.tenant_id
    }
}

#[async_trait]
pub trait BundlesRepository: Send + Sync {
    async fn insert(&self, scope: &TenantScope, bundle: StoredBundle) -> RepoResult<()>;

    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> RepoResult<Option<StoredBundle>>;

    async fn list_by_user(&self, scope: &TenantScope, user_id: Uuid)
        -> RepoResult<Vec<StoredBundle>>;

    /// Bundles whose TTL elapsed at or before `now`; a bundle is sweepable
    /// at the same instant it stops opening.
    async fn list_expired(
        &self,
        scope: &TenantScope,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<StoredBundle>>;

    async fn delete(&self, scope: &TenantScope, id: Uuid) -> RepoResult<bool>;
}

#[async_trait]
pub trait SuspensionsRepository: Send + Sync {
    async fn insert(&self, scope: &TenantScope, suspension: Suspension) -> RepoResult<()>;

    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> RepoResult<Option<Suspension>>;

    async fn find_active_for_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
    ) -> RepoResult<Option<Suspension>>;

    async fn find_by_tenant(&self, scope: &TenantScope) -> RepoResult<Vec<Suspension>>;

    async fn find_active(&self, scope: &TenantScope) -> RepoResult<Vec<Suspension>>;

    async fn update(&self, scope: &TenantScope, suspension: Suspension) -> RepoResult<()>;
}

#[async_trait]
pub trait OppositionsRepository: Send + Sync {
    async fn insert(&self, scope: &TenantScope, opposition: Opposition) -> RepoResult<()>;

    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> RepoResult<Option<Opposition>>;

    async fn find_by_tenant(&self, scope: &TenantScope) -> RepoResult<Vec<Opposition>>;

    async fn find_pending(&self, scope: &TenantScope) -> RepoResult<Vec<Opposition>>;

    async fn update(&self, scope: &TenantScope, opposition: Opposition) -> RepoResult<()>;
}

#[async_trait]
pub trait DisputesRepository: Send + Sync {
    async fn insert(&self, scope: &TenantScope, dispute: Dispute) -> RepoResult<()>;

    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> RepoResult<Option<Dispute>>;

    async fn find_by_tenant(&self, scope: &TenantScope) -> RepoResult<Vec<Dispute>>;

    async fn find_pending(&self, scope: &TenantScope) -> RepoResult<Vec<Dispute>>;

    /// Open disputes whose SLA deadline lies strictly before `now`. Pure
    /// timestamp comparison; no timer process exists.
    async fn find_exceeding_sla(
        &self,
        scope: &TenantScope,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<Dispute>>;

    async fn update(&self, scope: &TenantScope, dispute: Dispute) -> RepoResult<()>;
}

#[async_trait]
pub trait UsageRepository: Send + Sync {
    async fn insert(&self, scope: &TenantScope, record: UsageRecord) -> RepoResult<()>;

    /// Visible records for one user.
    async fn list_by_user(&self, scope: &TenantScope, user_id: Uuid)
        -> RepoResult<Vec<UsageRecord>>;

    async fn soft_delete_by_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> RepoResult<u64>;

    async fn hard_delete_by_user(&self, scope: &TenantScope, user_id: Uuid) -> RepoResult<u64>;

    /// Rows created strictly before `cutoff`, for dry-run previews.
    async fn count_older_than(&self, scope: &TenantScope, cutoff: DateTime<Utc>)
        -> RepoResult<u64>;

    /// Delete rows created strictly before `cutoff`; rows at or inside the
    /// window are untouched.
    async fn delete_older_than(
        &self,
        scope: &TenantScope,
        cutoff: DateTime<Utc>,
    ) -> RepoResult<u64>;
}
