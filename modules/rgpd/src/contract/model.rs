//! Public data model of the lifecycle engine.
//!
//! Everything here is a P1-safe projection: no raw email addresses, no
//! credentials, no content fields. The only trace of a contact address is
//! the SHA-256 fingerprint used for lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenant_scope::TenantOwned;
use uuid::Uuid;

/// A data subject inside one tenant.
///
/// Lifecycle: created -> optionally suspended/unsuspended -> soft-deleted
/// (`deleted_at` set, invisible to all normal reads) -> hard-deleted after
/// the retention window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// SHA-256 hex of the lowercased address; the raw address never enters
    /// this core.
    pub email_fingerprint: String,
    pub display_name: String,
    pub data_suspended: bool,
    pub suspended_reason: Option<String>,
    pub suspended_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantOwned for User {
    fn owning_tenant(&self) -> Uuid {
        self.tenant_id
    }
}

/// One row of the append-only consent ledger. Grants insert new rows; only
/// the latest row per (tenant, user, purpose) is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    /// Exact, case-sensitive key. No wildcard or hierarchy semantics.
    pub purpose: String,
    pub granted: bool,
    pub granted_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TenantOwned for Consent {
    fn owning_tenant(&self) -> Uuid {
        self.tenant_id
    }
}

/// Read projection of the ledger. `Unknown` ("never asked") is distinct
/// from `Revoked` ("explicitly denied").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentDecision {
    Unknown,
    Granted { granted_at: DateTime<Utc> },
    Revoked { revoked_at: DateTime<Utc> },
}

impl ConsentDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Export,
    Deletion,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::Deletion => "deletion",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

/// A data-subject-rights request (export or deletion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSubjectRequest {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    /// Deletion requests only: `created_at` + retention days. The purge
    /// gate compares against this, never against a recomputed value.
    pub scheduled_purge_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TenantOwned for DataSubjectRequest {
    fn owning_tenant(&self) -> Uuid {
        self.tenant_id
    }
}

/// Public reference to an encrypted export bundle. The per-bundle key never
/// crosses the contract boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TenantOwned for ExportBundle {
    fn owning_tenant(&self) -> Uuid {
        self.tenant_id
    }
}

/// Decrypted export payload: profile, latest consents, usage metadata.
/// Never carries fingerprints, credentials, or content fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSnapshot {
    pub profile: ExportedProfile,
    pub consents: Vec<ExportedConsent>,
    pub usage: Vec<ExportedUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedProfile {
    pub user_id: Uuid,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedConsent {
    pub purpose: String,
    pub granted: bool,
    pub granted_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedUsage {
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuspensionStatus {
    Active,
    Lifted,
}

impl SuspensionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Lifted => "lifted",
        }
    }
}

/// Restriction-of-processing entry. Lifting clears the active flag but the
/// row is retained as history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suspension {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub status: SuspensionStatus,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub lifted_at: Option<DateTime<Utc>>,
    pub lifted_by: Option<Uuid>,
}

impl TenantOwned for Suspension {
    fn owning_tenant(&self) -> Uuid {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OppositionStatus {
    Pending,
    Reviewed,
}

impl OppositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
        }
    }
}

/// Objection-to-processing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opposition {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub status: OppositionStatus,
    pub reason: String,
    pub admin_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl TenantOwned for Opposition {
    fn owning_tenant(&self) -> Uuid {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeStatus {
    Pending,
    UnderReview,
    Resolved,
    Rejected,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
        }
    }

    /// Open means the human-review SLA clock is still running.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::UnderReview)
    }
}

/// Terminal outcomes of a dispute review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeResolution {
    Resolved,
    Rejected,
}

/// Contestation of an automated decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    /// Machine reference to the contested automated decision.
    pub decision_ref: String,
    pub reason: String,
    pub status: DisputeStatus,
    pub admin_response: Option<String>,
    pub created_at: DateTime<Utc>,
    /// `created_at` + SLA days; open disputes past this are overdue.
    pub sla_deadline: DateTime<Utc>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl TenantOwned for Dispute {
    fn owning_tenant(&self) -> Uuid {
        self.tenant_id
    }
}

/// Non-content metadata of one AI-processing job. The 90-day retention
/// category and the "usage" slice of exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TenantOwned for UsageRecord {
    fn owning_tenant(&self) -> Uuid {
        self.tenant_id
    }
}

/// Who performed an operation, for audit purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorScope {
    /// Platform operator acting outside any tenant.
    Platform,
    /// Tenant admin or the data subject themselves.
    Tenant,
    /// The retention scheduler.
    Scheduler,
}

impl ActorScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::Tenant => "tenant",
            Self::Scheduler => "scheduler",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub scope: ActorScope,
    pub id: Option<Uuid>,
}

impl Actor {
    pub fn platform(id: Uuid) -> Self {
        Self {
            scope: ActorScope::Platform,
            id: Some(id),
        }
    }

    pub fn tenant_user(id: Uuid) -> Self {
        Self {
            scope: ActorScope::Tenant,
            id: Some(id),
        }
    }

    pub fn scheduler() -> Self {
        Self {
            scope: ActorScope::Scheduler,
            id: None,
        }
    }
}

/// Register listing entry: the register row plus the subject's display name
/// (the only identity field tenant admins get to see).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterListing<T> {
    pub entry: T,
    /// `None` when the subject is already soft-deleted.
    pub subject_name: Option<String>,
}

/// Outcome of a deletion request; `newly_created == false` means the call
/// was an idempotent replay of an existing pending request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionOutcome {
    pub request: DataSubjectRequest,
    pub newly_created: bool,
}

/// Per-category hard-delete counts of a purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeCounts {
    pub users: u64,
    pub consents: u64,
    pub usage_records: u64,
    pub bundles: u64,
}

impl PurgeCounts {
    pub fn total(&self) -> u64 {
        self.users + self.consents + self.usage_records + self.bundles
    }

    pub fn add(&mut self, other: &PurgeCounts) {
        self.users += other.users;
        self.consents += other.consents;
        self.usage_records += other.usage_records;
        self.bundles += other.bundles;
    }
}

/// Outcome of purging one deletion request. A replay on a completed request
/// reports `already_completed` with zero counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurgeOutcome {
    pub request_id: Uuid,
    pub already_completed: bool,
    pub deleted: PurgeCounts,
}

/// Report of one tenant-scoped retention run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurgeJobReport {
    pub tenant_id: Uuid,
    pub dry_run: bool,
    /// Due deletion requests that were (or, on dry run, would be) purged.
    pub requests_processed: u64,
    /// Rows removed by those purges. Zeroed on dry run.
    pub deleted: PurgeCounts,
    /// Usage records beyond the category retention window.
    pub aged_usage_records: u64,
    /// Export bundles past their TTL that were crypto-shredded.
    pub expired_bundles: u64,
}

/// One category retention policy for on-demand purges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub retention_days: i64,
}
