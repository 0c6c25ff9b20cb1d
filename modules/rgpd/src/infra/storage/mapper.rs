//! Conversions between SeaORM models and contract/domain types. Status and
//! kind columns are stored as strings; parsing failures surface as storage
//! errors rather than panics.

use anyhow::{anyhow, Result};

use crate::contract::model::{
    Consent, DataSubjectRequest, Dispute, DisputeStatus, Opposition, OppositionStatus,
    RequestKind, RequestStatus, Suspension, SuspensionStatus, UsageRecord, User,
};
use crate::domain::repo::StoredBundle;

use super::entities::{
    consents, disputes, export_bundles, oppositions, requests, suspensions, usage_records, users,
};

pub fn parse_request_kind(value: &str) -> Result<RequestKind> {
    match value {
        "export" => Ok(RequestKind::Export),
        "deletion" => Ok(RequestKind::Deletion),
        other => Err(anyhow!("unknown request kind '{other}'")),
    }
}

pub fn parse_request_status(value: &str) -> Result<RequestStatus> {
    match value {
        "pending" => Ok(RequestStatus::Pending),
        "completed" => Ok(RequestStatus::Completed),
        other => Err(anyhow!("unknown request status '{other}'")),
    }
}

pub fn parse_suspension_status(value: &str) -> Result<SuspensionStatus> {
    match value {
        "active" => Ok(SuspensionStatus::Active),
        "lifted" => Ok(SuspensionStatus::Lifted),
        other => Err(anyhow!("unknown suspension status '{other}'")),
    }
}

pub fn parse_opposition_status(value: &str) -> Result<OppositionStatus> {
    match value {
        "pending" => Ok(OppositionStatus::Pending),
        "reviewed" => Ok(OppositionStatus::Reviewed),
        other => Err(anyhow!("unknown opposition status '{other}'")),
    }
}

pub fn parse_dispute_status(value: &str) -> Result<DisputeStatus> {
    match value {
        "pending" => Ok(DisputeStatus::Pending),
        "under_review" => Ok(DisputeStatus::UnderReview),
        "resolved" => Ok(DisputeStatus::Resolved),
        "rejected" => Ok(DisputeStatus::Rejected),
        other => Err(anyhow!("unknown dispute status '{other}'")),
    }
}

impl From<users::Model> for User {
    fn from(m: users::Model) -> Self {
        Self {
            id: m.id,
            tenant_id: m.tenant_id,
            email_fingerprint: m.email_fingerprint,
            display_name: m.display_name,
            data_suspended: m.data_suspended,
            suspended_reason: m.suspended_reason,
            suspended_at: m.suspended_at,
            deleted_at: m.deleted_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<consents::Model> for Consent {
    fn from(m: consents::Model) -> Self {
        Self {
            id: m.id,
            tenant_id: m.tenant_id,
            user_id: m.user_id,
            purpose: m.purpose,
            granted: m.granted,
            granted_at: m.granted_at,
            revoked_at: m.revoked_at,
            deleted_at: m.deleted_at,
        }
    }
}

pub fn request_from_model(m: requests::Model) -> Result<DataSubjectRequest> {
    Ok(DataSubjectRequest {
        id: m.id,
        tenant_id: m.tenant_id,
        user_id: m.user_id,
        kind: parse_request_kind(&m.kind)?,
        status: parse_request_status(&m.status)?,
        created_at: m.created_at,
        scheduled_purge_at: m.scheduled_purge_at,
        completed_at: m.completed_at,
    })
}

pub fn suspension_from_model(m: suspensions::Model) -> Result<Suspension> {
    Ok(Suspension {
        id: m.id,
        tenant_id: m.tenant_id,
        user_id: m.user_id,
        status: parse_suspension_status(&m.status)?,
        reason: m.reason,
        created_at: m.created_at,
        lifted_at: m.lifted_at,
        lifted_by: m.lifted_by,
    })
}

pub fn opposition_from_model(m: oppositions::Model) -> Result<Opposition> {
    Ok(Opposition {
        id: m.id,
        tenant_id: m.tenant_id,
        user_id: m.user_id,
        status: parse_opposition_status(&m.status)?,
        reason: m.reason,
        admin_response: m.admin_response,
        created_at: m.created_at,
        reviewed_by: m.reviewed_by,
        reviewed_at: m.reviewed_at,
    })
}

pub fn dispute_from_model(m: disputes::Model) -> Result<Dispute> {
    Ok(Dispute {
        id: m.id,
        tenant_id: m.tenant_id,
        user_id: m.user_id,
        decision_ref: m.decision_ref,
        reason: m.reason,
        status: parse_dispute_status(&m.status)?,
        admin_response: m.admin_response,
        created_at: m.created_at,
        sla_deadline: m.sla_deadline,
        reviewed_by: m.reviewed_by,
        reviewed_at: m.reviewed_at,
        resolved_at: m.resolved_at,
    })
}

impl From<usage_records::Model> for UsageRecord {
    fn from(m: usage_records::Model) -> Self {
        Self {
            id: m.id,
            tenant_id: m.tenant_id,
            user_id: m.user_id,
            kind: m.kind,
            created_at: m.created_at,
            deleted_at: m.deleted_at,
        }
    }
}

impl From<export_bundles::Model> for StoredBundle {
    fn from(m: export_bundles::Model) -> Self {
        Self {
            id: m.id,
            tenant_id: m.tenant_id,
            user_id: m.user_id,
            created_at: m.created_at,
            expires_at: m.expires_at,
            key_hex: m.key_hex,
        }
    }
}
