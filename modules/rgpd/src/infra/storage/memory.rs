//! In-memory implementation of every repository port, used by the default
//! test suites and useful for embedding without a database. Vec order is
//! insertion order, which is what gives the consent ledger its latest-wins
//! semantics here.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tenant_scope::TenantScope;
use uuid::Uuid;

use crate::contract::model::{
    Consent, DataSubjectRequest, Dispute, Opposition, OppositionStatus, RequestKind,
    RequestStatus, Suspension, SuspensionStatus, UsageRecord, User,
};
use crate::domain::repo::{
    BundlesRepository, ConsentRepository, DisputesRepository, OppositionsRepository, RepoResult,
    RequestsRepository, StoredBundle, SuspensionsRepository, UsageRepository, UsersRepository,
};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    consents: Vec<Consent>,
    requests: Vec<DataSubjectRequest>,
    bundles: Vec<StoredBundle>,
    suspensions: Vec<Suspension>,
    oppositions: Vec<Opposition>,
    disputes: Vec<Dispute>,
    usage: Vec<UsageRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_scope(scope: &TenantScope, tenant_id: Uuid) -> bool {
    tenant_id == scope.tenant_uuid()
}

#[async_trait]
impl UsersRepository for MemoryStore {
    async fn insert(&self, scope: &TenantScope, user: User) -> RepoResult<()> {
        scope.assert_owns(&user)?;
        self.inner.write().users.push(user);
        Ok(())
    }

    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> RepoResult<Option<User>> {
        let inner = self.inner.read();
        let found = inner
            .users
            .iter()
            .find(|u| in_scope(scope, u.tenant_id) && u.id == id && u.deleted_at.is_none())
            .cloned();
        match found {
            None => Ok(None),
            Some(user) => {
                scope.assert_owns(&user)?;
                Ok(Some(user))
            }
        }
    }

    async fn find_by_email_fingerprint(
        &self,
        scope: &TenantScope,
        fingerprint: &str,
    ) -> RepoResult<Option<User>> {
        let inner = self.inner.read();
        let found = inner
            .users
            .iter()
            .find(|u| {
                in_scope(scope, u.tenant_id)
                    && u.email_fingerprint == fingerprint
                    && u.deleted_at.is_none()
            })
            .cloned();
        match found {
            None => Ok(None),
            Some(user) => {
                scope.assert_owns(&user)?;
                Ok(Some(user))
            }
        }
    }

    async fn list_by_tenant(&self, scope: &TenantScope) -> RepoResult<Vec<User>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        for user in inner
            .users
            .iter()
            .filter(|u| in_scope(scope, u.tenant_id) && u.deleted_at.is_none())
        {
            scope.assert_owns(user)?;
            out.push(user.clone());
        }
        Ok(out)
    }

    async fn set_suspended(
        &self,
        scope: &TenantScope,
        id: Uuid,
        suspended: bool,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut inner = self.inner.write();
        let Some(user) = inner
            .users
            .iter_mut()
            .find(|u| in_scope(scope, u.tenant_id) && u.id == id && u.deleted_at.is_none())
        else {
            return Ok(false);
        };
        user.data_suspended = suspended;
        user.suspended_reason = reason;
        user.suspended_at = suspended.then_some(at);
        user.updated_at = at;
        Ok(true)
    }

    async fn soft_delete(
        &self,
        scope: &TenantScope,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut inner = self.inner.write();
        let Some(user) = inner
            .users
            .iter_mut()
            .find(|u| in_scope(scope, u.tenant_id) && u.id == id && u.deleted_at.is_none())
        else {
            return Ok(false);
        };
        user.deleted_at = Some(at);
        user.updated_at = at;
        Ok(true)
    }

    async fn hard_delete(&self, scope: &TenantScope, id: Uuid) -> RepoResult<u64> {
        let mut inner = self.inner.write();
        let before = inner.users.len();
        inner
            .users
            .retain(|u| !(in_scope(scope, u.tenant_id) && u.id == id));
        Ok((before - inner.users.len()) as u64)
    }
}

#[async_trait]
impl ConsentRepository for MemoryStore {
    async fn insert(&self, scope: &TenantScope, consent: Consent) -> RepoResult<()> {
        scope.assert_owns(&consent)?;
        self.inner.write().consents.push(consent);
        Ok(())
    }

    async fn latest(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        purpose: &str,
    ) -> RepoResult<Option<Consent>> {
        let inner = self.inner.read();
        let found = inner
            .consents
            .iter()
            .rev()
            .find(|c| {
                in_scope(scope, c.tenant_id)
                    && c.user_id == user_id
                    && c.purpose == purpose
                    && c.deleted_at.is_none()
            })
            .cloned();
        match found {
            None => Ok(None),
            Some(consent) => {
                scope.assert_owns(&consent)?;
                Ok(Some(consent))
            }
        }
    }

    async fn latest_per_purpose(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
    ) -> RepoResult<Vec<Consent>> {
        let inner = self.inner.read();
        let mut latest: BTreeMap<String, Consent> = BTreeMap::new();
        for consent in inner.consents.iter().filter(|c| {
            in_scope(scope, c.tenant_id) && c.user_id == user_id && c.deleted_at.is_none()
        }) {
            scope.assert_owns(consent)?;
            latest.insert(consent.purpose.clone(), consent.clone());
        }
        Ok(latest.into_values().collect())
    }

    async fn revoke_latest(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        purpose: &str,
        at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut inner = self.inner.write();
        let Some(consent) = inner.consents.iter_mut().rev().find(|c| {
            in_scope(scope, c.tenant_id)
                && c.user_id == user_id
                && c.purpose == purpose
                && c.deleted_at.is_none()
        }) else {
            return Ok(false);
        };
        if !consent.granted {
            return Ok(false);
        }
        consent.granted = false;
        consent.revoked_at = Some(at);
        Ok(true)
    }

    async fn soft_delete_by_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let mut inner = self.inner.write();
        let mut touched = 0;
        for consent in inner.consents.iter_mut().filter(|c| {
            in_scope(scope, c.tenant_id) && c.user_id == user_id && c.deleted_at.is_none()
        }) {
            consent.deleted_at = Some(at);
            touched += 1;
        }
        Ok(touched)
    }

    async fn hard_delete_by_user(&self, scope: &TenantScope, user_id: Uuid) -> RepoResult<u64> {
        let mut inner = self.inner.write();
        let before = inner.consents.len();
        inner
            .consents
            .retain(|c| !(in_scope(scope, c.tenant_id) && c.user_id == user_id));
        Ok((before - inner.consents.len()) as u64)
    }
}

#[async_trait]
impl RequestsRepository for MemoryStore {
    async fn insert(&self, scope: &TenantScope, request: DataSubjectRequest) -> RepoResult<()> {
        scope.assert_owns(&request)?;
        self.inner.write().requests.push(request);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<DataSubjectRequest>> {
        Ok(self
            .inner
            .read()
            .requests
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn find_pending_deletion(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
    ) -> RepoResult<Option<DataSubjectRequest>> {
        let inner = self.inner.read();
        let found = inner
            .requests
            .iter()
            .find(|r| {
                in_scope(scope, r.tenant_id)
                    && r.user_id == user_id
                    && r.kind == RequestKind::Deletion
                    && r.status == RequestStatus::Pending
            })
            .cloned();
        match found {
            None => Ok(None),
            Some(request) => {
                scope.assert_owns(&request)?;
                Ok(Some(request))
            }
        }
    }

    async fn list_by_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
    ) -> RepoResult<Vec<DataSubjectRequest>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        for request in inner
            .requests
            .iter()
            .filter(|r| in_scope(scope, r.tenant_id) && r.user_id == user_id)
        {
            scope.assert_owns(request)?;
            out.push(request.clone());
        }
        Ok(out)
    }

    async fn mark_completed(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<bool> {
        let mut inner = self.inner.write();
        let Some(request) = inner
            .requests
            .iter_mut()
            .find(|r| r.id == id && r.status == RequestStatus::Pending)
        else {
            return Ok(false);
        };
        request.status = RequestStatus::Completed;
        request.completed_at = Some(at);
        Ok(true)
    }

    async fn list_due_deletions(
        &self,
        scope: &TenantScope,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<DataSubjectRequest>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        for request in inner.requests.iter().filter(|r| {
            in_scope(scope, r.tenant_id)
                && r.kind == RequestKind::Deletion
                && r.status == RequestStatus::Pending
                && r.scheduled_purge_at.is_some_and(|due| due <= now)
        }) {
            scope.assert_owns(request)?;
            out.push(request.clone());
        }
        Ok(out)
    }
}

#[async_trait]
impl BundlesRepository for MemoryStore {
    async fn insert(&self, scope: &TenantScope, bundle: StoredBundle) -> RepoResult<()> {
        scope.assert_owns(&bundle)?;
        self.inner.write().bundles.push(bundle);
        Ok(())
    }

    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> RepoResult<Option<StoredBundle>> {
        let inner = self.inner.read();
        let found = inner
            .bundles
            .iter()
            .find(|b| in_scope(scope, b.tenant_id) && b.id == id)
            .cloned();
        match found {
            None => Ok(None),
            Some(bundle) => {
                scope.assert_owns(&bundle)?;
                Ok(Some(bundle))
            }
        }
    }

    async fn list_by_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
    ) -> RepoResult<Vec<StoredBundle>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        for bundle in inner
            .bundles
            .iter()
            .filter(|b| in_scope(scope, b.tenant_id) && b.user_id == user_id)
        {
            scope.assert_owns(bundle)?;
            out.push(bundle.clone());
        }
        Ok(out)
    }

    async fn list_expired(
        &self,
        scope: &TenantScope,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<StoredBundle>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        for bundle in inner
            .bundles
            .iter()
            .filter(|b| in_scope(scope, b.tenant_id) && b.expires_at <= now)
        {
            scope.assert_owns(bundle)?;
            out.push(bundle.clone());
        }
        Ok(out)
    }

    async fn delete(&self, scope: &TenantScope, id: Uuid) -> RepoResult<bool> {
        let mut inner = self.inner.write();
        let before = inner.bundles.len();
        inner
            .bundles
            .retain(|b| !(in_scope(scope, b.tenant_id) && b.id == id));
        Ok(inner.bundles.len() < before)
    }
}

#[async_trait]
impl SuspensionsRepository for MemoryStore {
    async fn insert(&self, scope: &TenantScope, suspension: Suspension) -> RepoResult<()> {
        scope.assert_owns(&suspension)?;
        self.inner.write().suspensions.push(suspension);
        Ok(())
    }

    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> RepoResult<Option<Suspension>> {
        let inner = self.inner.read();
        let found = inner
            .suspensions
            .iter()
            .find(|s| in_scope(scope, s.tenant_id) && s.id == id)
            .cloned();
        match found {
            None => Ok(None),
            Some(suspension) => {
                scope.assert_owns(&suspension)?;
                Ok(Some(suspension))
            }
        }
    }

    async fn find_active_for_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
    ) -> RepoResult<Option<Suspension>> {
        let inner = self.inner.read();
        let found = inner
            .suspensions
            .iter()
            .find(|s| {
                in_scope(scope, s.tenant_id)
                    && s.user_id == user_id
                    && s.status == SuspensionStatus::Active
            })
            .cloned();
        match found {
            None => Ok(None),
            Some(suspension) => {
                scope.assert_owns(&suspension)?;
                Ok(Some(suspension))
            }
        }
    }

    async fn find_by_tenant(&self, scope: &TenantScope) -> RepoResult<Vec<Suspension>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        for suspension in inner
            .suspensions
            .iter()
            .filter(|s| in_scope(scope, s.tenant_id))
        {
            scope.assert_owns(suspension)?;
            out.push(suspension.clone());
        }
        Ok(out)
    }

    async fn find_active(&self, scope: &TenantScope) -> RepoResult<Vec<Suspension>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        for suspension in inner
            .suspensions
            .iter()
            .filter(|s| in_scope(scope, s.tenant_id) && s.status == SuspensionStatus::Active)
        {
            scope.assert_owns(suspension)?;
            out.push(suspension.clone());
        }
        Ok(out)
    }

    async fn update(&self, scope: &TenantScope, suspension: Suspension) -> RepoResult<()> {
        scope.assert_owns(&suspension)?;
        let mut inner = self.inner.write();
        if let Some(slot) = inner
            .suspensions
            .iter_mut()
            .find(|s| in_scope(scope, s.tenant_id) && s.id == suspension.id)
        {
            *slot = suspension;
        }
        Ok(())
    }
}

#[async_trait]
impl OppositionsRepository for MemoryStore {
    async fn insert(&self, scope: &TenantScope, opposition: Opposition) -> RepoResult<()> {
        scope.assert_owns(&opposition)?;
        self.inner.write().oppositions.push(opposition);
        Ok(())
    }

    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> RepoResult<Option<Opposition>> {
        let inner = self.inner.read();
        let found = inner
            .oppositions
            .iter()
            .find(|o| in_scope(scope, o.tenant_id) && o.id == id)
            .cloned();
        match found {
            None => Ok(None),
            Some(opposition) => {
                scope.assert_owns(&opposition)?;
                Ok(Some(opposition))
            }
        }
    }

    async fn find_by_tenant(&self, scope: &TenantScope) -> RepoResult<Vec<Opposition>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        for opposition in inner
            .oppositions
            .iter()
            .filter(|o| in_scope(scope, o.tenant_id))
        {
            scope.assert_owns(opposition)?;
            out.push(opposition.clone());
        }
        Ok(out)
    }

    async fn find_pending(&self, scope: &TenantScope) -> RepoResult<Vec<Opposition>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        for opposition in inner
            .oppositions
            .iter()
            .filter(|o| in_scope(scope, o.tenant_id) && o.status == OppositionStatus::Pending)
        {
            scope.assert_owns(opposition)?;
            out.push(opposition.clone());
        }
        Ok(out)
    }

    async fn update(&self, scope: &TenantScope, opposition: Opposition) -> RepoResult<()> {
        scope.assert_owns(&opposition)?;
        let mut inner = self.inner.write();
        if let Some(slot) = inner
            .oppositions
            .iter_mut()
            .find(|o| in_scope(scope, o.tenant_id) && o.id == opposition.id)
        {
            *slot = opposition;
        }
        Ok(())
    }
}

#[async_trait]
impl DisputesRepository for MemoryStore {
    async fn insert(&self, scope: &TenantScope, dispute: Dispute) -> RepoResult<()> {
        scope.assert_owns(&dispute)?;
        self.inner.write().disputes.push(dispute);
        Ok(())
    }

    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> RepoResult<Option<Dispute>> {
        let inner = self.inner.read();
        let found = inner
            .disputes
            .iter()
            .find(|d| in_scope(scope, d.tenant_id) && d.id == id)
            .cloned();
        match found {
            None => Ok(None),
            Some(dispute) => {
                scope.assert_owns(&dispute)?;
                Ok(Some(dispute))
            }
        }
    }

    async fn find_by_tenant(&self, scope: &TenantScope) -> RepoResult<Vec<Dispute>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        for dispute in inner.disputes.iter().filter(|d| in_scope(scope, d.tenant_id)) {
            scope.assert_owns(dispute)?;
            out.push(dispute.clone());
        }
        Ok(out)
    }

    async fn find_pending(&self, scope: &TenantScope) -> RepoResult<Vec<Dispute>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        for dispute in inner.disputes.iter().filter(|d| {
            in_scope(scope, d.tenant_id) && d.status == crate::contract::model::DisputeStatus::Pending
        }) {
            scope.assert_owns(dispute)?;
            out.push(dispute.clone());
        }
        Ok(out)
    }

    async fn find_exceeding_sla(
        &self,
        scope: &TenantScope,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<Dispute>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        for dispute in inner.disputes.iter().filter(|d| {
            in_scope(scope, d.tenant_id) && d.status.is_open() && d.sla_deadline < now
        }) {
            scope.assert_owns(dispute)?;
            out.push(dispute.clone());
        }
        Ok(out)
    }

    async fn update(&self, scope: &TenantScope, dispute: Dispute) -> RepoResult<()> {
        scope.assert_owns(&dispute)?;
        let mut inner = self.inner.write();
        if let Some(slot) = inner
            .disputes
            .iter_mut()
            .find(|d| in_scope(scope, d.tenant_id) && d.id == dispute.id)
        {
            *slot = dispute;
        }
        Ok(())
    }
}

#[async_trait]
impl UsageRepository for MemoryStore {
    async fn insert(&self, scope: &TenantScope, record: UsageRecord) -> RepoResult<()> {
        scope.assert_owns(&record)?;
        self.inner.write().usage.push(record);
        Ok(())
    }

    async fn list_by_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
    ) -> RepoResult<Vec<UsageRecord>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        for record in inner.usage.iter().filter(|r| {
            in_scope(scope, r.tenant_id) && r.user_id == user_id && r.deleted_at.is_none()
        }) {
            scope.assert_owns(record)?;
            out.push(record.clone());
        }
        Ok(out)
    }

    async fn soft_delete_by_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let mut inner = self.inner.write();
        let mut touched = 0;
        for record in inner.usage.iter_mut().filter(|r| {
            in_scope(scope, r.tenant_id) && r.user_id == user_id && r.deleted_at.is_none()
        }) {
            record.deleted_at = Some(at);
            touched += 1;
        }
        Ok(touched)
    }

    async fn hard_delete_by_user(&self, scope: &TenantScope, user_id: Uuid) -> RepoResult<u64> {
        let mut inner = self.inner.write();
        let before = inner.usage.len();
        inner
            .usage
            .retain(|r| !(in_scope(scope, r.tenant_id) && r.user_id == user_id));
        Ok((before - inner.usage.len()) as u64)
    }

    async fn count_older_than(
        &self,
        scope: &TenantScope,
        cutoff: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let inner = self.inner.read();
        Ok(inner
            .usage
            .iter()
            .filter(|r| in_scope(scope, r.tenant_id) && r.created_at < cutoff)
            .count() as u64)
    }

    async fn delete_older_than(
        &self,
        scope: &TenantScope,
        cutoff: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let mut inner = self.inner.write();
        let before = inner.usage.len();
        inner
            .usage
            .retain(|r| !(in_scope(scope, r.tenant_id) && r.created_at < cutoff));
        Ok((before - inner.usage.len()) as u64)
    }
}
