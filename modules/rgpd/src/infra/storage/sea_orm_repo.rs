//! SeaORM-backed implementation of every repository port.
//!
//! The store is generic over `C: ConnectionTrait`, so it can be constructed
//! with a `DatabaseConnection` or a transactional connection. Every scoped
//! query filters by the scope's tenant id, and fetched rows are re-checked
//! with `assert_owns` for defense in depth.

use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tenant_scope::TenantScope;
use uuid::Uuid;

use crate::contract::model::{
    Consent, DataSubjectRequest, Dispute, DisputeStatus, Opposition, OppositionStatus,
    RequestKind, RequestStatus, Suspension, SuspensionStatus, UsageRecord, User,
};
use crate::domain::repo::{
    BundlesRepository, ConsentRepository, DisputesRepository, OppositionsRepository, RepoError,
    RepoResult, RequestsRepository, StoredBundle, SuspensionsRepository, UsageRepository,
    UsersRepository,
};

use super::entities::{
    consents, disputes, export_bundles, oppositions, requests, suspensions, usage_records, users,
};
use super::mapper;

pub struct SeaOrmStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<C> UsersRepository for SeaOrmStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn insert(&self, scope: &TenantScope, user: User) -> RepoResult<()> {
        scope.assert_owns(&user)?;
        let m = users::ActiveModel {
            id: Set(user.id),
            tenant_id: Set(user.tenant_id),
            email_fingerprint: Set(user.email_fingerprint),
            display_name: Set(user.display_name),
            data_suspended: Set(user.data_suspended),
            suspended_reason: Set(user.suspended_reason),
            suspended_at: Set(user.suspended_at),
            deleted_at: Set(user.deleted_at),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        };
        let _ = m.insert(&self.conn).await.context("insert user failed")?;
        Ok(())
    }

    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> RepoResult<Option<User>> {
        let found = users::Entity::find()
            .filter(users::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(users::Column::Id.eq(id))
            .filter(users::Column::DeletedAt.is_null())
            .one(&self.conn)
            .await
            .context("find user by id failed")?;
        match found {
            None => Ok(None),
            Some(m) => {
                let user = User::from(m);
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
        let found = users::Entity::find()
            .filter(users::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(users::Column::EmailFingerprint.eq(fingerprint))
            .filter(users::Column::DeletedAt.is_null())
            .one(&self.conn)
            .await
            .context("find user by fingerprint failed")?;
        match found {
            None => Ok(None),
            Some(m) => {
                let user = User::from(m);
                scope.assert_owns(&user)?;
                Ok(Some(user))
            }
        }
    }

    async fn list_by_tenant(&self, scope: &TenantScope) -> RepoResult<Vec<User>> {
        let rows = users::Entity::find()
            .filter(users::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(users::Column::DeletedAt.is_null())
            .order_by_asc(users::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list users failed")?;
        let mut out = Vec::with_capacity(rows.len());
        for m in rows {
            let user = User::from(m);
            scope.assert_owns(&user)?;
            out.push(user);
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
        let Some(current) = UsersRepository::find_by_id(self, scope, id).await? else {
            return Ok(false);
        };
        let m = users::ActiveModel {
            id: Set(current.id),
            data_suspended: Set(suspended),
            suspended_reason: Set(reason),
            suspended_at: Set(suspended.then_some(at)),
            updated_at: Set(at),
            ..Default::default()
        };
        let _ = m
            .update(&self.conn)
            .await
            .context("set suspension flag failed")?;
        Ok(true)
    }

    async fn soft_delete(
        &self,
        scope: &TenantScope,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let res = users::Entity::update_many()
            .col_expr(users::Column::DeletedAt, Expr::value(at))
            .col_expr(users::Column::UpdatedAt, Expr::value(at))
            .filter(users::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(users::Column::Id.eq(id))
            .filter(users::Column::DeletedAt.is_null())
            .exec(&self.conn)
            .await
            .context("soft-delete user failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn hard_delete(&self, scope: &TenantScope, id: Uuid) -> RepoResult<u64> {
        let res = users::Entity::delete_many()
            .filter(users::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(users::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("hard-delete user failed")?;
        Ok(res.rows_affected)
    }
}

#[async_trait]
impl<C> ConsentRepository for SeaOrmStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn insert(&self, scope: &TenantScope, consent: Consent) -> RepoResult<()> {
        scope.assert_owns(&consent)?;
        let m = consents::ActiveModel {
            id: Set(consent.id),
            tenant_id: Set(consent.tenant_id),
            user_id: Set(consent.user_id),
            purpose: Set(consent.purpose),
            granted: Set(consent.granted),
            granted_at: Set(consent.granted_at),
            revoked_at: Set(consent.revoked_at),
            deleted_at: Set(consent.deleted_at),
            ..Default::default()
        };
        let _ = m.insert(&self.conn).await.context("insert consent failed")?;
        Ok(())
    }

    async fn latest(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        purpose: &str,
    ) -> RepoResult<Option<Consent>> {
        let found = consents::Entity::find()
            .filter(consents::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(consents::Column::UserId.eq(user_id))
            .filter(consents::Column::Purpose.eq(purpose))
            .filter(consents::Column::DeletedAt.is_null())
            .order_by_desc(consents::Column::Seq)
            .one(&self.conn)
            .await
            .context("latest consent failed")?;
        match found {
            None => Ok(None),
            Some(m) => {
                let consent = Consent::from(m);
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
        let rows = consents::Entity::find()
            .filter(consents::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(consents::Column::UserId.eq(user_id))
            .filter(consents::Column::DeletedAt.is_null())
            .order_by_asc(consents::Column::Seq)
            .all(&self.conn)
            .await
            .context("list consents failed")?;

        // Last row per purpose wins; rows arrive in insertion order.
        let mut latest: BTreeMap<String, Consent> = BTreeMap::new();
        for m in rows {
            let consent = Consent::from(m);
            scope.assert_owns(&consent)?;
            latest.insert(consent.purpose.clone(), consent);
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
        let Some(current) = self.latest(scope, user_id, purpose).await? else {
            return Ok(false);
        };
        if !current.granted {
            return Ok(false);
        }

        // Flip only when the row is still the latest granted one; a
        // concurrent revoke loses here and reports no change.
        let res = consents::Entity::update_many()
            .col_expr(consents::Column::Granted, Expr::value(false))
            .col_expr(consents::Column::RevokedAt, Expr::value(at))
            .filter(consents::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(consents::Column::Id.eq(current.id))
            .filter(consents::Column::Granted.eq(true))
            .exec(&self.conn)
            .await
            .context("revoke consent failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn soft_delete_by_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let res = consents::Entity::update_many()
            .col_expr(consents::Column::DeletedAt, Expr::value(at))
            .filter(consents::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(consents::Column::UserId.eq(user_id))
            .filter(consents::Column::DeletedAt.is_null())
            .exec(&self.conn)
            .await
            .context("soft-delete consents failed")?;
        Ok(res.rows_affected)
    }

    async fn hard_delete_by_user(&self, scope: &TenantScope, user_id: Uuid) -> RepoResult<u64> {
        let res = consents::Entity::delete_many()
            .filter(consents::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(consents::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("hard-delete consents failed")?;
        Ok(res.rows_affected)
    }
}

#[async_trait]
impl<C> RequestsRepository for SeaOrmStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn insert(&self, scope: &TenantScope, request: DataSubjectRequest) -> RepoResult<()> {
        scope.assert_owns(&request)?;
        let m = requests::ActiveModel {
            id: Set(request.id),
            tenant_id: Set(request.tenant_id),
            user_id: Set(request.user_id),
            kind: Set(request.kind.as_str().to_owned()),
            status: Set(request.status.as_str().to_owned()),
            created_at: Set(request.created_at),
            scheduled_purge_at: Set(request.scheduled_purge_at),
            completed_at: Set(request.completed_at),
        };
        let _ = m.insert(&self.conn).await.context("insert request failed")?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<DataSubjectRequest>> {
        let found = requests::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find request failed")?;
        found
            .map(mapper::request_from_model)
            .transpose()
            .map_err(RepoError::Other)
    }

    async fn find_pending_deletion(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
    ) -> RepoResult<Option<DataSubjectRequest>> {
        let found = requests::Entity::find()
            .filter(requests::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(requests::Column::UserId.eq(user_id))
            .filter(requests::Column::Kind.eq(RequestKind::Deletion.as_str()))
            .filter(requests::Column::Status.eq(RequestStatus::Pending.as_str()))
            .one(&self.conn)
            .await
            .context("find pending deletion failed")?;
        match found {
            None => Ok(None),
            Some(m) => {
                let request = mapper::request_from_model(m)?;
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
        let rows = requests::Entity::find()
            .filter(requests::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(requests::Column::UserId.eq(user_id))
            .order_by_asc(requests::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list requests failed")?;
        let mut out = Vec::with_capacity(rows.len());
        for m in rows {
            let request = mapper::request_from_model(m)?;
            scope.assert_owns(&request)?;
            out.push(request);
        }
        Ok(out)
    }

    async fn mark_completed(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<bool> {
        let res = requests::Entity::update_many()
            .col_expr(
                requests::Column::Status,
                Expr::value(RequestStatus::Completed.as_str()),
            )
            .col_expr(requests::Column::CompletedAt, Expr::value(at))
            .filter(requests::Column::Id.eq(id))
            .filter(requests::Column::Status.eq(RequestStatus::Pending.as_str()))
            .exec(&self.conn)
            .await
            .context("mark request completed failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn list_due_deletions(
        &self,
        scope: &TenantScope,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<DataSubjectRequest>> {
        let rows = requests::Entity::find()
            .filter(requests::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(requests::Column::Kind.eq(RequestKind::Deletion.as_str()))
            .filter(requests::Column::Status.eq(RequestStatus::Pending.as_str()))
            .filter(requests::Column::ScheduledPurgeAt.lte(now))
            .order_by_asc(requests::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list due deletions failed")?;
        let mut out = Vec::with_capacity(rows.len());
        for m in rows {
            let request = mapper::request_from_model(m)?;
            scope.assert_owns(&request)?;
            out.push(request);
        }
        Ok(out)
    }
}

#[async_trait]
impl<C> BundlesRepository for SeaOrmStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn insert(&self, scope: &TenantScope, bundle: StoredBundle) -> RepoResult<()> {
        scope.assert_owns(&bundle)?;
        let m = export_bundles::ActiveModel {
            id: Set(bundle.id),
            tenant_id: Set(bundle.tenant_id),
            user_id: Set(bundle.user_id),
            created_at: Set(bundle.created_at),
            expires_at: Set(bundle.expires_at),
            key_hex: Set(bundle.key_hex),
        };
        let _ = m.insert(&self.conn).await.context("insert bundle failed")?;
        Ok(())
    }

    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> RepoResult<Option<StoredBundle>> {
        let found = export_bundles::Entity::find()
            .filter(export_bundles::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(export_bundles::Column::Id.eq(id))
            .one(&self.conn)
            .await
            .context("find bundle failed")?;
        match found {
            None => Ok(None),
            Some(m) => {
                let bundle = StoredBundle::from(m);
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
        let rows = export_bundles::Entity::find()
            .filter(export_bundles::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(export_bundles::Column::UserId.eq(user_id))
            .all(&self.conn)
            .await
            .context("list bundles failed")?;
        let mut out = Vec::with_capacity(rows.len());
        for m in rows {
            let bundle = StoredBundle::from(m);
            scope.assert_owns(&bundle)?;
            out.push(bundle);
        }
        Ok(out)
    }

    async fn list_expired(
        &self,
        scope: &TenantScope,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<StoredBundle>> {
        let rows = export_bundles::Entity::find()
            .filter(export_bundles::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(export_bundles::Column::ExpiresAt.lte(now))
            .all(&self.conn)
            .await
            .context("list expired bundles failed")?;
        let mut out = Vec::with_capacity(rows.len());
        for m in rows {
            let bundle = StoredBundle::from(m);
            scope.assert_owns(&bundle)?;
            out.push(bundle);
        }
        Ok(out)
    }

    async fn delete(&self, scope: &TenantScope, id: Uuid) -> RepoResult<bool> {
        let res = export_bundles::Entity::delete_many()
            .filter(export_bundles::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(export_bundles::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("delete bundle failed")?;
        Ok(res.rows_affected > 0)
    }
}

#[async_trait]
impl<C> SuspensionsRepository for SeaOrmStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn insert(&self, scope: &TenantScope, suspension: Suspension) -> RepoResult<()> {
        scope.assert_owns(&suspension)?;
        let m = suspensions::ActiveModel {
            id: Set(suspension.id),
            tenant_id: Set(suspension.tenant_id),
            user_id: Set(suspension.user_id),
            status: Set(suspension.status.as_str().to_owned()),
            reason: Set(suspension.reason),
            created_at: Set(suspension.created_at),
            lifted_at: Set(suspension.lifted_at),
            lifted_by: Set(suspension.lifted_by),
        };
        let _ = m
            .insert(&self.conn)
            .await
            .context("insert suspension failed")?;
        Ok(())
    }

    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> RepoResult<Option<Suspension>> {
        let found = suspensions::Entity::find()
            .filter(suspensions::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(suspensions::Column::Id.eq(id))
            .one(&self.conn)
            .await
            .context("find suspension failed")?;
        match found {
            None => Ok(None),
            Some(m) => {
                let suspension = mapper::suspension_from_model(m)?;
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
        let found = suspensions::Entity::find()
            .filter(suspensions::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(suspensions::Column::UserId.eq(user_id))
            .filter(suspensions::Column::Status.eq(SuspensionStatus::Active.as_str()))
            .one(&self.conn)
            .await
            .context("find active suspension failed")?;
        found
            .map(|m| {
                let suspension = mapper::suspension_from_model(m)?;
                scope.assert_owns(&suspension)?;
                Ok(suspension)
            })
            .transpose()
    }

    async fn find_by_tenant(&self, scope: &TenantScope) -> RepoResult<Vec<Suspension>> {
        let rows = suspensions::Entity::find()
            .filter(suspensions::Column::TenantId.eq(scope.tenant_uuid()))
            .order_by_asc(suspensions::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list suspensions failed")?;
        rows.into_iter()
            .map(|m| {
                let suspension = mapper::suspension_from_model(m)?;
                scope.assert_owns(&suspension)?;
                Ok(suspension)
            })
            .collect()
    }

    async fn find_active(&self, scope: &TenantScope) -> RepoResult<Vec<Suspension>> {
        let rows = suspensions::Entity::find()
            .filter(suspensions::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(suspensions::Column::Status.eq(SuspensionStatus::Active.as_str()))
            .order_by_asc(suspensions::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list active suspensions failed")?;
        rows.into_iter()
            .map(|m| {
                let suspension = mapper::suspension_from_model(m)?;
                scope.assert_owns(&suspension)?;
                Ok(suspension)
            })
            .collect()
    }

    async fn update(&self, scope: &TenantScope, suspension: Suspension) -> RepoResult<()> {
        scope.assert_owns(&suspension)?;
        let m = suspensions::ActiveModel {
            id: Set(suspension.id),
            status: Set(suspension.status.as_str().to_owned()),
            lifted_at: Set(suspension.lifted_at),
            lifted_by: Set(suspension.lifted_by),
            ..Default::default()
        };
        let _ = m
            .update(&self.conn)
            .await
            .context("update suspension failed")?;
        Ok(())
    }
}

#[async_trait]
impl<C> OppositionsRepository for SeaOrmStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn insert(&self, scope: &TenantScope, opposition: Opposition) -> RepoResult<()> {
        scope.assert_owns(&opposition)?;
        let m = oppositions::ActiveModel {
            id: Set(opposition.id),
            tenant_id: Set(opposition.tenant_id),
            user_id: Set(opposition.user_id),
            status: Set(opposition.status.as_str().to_owned()),
            reason: Set(opposition.reason),
            admin_response: Set(opposition.admin_response),
            created_at: Set(opposition.created_at),
            reviewed_by: Set(opposition.reviewed_by),
            reviewed_at: Set(opposition.reviewed_at),
        };
        let _ = m
            .insert(&self.conn)
            .await
            .context("insert opposition failed")?;
        Ok(())
    }

    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> RepoResult<Option<Opposition>> {
        let found = oppositions::Entity::find()
            .filter(oppositions::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(oppositions::Column::Id.eq(id))
            .one(&self.conn)
            .await
            .context("find opposition failed")?;
        found
            .map(|m| {
                let opposition = mapper::opposition_from_model(m)?;
                scope.assert_owns(&opposition)?;
                Ok(opposition)
            })
            .transpose()
    }

    async fn find_by_tenant(&self, scope: &TenantScope) -> RepoResult<Vec<Opposition>> {
        let rows = oppositions::Entity::find()
            .filter(oppositions::Column::TenantId.eq(scope.tenant_uuid()))
            .order_by_asc(oppositions::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list oppositions failed")?;
        rows.into_iter()
            .map(|m| {
                let opposition = mapper::opposition_from_model(m)?;
                scope.assert_owns(&opposition)?;
                Ok(opposition)
            })
            .collect()
    }

    async fn find_pending(&self, scope: &TenantScope) -> RepoResult<Vec<Opposition>> {
        let rows = oppositions::Entity::find()
            .filter(oppositions::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(oppositions::Column::Status.eq(OppositionStatus::Pending.as_str()))
            .order_by_asc(oppositions::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list pending oppositions failed")?;
        rows.into_iter()
            .map(|m| {
                let opposition = mapper::opposition_from_model(m)?;
                scope.assert_owns(&opposition)?;
                Ok(opposition)
            })
            .collect()
    }

    async fn update(&self, scope: &TenantScope, opposition: Opposition) -> RepoResult<()> {
        scope.assert_owns(&opposition)?;
        let m = oppositions::ActiveModel {
            id: Set(opposition.id),
            status: Set(opposition.status.as_str().to_owned()),
            admin_response: Set(opposition.admin_response),
            reviewed_by: Set(opposition.reviewed_by),
            reviewed_at: Set(opposition.reviewed_at),
            ..Default::default()
        };
        let _ = m
            .update(&self.conn)
            .await
            .context("update opposition failed")?;
        Ok(())
    }
}

#[async_trait]
impl<C> DisputesRepository for SeaOrmStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn insert(&self, scope: &TenantScope, dispute: Dispute) -> RepoResult<()> {
        scope.assert_owns(&dispute)?;
        let m = disputes::ActiveModel {
            id: Set(dispute.id),
            tenant_id: Set(dispute.tenant_id),
            user_id: Set(dispute.user_id),
            decision_ref: Set(dispute.decision_ref),
            reason: Set(dispute.reason),
            status: Set(dispute.status.as_str().to_owned()),
            admin_response: Set(dispute.admin_response),
            created_at: Set(dispute.created_at),
            sla_deadline: Set(dispute.sla_deadline),
            reviewed_by: Set(dispute.reviewed_by),
            reviewed_at: Set(dispute.reviewed_at),
            resolved_at: Set(dispute.resolved_at),
        };
        let _ = m.insert(&self.conn).await.context("insert dispute failed")?;
        Ok(())
    }

    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> RepoResult<Option<Dispute>> {
        let found = disputes::Entity::find()
            .filter(disputes::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(disputes::Column::Id.eq(id))
            .one(&self.conn)
            .await
            .context("find dispute failed")?;
        found
            .map(|m| {
                let dispute = mapper::dispute_from_model(m)?;
                scope.assert_owns(&dispute)?;
                Ok(dispute)
            })
            .transpose()
    }

    async fn find_by_tenant(&self, scope: &TenantScope) -> RepoResult<Vec<Dispute>> {
        let rows = disputes::Entity::find()
            .filter(disputes::Column::TenantId.eq(scope.tenant_uuid()))
            .order_by_asc(disputes::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list disputes failed")?;
        rows.into_iter()
            .map(|m| {
                let dispute = mapper::dispute_from_model(m)?;
                scope.assert_owns(&dispute)?;
                Ok(dispute)
            })
            .collect()
    }

    async fn find_pending(&self, scope: &TenantScope) -> RepoResult<Vec<Dispute>> {
        let rows = disputes::Entity::find()
            .filter(disputes::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(disputes::Column::Status.eq(DisputeStatus::Pending.as_str()))
            .order_by_asc(disputes::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list pending disputes failed")?;
        rows.into_iter()
            .map(|m| {
                let dispute = mapper::dispute_from_model(m)?;
                scope.assert_owns(&dispute)?;
                Ok(dispute)
            })
            .collect()
    }

    async fn find_exceeding_sla(
        &self,
        scope: &TenantScope,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<Dispute>> {
        let rows = disputes::Entity::find()
            .filter(disputes::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(
                disputes::Column::Status.is_in([
                    DisputeStatus::Pending.as_str(),
                    DisputeStatus::UnderReview.as_str(),
                ]),
            )
            .filter(disputes::Column::SlaDeadline.lt(now))
            .order_by_asc(disputes::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list overdue disputes failed")?;
        rows.into_iter()
            .map(|m| {
                let dispute = mapper::dispute_from_model(m)?;
                scope.assert_owns(&dispute)?;
                Ok(dispute)
            })
            .collect()
    }

    async fn update(&self, scope: &TenantScope, dispute: Dispute) -> RepoResult<()> {
        scope.assert_owns(&dispute)?;
        let m = disputes::ActiveModel {
            id: Set(dispute.id),
            status: Set(dispute.status.as_str().to_owned()),
            admin_response: Set(dispute.admin_response),
            reviewed_by: Set(dispute.reviewed_by),
            reviewed_at: Set(dispute.reviewed_at),
            resolved_at: Set(dispute.resolved_at),
            ..Default::default()
        };
        let _ = m.update(&self.conn).await.context("update dispute failed")?;
        Ok(())
    }
}

#[async_trait]
impl<C> UsageRepository for SeaOrmStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn insert(&self, scope: &TenantScope, record: UsageRecord) -> RepoResult<()> {
        scope.assert_owns(&record)?;
        let m = usage_records::ActiveModel {
            id: Set(record.id),
            tenant_id: Set(record.tenant_id),
            user_id: Set(record.user_id),
            kind: Set(record.kind),
            created_at: Set(record.created_at),
            deleted_at: Set(record.deleted_at),
        };
        let _ = m
            .insert(&self.conn)
            .await
            .context("insert usage record failed")?;
        Ok(())
    }

    async fn list_by_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
    ) -> RepoResult<Vec<UsageRecord>> {
        let rows = usage_records::Entity::find()
            .filter(usage_records::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(usage_records::Column::UserId.eq(user_id))
            .filter(usage_records::Column::DeletedAt.is_null())
            .order_by_asc(usage_records::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list usage records failed")?;
        let mut out = Vec::with_capacity(rows.len());
        for m in rows {
            let record = UsageRecord::from(m);
            scope.assert_owns(&record)?;
            out.push(record);
        }
        Ok(out)
    }

    async fn soft_delete_by_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let res = usage_records::Entity::update_many()
            .col_expr(usage_records::Column::DeletedAt, Expr::value(at))
            .filter(usage_records::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(usage_records::Column::UserId.eq(user_id))
            .filter(usage_records::Column::DeletedAt.is_null())
            .exec(&self.conn)
            .await
            .context("soft-delete usage records failed")?;
        Ok(res.rows_affected)
    }

    async fn hard_delete_by_user(&self, scope: &TenantScope, user_id: Uuid) -> RepoResult<u64> {
        let res = usage_records::Entity::delete_many()
            .filter(usage_records::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(usage_records::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("hard-delete usage records failed")?;
        Ok(res.rows_affected)
    }

    async fn count_older_than(
        &self,
        scope: &TenantScope,
        cutoff: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let count = usage_records::Entity::find()
            .filter(usage_records::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(usage_records::Column::CreatedAt.lt(cutoff))
            .count(&self.conn)
            .await
            .context("count aged usage records failed")?;
        Ok(count)
    }

    async fn delete_older_than(
        &self,
        scope: &TenantScope,
        cutoff: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let res = usage_records::Entity::delete_many()
            .filter(usage_records::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(usage_records::Column::CreatedAt.lt(cutoff))
            .exec(&self.conn)
            .await
            .context("delete aged usage records failed")?;
        Ok(res.rows_affected)
    }
}
