//! SQLite-backed storage round trips. Gated behind the `integration`
//! feature so the default suite stays database-free:
//!
//! ```text
//! cargo test -p rgpd --features integration
//! ```

#![cfg(feature = "integration")]

use chrono::{Duration, TimeZone, Utc};
use sea_orm::{ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter};
use tenant_scope::TenantScope;
use uuid::Uuid;

use rgpd::contract::model::{
    Actor, Consent, DataSubjectRequest, RequestKind, RequestStatus, User,
};
use rgpd::domain::audit::{AuditEvent, AuditMetadata};
use rgpd::domain::ports::AuditSink;
use rgpd::domain::repo::{
    BundlesRepository, ConsentRepository, RequestsRepository, StoredBundle, UsersRepository,
};
use rgpd::infra::audit::SeaOrmAuditSink;
use rgpd::infra::crypto::email_fingerprint;
use rgpd::infra::storage::entities::audit_events;
use rgpd::infra::storage::schema;
use rgpd::infra::storage::sea_orm_repo::SeaOrmStore;

async fn fresh_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect to in-memory sqlite");
    schema::create_all(&db).await.expect("create schema");
    db
}

fn sample_user(tenant_id: Uuid) -> User {
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    User {
        id: Uuid::new_v4(),
        tenant_id,
        email_fingerprint: email_fingerprint("ana@example.test"),
        display_name: "Ana".to_owned(),
        data_suspended: false,
        suspended_reason: None,
        suspended_at: None,
        deleted_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn user_round_trip_and_soft_delete_visibility() {
    let store = SeaOrmStore::new(fresh_db().await);
    let tenant = Uuid::new_v4();
    let scope = TenantScope::new(Some(tenant)).unwrap();
    let user = sample_user(tenant);

    UsersRepository::insert(&store, &scope, user.clone())
        .await
        .unwrap();

    let loaded = UsersRepository::find_by_id(&store, &scope, user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded, user);
    let by_fp = store
        .find_by_email_fingerprint(&scope, &user.email_fingerprint)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_fp.id, user.id);

    // Soft delete hides the row from every scoped read.
    let at = user.created_at + Duration::days(1);
    assert!(store.soft_delete(&scope, user.id, at).await.unwrap());
    assert!(UsersRepository::find_by_id(&store, &scope, user.id)
        .await
        .unwrap()
        .is_none());
    assert!(store.list_by_tenant(&scope).await.unwrap().is_empty());

    // Hard delete still removes the hidden row.
    assert_eq!(store.hard_delete(&scope, user.id).await.unwrap(), 1);
}

#[tokio::test]
async fn other_tenant_reads_nothing() {
    let store = SeaOrmStore::new(fresh_db().await);
    let tenant = Uuid::new_v4();
    let scope = TenantScope::new(Some(tenant)).unwrap();
    let other = TenantScope::new(Some(Uuid::new_v4())).unwrap();
    let user = sample_user(tenant);

    UsersRepository::insert(&store, &scope, user.clone())
        .await
        .unwrap();

    assert!(UsersRepository::find_by_id(&store, &other, user.id)
        .await
        .unwrap()
        .is_none());
    assert!(store.list_by_tenant(&other).await.unwrap().is_empty());
    assert_eq!(store.hard_delete(&other, user.id).await.unwrap(), 0);
}

#[tokio::test]
async fn consent_ledger_is_append_only_with_latest_wins() {
    let store = SeaOrmStore::new(fresh_db().await);
    let tenant = Uuid::new_v4();
    let scope = TenantScope::new(Some(tenant)).unwrap();
    let user_id = Uuid::new_v4();
    let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    let row = |granted: bool| Consent {
        id: Uuid::new_v4(),
        tenant_id: tenant,
        user_id,
        purpose: "analytics".to_owned(),
        granted,
        granted_at: t0,
        revoked_at: None,
        deleted_at: None,
    };

    // Two grants with the same timestamp; insertion order breaks the tie.
    let first = row(true);
    let second = row(true);
    ConsentRepository::insert(&store, &scope, first.clone())
        .await
        .unwrap();
    ConsentRepository::insert(&store, &scope, second.clone())
        .await
        .unwrap();

    let latest = store
        .latest(&scope, user_id, "analytics")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, second.id);

    // Revoke flips only that latest row.
    assert!(store
        .revoke_latest(&scope, user_id, "analytics", t0 + Duration::hours(1))
        .await
        .unwrap());
    let latest = store
        .latest(&scope, user_id, "analytics")
        .await
        .unwrap()
        .unwrap();
    assert!(!latest.granted);
    assert!(latest.revoked_at.is_some());

    // A second revoke finds nothing granted.
    assert!(!store
        .revoke_latest(&scope, user_id, "analytics", t0 + Duration::hours(2))
        .await
        .unwrap());

    let per_purpose = store.latest_per_purpose(&scope, user_id).await.unwrap();
    assert_eq!(per_purpose.len(), 1);
    assert!(!per_purpose[0].granted);
}

#[tokio::test]
async fn request_lifecycle_and_due_listing() {
    let store = SeaOrmStore::new(fresh_db().await);
    let tenant = Uuid::new_v4();
    let scope = TenantScope::new(Some(tenant)).unwrap();
    let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    let request = DataSubjectRequest {
        id: Uuid::new_v4(),
        tenant_id: tenant,
        user_id: Uuid::new_v4(),
        kind: RequestKind::Deletion,
        status: RequestStatus::Pending,
        created_at: t0,
        scheduled_purge_at: Some(t0 + Duration::days(30)),
        completed_at: None,
    };
    RequestsRepository::insert(&store, &scope, request.clone())
        .await
        .unwrap();

    // The unscoped lookup recovers the tenant id for the scheduler.
    let found = RequestsRepository::find_by_id(&store, request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.tenant_id, tenant);

    let history = RequestsRepository::list_by_user(&store, &scope, request.user_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, request.id);

    assert!(store
        .list_due_deletions(&scope, t0 + Duration::days(29))
        .await
        .unwrap()
        .is_empty());
    let due = store
        .list_due_deletions(&scope, t0 + Duration::days(30))
        .await
        .unwrap();
    assert_eq!(due.len(), 1);

    assert!(store
        .mark_completed(request.id, t0 + Duration::days(30))
        .await
        .unwrap());
    // Completing twice reports no change.
    assert!(!store
        .mark_completed(request.id, t0 + Duration::days(31))
        .await
        .unwrap());
    assert!(store
        .list_due_deletions(&scope, t0 + Duration::days(40))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn bundle_rows_round_trip_with_expiry_listing() {
    let store = SeaOrmStore::new(fresh_db().await);
    let tenant = Uuid::new_v4();
    let scope = TenantScope::new(Some(tenant)).unwrap();
    let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    let bundle = StoredBundle {
        id: Uuid::new_v4(),
        tenant_id: tenant,
        user_id: Uuid::new_v4(),
        created_at: t0,
        expires_at: t0 + Duration::days(7),
        key_hex: "00".repeat(32),
    };
    BundlesRepository::insert(&store, &scope, bundle.clone())
        .await
        .unwrap();

    let loaded = BundlesRepository::find_by_id(&store, &scope, bundle.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.key_hex, bundle.key_hex);

    assert!(store
        .list_expired(&scope, t0 + Duration::days(7) - Duration::seconds(1))
        .await
        .unwrap()
        .is_empty());
    // A bundle is sweepable at its exact expiry instant.
    assert_eq!(
        store
            .list_expired(&scope, t0 + Duration::days(7))
            .await
            .unwrap()
            .len(),
        1
    );

    assert!(store.delete(&scope, bundle.id).await.unwrap());
    assert!(!store.delete(&scope, bundle.id).await.unwrap());
}

#[tokio::test]
async fn audit_sink_appends_rows() {
    let db = fresh_db().await;
    let sink = SeaOrmAuditSink::new(db.clone());
    let tenant = Uuid::new_v4();

    let event = AuditEvent {
        id: Uuid::new_v4(),
        event_name: "consent.granted".to_owned(),
        actor_scope: Actor::scheduler().scope,
        actor_id: None,
        tenant_id: Some(tenant),
        target_id: Some(Uuid::new_v4()),
        metadata: AuditMetadata::new().count("consents", 1),
        occurred_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    };
    sink.append(event.clone()).await.unwrap();

    let rows = audit_events::Entity::find()
        .filter(audit_events::Column::TenantId.eq(tenant))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event_name, "consent.granted");
    let metadata: AuditMetadata = serde_json::from_value(rows[0].metadata.clone()).unwrap();
    assert_eq!(metadata, event.metadata);
}
