//! Export bundles: snapshot content, TTL, crypto-shredding.

mod common;

use common::{admin, TestEnv};
use uuid::Uuid;

use rgpd::contract::client::RgpdApi;
use rgpd::contract::error::RgpdError;
use rgpd::contract::model::{Actor, RequestKind, RequestStatus};
use rgpd::domain::ports::BlobStore;
use rgpd::domain::repo::RequestsRepository;

#[tokio::test]
async fn export_snapshot_carries_profile_consents_and_usage() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;
    env.seed_usage(tenant, user.id, "chat_job", common::epoch()).await;
    env.seed_usage(tenant, user.id, "embedding_job", common::epoch()).await;

    env.client
        .grant_consent(Some(tenant), admin(), user.id, "analytics")
        .await
        .unwrap();

    let bundle = env
        .client
        .request_export(Some(tenant), admin(), user.id)
        .await
        .unwrap();
    let snapshot = env
        .client
        .open_export(Some(tenant), bundle.id)
        .await
        .unwrap()
        .expect("bundle should be readable before expiry");

    assert_eq!(snapshot.profile.user_id, user.id);
    assert_eq!(snapshot.profile.display_name, "Ana");
    assert_eq!(snapshot.consents.len(), 1);
    assert_eq!(snapshot.consents[0].purpose, "analytics");
    assert_eq!(snapshot.usage.len(), 2);
}

#[tokio::test]
async fn export_payload_excludes_identifiers_and_secrets() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;

    let bundle = env
        .client
        .request_export(Some(tenant), admin(), user.id)
        .await
        .unwrap();
    let snapshot = env
        .client
        .open_export(Some(tenant), bundle.id)
        .await
        .unwrap()
        .unwrap();

    let serialized = serde_json::to_string(&snapshot).unwrap();
    assert!(!serialized.contains(&user.email_fingerprint));
    assert!(!serialized.contains("email"));
    assert!(!serialized.contains("password"));
    assert!(!serialized.contains("fingerprint"));
}

#[tokio::test]
async fn stored_blob_is_ciphertext() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;

    let bundle = env
        .client
        .request_export(Some(tenant), admin(), user.id)
        .await
        .unwrap();

    let blob = env.blobs.get(bundle.id).await.unwrap().unwrap();
    let raw = String::from_utf8_lossy(&blob);
    assert!(!raw.contains("Ana"));
    assert!(!raw.contains("display_name"));
}

#[tokio::test]
async fn bundle_expires_after_ttl() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;

    let bundle = env
        .client
        .request_export(Some(tenant), admin(), user.id)
        .await
        .unwrap();
    assert_eq!(bundle.expires_at, bundle.created_at + chrono::Duration::days(7));

    // One second before expiry the bundle still opens.
    env.clock
        .set(bundle.expires_at - chrono::Duration::seconds(1));
    assert!(env
        .client
        .open_export(Some(tenant), bundle.id)
        .await
        .unwrap()
        .is_some());

    // At expiry it reads as absent, exactly like an unknown id.
    env.clock.set(bundle.expires_at);
    assert!(env
        .client
        .open_export(Some(tenant), bundle.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn unknown_bundle_reads_as_absent() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    assert!(env
        .client
        .open_export(Some(tenant), Uuid::new_v4())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn another_tenant_cannot_open_the_bundle() {
    let env = TestEnv::new();
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();
    let user = env.seed_user(tenant_a, "Ana").await;

    let bundle = env
        .client
        .request_export(Some(tenant_a), admin(), user.id)
        .await
        .unwrap();

    assert!(env
        .client
        .open_export(Some(tenant_b), bundle.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn purge_shreds_export_bundles() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;

    let bundle = env
        .client
        .request_export(Some(tenant), admin(), user.id)
        .await
        .unwrap();
    assert!(env.blobs.contains(bundle.id));

    let outcome = env
        .client
        .request_deletion(Some(tenant), admin(), user.id)
        .await
        .unwrap();
    env.clock.advance_days(30);
    let purge = env
        .client
        .purge_request(Actor::scheduler(), outcome.request.id)
        .await
        .unwrap();

    assert_eq!(purge.deleted.bundles, 1);
    assert!(!env.blobs.contains(bundle.id));
    assert!(env
        .client
        .open_export(Some(tenant), bundle.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn export_records_a_completed_request_row() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;
    let scope = common::scope_for(tenant);

    env.client
        .request_export(Some(tenant), admin(), user.id)
        .await
        .unwrap();

    let history = RequestsRepository::list_by_user(env.store.as_ref(), &scope, user.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, RequestKind::Export);
    assert_eq!(history[0].status, RequestStatus::Completed);
    assert!(history[0].completed_at.is_some());

    // Only deletion requests go through the purge path.
    let err = env
        .client
        .purge_request(Actor::scheduler(), history[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, RgpdError::Validation { .. }));
}

#[tokio::test]
async fn export_emits_one_audit_event_without_content() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;

    env.client
        .request_export(Some(tenant), admin(), user.id)
        .await
        .unwrap();

    let events = env.audit.events_for_tenant(tenant);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_name, "user.data.exported");
    let metadata = serde_json::to_string(&events[0].metadata).unwrap();
    assert!(!metadata.contains("Ana"));
    assert!(!metadata.contains('@'));
}
