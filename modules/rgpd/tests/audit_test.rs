//! Audit trail guarantees: privacy constraints, ordering, and the
//! emit-before-success rule.

mod common;

use std::sync::Arc;

use common::{admin, scope_for, TestEnv};
use uuid::Uuid;

use rgpd::config::RgpdConfig;
use rgpd::contract::client::RgpdApi;
use rgpd::contract::error::RgpdError;
use rgpd::contract::model::ConsentDecision;
use rgpd::domain::audit::{AuditRecorder, AuditValue};
use rgpd::domain::consent::ConsentService;
use rgpd::domain::ports::FixedClock;
use rgpd::domain::repo::{RequestsRepository, UsersRepository};
use rgpd::domain::requests::DsrService;
use rgpd::infra::audit::memory::FailingAuditSink;
use rgpd::infra::blob::MemoryBlobStore;
use rgpd::infra::storage::memory::MemoryStore;

#[tokio::test]
async fn events_are_ordered_per_tenant() {
    let env = TestEnv::new();
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();
    let ana = env.seed_user(tenant_a, "Ana").await;
    let bo = env.seed_user(tenant_b, "Bo").await;

    env.client
        .grant_consent(Some(tenant_a), admin(), ana.id, "analytics")
        .await
        .unwrap();
    env.client
        .grant_consent(Some(tenant_b), admin(), bo.id, "marketing")
        .await
        .unwrap();
    env.client
        .revoke_consent(Some(tenant_a), admin(), ana.id, "analytics")
        .await
        .unwrap();

    let a_names: Vec<String> = env
        .audit
        .events_for_tenant(tenant_a)
        .into_iter()
        .map(|e| e.event_name)
        .collect();
    assert_eq!(a_names, vec!["consent.granted", "consent.revoked"]);

    let b_events = env.audit.events_for_tenant(tenant_b);
    assert_eq!(b_events.len(), 1);
    assert_eq!(b_events[0].target_id, Some(bo.id));
}

#[tokio::test]
async fn metadata_is_categorical_not_textual() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana Ramirez").await;

    env.client
        .create_suspension(
            Some(tenant),
            admin(),
            user.id,
            "subject wrote to privacy@company.example about their data",
        )
        .await
        .unwrap();
    env.client
        .request_deletion(Some(tenant), admin(), user.id)
        .await
        .unwrap();

    for event in env.audit.events_for_tenant(tenant) {
        let serialized = serde_json::to_string(&event.metadata).unwrap();
        assert!(!serialized.contains('@'), "metadata leaked: {serialized}");
        assert!(!serialized.contains("Ana"));
        assert!(!serialized.contains("privacy"));
    }
}

#[tokio::test]
async fn deletion_request_metadata_carries_schedule_only() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;

    env.client
        .request_deletion(Some(tenant), admin(), user.id)
        .await
        .unwrap();

    let events = env.audit.events_for_tenant(tenant);
    assert_eq!(events.len(), 1);
    let metadata = &events[0].metadata;
    assert_eq!(
        metadata.get("retention_days"),
        Some(&AuditValue::Days(30))
    );
    assert!(matches!(
        metadata.get("scheduled_purge_at"),
        Some(AuditValue::Timestamp(_))
    ));
}

#[tokio::test]
async fn sink_failure_aborts_the_transition() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::at(common::epoch()));
    let recorder = AuditRecorder::new(Arc::new(FailingAuditSink), clock.clone());
    let consent = ConsentService::new(store.clone(), store.clone(), recorder, clock);

    let tenant = Uuid::new_v4();
    let scope = scope_for(tenant);
    let env = TestEnv::new();
    let user = env.seed_user(tenant, "Ana").await;
    UsersRepository::insert(store.as_ref(), &scope, user.clone())
        .await
        .unwrap();

    // No success without a durably accepted audit event.
    let err = consent
        .grant(&scope, admin(), user.id, "analytics")
        .await
        .unwrap_err();
    assert!(matches!(RgpdError::from(err), RgpdError::Internal));

    // The refused grant committed nothing: the ledger still answers
    // Unknown, not Granted.
    assert_eq!(
        consent.get(&scope, user.id, "analytics").await.unwrap(),
        ConsentDecision::Unknown
    );
}

#[tokio::test]
async fn sink_failure_leaves_deletion_uncommitted() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::at(common::epoch()));
    let recorder = AuditRecorder::new(Arc::new(FailingAuditSink), clock.clone());
    let blobs = Arc::new(MemoryBlobStore::new());
    let dsr = DsrService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        blobs,
        recorder,
        clock,
        RgpdConfig::default(),
    );

    let tenant = Uuid::new_v4();
    let scope = scope_for(tenant);
    let env = TestEnv::new();
    let user = env.seed_user(tenant, "Ana").await;
    UsersRepository::insert(store.as_ref(), &scope, user.clone())
        .await
        .unwrap();

    dsr.request_deletion(&scope, admin(), user.id)
        .await
        .unwrap_err();

    // The user is still fully visible and no request row was written.
    assert!(UsersRepository::find_by_id(store.as_ref(), &scope, user.id)
        .await
        .unwrap()
        .is_some());
    assert!(
        RequestsRepository::find_pending_deletion(store.as_ref(), &scope, user.id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn scheduler_actor_is_recorded_with_its_scope() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;

    env.client
        .request_deletion(Some(tenant), admin(), user.id)
        .await
        .unwrap();
    env.clock.advance_days(30);
    env.client
        .run_tenant_purge_job(Some(tenant), rgpd::contract::model::Actor::scheduler(), false)
        .await
        .unwrap();

    let completed = env
        .audit
        .events_for_tenant(tenant)
        .into_iter()
        .find(|e| e.event_name == "rgpd.deletion.completed")
        .unwrap();
    assert_eq!(
        completed.actor_scope,
        rgpd::contract::model::ActorScope::Scheduler
    );
    assert_eq!(completed.actor_id, None);
}

#[tokio::test]
async fn consent_decision_is_unknown_for_other_tenant_after_events() {
    // Events for one tenant never bleed into another tenant's view.
    let env = TestEnv::new();
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();
    let ana = env.seed_user(tenant_a, "Ana").await;

    env.client
        .grant_consent(Some(tenant_a), admin(), ana.id, "analytics")
        .await
        .unwrap();

    assert!(env.audit.events_for_tenant(tenant_b).is_empty());
    assert_eq!(
        env.client
            .get_consent(Some(tenant_b), ana.id, "analytics")
            .await
            .unwrap(),
        ConsentDecision::Unknown
    );
}
