//! End-to-end deletion lifecycle: soft-delete, retention gate, purge.

mod common;

use common::{admin, scope_for, TestEnv};
use uuid::Uuid;

use rgpd::contract::client::RgpdApi;
use rgpd::contract::error::RgpdError;
use rgpd::contract::model::{Actor, ConsentDecision, RequestStatus};
use rgpd::domain::repo::{ConsentRepository, UsersRepository};

#[tokio::test]
async fn request_deletion_hides_data_immediately() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;
    env.seed_usage(tenant, user.id, "chat_job", common::epoch()).await;

    env.client
        .grant_consent(Some(tenant), admin(), user.id, "analytics")
        .await
        .unwrap();

    let outcome = env
        .client
        .request_deletion(Some(tenant), admin(), user.id)
        .await
        .unwrap();
    assert!(outcome.newly_created);
    assert_eq!(outcome.request.status, RequestStatus::Pending);

    // Every normal read path treats the user as gone.
    let scope = scope_for(tenant);
    assert!(UsersRepository::find_by_id(env.store.as_ref(), &scope, user.id)
        .await
        .unwrap()
        .is_none());
    assert!(
        UsersRepository::find_by_email_fingerprint(
            env.store.as_ref(),
            &scope,
            &user.email_fingerprint
        )
        .await
        .unwrap()
        .is_none()
    );
    assert!(ConsentRepository::latest(env.store.as_ref(), &scope, user.id, "analytics")
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        env.client
            .get_consent(Some(tenant), user.id, "analytics")
            .await
            .unwrap(),
        ConsentDecision::Unknown
    );

    // But nothing is physically gone yet: a purge after the window still
    // finds rows to remove.
    env.clock.advance_days(30);
    let purge = env
        .client
        .purge_request(Actor::scheduler(), outcome.request.id)
        .await
        .unwrap();
    assert_eq!(purge.deleted.users, 1);
    assert_eq!(purge.deleted.consents, 1);
    assert_eq!(purge.deleted.usage_records, 1);
}

#[tokio::test]
async fn request_deletion_is_idempotent() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;

    let first = env
        .client
        .request_deletion(Some(tenant), admin(), user.id)
        .await
        .unwrap();
    assert!(first.newly_created);

    let replay = env
        .client
        .request_deletion(Some(tenant), admin(), user.id)
        .await
        .unwrap();
    assert!(!replay.newly_created);
    assert_eq!(replay.request.id, first.request.id);

    // Only one audit event for the pair of calls.
    let deletion_events = env
        .audit
        .events_for_tenant(tenant)
        .into_iter()
        .filter(|e| e.event_name == "rgpd.deletion.requested")
        .count();
    assert_eq!(deletion_events, 1);
}

#[tokio::test]
async fn purge_before_retention_window_is_refused() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;

    let outcome = env
        .client
        .request_deletion(Some(tenant), admin(), user.id)
        .await
        .unwrap();

    env.clock.advance_days(29);
    let err = env
        .client
        .purge_request(Actor::scheduler(), outcome.request.id)
        .await
        .unwrap_err();
    assert!(matches!(err, RgpdError::RetentionNotElapsed { .. }));

    // The refusal left everything in place; the day after, purge succeeds.
    env.clock.advance_days(1);
    let purge = env
        .client
        .purge_request(Actor::scheduler(), outcome.request.id)
        .await
        .unwrap();
    assert!(!purge.already_completed);
    assert_eq!(purge.deleted.users, 1);
}

#[tokio::test]
async fn purge_replay_is_a_noop_with_zero_counts() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;

    let outcome = env
        .client
        .request_deletion(Some(tenant), admin(), user.id)
        .await
        .unwrap();
    env.clock.advance_days(30);

    env.client
        .purge_request(Actor::scheduler(), outcome.request.id)
        .await
        .unwrap();
    let replay = env
        .client
        .purge_request(Actor::scheduler(), outcome.request.id)
        .await
        .unwrap();
    assert!(replay.already_completed);
    assert_eq!(replay.deleted.total(), 0);

    // Completion is audited once.
    let completed_events = env
        .audit
        .events_for_tenant(tenant)
        .into_iter()
        .filter(|e| e.event_name == "rgpd.deletion.completed")
        .count();
    assert_eq!(completed_events, 1);
}

#[tokio::test]
async fn purge_of_unknown_request_is_not_found() {
    let env = TestEnv::new();
    let err = env
        .client
        .purge_request(Actor::scheduler(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, RgpdError::NotFound { .. }));
}

#[tokio::test]
async fn purge_leaves_other_tenants_untouched() {
    let env = TestEnv::new();
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();
    let doomed = env.seed_user(tenant_a, "Ana").await;
    let bystander = env.seed_user(tenant_b, "Bo").await;

    env.client
        .grant_consent(Some(tenant_b), admin(), bystander.id, "analytics")
        .await
        .unwrap();

    let outcome = env
        .client
        .request_deletion(Some(tenant_a), admin(), doomed.id)
        .await
        .unwrap();
    env.clock.advance_days(30);
    env.client
        .purge_request(Actor::scheduler(), outcome.request.id)
        .await
        .unwrap();

    let scope_b = scope_for(tenant_b);
    assert!(
        UsersRepository::find_by_id(env.store.as_ref(), &scope_b, bystander.id)
            .await
            .unwrap()
            .is_some()
    );
    assert!(matches!(
        env.client
            .get_consent(Some(tenant_b), bystander.id, "analytics")
            .await
            .unwrap(),
        ConsentDecision::Granted { .. }
    ));
}

#[tokio::test]
async fn deletion_request_for_unknown_user_is_not_found() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();

    let err = env
        .client
        .request_deletion(Some(tenant), admin(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, RgpdError::NotFound { .. }));
}
