//! Retention scheduler: tenant purge job and category purges.

mod common;

use common::{admin, TestEnv};
use chrono::Duration;
use uuid::Uuid;

use rgpd::contract::client::RgpdApi;
use rgpd::contract::error::RgpdError;
use rgpd::contract::model::{Actor, ConsentDecision, RetentionPolicy};

#[tokio::test]
async fn dry_run_reports_without_mutating() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;
    env.seed_usage(
        tenant,
        user.id,
        "chat_job",
        common::epoch() - Duration::days(91),
    )
    .await;

    let bundle = env
        .client
        .request_export(Some(tenant), admin(), user.id)
        .await
        .unwrap();
    env.client
        .request_deletion(Some(tenant), admin(), user.id)
        .await
        .unwrap();
    env.clock.advance_days(30);

    let report = env
        .client
        .run_tenant_purge_job(Some(tenant), Actor::scheduler(), true)
        .await
        .unwrap();
    assert!(report.dry_run);
    assert_eq!(report.requests_processed, 1);
    assert_eq!(report.aged_usage_records, 1);
    assert_eq!(report.expired_bundles, 1);
    assert_eq!(report.deleted.total(), 0);

    // Nothing moved: the bundle blob is still there and a second dry run
    // reports the same numbers.
    assert!(env.blobs.contains(bundle.id));
    let again = env
        .client
        .run_tenant_purge_job(Some(tenant), Actor::scheduler(), true)
        .await
        .unwrap();
    assert_eq!(again.requests_processed, 1);
    assert_eq!(again.aged_usage_records, 1);
    assert_eq!(again.expired_bundles, 1);
}

#[tokio::test]
async fn real_run_purges_and_reaches_a_fixed_point() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;
    env.seed_usage(
        tenant,
        user.id,
        "chat_job",
        common::epoch() - Duration::days(91),
    )
    .await;
    let survivor = env.seed_user(tenant, "Bo").await;
    env.seed_usage(tenant, survivor.id, "chat_job", common::epoch()).await;

    env.client
        .request_deletion(Some(tenant), admin(), user.id)
        .await
        .unwrap();
    env.clock.advance_days(30);

    let report = env
        .client
        .run_tenant_purge_job(Some(tenant), Actor::scheduler(), false)
        .await
        .unwrap();
    assert!(!report.dry_run);
    assert_eq!(report.requests_processed, 1);
    assert_eq!(report.deleted.users, 1);
    // The aged record belonged to the purged user; what is left is the
    // survivor's fresh record, which is younger than 30 + 90 days.
    assert_eq!(report.aged_usage_records, 0);

    // Immediately re-running finds nothing to do.
    let again = env
        .client
        .run_tenant_purge_job(Some(tenant), Actor::scheduler(), false)
        .await
        .unwrap();
    assert_eq!(again.requests_processed, 0);
    assert_eq!(again.deleted.total(), 0);
    assert_eq!(again.aged_usage_records, 0);
    assert_eq!(again.expired_bundles, 0);
}

#[tokio::test]
async fn purge_job_only_touches_its_own_tenant() {
    let env = TestEnv::new();
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();
    let doomed = env.seed_user(tenant_a, "Ana").await;
    let bystander = env.seed_user(tenant_b, "Bo").await;
    env.seed_usage(
        tenant_b,
        bystander.id,
        "chat_job",
        common::epoch() - Duration::days(365),
    )
    .await;

    env.client
        .grant_consent(Some(tenant_b), admin(), bystander.id, "analytics")
        .await
        .unwrap();
    env.client
        .request_deletion(Some(tenant_a), admin(), doomed.id)
        .await
        .unwrap();
    env.clock.advance_days(30);

    let report = env
        .client
        .run_tenant_purge_job(Some(tenant_a), Actor::scheduler(), false)
        .await
        .unwrap();
    assert_eq!(report.tenant_id, tenant_a);
    assert_eq!(report.requests_processed, 1);
    // Tenant B's year-old usage record is not this run's business.
    assert_eq!(report.aged_usage_records, 0);

    assert!(matches!(
        env.client
            .get_consent(Some(tenant_b), bystander.id, "analytics")
            .await
            .unwrap(),
        ConsentDecision::Granted { .. }
    ));
}

#[tokio::test]
async fn purge_job_shreds_expired_bundles() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;

    let expired = env
        .client
        .request_export(Some(tenant), admin(), user.id)
        .await
        .unwrap();
    env.clock.advance_days(8);
    let fresh = env
        .client
        .request_export(Some(tenant), admin(), user.id)
        .await
        .unwrap();

    let report = env
        .client
        .run_tenant_purge_job(Some(tenant), Actor::scheduler(), false)
        .await
        .unwrap();
    assert_eq!(report.expired_bundles, 1);
    assert!(!env.blobs.contains(expired.id));
    assert!(env.blobs.contains(fresh.id));
    assert!(env
        .client
        .open_export(Some(tenant), fresh.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn bundle_at_exact_expiry_is_unreadable_and_sweepable() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;

    let bundle = env
        .client
        .request_export(Some(tenant), admin(), user.id)
        .await
        .unwrap();

    // The instant a bundle stops opening it also becomes sweepable; no
    // gap where it is unreadable yet kept.
    env.clock.set(bundle.expires_at);
    assert!(env
        .client
        .open_export(Some(tenant), bundle.id)
        .await
        .unwrap()
        .is_none());

    let report = env
        .client
        .run_tenant_purge_job(Some(tenant), Actor::scheduler(), false)
        .await
        .unwrap();
    assert_eq!(report.expired_bundles, 1);
    assert!(!env.blobs.contains(bundle.id));
}

#[tokio::test]
async fn usage_record_cutoff_is_strictly_older_than() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;

    let cutoff = common::epoch() - Duration::days(90);
    env.seed_usage(tenant, user.id, "older", cutoff - Duration::seconds(1))
        .await;
    env.seed_usage(tenant, user.id, "at_cutoff", cutoff).await;
    env.seed_usage(tenant, user.id, "fresh", common::epoch()).await;

    let deleted = env
        .retention
        .purge_usage_records(
            &common::scope_for(tenant),
            Actor::scheduler(),
            RetentionPolicy { retention_days: 90 },
            false,
        )
        .await
        .unwrap();
    assert_eq!(deleted, 1);
}

#[tokio::test]
async fn category_purge_dry_run_counts_only() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let user = env.seed_user(tenant, "Ana").await;
    env.seed_usage(
        tenant,
        user.id,
        "chat_job",
        common::epoch() - Duration::days(10),
    )
    .await;
    let scope = common::scope_for(tenant);

    let would_delete = env
        .retention
        .purge_usage_records(
            &scope,
            Actor::scheduler(),
            RetentionPolicy { retention_days: 5 },
            true,
        )
        .await
        .unwrap();
    assert_eq!(would_delete, 1);

    // Dry run emitted no audit event and removed nothing.
    assert!(env.audit.events_for_tenant(tenant).is_empty());
    let deleted = env
        .retention
        .purge_usage_records(
            &scope,
            Actor::scheduler(),
            RetentionPolicy { retention_days: 5 },
            false,
        )
        .await
        .unwrap();
    assert_eq!(deleted, 1);
}

#[tokio::test]
async fn negative_retention_policy_is_rejected() {
    let env = TestEnv::new();
    let tenant = Uuid::new_v4();
    let scope = common::scope_for(tenant);

    let err = env
        .retention
        .purge_usage_records(
            &scope,
            Actor::scheduler(),
            RetentionPolicy { retention_days: -1 },
            false,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        RgpdError::from(err),
        RgpdError::Validation { .. }
    ));
}
