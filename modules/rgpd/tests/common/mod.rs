//! Shared wiring for the integration-style suites: in-memory infra, a
//! deterministic clock and the fully assembled local client.

// Not every suite uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tenant_scope::TenantScope;
use uuid::Uuid;

use rgpd::config::RgpdConfig;
use rgpd::contract::model::{Actor, UsageRecord, User};
use rgpd::domain::audit::AuditRecorder;
use rgpd::domain::consent::ConsentService;
use rgpd::domain::ports::FixedClock;
use rgpd::domain::registers::{DisputeService, OppositionService, SuspensionService};
use rgpd::domain::repo::{UsageRepository, UsersRepository};
use rgpd::domain::requests::DsrService;
use rgpd::domain::retention::RetentionService;
use rgpd::gateways::RgpdLocalClient;
use rgpd::infra::audit::MemoryAuditSink;
use rgpd::infra::blob::MemoryBlobStore;
use rgpd::infra::crypto::email_fingerprint;
use rgpd::infra::storage::memory::MemoryStore;

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// Honors `RUST_LOG` so a failing suite can be re-run with engine traces.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub audit: Arc<MemoryAuditSink>,
    pub blobs: Arc<MemoryBlobStore>,
    pub config: RgpdConfig,
    pub consent: ConsentService,
    pub suspensions: SuspensionService,
    pub oppositions: OppositionService,
    pub disputes: DisputeService,
    pub dsr: DsrService,
    pub retention: RetentionService,
    pub client: RgpdLocalClient,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(RgpdConfig::default())
    }

    pub fn with_config(config: RgpdConfig) -> Self {
        init_tracing();

        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::at(epoch()));
        let audit_sink = Arc::new(MemoryAuditSink::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let recorder = AuditRecorder::new(audit_sink.clone(), clock.clone());

        let consent = ConsentService::new(
            store.clone(),
            store.clone(),
            recorder.clone(),
            clock.clone(),
        );
        let suspensions = SuspensionService::new(
            store.clone(),
            store.clone(),
            recorder.clone(),
            clock.clone(),
        );
        let oppositions = OppositionService::new(
            store.clone(),
            store.clone(),
            recorder.clone(),
            clock.clone(),
        );
        let disputes = DisputeService::new(
            store.clone(),
            store.clone(),
            recorder.clone(),
            clock.clone(),
            config.clone(),
        );
        let dsr = DsrService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            blobs.clone(),
            recorder.clone(),
            clock.clone(),
            config.clone(),
        );
        let retention = RetentionService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            blobs.clone(),
            dsr.clone(),
            recorder,
            clock.clone(),
            config.clone(),
        );
        let client = RgpdLocalClient::new(
            consent.clone(),
            suspensions.clone(),
            oppositions.clone(),
            disputes.clone(),
            dsr.clone(),
            retention.clone(),
        );

        Self {
            store,
            clock,
            audit: audit_sink,
            blobs,
            config,
            consent,
            suspensions,
            oppositions,
            disputes,
            dsr,
            retention,
            client,
        }
    }

    /// Insert a user directly through the repository, the way provisioning
    /// would.
    pub async fn seed_user(&self, tenant_id: Uuid, display_name: &str) -> User {
        let scope = TenantScope::new(Some(tenant_id)).unwrap();
        let now = epoch();
        let user = User {
            id: Uuid::new_v4(),
            tenant_id,
            email_fingerprint: email_fingerprint(&format!(
                "{}@example.test",
                display_name.to_lowercase().replace(' ', ".")
            )),
            display_name: display_name.to_owned(),
            data_suspended: false,
            suspended_reason: None,
            suspended_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        UsersRepository::insert(self.store.as_ref(), &scope, user.clone())
            .await
            .unwrap();
        user
    }

    pub async fn seed_usage(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        kind: &str,
        created_at: DateTime<Utc>,
    ) -> UsageRecord {
        let scope = TenantScope::new(Some(tenant_id)).unwrap();
        let record = UsageRecord {
            id: Uuid::new_v4(),
            tenant_id,
            user_id,
            kind: kind.to_owned(),
            created_at,
            deleted_at: None,
        };
        UsageRepository::insert(self.store.as_ref(), &scope, record.clone())
            .await
            .unwrap();
        record
    }
}

pub fn scope_for(tenant_id: Uuid) -> TenantScope {
    TenantScope::new(Some(tenant_id)).unwrap()
}

pub fn admin() -> Actor {
    Actor::tenant_user(Uuid::new_v4())
}
