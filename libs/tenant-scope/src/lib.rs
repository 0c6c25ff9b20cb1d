//! Tenant context guard.
//!
//! Every operation on tenant-scoped data carries a [`TenantScope`]: a handle
//! that can only be constructed from a present, non-nil tenant id. Repository
//! methods take the scope as their first parameter and re-validate fetched
//! rows against it with [`TenantScope::assert_owns`], so a missing tenant id
//! is unrepresentable and a cross-tenant read fails after fetch as well.
//!
//! There is deliberately no ambient/global tenant state and no unscoped
//! fallback path.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Isolation violations are fatal to the enclosing operation and are never
/// retried automatically. The mismatch variant carries only the scope's own
/// tenant id, never the offending row's.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IsolationError {
    #[error("tenant id is missing")]
    MissingTenant,

    #[error("entity does not belong to tenant {scope}")]
    TenantMismatch { scope: Uuid },
}

/// Identifier of an isolated customer organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Wrap a raw uuid. Nil uuids are rejected; they are what a zeroed or
    /// defaulted field deserializes to and must not silently become a scope.
    pub fn new(id: Uuid) -> Result<Self, IsolationError> {
        if id.is_nil() {
            return Err(IsolationError::MissingTenant);
        }
        Ok(Self(id))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Entities that record which tenant owns them.
pub trait TenantOwned {
    fn owning_tenant(&self) -> Uuid;
}

/// A validated per-request tenant context, passed explicitly through every
/// repository call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantScope {
    tenant: TenantId,
}

impl TenantScope {
    /// Fail-closed constructor: `None` and nil ids are rejected before any
    /// storage is touched.
    pub fn new(tenant_id: Option<Uuid>) -> Result<Self, IsolationError> {
        let id = tenant_id.ok_or(IsolationError::MissingTenant)?;
        Ok(Self {
            tenant: TenantId::new(id)?,
        })
    }

    pub fn for_tenant(tenant: TenantId) -> Self {
        Self { tenant }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant
    }

    pub fn tenant_uuid(&self) -> Uuid {
        self.tenant.as_uuid()
    }

    /// Post-fetch re-validation: a row whose stored tenant id differs from
    /// the scope fails with the same error class as a missing tenant id,
    /// even though the row exists.
    pub fn assert_owns<T: TenantOwned>(&self, entity: &T) -> Result<(), IsolationError> {
        if self.owns(entity) {
            Ok(())
        } else {
            Err(IsolationError::TenantMismatch {
                scope: self.tenant.as_uuid(),
            })
        }
    }

    pub fn owns<T: TenantOwned>(&self, entity: &T) -> bool {
        entity.owning_tenant() == self.tenant.as_uuid()
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tenant.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        tenant_id: Uuid,
    }

    impl TenantOwned for Row {
        fn owning_tenant(&self) -> Uuid {
            self.tenant_id
        }
    }

    #[test]
    fn missing_tenant_is_rejected() {
        assert_eq!(
            TenantScope::new(None).unwrap_err(),
            IsolationError::MissingTenant
        );
    }

    #[test]
    fn nil_tenant_is_rejected() {
        assert_eq!(
            TenantScope::new(Some(Uuid::nil())).unwrap_err(),
            IsolationError::MissingTenant
        );
        assert!(TenantId::new(Uuid::nil()).is_err());
    }

    #[test]
    fn scope_owns_matching_rows_only() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let scope = TenantScope::new(Some(a)).unwrap();

        assert!(scope.assert_owns(&Row { tenant_id: a }).is_ok());

        let err = scope.assert_owns(&Row { tenant_id: b }).unwrap_err();
        assert_eq!(err, IsolationError::TenantMismatch { scope: a });
    }

    #[test]
    fn mismatch_error_reveals_only_the_scope_tenant() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let scope = TenantScope::new(Some(a)).unwrap();
        let msg = scope
            .assert_owns(&Row { tenant_id: b })
            .unwrap_err()
            .to_string();

        assert!(msg.contains(&a.to_string()));
        assert!(!msg.contains(&b.to_string()));
    }

    #[test]
    fn tenant_id_serde_is_transparent() {
        let id = Uuid::new_v4();
        let tenant = TenantId::new(id).unwrap();
        let json = serde_json::to_string(&tenant).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
