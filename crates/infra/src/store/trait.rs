use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tenantadmin_auth::{PermissionOverrides, PermissionSet, Principal, Role, TenantMembership, TenantRole};
use tenantadmin_core::{TenantId, UserId};

use super::audit::AuditRecord;

/// Errors returned by stores.
///
/// ## Error Categories
///
/// - **TenantIsolation**: cross-tenant access attempted
/// - **NotFound**: the principal does not exist in the tenant
/// - **Conflict**: stale version or duplicate unique key
/// - **Persistence**: the backend failed to write
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("lock poisoned")]
    LockPoisoned,

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("principal {0} not found")]
    NotFound(UserId),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("persistence failed: {0}")]
    Persistence(String),
}

/// Durable access state of one principal: role plus permission overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPrincipal {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub email: String,
    pub role: Role,
    pub tenant_role: Option<TenantRole>,
    pub overrides: PermissionOverrides,
    /// Incremented on every committed update.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl StoredPrincipal {
    pub fn new(tenant_id: TenantId, user_id: UserId, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            tenant_id,
            email: email.into(),
            role,
            tenant_role: None,
            overrides: PermissionOverrides::none(),
            version: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn effective_permissions(&self) -> PermissionSet {
        self.overrides.effective(self.role)
    }

    /// Resolve into an authorization principal acting in its own tenant.
    pub fn to_principal(&self) -> Principal {
        Principal {
            user_id: self.user_id,
            active_tenant_id: self.tenant_id,
            membership: TenantMembership {
                tenant_id: self.tenant_id,
                role: self.role,
                tenant_role: self.tenant_role,
                overrides: self.overrides.clone(),
            },
        }
    }
}

/// New access state for one principal inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalUpdate {
    pub user_id: UserId,
    pub role: Role,
    pub overrides: PermissionOverrides,
    /// Reject the update if the stored version differs.
    pub expected_version: Option<u64>,
}

/// Whether a transaction's staged writes are published.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TxDecision {
    Commit,
    Rollback,
}

/// Write handle scoped to one tenant for the duration of a transaction.
pub trait PrincipalTx {
    /// Stage a principal's new access state together with its audit record.
    ///
    /// Either both are staged or neither is.
    fn apply_change(
        &mut self,
        update: PrincipalUpdate,
        audit: AuditRecord,
    ) -> Result<StoredPrincipal, StoreError>;
}

/// Tenant-isolated store of principals' durable access state.
pub trait PrincipalStore: Send + Sync {
    fn get(&self, tenant_id: TenantId, user_id: UserId) -> Result<Option<StoredPrincipal>, StoreError>;

    /// Load the principals of `tenant_id` among `user_ids`; unknown ids are skipped.
    fn find_many(
        &self,
        tenant_id: TenantId,
        user_ids: &[UserId],
    ) -> Result<Vec<StoredPrincipal>, StoreError>;

    fn insert(&self, principal: StoredPrincipal) -> Result<(), StoreError>;

    /// Audit trail of a tenant, optionally narrowed to one principal, oldest first.
    fn audit_log(
        &self,
        tenant_id: TenantId,
        user_id: Option<UserId>,
    ) -> Result<Vec<AuditRecord>, StoreError>;

    /// Run `work` against staged state; publish it only on `TxDecision::Commit`.
    ///
    /// Writes made by a rolled-back transaction are never visible.
    fn transaction(
        &self,
        tenant_id: TenantId,
        work: &mut dyn FnMut(&mut dyn PrincipalTx) -> TxDecision,
    ) -> Result<TxDecision, StoreError>;
}

impl<S> PrincipalStore for Arc<S>
where
    S: PrincipalStore + ?Sized,
{
    fn get(&self, tenant_id: TenantId, user_id: UserId) -> Result<Option<StoredPrincipal>, StoreError> {
        (**self).get(tenant_id, user_id)
    }

    fn find_many(
        &self,
        tenant_id: TenantId,
        user_ids: &[UserId],
    ) -> Result<Vec<StoredPrincipal>, StoreError> {
        (**self).find_many(tenant_id, user_ids)
    }

    fn insert(&self, principal: StoredPrincipal) -> Result<(), StoreError> {
        (**self).insert(principal)
    }

    fn audit_log(
        &self,
        tenant_id: TenantId,
        user_id: Option<UserId>,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        (**self).audit_log(tenant_id, user_id)
    }

    fn transaction(
        &self,
        tenant_id: TenantId,
        work: &mut dyn FnMut(&mut dyn PrincipalTx) -> TxDecision,
    ) -> Result<TxDecision, StoreError> {
        (**self).transaction(tenant_id, work)
    }
}
