use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tenantadmin_auth::PermissionSet;
use tenantadmin_core::{TenantId, UserId};

use super::r#trait::StoreError;

/// A tenant-defined named permission bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRole {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: String,
    pub permissions: PermissionSet,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomRole {
    pub tenant_id: TenantId,
    pub name: String,
    pub description: String,
    pub permissions: PermissionSet,
    pub created_by: Option<UserId>,
}

/// Storage of custom roles. Names are unique per tenant.
pub trait CustomRoleStore: Send + Sync {
    /// Custom roles of a tenant ordered by name.
    fn list_custom_roles(&self, tenant_id: TenantId) -> Result<Vec<CustomRole>, StoreError>;

    fn find_custom_role(&self, tenant_id: TenantId, name: &str) -> Result<Option<CustomRole>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the name is taken in the tenant.
    fn insert_custom_role(&self, role: NewCustomRole) -> Result<CustomRole, StoreError>;
}

impl<S> CustomRoleStore for Arc<S>
where
    S: CustomRoleStore + ?Sized,
{
    fn list_custom_roles(&self, tenant_id: TenantId) -> Result<Vec<CustomRole>, StoreError> {
        (**self).list_custom_roles(tenant_id)
    }

    fn find_custom_role(&self, tenant_id: TenantId, name: &str) -> Result<Option<CustomRole>, StoreError> {
        (**self).find_custom_role(tenant_id, name)
    }

    fn insert_custom_role(&self, role: NewCustomRole) -> Result<CustomRole, StoreError> {
        (**self).insert_custom_role(role)
    }
}
