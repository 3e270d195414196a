use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use tenantadmin_auth::{Permission, PermissionSet, validate};
use tenantadmin_infra::{CustomRole, CustomRoleStore, NewCustomRole, StoreError};

use crate::config::AdminConfig;
use crate::context::{AccessRequirements, RequestContext};
use crate::errors::{AdminError, ValidationFailure};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomRoleRequest {
    pub name: String,
    pub description: String,
    pub permissions: PermissionSet,
}

/// Tenant-scoped custom role management.
#[derive(Debug, Clone)]
pub struct CustomRoleService<S> {
    store: S,
    config: AdminConfig,
    requirements: AccessRequirements,
}

impl<S: CustomRoleStore> CustomRoleService<S> {
    pub fn new(store: S, config: AdminConfig) -> Self {
        Self {
            store,
            config,
            requirements: AccessRequirements::any(),
        }
    }

    /// Additional access requirements checked before every operation.
    pub fn with_requirements(mut self, requirements: AccessRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Custom roles of the caller's tenant, by name.
    pub fn list(&self, ctx: &RequestContext) -> Result<Vec<CustomRole>, AdminError> {
        ctx.require(&self.requirements)?;
        ctx.authorize(Permission::UsersView)?;
        Ok(self.store.list_custom_roles(ctx.tenant_id())?)
    }

    #[instrument(
        skip(self, ctx, request),
        fields(tenant_id = %ctx.tenant_id(), name = %request.name),
        err
    )]
    pub fn create(
        &self,
        ctx: &RequestContext,
        request: &CreateCustomRoleRequest,
    ) -> Result<CustomRole, AdminError> {
        ctx.require(&self.requirements)?;
        ctx.authorize(Permission::RolesManage)?;

        let name = request.name.trim();
        let description = request.description.trim();
        if name.is_empty() || description.is_empty() {
            return Err(AdminError::bad_request("name and description are required"));
        }
        if request.permissions.is_empty() {
            return Err(AdminError::bad_request("at least one permission is required"));
        }

        if let Err(e) = self
            .config
            .escalation
            .check_grant(ctx.actor(), &request.permissions)
        {
            warn!(denied = %e.denied, granter_role = %e.granter_role, "escalation denied");
            return Err(e.into());
        }

        let result = validate(&request.permissions);
        if !result.is_valid {
            return Err(AdminError::Validation(
                result
                    .errors
                    .into_iter()
                    .map(|issue| ValidationFailure { user_id: None, issue })
                    .collect(),
            ));
        }

        let role = self
            .store
            .insert_custom_role(NewCustomRole {
                tenant_id: ctx.tenant_id(),
                name: name.to_string(),
                description: description.to_string(),
                permissions: request.permissions.clone(),
                created_by: Some(ctx.actor().user_id),
            })
            .map_err(|e| match e {
                StoreError::Conflict(msg) => AdminError::Conflict(msg),
                other => AdminError::Store(other),
            })?;

        info!(role_id = %role.id, permissions = role.permissions.len(), "custom role created");
        Ok(role)
    }
}
