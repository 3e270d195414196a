use serde::{Deserialize, Serialize};

use tenantadmin_auth::{AuthzError, Permission, Principal, Role, authorize};
use tenantadmin_core::{RequestId, TenantId};

/// Explicit per-request context: who acts, in which tenant.
///
/// Passed as a parameter to every admin operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    tenant_id: TenantId,
    actor: Principal,
    request_id: RequestId,
}

impl RequestContext {
    /// Context for `actor` acting in its active tenant, with a fresh request id.
    pub fn new(actor: Principal) -> Self {
        Self::with_request_id(actor, RequestId::new())
    }

    /// Keep an incoming correlation id.
    pub fn with_request_id(actor: Principal, request_id: RequestId) -> Self {
        Self {
            tenant_id: actor.active_tenant_id,
            actor,
            request_id,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn actor(&self) -> &Principal {
        &self.actor
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn authorize(&self, required: Permission) -> Result<(), AuthzError> {
        authorize(&self.actor, required)
    }

    /// Check route-level requirements (super admin, tenant admin, allowed roles).
    pub fn require(&self, requirements: &AccessRequirements) -> Result<(), AuthzError> {
        if self.actor.membership.tenant_id != self.tenant_id {
            return Err(AuthzError::TenantMismatch);
        }

        let role = self.actor.role();
        if requirements.require_super_admin && role != Role::SuperAdmin {
            return Err(AuthzError::RequirementNotMet(
                "super admin role required".to_string(),
            ));
        }

        if requirements.require_tenant_admin
            && !self
                .actor
                .membership
                .tenant_role
                .is_some_and(|r| r.is_tenant_admin())
        {
            return Err(AuthzError::RequirementNotMet(
                "tenant owner or admin required".to_string(),
            ));
        }

        if !requirements.allowed_roles.is_empty() && !requirements.allowed_roles.contains(&role) {
            return Err(AuthzError::RequirementNotMet(format!(
                "role {role} is not allowed"
            )));
        }

        Ok(())
    }
}

/// Access requirements an operation declares up front.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequirements {
    #[serde(default)]
    pub require_super_admin: bool,
    #[serde(default)]
    pub require_tenant_admin: bool,
    /// Empty means any role.
    #[serde(default)]
    pub allowed_roles: Vec<Role>,
}

impl AccessRequirements {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn super_admin() -> Self {
        Self {
            require_super_admin: true,
            ..Self::default()
        }
    }

    pub fn tenant_admin() -> Self {
        Self {
            require_tenant_admin: true,
            ..Self::default()
        }
    }

    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed_roles: roles.into_iter().collect(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenantadmin_auth::TenantRole;
    use tenantadmin_core::UserId;

    fn ctx(role: Role, tenant_role: Option<TenantRole>) -> RequestContext {
        let mut actor = Principal::with_role(UserId::new(), TenantId::new(), role);
        actor.membership.tenant_role = tenant_role;
        RequestContext::new(actor)
    }

    #[test]
    fn any_requirement_passes() {
        assert!(ctx(Role::Client, None).require(&AccessRequirements::any()).is_ok());
    }

    #[test]
    fn super_admin_requirement() {
        let req = AccessRequirements::super_admin();
        assert!(ctx(Role::SuperAdmin, None).require(&req).is_ok());
        assert!(matches!(
            ctx(Role::Admin, None).require(&req),
            Err(AuthzError::RequirementNotMet(_))
        ));
    }

    #[test]
    fn tenant_admin_requirement_uses_org_role() {
        let req = AccessRequirements::tenant_admin();
        assert!(ctx(Role::TeamMember, Some(TenantRole::Owner)).require(&req).is_ok());
        assert!(ctx(Role::SuperAdmin, Some(TenantRole::Member)).require(&req).is_err());
        assert!(ctx(Role::SuperAdmin, None).require(&req).is_err());
    }

    #[test]
    fn allowed_roles_requirement() {
        let req = AccessRequirements::roles([Role::Admin, Role::SuperAdmin]);
        assert!(ctx(Role::Admin, None).require(&req).is_ok());
        assert!(ctx(Role::TeamLead, None).require(&req).is_err());
    }

    #[test]
    fn authorize_delegates_to_effective_permissions() {
        let c = ctx(Role::Admin, None);
        assert!(c.authorize(Permission::RolesManage).is_ok());
        assert!(c.authorize(Permission::AuditPurge).is_err());
    }
}
