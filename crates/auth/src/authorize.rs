use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use tenantadmin_core::{TenantId, UserId};

use crate::engine::missing_dependencies;
use crate::{Permission, PermissionCategory, Principal, RiskLevel, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(Permission),

    #[error("forbidden: {0}")]
    RequirementNotMet(String),
}

/// Authorize a principal within its active tenant context.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: Permission) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.membership.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }

    if principal.effective_permissions().contains(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: Permission,
    pub granted: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    pub principal: PrincipalState,
    pub denial_reason: Option<DenialReason>,
}

/// Snapshot of the principal being checked.
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub user_id: UserId,
    pub active_tenant_id: TenantId,
    pub membership_tenant_id: TenantId,
    pub role: Role,
    pub effective_permissions: Vec<Permission>,
    pub granted_overrides: Vec<Permission>,
    pub revoked_overrides: Vec<Permission>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    TenantMismatch,
    MissingPermission,
    RevokedOverride,
}

/// Explain why an authorization decision was (or would be) made.
///
/// Answers "why was this request allowed/denied?" with the principal's
/// effective permissions and, on denial, what would fix it.
pub fn explain_authorization(principal: &Principal, required: Permission) -> AuthorizationExplanation {
    let membership = &principal.membership;
    let effective = principal.effective_permissions();

    let state = PrincipalState {
        user_id: principal.user_id,
        active_tenant_id: principal.active_tenant_id,
        membership_tenant_id: membership.tenant_id,
        role: membership.role,
        effective_permissions: effective.to_vec(),
        granted_overrides: membership.overrides.granted.to_vec(),
        revoked_overrides: membership.overrides.revoked.to_vec(),
    };

    if principal.active_tenant_id != membership.tenant_id {
        return AuthorizationExplanation {
            required_permission: required,
            granted: false,
            reason: format!(
                "Tenant mismatch: principal is active in tenant {} but membership is for tenant {}",
                principal.active_tenant_id, membership.tenant_id
            ),
            principal: state,
            denial_reason: Some(DenialReason {
                kind: DenialKind::TenantMismatch,
                message: "Principal is acting in a different tenant than its membership".to_string(),
                suggestions: vec![
                    "Switch the active tenant to the one the principal belongs to".to_string(),
                ],
            }),
        };
    }

    if effective.contains(required) {
        let reason = if membership.role.grants(required) {
            format!("Role {} grants '{}'", membership.role, required)
        } else {
            format!("'{}' is granted to the principal directly", required)
        };
        return AuthorizationExplanation {
            required_permission: required,
            granted: true,
            reason,
            principal: state,
            denial_reason: None,
        };
    }

    if membership.overrides.revoked.contains(required) {
        return AuthorizationExplanation {
            required_permission: required,
            granted: false,
            reason: format!(
                "Role {} grants '{}' but it was revoked for this principal",
                membership.role, required
            ),
            principal: state,
            denial_reason: Some(DenialReason {
                kind: DenialKind::RevokedOverride,
                message: format!("'{}' is revoked by a permission override", required),
                suggestions: vec![format!("Remove the override revoking '{}'", required)],
            }),
        };
    }

    let granting_roles: Vec<&str> = Role::ALL
        .into_iter()
        .filter(|r| r.grants(required))
        .map(Role::as_str)
        .collect();

    let mut suggestions = Vec::new();
    if !granting_roles.is_empty() {
        suggestions.push(format!(
            "Assign one of the roles granting '{}': {}",
            required,
            granting_roles.join(", ")
        ));
    }
    let missing = missing_dependencies(required, &effective);
    if missing.is_empty() {
        suggestions.push(format!("Grant '{}' to the principal directly", required));
    } else {
        let ids: Vec<&str> = missing.iter().map(|p| p.as_str()).collect();
        suggestions.push(format!(
            "Grant '{}' directly after granting its dependencies: {}",
            required,
            ids.join(", ")
        ));
    }

    AuthorizationExplanation {
        required_permission: required,
        granted: false,
        reason: format!(
            "Principal does not have permission '{}'. Current permissions: {}",
            required, effective
        ),
        principal: state,
        denial_reason: Some(DenialReason {
            kind: DenialKind::MissingPermission,
            message: format!("Missing required permission: '{}'", required),
            suggestions,
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Role definition with its baseline permissions (for audit/display).
#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub name: Role,
    pub label: &'static str,
    pub description: &'static str,
    pub permissions: Vec<Permission>,
}

/// Permission definition (for audit/display).
#[derive(Debug, Clone, Serialize)]
pub struct PermissionDefinition {
    pub name: Permission,
    pub label: &'static str,
    pub description: &'static str,
    pub category: PermissionCategory,
    pub risk: RiskLevel,
    pub dependencies: Vec<Permission>,
    /// Roles whose baseline includes this permission.
    pub granted_by: Vec<Role>,
}

/// Complete view of the RBAC catalog, keyed by string id.
#[derive(Debug, Clone, Serialize)]
pub struct RbacRegistry {
    pub roles: BTreeMap<&'static str, RoleDefinition>,
    pub permissions: BTreeMap<&'static str, PermissionDefinition>,
}

impl RbacRegistry {
    pub fn from_catalog() -> Self {
        let roles = Role::ALL
            .into_iter()
            .map(|role| {
                (
                    role.as_str(),
                    RoleDefinition {
                        name: role,
                        label: role.label(),
                        description: role.description(),
                        permissions: role.baseline().to_vec(),
                    },
                )
            })
            .collect();

        let permissions = Permission::ALL
            .into_iter()
            .map(|p| {
                let meta = p.metadata();
                (
                    meta.id,
                    PermissionDefinition {
                        name: p,
                        label: meta.label,
                        description: meta.description,
                        category: meta.category,
                        risk: meta.risk,
                        dependencies: meta.dependencies.to_vec(),
                        granted_by: Role::ALL.into_iter().filter(|r| r.grants(p)).collect(),
                    },
                )
            })
            .collect();

        Self { roles, permissions }
    }

    /// Permissions of one category, in catalog order.
    pub fn by_category(&self, category: PermissionCategory) -> Vec<&PermissionDefinition> {
        let mut defs: Vec<_> = self
            .permissions
            .values()
            .filter(|d| d.category == category)
            .collect();
        defs.sort_by_key(|d| d.name);
        defs
    }
}
