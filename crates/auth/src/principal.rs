use serde::{Deserialize, Serialize};

use tenantadmin_core::{TenantId, UserId};

use crate::{PermissionSet, Role, TenantRole};

/// Durable per-principal customization on top of the role baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverrides {
    /// Granted beyond the baseline.
    pub granted: PermissionSet,
    /// Removed from the baseline.
    pub revoked: PermissionSet,
}

impl PermissionOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty() && self.revoked.is_empty()
    }

    /// Overrides that turn `role`'s baseline into exactly `effective`.
    pub fn from_effective(role: Role, effective: &PermissionSet) -> Self {
        let baseline = role.baseline();
        Self {
            granted: effective.difference(&baseline),
            revoked: baseline.difference(effective),
        }
    }

    /// `baseline(role) ∪ granted − revoked`.
    pub fn effective(&self, role: Role) -> PermissionSet {
        role.baseline().union(&self.granted).difference(&self.revoked)
    }
}

/// A principal's membership in a tenant.
///
/// States which tenant the principal belongs to, its platform role, its
/// organization role and any permission overrides stored for it there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub tenant_id: TenantId,
    pub role: Role,
    pub tenant_role: Option<TenantRole>,
    pub overrides: PermissionOverrides,
}

impl TenantMembership {
    pub fn effective_permissions(&self) -> PermissionSet {
        self.overrides.effective(self.role)
    }
}

/// A fully resolved principal for authorization decisions.
///
/// Built by the caller from stored membership data; never read from ambient
/// request state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub active_tenant_id: TenantId,
    pub membership: TenantMembership,
}

impl Principal {
    /// Principal acting in its own tenant with the plain role baseline.
    pub fn with_role(user_id: UserId, tenant_id: TenantId, role: Role) -> Self {
        Self {
            user_id,
            active_tenant_id: tenant_id,
            membership: TenantMembership {
                tenant_id,
                role,
                tenant_role: None,
                overrides: PermissionOverrides::none(),
            },
        }
    }

    pub fn role(&self) -> Role {
        self.membership.role
    }

    pub fn effective_permissions(&self) -> PermissionSet {
        self.membership.effective_permissions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Permission;

    #[test]
    fn effective_applies_grants_and_revocations() {
        let overrides = PermissionOverrides {
            granted: [Permission::AuditView].into(),
            revoked: [Permission::BookingsManage].into(),
        };
        let eff = overrides.effective(Role::TeamMember);
        assert!(eff.contains(Permission::AuditView));
        assert!(!eff.contains(Permission::BookingsManage));
        assert_eq!(eff.len(), Role::TeamMember.baseline().len());
    }

    #[test]
    fn from_effective_round_trips() {
        let mut target = Role::TeamLead.baseline();
        target.remove(Permission::NewsletterManage);
        target.insert(Permission::SettingsView);

        let overrides = PermissionOverrides::from_effective(Role::TeamLead, &target);
        assert_eq!(overrides.granted.to_vec(), vec![Permission::SettingsView]);
        assert_eq!(overrides.revoked.to_vec(), vec![Permission::NewsletterManage]);
        assert_eq!(overrides.effective(Role::TeamLead), target);
    }

    #[test]
    fn baseline_needs_no_overrides() {
        let overrides = PermissionOverrides::from_effective(Role::Admin, &Role::Admin.baseline());
        assert!(overrides.is_empty());
    }
}
