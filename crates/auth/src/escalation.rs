//! Privilege escalation guard.
//!
//! A granter may only hand out permissions it holds itself, unless its role
//! is exempt. This check runs at the service boundary, before the engine.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{PermissionSet, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot grant permissions you don't have: {denied}")]
pub struct EscalationError {
    pub granter_role: Role,
    pub denied: PermissionSet,
}

/// Which roles may grant beyond their own effective permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    exempt_roles: BTreeSet<Role>,
}

impl Default for EscalationPolicy {
    /// Only `SUPER_ADMIN` is exempt.
    fn default() -> Self {
        Self::exempting([Role::SuperAdmin])
    }
}

impl EscalationPolicy {
    pub fn exempting(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            exempt_roles: roles.into_iter().collect(),
        }
    }

    /// No role is exempt.
    pub fn strict() -> Self {
        Self {
            exempt_roles: BTreeSet::new(),
        }
    }

    pub fn is_exempt(&self, role: Role) -> bool {
        self.exempt_roles.contains(&role)
    }

    pub fn exempt_roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.exempt_roles.iter().copied()
    }

    /// Check that `granter` may grant every permission in `requested`.
    pub fn check_grant(
        &self,
        granter: &Principal,
        requested: &PermissionSet,
    ) -> Result<(), EscalationError> {
        let role = granter.role();
        if self.is_exempt(role) {
            return Ok(());
        }

        let denied = requested.difference(&granter.effective_permissions());
        if denied.is_empty() {
            Ok(())
        } else {
            Err(EscalationError {
                granter_role: role,
                denied,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Permission;
    use tenantadmin_core::{TenantId, UserId};

    fn granter(role: Role) -> Principal {
        Principal::with_role(UserId::new(), TenantId::new(), role)
    }

    #[test]
    fn admin_cannot_grant_super_admin_only_permissions() {
        let policy = EscalationPolicy::default();
        let err = policy
            .check_grant(&granter(Role::Admin), &Role::SuperAdmin.baseline())
            .unwrap_err();
        assert_eq!(
            err.denied.to_vec(),
            vec![Permission::UsersImpersonate, Permission::SystemMaintenance]
        );
        assert!(err.to_string().contains("users.impersonate"));
    }

    #[test]
    fn super_admin_is_exempt_by_default() {
        let policy = EscalationPolicy::default();
        let requested: PermissionSet = [Permission::AuditPurge].into();
        assert!(policy.check_grant(&granter(Role::SuperAdmin), &requested).is_ok());
        assert!(EscalationPolicy::strict()
            .check_grant(&granter(Role::SuperAdmin), &requested)
            .is_err());
    }

    #[test]
    fn granting_within_own_set_never_escalates() {
        let policy = EscalationPolicy::default();
        for role in Role::ALL {
            let g = granter(role);
            assert!(policy.check_grant(&g, &g.effective_permissions()).is_ok(), "{role}");
            assert!(policy.check_grant(&g, &PermissionSet::new()).is_ok());
        }
    }

    #[test]
    fn configurable_exemption() {
        let policy = EscalationPolicy::exempting([Role::Admin, Role::SuperAdmin]);
        let requested: PermissionSet = [Permission::SystemMaintenance].into();
        assert!(policy.check_grant(&granter(Role::Admin), &requested).is_ok());
        assert!(policy.check_grant(&granter(Role::TeamLead), &requested).is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any subset of the granter's own set passes, for every role.
            #[test]
            fn subsets_of_own_permissions_pass(
                role_idx in 0usize..5,
                picks in proptest::collection::vec(any::<bool>(), 26),
            ) {
                let g = granter(Role::ALL[role_idx]);
                let own = g.effective_permissions();
                let requested: PermissionSet = own
                    .iter()
                    .zip(picks.iter())
                    .filter(|(_, keep)| **keep)
                    .map(|(p, _)| p)
                    .collect();
                prop_assert!(EscalationPolicy::strict().check_grant(&g, &requested).is_ok());
            }
        }
    }
}
