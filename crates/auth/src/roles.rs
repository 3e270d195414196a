use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Permission, PermissionSet};

/// Platform role of a principal.
///
/// Ordered from least to most privileged. Each role carries an immutable
/// baseline permission set (see [`Role::baseline`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Client,
    TeamMember,
    TeamLead,
    Admin,
    SuperAdmin,
}

const CLIENT: &[Permission] = &[Permission::DashboardView];

const TEAM_MEMBER: &[Permission] = &[
    Permission::DashboardView,
    Permission::AnalyticsView,
    Permission::BookingsView,
    Permission::BookingsManage,
    Permission::ContentView,
    Permission::ServicesView,
    Permission::CurrenciesView,
    Permission::TranslationsView,
];

const TEAM_LEAD_EXTRA: &[Permission] = &[
    Permission::AnalyticsExport,
    Permission::UsersView,
    Permission::ContentManage,
    Permission::NewsletterManage,
    Permission::ServicesManage,
    Permission::TranslationsManage,
];

const ADMIN_EXTRA: &[Permission] = &[
    Permission::UsersManage,
    Permission::UsersDelete,
    Permission::RolesView,
    Permission::RolesManage,
    Permission::CurrenciesManage,
    Permission::PriceOverridesManage,
    Permission::SettingsView,
    Permission::SettingsManage,
    Permission::AuditView,
];

const SUPER_ADMIN_EXTRA: &[Permission] =
    &[Permission::UsersImpersonate, Permission::SystemMaintenance];

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Client,
        Role::TeamMember,
        Role::TeamLead,
        Role::Admin,
        Role::SuperAdmin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "CLIENT",
            Role::TeamMember => "TEAM_MEMBER",
            Role::TeamLead => "TEAM_LEAD",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Client => "Client",
            Role::TeamMember => "Team Member",
            Role::TeamLead => "Team Lead",
            Role::Admin => "Admin",
            Role::SuperAdmin => "Super Admin",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Role::Client => "View own data only",
            Role::TeamMember => "Limited access and basic features",
            Role::TeamLead => "Manage team and team-specific settings",
            Role::Admin => "Manage organization and settings",
            Role::SuperAdmin => "Full system access",
        }
    }

    /// Baseline permissions granted by this role.
    ///
    /// Each role includes everything the previous one grants, except
    /// `CLIENT` which only sees the dashboard.
    pub fn baseline(self) -> PermissionSet {
        let tiers: &[&[Permission]] = match self {
            Role::Client => &[CLIENT],
            Role::TeamMember => &[TEAM_MEMBER],
            Role::TeamLead => &[TEAM_MEMBER, TEAM_LEAD_EXTRA],
            Role::Admin => &[TEAM_MEMBER, TEAM_LEAD_EXTRA, ADMIN_EXTRA],
            Role::SuperAdmin => &[TEAM_MEMBER, TEAM_LEAD_EXTRA, ADMIN_EXTRA, SUPER_ADMIN_EXTRA],
        };
        tiers.iter().flat_map(|tier| tier.iter().copied()).collect()
    }

    pub fn grants(self, permission: Permission) -> bool {
        self.baseline().contains(permission)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Role of a principal inside the tenant organization (owner/admin/member).
///
/// Independent of [`Role`]: an organization owner may hold any platform role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantRole {
    Owner,
    Admin,
    Member,
}

impl TenantRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TenantRole::Owner => "OWNER",
            TenantRole::Admin => "ADMIN",
            TenantRole::Member => "MEMBER",
        }
    }

    pub fn is_tenant_admin(self) -> bool {
        matches!(self, TenantRole::Owner | TenantRole::Admin)
    }
}

impl core::fmt::Display for TenantRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
