//! Permission catalog.
//!
//! Permissions form a closed set. Each variant has a stable string id
//! (`"users.manage"`) used on the wire and in audit records, and a row in
//! [`CATALOG`] describing its label, risk tier and rules.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Permission identifier.
///
/// Declaration order is catalog order; sets and reports sort by it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum Permission {
    DashboardView,
    AnalyticsView,
    AnalyticsExport,
    UsersView,
    UsersManage,
    UsersDelete,
    UsersImpersonate,
    RolesView,
    RolesManage,
    BookingsView,
    BookingsManage,
    ContentView,
    ContentManage,
    NewsletterManage,
    ServicesView,
    ServicesManage,
    CurrenciesView,
    CurrenciesManage,
    PriceOverridesManage,
    TranslationsView,
    TranslationsManage,
    SettingsView,
    SettingsManage,
    AuditView,
    AuditPurge,
    SystemMaintenance,
}

impl Permission {
    /// Every permission, in catalog order.
    pub const ALL: [Permission; 26] = [
        Permission::DashboardView,
        Permission::AnalyticsView,
        Permission::AnalyticsExport,
        Permission::UsersView,
        Permission::UsersManage,
        Permission::UsersDelete,
        Permission::UsersImpersonate,
        Permission::RolesView,
        Permission::RolesManage,
        Permission::BookingsView,
        Permission::BookingsManage,
        Permission::ContentView,
        Permission::ContentManage,
        Permission::NewsletterManage,
        Permission::ServicesView,
        Permission::ServicesManage,
        Permission::CurrenciesView,
        Permission::CurrenciesManage,
        Permission::PriceOverridesManage,
        Permission::TranslationsView,
        Permission::TranslationsManage,
        Permission::SettingsView,
        Permission::SettingsManage,
        Permission::AuditView,
        Permission::AuditPurge,
        Permission::SystemMaintenance,
    ];

    pub fn as_str(self) -> &'static str {
        self.metadata().id
    }

    pub fn metadata(self) -> &'static PermissionMetadata {
        &CATALOG[self as usize]
    }

    pub fn risk(self) -> RiskLevel {
        self.metadata().risk
    }

    pub fn category(self) -> PermissionCategory {
        self.metadata().category
    }

    pub fn dependencies(self) -> &'static [Permission] {
        self.metadata().dependencies
    }

    /// Whether `self` and `other` may not be held together.
    ///
    /// Symmetric: a conflict declared on either side counts.
    pub fn conflicts_with(self, other: Permission) -> bool {
        self.metadata().conflicts.contains(&other) || other.metadata().conflicts.contains(&self)
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown permission '{0}'")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

impl TryFrom<String> for Permission {
    type Error = UnknownPermission;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for &'static str {
    fn from(value: Permission) -> Self {
        value.as_str()
    }
}

/// Risk tier of a permission.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// High and critical permissions get extra scrutiny (companion warnings).
    pub fn is_elevated(self) -> bool {
        self >= RiskLevel::High
    }
}

impl core::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Functional area a permission belongs to (used for grouping and search).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    Dashboard,
    Analytics,
    Users,
    Roles,
    Bookings,
    Content,
    Services,
    Billing,
    Localization,
    Settings,
    Audit,
    System,
}

impl PermissionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionCategory::Dashboard => "dashboard",
            PermissionCategory::Analytics => "analytics",
            PermissionCategory::Users => "users",
            PermissionCategory::Roles => "roles",
            PermissionCategory::Bookings => "bookings",
            PermissionCategory::Content => "content",
            PermissionCategory::Services => "services",
            PermissionCategory::Billing => "billing",
            PermissionCategory::Localization => "localization",
            PermissionCategory::Settings => "settings",
            PermissionCategory::Audit => "audit",
            PermissionCategory::System => "system",
        }
    }
}

/// Static description of one permission.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionMetadata {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub category: PermissionCategory,
    pub risk: RiskLevel,
    /// Permissions that must also be held for this one to be valid.
    pub dependencies: &'static [Permission],
    /// Permissions that may not be held together with this one.
    pub conflicts: &'static [Permission],
    /// Lower-risk companions commonly granted alongside this one.
    pub recommended: &'static [Permission],
}

macro_rules! entry {
    (
        $id:literal, $label:literal, $desc:literal, $cat:ident, $risk:ident,
        deps: [$($dep:ident),*], conflicts: [$($conf:ident),*], recommended: [$($rec:ident),*]
    ) => {
        PermissionMetadata {
            id: $id,
            label: $label,
            description: $desc,
            category: PermissionCategory::$cat,
            risk: RiskLevel::$risk,
            dependencies: &[$(Permission::$dep),*],
            conflicts: &[$(Permission::$conf),*],
            recommended: &[$(Permission::$rec),*],
        }
    };
}

/// The permission table, indexed by `Permission as usize`.
pub static CATALOG: [PermissionMetadata; 26] = [
    entry!("dashboard.view", "View dashboard", "Open the admin dashboard and its KPI widgets",
        Dashboard, Low, deps: [], conflicts: [], recommended: []),
    entry!("analytics.view", "View analytics", "Read traffic, booking and revenue analytics",
        Analytics, Low, deps: [DashboardView], conflicts: [], recommended: []),
    entry!("analytics.export", "Export analytics", "Download analytics reports as files",
        Analytics, Medium, deps: [AnalyticsView], conflicts: [], recommended: []),
    entry!("users.view", "View users", "List users of the organization and their profiles",
        Users, Low, deps: [], conflicts: [], recommended: []),
    entry!("users.manage", "Manage users", "Invite, edit and suspend users",
        Users, High, deps: [UsersView], conflicts: [], recommended: [AuditView]),
    entry!("users.delete", "Delete users", "Permanently delete user accounts",
        Users, Critical, deps: [UsersManage], conflicts: [], recommended: [AuditView]),
    entry!("users.impersonate", "Impersonate users", "Act on behalf of another user",
        Users, Critical, deps: [UsersView], conflicts: [], recommended: [AuditView]),
    entry!("roles.view", "View roles", "Read roles and their permission bundles",
        Roles, Low, deps: [UsersView], conflicts: [], recommended: []),
    entry!("roles.manage", "Manage roles", "Assign roles, edit permissions and create custom roles",
        Roles, Critical, deps: [RolesView, UsersManage], conflicts: [], recommended: [AuditView]),
    entry!("bookings.view", "View bookings", "Read bookings and appointments",
        Bookings, Low, deps: [], conflicts: [], recommended: []),
    entry!("bookings.manage", "Manage bookings", "Create, reschedule and cancel bookings",
        Bookings, Medium, deps: [BookingsView], conflicts: [], recommended: []),
    entry!("content.view", "View content", "Read posts and pages",
        Content, Low, deps: [], conflicts: [], recommended: []),
    entry!("content.manage", "Manage content", "Create, edit and publish posts and pages",
        Content, Medium, deps: [ContentView], conflicts: [], recommended: []),
    entry!("newsletter.manage", "Manage newsletter", "Compose and send newsletters to subscribers",
        Content, Medium, deps: [ContentView, UsersView], conflicts: [], recommended: []),
    entry!("services.view", "View services", "Read the service catalog",
        Services, Low, deps: [], conflicts: [], recommended: []),
    entry!("services.manage", "Manage services", "Create and edit services and their pricing",
        Services, Medium, deps: [ServicesView], conflicts: [], recommended: []),
    entry!("currencies.view", "View currencies", "Read currencies and exchange rates",
        Billing, Low, deps: [], conflicts: [], recommended: []),
    entry!("currencies.manage", "Manage currencies", "Enable currencies and edit exchange rates",
        Billing, High, deps: [CurrenciesView], conflicts: [], recommended: [AnalyticsView]),
    entry!("price_overrides.manage", "Manage price overrides", "Override computed prices per currency",
        Billing, High, deps: [CurrenciesManage], conflicts: [], recommended: [AuditView]),
    entry!("translations.view", "View translations", "Read languages and translation status",
        Localization, Low, deps: [], conflicts: [], recommended: []),
    entry!("translations.manage", "Manage translations", "Edit translations and language settings",
        Localization, Medium, deps: [TranslationsView], conflicts: [], recommended: []),
    entry!("settings.view", "View settings", "Read organization settings",
        Settings, Low, deps: [DashboardView], conflicts: [], recommended: []),
    entry!("settings.manage", "Manage settings", "Change organization settings and integrations",
        Settings, High, deps: [SettingsView], conflicts: [], recommended: [AuditView]),
    entry!("audit.view", "View audit log", "Read the permission and activity audit trail",
        Audit, Medium, deps: [], conflicts: [], recommended: []),
    entry!("audit.purge", "Purge audit log", "Delete audit trail entries",
        Audit, Critical, deps: [AuditView], conflicts: [UsersImpersonate], recommended: []),
    entry!("system.maintenance", "System maintenance", "Run maintenance tasks and toggle maintenance mode",
        System, Critical, deps: [SettingsManage], conflicts: [], recommended: [AuditView]),
];
