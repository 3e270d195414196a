//! `tenantadmin-auth` — permission catalog, roles and the permission engine.
//!
//! Pure authorization boundary: no HTTP, no storage, no clock.

pub mod authorize;
pub mod engine;
pub mod escalation;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod set;

pub use authorize::{
    AuthorizationExplanation, AuthzError, DenialKind, RbacRegistry, authorize,
    explain_authorization,
};
pub use engine::{
    ImpactSummary, IssueCode, PermissionDiff, PermissionSuggestion, SuggestionAction,
    ValidationIssue, ValidationResult, apply_suggestion, can_grant, diff, missing_dependencies,
    search, suggestions, validate,
};
pub use escalation::{EscalationError, EscalationPolicy};
pub use permissions::{
    CATALOG, Permission, PermissionCategory, PermissionMetadata, RiskLevel, UnknownPermission,
};
pub use principal::{PermissionOverrides, Principal, TenantMembership};
pub use roles::{Role, TenantRole, UnknownRole};
pub use set::PermissionSet;
