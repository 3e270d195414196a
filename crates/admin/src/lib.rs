//! `tenantadmin-admin` — admin-side services over the permission engine.
//!
//! Every operation takes an explicit [`RequestContext`]; nothing is read
//! from ambient per-request state.

pub mod batch;
pub mod config;
pub mod context;
pub mod editor;
pub mod errors;
pub mod roles;

pub use batch::{
    BatchPermissionRequest, BatchPermissionResponse, BatchPermissionService, PermissionChanges,
    RoleChange,
};
pub use config::{AdminConfig, BatchMode, ConfigError};
pub use context::{AccessRequirements, RequestContext};
pub use editor::{EditorPreview, PermissionEditor, ToggleError};
pub use errors::{AdminError, ValidationFailure};
pub use roles::{CreateCustomRoleRequest, CustomRoleService};

