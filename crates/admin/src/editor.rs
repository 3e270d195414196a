//! Interactive permission editing state, as behind a permission modal.
//!
//! The editor holds a working selection for one principal and can preview
//! the pending change at any time. Nothing here touches a store; the
//! finished selection turns into a [`BatchPermissionRequest`].

use serde::Serialize;
use thiserror::Error;

use tenantadmin_auth::{
    ImpactSummary, Permission, PermissionDiff, PermissionSet, PermissionSuggestion, Role,
    SuggestionAction, ValidationResult, can_grant, diff, missing_dependencies, suggestions,
    validate,
};
use tenantadmin_core::UserId;

use crate::batch::{BatchPermissionRequest, PermissionChanges, RoleChange};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToggleError {
    #[error("'{permission}' requires {}", join(.missing))]
    UnmetDependencies {
        permission: Permission,
        missing: Vec<Permission>,
    },
}

fn join(perms: &[Permission]) -> String {
    perms.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
}

/// Everything a reviewer needs before saving a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorPreview {
    pub role: Role,
    pub diff: PermissionDiff,
    pub validation: ValidationResult,
    pub suggestions: Vec<PermissionSuggestion>,
    pub impact: ImpactSummary,
}

impl EditorPreview {
    pub fn evaluate(role: Role, before: &PermissionSet, after: &PermissionSet) -> Self {
        let diff = diff(before, after);
        Self {
            role,
            impact: diff.impact(),
            diff,
            validation: validate(after),
            suggestions: suggestions(role, after),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionEditor {
    original_role: Role,
    original: PermissionSet,
    role: Role,
    selection: PermissionSet,
}

impl PermissionEditor {
    /// Start editing a principal that holds `permissions` under `role`.
    pub fn new(role: Role, permissions: PermissionSet) -> Self {
        Self {
            original_role: role,
            original: permissions.clone(),
            role,
            selection: permissions,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn selection(&self) -> &PermissionSet {
        &self.selection
    }

    /// Switch role; the selection becomes that role's baseline.
    pub fn select_role(&mut self, role: Role) {
        self.role = role;
        self.selection = role.baseline();
    }

    /// Flip one permission.
    ///
    /// Removing always succeeds. Adding requires every dependency to be
    /// selected already. Returns whether the permission is now selected.
    pub fn toggle(&mut self, permission: Permission) -> Result<bool, ToggleError> {
        if self.selection.contains(permission) {
            self.selection.remove(permission);
            return Ok(false);
        }
        if !can_grant(permission, &self.selection) {
            return Err(ToggleError::UnmetDependencies {
                permission,
                missing: missing_dependencies(permission, &self.selection),
            });
        }
        self.selection.insert(permission);
        Ok(true)
    }

    /// Apply one suggestion under the same dependency rule as [`toggle`].
    ///
    /// Removals always succeed; an add already selected is a no-op.
    /// Returns whether the permission is now selected.
    ///
    /// [`toggle`]: PermissionEditor::toggle
    pub fn apply_suggestion(&mut self, suggestion: &PermissionSuggestion) -> Result<bool, ToggleError> {
        let permission = suggestion.permission;
        match suggestion.action {
            SuggestionAction::Remove => {
                self.selection.remove(permission);
                Ok(false)
            }
            SuggestionAction::Add if self.selection.contains(permission) => Ok(true),
            SuggestionAction::Add => self.toggle(permission),
        }
    }

    /// Apply every current suggestion for the selected role, in catalog order.
    ///
    /// Baseline dependencies precede their dependents, so each add finds its
    /// dependencies already selected.
    pub fn apply_all_suggestions(&mut self) -> Result<(), ToggleError> {
        for suggestion in suggestions(self.role, &self.selection) {
            self.apply_suggestion(&suggestion)?;
        }
        Ok(())
    }

    /// Drop all edits.
    pub fn reset(&mut self) {
        self.role = self.original_role;
        self.selection = self.original.clone();
    }

    pub fn is_dirty(&self) -> bool {
        self.role != self.original_role || self.selection != self.original
    }

    pub fn preview(&self) -> EditorPreview {
        EditorPreview::evaluate(self.role, &self.original, &self.selection)
    }

    /// Turn the pending edits into a batch request for `targets`.
    ///
    /// With a role switch the explicit changes are relative to the new
    /// role's baseline, otherwise to the original selection.
    pub fn change_set(&self, targets: Vec<UserId>, reason: Option<String>) -> BatchPermissionRequest {
        let (role_change, start) = if self.role != self.original_role {
            (
                Some(RoleChange {
                    from: Some(self.original_role),
                    to: self.role,
                }),
                self.role.baseline(),
            )
        } else {
            (None, self.original.clone())
        };
        let delta = diff(&start, &self.selection);

        BatchPermissionRequest {
            target_user_ids: targets,
            role_change,
            permission_changes: PermissionChanges {
                added: delta.added,
                removed: delta.removed,
            },
            dry_run: false,
            reason,
        }
    }
}
