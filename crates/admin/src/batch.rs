//! Batch permission/role updates over many principals of one tenant.
//!
//! Flow: authorize, check targets, escalation guard, load, plan, validate,
//! then either preview (dry run) or apply inside one store transaction.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use tenantadmin_auth::{
    Permission, PermissionDiff, PermissionOverrides, PermissionSet, Role, diff, validate,
};
use tenantadmin_core::UserId;
use tenantadmin_infra::{
    AuditMetadata, AuditRecord, PrincipalStore, PrincipalUpdate, StoredPrincipal, TxDecision,
};

use crate::config::{AdminConfig, BatchMode};
use crate::context::{AccessRequirements, RequestContext};
use crate::errors::{AdminError, ValidationFailure};

// ─────────────────────────────────────────────────────────────────────────────
// Request / Response
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChange {
    /// Role the caller believes the targets hold. A mismatch only warns.
    #[serde(default)]
    pub from: Option<Role>,
    pub to: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionChanges {
    #[serde(default)]
    pub added: PermissionSet,
    #[serde(default)]
    pub removed: PermissionSet,
}

impl PermissionChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPermissionRequest {
    pub target_user_ids: Vec<UserId>,
    #[serde(default)]
    pub role_change: Option<RoleChange>,
    #[serde(default)]
    pub permission_changes: PermissionChanges,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl BatchPermissionRequest {
    /// Every permission this request hands out: explicit grants plus the
    /// baseline of the target role.
    pub fn granted_permissions(&self) -> PermissionSet {
        match self.role_change {
            Some(change) => self.permission_changes.added.union(&change.to.baseline()),
            None => self.permission_changes.added.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeCounts {
    /// Distinct permissions added across all targets.
    pub added: usize,
    /// Distinct permissions removed across all targets.
    pub removed: usize,
    pub affected_users: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    RoleMismatch,
    MissingRecommended,
}

/// Non-blocking finding about one principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchWarning {
    pub user_id: UserId,
    pub code: WarningCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalPreview {
    pub user_id: UserId,
    pub email: String,
    pub current_role: Role,
    pub new_role: Role,
    pub diff: PermissionDiff,
    pub permissions_after: PermissionSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalResult {
    pub user_id: UserId,
    pub success: bool,
    /// False when the principal already had the requested state.
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplySummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPermissionResponse {
    pub success: bool,
    pub preview: bool,
    pub changes: ChangeCounts,
    pub warnings: Vec<BatchWarning>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub previews: Vec<PrincipalPreview>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<PrincipalResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ApplySummary>,
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Planning
// ─────────────────────────────────────────────────────────────────────────────

/// Computed change for one principal.
#[derive(Debug, Clone)]
struct PrincipalPlan {
    current: StoredPrincipal,
    new_role: Role,
    after: PermissionSet,
    diff: PermissionDiff,
}

impl PrincipalPlan {
    fn build(current: StoredPrincipal, request: &BatchPermissionRequest) -> Self {
        let before = current.effective_permissions();
        let (new_role, start) = match request.role_change {
            Some(change) => (change.to, change.to.baseline()),
            None => (current.role, before.clone()),
        };
        let after = start
            .union(&request.permission_changes.added)
            .difference(&request.permission_changes.removed);
        let diff = diff(&before, &after);

        Self {
            current,
            new_role,
            after,
            diff,
        }
    }

    fn role_changed(&self) -> bool {
        self.new_role != self.current.role
    }

    fn is_noop(&self) -> bool {
        self.diff.is_empty() && !self.role_changed()
    }

    fn preview(&self) -> PrincipalPreview {
        PrincipalPreview {
            user_id: self.current.user_id,
            email: self.current.email.clone(),
            current_role: self.current.role,
            new_role: self.new_role,
            diff: self.diff.clone(),
            permissions_after: self.after.clone(),
        }
    }

    fn update(&self) -> PrincipalUpdate {
        PrincipalUpdate {
            user_id: self.current.user_id,
            role: self.new_role,
            overrides: PermissionOverrides::from_effective(self.new_role, &self.after),
            expected_version: Some(self.current.version),
        }
    }

    fn audit(&self, ctx: &RequestContext, request: &BatchPermissionRequest, batch_size: usize) -> AuditRecord {
        let role_change = request
            .role_change
            .map(|_| (self.current.role, self.new_role));
        AuditRecord {
            id: Uuid::now_v7(),
            tenant_id: ctx.tenant_id(),
            user_id: self.current.user_id,
            changed_by: ctx.actor().user_id,
            request_id: Some(ctx.request_id()),
            old_role: role_change.map(|(old, _)| old),
            new_role: role_change.map(|(_, new)| new),
            permissions_added: self.diff.added.clone(),
            permissions_removed: self.diff.removed.clone(),
            reason: request.reason.clone(),
            metadata: AuditMetadata::for_batch(batch_size).to_json(),
            recorded_at: Utc::now(),
        }
    }
}

fn change_counts(plans: &[PrincipalPlan]) -> ChangeCounts {
    let mut added = PermissionSet::new();
    let mut removed = PermissionSet::new();
    let mut affected_users = 0;
    for plan in plans {
        added.extend(plan.diff.added.iter());
        removed.extend(plan.diff.removed.iter());
        if !plan.is_noop() {
            affected_users += 1;
        }
    }
    ChangeCounts {
        added: added.len(),
        removed: removed.len(),
        affected_users,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

/// Applies [`BatchPermissionRequest`]s against a [`PrincipalStore`].
#[derive(Debug, Clone)]
pub struct BatchPermissionService<S> {
    store: S,
    config: AdminConfig,
    requirements: AccessRequirements,
}

impl<S: PrincipalStore> BatchPermissionService<S> {
    pub fn new(store: S, config: AdminConfig) -> Self {
        Self {
            store,
            config,
            requirements: AccessRequirements::any(),
        }
    }

    /// Additional access requirements checked before `roles.manage`.
    pub fn with_requirements(mut self, requirements: AccessRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run a batch update (or its dry run) in the caller's tenant.
    ///
    /// Request-level failures (authorization, bad input, escalation, unknown
    /// targets, validation) return an error and persist nothing. Write
    /// failures of single principals are reported in the response results.
    #[instrument(
        skip(self, ctx, request),
        fields(
            tenant_id = %ctx.tenant_id(),
            actor = %ctx.actor().user_id,
            request_id = %ctx.request_id(),
            targets = request.target_user_ids.len(),
            dry_run = request.dry_run
        ),
        err
    )]
    pub fn execute(
        &self,
        ctx: &RequestContext,
        request: &BatchPermissionRequest,
    ) -> Result<BatchPermissionResponse, AdminError> {
        ctx.require(&self.requirements)?;
        ctx.authorize(Permission::RolesManage)?;

        let targets = self.check_request(request)?;

        if let Err(e) = self
            .config
            .escalation
            .check_grant(ctx.actor(), &request.granted_permissions())
        {
            warn!(denied = %e.denied, granter_role = %e.granter_role, "escalation denied");
            return Err(e.into());
        }

        let plans = self.load_plans(ctx, &targets, request)?;

        let mut warnings = Vec::new();
        let mut failures = Vec::new();
        for plan in &plans {
            let user_id = plan.current.user_id;
            if let Some(from) = request.role_change.and_then(|c| c.from) {
                if from != plan.current.role {
                    warnings.push(BatchWarning {
                        user_id,
                        code: WarningCode::RoleMismatch,
                        message: format!(
                            "expected role {from} but principal has {}",
                            plan.current.role
                        ),
                        permissions: Vec::new(),
                    });
                }
            }

            let result = validate(&plan.after);
            failures.extend(
                result
                    .errors
                    .into_iter()
                    .map(|issue| ValidationFailure { user_id: Some(user_id), issue }),
            );
            warnings.extend(result.warnings.into_iter().map(|issue| BatchWarning {
                user_id,
                code: WarningCode::MissingRecommended,
                message: issue.message,
                permissions: issue.permissions,
            }));
        }

        if !failures.is_empty() {
            warn!(errors = failures.len(), "batch validation failed");
            return Err(AdminError::Validation(failures));
        }

        let changes = change_counts(&plans);

        if request.dry_run {
            info!(
                added = changes.added,
                removed = changes.removed,
                affected = changes.affected_users,
                "batch preview computed"
            );
            return Ok(BatchPermissionResponse {
                success: true,
                preview: true,
                changes,
                warnings,
                previews: plans.iter().map(PrincipalPlan::preview).collect(),
                results: Vec::new(),
                summary: None,
                message: format!("Preview of changes for {} user(s)", plans.len()),
            });
        }

        let outcome = self.apply(ctx, request, &plans)?;
        let summary = summarize(&outcome.results);
        let message = apply_message(&summary, &outcome);

        info!(
            successful = summary.successful,
            failed = summary.failed,
            unchanged = summary.unchanged,
            committed = outcome.committed,
            "batch applied"
        );

        Ok(BatchPermissionResponse {
            success: summary.failed == 0,
            preview: false,
            changes,
            warnings,
            previews: Vec::new(),
            results: outcome.results,
            summary: Some(summary),
            message,
        })
    }

    /// Deduplicated target ids, after request shape checks.
    fn check_request(&self, request: &BatchPermissionRequest) -> Result<Vec<UserId>, AdminError> {
        let mut seen = HashSet::new();
        let targets: Vec<UserId> = request
            .target_user_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        if targets.is_empty() {
            return Err(AdminError::bad_request("targetUserIds must not be empty"));
        }
        if targets.len() > self.config.max_batch_size {
            return Err(AdminError::bad_request(format!(
                "at most {} users can be updated at once, got {}",
                self.config.max_batch_size,
                targets.len()
            )));
        }
        if request.role_change.is_none() && request.permission_changes.is_empty() {
            return Err(AdminError::bad_request(
                "either roleChange or permissionChanges is required",
            ));
        }

        let both = request
            .permission_changes
            .added
            .intersection(&request.permission_changes.removed);
        if !both.is_empty() {
            return Err(AdminError::bad_request(format!(
                "permissions both added and removed: {both}"
            )));
        }

        Ok(targets)
    }

    fn load_plans(
        &self,
        ctx: &RequestContext,
        targets: &[UserId],
        request: &BatchPermissionRequest,
    ) -> Result<Vec<PrincipalPlan>, AdminError> {
        let mut found: BTreeMap<UserId, StoredPrincipal> = self
            .store
            .find_many(ctx.tenant_id(), targets)?
            .into_iter()
            .map(|p| (p.user_id, p))
            .collect();

        let missing: Vec<UserId> = targets
            .iter()
            .filter(|id| !found.contains_key(*id))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(AdminError::NotFound(missing));
        }

        Ok(targets
            .iter()
            .filter_map(|id| found.remove(id))
            .map(|current| PrincipalPlan::build(current, request))
            .collect())
    }

    /// Write every changing plan in one transaction.
    fn apply(
        &self,
        ctx: &RequestContext,
        request: &BatchPermissionRequest,
        plans: &[PrincipalPlan],
    ) -> Result<ApplyOutcome, AdminError> {
        let mode = self.config.batch_mode;
        let batch_size = plans.len();
        let mut results = Vec::with_capacity(batch_size);

        let decision = self.store.transaction(ctx.tenant_id(), &mut |tx| {
            results.clear();
            for plan in plans {
                let user_id = plan.current.user_id;
                if plan.is_noop() {
                    results.push(PrincipalResult {
                        user_id,
                        success: true,
                        changed: false,
                        error: None,
                    });
                    continue;
                }

                match tx.apply_change(plan.update(), plan.audit(ctx, request, batch_size)) {
                    Ok(_) => results.push(PrincipalResult {
                        user_id,
                        success: true,
                        changed: true,
                        error: None,
                    }),
                    Err(e) => {
                        warn!(user_id = %user_id, error = %e, "principal update failed");
                        results.push(PrincipalResult {
                            user_id,
                            success: false,
                            changed: false,
                            error: Some(e.to_string()),
                        });
                    }
                }
            }

            let any_failed = results.iter().any(|r| !r.success);
            if any_failed && mode == BatchMode::Atomic {
                TxDecision::Rollback
            } else {
                TxDecision::Commit
            }
        })?;

        let committed = decision == TxDecision::Commit;
        let write_failures = results.iter().filter(|r| !r.success).count();
        if !committed {
            for result in results.iter_mut().filter(|r| r.success && r.changed) {
                result.success = false;
                result.changed = false;
                result.error = Some("rolled back".to_string());
            }
        }

        Ok(ApplyOutcome {
            results,
            committed,
            write_failures,
        })
    }
}

struct ApplyOutcome {
    results: Vec<PrincipalResult>,
    committed: bool,
    /// Principals whose own write failed, excluding rolled-back ones.
    write_failures: usize,
}

fn summarize(results: &[PrincipalResult]) -> ApplySummary {
    let successful = results.iter().filter(|r| r.success).count();
    ApplySummary {
        total: results.len(),
        successful,
        failed: results.len() - successful,
        unchanged: results.iter().filter(|r| r.success && !r.changed).count(),
    }
}

fn apply_message(summary: &ApplySummary, outcome: &ApplyOutcome) -> String {
    if !outcome.committed {
        return format!(
            "Batch rolled back, {} user(s) failed and no changes were saved",
            outcome.write_failures
        );
    }
    if summary.failed == 0 {
        format!("Updated {} user(s) successfully", summary.successful)
    } else {
        format!(
            "Updated {} user(s) successfully, {} failed",
            summary.successful, summary.failed
        )
    }
}
