//! Permission diff, validation and suggestion engine.
//!
//! Every function here is pure: no IO, no clock, no shared state. Callers
//! chain them (diff, then validate, then apply) and own any persistence.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{Permission, PermissionSet, RiskLevel, Role};

// ─────────────────────────────────────────────────────────────────────────────
// Diff
// ─────────────────────────────────────────────────────────────────────────────

/// Delta between two permission sets. `added` and `removed` are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionDiff {
    pub added: PermissionSet,
    pub removed: PermissionSet,
}

impl PermissionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Number of toggled permissions.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    /// Apply this delta to `before`.
    ///
    /// For `d = diff(a, b)`, `d.apply_to(a) == b`.
    pub fn apply_to(&self, before: &PermissionSet) -> PermissionSet {
        before.union(&self.added).difference(&self.removed)
    }

    pub fn impact(&self) -> ImpactSummary {
        ImpactSummary {
            added_by_risk: count_by_risk(&self.added),
            removed_by_risk: count_by_risk(&self.removed),
            highest_added_risk: self.added.iter().map(Permission::risk).max(),
        }
    }
}

/// Compute `after − before` (added) and `before − after` (removed).
pub fn diff(before: &PermissionSet, after: &PermissionSet) -> PermissionDiff {
    PermissionDiff {
        added: after.difference(before),
        removed: before.difference(after),
    }
}

/// Risk breakdown of a diff, for change previews.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactSummary {
    pub added_by_risk: BTreeMap<RiskLevel, usize>,
    pub removed_by_risk: BTreeMap<RiskLevel, usize>,
    pub highest_added_risk: Option<RiskLevel>,
}

fn count_by_risk(set: &PermissionSet) -> BTreeMap<RiskLevel, usize> {
    let mut counts = BTreeMap::new();
    for p in set {
        *counts.entry(p.risk()).or_insert(0) += 1;
    }
    counts
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    MissingDependency,
    Conflict,
    MissingRecommended,
}

/// One validation finding.
///
/// `permissions` are the offending grants; `related` are the permissions
/// the finding refers to (missing dependencies, absent companions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub message: String,
    pub permissions: Vec<Permission>,
    pub related: Vec<Permission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a candidate permission set.
///
/// - one error per permission with unmet dependencies (keyed to the
///   dependent permission, listing every missing dependency);
/// - one error per unordered conflicting pair;
/// - one warning per elevated permission lacking a recommended companion.
///
/// Findings never modify the set. Output follows catalog order.
pub fn validate(set: &PermissionSet) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for p in set {
        let missing = missing_dependencies(p, set);
        if !missing.is_empty() {
            errors.push(ValidationIssue {
                code: IssueCode::MissingDependency,
                message: format!(
                    "'{}' requires {}",
                    p.metadata().label,
                    join_ids(&missing)
                ),
                permissions: vec![p],
                related: missing,
            });
        }
    }

    let members = set.to_vec();
    for (idx, a) in members.iter().enumerate() {
        for b in &members[idx + 1..] {
            if a.conflicts_with(*b) {
                errors.push(ValidationIssue {
                    code: IssueCode::Conflict,
                    message: format!(
                        "'{}' cannot be held together with '{}'",
                        a.metadata().label,
                        b.metadata().label
                    ),
                    permissions: vec![*a, *b],
                    related: Vec::new(),
                });
            }
        }
    }

    for p in set {
        let meta = p.metadata();
        if !meta.risk.is_elevated() {
            continue;
        }
        let absent: Vec<Permission> = meta
            .recommended
            .iter()
            .copied()
            .filter(|r| !set.contains(*r))
            .collect();
        if !absent.is_empty() {
            warnings.push(ValidationIssue {
                code: IssueCode::MissingRecommended,
                message: format!(
                    "{} risk permission '{}' is usually granted with {}",
                    meta.risk,
                    meta.label,
                    join_ids(&absent)
                ),
                permissions: vec![p],
                related: absent,
            });
        }
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Dependencies of `permission` that `set` does not hold.
pub fn missing_dependencies(permission: Permission, set: &PermissionSet) -> Vec<Permission> {
    let mut missing: Vec<Permission> = permission
        .dependencies()
        .iter()
        .copied()
        .filter(|d| !set.contains(*d))
        .collect();
    missing.sort();
    missing
}

/// Whether `permission` can be added to `set` without breaking a dependency.
pub fn can_grant(permission: Permission, set: &PermissionSet) -> bool {
    missing_dependencies(permission, set).is_empty()
}

fn join_ids(perms: &[Permission]) -> String {
    perms
        .iter()
        .map(|p| format!("'{}'", p.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Suggestions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionSuggestion {
    pub action: SuggestionAction,
    pub permission: Permission,
    pub rationale: String,
}

/// Suggest changes aligning `current` with the baseline of `role`.
///
/// Adds (missing baseline permissions) come first, then removals of
/// permissions outside the baseline that conflict with it. Advisory only.
pub fn suggestions(role: Role, current: &PermissionSet) -> Vec<PermissionSuggestion> {
    let baseline = role.baseline();
    let mut out = Vec::new();

    for p in baseline.difference(current) {
        out.push(PermissionSuggestion {
            action: SuggestionAction::Add,
            permission: p,
            rationale: format!("{} is part of the {} role baseline", p.metadata().label, role.label()),
        });
    }

    for p in current.difference(&baseline) {
        if let Some(clash) = baseline.iter().find(|b| p.conflicts_with(*b)) {
            out.push(PermissionSuggestion {
                action: SuggestionAction::Remove,
                permission: p,
                rationale: format!(
                    "{} conflicts with {} from the {} role baseline",
                    p.metadata().label,
                    clash.metadata().label,
                    role.label()
                ),
            });
        }
    }

    out
}

/// Apply one suggestion to a set (same effect as toggling it manually).
pub fn apply_suggestion(set: &PermissionSet, suggestion: &PermissionSuggestion) -> PermissionSet {
    let mut next = set.clone();
    match suggestion.action {
        SuggestionAction::Add => next.insert(suggestion.permission),
        SuggestionAction::Remove => next.remove(suggestion.permission),
    };
    next
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog queries
// ─────────────────────────────────────────────────────────────────────────────

/// Case-insensitive search over id, label, description and category.
///
/// An empty (or blank) query returns the whole catalog.
pub fn search(query: &str) -> Vec<Permission> {
    let needle = query.trim().to_lowercase();
    Permission::ALL
        .into_iter()
        .filter(|p| {
            if needle.is_empty() {
                return true;
            }
            let meta = p.metadata();
            meta.id.contains(&needle)
                || meta.label.to_lowercase().contains(&needle)
                || meta.description.to_lowercase().contains(&needle)
                || meta.category.as_str().contains(&needle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use Permission::*;

    fn set<const N: usize>(perms: [Permission; N]) -> PermissionSet {
        perms.into()
    }

    #[test]
    fn diff_of_identical_sets_is_empty() {
        let a = Role::Admin.baseline();
        assert!(diff(&a, &a).is_empty());
        assert!(diff(&PermissionSet::new(), &PermissionSet::new()).is_empty());
    }

    #[test]
    fn diff_from_empty_adds_everything() {
        let b = set([UsersView, AuditView]);
        let d = diff(&PermissionSet::new(), &b);
        assert_eq!(d.added, b);
        assert!(d.removed.is_empty());
        assert_eq!(d.change_count(), 2);
    }

    #[test]
    fn granting_manage_users_on_top_of_view() {
        let current = set([UsersView]);
        let proposed = set([UsersView, UsersManage]);

        let d = diff(&current, &proposed);
        assert_eq!(d.added.to_vec(), vec![UsersManage]);
        assert!(d.removed.is_empty());

        let v = validate(&proposed);
        assert!(v.is_valid);
        assert!(v.errors.is_empty());
    }

    #[test]
    fn manage_users_without_view_is_one_error_on_the_dependent() {
        let v = validate(&set([UsersManage]));
        assert!(!v.is_valid);
        assert_eq!(v.errors.len(), 1);
        assert_eq!(v.errors[0].code, IssueCode::MissingDependency);
        assert_eq!(v.errors[0].permissions, vec![UsersManage]);
        assert_eq!(v.errors[0].related, vec![UsersView]);
    }

    #[test]
    fn several_missing_dependencies_still_yield_one_error() {
        let v = validate(&set([RolesManage]));
        assert_eq!(v.errors.len(), 1);
        assert_eq!(v.errors[0].related, vec![UsersManage, RolesView]);
    }

    #[test]
    fn conflicting_pair_is_reported_once() {
        let v = validate(&set([UsersView, UsersImpersonate, AuditView, AuditPurge]));
        let conflicts: Vec<_> = v
            .errors
            .iter()
            .filter(|e| e.code == IssueCode::Conflict)
            .collect();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].permissions, vec![UsersImpersonate, AuditPurge]);
        assert!(!v.is_valid);
    }

    #[test]
    fn missing_companion_only_warns() {
        let v = validate(&set([UsersView, UsersManage]));
        assert!(v.is_valid);
        assert_eq!(v.warnings.len(), 1);
        assert_eq!(v.warnings[0].code, IssueCode::MissingRecommended);
        assert_eq!(v.warnings[0].related, vec![AuditView]);

        let with_audit = validate(&set([UsersView, UsersManage, AuditView]));
        assert!(with_audit.warnings.is_empty());
    }

    #[test]
    fn every_role_baseline_is_valid_without_warnings() {
        for role in Role::ALL {
            let v = validate(&role.baseline());
            assert!(v.is_valid, "{role}: {:?}", v.errors);
            assert!(v.warnings.is_empty(), "{role}: {:?}", v.warnings);
        }
    }

    #[test]
    fn can_grant_checks_dependencies() {
        assert!(!can_grant(UsersManage, &PermissionSet::new()));
        assert!(can_grant(UsersManage, &set([UsersView])));
        assert!(can_grant(DashboardView, &PermissionSet::new()));
    }

    #[test]
    fn suggestions_fill_baseline_then_remove_conflicts() {
        let current = set([DashboardView, UsersView, AuditView, AuditPurge]);
        let out = suggestions(Role::SuperAdmin, &current);

        let removes: Vec<_> = out
            .iter()
            .filter(|s| s.action == SuggestionAction::Remove)
            .collect();
        assert_eq!(removes.len(), 1);
        assert_eq!(removes[0].permission, AuditPurge);
        assert_eq!(out.last().map(|s| s.action), Some(SuggestionAction::Remove));

        let adds = out.iter().filter(|s| s.action == SuggestionAction::Add).count();
        assert_eq!(adds, Role::SuperAdmin.baseline().difference(&current).len());
    }

    #[test]
    fn extra_non_conflicting_permissions_are_left_alone() {
        let mut current = Role::TeamMember.baseline();
        current.insert(AuditView);
        assert!(suggestions(Role::TeamMember, &current).is_empty());
    }

    #[test]
    fn applying_all_suggestions_reaches_a_superset_of_the_baseline() {
        let mut current = set([AuditView, AuditPurge]);
        for s in suggestions(Role::SuperAdmin, &current) {
            current = apply_suggestion(&current, &s);
        }
        assert!(Role::SuperAdmin.baseline().is_subset(&current));
        assert!(!current.contains(AuditPurge));
        assert!(validate(&current).is_valid);
    }

    #[test]
    fn impact_counts_by_risk() {
        let d = diff(&set([UsersView]), &set([UsersManage, UsersDelete, UsersView]));
        let impact = d.impact();
        assert_eq!(impact.added_by_risk.get(&RiskLevel::High), Some(&1));
        assert_eq!(impact.added_by_risk.get(&RiskLevel::Critical), Some(&1));
        assert_eq!(impact.highest_added_risk, Some(RiskLevel::Critical));
        assert!(impact.removed_by_risk.is_empty());
    }

    #[test]
    fn search_matches_case_insensitively() {
        assert_eq!(search("AUDIT"), vec![AuditView, AuditPurge]);
        assert_eq!(search("  ").len(), Permission::ALL.len());
        assert!(search("exchange rates").contains(&CurrenciesView));
        assert!(search("zzz").is_empty());
    }

    #[test]
    fn validation_result_serializes_camel_case() {
        let json = serde_json::to_value(validate(&set([UsersManage]))).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["errors"][0]["code"], "missing_dependency");
        assert_eq!(json["errors"][0]["permissions"][0], "users.manage");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_set() -> impl Strategy<Value = PermissionSet> {
            proptest::sample::subsequence(Permission::ALL.to_vec(), 0..=Permission::ALL.len())
                .prop_map(|v| v.into_iter().collect())
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 512,
                ..ProptestConfig::default()
            })]

            /// Property: added/removed are disjoint and the diff reconstructs `after`.
            #[test]
            fn diff_is_disjoint_and_reconstructs(a in arb_set(), b in arb_set()) {
                let d = diff(&a, &b);
                prop_assert!(d.added.is_disjoint(&d.removed));
                prop_assert_eq!(d.apply_to(&a), b);
            }

            #[test]
            fn diff_with_self_is_empty(a in arb_set()) {
                prop_assert!(diff(&a, &a).is_empty());
            }

            /// Property: validating twice gives identical findings.
            #[test]
            fn validation_is_idempotent(a in arb_set()) {
                prop_assert_eq!(validate(&a), validate(&a));
            }

            /// Property: warnings never affect validity.
            #[test]
            fn validity_tracks_errors_only(a in arb_set()) {
                let v = validate(&a);
                prop_assert_eq!(v.is_valid, v.errors.is_empty());
            }

            /// Property: each unmet-dependency error names the dependent, never the dependency.
            #[test]
            fn dependency_errors_name_the_dependent(a in arb_set()) {
                let v = validate(&a);
                for e in v.errors.iter().filter(|e| e.code == IssueCode::MissingDependency) {
                    prop_assert_eq!(e.permissions.len(), 1);
                    let p = e.permissions[0];
                    prop_assert!(a.contains(p));
                    for dep in &e.related {
                        prop_assert!(!a.contains(*dep));
                        prop_assert!(p.dependencies().contains(dep));
                    }
                }
                let flagged = v.errors.iter().filter(|e| e.code == IssueCode::MissingDependency).count();
                let expected = a.iter().filter(|p| !can_grant(*p, &a)).count();
                prop_assert_eq!(flagged, expected);
            }
        }
    }
}
