use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// A set of permissions.
///
/// Uniqueness is enforced and iteration follows catalog order, so two sets
/// with the same members always render and serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a permission; returns `false` if it was already present.
    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    pub fn remove(&mut self, permission: Permission) -> bool {
        self.0.remove(&permission)
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    pub fn union(&self, other: &PermissionSet) -> PermissionSet {
        self.0.union(&other.0).copied().collect()
    }

    /// Members of `self` that are not in `other`.
    pub fn difference(&self, other: &PermissionSet) -> PermissionSet {
        self.0.difference(&other.0).copied().collect()
    }

    pub fn intersection(&self, other: &PermissionSet) -> PermissionSet {
        self.0.intersection(&other.0).copied().collect()
    }

    pub fn is_subset(&self, other: &PermissionSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_disjoint(&self, other: &PermissionSet) -> bool {
        self.0.is_disjoint(&other.0)
    }

    pub fn to_vec(&self) -> Vec<Permission> {
        self.iter().collect()
    }

    /// String ids in catalog order (audit/display form).
    pub fn ids(&self) -> Vec<&'static str> {
        self.iter().map(Permission::as_str).collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Permission> for PermissionSet {
    fn extend<I: IntoIterator<Item = Permission>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = Permission;
    type IntoIter = core::iter::Copied<std::collections::btree_set::Iter<'a, Permission>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().copied()
    }
}

impl IntoIterator for PermissionSet {
    type Item = Permission;
    type IntoIter = std::collections::btree_set::IntoIter<Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<&[Permission]> for PermissionSet {
    fn from(value: &[Permission]) -> Self {
        value.iter().copied().collect()
    }
}

impl<const N: usize> From<[Permission; N]> for PermissionSet {
    fn from(value: [Permission; N]) -> Self {
        value.into_iter().collect()
    }
}

impl core::fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("{")?;
        for (idx, p) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            f.write_str(p.as_str())?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_collapse_and_order_is_catalog_order() {
        let set: PermissionSet = [
            Permission::UsersManage,
            Permission::DashboardView,
            Permission::UsersManage,
        ]
        .into();
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_vec(), vec![Permission::DashboardView, Permission::UsersManage]);
    }

    #[test]
    fn serializes_as_sorted_id_array() {
        let set: PermissionSet = [Permission::UsersView, Permission::DashboardView].into();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["dashboard.view","users.view"]"#);

        let back: PermissionSet = serde_json::from_str(r#"["users.view","users.view"]"#).unwrap();
        assert_eq!(back.len(), 1);
    }

    #[test]
    fn display_lists_ids() {
        let set: PermissionSet = [Permission::AuditView, Permission::UsersView].into();
        assert_eq!(set.to_string(), "{users.view, audit.view}");
        assert_eq!(PermissionSet::new().to_string(), "{}");
    }
}
