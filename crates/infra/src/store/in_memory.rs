use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

use tenantadmin_core::{TenantId, UserId};

use super::audit::AuditRecord;
use super::roles::{CustomRole, CustomRoleStore, NewCustomRole};
use super::r#trait::{
    PrincipalStore, PrincipalTx, PrincipalUpdate, StoreError, StoredPrincipal, TxDecision,
};

type PrincipalKey = (TenantId, UserId);

/// In-memory principal/audit/custom-role store.
///
/// Intended for tests/dev. Transactions stage writes on a copy of the
/// tenant's principals and publish them under the write lock on commit.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalStore {
    principals: RwLock<HashMap<PrincipalKey, StoredPrincipal>>,
    audit: RwLock<Vec<AuditRecord>>,
    custom_roles: RwLock<HashMap<TenantId, Vec<CustomRole>>>,
    failing_writes: RwLock<HashSet<UserId>>,
}

impl InMemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every transactional write for `user_id` fail with a persistence error.
    ///
    /// Test hook for exercising per-principal failure handling.
    pub fn fail_writes_for(&self, user_id: UserId) {
        if let Ok(mut set) = self.failing_writes.write() {
            set.insert(user_id);
        }
    }
}

struct StagedTx {
    tenant_id: TenantId,
    principals: HashMap<UserId, StoredPrincipal>,
    touched: HashSet<UserId>,
    audit: Vec<AuditRecord>,
    failing: HashSet<UserId>,
}

impl PrincipalTx for StagedTx {
    fn apply_change(
        &mut self,
        update: PrincipalUpdate,
        audit: AuditRecord,
    ) -> Result<StoredPrincipal, StoreError> {
        if audit.tenant_id != self.tenant_id || audit.user_id != update.user_id {
            return Err(StoreError::TenantIsolation(format!(
                "audit record for {}/{} staged with update of {}/{}",
                audit.tenant_id, audit.user_id, self.tenant_id, update.user_id
            )));
        }
        if self.failing.contains(&update.user_id) {
            return Err(StoreError::Persistence(format!(
                "write rejected for principal {}",
                update.user_id
            )));
        }

        let current = self
            .principals
            .get_mut(&update.user_id)
            .ok_or(StoreError::NotFound(update.user_id))?;

        if let Some(expected) = update.expected_version {
            if current.version != expected {
                return Err(StoreError::Conflict(format!(
                    "principal {} expected version {expected}, found {}",
                    update.user_id, current.version
                )));
            }
        }

        current.role = update.role;
        current.overrides = update.overrides;
        current.version += 1;
        current.updated_at = Utc::now();
        self.touched.insert(update.user_id);
        self.audit.push(audit);
        Ok(current.clone())
    }
}

impl PrincipalStore for InMemoryPrincipalStore {
    fn get(&self, tenant_id: TenantId, user_id: UserId) -> Result<Option<StoredPrincipal>, StoreError> {
        let map = self.principals.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.get(&(tenant_id, user_id)).cloned())
    }

    fn find_many(
        &self,
        tenant_id: TenantId,
        user_ids: &[UserId],
    ) -> Result<Vec<StoredPrincipal>, StoreError> {
        let map = self.principals.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(user_ids
            .iter()
            .filter_map(|id| map.get(&(tenant_id, *id)).cloned())
            .collect())
    }

    fn insert(&self, principal: StoredPrincipal) -> Result<(), StoreError> {
        let mut map = self.principals.write().map_err(|_| StoreError::LockPoisoned)?;
        let key = (principal.tenant_id, principal.user_id);
        if map.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "principal {} already exists",
                principal.user_id
            )));
        }
        map.insert(key, principal);
        Ok(())
    }

    fn audit_log(
        &self,
        tenant_id: TenantId,
        user_id: Option<UserId>,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        let audit = self.audit.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(audit
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .filter(|r| user_id.is_none_or(|id| r.user_id == id))
            .cloned()
            .collect())
    }

    fn transaction(
        &self,
        tenant_id: TenantId,
        work: &mut dyn FnMut(&mut dyn PrincipalTx) -> TxDecision,
    ) -> Result<TxDecision, StoreError> {
        // Both write locks are held for the whole transaction, serializing batches.
        let mut principals = self.principals.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut audit = self.audit.write().map_err(|_| StoreError::LockPoisoned)?;
        let failing = self
            .failing_writes
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .clone();

        let mut staged = StagedTx {
            tenant_id,
            principals: principals
                .iter()
                .filter(|((t, _), _)| *t == tenant_id)
                .map(|((_, id), p)| (*id, p.clone()))
                .collect(),
            touched: HashSet::new(),
            audit: Vec::new(),
            failing,
        };

        let decision = work(&mut staged);
        tracing::debug!(
            %tenant_id,
            touched = staged.touched.len(),
            audit_records = staged.audit.len(),
            ?decision,
            "principal transaction finished"
        );
        if decision == TxDecision::Commit {
            for id in staged.touched {
                if let Some(p) = staged.principals.remove(&id) {
                    principals.insert((tenant_id, id), p);
                }
            }
            audit.extend(staged.audit);
        }
        Ok(decision)
    }
}

impl CustomRoleStore for InMemoryPrincipalStore {
    fn list_custom_roles(&self, tenant_id: TenantId) -> Result<Vec<CustomRole>, StoreError> {
        let map = self.custom_roles.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut roles = map.get(&tenant_id).cloned().unwrap_or_default();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    fn find_custom_role(&self, tenant_id: TenantId, name: &str) -> Result<Option<CustomRole>, StoreError> {
        let map = self.custom_roles.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map
            .get(&tenant_id)
            .and_then(|roles| roles.iter().find(|r| r.name == name))
            .cloned())
    }

    fn insert_custom_role(&self, role: NewCustomRole) -> Result<CustomRole, StoreError> {
        let mut map = self.custom_roles.write().map_err(|_| StoreError::LockPoisoned)?;
        let roles = map.entry(role.tenant_id).or_default();
        if roles.iter().any(|r| r.name == role.name) {
            return Err(StoreError::Conflict(format!("role name '{}' already exists", role.name)));
        }

        let now = Utc::now();
        let stored = CustomRole {
            id: Uuid::now_v7(),
            tenant_id: role.tenant_id,
            name: role.name,
            description: role.description,
            permissions: role.permissions,
            created_by: role.created_by,
            created_at: now,
            updated_at: now,
        };
        roles.push(stored.clone());
        Ok(stored)
    }
}
