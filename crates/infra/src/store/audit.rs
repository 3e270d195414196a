use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tenantadmin_auth::{PermissionSet, Role};
use tenantadmin_core::{RequestId, TenantId, UserId};

/// One committed permission/role change of one principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub changed_by: UserId,
    pub request_id: Option<RequestId>,
    pub old_role: Option<Role>,
    pub new_role: Option<Role>,
    pub permissions_added: PermissionSet,
    pub permissions_removed: PermissionSet,
    pub reason: Option<String>,
    pub metadata: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

/// Batch context stored in [`AuditRecord::metadata`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMetadata {
    pub bulk_operation: bool,
    pub bulk_size: usize,
}

impl AuditMetadata {
    pub fn for_batch(size: usize) -> Self {
        Self {
            bulk_operation: size > 1,
            bulk_size: size,
        }
    }

    pub fn to_json(self) -> serde_json::Value {
        serde_json::json!({
            "bulkOperation": self.bulk_operation,
            "bulkSize": self.bulk_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_marks_bulk_only_above_one() {
        assert!(!AuditMetadata::for_batch(1).bulk_operation);
        let json = AuditMetadata::for_batch(3).to_json();
        assert_eq!(json["bulkOperation"], true);
        assert_eq!(json["bulkSize"], 3);
    }
}
