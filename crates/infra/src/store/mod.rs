//! Principal, audit and custom-role storage.

pub mod audit;
pub mod in_memory;
pub mod roles;
pub mod r#trait;

pub use audit::{AuditMetadata, AuditRecord};
pub use in_memory::InMemoryPrincipalStore;
pub use roles::{CustomRole, CustomRoleStore, NewCustomRole};
pub use r#trait::{
    PrincipalStore, PrincipalTx, PrincipalUpdate, StoreError, StoredPrincipal, TxDecision,
};
