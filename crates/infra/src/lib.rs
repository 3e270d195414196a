//! Infrastructure layer: durable principal access state, audit trail and
//! custom roles behind store traits, with an in-memory implementation.

pub mod store;

pub use store::{
    AuditMetadata, AuditRecord, CustomRole, CustomRoleStore, InMemoryPrincipalStore,
    NewCustomRole, PrincipalStore, PrincipalTx, PrincipalUpdate, StoreError, StoredPrincipal,
    TxDecision,
};
