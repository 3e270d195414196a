//! `tenantadmin-core` — shared identifiers and the domain error model.
//!
//! This crate has no knowledge of permissions, storage or transport.

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{RequestId, TenantId, UserId};
