use serde::Serialize;
use thiserror::Error;

use tenantadmin_auth::{AuthzError, EscalationError, ValidationIssue};
use tenantadmin_core::UserId;
use tenantadmin_infra::StoreError;

/// A blocking validation finding, tagged with the principal it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(flatten)]
    pub issue: ValidationIssue,
}

/// Failures of an admin operation as a whole.
///
/// Per-principal persistence failures during a batch apply are not errors
/// here; they are reported in the batch results.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdminError {
    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{} principal(s) not found", .0.len())]
    NotFound(Vec<UserId>),

    #[error(transparent)]
    Escalation(#[from] EscalationError),

    #[error("validation failed with {} error(s)", .0.len())]
    Validation(Vec<ValidationFailure>),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AdminError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// HTTP status a transport layer should map this error to.
    pub fn status_code(&self) -> u16 {
        match self {
            AdminError::Authz(_) | AdminError::Escalation(_) => 403,
            AdminError::BadRequest(_) | AdminError::Validation(_) => 400,
            AdminError::NotFound(_) => 404,
            AdminError::Conflict(_) => 409,
            AdminError::Store(_) => 500,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AdminError::Authz(_) => "forbidden",
            AdminError::BadRequest(_) => "bad_request",
            AdminError::NotFound(_) => "not_found",
            AdminError::Escalation(_) => "escalation",
            AdminError::Validation(_) => "validation_error",
            AdminError::Conflict(_) => "conflict",
            AdminError::Store(_) => "store_error",
        }
    }

    /// JSON error body (`{"error": code, "message": ..., "details": [...]}`).
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        match self {
            AdminError::Validation(failures) => {
                body["details"] = serde_json::to_value(failures).unwrap_or_default();
            }
            AdminError::NotFound(ids) => {
                body["details"] = serde_json::to_value(ids).unwrap_or_default();
            }
            AdminError::Escalation(e) => {
                body["details"] = serde_json::to_value(&e.denied).unwrap_or_default();
            }
            _ => {}
        }
        body
    }
}
