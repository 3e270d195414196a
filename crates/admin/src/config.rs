//! Service configuration, read from `TENANTADMIN_*` environment variables.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tenantadmin_auth::{EscalationPolicy, Role};

pub const ENV_MAX_BATCH_SIZE: &str = "TENANTADMIN_MAX_BATCH_SIZE";
pub const ENV_BATCH_MODE: &str = "TENANTADMIN_BATCH_MODE";
pub const ENV_EXEMPT_ROLES: &str = "TENANTADMIN_ESCALATION_EXEMPT_ROLES";

const DEFAULT_MAX_BATCH_SIZE: usize = 500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid value '{value}' for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// How a batch apply treats per-principal failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// Any failure rolls back the whole batch.
    #[default]
    Atomic,
    /// Successful principals are committed; failures are reported.
    Partial,
}

impl FromStr for BatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atomic" => Ok(BatchMode::Atomic),
            "partial" => Ok(BatchMode::Partial),
            _ => Err("expected 'atomic' or 'partial'".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    pub max_batch_size: usize,
    pub batch_mode: BatchMode,
    pub escalation: EscalationPolicy,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            batch_mode: BatchMode::Atomic,
            escalation: EscalationPolicy::default(),
        }
    }
}

impl AdminConfig {
    /// Load from the process environment; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MAX_BATCH_SIZE) {
            config.max_batch_size = match raw.trim().parse::<usize>() {
                Ok(0) => return Err(invalid(ENV_MAX_BATCH_SIZE, &raw, "must be at least 1")),
                Ok(n) => n,
                Err(e) => return Err(invalid(ENV_MAX_BATCH_SIZE, &raw, e.to_string())),
            };
        }

        if let Some(raw) = lookup(ENV_BATCH_MODE) {
            config.batch_mode = raw
                .parse()
                .map_err(|reason: String| invalid(ENV_BATCH_MODE, &raw, reason))?;
        }

        if let Some(raw) = lookup(ENV_EXEMPT_ROLES) {
            let roles = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<Role>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| invalid(ENV_EXEMPT_ROLES, &raw, e.to_string()))?;
            config.escalation = EscalationPolicy::exempting(roles);
        }

        tracing::debug!(
            max_batch_size = config.max_batch_size,
            batch_mode = ?config.batch_mode,
            exempt_roles = ?config.escalation.exempt_roles().collect::<Vec<_>>(),
            "admin config loaded"
        );

        Ok(config)
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AdminConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AdminConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config, AdminConfig::default());
        assert!(config.escalation.is_exempt(Role::SuperAdmin));
        assert!(!config.escalation.is_exempt(Role::Admin));
    }

    #[test]
    fn reads_every_key() {
        let config = load(&[
            (ENV_MAX_BATCH_SIZE, "25"),
            (ENV_BATCH_MODE, "Partial"),
            (ENV_EXEMPT_ROLES, "SUPER_ADMIN, ADMIN"),
        ])
        .unwrap();
        assert_eq!(config.max_batch_size, 25);
        assert_eq!(config.batch_mode, BatchMode::Partial);
        assert!(config.escalation.is_exempt(Role::Admin));
    }

    #[test]
    fn empty_exempt_list_means_strict() {
        let config = load(&[(ENV_EXEMPT_ROLES, "")]).unwrap();
        assert_eq!(config.escalation, EscalationPolicy::strict());
    }

    #[test]
    fn rejects_bad_values() {
        let err = load(&[(ENV_MAX_BATCH_SIZE, "0")]).unwrap_err();
        assert_eq!(err.key, ENV_MAX_BATCH_SIZE);

        assert!(load(&[(ENV_MAX_BATCH_SIZE, "lots")]).is_err());
        assert!(load(&[(ENV_BATCH_MODE, "eventual")]).is_err());

        let err = load(&[(ENV_EXEMPT_ROLES, "SUPER_ADMIN,ROOT")]).unwrap_err();
        assert!(err.to_string().contains("ROOT"));
    }
}
