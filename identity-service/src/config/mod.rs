//! Service configuration, environment-backed.

use std::env;

use anyhow::anyhow;

use crate::services::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub bind_addr: String,
    pub port: u16,
    pub backend: BackendKind,
    pub database_url: Option<String>,
    /// Role name granting admin authority.
    pub admin_role: String,
    /// Role name granting service-admin authority.
    pub service_admin_role: String,
    pub token_ttl_seconds: i64,
    pub page_limit_default: usize,
    pub page_limit_max: usize,
    pub log_level: String,
    /// Bootstrap admin account, created on startup when set.
    pub bootstrap_admin_user: Option<String>,
    pub bootstrap_admin_password: Option<String>,
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self, ServiceError> {
        let backend = match get_env("BACKEND", Some("memory"))?.to_lowercase().as_str() {
            "memory" => BackendKind::Memory,
            "postgres" => BackendKind::Postgres,
            other => {
                return Err(config_error(format!(
                    "BACKEND must be 'memory' or 'postgres', got '{other}'"
                )))
            }
        };

        let config = Self {
            bind_addr: get_env("BIND_ADDR", Some("0.0.0.0"))?,
            port: parse(get_env("PORT", Some("35357"))?, "PORT")?,
            backend,
            database_url: env::var("DATABASE_URL").ok(),
            admin_role: get_env("ADMIN_ROLE", Some("Admin"))?,
            service_admin_role: get_env("SERVICE_ADMIN_ROLE", Some("KeystoneServiceAdmin"))?,
            token_ttl_seconds: parse(get_env("TOKEN_TTL_SECONDS", Some("86400"))?, "TOKEN_TTL_SECONDS")?,
            page_limit_default: parse(get_env("PAGE_LIMIT_DEFAULT", Some("10"))?, "PAGE_LIMIT_DEFAULT")?,
            page_limit_max: parse(get_env("PAGE_LIMIT_MAX", Some("100"))?, "PAGE_LIMIT_MAX")?,
            log_level: get_env("LOG_LEVEL", Some("info"))?,
            bootstrap_admin_user: env::var("BOOTSTRAP_ADMIN_USER").ok(),
            bootstrap_admin_password: env::var("BOOTSTRAP_ADMIN_PASSWORD").ok(),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ServiceError> {
        if self.token_ttl_seconds <= 0 {
            return Err(config_error("TOKEN_TTL_SECONDS must be positive"));
        }
        if self.page_limit_default == 0 || self.page_limit_max == 0 {
            return Err(config_error("page limits must be positive"));
        }
        if self.page_limit_default > self.page_limit_max {
            return Err(config_error(
                "PAGE_LIMIT_DEFAULT must not exceed PAGE_LIMIT_MAX",
            ));
        }
        if self.backend == BackendKind::Postgres && self.database_url.is_none() {
            return Err(config_error("DATABASE_URL is required with BACKEND=postgres"));
        }
        if self.admin_role.trim().is_empty() || self.service_admin_role.trim().is_empty() {
            return Err(config_error("ADMIN_ROLE and SERVICE_ADMIN_ROLE must be set"));
        }
        Ok(())
    }

    /// Configuration for tests and embedded use: in-memory backend,
    /// defaults everywhere.
    pub fn for_memory() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 35357,
            backend: BackendKind::Memory,
            database_url: None,
            admin_role: "Admin".to_string(),
            service_admin_role: "KeystoneServiceAdmin".to_string(),
            token_ttl_seconds: 86400,
            page_limit_default: 10,
            page_limit_max: 100,
            log_level: "info".to_string(),
            bootstrap_admin_user: None,
            bootstrap_admin_password: None,
        }
    }
}

fn config_error(msg: impl Into<String>) -> ServiceError {
    ServiceError::Internal(anyhow!("configuration error: {}", msg.into()))
}

fn get_env(key: &str, default: Option<&str>) -> Result<String, ServiceError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => match default {
            Some(def) => Ok(def.to_string()),
            None => Err(config_error(format!("{key} is required but not set"))),
        },
    }
}

fn parse<T: std::str::FromStr>(value: String, key: &str) -> Result<T, ServiceError> {
    value
        .parse()
        .map_err(|_| config_error(format!("{key} has an invalid value: '{value}'")))
}
