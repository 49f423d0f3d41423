//! Middleware configuration.
//!
//! All options are environment-backed so a service can drop the middleware in
//! front of its router without new config plumbing. `AUTH_*` points at the
//! identity service used to validate claims; `SERVICE_*` is only needed when
//! the middleware runs as a standalone proxy in front of a remote service.

use std::env;

use crate::error::MiddlewareError;

/// Where a standalone middleware forwards authenticated requests.
#[derive(Debug, Clone)]
pub struct RemoteService {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    /// Basic credential presented to the downstream service, if it expects one.
    pub service_pass: Option<String>,
}

impl RemoteService {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct AuthTokenConfig {
    /// Identity service host used for remote claim validation.
    pub auth_host: String,
    pub auth_port: u16,
    pub auth_protocol: String,
    /// Where clients are told to authenticate (`WWW-Authenticate` challenge).
    /// Defaults to the validation endpoint when unset.
    pub auth_uri: String,
    /// Admin bearer the middleware presents when validating claims.
    pub admin_token: String,
    /// Client TLS material for the validation connection.
    pub certfile: Option<String>,
    pub keyfile: Option<String>,
    /// Pass unauthenticated requests downstream with
    /// `X-Identity-Status: Invalid` instead of rejecting at the edge.
    pub delay_auth_decision: bool,
    /// Set when the middleware proxies to a remote service instead of
    /// wrapping an in-process router.
    pub service: Option<RemoteService>,
}

impl AuthTokenConfig {
    pub fn from_env() -> Result<Self, MiddlewareError> {
        let auth_host = get_env("AUTH_HOST", Some("localhost"))?;
        let auth_port: u16 = get_env("AUTH_PORT", Some("35357"))?
            .parse()
            .map_err(|_| MiddlewareError::Config("AUTH_PORT must be a port number".into()))?;
        let auth_protocol = get_env("AUTH_PROTOCOL", Some("https"))?;
        let auth_uri = match env::var("AUTH_URI") {
            Ok(uri) => uri,
            Err(_) => format!("{}://{}:{}", auth_protocol, auth_host, auth_port),
        };

        let service = match env::var("SERVICE_HOST") {
            Ok(host) => Some(RemoteService {
                protocol: get_env("SERVICE_PROTOCOL", Some("https"))?,
                host,
                port: get_env("SERVICE_PORT", Some("443"))?.parse().map_err(|_| {
                    MiddlewareError::Config("SERVICE_PORT must be a port number".into())
                })?,
                service_pass: env::var("SERVICE_PASS").ok(),
            }),
            Err(_) => None,
        };

        let config = Self {
            auth_host,
            auth_port,
            auth_protocol,
            auth_uri,
            admin_token: get_env("ADMIN_TOKEN", None)?,
            certfile: env::var("CERTFILE").ok(),
            keyfile: env::var("KEYFILE").ok(),
            delay_auth_decision: get_env("DELAY_AUTH_DECISION", Some("0"))? == "1",
            service,
        };
        Ok(config)
    }

    /// Base URL of the identity service's validation endpoint.
    pub fn auth_url(&self) -> String {
        format!(
            "{}://{}:{}",
            self.auth_protocol, self.auth_host, self.auth_port
        )
    }
}

fn get_env(key: &str, default: Option<&str>) -> Result<String, MiddlewareError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => match default {
            Some(def) => Ok(def.to_string()),
            None => Err(MiddlewareError::Config(format!(
                "{} is required but not set",
                key
            ))),
        },
    }
}
