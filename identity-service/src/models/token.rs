//! Tokens and the composite values authentication and validation return.

use chrono::{DateTime, Utc};

use super::{new_id, Role, Tenant, User};

/// A bearer token. A null `tenant_id` means unscoped; expiry is lazy, an
/// expired token stays in storage until revoked or replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub id: String,
    pub user_id: String,
    pub tenant_id: Option<String>,
    pub expires: DateTime<Utc>,
}

impl Token {
    pub fn new(user_id: impl Into<String>, tenant_id: Option<String>, ttl: chrono::Duration) -> Self {
        Self {
            id: new_id(),
            user_id: user_id.into(),
            tenant_id,
            expires: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}

/// A role together with the tenant the grant applies to (`None` = global).
#[derive(Debug, Clone, PartialEq)]
pub struct GrantedRole {
    pub role: Role,
    pub tenant_id: Option<String>,
}

/// Everything an authentication response carries.
#[derive(Debug, Clone)]
pub struct AuthData {
    pub token: Token,
    pub user: User,
    pub tenant: Option<Tenant>,
    pub roles: Vec<GrantedRole>,
    pub catalog: Vec<super::CatalogEndpoint>,
    /// Privileged callers additionally see each endpoint's admin URL.
    pub include_admin_url: bool,
}

/// Everything a token-validation response carries.
#[derive(Debug, Clone)]
pub struct ValidateData {
    pub token: Token,
    pub tenant: Option<Tenant>,
    pub user: User,
    /// Name of the user's default tenant, when one is set.
    pub user_tenant_name: Option<String>,
    pub roles: Vec<GrantedRole>,
}
