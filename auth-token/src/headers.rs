//! Identity header names and request decoration.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::validator::IdentityClaims;

pub const X_AUTH_TOKEN: &str = "x-auth-token";
pub const X_STORAGE_TOKEN: &str = "x-storage-token";

pub const X_IDENTITY_STATUS: &str = "x-identity-status";
pub const X_AUTHORIZATION: &str = "x-authorization";
pub const X_TENANT_ID: &str = "x-tenant-id";
pub const X_TENANT_NAME: &str = "x-tenant-name";
pub const X_USER_ID: &str = "x-user-id";
pub const X_USER_NAME: &str = "x-user-name";
pub const X_ROLES: &str = "x-roles";
pub const X_CAPABILITIES: &str = "x-capabilities";

// Deprecated aliases, still stamped for older consumers.
pub const X_TENANT: &str = "x-tenant";
pub const X_USER: &str = "x-user";
pub const X_ROLE: &str = "x-role";

/// Every header this middleware owns on the downstream request.
const IDENTITY_HEADERS: &[&str] = &[
    X_IDENTITY_STATUS,
    X_AUTHORIZATION,
    X_TENANT_ID,
    X_TENANT_NAME,
    X_USER_ID,
    X_USER_NAME,
    X_ROLES,
    X_CAPABILITIES,
    X_TENANT,
    X_USER,
    X_ROLE,
];

/// Remove inbound identity headers so clients cannot forge a confirmed
/// identity past the middleware.
pub fn scrub_identity_headers(headers: &mut HeaderMap) {
    for name in IDENTITY_HEADERS {
        headers.remove(*name);
    }
}

pub fn set(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

/// Stamp a confirmed identity onto the downstream request.
pub fn decorate(headers: &mut HeaderMap, claims: &IdentityClaims) {
    set(headers, X_IDENTITY_STATUS, "Confirmed");
    set(
        headers,
        X_AUTHORIZATION,
        &format!("Proxy {}", claims.user_name),
    );

    set(headers, X_USER_ID, &claims.user_id);
    set(headers, X_USER_NAME, &claims.user_name);
    set(headers, X_USER, &claims.user_id);

    if let Some(tenant_id) = &claims.tenant_id {
        set(headers, X_TENANT_ID, tenant_id);
        set(headers, X_TENANT, tenant_id);
    }
    if let Some(tenant_name) = &claims.tenant_name {
        set(headers, X_TENANT_NAME, tenant_name);
    }

    let roles = claims.roles.join(",");
    set(headers, X_ROLES, &roles);
    set(headers, X_ROLE, &roles);

    if !claims.capabilities.is_empty() {
        set(headers, X_CAPABILITIES, &claims.capabilities.join(","));
    }
}
