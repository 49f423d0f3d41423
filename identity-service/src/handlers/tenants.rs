//! Tenant CRUD and tenant-scoped listings.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;

use crate::wire::{TenantDoc, TenantsDoc, UsersDoc, Wire};
use crate::AppState;

use super::{AuthToken, ListQuery};

/// POST /v2.0/tenants
pub async fn create(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    body: Bytes,
) -> Result<Response, Response> {
    let tenant = wire.parse_tenant(&body).map_err(|e| wire.fail(e))?;
    let tenant = state
        .identity
        .create_tenant(&admin_token, tenant)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::CREATED, &TenantDoc(tenant)))
}

/// GET /v2.0/tenants: all tenants for admins, the caller's tenants
/// otherwise; `?name=` looks a tenant up instead.
pub async fn list(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(token): AuthToken,
    Query(query): Query<ListQuery>,
) -> Result<Response, Response> {
    if let Some(name) = &query.name {
        let tenant = state
            .identity
            .get_tenant_by_name(&token, name)
            .await
            .map_err(|e| wire.fail(e))?;
        return Ok(wire.render(StatusCode::OK, &TenantDoc(tenant)));
    }

    let limit = query.limit(&state);
    let (tenants, links) = state
        .identity
        .get_tenants(&token, query.marker.as_deref(), limit, wire.base_url())
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &TenantsDoc(tenants, links)))
}

/// GET /v2.0/tenants/{tenant_id}
pub async fn get(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(tenant_id): Path<String>,
) -> Result<Response, Response> {
    let tenant = state
        .identity
        .get_tenant(&admin_token, &tenant_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &TenantDoc(tenant)))
}

/// PUT /v2.0/tenants/{tenant_id}
pub async fn update(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(tenant_id): Path<String>,
    body: Bytes,
) -> Result<Response, Response> {
    let patch = wire.parse_tenant(&body).map_err(|e| wire.fail(e))?;
    let tenant = state
        .identity
        .update_tenant(&admin_token, &tenant_id, patch)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &TenantDoc(tenant)))
}

/// DELETE /v2.0/tenants/{tenant_id}
pub async fn delete(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(tenant_id): Path<String>,
) -> Result<Response, Response> {
    state
        .identity
        .delete_tenant(&admin_token, &tenant_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(Wire::no_content())
}

#[derive(Debug, Deserialize)]
pub struct TenantUsersQuery {
    pub marker: Option<String>,
    pub limit: Option<usize>,
    #[serde(rename = "roleId")]
    pub role_id: Option<String>,
}

/// GET /v2.0/tenants/{tenant_id}/users
pub async fn users(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(tenant_id): Path<String>,
    Query(query): Query<TenantUsersQuery>,
) -> Result<Response, Response> {
    let limit = query
        .limit
        .unwrap_or(state.config.page_limit_default)
        .clamp(1, state.config.page_limit_max);
    let (users, links) = state
        .identity
        .get_tenant_users(
            &admin_token,
            &tenant_id,
            query.role_id.as_deref(),
            query.marker.as_deref(),
            limit,
            wire.base_url(),
        )
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &UsersDoc(users, links)))
}
