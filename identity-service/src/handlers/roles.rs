//! Role CRUD and user role grants.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::wire::{RoleDoc, RolesDoc, Wire};
use crate::AppState;

use super::{AuthToken, ListQuery};

/// POST /v2.0/OS-KSADM/roles
pub async fn create(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    body: Bytes,
) -> Result<Response, Response> {
    let role = wire.parse_role(&body).map_err(|e| wire.fail(e))?;
    let role = state
        .identity
        .create_role(&admin_token, role)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::CREATED, &RoleDoc(role)))
}

/// GET /v2.0/OS-KSADM/roles. With `?name=`, looks a role up instead.
pub async fn list(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Query(query): Query<ListQuery>,
) -> Result<Response, Response> {
    if let Some(name) = &query.name {
        let role = state
            .identity
            .get_role_by_name(&admin_token, name)
            .await
            .map_err(|e| wire.fail(e))?;
        return Ok(wire.render(StatusCode::OK, &RoleDoc(role)));
    }

    let limit = query.limit(&state);
    let (roles, links) = state
        .identity
        .get_roles(&admin_token, query.marker.as_deref(), limit, wire.base_url())
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &RolesDoc(roles, links)))
}

/// GET /v2.0/OS-KSADM/roles/{role_id}
pub async fn get(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(role_id): Path<String>,
) -> Result<Response, Response> {
    let role = state
        .identity
        .get_role(&admin_token, &role_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &RoleDoc(role)))
}

/// DELETE /v2.0/OS-KSADM/roles/{role_id}
pub async fn delete(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(role_id): Path<String>,
) -> Result<Response, Response> {
    state
        .identity
        .delete_role(&admin_token, &role_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(Wire::no_content())
}

/// GET /v2.0/users/{user_id}/roles: the user's global grants.
pub async fn user_roles(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Response, Response> {
    let limit = query.limit(&state);
    let (roles, links) = state
        .identity
        .get_user_roles(
            &admin_token,
            &user_id,
            None,
            query.marker.as_deref(),
            limit,
            wire.base_url(),
        )
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &RolesDoc(roles, links)))
}

/// PUT /v2.0/users/{user_id}/roles/OS-KSADM/{role_id}: global grant.
pub async fn grant_global(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path((user_id, role_id)): Path<(String, String)>,
) -> Result<Response, Response> {
    state
        .identity
        .grant_role_to_user(&admin_token, &user_id, &role_id, None)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(StatusCode::CREATED.into_response())
}

/// DELETE /v2.0/users/{user_id}/roles/OS-KSADM/{role_id}
pub async fn revoke_global(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path((user_id, role_id)): Path<(String, String)>,
) -> Result<Response, Response> {
    state
        .identity
        .revoke_role_from_user(&admin_token, &user_id, &role_id, None)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(Wire::no_content())
}

/// PUT /v2.0/users/{user_id}/roles/OS-KSADM/{role_id}/tenant/{tenant_id}
pub async fn grant_on_tenant(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path((user_id, role_id, tenant_id)): Path<(String, String, String)>,
) -> Result<Response, Response> {
    state
        .identity
        .grant_role_to_user(&admin_token, &user_id, &role_id, Some(&tenant_id))
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(StatusCode::CREATED.into_response())
}

/// DELETE /v2.0/users/{user_id}/roles/OS-KSADM/{role_id}/tenant/{tenant_id}
pub async fn revoke_on_tenant(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path((user_id, role_id, tenant_id)): Path<(String, String, String)>,
) -> Result<Response, Response> {
    state
        .identity
        .revoke_role_from_user(&admin_token, &user_id, &role_id, Some(&tenant_id))
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(Wire::no_content())
}
