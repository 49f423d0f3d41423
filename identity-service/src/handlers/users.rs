//! User CRUD and the password/enabled/tenant sub-operations.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;

use crate::services::ServiceError;
use crate::wire::{UserDoc, UsersDoc, Wire};
use crate::AppState;

use super::{AuthToken, ListQuery};

/// POST /v2.0/users
pub async fn create(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    body: Bytes,
) -> Result<Response, Response> {
    let user = wire.parse_user(&body).map_err(|e| wire.fail(e))?;
    let user = state
        .identity
        .create_user(&admin_token, user)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::CREATED, &UserDoc(user)))
}

/// GET /v2.0/users. With `?name=`, looks a user up instead of listing.
pub async fn list(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Query(query): Query<ListQuery>,
) -> Result<Response, Response> {
    if let Some(name) = &query.name {
        let user = state
            .identity
            .get_user_by_name(&admin_token, name)
            .await
            .map_err(|e| wire.fail(e))?;
        return Ok(wire.render(StatusCode::OK, &UserDoc(user)));
    }

    let limit = query.limit(&state);
    let (users, links) = state
        .identity
        .get_users(&admin_token, query.marker.as_deref(), limit, wire.base_url())
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &UsersDoc(users, links)))
}

/// GET /v2.0/users/{user_id}
pub async fn get(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(user_id): Path<String>,
) -> Result<Response, Response> {
    let user = state
        .identity
        .get_user(&admin_token, &user_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &UserDoc(user)))
}

/// PUT /v2.0/users/{user_id}
pub async fn update(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Result<Response, Response> {
    let patch = wire.parse_user(&body).map_err(|e| wire.fail(e))?;
    let user = state
        .identity
        .update_user(&admin_token, &user_id, patch)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &UserDoc(user)))
}

/// DELETE /v2.0/users/{user_id}
pub async fn delete(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(user_id): Path<String>,
) -> Result<Response, Response> {
    state
        .identity
        .delete_user(&admin_token, &user_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(Wire::no_content())
}

/// PUT /v2.0/users/{user_id}/password
pub async fn set_password(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Result<Response, Response> {
    let patch = wire.parse_user(&body).map_err(|e| wire.fail(e))?;
    let password = patch.password.ok_or_else(|| {
        wire.fail(ServiceError::BadRequest("Expecting a password".to_string()))
    })?;
    state
        .identity
        .set_user_password(&admin_token, &user_id, &password)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(Wire::no_content())
}

/// PUT /v2.0/users/{user_id}/enabled
pub async fn set_enabled(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Result<Response, Response> {
    let patch = wire.parse_user(&body).map_err(|e| wire.fail(e))?;
    state
        .identity
        .set_user_enabled(&admin_token, &user_id, patch.enabled)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(Wire::no_content())
}

/// PUT /v2.0/users/{user_id}/tenant
pub async fn set_tenant(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Result<Response, Response> {
    let patch = wire.parse_user(&body).map_err(|e| wire.fail(e))?;
    state
        .identity
        .set_user_tenant(&admin_token, &user_id, patch.tenant_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(Wire::no_content())
}
