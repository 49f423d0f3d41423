//! Token operations: authenticate, validate, revoke, catalog.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;

use crate::wire::{AuthDoc, EndpointsDoc, ValidateDoc, Wire};
use crate::AppState;

use super::{AuthToken, ListQuery};

/// POST /v2.0/tokens
pub async fn authenticate(
    State(state): State<AppState>,
    wire: Wire,
    body: Bytes,
) -> Result<Response, Response> {
    let request = wire.parse_auth(&body).map_err(|e| wire.fail(e))?;
    let data = state
        .identity
        .authenticate(request)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &AuthDoc(data)))
}

#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    #[serde(rename = "belongsTo")]
    pub belongs_to: Option<String>,
}

/// GET /v2.0/tokens/{token_id}
pub async fn validate(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(token_id): Path<String>,
    Query(query): Query<ValidateQuery>,
) -> Result<Response, Response> {
    let data = state
        .identity
        .validate_token(&admin_token, &token_id, query.belongs_to.as_deref())
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &ValidateDoc(data)))
}

/// DELETE /v2.0/tokens/{token_id}
pub async fn revoke(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(token_id): Path<String>,
) -> Result<Response, Response> {
    state
        .identity
        .revoke_token(&admin_token, &token_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(Wire::no_content())
}

/// GET /v2.0/tokens/{token_id}/endpoints
pub async fn endpoints(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(token_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Response, Response> {
    let limit = query.limit(&state);
    let (endpoints, links) = state
        .identity
        .get_endpoints_for_token(
            &admin_token,
            &token_id,
            query.marker.as_deref(),
            limit,
            wire.base_url(),
        )
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(
        StatusCode::OK,
        &EndpointsDoc {
            endpoints,
            links,
            include_admin_url: true,
        },
    ))
}
