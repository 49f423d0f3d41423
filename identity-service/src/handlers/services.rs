//! Service registry handlers (OS-KSADM extension).

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;

use crate::wire::{ServiceDoc, ServicesDoc, Wire};
use crate::AppState;

use super::{AuthToken, ListQuery};

/// POST /v2.0/OS-KSADM/services
pub async fn create(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    body: Bytes,
) -> Result<Response, Response> {
    let service = wire.parse_service(&body).map_err(|e| wire.fail(e))?;
    let service = state
        .identity
        .create_service(&admin_token, service)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::CREATED, &ServiceDoc(service)))
}

/// GET /v2.0/OS-KSADM/services. With `?name=`, looks a service up instead.
pub async fn list(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Query(query): Query<ListQuery>,
) -> Result<Response, Response> {
    if let Some(name) = &query.name {
        let service = state
            .identity
            .get_service_by_name(&admin_token, name)
            .await
            .map_err(|e| wire.fail(e))?;
        return Ok(wire.render(StatusCode::OK, &ServiceDoc(service)));
    }

    let limit = query.limit(&state);
    let (services, links) = state
        .identity
        .get_services(&admin_token, query.marker.as_deref(), limit, wire.base_url())
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &ServicesDoc(services, links)))
}

/// GET /v2.0/OS-KSADM/services/{service_id}
pub async fn get(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(service_id): Path<String>,
) -> Result<Response, Response> {
    let service = state
        .identity
        .get_service(&admin_token, &service_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &ServiceDoc(service)))
}

/// DELETE /v2.0/OS-KSADM/services/{service_id}
pub async fn delete(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(service_id): Path<String>,
) -> Result<Response, Response> {
    state
        .identity
        .delete_service(&admin_token, &service_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(Wire::no_content())
}
