//! Endpoint templates and tenant endpoint bindings (OS-KSCATALOG).

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;

use crate::wire::{EndpointDoc, EndpointTemplateDoc, EndpointTemplatesDoc, EndpointsDoc, Wire};
use crate::AppState;

use super::{AuthToken, ListQuery};

/// POST /v2.0/OS-KSCATALOG/endpointTemplates
pub async fn create_template(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    body: Bytes,
) -> Result<Response, Response> {
    let input = wire.parse_endpoint_template(&body).map_err(|e| wire.fail(e))?;
    let view = state
        .identity
        .add_endpoint_template(&admin_token, input)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::CREATED, &EndpointTemplateDoc(view)))
}

/// GET /v2.0/OS-KSCATALOG/endpointTemplates
pub async fn list_templates(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Query(query): Query<ListQuery>,
) -> Result<Response, Response> {
    let limit = query.limit(&state);
    let (views, links) = state
        .identity
        .get_endpoint_templates(&admin_token, query.marker.as_deref(), limit, wire.base_url())
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &EndpointTemplatesDoc(views, links)))
}

/// GET /v2.0/OS-KSCATALOG/endpointTemplates/{template_id}
pub async fn get_template(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(template_id): Path<String>,
) -> Result<Response, Response> {
    let view = state
        .identity
        .get_endpoint_template(&admin_token, &template_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &EndpointTemplateDoc(view)))
}

/// PUT /v2.0/OS-KSCATALOG/endpointTemplates/{template_id}
pub async fn update_template(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(template_id): Path<String>,
    body: Bytes,
) -> Result<Response, Response> {
    let input = wire.parse_endpoint_template(&body).map_err(|e| wire.fail(e))?;
    let view = state
        .identity
        .modify_endpoint_template(&admin_token, &template_id, input)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &EndpointTemplateDoc(view)))
}

/// DELETE /v2.0/OS-KSCATALOG/endpointTemplates/{template_id}
pub async fn delete_template(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(template_id): Path<String>,
) -> Result<Response, Response> {
    state
        .identity
        .delete_endpoint_template(&admin_token, &template_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(Wire::no_content())
}

/// GET /v2.0/tenants/{tenant_id}/OS-KSCATALOG/endpoints
pub async fn list_tenant_endpoints(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(tenant_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Response, Response> {
    let limit = query.limit(&state);
    let (endpoints, links) = state
        .identity
        .get_tenant_endpoints(
            &admin_token,
            &tenant_id,
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

/// POST /v2.0/tenants/{tenant_id}/OS-KSCATALOG/endpoints: bind a template.
pub async fn bind_endpoint(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(tenant_id): Path<String>,
    body: Bytes,
) -> Result<Response, Response> {
    let template_id = wire.parse_endpoint_binding(&body).map_err(|e| wire.fail(e))?;
    let endpoint = state
        .identity
        .create_endpoint_for_tenant(&admin_token, &tenant_id, &template_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(
        StatusCode::CREATED,
        &EndpointDoc {
            endpoint,
            include_admin_url: true,
        },
    ))
}

/// DELETE /v2.0/tenants/{tenant_id}/OS-KSCATALOG/endpoints/{endpoint_id}
pub async fn unbind_endpoint(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path((_tenant_id, endpoint_id)): Path<(String, String)>,
) -> Result<Response, Response> {
    state
        .identity
        .delete_endpoint(&admin_token, &endpoint_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(Wire::no_content())
}
