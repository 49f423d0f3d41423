//! Remote forwarding for standalone (non-embedded) deployments.

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response, StatusCode};
use http_body_util::BodyExt;

use crate::config::{AuthTokenConfig, RemoteService};

/// Forward a decorated request to the remote downstream service and relay
/// its response. A 401 or 305 from downstream is rewritten to carry the
/// identity service challenge so clients know where to authenticate.
pub async fn forward(
    client: &reqwest::Client,
    service: &RemoteService,
    config: &AuthTokenConfig,
    req: Request<Body>,
) -> Response<Body> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::error!(error = %e, "failed to buffer request body for forwarding");
            return status_response(StatusCode::BAD_GATEWAY);
        }
    };

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", service.base_url(), path_and_query);

    let method = match reqwest::Method::from_bytes(parts.method.as_str().as_bytes()) {
        Ok(m) => m,
        Err(_) => return status_response(StatusCode::BAD_GATEWAY),
    };

    let mut outbound = client.request(method, &url).body(body.to_vec());
    for (name, value) in parts.headers.iter() {
        // Hop-by-hop and recomputed headers stay behind.
        if name == &header::HOST || name == &header::CONTENT_LENGTH || name == &header::CONNECTION
        {
            continue;
        }
        outbound = outbound.header(name, value);
    }
    if let Some(pass) = &service.service_pass {
        outbound = outbound.header(header::AUTHORIZATION, format!("Basic {pass}"));
    }

    let resp = match outbound.send().await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!(error = %e, url = %url, "downstream service unreachable");
            return status_response(StatusCode::BAD_GATEWAY);
        }
    };

    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let headers = resp.headers().clone();
    let bytes = resp.bytes().await.unwrap_or_default();

    let mut builder = Response::builder().status(status);
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::USE_PROXY {
        // Downstream wants authentication: point the client at the identity
        // service rather than leaking downstream's own challenge.
        builder = builder.header(
            header::WWW_AUTHENTICATE,
            format!("Keystone uri='{}'", config.auth_uri),
        );
    } else {
        for (name, value) in headers.iter() {
            if name == &header::CONNECTION || name == &header::TRANSFER_ENCODING {
                continue;
            }
            builder = builder.header(name, value);
        }
    }

    builder
        .body(Body::from(bytes))
        .unwrap_or_else(|_| status_response(StatusCode::BAD_GATEWAY))
}

fn status_response(status: StatusCode) -> Response<Body> {
    let mut resp = Response::new(Body::empty());
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_static("0"),
    );
    resp
}
