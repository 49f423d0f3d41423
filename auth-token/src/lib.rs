//! Token-authentication middleware.
//!
//! Services in the deployment insert this filter in front of their own
//! handlers. Per request it:
//!
//! 1. extracts the bearer claim from `X-Auth-Token` (falling back to
//!    `X-Storage-Token`),
//! 2. validates it against the identity service, in-process when embedded
//!    next to the core, over HTTPS otherwise,
//! 3. stamps the confirmed identity onto the request
//!    (`X-Identity-Status`, `X-Tenant-*`, `X-User-*`, `X-Roles`, plus the
//!    deprecated `X-Tenant`/`X-User`/`X-Role` aliases), and
//! 4. hands the request to the wrapped router, or proxies it to a remote
//!    service when configured standalone.
//!
//! Unauthenticated requests are rejected with a
//! `WWW-Authenticate: Keystone uri='...'` challenge unless
//! `delay_auth_decision` is on, in which case they are forwarded carrying
//! `X-Identity-Status: Invalid` and the downstream service decides.

pub mod config;
pub mod error;
pub mod headers;
mod proxy;
pub mod validator;

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;

pub use config::{AuthTokenConfig, RemoteService};
pub use error::{MiddlewareError, ValidationFailed};
pub use validator::{IdentityClaims, RemoteValidator, TokenValidator};

/// Shared middleware state: configuration plus the validator chosen at
/// construction time.
#[derive(Clone)]
pub struct AuthTokenState {
    config: Arc<AuthTokenConfig>,
    validator: Arc<dyn TokenValidator>,
    client: reqwest::Client,
}

impl AuthTokenState {
    pub fn new(config: AuthTokenConfig, validator: Arc<dyn TokenValidator>) -> Self {
        Self {
            config: Arc::new(config),
            validator,
            client: reqwest::Client::new(),
        }
    }

    /// Standalone state with the remote validator wired in from config.
    pub fn remote(config: AuthTokenConfig) -> Result<Self, MiddlewareError> {
        let validator = RemoteValidator::new(&config)?;
        Ok(Self::new(config, Arc::new(validator)))
    }

    pub fn config(&self) -> &AuthTokenConfig {
        &self.config
    }
}

/// The middleware entry point, for use with
/// `axum::middleware::from_fn_with_state`.
pub async fn auth_token_middleware(
    State(state): State<AuthTokenState>,
    mut req: Request,
    next: Next,
) -> Response<Body> {
    // Inbound identity headers are ours; whatever the client sent is noise
    // or spoofing.
    headers::scrub_identity_headers(req.headers_mut());

    let claim = extract_claim(&req);

    match claim {
        None => {
            if state.config.delay_auth_decision {
                headers::set(req.headers_mut(), headers::X_IDENTITY_STATUS, "Invalid");
            } else {
                return reject_request(&state.config);
            }
        }
        Some(claim) => match state.validator.validate(&claim).await {
            Ok(claims) => {
                tracing::debug!(user = %claims.user_name, "claim confirmed");
                headers::decorate(req.headers_mut(), &claims);
            }
            Err(e) => {
                tracing::debug!(error = %e, "claim rejected");
                if state.config.delay_auth_decision {
                    headers::set(req.headers_mut(), headers::X_IDENTITY_STATUS, "Invalid");
                } else {
                    return StatusCode::UNAUTHORIZED.into_response();
                }
            }
        },
    }

    match &state.config.service {
        None => next.run(req).await,
        Some(service) => proxy::forward(&state.client, service, &state.config, req).await,
    }
}

fn extract_claim(req: &Request) -> Option<String> {
    for name in [headers::X_AUTH_TOKEN, headers::X_STORAGE_TOKEN] {
        if let Some(value) = req.headers().get(name).and_then(|v| v.to_str().ok()) {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn reject_request(config: &AuthTokenConfig) -> Response<Body> {
    let challenge = format!("Keystone uri='{}'", config.auth_uri);
    let challenge = HeaderValue::from_str(&challenge)
        .unwrap_or_else(|_| HeaderValue::from_static("Keystone"));

    let mut resp = (StatusCode::UNAUTHORIZED, "Authentication required").into_response();
    resp.headers_mut()
        .insert(header::WWW_AUTHENTICATE, challenge);
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn test_config(delay: bool) -> AuthTokenConfig {
        AuthTokenConfig {
            auth_host: "identity.example.com".into(),
            auth_port: 35357,
            auth_protocol: "https".into(),
            auth_uri: "https://identity.example.com:35357".into(),
            admin_token: "admin-token".into(),
            certfile: None,
            keyfile: None,
            delay_auth_decision: delay,
            service: None,
        }
    }

    struct StaticValidator {
        claims: Option<IdentityClaims>,
    }

    #[async_trait::async_trait]
    impl TokenValidator for StaticValidator {
        async fn validate(&self, _claim: &str) -> Result<IdentityClaims, ValidationFailed> {
            self.claims
                .clone()
                .ok_or_else(|| ValidationFailed::new("rejected"))
        }
    }

    fn echo_router(state: AuthTokenState) -> Router {
        Router::new()
            .route(
                "/whatever",
                get(|req: Request| async move {
                    let status = req
                        .headers()
                        .get(headers::X_IDENTITY_STATUS)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    status
                }),
            )
            .layer(from_fn_with_state(state, auth_token_middleware))
    }

    #[tokio::test]
    async fn missing_claim_is_challenged() {
        let state = AuthTokenState::new(
            test_config(false),
            Arc::new(StaticValidator { claims: None }),
        );
        let resp = echo_router(state)
            .oneshot(
                HttpRequest::get("/whatever")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let challenge = resp
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(
            challenge,
            "Keystone uri='https://identity.example.com:35357'"
        );
    }

    #[tokio::test]
    async fn missing_claim_forwards_invalid_when_delayed() {
        let state = AuthTokenState::new(
            test_config(true),
            Arc::new(StaticValidator { claims: None }),
        );
        let resp = echo_router(state)
            .oneshot(
                HttpRequest::get("/whatever")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = http_body_util::BodyExt::collect(resp.into_body())
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(&body[..], b"Invalid");
    }

    #[tokio::test]
    async fn rejected_claim_is_unauthorized() {
        let state = AuthTokenState::new(
            test_config(false),
            Arc::new(StaticValidator { claims: None }),
        );
        let resp = echo_router(state)
            .oneshot(
                HttpRequest::get("/whatever")
                    .header("X-Auth-Token", "bogus")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn storage_token_is_accepted_as_claim() {
        let claims = IdentityClaims {
            user_id: "u1".into(),
            user_name: "alice".into(),
            ..Default::default()
        };
        let state = AuthTokenState::new(
            test_config(false),
            Arc::new(StaticValidator {
                claims: Some(claims),
            }),
        );
        let resp = echo_router(state)
            .oneshot(
                HttpRequest::get("/whatever")
                    .header("X-Storage-Token", "tok")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = http_body_util::BodyExt::collect(resp.into_body())
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(&body[..], b"Confirmed");
    }
}
