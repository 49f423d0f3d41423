//! The auth-token middleware wired to the embedded validator (S3).

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, Router};
use tower::ServiceExt;

use auth_token::{auth_token_middleware, AuthTokenConfig, AuthTokenState};
use identity_service::models::{Role, UserRoleAssociation};
use identity_service::validator::CoreValidator;
use workflow_tests::{body_json, setup, Harness};

fn middleware_config(delay: bool, admin_token: &str) -> AuthTokenConfig {
    AuthTokenConfig {
        auth_host: "identity.example.com".to_string(),
        auth_port: 35357,
        auth_protocol: "https".to_string(),
        auth_uri: "https://identity.example.com:35357".to_string(),
        admin_token: admin_token.to_string(),
        certfile: None,
        keyfile: None,
        delay_auth_decision: delay,
        service: None,
    }
}

/// Downstream handler echoing the identity headers it received.
async fn echo_identity(req: Request) -> Json<serde_json::Value> {
    let wanted = [
        "x-identity-status",
        "x-authorization",
        "x-tenant-id",
        "x-tenant-name",
        "x-user-id",
        "x-user-name",
        "x-roles",
        "x-tenant",
        "x-user",
        "x-role",
        "x-capabilities",
    ];
    let mut headers = BTreeMap::new();
    for name in wanted {
        if let Some(value) = req.headers().get(name).and_then(|v| v.to_str().ok()) {
            headers.insert(name.to_string(), value.to_string());
        }
    }
    Json(serde_json::json!(headers))
}

fn protected_app(h: &Harness, delay: bool) -> Router {
    let validator = Arc::new(CoreValidator::new(h.state.identity.clone()));
    let state = AuthTokenState::new(middleware_config(delay, &h.admin_token), validator);
    Router::new()
        .route("/whatever", get(echo_identity))
        .layer(from_fn_with_state(state, auth_token_middleware))
}

#[tokio::test]
async fn confirmed_claims_decorate_the_downstream_request() {
    let h = setup().await;
    let (tenant, alice) = h.seed_alice().await;

    let member = h.repos.roles.create(Role::new("Member")).await.unwrap();
    h.repos
        .roles
        .grant_create(UserRoleAssociation::new(
            &alice.id,
            &member.id,
            Some(tenant.id.clone()),
        ))
        .await
        .unwrap();

    let token = h.authenticate("alice", "p", Some("acme")).await;

    let response = protected_app(&h, false)
        .oneshot(
            Request::get("/whatever")
                .header("X-Auth-Token", &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = body_json(response).await;
    assert_eq!(headers["x-identity-status"], "Confirmed");
    assert_eq!(headers["x-authorization"], "Proxy alice");
    assert_eq!(headers["x-tenant-id"], serde_json::json!(tenant.id));
    assert_eq!(headers["x-tenant-name"], "acme");
    assert_eq!(headers["x-user-id"], serde_json::json!(alice.id));
    assert_eq!(headers["x-user-name"], "alice");
    assert_eq!(headers["x-roles"], "Member");

    // deprecated aliases ride along
    assert_eq!(headers["x-tenant"], serde_json::json!(tenant.id));
    assert_eq!(headers["x-user"], serde_json::json!(alice.id));
    assert_eq!(headers["x-role"], "Member");
}

#[tokio::test]
async fn spoofed_identity_headers_are_stripped() {
    let h = setup().await;
    h.seed_alice().await;
    let token = h.authenticate("alice", "p", Some("acme")).await;

    let response = protected_app(&h, false)
        .oneshot(
            Request::get("/whatever")
                .header("X-Auth-Token", &token)
                .header("X-User-Name", "mallory")
                .header("X-Roles", "Admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = body_json(response).await;
    assert_eq!(headers["x-user-name"], "alice");
    assert_eq!(headers["x-roles"], "");
}

#[tokio::test]
async fn missing_claim_is_rejected_with_a_challenge() {
    let h = setup().await;

    let response = protected_app(&h, false)
        .oneshot(Request::get("/whatever").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert_eq!(
        challenge,
        "Keystone uri='https://identity.example.com:35357'"
    );
}

#[tokio::test]
async fn delay_auth_decision_forwards_invalid_requests() {
    let h = setup().await;

    // no claim at all
    let response = protected_app(&h, true)
        .oneshot(Request::get("/whatever").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = body_json(response).await;
    assert_eq!(headers["x-identity-status"], "Invalid");

    // a claim the identity service rejects
    let response = protected_app(&h, true)
        .oneshot(
            Request::get("/whatever")
                .header("X-Auth-Token", "bogus")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = body_json(response).await;
    assert_eq!(headers["x-identity-status"], "Invalid");
}

#[tokio::test]
async fn expired_claims_are_rejected() {
    let h = setup().await;
    let (_tenant, alice) = h.seed_alice().await;

    let expired =
        identity_service::models::Token::new(&alice.id, None, chrono::Duration::seconds(-60));
    let expired = h.repos.tokens.create(expired).await.unwrap();

    let response = protected_app(&h, false)
        .oneshot(
            Request::get("/whatever")
                .header("X-Auth-Token", &expired.id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
