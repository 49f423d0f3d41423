//! Authentication flows over the HTTP surface.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use workflow_tests::{body_json, json_request, setup};

#[tokio::test]
async fn password_auth_issues_token_and_reuses_it_within_ttl() {
    let h = setup().await;
    let (tenant, alice) = h.seed_alice().await;

    let auth_body = json!({
        "auth": {
            "tenantName": "acme",
            "passwordCredentials": {"username": "alice", "password": "p"}
        }
    });

    let response = h
        .router()
        .oneshot(json_request("POST", "/v2.0/tokens", None, Some(auth_body.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let access = &body["access"];

    let token_id = access["token"]["id"].as_str().unwrap().to_string();
    assert!(!token_id.is_empty());
    assert_eq!(access["token"]["tenant"]["id"], json!(tenant.id));
    assert_eq!(access["token"]["tenant"]["name"], "acme");
    assert_eq!(access["user"]["id"], json!(alice.id));
    assert_eq!(access["user"]["name"], "alice");

    // An identical call within the TTL hands back the same token.
    let response = h
        .router()
        .oneshot(json_request("POST", "/v2.0/tokens", None, Some(auth_body)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["access"]["token"]["id"].as_str().unwrap(), token_id);
}

#[tokio::test]
async fn unknown_tenant_name_is_unauthorized() {
    let h = setup().await;
    h.seed_alice().await;

    let response = h
        .router()
        .oneshot(json_request(
            "POST",
            "/v2.0/tokens",
            None,
            Some(json!({
                "auth": {
                    "tenantName": "other",
                    "passwordCredentials": {"username": "alice", "password": "p"}
                }
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["unauthorized"]["code"], 401);
}

#[tokio::test]
async fn check_token_flow_validates_and_hides_unknown_tokens() {
    let h = setup().await;
    let (tenant, alice) = h.seed_alice().await;
    let token = h.authenticate("alice", "p", Some("acme")).await;

    // validate with belongsTo
    let uri = format!("/v2.0/tokens/{}?belongsTo={}", token, tenant.id);
    let response = h
        .router()
        .oneshot(json_request("GET", &uri, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["access"]["user"]["id"], json!(alice.id));
    assert_eq!(body["access"]["token"]["tenant"]["id"], json!(tenant.id));

    // the check flow answers 404 for unknown tokens, not 401
    let response = h
        .router()
        .oneshot(json_request(
            "GET",
            "/v2.0/tokens/no-such-token",
            Some(&h.admin_token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["itemNotFound"]["code"], 404);
}

#[tokio::test]
async fn revoked_tokens_stop_validating() {
    let h = setup().await;
    h.seed_alice().await;
    let token = h.authenticate("alice", "p", Some("acme")).await;

    let uri = format!("/v2.0/tokens/{token}");
    let response = h
        .router()
        .oneshot(json_request("DELETE", &uri, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = h
        .router()
        .oneshot(json_request("GET", &uri, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn validation_requires_a_privileged_caller() {
    let h = setup().await;
    h.seed_alice().await;
    let token = h.authenticate("alice", "p", Some("acme")).await;

    // alice's own token carries no admin authority
    let uri = format!("/v2.0/tokens/{token}");
    let response = h
        .router()
        .oneshot(json_request("GET", &uri, Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
