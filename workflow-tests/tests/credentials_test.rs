//! Credential sub-resource and EC2 authentication over HTTP (S6).

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use identity_service::signer::{sign, SignableRequest};
use workflow_tests::{body_json, json_request, setup};

#[tokio::test]
async fn password_credentials_lifecycle() {
    let h = setup().await;
    let (_tenant, alice) = h.seed_alice().await;

    let base = format!("/v2.0/users/{}/OS-KSADM/credentials", alice.id);

    // listing shows the password entry without any secret
    let response = h
        .router()
        .oneshot(json_request("GET", &base, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let entries = body["credentials"].as_array().unwrap();
    assert_eq!(entries[0]["passwordCredentials"]["username"], "alice");
    assert!(entries[0]["passwordCredentials"].get("password").is_none());

    // creating on top of an existing password is refused
    let response = h
        .router()
        .oneshot(json_request(
            "POST",
            &base,
            Some(&h.admin_token),
            Some(json!({"passwordCredentials": {"username": "alice", "password": "p2"}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // update may rename, but not onto an existing user
    let sub = format!("{base}/passwordCredentials");
    let response = h
        .router()
        .oneshot(json_request(
            "PUT",
            &sub,
            Some(&h.admin_token),
            Some(json!({"passwordCredentials": {"username": "admin", "password": "p2"}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = h
        .router()
        .oneshot(json_request(
            "PUT",
            &sub,
            Some(&h.admin_token),
            Some(json!({"passwordCredentials": {"username": "alice2", "password": "p2"}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["passwordCredentials"]["username"], "alice2");

    // delete removes the password credential
    let response = h
        .router()
        .oneshot(json_request("DELETE", &sub, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = h
        .router()
        .oneshot(json_request("GET", &sub, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ec2_auth_succeeds_with_a_port_stripped_signature() {
    let h = setup().await;
    let (tenant, alice) = h.seed_alice().await;

    // store the key pair through the admin surface
    let base = format!("/v2.0/users/{}/OS-KSADM/credentials", alice.id);
    let response = h
        .router()
        .oneshot(json_request(
            "POST",
            &base,
            Some(&h.admin_token),
            Some(json!({
                "OS-KSEC2:ec2Credentials": {
                    "tenantId": tenant.id,
                    "key": "AK",
                    "secret": "SK"
                }
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["OS-KSEC2:ec2Credentials"]["key"], "AK");
    // the secret is never echoed
    assert!(body["OS-KSEC2:ec2Credentials"].get("secret").is_none());

    // sign against the bare hostname, transmit with the port attached
    let signed = SignableRequest {
        verb: "GET".to_string(),
        host: "api.example.com".to_string(),
        path: "/services/Cloud".to_string(),
        params: [("SignatureVersion".to_string(), "2".to_string())]
            .into_iter()
            .collect(),
    };
    let signature = sign("SK", &signed);

    let response = h
        .router()
        .oneshot(json_request(
            "POST",
            "/v2.0/tokens",
            None,
            Some(json!({
                "auth": {
                    "ec2Credentials": {
                        "access": "AK",
                        "signature": signature,
                        "verb": "GET",
                        "host": "api.example.com:443",
                        "path": "/services/Cloud",
                        "params": {"SignatureVersion": "2"}
                    }
                }
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["access"]["user"]["id"], json!(alice.id));
    assert_eq!(body["access"]["token"]["tenant"]["id"], json!(tenant.id));
}

#[tokio::test]
async fn ec2_credentials_can_be_listed_and_deleted() {
    let h = setup().await;
    let (_tenant, alice) = h.seed_alice().await;

    let base = format!("/v2.0/users/{}/OS-KSADM/credentials", alice.id);
    let response = h
        .router()
        .oneshot(json_request(
            "POST",
            &base,
            Some(&h.admin_token),
            Some(json!({"OS-KSEC2:ec2Credentials": {"key": "AK2", "secret": "SK2"}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let credential_id = created["OS-KSEC2:ec2Credentials"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = h
        .router()
        .oneshot(json_request("GET", &base, Some(&h.admin_token), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    let entries = body["credentials"].as_array().unwrap();
    assert!(entries
        .iter()
        .any(|e| e["OS-KSEC2:ec2Credentials"]["key"] == "AK2"));

    let sub = format!("{base}/OS-KSEC2:ec2Credentials/{credential_id}");
    let response = h
        .router()
        .oneshot(json_request("DELETE", &sub, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = h
        .router()
        .oneshot(json_request("GET", &sub, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
