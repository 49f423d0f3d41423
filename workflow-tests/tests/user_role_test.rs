//! User administration and role grants over the HTTP surface.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use identity_service::models::Role;
use workflow_tests::{body_json, json_request, setup};

#[tokio::test]
async fn user_crud_and_sub_operations() {
    let h = setup().await;
    let (tenant, _alice) = h.seed_alice().await;

    let response = h
        .router()
        .oneshot(json_request(
            "POST",
            "/v2.0/users",
            Some(&h.admin_token),
            Some(json!({
                "user": {
                    "name": "bob",
                    "password": "b0b",
                    "email": "bob@example.com",
                    "tenantId": tenant.id
                }
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let bob_id = body["user"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["email"], "bob@example.com");
    assert!(body["user"].get("password").is_none());

    // duplicate name conflicts
    let response = h
        .router()
        .oneshot(json_request(
            "POST",
            "/v2.0/users",
            Some(&h.admin_token),
            Some(json!({"user": {"name": "bob", "password": "x"}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // bob can authenticate, scoped to his default tenant
    let response = h
        .router()
        .oneshot(json_request(
            "POST",
            "/v2.0/tokens",
            None,
            Some(json!({
                "auth": {"passwordCredentials": {"username": "bob", "password": "b0b"}}
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["access"]["token"]["tenant"]["id"], json!(tenant.id));

    // disable, then authentication fails closed
    let uri = format!("/v2.0/users/{bob_id}/enabled");
    let response = h
        .router()
        .oneshot(json_request(
            "PUT",
            &uri,
            Some(&h.admin_token),
            Some(json!({"user": {"enabled": false}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = h
        .router()
        .oneshot(json_request(
            "POST",
            "/v2.0/tokens",
            None,
            Some(json!({
                "auth": {"passwordCredentials": {"username": "bob", "password": "b0b"}}
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // delete
    let uri = format!("/v2.0/users/{bob_id}");
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
async fn role_grants_are_unique_per_user_role_tenant() {
    let h = setup().await;
    let (tenant, alice) = h.seed_alice().await;
    let member = h.repos.roles.create(Role::new("Member")).await.unwrap();

    let tenant_grant = format!(
        "/v2.0/users/{}/roles/OS-KSADM/{}/tenant/{}",
        alice.id, member.id, tenant.id
    );
    let response = h
        .router()
        .oneshot(json_request("PUT", &tenant_grant, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // the same triple again conflicts
    let response = h
        .router()
        .oneshot(json_request("PUT", &tenant_grant, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // a global grant of the same role is a different row
    let global_grant = format!("/v2.0/users/{}/roles/OS-KSADM/{}", alice.id, member.id);
    let response = h
        .router()
        .oneshot(json_request("PUT", &global_grant, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // the global grant shows up on the user's role listing
    let uri = format!("/v2.0/users/{}/roles", alice.id);
    let response = h
        .router()
        .oneshot(json_request("GET", &uri, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let roles = body["roles"].as_array().unwrap();
    assert!(roles.iter().any(|r| r["name"] == "Member"));

    // revoke the tenant grant; the global one survives
    let response = h
        .router()
        .oneshot(json_request(
            "DELETE",
            &tenant_grant,
            Some(&h.admin_token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = h
        .router()
        .oneshot(json_request(
            "DELETE",
            &tenant_grant,
            Some(&h.admin_token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = h
        .router()
        .oneshot(json_request("GET", &uri, Some(&h.admin_token), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body["roles"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["name"] == "Member"));
}

#[tokio::test]
async fn tenant_user_listing_covers_members_and_grantees() {
    let h = setup().await;
    let (tenant, alice) = h.seed_alice().await;

    // carol reaches acme only through a role grant
    let response = h
        .router()
        .oneshot(json_request(
            "POST",
            "/v2.0/users",
            Some(&h.admin_token),
            Some(json!({"user": {"name": "carol", "password": "c"}})),
        ))
        .await
        .unwrap();
    let carol_id = body_json(response).await["user"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let member = h.repos.roles.create(Role::new("Member")).await.unwrap();
    let grant = format!(
        "/v2.0/users/{}/roles/OS-KSADM/{}/tenant/{}",
        carol_id, member.id, tenant.id
    );
    h.router()
        .oneshot(json_request("PUT", &grant, Some(&h.admin_token), None))
        .await
        .unwrap();

    let uri = format!("/v2.0/tenants/{}/users", tenant.id);
    let response = h
        .router()
        .oneshot(json_request("GET", &uri, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let names: Vec<&str> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"alice"));
    assert!(names.contains(&"carol"));

    // narrowed by role, only carol remains
    let uri = format!("/v2.0/tenants/{}/users?roleId={}", tenant.id, member.id);
    let response = h
        .router()
        .oneshot(json_request("GET", &uri, Some(&h.admin_token), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    let names: Vec<&str> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["carol"]);

    assert_eq!(alice.name, "alice");
}
