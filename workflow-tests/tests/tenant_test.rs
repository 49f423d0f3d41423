//! Tenant administration over the HTTP surface.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use workflow_tests::{body_json, json_request, setup};

#[tokio::test]
async fn tenant_crud_round_trip() {
    let h = setup().await;

    let response = h
        .router()
        .oneshot(json_request(
            "POST",
            "/v2.0/tenants",
            Some(&h.admin_token),
            Some(json!({"tenant": {"name": "acme", "description": "the acme tenant"}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let tenant_id = body["tenant"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["tenant"]["enabled"], json!(true));

    let uri = format!("/v2.0/tenants/{tenant_id}");
    let response = h
        .router()
        .oneshot(json_request("GET", &uri, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["tenant"]["name"], "acme");
    assert_eq!(body["tenant"]["description"], "the acme tenant");

    // rename and disable
    let response = h
        .router()
        .oneshot(json_request(
            "PUT",
            &uri,
            Some(&h.admin_token),
            Some(json!({"tenant": {"name": "acme-2", "enabled": "false"}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["tenant"]["name"], "acme-2");
    assert_eq!(body["tenant"]["enabled"], json!(false));

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
async fn duplicate_tenant_name_conflicts() {
    let h = setup().await;
    h.seed_alice().await;

    let response = h
        .router()
        .oneshot(json_request(
            "POST",
            "/v2.0/tenants",
            Some(&h.admin_token),
            Some(json!({"tenant": {"name": "acme"}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["conflict"]["code"], 409);
}

#[tokio::test]
async fn populated_tenant_delete_is_refused() {
    let h = setup().await;
    let (tenant, _alice) = h.seed_alice().await;

    let uri = format!("/v2.0/tenants/{}", tenant.id);
    let response = h
        .router()
        .oneshot(json_request("DELETE", &uri, Some(&h.admin_token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    let message = body["forbidden"]["message"].as_str().unwrap();
    assert!(message.contains("tenant"));

    // still there
    let response = h
        .router()
        .oneshot(json_request("GET", &uri, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn tenant_creation_requires_admin() {
    let h = setup().await;
    h.seed_alice().await;
    let alice_token = h.authenticate("alice", "p", None).await;

    let response = h
        .router()
        .oneshot(json_request(
            "POST",
            "/v2.0/tenants",
            Some(&alice_token),
            Some(json!({"tenant": {"name": "rogue"}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tenant_listing_pages_with_links() {
    let h = setup().await;
    for i in 0..5 {
        h.router()
            .oneshot(json_request(
                "POST",
                "/v2.0/tenants",
                Some(&h.admin_token),
                Some(json!({"tenant": {"name": format!("tenant-{i}")}})),
            ))
            .await
            .unwrap();
    }

    // First page: no prev link, a next link carrying a marker.
    let response = h
        .router()
        .oneshot(json_request(
            "GET",
            "/v2.0/tenants?limit=2",
            Some(&h.admin_token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let first_page = body["tenants"].as_array().unwrap();
    assert_eq!(first_page.len(), 2);
    let links = body["tenants_links"].as_array().unwrap();
    assert!(links.iter().all(|l| l["rel"] != "prev"));
    let next = links.iter().find(|l| l["rel"] == "next").unwrap();
    let href = next["href"].as_str().unwrap();
    assert!(href.contains("marker="));
    assert!(href.contains("limit=2"));
    assert!(href.split('?').next().unwrap().ends_with("/v2.0/tenants"));

    // Walk every page by marker and cover the whole collection exactly once.
    let mut seen: Vec<String> = first_page
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect();
    let mut marker = seen.last().cloned();
    loop {
        let uri = format!(
            "/v2.0/tenants?limit=2&marker={}",
            marker.as_deref().unwrap_or_default()
        );
        let body = body_json(
            h.router()
                .oneshot(json_request("GET", &uri, Some(&h.admin_token), None))
                .await
                .unwrap(),
        )
        .await;
        let page = body["tenants"].as_array().unwrap();
        if page.is_empty() {
            break;
        }
        for tenant in page {
            let id = tenant["id"].as_str().unwrap().to_string();
            assert!(!seen.contains(&id), "page overlap at {id}");
            seen.push(id);
        }
        let has_next = body["tenants_links"]
            .as_array()
            .unwrap()
            .iter()
            .any(|l| l["rel"] == "next");
        marker = seen.last().cloned();
        if !has_next {
            break;
        }
    }
    assert_eq!(seen.len(), 5);
}
