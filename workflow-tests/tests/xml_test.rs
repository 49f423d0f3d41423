//! Content negotiation: the same surface speaks XML.

use axum::http::StatusCode;
use tower::ServiceExt;

use workflow_tests::{body_string, setup, xml_request};

const IDENTITY_NS: &str = "http://docs.openstack.org/identity/api/v2.0";

#[tokio::test]
async fn tenant_create_and_get_in_xml() {
    let h = setup().await;

    let body = format!(
        "<tenant xmlns=\"{IDENTITY_NS}\" name=\"acme\" enabled=\"true\">\
           <description>the acme tenant</description>\
         </tenant>"
    );
    let response = h
        .router()
        .oneshot(xml_request(
            "POST",
            "/v2.0/tenants",
            Some(&h.admin_token),
            Some(&body),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/xml")
    );

    let text = body_string(response).await;
    assert!(text.starts_with(&format!("<tenant xmlns=\"{IDENTITY_NS}\"")));
    assert!(text.contains("name=\"acme\""));
    assert!(text.contains("<description>the acme tenant</description>"));

    // pull the generated id out of the attributes
    let id = text
        .split("id=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap()
        .to_string();

    let uri = format!("/v2.0/tenants/{id}");
    let response = h
        .router()
        .oneshot(xml_request("GET", &uri, Some(&h.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_string(response).await;
    assert!(text.contains("name=\"acme\""));
}

#[tokio::test]
async fn password_auth_in_xml_returns_an_access_document() {
    let h = setup().await;
    h.seed_alice().await;

    let body = format!(
        "<auth xmlns=\"{IDENTITY_NS}\" tenantName=\"acme\">\
           <passwordCredentials username=\"alice\" password=\"p\"/>\
         </auth>"
    );
    let response = h
        .router()
        .oneshot(xml_request("POST", "/v2.0/tokens", None, Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_string(response).await;
    assert!(text.starts_with(&format!("<access xmlns=\"{IDENTITY_NS}\"")));
    assert!(text.contains("<token "));
    assert!(text.contains("<tenant id=\""));
    assert!(text.contains("name=\"alice\""));
}

#[tokio::test]
async fn faults_render_in_xml() {
    let h = setup().await;
    h.seed_alice().await;

    let body = format!(
        "<auth xmlns=\"{IDENTITY_NS}\">\
           <passwordCredentials username=\"alice\" password=\"wrong\"/>\
         </auth>"
    );
    let response = h
        .router()
        .oneshot(xml_request("POST", "/v2.0/tokens", None, Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let text = body_string(response).await;
    assert!(text.starts_with(&format!(
        "<unauthorized xmlns=\"{IDENTITY_NS}\" code=\"401\""
    )));
    assert!(text.contains("<message>"));
}

#[tokio::test]
async fn unknown_role_attribute_is_a_bad_request_in_xml_too() {
    let h = setup().await;

    let body = format!("<role xmlns=\"{IDENTITY_NS}\" name=\"Member\" bogus=\"1\"/>");
    let response = h
        .router()
        .oneshot(xml_request(
            "POST",
            "/v2.0/OS-KSADM/roles",
            Some(&h.admin_token),
            Some(&body),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let text = body_string(response).await;
    assert!(text.starts_with(&format!(
        "<badRequest xmlns=\"{IDENTITY_NS}\" code=\"400\""
    )));
    assert!(text.contains("bogus"));
}
