//! Common harness for the end-to-end scenario tests.
//!
//! Builds the real router over the in-memory backend, seeded like a small
//! deployment: the two authority roles and an `admin` user holding the
//! admin role. Tests drive the router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;

use identity_service::config::IdentityConfig;
use identity_service::models::{Tenant, User, UserRoleAssociation};
use identity_service::repo::Repositories;
use identity_service::services::{AuthRequest, IdentityService};
use identity_service::utils::password::hash_password;
use identity_service::{bootstrap, build_router, AppState};

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "secrete";

pub struct Harness {
    pub repos: Repositories,
    pub state: AppState,
    /// A live token holding the admin role.
    pub admin_token: String,
}

pub async fn setup() -> Harness {
    let repos = Repositories::memory();
    let config = IdentityConfig::for_memory();
    bootstrap(&repos, &config)
        .await
        .expect("bootstrap roles");

    let mut admin = User::new(ADMIN_USER);
    admin.password = Some(hash_password(ADMIN_PASSWORD).expect("hash admin password"));
    let admin = repos.users.create(admin).await.expect("create admin user");

    let admin_role = repos
        .roles
        .get_by_name(&config.admin_role)
        .await
        .expect("lookup admin role")
        .expect("admin role bootstrapped");
    repos
        .roles
        .grant_create(UserRoleAssociation::new(&admin.id, &admin_role.id, None))
        .await
        .expect("grant admin role");

    let identity = Arc::new(
        IdentityService::new(
            repos.clone(),
            &config.admin_role,
            &config.service_admin_role,
            config.token_ttl_seconds,
        )
        .await
        .expect("construct identity core"),
    );

    let admin_token = identity
        .authenticate(AuthRequest::Password {
            username: ADMIN_USER.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            tenant_id: None,
            tenant_name: None,
        })
        .await
        .expect("authenticate admin")
        .token
        .id;

    let state = AppState { config, identity };
    Harness {
        repos,
        state,
        admin_token,
    }
}

impl Harness {
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Tenant `acme` with user `alice` (password `p`) defaulting to it.
    pub async fn seed_alice(&self) -> (Tenant, User) {
        let tenant = self
            .repos
            .tenants
            .create(Tenant::new("acme"))
            .await
            .expect("create tenant");

        let mut alice = User::new("alice");
        alice.password = Some(hash_password("p").expect("hash password"));
        alice.tenant_id = Some(tenant.id.clone());
        let alice = self.repos.users.create(alice).await.expect("create user");

        (tenant, alice)
    }

    pub async fn authenticate(&self, username: &str, password: &str, tenant_name: Option<&str>) -> String {
        self.state
            .identity
            .authenticate(AuthRequest::Password {
                username: username.to_string(),
                password: password.to_string(),
                tenant_id: None,
                tenant_name: tenant_name.map(str::to_string),
            })
            .await
            .expect("authenticate")
            .token
            .id
    }
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ACCEPT, "application/json")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header("X-Auth-Token", token);
    }
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    builder.body(body).expect("build request")
}

pub fn xml_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ACCEPT, "application/xml")
        .header(header::CONTENT_TYPE, "application/xml");
    if let Some(token) = token {
        builder = builder.header("X-Auth-Token", token);
    }
    let body = match body {
        Some(text) => Body::from(text.to_string()),
        None => Body::empty(),
    };
    builder.body(body).expect("build request")
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("response is json")
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = body_bytes(response).await;
    String::from_utf8(bytes.to_vec()).expect("response is utf-8")
}
