//! Identity service.
//!
//! Issues and validates bearer tokens, manages tenants, users, roles,
//! services and endpoint templates, and serves the admin API in both JSON
//! and XML. The [`auth-token`] middleware crate fronts other services and
//! validates claims against this one, remotely or in-process via
//! [`validator::CoreValidator`].

pub mod config;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod repo;
pub mod services;
pub mod signer;
pub mod utils;
pub mod validator;
pub mod wire;

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::config::IdentityConfig;
use crate::models::{Role, User, UserRoleAssociation};
use crate::repo::Repositories;
use crate::services::{IdentityService, ServiceError};
use crate::utils::password::hash_password;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: IdentityConfig,
    pub identity: Arc<IdentityService>,
}

/// Build the admin API router.
pub fn build_router(state: AppState) -> Router {
    use crate::handlers::{credentials, endpoints, roles, services, tenants, tokens, users};

    let token_routes = Router::new()
        .route("/", post(tokens::authenticate))
        .route("/:token_id", get(tokens::validate).delete(tokens::revoke))
        .route("/:token_id/endpoints", get(tokens::endpoints));

    let tenant_routes = Router::new()
        .route("/", get(tenants::list).post(tenants::create))
        .route(
            "/:tenant_id",
            get(tenants::get).put(tenants::update).delete(tenants::delete),
        )
        .route("/:tenant_id/users", get(tenants::users))
        .route(
            "/:tenant_id/OS-KSCATALOG/endpoints",
            get(endpoints::list_tenant_endpoints).post(endpoints::bind_endpoint),
        )
        .route(
            "/:tenant_id/OS-KSCATALOG/endpoints/:endpoint_id",
            delete(endpoints::unbind_endpoint),
        );

    let user_routes = Router::new()
        .route("/", get(users::list).post(users::create))
        .route(
            "/:user_id",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route("/:user_id/password", put(users::set_password))
        .route("/:user_id/enabled", put(users::set_enabled))
        .route("/:user_id/tenant", put(users::set_tenant))
        .route("/:user_id/roles", get(roles::user_roles))
        .route(
            "/:user_id/roles/OS-KSADM/:role_id",
            put(roles::grant_global).delete(roles::revoke_global),
        )
        .route(
            "/:user_id/roles/OS-KSADM/:role_id/tenant/:tenant_id",
            put(roles::grant_on_tenant).delete(roles::revoke_on_tenant),
        )
        .route(
            "/:user_id/OS-KSADM/credentials",
            get(credentials::list).post(credentials::create),
        )
        .route(
            "/:user_id/OS-KSADM/credentials/passwordCredentials",
            get(credentials::get_password)
                .put(credentials::update_password)
                .delete(credentials::delete_password),
        )
        .route(
            "/:user_id/OS-KSADM/credentials/OS-KSEC2:ec2Credentials/:credential_id",
            get(credentials::get_ec2).delete(credentials::delete_ec2),
        );

    let role_routes = Router::new()
        .route("/", get(roles::list).post(roles::create))
        .route("/:role_id", get(roles::get).delete(roles::delete));

    let service_routes = Router::new()
        .route("/", get(services::list).post(services::create))
        .route("/:service_id", get(services::get).delete(services::delete));

    let template_routes = Router::new()
        .route(
            "/",
            get(endpoints::list_templates).post(endpoints::create_template),
        )
        .route(
            "/:template_id",
            get(endpoints::get_template)
                .put(endpoints::update_template)
                .delete(endpoints::delete_template),
        );

    let api = Router::new()
        .nest("/tokens", token_routes)
        .nest("/tenants", tenant_routes)
        .nest("/users", user_routes)
        .nest("/OS-KSADM/roles", role_routes)
        .nest("/OS-KSADM/services", service_routes)
        .nest("/OS-KSCATALOG/endpointTemplates", template_routes);

    Router::new()
        .route("/health", get(health_check))
        .nest("/v2.0", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "identity-service",
        "backend": match state.config.backend {
            config::BackendKind::Memory => "memory",
            config::BackendKind::Postgres => "postgres",
        },
    }))
}

/// Ensure the configured admin/service-admin roles exist, and create the
/// bootstrap admin account when one is configured. Runs before the core is
/// constructed so the fail-fast role resolution always has something to
/// resolve.
pub async fn bootstrap(
    repos: &Repositories,
    config: &IdentityConfig,
) -> Result<(), ServiceError> {
    for role_name in [&config.admin_role, &config.service_admin_role] {
        if repos.roles.get_by_name(role_name).await?.is_none() {
            let role = repos.roles.create(Role::new(role_name.as_str())).await?;
            tracing::info!(role = %role.name, "bootstrap role created");
        }
    }

    let (Some(name), Some(password)) = (
        &config.bootstrap_admin_user,
        &config.bootstrap_admin_password,
    ) else {
        return Ok(());
    };

    if repos.users.get_by_name(name).await?.is_some() {
        return Ok(());
    }

    let mut user = User::new(name.as_str());
    user.password = Some(hash_password(password)?);
    let user = repos.users.create(user).await?;

    let admin_role = repos
        .roles
        .get_by_name(&config.admin_role)
        .await?
        .ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!("bootstrap admin role vanished"))
        })?;
    repos
        .roles
        .grant_create(UserRoleAssociation::new(&user.id, &admin_role.id, None))
        .await?;
    tracing::info!(user = %user.name, "bootstrap admin user created");
    Ok(())
}
