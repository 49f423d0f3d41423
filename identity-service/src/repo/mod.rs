//! Repository contracts.
//!
//! One trait per entity, all implemented by each backend. The core holds a
//! [`Repositories`] handle built once at startup and never reassigned; the
//! backend behind it is responsible for making multi-row mutations atomic
//! and for surfacing uniqueness violations as [`RepoError::Conflict`].
//!
//! Not-found is `Ok(None)`, never an error. Paging is marker-based over a
//! stable descending id order: a marker names the last item of the previous
//! page and `get_page` returns the items strictly after it.

pub mod memory;
pub mod paging;
pub mod sql;

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{
    Credential, Endpoint, EndpointTemplate, Role, Service, Tenant, Token, User,
    UserRoleAssociation,
};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Uniqueness violation. Distinguishable from generic failure so the
    /// core can answer 409 instead of 500.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Boundary markers of the pages adjacent to the current one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMarkers {
    pub prev: Option<String>,
    pub next: Option<String>,
}

#[async_trait]
pub trait TenantRepo: Send + Sync {
    async fn create(&self, tenant: Tenant) -> RepoResult<Tenant>;
    async fn get(&self, id: &str) -> RepoResult<Option<Tenant>>;
    async fn get_by_name(&self, name: &str) -> RepoResult<Option<Tenant>>;
    async fn update(&self, tenant: Tenant) -> RepoResult<Tenant>;
    async fn delete(&self, id: &str) -> RepoResult<()>;
    async fn get_page(&self, marker: Option<&str>, limit: usize) -> RepoResult<Vec<Tenant>>;
    async fn get_page_markers(&self, marker: Option<&str>, limit: usize)
        -> RepoResult<PageMarkers>;

    /// Tenants reachable by a user: the default tenant plus every tenant the
    /// user holds a role grant on.
    async fn tenants_for_user_page(
        &self,
        user: &User,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<Tenant>>;
    async fn tenants_for_user_page_markers(
        &self,
        user: &User,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers>;

    /// True when no user and no role grant references the tenant.
    async fn is_empty(&self, id: &str) -> RepoResult<bool>;

    /// Union of global endpoint templates and the templates bound to the
    /// tenant through the endpoint table.
    async fn endpoints_for_tenant(&self, tenant_id: &str) -> RepoResult<Vec<EndpointTemplate>>;
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, user: User) -> RepoResult<User>;
    async fn get(&self, id: &str) -> RepoResult<Option<User>>;
    async fn get_by_name(&self, name: &str) -> RepoResult<Option<User>>;
    async fn get_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn update(&self, user: User) -> RepoResult<User>;
    /// Atomic cascade: removes the user's grants with it.
    async fn delete(&self, id: &str) -> RepoResult<()>;
    async fn get_page(&self, marker: Option<&str>, limit: usize) -> RepoResult<Vec<User>>;
    async fn get_page_markers(&self, marker: Option<&str>, limit: usize)
        -> RepoResult<PageMarkers>;

    /// The user, iff associated with the tenant (default tenant or a role
    /// grant on it).
    async fn get_by_tenant(&self, user_id: &str, tenant_id: &str) -> RepoResult<Option<User>>;

    async fn users_by_tenant_page(
        &self,
        tenant_id: &str,
        role_id: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<User>>;
    async fn users_by_tenant_page_markers(
        &self,
        tenant_id: &str,
        role_id: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers>;
}

#[async_trait]
pub trait RoleRepo: Send + Sync {
    async fn create(&self, role: Role) -> RepoResult<Role>;
    async fn get(&self, id: &str) -> RepoResult<Option<Role>>;
    async fn get_by_name(&self, name: &str) -> RepoResult<Option<Role>>;
    /// Atomic cascade: removes the role's grants with it.
    async fn delete(&self, id: &str) -> RepoResult<()>;
    async fn get_page(&self, marker: Option<&str>, limit: usize) -> RepoResult<Vec<Role>>;
    async fn get_page_markers(&self, marker: Option<&str>, limit: usize)
        -> RepoResult<PageMarkers>;

    async fn grant_create(&self, grant: UserRoleAssociation) -> RepoResult<UserRoleAssociation>;
    async fn grant_get(
        &self,
        user_id: &str,
        role_id: &str,
        tenant_id: Option<&str>,
    ) -> RepoResult<Option<UserRoleAssociation>>;
    async fn grant_delete(&self, id: &str) -> RepoResult<()>;
    async fn global_roles_for_user(&self, user_id: &str) -> RepoResult<Vec<UserRoleAssociation>>;
    async fn tenant_roles_for_user(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> RepoResult<Vec<UserRoleAssociation>>;

    /// Page over a user's grants, optionally narrowed to one tenant.
    async fn roles_for_user_page(
        &self,
        user_id: &str,
        tenant_id: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<UserRoleAssociation>>;
    async fn roles_for_user_page_markers(
        &self,
        user_id: &str,
        tenant_id: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers>;
}

#[async_trait]
pub trait ServiceRepo: Send + Sync {
    async fn create(&self, service: Service) -> RepoResult<Service>;
    async fn get(&self, id: &str) -> RepoResult<Option<Service>>;
    async fn get_by_name(&self, name: &str) -> RepoResult<Option<Service>>;
    async fn get_by_name_and_kind(&self, name: &str, kind: &str) -> RepoResult<Option<Service>>;
    /// Atomic cascade: removes the service's endpoint templates, their
    /// tenant bindings, its roles, and their grants.
    async fn delete(&self, id: &str) -> RepoResult<()>;
    async fn get_page(&self, marker: Option<&str>, limit: usize) -> RepoResult<Vec<Service>>;
    async fn get_page_markers(&self, marker: Option<&str>, limit: usize)
        -> RepoResult<PageMarkers>;
}

#[async_trait]
pub trait EndpointTemplateRepo: Send + Sync {
    async fn create(&self, template: EndpointTemplate) -> RepoResult<EndpointTemplate>;
    async fn get(&self, id: &str) -> RepoResult<Option<EndpointTemplate>>;
    async fn update(&self, template: EndpointTemplate) -> RepoResult<EndpointTemplate>;
    /// Atomic cascade: removes the template's tenant bindings with it.
    async fn delete(&self, id: &str) -> RepoResult<()>;
    async fn get_page(&self, marker: Option<&str>, limit: usize)
        -> RepoResult<Vec<EndpointTemplate>>;
    async fn get_page_markers(&self, marker: Option<&str>, limit: usize)
        -> RepoResult<PageMarkers>;
    async fn by_service_page(
        &self,
        service_id: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<EndpointTemplate>>;
    async fn by_service_page_markers(
        &self,
        service_id: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers>;

    async fn endpoint_add(&self, endpoint: Endpoint) -> RepoResult<Endpoint>;
    async fn endpoint_get(&self, id: &str) -> RepoResult<Option<Endpoint>>;
    async fn endpoint_delete(&self, id: &str) -> RepoResult<()>;
    async fn endpoints_for_tenant_page(
        &self,
        tenant_id: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<Endpoint>>;
    async fn endpoints_for_tenant_page_markers(
        &self,
        tenant_id: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers>;
}

#[async_trait]
pub trait TokenRepo: Send + Sync {
    async fn create(&self, token: Token) -> RepoResult<Token>;
    async fn get(&self, id: &str) -> RepoResult<Option<Token>>;
    async fn delete(&self, id: &str) -> RepoResult<()>;

    /// Live token lookup for reuse: the token for `(user_id, tenant_id)`
    /// with the greatest `expires` wins when several exist.
    async fn get_for_user_by_tenant(
        &self,
        user_id: &str,
        tenant_id: Option<&str>,
    ) -> RepoResult<Option<Token>>;
}

#[async_trait]
pub trait CredentialRepo: Send + Sync {
    async fn create(&self, credential: Credential) -> RepoResult<Credential>;
    async fn get(&self, id: &str) -> RepoResult<Option<Credential>>;
    async fn delete(&self, id: &str) -> RepoResult<()>;
    async fn by_user(&self, user_id: &str) -> RepoResult<Vec<Credential>>;

    /// EC2 credential lookup by access key.
    async fn get_by_access(&self, key: &str) -> RepoResult<Option<Credential>>;
}

/// Typed handle over one backend, chosen at process init.
#[derive(Clone)]
pub struct Repositories {
    pub tenants: Arc<dyn TenantRepo>,
    pub users: Arc<dyn UserRepo>,
    pub roles: Arc<dyn RoleRepo>,
    pub services: Arc<dyn ServiceRepo>,
    pub endpoint_templates: Arc<dyn EndpointTemplateRepo>,
    pub tokens: Arc<dyn TokenRepo>,
    pub credentials: Arc<dyn CredentialRepo>,
}

impl Repositories {
    /// In-memory backend, used by embedded deployments and tests.
    pub fn memory() -> Self {
        let backend = Arc::new(memory::MemoryBackend::new());
        Self {
            tenants: backend.clone(),
            users: backend.clone(),
            roles: backend.clone(),
            services: backend.clone(),
            endpoint_templates: backend.clone(),
            tokens: backend.clone(),
            credentials: backend,
        }
    }

    /// PostgreSQL backend over a shared connection pool.
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let backend = Arc::new(sql::PgBackend::new(pool));
        Self {
            tenants: backend.clone(),
            users: backend.clone(),
            roles: backend.clone(),
            services: backend.clone(),
            endpoint_templates: backend.clone(),
            tokens: backend.clone(),
            credentials: backend,
        }
    }
}
