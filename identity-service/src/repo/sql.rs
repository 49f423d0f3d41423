//! PostgreSQL backend over sqlx.
//!
//! Queries are runtime-checked strings bound positionally, one wrapper
//! method per repository operation. Uniqueness is enforced by the schema;
//! unique-violation errors surface as [`RepoError::Conflict`]. Marker
//! arithmetic reuses the same [`paging`] helpers as the in-memory backend
//! over the filtered id list, so both adapters page identically.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;

use crate::models::{
    Credential, Endpoint, EndpointTemplate, Extra, Role, Service, Tenant, Token, User,
    UserRoleAssociation, EC2_CREDENTIAL_TYPE,
};

use super::paging;
use super::{
    CredentialRepo, EndpointTemplateRepo, PageMarkers, RepoError, RepoResult, RoleRepo,
    ServiceRepo, TenantRepo, TokenRepo, UserRepo,
};

pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const UNIQUE_VIOLATION: &str = "23505";

fn db_err(e: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return RepoError::Conflict(db.message().to_string());
        }
    }
    RepoError::Backend(anyhow::Error::new(e))
}

fn extra_from(value: serde_json::Value) -> Extra {
    value.as_object().cloned().unwrap_or_default()
}

fn extra_to(extra: &Extra) -> serde_json::Value {
    serde_json::Value::Object(extra.clone())
}

fn markers_of(ids: Vec<String>, marker: Option<&str>, limit: usize) -> PageMarkers {
    paging::page_markers(&ids, marker, limit, |id| id.as_str())
}

#[derive(sqlx::FromRow)]
struct TenantRow {
    id: String,
    name: String,
    description: Option<String>,
    enabled: bool,
    extra: serde_json::Value,
}

impl From<TenantRow> for Tenant {
    fn from(r: TenantRow) -> Self {
        Tenant {
            id: r.id,
            name: r.name,
            description: r.description,
            enabled: r.enabled,
            extra: extra_from(r.extra),
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    password: Option<String>,
    email: Option<String>,
    enabled: bool,
    tenant_id: Option<String>,
    extra: serde_json::Value,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            name: r.name,
            password: r.password,
            email: r.email,
            enabled: r.enabled,
            tenant_id: r.tenant_id,
            extra: extra_from(r.extra),
        }
    }
}

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: String,
    name: String,
    description: Option<String>,
    service_id: Option<String>,
}

impl From<RoleRow> for Role {
    fn from(r: RoleRow) -> Self {
        Role {
            id: r.id,
            name: r.name,
            description: r.description,
            service_id: r.service_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ServiceRow {
    id: String,
    name: String,
    r#type: String,
    description: Option<String>,
    owner_id: Option<String>,
}

impl From<ServiceRow> for Service {
    fn from(r: ServiceRow) -> Self {
        Service {
            id: r.id,
            name: r.name,
            kind: r.r#type,
            description: r.description,
            owner_id: r.owner_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TemplateRow {
    id: String,
    region: Option<String>,
    service_id: String,
    public_url: Option<String>,
    admin_url: Option<String>,
    internal_url: Option<String>,
    enabled: bool,
    is_global: bool,
    version_id: Option<String>,
    version_list: Option<String>,
    version_info: Option<String>,
    extra: serde_json::Value,
}

impl From<TemplateRow> for EndpointTemplate {
    fn from(r: TemplateRow) -> Self {
        EndpointTemplate {
            id: r.id,
            region: r.region,
            service_id: r.service_id,
            public_url: r.public_url,
            admin_url: r.admin_url,
            internal_url: r.internal_url,
            enabled: r.enabled,
            is_global: r.is_global,
            version_id: r.version_id,
            version_list: r.version_list,
            version_info: r.version_info,
            extra: extra_from(r.extra),
        }
    }
}

#[derive(sqlx::FromRow)]
struct EndpointRow {
    id: String,
    tenant_id: String,
    endpoint_template_id: String,
}

impl From<EndpointRow> for Endpoint {
    fn from(r: EndpointRow) -> Self {
        Endpoint {
            id: r.id,
            tenant_id: r.tenant_id,
            endpoint_template_id: r.endpoint_template_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GrantRow {
    id: String,
    user_id: String,
    role_id: String,
    tenant_id: Option<String>,
}

impl From<GrantRow> for UserRoleAssociation {
    fn from(r: GrantRow) -> Self {
        UserRoleAssociation {
            id: r.id,
            user_id: r.user_id,
            role_id: r.role_id,
            tenant_id: r.tenant_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: String,
    user_id: String,
    tenant_id: Option<String>,
    expires: DateTime<Utc>,
}

impl From<TokenRow> for Token {
    fn from(r: TokenRow) -> Self {
        Token {
            id: r.id,
            user_id: r.user_id,
            tenant_id: r.tenant_id,
            expires: r.expires,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: String,
    user_id: String,
    tenant_id: Option<String>,
    r#type: String,
    key: String,
    secret: String,
}

impl From<CredentialRow> for Credential {
    fn from(r: CredentialRow) -> Self {
        Credential {
            id: r.id,
            user_id: r.user_id,
            tenant_id: r.tenant_id,
            kind: r.r#type,
            key: r.key,
            secret: r.secret,
        }
    }
}

const TENANTS_FOR_USER: &str = r#"
    SELECT * FROM tenants
    WHERE id IN (
        SELECT tenant_id FROM user_roles WHERE user_id = $1 AND tenant_id IS NOT NULL
        UNION
        SELECT tenant_id FROM users WHERE id = $1 AND tenant_id IS NOT NULL
    )
"#;

#[async_trait]
impl TenantRepo for PgBackend {
    async fn create(&self, tenant: Tenant) -> RepoResult<Tenant> {
        sqlx::query(
            "INSERT INTO tenants (id, name, description, enabled, extra)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.description)
        .bind(tenant.enabled)
        .bind(extra_to(&tenant.extra))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(tenant)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Tenant>> {
        sqlx::query_as::<_, TenantRow>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(Tenant::from))
            .map_err(db_err)
    }

    async fn get_by_name(&self, name: &str) -> RepoResult<Option<Tenant>> {
        sqlx::query_as::<_, TenantRow>("SELECT * FROM tenants WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(Tenant::from))
            .map_err(db_err)
    }

    async fn update(&self, tenant: Tenant) -> RepoResult<Tenant> {
        let result = sqlx::query(
            "UPDATE tenants SET name = $2, description = $3, enabled = $4, extra = $5
             WHERE id = $1",
        )
        .bind(&tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.description)
        .bind(tenant.enabled)
        .bind(extra_to(&tenant.extra))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::Backend(anyhow!("tenant {} not found", tenant.id)));
        }
        Ok(tenant)
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_page(&self, marker: Option<&str>, limit: usize) -> RepoResult<Vec<Tenant>> {
        sqlx::query_as::<_, TenantRow>(
            "SELECT * FROM tenants WHERE ($1::text IS NULL OR id < $1)
             ORDER BY id DESC LIMIT $2",
        )
        .bind(marker)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Tenant::from).collect())
        .map_err(db_err)
    }

    async fn get_page_markers(
        &self,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM tenants ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(markers_of(ids, marker, limit))
    }

    async fn tenants_for_user_page(
        &self,
        user: &User,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<Tenant>> {
        let sql = format!(
            "{TENANTS_FOR_USER} AND ($2::text IS NULL OR id < $2) ORDER BY id DESC LIMIT $3"
        );
        sqlx::query_as::<_, TenantRow>(&sql)
            .bind(&user.id)
            .bind(marker)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.into_iter().map(Tenant::from).collect())
            .map_err(db_err)
    }

    async fn tenants_for_user_page_markers(
        &self,
        user: &User,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let sql = format!("SELECT id FROM ({TENANTS_FOR_USER}) t ORDER BY id DESC");
        let ids = sqlx::query_scalar::<_, String>(&sql)
            .bind(&user.id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(markers_of(ids, marker, limit))
    }

    async fn is_empty(&self, id: &str) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT NOT EXISTS (SELECT 1 FROM users WHERE tenant_id = $1)
                AND NOT EXISTS (SELECT 1 FROM user_roles WHERE tenant_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn endpoints_for_tenant(&self, tenant_id: &str) -> RepoResult<Vec<EndpointTemplate>> {
        sqlx::query_as::<_, TemplateRow>(
            "SELECT * FROM endpoint_templates
             WHERE is_global
                OR id IN (SELECT endpoint_template_id FROM endpoints WHERE tenant_id = $1)
             ORDER BY id DESC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(EndpointTemplate::from).collect())
        .map_err(db_err)
    }
}

const USERS_IN_TENANT: &str = r#"
    SELECT * FROM users u
    WHERE u.tenant_id = $1
       OR EXISTS (SELECT 1 FROM user_roles ur
                  WHERE ur.user_id = u.id AND ur.tenant_id = $1)
"#;

const USERS_IN_TENANT_WITH_ROLE: &str = r#"
    SELECT * FROM users u
    WHERE EXISTS (SELECT 1 FROM user_roles ur
                  WHERE ur.user_id = u.id AND ur.tenant_id = $1 AND ur.role_id = $2)
"#;

#[async_trait]
impl UserRepo for PgBackend {
    async fn create(&self, user: User) -> RepoResult<User> {
        sqlx::query(
            "INSERT INTO users (id, name, password, email, enabled, tenant_id, extra)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.password)
        .bind(&user.email)
        .bind(user.enabled)
        .bind(&user.tenant_id)
        .bind(extra_to(&user.extra))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(user)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(User::from))
            .map_err(db_err)
    }

    async fn get_by_name(&self, name: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(User::from))
            .map_err(db_err)
    }

    async fn get_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(User::from))
            .map_err(db_err)
    }

    async fn update(&self, user: User) -> RepoResult<User> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, password = $3, email = $4, enabled = $5,
                              tenant_id = $6, extra = $7
             WHERE id = $1",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.password)
        .bind(&user.email)
        .bind(user.enabled)
        .bind(&user.tenant_id)
        .bind(extra_to(&user.extra))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::Backend(anyhow!("user {} not found", user.id)));
        }
        Ok(user)
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_page(&self, marker: Option<&str>, limit: usize) -> RepoResult<Vec<User>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE ($1::text IS NULL OR id < $1)
             ORDER BY id DESC LIMIT $2",
        )
        .bind(marker)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(User::from).collect())
        .map_err(db_err)
    }

    async fn get_page_markers(
        &self,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM users ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(markers_of(ids, marker, limit))
    }

    async fn get_by_tenant(&self, user_id: &str, tenant_id: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users u
             WHERE u.id = $1
               AND (u.tenant_id = $2
                    OR EXISTS (SELECT 1 FROM user_roles ur
                               WHERE ur.user_id = u.id AND ur.tenant_id = $2))",
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map(|r| r.map(User::from))
        .map_err(db_err)
    }

    async fn users_by_tenant_page(
        &self,
        tenant_id: &str,
        role_id: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<User>> {
        let rows = match role_id {
            None => {
                let sql = format!(
                    "{USERS_IN_TENANT} AND ($2::text IS NULL OR u.id < $2)
                     ORDER BY u.id DESC LIMIT $3"
                );
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(tenant_id)
                    .bind(marker)
                    .bind(limit as i64)
                    .fetch_all(&self.pool)
                    .await
            }
            Some(role_id) => {
                let sql = format!(
                    "{USERS_IN_TENANT_WITH_ROLE} AND ($3::text IS NULL OR u.id < $3)
                     ORDER BY u.id DESC LIMIT $4"
                );
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(tenant_id)
                    .bind(role_id)
                    .bind(marker)
                    .bind(limit as i64)
                    .fetch_all(&self.pool)
                    .await
            }
        };
        rows.map(|rows| rows.into_iter().map(User::from).collect())
            .map_err(db_err)
    }

    async fn users_by_tenant_page_markers(
        &self,
        tenant_id: &str,
        role_id: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let ids = match role_id {
            None => {
                let sql = format!("SELECT id FROM ({USERS_IN_TENANT}) u ORDER BY id DESC");
                sqlx::query_scalar::<_, String>(&sql)
                    .bind(tenant_id)
                    .fetch_all(&self.pool)
                    .await
            }
            Some(role_id) => {
                let sql =
                    format!("SELECT id FROM ({USERS_IN_TENANT_WITH_ROLE}) u ORDER BY id DESC");
                sqlx::query_scalar::<_, String>(&sql)
                    .bind(tenant_id)
                    .bind(role_id)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(db_err)?;
        Ok(markers_of(ids, marker, limit))
    }
}

#[async_trait]
impl RoleRepo for PgBackend {
    async fn create(&self, role: Role) -> RepoResult<Role> {
        sqlx::query(
            "INSERT INTO roles (id, name, description, service_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(&role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(&role.service_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(role)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Role>> {
        sqlx::query_as::<_, RoleRow>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(Role::from))
            .map_err(db_err)
    }

    async fn get_by_name(&self, name: &str) -> RepoResult<Option<Role>> {
        sqlx::query_as::<_, RoleRow>("SELECT * FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(Role::from))
            .map_err(db_err)
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("DELETE FROM user_roles WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_page(&self, marker: Option<&str>, limit: usize) -> RepoResult<Vec<Role>> {
        sqlx::query_as::<_, RoleRow>(
            "SELECT * FROM roles WHERE ($1::text IS NULL OR id < $1)
             ORDER BY id DESC LIMIT $2",
        )
        .bind(marker)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Role::from).collect())
        .map_err(db_err)
    }

    async fn get_page_markers(
        &self,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM roles ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(markers_of(ids, marker, limit))
    }

    async fn grant_create(&self, grant: UserRoleAssociation) -> RepoResult<UserRoleAssociation> {
        sqlx::query(
            "INSERT INTO user_roles (id, user_id, role_id, tenant_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(&grant.id)
        .bind(&grant.user_id)
        .bind(&grant.role_id)
        .bind(&grant.tenant_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(grant)
    }

    async fn grant_get(
        &self,
        user_id: &str,
        role_id: &str,
        tenant_id: Option<&str>,
    ) -> RepoResult<Option<UserRoleAssociation>> {
        sqlx::query_as::<_, GrantRow>(
            "SELECT * FROM user_roles
             WHERE user_id = $1 AND role_id = $2 AND tenant_id IS NOT DISTINCT FROM $3",
        )
        .bind(user_id)
        .bind(role_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map(|r| r.map(UserRoleAssociation::from))
        .map_err(db_err)
    }

    async fn grant_delete(&self, id: &str) -> RepoResult<()> {
        sqlx::query("DELETE FROM user_roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn global_roles_for_user(&self, user_id: &str) -> RepoResult<Vec<UserRoleAssociation>> {
        sqlx::query_as::<_, GrantRow>(
            "SELECT * FROM user_roles WHERE user_id = $1 AND tenant_id IS NULL
             ORDER BY id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(UserRoleAssociation::from).collect())
        .map_err(db_err)
    }

    async fn tenant_roles_for_user(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> RepoResult<Vec<UserRoleAssociation>> {
        sqlx::query_as::<_, GrantRow>(
            "SELECT * FROM user_roles WHERE user_id = $1 AND tenant_id = $2
             ORDER BY id DESC",
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(UserRoleAssociation::from).collect())
        .map_err(db_err)
    }

    async fn roles_for_user_page(
        &self,
        user_id: &str,
        tenant_id: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<UserRoleAssociation>> {
        sqlx::query_as::<_, GrantRow>(
            "SELECT * FROM user_roles
             WHERE user_id = $1 AND tenant_id IS NOT DISTINCT FROM $2
               AND ($3::text IS NULL OR id < $3)
             ORDER BY id DESC LIMIT $4",
        )
        .bind(user_id)
        .bind(tenant_id)
        .bind(marker)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(UserRoleAssociation::from).collect())
        .map_err(db_err)
    }

    async fn roles_for_user_page_markers(
        &self,
        user_id: &str,
        tenant_id: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT id FROM user_roles
             WHERE user_id = $1 AND tenant_id IS NOT DISTINCT FROM $2
             ORDER BY id DESC",
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(markers_of(ids, marker, limit))
    }
}

#[async_trait]
impl ServiceRepo for PgBackend {
    async fn create(&self, service: Service) -> RepoResult<Service> {
        sqlx::query(
            "INSERT INTO services (id, name, type, description, owner_id)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&service.id)
        .bind(&service.name)
        .bind(&service.kind)
        .bind(&service.description)
        .bind(&service.owner_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(service)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Service>> {
        sqlx::query_as::<_, ServiceRow>("SELECT * FROM services WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(Service::from))
            .map_err(db_err)
    }

    async fn get_by_name(&self, name: &str) -> RepoResult<Option<Service>> {
        sqlx::query_as::<_, ServiceRow>("SELECT * FROM services WHERE name = $1 LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(Service::from))
            .map_err(db_err)
    }

    async fn get_by_name_and_kind(&self, name: &str, kind: &str) -> RepoResult<Option<Service>> {
        sqlx::query_as::<_, ServiceRow>("SELECT * FROM services WHERE name = $1 AND type = $2")
            .bind(name)
            .bind(kind)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(Service::from))
            .map_err(db_err)
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query(
            "DELETE FROM endpoints WHERE endpoint_template_id IN
                 (SELECT id FROM endpoint_templates WHERE service_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        sqlx::query("DELETE FROM endpoint_templates WHERE service_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query(
            "DELETE FROM user_roles WHERE role_id IN
                 (SELECT id FROM roles WHERE service_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        sqlx::query("DELETE FROM roles WHERE service_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_page(&self, marker: Option<&str>, limit: usize) -> RepoResult<Vec<Service>> {
        sqlx::query_as::<_, ServiceRow>(
            "SELECT * FROM services WHERE ($1::text IS NULL OR id < $1)
             ORDER BY id DESC LIMIT $2",
        )
        .bind(marker)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Service::from).collect())
        .map_err(db_err)
    }

    async fn get_page_markers(
        &self,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM services ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(markers_of(ids, marker, limit))
    }
}

#[async_trait]
impl EndpointTemplateRepo for PgBackend {
    async fn create(&self, template: EndpointTemplate) -> RepoResult<EndpointTemplate> {
        sqlx::query(
            "INSERT INTO endpoint_templates
                 (id, region, service_id, public_url, admin_url, internal_url,
                  enabled, is_global, version_id, version_list, version_info, extra)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(&template.id)
        .bind(&template.region)
        .bind(&template.service_id)
        .bind(&template.public_url)
        .bind(&template.admin_url)
        .bind(&template.internal_url)
        .bind(template.enabled)
        .bind(template.is_global)
        .bind(&template.version_id)
        .bind(&template.version_list)
        .bind(&template.version_info)
        .bind(extra_to(&template.extra))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(template)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<EndpointTemplate>> {
        sqlx::query_as::<_, TemplateRow>("SELECT * FROM endpoint_templates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(EndpointTemplate::from))
            .map_err(db_err)
    }

    async fn update(&self, template: EndpointTemplate) -> RepoResult<EndpointTemplate> {
        let result = sqlx::query(
            "UPDATE endpoint_templates
             SET region = $2, service_id = $3, public_url = $4, admin_url = $5,
                 internal_url = $6, enabled = $7, is_global = $8,
                 version_id = $9, version_list = $10, version_info = $11, extra = $12
             WHERE id = $1",
        )
        .bind(&template.id)
        .bind(&template.region)
        .bind(&template.service_id)
        .bind(&template.public_url)
        .bind(&template.admin_url)
        .bind(&template.internal_url)
        .bind(template.enabled)
        .bind(template.is_global)
        .bind(&template.version_id)
        .bind(&template.version_list)
        .bind(&template.version_info)
        .bind(extra_to(&template.extra))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::Backend(anyhow!(
                "endpoint template {} not found",
                template.id
            )));
        }
        Ok(template)
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("DELETE FROM endpoints WHERE endpoint_template_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM endpoint_templates WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_page(
        &self,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<EndpointTemplate>> {
        sqlx::query_as::<_, TemplateRow>(
            "SELECT * FROM endpoint_templates WHERE ($1::text IS NULL OR id < $1)
             ORDER BY id DESC LIMIT $2",
        )
        .bind(marker)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(EndpointTemplate::from).collect())
        .map_err(db_err)
    }

    async fn get_page_markers(
        &self,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let ids =
            sqlx::query_scalar::<_, String>("SELECT id FROM endpoint_templates ORDER BY id DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(markers_of(ids, marker, limit))
    }

    async fn by_service_page(
        &self,
        service_id: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<EndpointTemplate>> {
        sqlx::query_as::<_, TemplateRow>(
            "SELECT * FROM endpoint_templates
             WHERE service_id = $1 AND ($2::text IS NULL OR id < $2)
             ORDER BY id DESC LIMIT $3",
        )
        .bind(service_id)
        .bind(marker)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(EndpointTemplate::from).collect())
        .map_err(db_err)
    }

    async fn by_service_page_markers(
        &self,
        service_id: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT id FROM endpoint_templates WHERE service_id = $1 ORDER BY id DESC",
        )
        .bind(service_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(markers_of(ids, marker, limit))
    }

    async fn endpoint_add(&self, endpoint: Endpoint) -> RepoResult<Endpoint> {
        sqlx::query(
            "INSERT INTO endpoints (id, tenant_id, endpoint_template_id) VALUES ($1, $2, $3)",
        )
        .bind(&endpoint.id)
        .bind(&endpoint.tenant_id)
        .bind(&endpoint.endpoint_template_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(endpoint)
    }

    async fn endpoint_get(&self, id: &str) -> RepoResult<Option<Endpoint>> {
        sqlx::query_as::<_, EndpointRow>("SELECT * FROM endpoints WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(Endpoint::from))
            .map_err(db_err)
    }

    async fn endpoint_delete(&self, id: &str) -> RepoResult<()> {
        sqlx::query("DELETE FROM endpoints WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn endpoints_for_tenant_page(
        &self,
        tenant_id: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<Endpoint>> {
        sqlx::query_as::<_, EndpointRow>(
            "SELECT * FROM endpoints
             WHERE tenant_id = $1 AND ($2::text IS NULL OR id < $2)
             ORDER BY id DESC LIMIT $3",
        )
        .bind(tenant_id)
        .bind(marker)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Endpoint::from).collect())
        .map_err(db_err)
    }

    async fn endpoints_for_tenant_page_markers(
        &self,
        tenant_id: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT id FROM endpoints WHERE tenant_id = $1 ORDER BY id DESC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(markers_of(ids, marker, limit))
    }
}

#[async_trait]
impl TokenRepo for PgBackend {
    async fn create(&self, token: Token) -> RepoResult<Token> {
        sqlx::query("INSERT INTO tokens (id, user_id, tenant_id, expires) VALUES ($1, $2, $3, $4)")
            .bind(&token.id)
            .bind(&token.user_id)
            .bind(&token.tenant_id)
            .bind(token.expires)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(token)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Token>> {
        sqlx::query_as::<_, TokenRow>("SELECT * FROM tokens WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(Token::from))
            .map_err(db_err)
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        sqlx::query("DELETE FROM tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_for_user_by_tenant(
        &self,
        user_id: &str,
        tenant_id: Option<&str>,
    ) -> RepoResult<Option<Token>> {
        sqlx::query_as::<_, TokenRow>(
            "SELECT * FROM tokens
             WHERE user_id = $1 AND tenant_id IS NOT DISTINCT FROM $2
             ORDER BY expires DESC LIMIT 1",
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map(|r| r.map(Token::from))
        .map_err(db_err)
    }
}

#[async_trait]
impl CredentialRepo for PgBackend {
    async fn create(&self, credential: Credential) -> RepoResult<Credential> {
        sqlx::query(
            "INSERT INTO credentials (id, user_id, tenant_id, type, key, secret)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&credential.id)
        .bind(&credential.user_id)
        .bind(&credential.tenant_id)
        .bind(&credential.kind)
        .bind(&credential.key)
        .bind(&credential.secret)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(credential)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Credential>> {
        sqlx::query_as::<_, CredentialRow>("SELECT * FROM credentials WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(Credential::from))
            .map_err(db_err)
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        sqlx::query("DELETE FROM credentials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn by_user(&self, user_id: &str) -> RepoResult<Vec<Credential>> {
        sqlx::query_as::<_, CredentialRow>(
            "SELECT * FROM credentials WHERE user_id = $1 ORDER BY id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Credential::from).collect())
        .map_err(db_err)
    }

    async fn get_by_access(&self, key: &str) -> RepoResult<Option<Credential>> {
        sqlx::query_as::<_, CredentialRow>(
            "SELECT * FROM credentials WHERE type = $1 AND key = $2",
        )
        .bind(EC2_CREDENTIAL_TYPE)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map(|r| r.map(Credential::from))
        .map_err(db_err)
    }
}
