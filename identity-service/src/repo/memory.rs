//! In-memory backend.
//!
//! Every operation takes the store lock once, so multi-row mutations
//! (cascades, grant uniqueness checks, rename checks) are atomic the same
//! way a SQL transaction is. Used by embedded deployments and by the test
//! suites.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::anyhow;
use async_trait::async_trait;

use crate::models::{
    Credential, Endpoint, EndpointTemplate, Role, Service, Tenant, Token, User,
    UserRoleAssociation, EC2_CREDENTIAL_TYPE,
};

use super::paging;
use super::{
    CredentialRepo, EndpointTemplateRepo, PageMarkers, RepoError, RepoResult, RoleRepo,
    ServiceRepo, TenantRepo, TokenRepo, UserRepo,
};

#[derive(Default)]
struct Store {
    tenants: BTreeMap<String, Tenant>,
    users: BTreeMap<String, User>,
    roles: BTreeMap<String, Role>,
    grants: BTreeMap<String, UserRoleAssociation>,
    services: BTreeMap<String, Service>,
    templates: BTreeMap<String, EndpointTemplate>,
    endpoints: BTreeMap<String, Endpoint>,
    tokens: BTreeMap<String, Token>,
    credentials: BTreeMap<String, Credential>,
}

pub struct MemoryBackend {
    store: RwLock<Store>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Values in descending id order, ready for marker paging.
fn sorted_desc<T: Clone>(values: impl Iterator<Item = T>, id_of: impl Fn(&T) -> &str) -> Vec<T> {
    let mut items: Vec<T> = values.collect();
    paging::sort_desc(&mut items, id_of);
    items
}

impl Store {
    fn user_reaches_tenant(&self, user: &User, tenant_id: &str) -> bool {
        if user.tenant_id.as_deref() == Some(tenant_id) {
            return true;
        }
        self.grants
            .values()
            .any(|g| g.user_id == user.id && g.tenant_id.as_deref() == Some(tenant_id))
    }

    fn tenants_for_user(&self, user: &User) -> Vec<Tenant> {
        sorted_desc(
            self.tenants
                .values()
                .filter(|t| self.user_reaches_tenant(user, &t.id))
                .cloned(),
            |t: &Tenant| t.id.as_str(),
        )
    }

    fn users_in_tenant(&self, tenant_id: &str, role_id: Option<&str>) -> Vec<User> {
        sorted_desc(
            self.users
                .values()
                .filter(|u| match role_id {
                    None => self.user_reaches_tenant(u, tenant_id),
                    Some(role_id) => self.grants.values().any(|g| {
                        g.user_id == u.id
                            && g.role_id == role_id
                            && g.tenant_id.as_deref() == Some(tenant_id)
                    }),
                })
                .cloned(),
            |u: &User| u.id.as_str(),
        )
    }

    fn grants_for_user(&self, user_id: &str, tenant_id: Option<&str>) -> Vec<UserRoleAssociation> {
        sorted_desc(
            self.grants
                .values()
                .filter(|g| g.user_id == user_id && g.tenant_id.as_deref() == tenant_id)
                .cloned(),
            |g: &UserRoleAssociation| g.id.as_str(),
        )
    }

    fn endpoints_of_tenant(&self, tenant_id: &str) -> Vec<Endpoint> {
        sorted_desc(
            self.endpoints
                .values()
                .filter(|e| e.tenant_id == tenant_id)
                .cloned(),
            |e: &Endpoint| e.id.as_str(),
        )
    }

    fn templates_of_service(&self, service_id: &str) -> Vec<EndpointTemplate> {
        sorted_desc(
            self.templates
                .values()
                .filter(|t| t.service_id == service_id)
                .cloned(),
            |t: &EndpointTemplate| t.id.as_str(),
        )
    }
}

#[async_trait]
impl TenantRepo for MemoryBackend {
    async fn create(&self, tenant: Tenant) -> RepoResult<Tenant> {
        let mut store = self.write();
        if store.tenants.values().any(|t| t.name == tenant.name) {
            return Err(RepoError::Conflict(format!(
                "tenant name '{}' already exists",
                tenant.name
            )));
        }
        store.tenants.insert(tenant.id.clone(), tenant.clone());
        Ok(tenant)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Tenant>> {
        Ok(self.read().tenants.get(id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> RepoResult<Option<Tenant>> {
        Ok(self.read().tenants.values().find(|t| t.name == name).cloned())
    }

    async fn update(&self, tenant: Tenant) -> RepoResult<Tenant> {
        let mut store = self.write();
        if !store.tenants.contains_key(&tenant.id) {
            return Err(RepoError::Backend(anyhow!("tenant {} not found", tenant.id)));
        }
        if store
            .tenants
            .values()
            .any(|t| t.name == tenant.name && t.id != tenant.id)
        {
            return Err(RepoError::Conflict(format!(
                "tenant name '{}' already exists",
                tenant.name
            )));
        }
        store.tenants.insert(tenant.id.clone(), tenant.clone());
        Ok(tenant)
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        self.write().tenants.remove(id);
        Ok(())
    }

    async fn get_page(&self, marker: Option<&str>, limit: usize) -> RepoResult<Vec<Tenant>> {
        let store = self.read();
        let items = sorted_desc(store.tenants.values().cloned(), |t: &Tenant| t.id.as_str());
        Ok(paging::page(&items, marker, limit, |t| t.id.as_str()))
    }

    async fn get_page_markers(
        &self,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let store = self.read();
        let items = sorted_desc(store.tenants.values().cloned(), |t: &Tenant| t.id.as_str());
        Ok(paging::page_markers(&items, marker, limit, |t| t.id.as_str()))
    }

    async fn tenants_for_user_page(
        &self,
        user: &User,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<Tenant>> {
        let store = self.read();
        let items = store.tenants_for_user(user);
        Ok(paging::page(&items, marker, limit, |t| t.id.as_str()))
    }

    async fn tenants_for_user_page_markers(
        &self,
        user: &User,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let store = self.read();
        let items = store.tenants_for_user(user);
        Ok(paging::page_markers(&items, marker, limit, |t| t.id.as_str()))
    }

    async fn is_empty(&self, id: &str) -> RepoResult<bool> {
        let store = self.read();
        let referenced = store.users.values().any(|u| u.tenant_id.as_deref() == Some(id))
            || store
                .grants
                .values()
                .any(|g| g.tenant_id.as_deref() == Some(id));
        Ok(!referenced)
    }

    async fn endpoints_for_tenant(&self, tenant_id: &str) -> RepoResult<Vec<EndpointTemplate>> {
        let store = self.read();
        let bound: Vec<String> = store
            .endpoints
            .values()
            .filter(|e| e.tenant_id == tenant_id)
            .map(|e| e.endpoint_template_id.clone())
            .collect();
        Ok(sorted_desc(
            store
                .templates
                .values()
                .filter(|t| t.is_global || bound.contains(&t.id))
                .cloned(),
            |t: &EndpointTemplate| t.id.as_str(),
        ))
    }
}

#[async_trait]
impl UserRepo for MemoryBackend {
    async fn create(&self, user: User) -> RepoResult<User> {
        let mut store = self.write();
        if store.users.values().any(|u| u.name == user.name) {
            return Err(RepoError::Conflict(format!(
                "user name '{}' already exists",
                user.name
            )));
        }
        if let Some(email) = &user.email {
            if store.users.values().any(|u| u.email.as_deref() == Some(email)) {
                return Err(RepoError::Conflict(format!(
                    "email '{email}' already exists"
                )));
            }
        }
        store.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<User>> {
        Ok(self.read().users.get(id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> RepoResult<Option<User>> {
        Ok(self.read().users.values().find(|u| u.name == name).cloned())
    }

    async fn get_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self
            .read()
            .users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn update(&self, user: User) -> RepoResult<User> {
        let mut store = self.write();
        if !store.users.contains_key(&user.id) {
            return Err(RepoError::Backend(anyhow!("user {} not found", user.id)));
        }
        if store
            .users
            .values()
            .any(|u| u.name == user.name && u.id != user.id)
        {
            return Err(RepoError::Conflict(format!(
                "user name '{}' already exists",
                user.name
            )));
        }
        if let Some(email) = &user.email {
            if store
                .users
                .values()
                .any(|u| u.email.as_deref() == Some(email) && u.id != user.id)
            {
                return Err(RepoError::Conflict(format!(
                    "email '{email}' already exists"
                )));
            }
        }
        store.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        let mut store = self.write();
        store.users.remove(id);
        store.grants.retain(|_, g| g.user_id != id);
        Ok(())
    }

    async fn get_page(&self, marker: Option<&str>, limit: usize) -> RepoResult<Vec<User>> {
        let store = self.read();
        let items = sorted_desc(store.users.values().cloned(), |u: &User| u.id.as_str());
        Ok(paging::page(&items, marker, limit, |u| u.id.as_str()))
    }

    async fn get_page_markers(
        &self,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let store = self.read();
        let items = sorted_desc(store.users.values().cloned(), |u: &User| u.id.as_str());
        Ok(paging::page_markers(&items, marker, limit, |u| u.id.as_str()))
    }

    async fn get_by_tenant(&self, user_id: &str, tenant_id: &str) -> RepoResult<Option<User>> {
        let store = self.read();
        Ok(store
            .users
            .get(user_id)
            .filter(|u| store.user_reaches_tenant(u, tenant_id))
            .cloned())
    }

    async fn users_by_tenant_page(
        &self,
        tenant_id: &str,
        role_id: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<User>> {
        let store = self.read();
        let items = store.users_in_tenant(tenant_id, role_id);
        Ok(paging::page(&items, marker, limit, |u| u.id.as_str()))
    }

    async fn users_by_tenant_page_markers(
        &self,
        tenant_id: &str,
        role_id: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let store = self.read();
        let items = store.users_in_tenant(tenant_id, role_id);
        Ok(paging::page_markers(&items, marker, limit, |u| u.id.as_str()))
    }
}

#[async_trait]
impl RoleRepo for MemoryBackend {
    async fn create(&self, role: Role) -> RepoResult<Role> {
        let mut store = self.write();
        if store.roles.values().any(|r| r.name == role.name) {
            return Err(RepoError::Conflict(format!(
                "role name '{}' already exists",
                role.name
            )));
        }
        store.roles.insert(role.id.clone(), role.clone());
        Ok(role)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Role>> {
        Ok(self.read().roles.get(id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> RepoResult<Option<Role>> {
        Ok(self.read().roles.values().find(|r| r.name == name).cloned())
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        let mut store = self.write();
        store.roles.remove(id);
        store.grants.retain(|_, g| g.role_id != id);
        Ok(())
    }

    async fn get_page(&self, marker: Option<&str>, limit: usize) -> RepoResult<Vec<Role>> {
        let store = self.read();
        let items = sorted_desc(store.roles.values().cloned(), |r: &Role| r.id.as_str());
        Ok(paging::page(&items, marker, limit, |r| r.id.as_str()))
    }

    async fn get_page_markers(
        &self,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let store = self.read();
        let items = sorted_desc(store.roles.values().cloned(), |r: &Role| r.id.as_str());
        Ok(paging::page_markers(&items, marker, limit, |r| r.id.as_str()))
    }

    async fn grant_create(&self, grant: UserRoleAssociation) -> RepoResult<UserRoleAssociation> {
        let mut store = self.write();
        let duplicate = store.grants.values().any(|g| {
            g.user_id == grant.user_id
                && g.role_id == grant.role_id
                && g.tenant_id == grant.tenant_id
        });
        if duplicate {
            return Err(RepoError::Conflict(
                "this role is already mapped to the user".to_string(),
            ));
        }
        store.grants.insert(grant.id.clone(), grant.clone());
        Ok(grant)
    }

    async fn grant_get(
        &self,
        user_id: &str,
        role_id: &str,
        tenant_id: Option<&str>,
    ) -> RepoResult<Option<UserRoleAssociation>> {
        Ok(self
            .read()
            .grants
            .values()
            .find(|g| {
                g.user_id == user_id
                    && g.role_id == role_id
                    && g.tenant_id.as_deref() == tenant_id
            })
            .cloned())
    }

    async fn grant_delete(&self, id: &str) -> RepoResult<()> {
        self.write().grants.remove(id);
        Ok(())
    }

    async fn global_roles_for_user(&self, user_id: &str) -> RepoResult<Vec<UserRoleAssociation>> {
        Ok(self.read().grants_for_user(user_id, None))
    }

    async fn tenant_roles_for_user(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> RepoResult<Vec<UserRoleAssociation>> {
        Ok(self.read().grants_for_user(user_id, Some(tenant_id)))
    }

    async fn roles_for_user_page(
        &self,
        user_id: &str,
        tenant_id: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<UserRoleAssociation>> {
        let store = self.read();
        let items = store.grants_for_user(user_id, tenant_id);
        Ok(paging::page(&items, marker, limit, |g| g.id.as_str()))
    }

    async fn roles_for_user_page_markers(
        &self,
        user_id: &str,
        tenant_id: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let store = self.read();
        let items = store.grants_for_user(user_id, tenant_id);
        Ok(paging::page_markers(&items, marker, limit, |g| g.id.as_str()))
    }
}

#[async_trait]
impl ServiceRepo for MemoryBackend {
    async fn create(&self, service: Service) -> RepoResult<Service> {
        let mut store = self.write();
        if store
            .services
            .values()
            .any(|s| s.name == service.name && s.kind == service.kind)
        {
            return Err(RepoError::Conflict(format!(
                "service '{}' of type '{}' already exists",
                service.name, service.kind
            )));
        }
        store.services.insert(service.id.clone(), service.clone());
        Ok(service)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Service>> {
        Ok(self.read().services.get(id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> RepoResult<Option<Service>> {
        Ok(self
            .read()
            .services
            .values()
            .find(|s| s.name == name)
            .cloned())
    }

    async fn get_by_name_and_kind(&self, name: &str, kind: &str) -> RepoResult<Option<Service>> {
        Ok(self
            .read()
            .services
            .values()
            .find(|s| s.name == name && s.kind == kind)
            .cloned())
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        let mut store = self.write();

        let template_ids: Vec<String> = store
            .templates
            .values()
            .filter(|t| t.service_id == id)
            .map(|t| t.id.clone())
            .collect();
        store
            .endpoints
            .retain(|_, e| !template_ids.contains(&e.endpoint_template_id));
        for template_id in &template_ids {
            store.templates.remove(template_id);
        }

        let role_ids: Vec<String> = store
            .roles
            .values()
            .filter(|r| r.service_id.as_deref() == Some(id))
            .map(|r| r.id.clone())
            .collect();
        store.grants.retain(|_, g| !role_ids.contains(&g.role_id));
        for role_id in &role_ids {
            store.roles.remove(role_id);
        }

        store.services.remove(id);
        Ok(())
    }

    async fn get_page(&self, marker: Option<&str>, limit: usize) -> RepoResult<Vec<Service>> {
        let store = self.read();
        let items = sorted_desc(store.services.values().cloned(), |s: &Service| s.id.as_str());
        Ok(paging::page(&items, marker, limit, |s| s.id.as_str()))
    }

    async fn get_page_markers(
        &self,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let store = self.read();
        let items = sorted_desc(store.services.values().cloned(), |s: &Service| s.id.as_str());
        Ok(paging::page_markers(&items, marker, limit, |s| s.id.as_str()))
    }
}

#[async_trait]
impl EndpointTemplateRepo for MemoryBackend {
    async fn create(&self, template: EndpointTemplate) -> RepoResult<EndpointTemplate> {
        self.write()
            .templates
            .insert(template.id.clone(), template.clone());
        Ok(template)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<EndpointTemplate>> {
        Ok(self.read().templates.get(id).cloned())
    }

    async fn update(&self, template: EndpointTemplate) -> RepoResult<EndpointTemplate> {
        let mut store = self.write();
        if !store.templates.contains_key(&template.id) {
            return Err(RepoError::Backend(anyhow!(
                "endpoint template {} not found",
                template.id
            )));
        }
        store.templates.insert(template.id.clone(), template.clone());
        Ok(template)
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        let mut store = self.write();
        store.endpoints.retain(|_, e| e.endpoint_template_id != id);
        store.templates.remove(id);
        Ok(())
    }

    async fn get_page(
        &self,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<EndpointTemplate>> {
        let store = self.read();
        let items = sorted_desc(store.templates.values().cloned(), |t: &EndpointTemplate| {
            t.id.as_str()
        });
        Ok(paging::page(&items, marker, limit, |t| t.id.as_str()))
    }

    async fn get_page_markers(
        &self,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let store = self.read();
        let items = sorted_desc(store.templates.values().cloned(), |t: &EndpointTemplate| {
            t.id.as_str()
        });
        Ok(paging::page_markers(&items, marker, limit, |t| t.id.as_str()))
    }

    async fn by_service_page(
        &self,
        service_id: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<EndpointTemplate>> {
        let store = self.read();
        let items = store.templates_of_service(service_id);
        Ok(paging::page(&items, marker, limit, |t| t.id.as_str()))
    }

    async fn by_service_page_markers(
        &self,
        service_id: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let store = self.read();
        let items = store.templates_of_service(service_id);
        Ok(paging::page_markers(&items, marker, limit, |t| t.id.as_str()))
    }

    async fn endpoint_add(&self, endpoint: Endpoint) -> RepoResult<Endpoint> {
        self.write()
            .endpoints
            .insert(endpoint.id.clone(), endpoint.clone());
        Ok(endpoint)
    }

    async fn endpoint_get(&self, id: &str) -> RepoResult<Option<Endpoint>> {
        Ok(self.read().endpoints.get(id).cloned())
    }

    async fn endpoint_delete(&self, id: &str) -> RepoResult<()> {
        self.write().endpoints.remove(id);
        Ok(())
    }

    async fn endpoints_for_tenant_page(
        &self,
        tenant_id: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<Vec<Endpoint>> {
        let store = self.read();
        let items = store.endpoints_of_tenant(tenant_id);
        Ok(paging::page(&items, marker, limit, |e| e.id.as_str()))
    }

    async fn endpoints_for_tenant_page_markers(
        &self,
        tenant_id: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> RepoResult<PageMarkers> {
        let store = self.read();
        let items = store.endpoints_of_tenant(tenant_id);
        Ok(paging::page_markers(&items, marker, limit, |e| e.id.as_str()))
    }
}

#[async_trait]
impl TokenRepo for MemoryBackend {
    async fn create(&self, token: Token) -> RepoResult<Token> {
        self.write().tokens.insert(token.id.clone(), token.clone());
        Ok(token)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Token>> {
        Ok(self.read().tokens.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        self.write().tokens.remove(id);
        Ok(())
    }

    async fn get_for_user_by_tenant(
        &self,
        user_id: &str,
        tenant_id: Option<&str>,
    ) -> RepoResult<Option<Token>> {
        Ok(self
            .read()
            .tokens
            .values()
            .filter(|t| t.user_id == user_id && t.tenant_id.as_deref() == tenant_id)
            .max_by_key(|t| t.expires)
            .cloned())
    }
}

#[async_trait]
impl CredentialRepo for MemoryBackend {
    async fn create(&self, credential: Credential) -> RepoResult<Credential> {
        let mut store = self.write();
        if store
            .credentials
            .values()
            .any(|c| c.kind == credential.kind && c.key == credential.key)
        {
            return Err(RepoError::Conflict(format!(
                "credential key '{}' already exists",
                credential.key
            )));
        }
        store
            .credentials
            .insert(credential.id.clone(), credential.clone());
        Ok(credential)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Credential>> {
        Ok(self.read().credentials.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        self.write().credentials.remove(id);
        Ok(())
    }

    async fn by_user(&self, user_id: &str) -> RepoResult<Vec<Credential>> {
        Ok(sorted_desc(
            self.read()
                .credentials
                .values()
                .filter(|c| c.user_id == user_id)
                .cloned(),
            |c: &Credential| c.id.as_str(),
        ))
    }

    async fn get_by_access(&self, key: &str) -> RepoResult<Option<Credential>> {
        Ok(self
            .read()
            .credentials
            .values()
            .find(|c| c.kind == EC2_CREDENTIAL_TYPE && c.key == key)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tenant_name_is_unique() {
        let backend = MemoryBackend::new();
        TenantRepo::create(&backend, Tenant::new("acme")).await.unwrap();
        let err = TenantRepo::create(&backend, Tenant::new("acme"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));
    }

    #[tokio::test]
    async fn token_reuse_picks_greatest_expiry() {
        let backend = MemoryBackend::new();
        let short = Token::new("u1", Some("t1".into()), chrono::Duration::hours(1));
        let long = Token::new("u1", Some("t1".into()), chrono::Duration::hours(10));
        TokenRepo::create(&backend, short).await.unwrap();
        TokenRepo::create(&backend, long.clone()).await.unwrap();

        let found = backend
            .get_for_user_by_tenant("u1", Some("t1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, long.id);
    }

    #[tokio::test]
    async fn duplicate_grant_is_a_conflict() {
        let backend = MemoryBackend::new();
        let grant = UserRoleAssociation::new("u1", "r1", Some("t1".into()));
        backend.grant_create(grant).await.unwrap();

        let dup = UserRoleAssociation::new("u1", "r1", Some("t1".into()));
        let err = backend.grant_create(dup).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));

        // same pair on another tenant is fine
        backend
            .grant_create(UserRoleAssociation::new("u1", "r1", None))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn tenant_emptiness_tracks_users_and_grants() {
        let backend = MemoryBackend::new();
        let tenant = TenantRepo::create(&backend, Tenant::new("acme")).await.unwrap();
        assert!(backend.is_empty(&tenant.id).await.unwrap());

        let mut user = User::new("alice");
        user.tenant_id = Some(tenant.id.clone());
        UserRepo::create(&backend, user).await.unwrap();
        assert!(!backend.is_empty(&tenant.id).await.unwrap());
    }

    #[tokio::test]
    async fn service_delete_cascades_templates_bindings_roles_and_grants() {
        let backend = MemoryBackend::new();

        let service = ServiceRepo::create(&backend, Service::new("nova", "compute"))
            .await
            .unwrap();
        let template = EndpointTemplateRepo::create(&backend, EndpointTemplate::new(&service.id))
            .await
            .unwrap();
        let endpoint = backend
            .endpoint_add(Endpoint::new("t1", template.id.clone()))
            .await
            .unwrap();

        let mut role = Role::new("nova:admin");
        role.service_id = Some(service.id.clone());
        let role = RoleRepo::create(&backend, role).await.unwrap();
        backend
            .grant_create(UserRoleAssociation::new("u1", &role.id, None))
            .await
            .unwrap();

        ServiceRepo::delete(&backend, &service.id).await.unwrap();

        assert!(ServiceRepo::get(&backend, &service.id).await.unwrap().is_none());
        assert!(EndpointTemplateRepo::get(&backend, &template.id)
            .await
            .unwrap()
            .is_none());
        assert!(backend.endpoint_get(&endpoint.id).await.unwrap().is_none());
        assert!(RoleRepo::get(&backend, &role.id).await.unwrap().is_none());
        assert!(backend
            .global_roles_for_user("u1")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn catalog_unions_global_and_bound_templates() {
        let backend = MemoryBackend::new();

        let mut global = EndpointTemplate::new("svc");
        global.is_global = true;
        let global = EndpointTemplateRepo::create(&backend, global).await.unwrap();

        let bound = EndpointTemplateRepo::create(&backend, EndpointTemplate::new("svc"))
            .await
            .unwrap();
        let unbound = EndpointTemplateRepo::create(&backend, EndpointTemplate::new("svc"))
            .await
            .unwrap();

        backend
            .endpoint_add(Endpoint::new("t1", bound.id.clone()))
            .await
            .unwrap();

        let catalog = backend.endpoints_for_tenant("t1").await.unwrap();
        let ids: Vec<&str> = catalog.iter().map(|t| t.id.as_str()).collect();
        assert!(ids.contains(&global.id.as_str()));
        assert!(ids.contains(&bound.id.as_str()));
        assert!(!ids.contains(&unbound.id.as_str()));
    }
}
