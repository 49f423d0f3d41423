//! Role operations and role grants.

use crate::models::{new_id, Role, UserRoleAssociation};
use crate::pagination::{get_links, Link};

use super::{IdentityService, ServiceError};

impl IdentityService {
    /// Create a role. A `<service>:` name prefix binds the role to that
    /// service; a supplied `serviceId` must match the prefix and the caller
    /// must own the service or hold admin.
    pub async fn create_role(&self, admin_token: &str, role: Role) -> Result<Role, ServiceError> {
        let (_token, caller) = self.require_service_admin(admin_token).await?;

        if role.name.trim().is_empty() {
            return Err(ServiceError::BadRequest("Expecting a Role name".to_string()));
        }
        if self.repos.roles.get_by_name(&role.name).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A role with that name '{}' already exists",
                role.name
            )));
        }

        let mut service_id = role.service_id.clone();

        // An embedded service prefix resolves the owning service when no
        // explicit reference was supplied.
        if service_id.is_none() {
            if let Some(prefix) = role.service_prefix() {
                let service = self
                    .repos
                    .services
                    .get_by_name(prefix)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::BadRequest(format!(
                            "A service with the name {prefix} doesn't exist."
                        ))
                    })?;
                service_id = Some(service.id);
            }
        }

        if let Some(service_id) = &service_id {
            let service = self
                .repos
                .services
                .get(service_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::BadRequest("A service with that id doesn't exist.".to_string())
                })?;
            if !role.name.starts_with(&format!("{}:", service.name)) {
                return Err(ServiceError::BadRequest(format!(
                    "Role should begin with service name '{}:'",
                    service.name
                )));
            }
            self.require_service_ownership(&caller, &service).await?;
        }

        let role = Role {
            id: new_id(),
            service_id,
            ..role
        };
        let role = self.repos.roles.create(role).await?;
        tracing::info!(role = %role.name, id = %role.id, "role created");
        Ok(role)
    }

    pub async fn get_roles(
        &self,
        admin_token: &str,
        marker: Option<&str>,
        limit: usize,
        url: &str,
    ) -> Result<(Vec<Role>, Vec<Link>), ServiceError> {
        self.require_service_admin(admin_token).await?;
        let roles = self.repos.roles.get_page(marker, limit).await?;
        let markers = self.repos.roles.get_page_markers(marker, limit).await?;
        Ok((roles, get_links(url, &markers, limit)))
    }

    pub async fn get_role(&self, admin_token: &str, role_id: &str) -> Result<Role, ServiceError> {
        self.require_service_admin(admin_token).await?;
        self.repos
            .roles
            .get(role_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The role could not be found".to_string()))
    }

    pub async fn get_role_by_name(
        &self,
        admin_token: &str,
        name: &str,
    ) -> Result<Role, ServiceError> {
        self.require_service_admin(admin_token).await?;
        self.repos
            .roles
            .get_by_name(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The role could not be found".to_string()))
    }

    /// Delete a role and its grants. Service-bound roles take the same
    /// ownership rule as creation.
    pub async fn delete_role(&self, admin_token: &str, role_id: &str) -> Result<(), ServiceError> {
        let (_token, caller) = self.require_service_admin(admin_token).await?;

        let role = self
            .repos
            .roles
            .get(role_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The role could not be found".to_string()))?;

        if let Some(service_id) = &role.service_id {
            if let Some(service) = self.repos.services.get(service_id).await? {
                self.require_service_ownership(&caller, &service).await?;
            }
        }

        self.repos.roles.delete(&role.id).await?;
        tracing::info!(role = %role.name, id = %role.id, "role deleted");
        Ok(())
    }

    pub async fn grant_role_to_user(
        &self,
        admin_token: &str,
        user_id: &str,
        role_id: &str,
        tenant_id: Option<&str>,
    ) -> Result<(), ServiceError> {
        self.require_service_admin(admin_token).await?;

        let user = self
            .repos
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The user could not be found".to_string()))?;
        let role = self
            .repos
            .roles
            .get(role_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The role not found".to_string()))?;
        let tenant_id = match tenant_id {
            Some(tenant_id) => Some(
                self.repos
                    .tenants
                    .get(tenant_id)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("The tenant not found".to_string()))?
                    .id,
            ),
            None => None,
        };

        if self
            .repos
            .roles
            .grant_get(&user.id, &role.id, tenant_id.as_deref())
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(
                "This role is already mapped to the user.".to_string(),
            ));
        }

        self.repos
            .roles
            .grant_create(UserRoleAssociation::new(&user.id, &role.id, tenant_id))
            .await?;
        tracing::info!(user = %user.name, role = %role.name, "role granted");
        Ok(())
    }

    pub async fn revoke_role_from_user(
        &self,
        admin_token: &str,
        user_id: &str,
        role_id: &str,
        tenant_id: Option<&str>,
    ) -> Result<(), ServiceError> {
        self.require_service_admin(admin_token).await?;

        let grant = self
            .repos
            .roles
            .grant_get(user_id, role_id, tenant_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("This role is not mapped to the user.".to_string())
            })?;
        self.repos.roles.grant_delete(&grant.id).await?;
        Ok(())
    }

    /// Page over the roles granted to a user, globally or on one tenant.
    pub async fn get_user_roles(
        &self,
        admin_token: &str,
        user_id: &str,
        tenant_id: Option<&str>,
        marker: Option<&str>,
        limit: usize,
        url: &str,
    ) -> Result<(Vec<Role>, Vec<Link>), ServiceError> {
        self.require_service_admin(admin_token).await?;

        if self.repos.users.get(user_id).await?.is_none() {
            return Err(ServiceError::NotFound(
                "The user could not be found".to_string(),
            ));
        }
        if let Some(tenant_id) = tenant_id {
            if self.repos.tenants.get(tenant_id).await?.is_none() {
                return Err(ServiceError::NotFound(
                    "The tenant could not be found.".to_string(),
                ));
            }
        }

        let grants = self
            .repos
            .roles
            .roles_for_user_page(user_id, tenant_id, marker, limit)
            .await?;
        let mut roles = Vec::new();
        for grant in grants {
            if let Some(role) = self.repos.roles.get(&grant.role_id).await? {
                roles.push(role);
            }
        }
        let markers = self
            .repos
            .roles
            .roles_for_user_page_markers(user_id, tenant_id, marker, limit)
            .await?;
        Ok((roles, get_links(url, &markers, limit)))
    }
}
