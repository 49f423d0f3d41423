//! User operations.

use crate::models::{new_id, User};
use crate::pagination::{get_links, Link};
use crate::utils::password::hash_password;

use super::{IdentityService, ServiceError};

impl IdentityService {
    /// `user.password` arrives as the raw secret and is stored hashed.
    pub async fn create_user(&self, admin_token: &str, user: User) -> Result<User, ServiceError> {
        self.require_admin(admin_token).await?;

        if let Some(tenant_id) = &user.tenant_id {
            self.require_existing_enabled_tenant(tenant_id).await?;
        }

        if user.name.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "Expecting a unique user Name".to_string(),
            ));
        }
        if self.repos.users.get_by_name(&user.name).await?.is_some() {
            return Err(ServiceError::Conflict(
                "A user with that name already exists".to_string(),
            ));
        }
        if let Some(email) = &user.email {
            if self.repos.users.get_by_email(email).await?.is_some() {
                return Err(ServiceError::Conflict(
                    "A user with that email already exists".to_string(),
                ));
            }
        }

        let password = match &user.password {
            Some(raw) => Some(hash_password(raw)?),
            None => None,
        };
        let user = User {
            id: new_id(),
            password,
            ..user
        };
        let user = self.repos.users.create(user).await?;
        tracing::info!(user = %user.name, id = %user.id, "user created");
        Ok(user)
    }

    /// Tenant references on user records must point at a live, enabled
    /// tenant; a missing one is the caller's mistake, not an auth failure.
    async fn require_existing_enabled_tenant(&self, tenant_id: &str) -> Result<(), ServiceError> {
        let tenant = self
            .repos
            .tenants
            .get(tenant_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The tenant is not found".to_string()))?;
        if !tenant.enabled {
            return Err(ServiceError::TenantDisabled(
                "Your account has been disabled".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn get_users(
        &self,
        admin_token: &str,
        marker: Option<&str>,
        limit: usize,
        url: &str,
    ) -> Result<(Vec<User>, Vec<Link>), ServiceError> {
        self.require_admin(admin_token).await?;
        let users = self.repos.users.get_page(marker, limit).await?;
        let markers = self.repos.users.get_page_markers(marker, limit).await?;
        Ok((users, get_links(url, &markers, limit)))
    }

    pub async fn get_tenant_users(
        &self,
        admin_token: &str,
        tenant_id: &str,
        role_id: Option<&str>,
        marker: Option<&str>,
        limit: usize,
        url: &str,
    ) -> Result<(Vec<User>, Vec<Link>), ServiceError> {
        self.require_admin(admin_token).await?;

        let tenant = self
            .repos
            .tenants
            .get(tenant_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The tenant not found".to_string()))?;
        if !tenant.enabled {
            return Err(ServiceError::TenantDisabled(
                "Your account has been disabled".to_string(),
            ));
        }
        if let Some(role_id) = role_id {
            if self.repos.roles.get(role_id).await?.is_none() {
                return Err(ServiceError::NotFound("The role not found".to_string()));
            }
        }

        let users = self
            .repos
            .users
            .users_by_tenant_page(&tenant.id, role_id, marker, limit)
            .await?;
        let markers = self
            .repos
            .users
            .users_by_tenant_page_markers(&tenant.id, role_id, marker, limit)
            .await?;
        Ok((users, get_links(url, &markers, limit)))
    }

    pub async fn get_user(&self, admin_token: &str, user_id: &str) -> Result<User, ServiceError> {
        self.require_admin(admin_token).await?;
        self.repos
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The user could not be found".to_string()))
    }

    pub async fn get_user_by_name(
        &self,
        admin_token: &str,
        name: &str,
    ) -> Result<User, ServiceError> {
        self.require_admin(admin_token).await?;
        self.repos
            .users
            .get_by_name(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The user could not be found".to_string()))
    }

    /// Rename and email change; password, enabled state, and tenant have
    /// their own operations.
    pub async fn update_user(
        &self,
        admin_token: &str,
        user_id: &str,
        patch: User,
    ) -> Result<User, ServiceError> {
        self.require_admin(admin_token).await?;

        let existing = self
            .repos
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The user could not be found".to_string()))?;

        if patch.name.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "Expecting a unique username".to_string(),
            ));
        }
        if patch.name != existing.name
            && self.repos.users.get_by_name(&patch.name).await?.is_some()
        {
            return Err(ServiceError::Conflict(
                "A user with that name already exists".to_string(),
            ));
        }
        if let Some(email) = &patch.email {
            if patch.email != existing.email
                && self.repos.users.get_by_email(email).await?.is_some()
            {
                return Err(ServiceError::Conflict("Email already exists".to_string()));
            }
        }

        let updated = User {
            name: patch.name,
            email: patch.email,
            extra: patch.extra,
            ..existing
        };
        Ok(self.repos.users.update(updated).await?)
    }

    pub async fn set_user_password(
        &self,
        admin_token: &str,
        user_id: &str,
        password: &str,
    ) -> Result<(), ServiceError> {
        self.require_admin(admin_token).await?;

        let user = self
            .repos
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The user could not be found".to_string()))?;

        let updated = User {
            password: Some(hash_password(password)?),
            ..user
        };
        self.repos.users.update(updated).await?;
        tracing::info!(user = %user_id, "password updated");
        Ok(())
    }

    pub async fn set_user_enabled(
        &self,
        admin_token: &str,
        user_id: &str,
        enabled: bool,
    ) -> Result<(), ServiceError> {
        self.require_admin(admin_token).await?;

        let user = self
            .repos
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The user could not be found".to_string()))?;

        let updated = User { enabled, ..user };
        self.repos.users.update(updated).await?;
        tracing::info!(user = %user_id, enabled, "user enabled state changed");
        Ok(())
    }

    pub async fn set_user_tenant(
        &self,
        admin_token: &str,
        user_id: &str,
        tenant_id: Option<String>,
    ) -> Result<(), ServiceError> {
        self.require_admin(admin_token).await?;

        let user = self
            .repos
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The user could not be found".to_string()))?;

        if let Some(tenant_id) = &tenant_id {
            self.require_existing_enabled_tenant(tenant_id).await?;
        }

        let updated = User { tenant_id, ..user };
        self.repos.users.update(updated).await?;
        Ok(())
    }

    pub async fn delete_user(&self, admin_token: &str, user_id: &str) -> Result<(), ServiceError> {
        self.require_admin(admin_token).await?;

        let user = self
            .repos
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The user could not be found".to_string()))?;

        self.repos.users.delete(&user.id).await?;
        tracing::info!(user = %user.name, id = %user.id, "user deleted");
        Ok(())
    }
}
