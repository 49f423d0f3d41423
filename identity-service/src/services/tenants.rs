//! Tenant operations.

use crate::models::{new_id, Tenant};
use crate::pagination::{get_links, Link};

use super::{IdentityService, ServiceError};

impl IdentityService {
    pub async fn create_tenant(
        &self,
        admin_token: &str,
        tenant: Tenant,
    ) -> Result<Tenant, ServiceError> {
        self.require_admin(admin_token).await?;

        if tenant.name.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "Expecting a unique Tenant Name".to_string(),
            ));
        }
        if self.repos.tenants.get_by_name(&tenant.name).await?.is_some() {
            return Err(ServiceError::Conflict(
                "A tenant with that name already exists".to_string(),
            ));
        }

        let tenant = Tenant {
            id: new_id(),
            ..tenant
        };
        let tenant = self.repos.tenants.create(tenant).await?;
        tracing::info!(tenant = %tenant.name, id = %tenant.id, "tenant created");
        Ok(tenant)
    }

    /// Admin callers list every tenant; any other valid token lists the
    /// tenants its user can reach (default tenant plus role grants).
    pub async fn get_tenants(
        &self,
        token_id: &str,
        marker: Option<&str>,
        limit: usize,
        url: &str,
    ) -> Result<(Vec<Tenant>, Vec<Link>), ServiceError> {
        let caller = self.validate_claim(token_id, None, false).await?.1;

        if self.user_is_admin(&caller.id).await? {
            let tenants = self.repos.tenants.get_page(marker, limit).await?;
            let markers = self.repos.tenants.get_page_markers(marker, limit).await?;
            return Ok((tenants, get_links(url, &markers, limit)));
        }

        let tenants = self
            .repos
            .tenants
            .tenants_for_user_page(&caller, marker, limit)
            .await?;
        let markers = self
            .repos
            .tenants
            .tenants_for_user_page_markers(&caller, marker, limit)
            .await?;
        Ok((tenants, get_links(url, &markers, limit)))
    }

    pub async fn get_tenant(
        &self,
        admin_token: &str,
        tenant_id: &str,
    ) -> Result<Tenant, ServiceError> {
        self.require_admin(admin_token).await?;
        self.repos
            .tenants
            .get(tenant_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The tenant could not be found".to_string()))
    }

    pub async fn get_tenant_by_name(
        &self,
        admin_token: &str,
        name: &str,
    ) -> Result<Tenant, ServiceError> {
        self.require_admin(admin_token).await?;
        self.repos
            .tenants
            .get_by_name(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The tenant could not be found".to_string()))
    }

    pub async fn update_tenant(
        &self,
        admin_token: &str,
        tenant_id: &str,
        patch: Tenant,
    ) -> Result<Tenant, ServiceError> {
        self.require_admin(admin_token).await?;

        let existing = self
            .repos
            .tenants
            .get(tenant_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The tenant could not be found".to_string()))?;

        if patch.name.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "Expecting a unique Tenant Name".to_string(),
            ));
        }
        if patch.name != existing.name
            && self.repos.tenants.get_by_name(&patch.name).await?.is_some()
        {
            return Err(ServiceError::Conflict(
                "A tenant with that name already exists".to_string(),
            ));
        }

        let updated = Tenant {
            id: existing.id,
            name: patch.name,
            description: patch.description,
            enabled: patch.enabled,
            extra: patch.extra,
        };
        Ok(self.repos.tenants.update(updated).await?)
    }

    /// Refused while any user or role grant still references the tenant.
    pub async fn delete_tenant(
        &self,
        admin_token: &str,
        tenant_id: &str,
    ) -> Result<(), ServiceError> {
        self.require_admin(admin_token).await?;

        let tenant = self
            .repos
            .tenants
            .get(tenant_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The tenant could not be found".to_string()))?;

        if !self.repos.tenants.is_empty(&tenant.id).await? {
            return Err(ServiceError::Forbidden(
                "You may not delete a tenant that contains users".to_string(),
            ));
        }

        self.repos.tenants.delete(&tenant.id).await?;
        tracing::info!(tenant = %tenant.name, id = %tenant.id, "tenant deleted");
        Ok(())
    }
}
