//! Service registry and endpoint catalog operations.

use crate::models::{
    new_id, CatalogEndpoint, Endpoint, EndpointTemplate, EndpointTemplateInput,
    EndpointTemplateView, Service,
};
use crate::pagination::{get_links, Link};

use super::{IdentityService, ServiceError};

impl IdentityService {
    //
    // Services
    //

    /// The creating user becomes the service owner.
    pub async fn create_service(
        &self,
        admin_token: &str,
        service: Service,
    ) -> Result<Service, ServiceError> {
        let (_token, caller) = self.require_service_admin(admin_token).await?;

        if service.name.trim().is_empty() || service.kind.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "Expecting a Service name and type".to_string(),
            ));
        }
        if self
            .repos
            .services
            .get_by_name_and_kind(&service.name, &service.kind)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(
                "A service with that name already exists".to_string(),
            ));
        }

        let service = Service {
            id: new_id(),
            owner_id: Some(caller.id),
            ..service
        };
        let service = self.repos.services.create(service).await?;
        tracing::info!(service = %service.name, kind = %service.kind, "service created");
        Ok(service)
    }

    pub async fn get_services(
        &self,
        admin_token: &str,
        marker: Option<&str>,
        limit: usize,
        url: &str,
    ) -> Result<(Vec<Service>, Vec<Link>), ServiceError> {
        self.require_service_admin(admin_token).await?;
        let services = self.repos.services.get_page(marker, limit).await?;
        let markers = self.repos.services.get_page_markers(marker, limit).await?;
        Ok((services, get_links(url, &markers, limit)))
    }

    pub async fn get_service(
        &self,
        admin_token: &str,
        service_id: &str,
    ) -> Result<Service, ServiceError> {
        self.require_service_admin(admin_token).await?;
        self.repos
            .services
            .get(service_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The service could not be found".to_string()))
    }

    pub async fn get_service_by_name(
        &self,
        admin_token: &str,
        name: &str,
    ) -> Result<Service, ServiceError> {
        self.require_service_admin(admin_token).await?;
        self.repos
            .services
            .get_by_name(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The service could not be found".to_string()))
    }

    /// Deleting a service removes its endpoint templates (and their tenant
    /// bindings) and its roles (and their grants).
    pub async fn delete_service(
        &self,
        admin_token: &str,
        service_id: &str,
    ) -> Result<(), ServiceError> {
        self.require_service_admin(admin_token).await?;

        let service = self
            .repos
            .services
            .get(service_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The service could not be found".to_string()))?;

        // The adapter removes templates, bindings, roles and grants in the
        // same atomic scope.
        self.repos.services.delete(&service.id).await?;
        tracing::info!(service = %service.name, id = %service.id, "service deleted");
        Ok(())
    }

    //
    // Endpoint templates
    //

    pub async fn add_endpoint_template(
        &self,
        admin_token: &str,
        input: EndpointTemplateInput,
    ) -> Result<EndpointTemplateView, ServiceError> {
        let (_token, caller) = self.require_service_admin(admin_token).await?;

        if input.service_name.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "Expecting Endpoint Template name.".to_string(),
            ));
        }
        if input.service_type.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "Expecting Endpoint Template type.".to_string(),
            ));
        }

        let service = self
            .repos
            .services
            .get_by_name_and_kind(&input.service_name, &input.service_type)
            .await?
            .ok_or_else(|| {
                ServiceError::BadRequest(
                    "A service with that name and type doesn't exist.".to_string(),
                )
            })?;
        self.require_service_ownership(&caller, &service).await?;

        let template = EndpointTemplate {
            id: new_id(),
            service_id: service.id.clone(),
            ..input.template
        };
        let template = self.repos.endpoint_templates.create(template).await?;
        Ok(EndpointTemplateView {
            template,
            service_name: service.name,
            service_type: service.kind,
        })
    }

    /// The template keeps its service; everything else is replaced.
    pub async fn modify_endpoint_template(
        &self,
        admin_token: &str,
        template_id: &str,
        input: EndpointTemplateInput,
    ) -> Result<EndpointTemplateView, ServiceError> {
        let (_token, caller) = self.require_service_admin(admin_token).await?;

        let existing = self
            .repos
            .endpoint_templates
            .get(template_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("The endpoint template could not be found".to_string())
            })?;

        if input.service_name.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "Expecting Endpoint Template name.".to_string(),
            ));
        }
        if input.service_type.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "Expecting Endpoint Template type.".to_string(),
            ));
        }

        let service = self
            .repos
            .services
            .get(&existing.service_id)
            .await?
            .ok_or_else(|| {
                ServiceError::BadRequest(
                    "A service with that name and type doesn't exist.".to_string(),
                )
            })?;
        self.require_service_ownership(&caller, &service).await?;

        let updated = EndpointTemplate {
            id: existing.id,
            service_id: service.id.clone(),
            ..input.template
        };
        let template = self.repos.endpoint_templates.update(updated).await?;
        Ok(EndpointTemplateView {
            template,
            service_name: service.name,
            service_type: service.kind,
        })
    }

    /// Cascades the template's tenant bindings. A template whose service is
    /// gone can only be removed by an admin.
    pub async fn delete_endpoint_template(
        &self,
        admin_token: &str,
        template_id: &str,
    ) -> Result<(), ServiceError> {
        let (_token, caller) = self.require_service_admin(admin_token).await?;

        let template = self
            .repos
            .endpoint_templates
            .get(template_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("The endpoint template could not be found".to_string())
            })?;

        match self.repos.services.get(&template.service_id).await? {
            Some(service) => self.require_service_ownership(&caller, &service).await?,
            None => {
                if !self.user_is_admin(&caller.id).await? {
                    return Err(ServiceError::Unauthorized(
                        "You are not authorized to make this call".to_string(),
                    ));
                }
            }
        }

        // Tenant bindings go with the template, atomically in the adapter.
        self.repos.endpoint_templates.delete(&template.id).await?;
        Ok(())
    }

    pub async fn get_endpoint_templates(
        &self,
        admin_token: &str,
        marker: Option<&str>,
        limit: usize,
        url: &str,
    ) -> Result<(Vec<EndpointTemplateView>, Vec<Link>), ServiceError> {
        self.require_service_admin(admin_token).await?;
        let templates = self.repos.endpoint_templates.get_page(marker, limit).await?;
        let views = self.template_views(templates).await?;
        let markers = self
            .repos
            .endpoint_templates
            .get_page_markers(marker, limit)
            .await?;
        Ok((views, get_links(url, &markers, limit)))
    }

    pub async fn get_endpoint_templates_by_service(
        &self,
        admin_token: &str,
        service_id: &str,
        marker: Option<&str>,
        limit: usize,
        url: &str,
    ) -> Result<(Vec<EndpointTemplateView>, Vec<Link>), ServiceError> {
        self.require_service_admin(admin_token).await?;

        if self.repos.services.get(service_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "No service with the id {service_id} found."
            )));
        }

        let templates = self
            .repos
            .endpoint_templates
            .by_service_page(service_id, marker, limit)
            .await?;
        let views = self.template_views(templates).await?;
        let markers = self
            .repos
            .endpoint_templates
            .by_service_page_markers(service_id, marker, limit)
            .await?;
        Ok((views, get_links(url, &markers, limit)))
    }

    pub async fn get_endpoint_template(
        &self,
        admin_token: &str,
        template_id: &str,
    ) -> Result<EndpointTemplateView, ServiceError> {
        self.require_service_admin(admin_token).await?;

        let template = self
            .repos
            .endpoint_templates
            .get(template_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("The endpoint template could not be found".to_string())
            })?;
        self.template_view(template).await
    }

    async fn template_view(
        &self,
        template: EndpointTemplate,
    ) -> Result<EndpointTemplateView, ServiceError> {
        let service = self.repos.services.get(&template.service_id).await?;
        let (service_name, service_type) = match service {
            Some(service) => (service.name, service.kind),
            None => (String::new(), String::new()),
        };
        Ok(EndpointTemplateView {
            template,
            service_name,
            service_type,
        })
    }

    async fn template_views(
        &self,
        templates: Vec<EndpointTemplate>,
    ) -> Result<Vec<EndpointTemplateView>, ServiceError> {
        let mut views = Vec::with_capacity(templates.len());
        for template in templates {
            views.push(self.template_view(template).await?);
        }
        Ok(views)
    }

    //
    // Tenant endpoints
    //

    pub async fn get_tenant_endpoints(
        &self,
        admin_token: &str,
        tenant_id: &str,
        marker: Option<&str>,
        limit: usize,
        url: &str,
    ) -> Result<(Vec<CatalogEndpoint>, Vec<Link>), ServiceError> {
        self.require_service_admin(admin_token).await?;
        self.fetch_tenant_endpoints(tenant_id, marker, limit, url).await
    }

    async fn fetch_tenant_endpoints(
        &self,
        tenant_id: &str,
        marker: Option<&str>,
        limit: usize,
        url: &str,
    ) -> Result<(Vec<CatalogEndpoint>, Vec<Link>), ServiceError> {
        if tenant_id.is_empty() {
            return Err(ServiceError::BadRequest("Expecting a Tenant Id".to_string()));
        }
        if self.repos.tenants.get(tenant_id).await?.is_none() {
            return Err(ServiceError::NotFound("The tenant not found".to_string()));
        }

        let endpoints = self
            .repos
            .endpoint_templates
            .endpoints_for_tenant_page(tenant_id, marker, limit)
            .await?;

        let mut catalog = Vec::new();
        for endpoint in endpoints {
            if let Some(entry) = self.binding_view(&endpoint).await? {
                catalog.push(entry);
            }
        }

        let markers = self
            .repos
            .endpoint_templates
            .endpoints_for_tenant_page_markers(tenant_id, marker, limit)
            .await?;
        Ok((catalog, get_links(url, &markers, limit)))
    }

    /// Denormalize a tenant binding with its template and service.
    async fn binding_view(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Option<CatalogEndpoint>, ServiceError> {
        let Some(template) = self
            .repos
            .endpoint_templates
            .get(&endpoint.endpoint_template_id)
            .await?
        else {
            tracing::warn!(endpoint = %endpoint.id, "endpoint without template");
            return Ok(None);
        };
        let Some(service) = self.repos.services.get(&template.service_id).await? else {
            tracing::warn!(template = %template.id, "endpoint template without service");
            return Ok(None);
        };

        let mut entry = CatalogEndpoint::from_template(&template, &service.name, &service.kind);
        entry.id = Some(endpoint.id.clone());
        entry.tenant_id = Some(endpoint.tenant_id.clone());
        Ok(Some(entry))
    }

    pub async fn create_endpoint_for_tenant(
        &self,
        admin_token: &str,
        tenant_id: &str,
        template_id: &str,
    ) -> Result<CatalogEndpoint, ServiceError> {
        self.require_service_admin(admin_token).await?;

        if tenant_id.is_empty() {
            return Err(ServiceError::BadRequest("Expecting a Tenant Id.".to_string()));
        }
        if self.repos.tenants.get(tenant_id).await?.is_none() {
            return Err(ServiceError::NotFound("The tenant not found".to_string()));
        }
        if self
            .repos
            .endpoint_templates
            .get(template_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(
                "The endpoint template could not be found".to_string(),
            ));
        }

        let endpoint = self
            .repos
            .endpoint_templates
            .endpoint_add(Endpoint::new(tenant_id, template_id))
            .await?;
        self.binding_view(&endpoint)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The endpoint template could not be found".to_string()))
    }

    pub async fn delete_endpoint(
        &self,
        admin_token: &str,
        endpoint_id: &str,
    ) -> Result<(), ServiceError> {
        self.require_service_admin(admin_token).await?;

        if self
            .repos
            .endpoint_templates
            .endpoint_get(endpoint_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound("The Endpoint is not found.".to_string()));
        }
        self.repos
            .endpoint_templates
            .endpoint_delete(endpoint_id)
            .await?;
        Ok(())
    }

    /// Catalog behind a token: the token must be tenant-scoped.
    pub async fn get_endpoints_for_token(
        &self,
        admin_token: &str,
        token_id: &str,
        marker: Option<&str>,
        limit: usize,
        url: &str,
    ) -> Result<(Vec<CatalogEndpoint>, Vec<Link>), ServiceError> {
        self.require_service_admin(admin_token).await?;

        let token = self
            .repos
            .tokens
            .get(token_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Token not found".to_string()))?;
        let tenant_id = token.tenant_id.as_deref().ok_or_else(|| {
            ServiceError::NotFound("Token not mapped to any tenant.".to_string())
        })?;

        self.fetch_tenant_endpoints(tenant_id, marker, limit, url).await
    }
}
