//! Endpoint templates and their tenant bindings.

use super::{new_id, Extra};

/// A regional URL set for a service. Global templates appear in every
/// tenant's catalog; non-global ones only where an [`Endpoint`] binds them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointTemplate {
    pub id: String,
    pub region: Option<String>,
    pub service_id: String,
    pub public_url: Option<String>,
    pub admin_url: Option<String>,
    pub internal_url: Option<String>,
    pub enabled: bool,
    pub is_global: bool,
    pub version_id: Option<String>,
    pub version_list: Option<String>,
    pub version_info: Option<String>,
    pub extra: Extra,
}

impl EndpointTemplate {
    pub fn new(service_id: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            service_id: service_id.into(),
            enabled: true,
            ..Default::default()
        }
    }
}

/// Binding of an endpoint template to a tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub id: String,
    pub tenant_id: String,
    pub endpoint_template_id: String,
}

impl Endpoint {
    pub fn new(tenant_id: impl Into<String>, endpoint_template_id: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            tenant_id: tenant_id.into(),
            endpoint_template_id: endpoint_template_id.into(),
        }
    }
}

/// Create/update input for a template: the service is named by
/// `(name, type)` and resolved by the core.
#[derive(Debug, Clone)]
pub struct EndpointTemplateInput {
    pub service_name: String,
    pub service_type: String,
    pub template: EndpointTemplate,
}

/// Endpoint template denormalized with its owning service, the shape the
/// admin API renders.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointTemplateView {
    pub template: EndpointTemplate,
    pub service_name: String,
    pub service_type: String,
}

/// One entry of a tenant's endpoint catalog: the template's URL set plus the
/// owning service's name and type, and the binding id when tenant-bound.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEndpoint {
    pub id: Option<String>,
    pub tenant_id: Option<String>,
    pub region: Option<String>,
    pub service_name: String,
    pub service_type: String,
    pub public_url: Option<String>,
    pub admin_url: Option<String>,
    pub internal_url: Option<String>,
    pub version_id: Option<String>,
    pub version_list: Option<String>,
    pub version_info: Option<String>,
    pub extra: Extra,
}

impl CatalogEndpoint {
    pub fn from_template(
        template: &EndpointTemplate,
        service_name: &str,
        service_type: &str,
    ) -> Self {
        Self {
            id: None,
            tenant_id: None,
            region: template.region.clone(),
            service_name: service_name.to_string(),
            service_type: service_type.to_string(),
            public_url: template.public_url.clone(),
            admin_url: template.admin_url.clone(),
            internal_url: template.internal_url.clone(),
            version_id: template.version_id.clone(),
            version_list: template.version_list.clone(),
            version_info: template.version_info.clone(),
            extra: template.extra.clone(),
        }
    }
}
