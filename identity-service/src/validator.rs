//! Embedded token validator.
//!
//! Services deployed in the same process as the identity core hand this to
//! the auth-token middleware instead of the HTTPS validator: same claims,
//! no network hop.

use std::sync::Arc;

use async_trait::async_trait;
use auth_token::{IdentityClaims, TokenValidator, ValidationFailed};

use crate::services::IdentityService;

pub struct CoreValidator {
    identity: Arc<IdentityService>,
}

impl CoreValidator {
    pub fn new(identity: Arc<IdentityService>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl TokenValidator for CoreValidator {
    async fn validate(&self, claim: &str) -> Result<IdentityClaims, ValidationFailed> {
        let (data, catalog) = self
            .identity
            .validate_claim_with_catalog(claim)
            .await
            .map_err(|e| ValidationFailed::new(e.to_string()))?;

        // Capabilities ride on compute endpoints only.
        let capabilities = catalog
            .iter()
            .filter(|entry| entry.service_type == "compute")
            .find_map(|entry| entry.extra.get("capabilities").and_then(|v| v.as_array()))
            .map(|caps| {
                caps.iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let (tenant_id, tenant_name) = match &data.tenant {
            Some(tenant) => (Some(tenant.id.clone()), Some(tenant.name.clone())),
            None => (data.user.tenant_id.clone(), data.user_tenant_name.clone()),
        };

        Ok(IdentityClaims {
            user_id: data.user.id,
            user_name: data.user.name,
            tenant_id,
            tenant_name,
            roles: data.roles.iter().map(|g| g.role.name.clone()).collect(),
            capabilities,
        })
    }
}
