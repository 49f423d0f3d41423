//! Claim validation.
//!
//! The middleware itself is thin: everything it knows about a token comes
//! from a [`TokenValidator`]. Services co-located with the identity core wire
//! in an embedded validator; everyone else uses [`RemoteValidator`], which
//! calls `GET /v2.0/tokens/<claim>` on the identity service with an admin
//! token and, for capability discovery, `GET /v2.0/tokens/<claim>/endpoints`.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::AuthTokenConfig;
use crate::error::{MiddlewareError, ValidationFailed};

/// Normalized identity attached to a confirmed request.
#[derive(Debug, Clone, Default)]
pub struct IdentityClaims {
    pub user_id: String,
    pub user_name: String,
    pub tenant_id: Option<String>,
    pub tenant_name: Option<String>,
    pub roles: Vec<String>,
    pub capabilities: Vec<String>,
}

#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, claim: &str) -> Result<IdentityClaims, ValidationFailed>;
}

/// Validates claims over HTTPS against a remote identity service.
pub struct RemoteValidator {
    client: reqwest::Client,
    auth_url: String,
    admin_token: String,
}

impl RemoteValidator {
    pub fn new(config: &AuthTokenConfig) -> Result<Self, MiddlewareError> {
        let mut builder = reqwest::Client::builder();

        if let (Some(certfile), Some(keyfile)) = (&config.certfile, &config.keyfile) {
            let mut pem = std::fs::read(certfile)
                .map_err(|e| MiddlewareError::Config(format!("cannot read {certfile}: {e}")))?;
            pem.extend(
                std::fs::read(keyfile)
                    .map_err(|e| MiddlewareError::Config(format!("cannot read {keyfile}: {e}")))?,
            );
            let identity = reqwest::Identity::from_pem(&pem)?;
            builder = builder.identity(identity);
        }

        Ok(Self {
            client: builder.build()?,
            auth_url: config.auth_url(),
            admin_token: config.admin_token.clone(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value, ValidationFailed> {
        let resp = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .header("X-Auth-Token", &self.admin_token)
            .send()
            .await
            .map_err(|e| ValidationFailed::new(format!("identity service unreachable: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ValidationFailed::new(format!(
                "identity service answered {status}"
            )));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| ValidationFailed::new(format!("unparseable validation response: {e}")))
    }
}

#[async_trait]
impl TokenValidator for RemoteValidator {
    async fn validate(&self, claim: &str) -> Result<IdentityClaims, ValidationFailed> {
        let token_info = self
            .get_json(&format!("{}/v2.0/tokens/{}", self.auth_url, claim))
            .await?;

        let mut claims = parse_token_info(&token_info)
            .ok_or_else(|| ValidationFailed::new("malformed validation response"))?;

        // Capability discovery is best-effort: a claim without a catalog is
        // still a valid claim.
        match self
            .get_json(&format!("{}/v2.0/tokens/{}/endpoints", self.auth_url, claim))
            .await
        {
            Ok(catalog) => {
                if let Some(caps) = compute_capabilities(&catalog) {
                    claims.capabilities = caps;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "no endpoint catalog for claim");
            }
        }

        Ok(claims)
    }
}

/// Extract identity attributes from a `GET /v2.0/tokens/<id>` response.
pub(crate) fn parse_token_info(token_info: &Value) -> Option<IdentityClaims> {
    let access = token_info.get("access")?;
    let user = access.get("user")?;

    let roles = user
        .get("roles")
        .and_then(Value::as_array)
        .map(|roles| {
            roles
                .iter()
                .filter_map(|r| r.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    // Tenant lives on the token when scoped; fall back to the user's default
    // tenant attributes for older response shapes.
    let (tenant_id, tenant_name) = match access.get("token").and_then(|t| t.get("tenant")) {
        Some(tenant) => (
            tenant.get("id").and_then(Value::as_str).map(str::to_string),
            tenant
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
        ),
        None => (
            user.get("tenantId")
                .and_then(Value::as_str)
                .map(str::to_string),
            user.get("tenantName")
                .and_then(Value::as_str)
                .map(str::to_string),
        ),
    };

    Some(IdentityClaims {
        user_id: user.get("id")?.as_str()?.to_string(),
        user_name: user.get("name")?.as_str()?.to_string(),
        tenant_id,
        tenant_name,
        roles,
        capabilities: Vec::new(),
    })
}

/// Pull capabilities off `compute`-type endpoints, and only those; other
/// service types do not feed `X-Capabilities`.
pub(crate) fn compute_capabilities(catalog: &Value) -> Option<Vec<String>> {
    for endpoint in catalog.get("endpoints")?.as_array()? {
        if endpoint.get("type").and_then(Value::as_str) != Some("compute") {
            continue;
        }
        if let Some(caps) = endpoint.get("capabilities").and_then(Value::as_array) {
            return Some(
                caps.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            );
        }
    }
    None
}
