//! Wire contract: dual JSON/XML rendering and parsing.
//!
//! Handlers extract a [`Wire`] (negotiated from `Accept` / `Content-Type`),
//! parse request bodies through its `parse_*` methods and render document
//! wrappers (`TenantDoc`, `TenantsDoc`, ...) or fault documents through
//! `render` / `fail`. Entity field mapping lives in [`json`]; XML rendering
//! and the XML-to-value conversion in [`xml`].

pub mod json;
pub mod xml;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::models::{
    AuthData, CatalogEndpoint, Credential, Ec2CredentialInput, EndpointTemplateInput,
    EndpointTemplateView, Role, Service, Tenant, User, ValidateData,
};
use crate::pagination::Link;
use crate::services::{AuthRequest, ServiceError};
use crate::signer::SignableRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Json,
    Xml,
}

impl WireFormat {
    fn from_header(value: Option<&str>) -> Self {
        match value {
            Some(value) if value.contains("application/xml") => WireFormat::Xml,
            _ => WireFormat::Json,
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            WireFormat::Json => "application/json",
            WireFormat::Xml => "application/xml",
        }
    }
}

/// A renderable response document.
pub trait Render {
    fn json(&self) -> Value;
    fn xml(&self) -> Result<String, ServiceError>;
}

/// Per-request wire context: response format, request format, and the
/// request URL used as the base of pagination links.
#[derive(Debug, Clone)]
pub struct Wire {
    accept: WireFormat,
    content_type: WireFormat,
    base_url: String,
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Wire {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_str = |name: header::HeaderName| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let host = header_str(header::HOST).unwrap_or_else(|| "localhost".to_string());
        Ok(Wire {
            accept: WireFormat::from_header(header_str(header::ACCEPT).as_deref()),
            content_type: WireFormat::from_header(
                header_str(header::CONTENT_TYPE).as_deref(),
            ),
            base_url: format!("http://{}{}", host, parts.uri.path()),
        })
    }
}

impl Wire {
    /// The request URL without query parameters; pagination links hang off
    /// this.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn render<T: Render>(&self, status: StatusCode, doc: &T) -> Response {
        match self.accept {
            WireFormat::Json => respond(status, WireFormat::Json, doc.json().to_string()),
            WireFormat::Xml => match doc.xml() {
                Ok(body) => respond(status, WireFormat::Xml, body),
                Err(err) => self.fail(err),
            },
        }
    }

    pub fn fail(&self, err: ServiceError) -> Response {
        if let ServiceError::Internal(inner) = &err {
            tracing::error!(error = %inner, "request failed");
        }
        let status = err.status();
        match self.accept {
            WireFormat::Json => {
                respond(status, WireFormat::Json, json::fault_value(&err).to_string())
            }
            WireFormat::Xml => match xml::fault(&err) {
                Ok(body) => respond(status, WireFormat::Xml, body),
                // fall back to JSON rather than answering nothing
                Err(_) => respond(status, WireFormat::Json, json::fault_value(&err).to_string()),
            },
        }
    }

    pub fn no_content() -> Response {
        StatusCode::NO_CONTENT.into_response()
    }

    /// Parse a request document whose root must be one of `roots` (the
    /// prefixed JSON name first, then the XML local name).
    fn parse_doc(&self, body: &[u8], roots: &[&str]) -> Result<Value, ServiceError> {
        match self.content_type {
            WireFormat::Json => {
                let doc: Value = serde_json::from_slice(body)
                    .map_err(|e| ServiceError::BadRequest(format!("malformed json: {e}")))?;
                let (_, body) = json::unwrap_root(&doc, roots)?;
                Ok(body.clone())
            }
            WireFormat::Xml => {
                let text = std::str::from_utf8(body)
                    .map_err(|_| ServiceError::BadRequest("non-utf8 request body".to_string()))?;
                let (root, value) = xml::parse_document(text)?;
                let matches = roots
                    .iter()
                    .any(|name| *name == root || name.ends_with(&format!(":{root}")));
                if !matches {
                    return Err(ServiceError::BadRequest(format!(
                        "expecting a '{}' document",
                        roots[0]
                    )));
                }
                Ok(value)
            }
        }
    }

    pub fn parse_tenant(&self, body: &[u8]) -> Result<Tenant, ServiceError> {
        json::parse_tenant(&self.parse_doc(body, &["tenant"])?)
    }

    pub fn parse_user(&self, body: &[u8]) -> Result<User, ServiceError> {
        json::parse_user(&self.parse_doc(body, &["user"])?)
    }

    pub fn parse_role(&self, body: &[u8]) -> Result<Role, ServiceError> {
        json::parse_role(&self.parse_doc(body, &["role"])?)
    }

    pub fn parse_service(&self, body: &[u8]) -> Result<Service, ServiceError> {
        json::parse_service(&self.parse_doc(body, &["OS-KSADM:service", "service"])?)
    }

    pub fn parse_endpoint_template(
        &self,
        body: &[u8],
    ) -> Result<EndpointTemplateInput, ServiceError> {
        json::parse_endpoint_template(
            &self.parse_doc(body, &["OS-KSCATALOG:endpointTemplate", "endpointTemplate"])?,
        )
    }

    pub fn parse_endpoint_binding(&self, body: &[u8]) -> Result<String, ServiceError> {
        json::parse_endpoint_binding(
            &self.parse_doc(body, &["OS-KSCATALOG:endpointTemplate", "endpointTemplate"])?,
        )
    }

    pub fn parse_password_credentials(
        &self,
        body: &[u8],
    ) -> Result<(String, Option<String>), ServiceError> {
        json::parse_password_credentials(&self.parse_doc(body, &["passwordCredentials"])?)
    }

    pub fn parse_ec2_credential(&self, body: &[u8]) -> Result<Ec2CredentialInput, ServiceError> {
        json::parse_ec2_credential(
            &self.parse_doc(body, &["OS-KSEC2:ec2Credentials", "ec2Credentials"])?,
        )
    }

    /// `POST .../credentials` dispatches on the document root.
    pub fn parse_credential(&self, body: &[u8]) -> Result<CredentialInput, ServiceError> {
        let doc = self.parse_doc(
            body,
            &[
                "passwordCredentials",
                "OS-KSEC2:ec2Credentials",
                "ec2Credentials",
            ],
        );
        // Root detection needs the name, so redo the dispatch by trying the
        // password shape first: it is the only root with a `username`.
        let value = doc?;
        if value.get("username").is_some() {
            let object = value
                .as_object()
                .ok_or_else(|| ServiceError::BadRequest("expecting a credential".to_string()))?;
            return Ok(CredentialInput::Password {
                username: object
                    .get("username")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                password: value
                    .get("password")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            });
        }
        json::parse_ec2_credential(&value).map(CredentialInput::Ec2)
    }

    pub fn parse_auth(&self, body: &[u8]) -> Result<AuthRequest, ServiceError> {
        parse_auth_value(&self.parse_doc(body, &["auth"])?)
    }
}

/// A credential create request, password or EC2 flavored.
pub enum CredentialInput {
    Password {
        username: String,
        password: Option<String>,
    },
    Ec2(Ec2CredentialInput),
}

fn respond(status: StatusCode, format: WireFormat, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, format.content_type())],
        body,
    )
        .into_response()
}

fn parse_auth_value(body: &Value) -> Result<AuthRequest, ServiceError> {
    let object = body
        .as_object()
        .ok_or_else(|| ServiceError::BadRequest("expecting an auth document".to_string()))?;

    let opt_str = |key: &str| -> Option<String> {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let tenant_id = opt_str("tenantId");
    let tenant_name = opt_str("tenantName");

    let required = |o: &Value, key: &str| -> Result<String, ServiceError> {
        o.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ServiceError::BadRequest(format!("expecting a '{key}' attribute")))
    };

    if let Some(credentials) = object.get("passwordCredentials") {
        return Ok(AuthRequest::Password {
            username: required(credentials, "username")?,
            password: required(credentials, "password")?,
            tenant_id,
            tenant_name,
        });
    }

    if let Some(token) = object.get("token") {
        return Ok(AuthRequest::UnscopedToken {
            token_id: required(token, "id")?,
            tenant_id,
            tenant_name,
        });
    }

    for root in ["OS-KSEC2:ec2Credentials", "ec2Credentials"] {
        if let Some(credentials) = object.get(root) {
            let mut params = BTreeMap::new();
            if let Some(raw) = credentials.get("params").and_then(Value::as_object) {
                for (key, value) in raw {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        _ => continue,
                    };
                    params.insert(key.clone(), value);
                }
            }
            return Ok(AuthRequest::Ec2 {
                access: required(credentials, "access")?,
                signature: required(credentials, "signature")?,
                request: SignableRequest {
                    verb: required(credentials, "verb")?,
                    host: required(credentials, "host")?,
                    path: required(credentials, "path")?,
                    params,
                },
            });
        }
    }

    Err(ServiceError::BadRequest(
        "expecting passwordCredentials, token, or ec2Credentials".to_string(),
    ))
}

// ---------------------------------------------------------------------------
// Response documents
// ---------------------------------------------------------------------------

pub struct TenantDoc(pub Tenant);

impl Render for TenantDoc {
    fn json(&self) -> Value {
        json::singleton("tenant", json::tenant_value(&self.0))
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::tenant(&self.0)
    }
}

pub struct TenantsDoc(pub Vec<Tenant>, pub Vec<Link>);

impl Render for TenantsDoc {
    fn json(&self) -> Value {
        json::collection(
            "tenants",
            self.0.iter().map(json::tenant_value).collect(),
            &self.1,
        )
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::tenants(&self.0, &self.1)
    }
}

pub struct UserDoc(pub User);

impl Render for UserDoc {
    fn json(&self) -> Value {
        json::singleton("user", json::user_value(&self.0))
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::user(&self.0)
    }
}

pub struct UsersDoc(pub Vec<User>, pub Vec<Link>);

impl Render for UsersDoc {
    fn json(&self) -> Value {
        json::collection(
            "users",
            self.0.iter().map(json::user_value).collect(),
            &self.1,
        )
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::users(&self.0, &self.1)
    }
}

pub struct RoleDoc(pub Role);

impl Render for RoleDoc {
    fn json(&self) -> Value {
        json::singleton("role", json::role_value(&self.0))
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::role(&self.0)
    }
}

pub struct RolesDoc(pub Vec<Role>, pub Vec<Link>);

impl Render for RolesDoc {
    fn json(&self) -> Value {
        json::collection(
            "roles",
            self.0.iter().map(json::role_value).collect(),
            &self.1,
        )
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::roles(&self.0, &self.1)
    }
}

pub struct ServiceDoc(pub Service);

impl Render for ServiceDoc {
    fn json(&self) -> Value {
        json::singleton("OS-KSADM:service", json::service_value(&self.0))
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::service(&self.0)
    }
}

pub struct ServicesDoc(pub Vec<Service>, pub Vec<Link>);

impl Render for ServicesDoc {
    fn json(&self) -> Value {
        json::collection(
            "OS-KSADM:services",
            self.0.iter().map(json::service_value).collect(),
            &self.1,
        )
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::services(&self.0, &self.1)
    }
}

pub struct EndpointTemplateDoc(pub EndpointTemplateView);

impl Render for EndpointTemplateDoc {
    fn json(&self) -> Value {
        json::singleton("endpointTemplate", json::endpoint_template_value(&self.0))
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::endpoint_template(&self.0)
    }
}

pub struct EndpointTemplatesDoc(pub Vec<EndpointTemplateView>, pub Vec<Link>);

impl Render for EndpointTemplatesDoc {
    fn json(&self) -> Value {
        json::collection(
            "endpointTemplates",
            self.0.iter().map(json::endpoint_template_value).collect(),
            &self.1,
        )
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::endpoint_templates(&self.0, &self.1)
    }
}

pub struct EndpointDoc {
    pub endpoint: CatalogEndpoint,
    pub include_admin_url: bool,
}

impl Render for EndpointDoc {
    fn json(&self) -> Value {
        json::singleton(
            "endpoint",
            json::catalog_endpoint_value(&self.endpoint, self.include_admin_url),
        )
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::endpoint(&self.endpoint, self.include_admin_url)
    }
}

pub struct EndpointsDoc {
    pub endpoints: Vec<CatalogEndpoint>,
    pub links: Vec<Link>,
    pub include_admin_url: bool,
}

impl Render for EndpointsDoc {
    fn json(&self) -> Value {
        json::collection(
            "endpoints",
            self.endpoints
                .iter()
                .map(|e| json::catalog_endpoint_value(e, self.include_admin_url))
                .collect(),
            &self.links,
        )
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::endpoints(&self.endpoints, &self.links, self.include_admin_url)
    }
}

pub struct AuthDoc(pub AuthData);

impl Render for AuthDoc {
    fn json(&self) -> Value {
        json::auth_value(&self.0)
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::auth(&self.0)
    }
}

pub struct ValidateDoc(pub ValidateData);

impl Render for ValidateDoc {
    fn json(&self) -> Value {
        json::validate_value(&self.0)
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::validate(&self.0)
    }
}

pub struct PasswordCredentialsDoc(pub String);

impl Render for PasswordCredentialsDoc {
    fn json(&self) -> Value {
        json::singleton(
            "passwordCredentials",
            json::password_credentials_value(&self.0),
        )
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::password_credentials(&self.0)
    }
}

pub struct Ec2CredentialDoc(pub Credential);

impl Render for Ec2CredentialDoc {
    fn json(&self) -> Value {
        json::singleton("OS-KSEC2:ec2Credentials", json::ec2_credential_value(&self.0))
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::ec2_credential(&self.0)
    }
}

pub struct CredentialsDoc {
    pub username: Option<String>,
    pub ec2: Vec<Credential>,
}

impl Render for CredentialsDoc {
    fn json(&self) -> Value {
        json::credentials_value(self.username.as_deref(), &self.ec2)
    }

    fn xml(&self) -> Result<String, ServiceError> {
        xml::credentials(self.username.as_deref(), &self.ec2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(accept: WireFormat, content_type: WireFormat) -> Wire {
        Wire {
            accept,
            content_type,
            base_url: "http://localhost/v2.0/test".to_string(),
        }
    }

    #[test]
    fn parse_auth_password_from_json() {
        let w = wire(WireFormat::Json, WireFormat::Json);
        let body = json!({
            "auth": {
                "tenantName": "acme",
                "passwordCredentials": {"username": "alice", "password": "p"}
            }
        })
        .to_string();

        match w.parse_auth(body.as_bytes()).unwrap() {
            AuthRequest::Password {
                username,
                password,
                tenant_name,
                tenant_id,
            } => {
                assert_eq!(username, "alice");
                assert_eq!(password, "p");
                assert_eq!(tenant_name.as_deref(), Some("acme"));
                assert_eq!(tenant_id, None);
            }
            other => panic!("wrong auth flavor: {other:?}"),
        }
    }

    #[test]
    fn parse_auth_password_from_xml() {
        let w = wire(WireFormat::Json, WireFormat::Xml);
        let body = "<auth xmlns=\"http://docs.openstack.org/identity/api/v2.0\" \
                    tenantName=\"acme\">\
                      <passwordCredentials username=\"alice\" password=\"p\"/>\
                    </auth>";

        match w.parse_auth(body.as_bytes()).unwrap() {
            AuthRequest::Password {
                username,
                tenant_name,
                ..
            } => {
                assert_eq!(username, "alice");
                assert_eq!(tenant_name.as_deref(), Some("acme"));
            }
            other => panic!("wrong auth flavor: {other:?}"),
        }
    }

    #[test]
    fn parse_auth_token_rescope() {
        let w = wire(WireFormat::Json, WireFormat::Json);
        let body = json!({
            "auth": {"tenantId": "t1", "token": {"id": "tok-1"}}
        })
        .to_string();

        match w.parse_auth(body.as_bytes()).unwrap() {
            AuthRequest::UnscopedToken {
                token_id,
                tenant_id,
                ..
            } => {
                assert_eq!(token_id, "tok-1");
                assert_eq!(tenant_id.as_deref(), Some("t1"));
            }
            other => panic!("wrong auth flavor: {other:?}"),
        }
    }

    #[test]
    fn parse_auth_ec2_collects_params() {
        let w = wire(WireFormat::Json, WireFormat::Json);
        let body = json!({
            "auth": {
                "ec2Credentials": {
                    "access": "AK",
                    "signature": "sig",
                    "verb": "GET",
                    "host": "api.example.com:443",
                    "path": "/services/Cloud",
                    "params": {"SignatureVersion": "2", "Count": 3}
                }
            }
        })
        .to_string();

        match w.parse_auth(body.as_bytes()).unwrap() {
            AuthRequest::Ec2 {
                access,
                signature,
                request,
            } => {
                assert_eq!(access, "AK");
                assert_eq!(signature, "sig");
                assert_eq!(request.host, "api.example.com:443");
                assert_eq!(request.params.get("Count").map(String::as_str), Some("3"));
            }
            other => panic!("wrong auth flavor: {other:?}"),
        }
    }

    #[test]
    fn service_doc_uses_prefixed_json_root() {
        let mut service = Service::new("nova", "compute");
        service.id = "s1".to_string();
        let value = ServiceDoc(service).json();
        assert!(value.get("OS-KSADM:service").is_some());
        assert_eq!(value["OS-KSADM:service"]["type"], "compute");
    }

    #[test]
    fn services_collection_links_key_is_prefixed() {
        let value = ServicesDoc(vec![], vec![]).json();
        assert!(value.get("OS-KSADM:services").is_some());
        assert!(value.get("OS-KSADM:services_links").is_some());
    }

    #[test]
    fn prefixed_json_root_accepts_xml_local_name() {
        let w = wire(WireFormat::Json, WireFormat::Xml);
        let body = "<service xmlns=\"http://docs.openstack.org/identity/api/ext/OS-KSADM/v1.0\" \
                    name=\"nova\" type=\"compute\"/>";
        let service = w.parse_service(body.as_bytes()).unwrap();
        assert_eq!(service.name, "nova");
        assert_eq!(service.kind, "compute");
    }
}
