//! JSON rendering and the entity builders shared by both wire formats.
//!
//! Rendering: contract attributes under their external names
//! (`tenantId`, `serviceId`, `publicURL`, ...), null fields omitted, ids as
//! strings, passthrough `extra` keys re-emitted as-is.
//!
//! Parsing: builders take the unwrapped root object. XML requests are
//! first converted to the same shape by [`super::xml::parse_document`], so
//! type coercion (`enabled` accepting bools, numbers and strings) and the
//! Service/Role attribute whitelist live here once.

use serde_json::{json, Map, Value};

use crate::models::{
    AuthData, CatalogEndpoint, Credential, Ec2CredentialInput, EndpointTemplate,
    EndpointTemplateInput, EndpointTemplateView, Extra, GrantedRole, Role, Service, Tenant, User,
    ValidateData,
};
use crate::pagination::Link;
use crate::services::ServiceError;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn bad_request(msg: impl Into<String>) -> ServiceError {
    ServiceError::BadRequest(msg.into())
}

/// `enabled` arrives as a bool, a 0/1 number, or a string spelling of
/// either, case-insensitively.
pub fn coerce_enabled(value: &Value) -> Result<bool, ServiceError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(bad_request(format!("invalid enabled value: {n}"))),
        },
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(bad_request(format!("invalid enabled value: '{other}'"))),
        },
        other => Err(bad_request(format!("invalid enabled value: {other}"))),
    }
}

fn as_string(value: &Value, attribute: &str) -> Result<String, ServiceError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(bad_request(format!("attribute '{attribute}' must be a string"))),
    }
}

fn required_str(object: &Map<String, Value>, attribute: &str) -> Result<String, ServiceError> {
    match object.get(attribute) {
        Some(v) => as_string(v, attribute),
        None => Err(bad_request(format!("expecting a '{attribute}' attribute"))),
    }
}

fn optional_str(
    object: &Map<String, Value>,
    attribute: &str,
) -> Result<Option<String>, ServiceError> {
    match object.get(attribute) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => as_string(v, attribute).map(Some),
    }
}

fn expect_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, ServiceError> {
    value
        .as_object()
        .ok_or_else(|| bad_request(format!("expecting a {what}")))
}

/// Find the document's root among the accepted names and return its body.
pub fn unwrap_root<'a>(
    doc: &'a Value,
    names: &[&'a str],
) -> Result<(&'a str, &'a Value), ServiceError> {
    let object = expect_object(doc, "document body")?;
    for name in names {
        if let Some(body) = object.get(*name) {
            return Ok((name, body));
        }
    }
    Err(bad_request(format!("expecting a '{}' document", names[0])))
}

fn insert_opt(object: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        object.insert(key.to_string(), Value::String(value.clone()));
    }
}

fn with_extra(mut object: Map<String, Value>, extra: &Extra) -> Value {
    for (key, value) in extra {
        object.entry(key.clone()).or_insert_with(|| value.clone());
    }
    Value::Object(object)
}

pub fn links_value(links: &[Link]) -> Value {
    Value::Array(
        links
            .iter()
            .map(|l| json!({"rel": l.rel, "href": l.href}))
            .collect(),
    )
}

/// `{"<root>": {...}}`
pub fn singleton(root: &str, body: Value) -> Value {
    let mut object = Map::new();
    object.insert(root.to_string(), body);
    Value::Object(object)
}

/// `{"<root>": [...], "<root>_links": [...]}`
pub fn collection(root: &str, items: Vec<Value>, links: &[Link]) -> Value {
    let mut object = Map::new();
    object.insert(root.to_string(), Value::Array(items));
    object.insert(format!("{root}_links"), links_value(links));
    Value::Object(object)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn tenant_value(tenant: &Tenant) -> Value {
    let mut object = Map::new();
    object.insert("id".to_string(), Value::String(tenant.id.clone()));
    object.insert("name".to_string(), Value::String(tenant.name.clone()));
    insert_opt(&mut object, "description", &tenant.description);
    object.insert("enabled".to_string(), Value::Bool(tenant.enabled));
    with_extra(object, &tenant.extra)
}

/// Password is never rendered.
pub fn user_value(user: &User) -> Value {
    let mut object = Map::new();
    object.insert("id".to_string(), Value::String(user.id.clone()));
    object.insert("name".to_string(), Value::String(user.name.clone()));
    insert_opt(&mut object, "email", &user.email);
    object.insert("enabled".to_string(), Value::Bool(user.enabled));
    insert_opt(&mut object, "tenantId", &user.tenant_id);
    with_extra(object, &user.extra)
}

pub fn role_value(role: &Role) -> Value {
    let mut object = Map::new();
    object.insert("id".to_string(), Value::String(role.id.clone()));
    object.insert("name".to_string(), Value::String(role.name.clone()));
    insert_opt(&mut object, "description", &role.description);
    insert_opt(&mut object, "serviceId", &role.service_id);
    Value::Object(object)
}

pub fn service_value(service: &Service) -> Value {
    let mut object = Map::new();
    object.insert("id".to_string(), Value::String(service.id.clone()));
    object.insert("name".to_string(), Value::String(service.name.clone()));
    object.insert("type".to_string(), Value::String(service.kind.clone()));
    insert_opt(&mut object, "description", &service.description);
    Value::Object(object)
}

pub fn endpoint_template_value(view: &EndpointTemplateView) -> Value {
    let t = &view.template;
    let mut object = Map::new();
    object.insert("id".to_string(), Value::String(t.id.clone()));
    insert_opt(&mut object, "region", &t.region);
    object.insert("name".to_string(), Value::String(view.service_name.clone()));
    object.insert("type".to_string(), Value::String(view.service_type.clone()));
    insert_opt(&mut object, "publicURL", &t.public_url);
    insert_opt(&mut object, "adminURL", &t.admin_url);
    insert_opt(&mut object, "internalURL", &t.internal_url);
    object.insert("enabled".to_string(), Value::Bool(t.enabled));
    object.insert("global".to_string(), Value::Bool(t.is_global));
    insert_opt(&mut object, "versionId", &t.version_id);
    insert_opt(&mut object, "versionList", &t.version_list);
    insert_opt(&mut object, "versionInfo", &t.version_info);
    with_extra(object, &t.extra)
}

pub fn catalog_endpoint_value(endpoint: &CatalogEndpoint, include_admin_url: bool) -> Value {
    let mut object = Map::new();
    insert_opt(&mut object, "id", &endpoint.id);
    insert_opt(&mut object, "tenantId", &endpoint.tenant_id);
    insert_opt(&mut object, "region", &endpoint.region);
    object.insert(
        "name".to_string(),
        Value::String(endpoint.service_name.clone()),
    );
    object.insert(
        "type".to_string(),
        Value::String(endpoint.service_type.clone()),
    );
    insert_opt(&mut object, "publicURL", &endpoint.public_url);
    if include_admin_url {
        insert_opt(&mut object, "adminURL", &endpoint.admin_url);
    }
    insert_opt(&mut object, "internalURL", &endpoint.internal_url);
    insert_opt(&mut object, "versionId", &endpoint.version_id);
    insert_opt(&mut object, "versionList", &endpoint.version_list);
    insert_opt(&mut object, "versionInfo", &endpoint.version_info);
    with_extra(object, &endpoint.extra)
}

fn granted_role_value(granted: &GrantedRole) -> Value {
    let mut object = Map::new();
    object.insert("id".to_string(), Value::String(granted.role.id.clone()));
    object.insert("name".to_string(), Value::String(granted.role.name.clone()));
    insert_opt(&mut object, "description", &granted.role.description);
    insert_opt(&mut object, "serviceId", &granted.role.service_id);
    insert_opt(&mut object, "tenantId", &granted.tenant_id);
    Value::Object(object)
}

fn token_value(token: &crate::models::Token, tenant: Option<&Tenant>) -> Value {
    let mut object = Map::new();
    object.insert("id".to_string(), Value::String(token.id.clone()));
    object.insert(
        "expires".to_string(),
        Value::String(token.expires.to_rfc3339()),
    );
    if let Some(tenant) = tenant {
        object.insert(
            "tenant".to_string(),
            json!({"id": tenant.id, "name": tenant.name}),
        );
    }
    Value::Object(object)
}

pub fn auth_value(data: &AuthData) -> Value {
    let roles: Vec<Value> = data.roles.iter().map(granted_role_value).collect();

    let catalog: Vec<Value> = super::xml::group_catalog(&data.catalog)
        .into_iter()
        .map(|(name, kind, entries)| {
            let endpoints: Vec<Value> = entries
                .iter()
                .map(|entry| {
                    let mut object = Map::new();
                    insert_opt(&mut object, "region", &entry.region);
                    insert_opt(&mut object, "publicURL", &entry.public_url);
                    insert_opt(&mut object, "internalURL", &entry.internal_url);
                    if data.include_admin_url {
                        insert_opt(&mut object, "adminURL", &entry.admin_url);
                    }
                    insert_opt(&mut object, "versionId", &entry.version_id);
                    with_extra(object, &entry.extra)
                })
                .collect();
            json!({
                "name": name,
                "type": kind,
                "endpoints": endpoints,
                "endpoints_links": [],
            })
        })
        .collect();

    json!({
        "access": {
            "token": token_value(&data.token, data.tenant.as_ref()),
            "user": {
                "id": data.user.id,
                "name": data.user.name,
                "roles": roles,
                "roles_links": [],
            },
            "serviceCatalog": catalog,
        }
    })
}

pub fn validate_value(data: &ValidateData) -> Value {
    let roles: Vec<Value> = data.roles.iter().map(granted_role_value).collect();

    let mut user = Map::new();
    user.insert("id".to_string(), Value::String(data.user.id.clone()));
    user.insert("name".to_string(), Value::String(data.user.name.clone()));
    insert_opt(&mut user, "tenantId", &data.user.tenant_id);
    insert_opt(&mut user, "tenantName", &data.user_tenant_name);
    user.insert("roles".to_string(), Value::Array(roles));
    user.insert("roles_links".to_string(), json!([]));

    json!({
        "access": {
            "token": token_value(&data.token, data.tenant.as_ref()),
            "user": Value::Object(user),
        }
    })
}

pub fn password_credentials_value(username: &str) -> Value {
    json!({"username": username})
}

pub fn ec2_credential_value(credential: &Credential) -> Value {
    let mut object = Map::new();
    object.insert("id".to_string(), Value::String(credential.id.clone()));
    object.insert(
        "userId".to_string(),
        Value::String(credential.user_id.clone()),
    );
    insert_opt(&mut object, "tenantId", &credential.tenant_id);
    object.insert("key".to_string(), Value::String(credential.key.clone()));
    Value::Object(object)
}

pub fn credentials_value(username: Option<&str>, ec2: &[Credential]) -> Value {
    let mut items = Vec::new();
    if let Some(username) = username {
        items.push(singleton(
            "passwordCredentials",
            password_credentials_value(username),
        ));
    }
    for credential in ec2 {
        items.push(singleton(
            "OS-KSEC2:ec2Credentials",
            ec2_credential_value(credential),
        ));
    }
    let mut object = Map::new();
    object.insert("credentials".to_string(), Value::Array(items));
    object.insert("credentials_links".to_string(), json!([]));
    Value::Object(object)
}

pub fn fault_value(err: &ServiceError) -> Value {
    singleton(
        err.fault_name(),
        json!({
            "message": err.public_message(),
            "code": err.status().as_u16(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

const TENANT_FIELDS: &[&str] = &["id", "name", "description", "enabled"];
const USER_FIELDS: &[&str] = &["id", "name", "password", "email", "enabled", "tenantId"];
const ROLE_FIELDS: &[&str] = &["id", "name", "description", "serviceId"];
const SERVICE_FIELDS: &[&str] = &["id", "name", "type", "description"];
const TEMPLATE_FIELDS: &[&str] = &[
    "id",
    "region",
    "name",
    "type",
    "publicURL",
    "adminURL",
    "internalURL",
    "enabled",
    "global",
    "versionId",
    "versionList",
    "versionInfo",
];

fn passthrough(object: &Map<String, Value>, fields: &[&str]) -> Extra {
    object
        .iter()
        .filter(|(key, _)| !fields.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn reject_unknown(
    object: &Map<String, Value>,
    fields: &[&str],
    what: &str,
) -> Result<(), ServiceError> {
    for key in object.keys() {
        if !fields.contains(&key.as_str()) {
            return Err(bad_request(format!(
                "unknown attribute '{key}' on {what}"
            )));
        }
    }
    Ok(())
}

/// Unknown attributes are accepted and carried in `extra`.
pub fn parse_tenant(body: &Value) -> Result<Tenant, ServiceError> {
    let object = expect_object(body, "tenant")?;
    Ok(Tenant {
        id: optional_str(object, "id")?.unwrap_or_default(),
        name: optional_str(object, "name")?.unwrap_or_default(),
        description: optional_str(object, "description")?,
        enabled: match object.get("enabled") {
            None | Some(Value::Null) => true,
            Some(v) => coerce_enabled(v)?,
        },
        extra: passthrough(object, TENANT_FIELDS),
    })
}

/// Unknown attributes are accepted and carried in `extra`.
pub fn parse_user(body: &Value) -> Result<User, ServiceError> {
    let object = expect_object(body, "user")?;
    Ok(User {
        id: optional_str(object, "id")?.unwrap_or_default(),
        name: optional_str(object, "name")?.unwrap_or_default(),
        password: optional_str(object, "password")?,
        email: optional_str(object, "email")?,
        enabled: match object.get("enabled") {
            None | Some(Value::Null) => true,
            Some(v) => coerce_enabled(v)?,
        },
        tenant_id: optional_str(object, "tenantId")?,
        extra: passthrough(object, USER_FIELDS),
    })
}

/// Whitelist-validated: unknown attributes are a bad request.
pub fn parse_role(body: &Value) -> Result<Role, ServiceError> {
    let object = expect_object(body, "role")?;
    reject_unknown(object, ROLE_FIELDS, "role")?;
    Ok(Role {
        id: optional_str(object, "id")?.unwrap_or_default(),
        name: optional_str(object, "name")?.unwrap_or_default(),
        description: optional_str(object, "description")?,
        service_id: optional_str(object, "serviceId")?,
    })
}

/// Whitelist-validated: unknown attributes are a bad request.
pub fn parse_service(body: &Value) -> Result<Service, ServiceError> {
    let object = expect_object(body, "service")?;
    reject_unknown(object, SERVICE_FIELDS, "service")?;
    Ok(Service {
        id: optional_str(object, "id")?.unwrap_or_default(),
        name: optional_str(object, "name")?.unwrap_or_default(),
        kind: optional_str(object, "type")?.unwrap_or_default(),
        description: optional_str(object, "description")?,
        owner_id: None,
    })
}

/// Template input names its service by `(name, type)`; the core resolves
/// the reference. Unknown attributes pass through.
pub fn parse_endpoint_template(body: &Value) -> Result<EndpointTemplateInput, ServiceError> {
    let object = expect_object(body, "endpointTemplate")?;
    Ok(EndpointTemplateInput {
        service_name: optional_str(object, "name")?.unwrap_or_default(),
        service_type: optional_str(object, "type")?.unwrap_or_default(),
        template: EndpointTemplate {
            id: optional_str(object, "id")?.unwrap_or_default(),
            region: optional_str(object, "region")?,
            service_id: String::new(),
            public_url: optional_str(object, "publicURL")?,
            admin_url: optional_str(object, "adminURL")?,
            internal_url: optional_str(object, "internalURL")?,
            enabled: match object.get("enabled") {
                None | Some(Value::Null) => true,
                Some(v) => coerce_enabled(v)?,
            },
            is_global: match object.get("global") {
                None | Some(Value::Null) => false,
                Some(v) => coerce_enabled(v)?,
            },
            version_id: optional_str(object, "versionId")?,
            version_list: optional_str(object, "versionList")?,
            version_info: optional_str(object, "versionInfo")?,
            extra: passthrough(object, TEMPLATE_FIELDS),
        },
    })
}

/// `POST .../OS-KSCATALOG/endpoints` names the template to bind by id.
pub fn parse_endpoint_binding(body: &Value) -> Result<String, ServiceError> {
    let object = expect_object(body, "endpointTemplate")?;
    required_str(object, "id")
}

pub fn parse_password_credentials(
    body: &Value,
) -> Result<(String, Option<String>), ServiceError> {
    let object = expect_object(body, "passwordCredentials")?;
    Ok((
        required_str(object, "username")?,
        optional_str(object, "password")?,
    ))
}

pub fn parse_ec2_credential(body: &Value) -> Result<Ec2CredentialInput, ServiceError> {
    let object = expect_object(body, "ec2Credentials")?;
    Ok(Ec2CredentialInput {
        tenant_id: optional_str(object, "tenantId")?,
        key: required_str(object, "key")?,
        secret: required_str(object, "secret")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_coercion_accepts_the_spelled_forms() {
        for truthy in [json!(true), json!(1), json!("true"), json!("TRUE"), json!("1")] {
            assert!(coerce_enabled(&truthy).unwrap(), "{truthy}");
        }
        for falsy in [json!(false), json!(0), json!("false"), json!("False"), json!("0")] {
            assert!(!coerce_enabled(&falsy).unwrap(), "{falsy}");
        }
        assert!(coerce_enabled(&json!("maybe")).is_err());
        assert!(coerce_enabled(&json!(2)).is_err());
    }

    #[test]
    fn tenant_round_trips_through_json() {
        let mut tenant = Tenant::new("acme");
        tenant.description = Some("the acme tenant".to_string());
        tenant
            .extra
            .insert("note".to_string(), json!("passthrough"));

        let rendered = tenant_value(&tenant);
        let parsed = parse_tenant(&rendered).unwrap();
        assert_eq!(parsed, tenant);
    }

    #[test]
    fn user_rendering_omits_password_and_null_fields() {
        let mut user = User::new("alice");
        user.password = Some("$argon2$...".to_string());

        let rendered = user_value(&user);
        let object = rendered.as_object().unwrap();
        assert!(!object.contains_key("password"));
        assert!(!object.contains_key("email"));
        assert!(!object.contains_key("tenantId"));
        assert_eq!(object["name"], "alice");
    }

    #[test]
    fn user_round_trips_modulo_password() {
        let mut user = User::new("alice");
        user.email = Some("alice@example.com".to_string());
        user.tenant_id = Some("t1".to_string());

        let parsed = parse_user(&user_value(&user)).unwrap();
        assert_eq!(parsed, user);
    }

    #[test]
    fn role_rejects_unknown_attributes() {
        let err = parse_role(&json!({"name": "Member", "bogus": 1})).unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn role_round_trips() {
        let mut role = Role::new("nova:admin");
        role.service_id = Some("s1".to_string());
        let parsed = parse_role(&role_value(&role)).unwrap();
        assert_eq!(parsed, role);
    }

    #[test]
    fn service_rejects_unknown_attributes_but_tenant_accepts_them() {
        assert!(parse_service(&json!({"name": "nova", "type": "compute", "x": 1})).is_err());

        let tenant = parse_tenant(&json!({"name": "acme", "x": 1})).unwrap();
        assert_eq!(tenant.extra.get("x"), Some(&json!(1)));
    }

    #[test]
    fn service_round_trips_without_owner() {
        let mut service = Service::new("nova", "compute");
        service.description = Some("compute service".to_string());
        let parsed = parse_service(&service_value(&service)).unwrap();
        // owner_id is server-side state, never on the wire
        assert_eq!(
            parsed,
            Service {
                owner_id: None,
                ..service
            }
        );
    }

    #[test]
    fn endpoint_template_round_trips() {
        let mut template = EndpointTemplate::new("ignored");
        template.service_id = String::new();
        template.region = Some("north".to_string());
        template.public_url = Some("https://compute.example.com".to_string());
        template.is_global = true;

        let view = EndpointTemplateView {
            template: template.clone(),
            service_name: "nova".to_string(),
            service_type: "compute".to_string(),
        };
        let parsed = parse_endpoint_template(&endpoint_template_value(&view)).unwrap();
        assert_eq!(parsed.service_name, "nova");
        assert_eq!(parsed.service_type, "compute");
        assert_eq!(parsed.template, template);
    }

    #[test]
    fn integer_ids_are_accepted_as_strings() {
        let tenant = parse_tenant(&json!({"id": 42, "name": "acme"})).unwrap();
        assert_eq!(tenant.id, "42");
    }

    #[test]
    fn fault_document_shape() {
        let err = ServiceError::NotFound("the tenant could not be found".to_string());
        let value = fault_value(&err);
        assert_eq!(value["itemNotFound"]["code"], 404);
        assert_eq!(
            value["itemNotFound"]["message"],
            "the tenant could not be found"
        );
    }
}
