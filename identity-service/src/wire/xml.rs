//! XML rendering and parsing.
//!
//! Entities render with their contract attributes as XML attributes and
//! `description` as a child element. Core entities carry the identity
//! namespace; services and endpoint templates the OS-KSADM extension
//! namespace; pagination links are Atom links.
//!
//! Parsing goes through a generic element-to-JSON conversion (attributes
//! and text-only children become object entries) so both wire formats feed
//! the same entity builders in [`super::json`].

use anyhow::anyhow;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

use crate::models::{
    AuthData, CatalogEndpoint, Credential, EndpointTemplateView, Role, Service, Tenant, User,
    ValidateData,
};
use crate::pagination::Link;
use crate::services::ServiceError;

pub const IDENTITY_NS: &str = "http://docs.openstack.org/identity/api/v2.0";
pub const KSADM_NS: &str = "http://docs.openstack.org/identity/api/ext/OS-KSADM/v1.0";
pub const KSEC2_NS: &str = "http://docs.openstack.org/identity/api/ext/OS-KSEC2/v1.0";
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

type XmlResult = Result<String, ServiceError>;

fn internal(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Internal(anyhow!("xml rendering failed: {e}"))
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a request document into its root local name and a JSON-shaped
/// value: attributes and text-only children become string entries, nested
/// elements become objects.
pub fn parse_document(body: &str) -> Result<(String, Value), ServiceError> {
    let mut reader = Reader::from_str(body);
    loop {
        match reader
            .read_event()
            .map_err(|e| ServiceError::BadRequest(format!("malformed xml: {e}")))?
        {
            Event::Start(start) => {
                let name = local_name(start.name().local_name().as_ref())?;
                let value = element_value(&mut reader, &start, false)?;
                return Ok((name, value));
            }
            Event::Empty(start) => {
                let name = local_name(start.name().local_name().as_ref())?;
                let value = element_value(&mut reader, &start, true)?;
                return Ok((name, value));
            }
            Event::Decl(_) | Event::Comment(_) | Event::Text(_) | Event::PI(_)
            | Event::DocType(_) => {}
            Event::Eof => {
                return Err(ServiceError::BadRequest("empty xml document".to_string()))
            }
            _ => {}
        }
    }
}

fn local_name(raw: &[u8]) -> Result<String, ServiceError> {
    String::from_utf8(raw.to_vec())
        .map_err(|_| ServiceError::BadRequest("non-utf8 element name".to_string()))
}

fn element_value(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    empty: bool,
) -> Result<Value, ServiceError> {
    let mut object = Map::new();

    for attr in start.attributes().flatten() {
        if attr.key.as_ref().starts_with(b"xmlns") {
            continue;
        }
        let key = local_name(attr.key.local_name().as_ref())?;
        let value = attr
            .unescape_value()
            .map_err(|e| ServiceError::BadRequest(format!("malformed xml attribute: {e}")))?;
        object.insert(key, Value::String(value.into_owned()));
    }

    if empty {
        return Ok(Value::Object(object));
    }

    let mut text = String::new();
    loop {
        match reader
            .read_event()
            .map_err(|e| ServiceError::BadRequest(format!("malformed xml: {e}")))?
        {
            Event::Start(child) => {
                let key = local_name(child.name().local_name().as_ref())?;
                let value = element_value(reader, &child, false)?;
                object.insert(key, value);
            }
            Event::Empty(child) => {
                let key = local_name(child.name().local_name().as_ref())?;
                let value = element_value(reader, &child, true)?;
                object.insert(key, value);
            }
            Event::Text(t) => {
                let t = t
                    .unescape()
                    .map_err(|e| ServiceError::BadRequest(format!("malformed xml text: {e}")))?;
                text.push_str(&t);
            }
            Event::End(_) => break,
            Event::Eof => {
                return Err(ServiceError::BadRequest(
                    "unexpected end of xml document".to_string(),
                ))
            }
            _ => {}
        }
    }

    let text = text.trim();
    if object.is_empty() && !text.is_empty() {
        return Ok(Value::String(text.to_string()));
    }
    Ok(Value::Object(object))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

struct Doc {
    writer: Writer<Vec<u8>>,
}

impl Doc {
    fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    fn start(&mut self, el: BytesStart<'_>) -> Result<(), ServiceError> {
        self.writer.write_event(Event::Start(el)).map_err(internal)
    }

    fn empty(&mut self, el: BytesStart<'_>) -> Result<(), ServiceError> {
        self.writer.write_event(Event::Empty(el)).map_err(internal)
    }

    fn end(&mut self, name: &str) -> Result<(), ServiceError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(internal)
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<(), ServiceError> {
        self.start(BytesStart::new(name))?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(internal)?;
        self.end(name)
    }

    fn links(&mut self, links: &[Link]) -> Result<(), ServiceError> {
        for link in links {
            let mut el = BytesStart::new("atom:link");
            el.push_attribute(("xmlns:atom", ATOM_NS));
            el.push_attribute(("rel", link.rel.as_str()));
            el.push_attribute(("href", link.href.as_str()));
            self.empty(el)?;
        }
        Ok(())
    }

    fn finish(self) -> XmlResult {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| ServiceError::Internal(anyhow!("non-utf8 xml output: {e}")))
    }
}

fn opt_attr(el: &mut BytesStart<'_>, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        el.push_attribute((name, value));
    }
}

fn bool_attr(el: &mut BytesStart<'_>, name: &str, value: bool) {
    el.push_attribute((name, if value { "true" } else { "false" }));
}

/// Scalar passthrough attributes; composite values only exist in JSON.
fn extra_attrs(el: &mut BytesStart<'_>, extra: &crate::models::Extra) {
    for (key, value) in extra {
        let rendered = match value {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        };
        if let Some(rendered) = rendered {
            el.push_attribute((key.as_str(), rendered.as_str()));
        }
    }
}

fn tenant_element(tenant: &Tenant, ns: bool) -> BytesStart<'static> {
    let mut el = BytesStart::new("tenant");
    if ns {
        el.push_attribute(("xmlns", IDENTITY_NS));
    }
    el.push_attribute(("id", tenant.id.as_str()));
    el.push_attribute(("name", tenant.name.as_str()));
    bool_attr(&mut el, "enabled", tenant.enabled);
    extra_attrs(&mut el, &tenant.extra);
    el
}

fn write_tenant(doc: &mut Doc, tenant: &Tenant, ns: bool) -> Result<(), ServiceError> {
    match &tenant.description {
        None => doc.empty(tenant_element(tenant, ns)),
        Some(description) => {
            doc.start(tenant_element(tenant, ns))?;
            doc.text_element("description", description)?;
            doc.end("tenant")
        }
    }
}

pub fn tenant(tenant: &Tenant) -> XmlResult {
    let mut doc = Doc::new();
    write_tenant(&mut doc, tenant, true)?;
    doc.finish()
}

pub fn tenants(items: &[Tenant], links: &[Link]) -> XmlResult {
    let mut doc = Doc::new();
    let mut root = BytesStart::new("tenants");
    root.push_attribute(("xmlns", IDENTITY_NS));
    doc.start(root)?;
    for item in items {
        write_tenant(&mut doc, item, false)?;
    }
    doc.links(links)?;
    doc.end("tenants")?;
    doc.finish()
}

fn user_element(user: &User, ns: bool) -> BytesStart<'static> {
    let mut el = BytesStart::new("user");
    if ns {
        el.push_attribute(("xmlns", IDENTITY_NS));
    }
    el.push_attribute(("id", user.id.as_str()));
    el.push_attribute(("name", user.name.as_str()));
    opt_attr(&mut el, "email", user.email.as_deref());
    bool_attr(&mut el, "enabled", user.enabled);
    opt_attr(&mut el, "tenantId", user.tenant_id.as_deref());
    extra_attrs(&mut el, &user.extra);
    el
}

pub fn user(user: &User) -> XmlResult {
    let mut doc = Doc::new();
    doc.empty(user_element(user, true))?;
    doc.finish()
}

pub fn users(items: &[User], links: &[Link]) -> XmlResult {
    let mut doc = Doc::new();
    let mut root = BytesStart::new("users");
    root.push_attribute(("xmlns", IDENTITY_NS));
    doc.start(root)?;
    for item in items {
        doc.empty(user_element(item, false))?;
    }
    doc.links(links)?;
    doc.end("users")?;
    doc.finish()
}

fn role_element(role: &Role, ns: bool) -> BytesStart<'static> {
    let mut el = BytesStart::new("role");
    if ns {
        el.push_attribute(("xmlns", IDENTITY_NS));
    }
    el.push_attribute(("id", role.id.as_str()));
    el.push_attribute(("name", role.name.as_str()));
    opt_attr(&mut el, "serviceId", role.service_id.as_deref());
    el
}

fn write_role(doc: &mut Doc, role: &Role, ns: bool) -> Result<(), ServiceError> {
    match &role.description {
        None => doc.empty(role_element(role, ns)),
        Some(description) => {
            doc.start(role_element(role, ns))?;
            doc.text_element("description", description)?;
            doc.end("role")
        }
    }
}

pub fn role(role: &Role) -> XmlResult {
    let mut doc = Doc::new();
    write_role(&mut doc, role, true)?;
    doc.finish()
}

pub fn roles(items: &[Role], links: &[Link]) -> XmlResult {
    let mut doc = Doc::new();
    let mut root = BytesStart::new("roles");
    root.push_attribute(("xmlns", IDENTITY_NS));
    doc.start(root)?;
    for item in items {
        write_role(&mut doc, item, false)?;
    }
    doc.links(links)?;
    doc.end("roles")?;
    doc.finish()
}

fn service_element(service: &Service, ns: bool) -> BytesStart<'static> {
    let mut el = BytesStart::new("service");
    if ns {
        el.push_attribute(("xmlns", KSADM_NS));
    }
    el.push_attribute(("id", service.id.as_str()));
    el.push_attribute(("name", service.name.as_str()));
    el.push_attribute(("type", service.kind.as_str()));
    el
}

fn write_service(doc: &mut Doc, service: &Service, ns: bool) -> Result<(), ServiceError> {
    match &service.description {
        None => doc.empty(service_element(service, ns)),
        Some(description) => {
            doc.start(service_element(service, ns))?;
            doc.text_element("description", description)?;
            doc.end("service")
        }
    }
}

pub fn service(service: &Service) -> XmlResult {
    let mut doc = Doc::new();
    write_service(&mut doc, service, true)?;
    doc.finish()
}

pub fn services(items: &[Service], links: &[Link]) -> XmlResult {
    let mut doc = Doc::new();
    let mut root = BytesStart::new("services");
    root.push_attribute(("xmlns", KSADM_NS));
    doc.start(root)?;
    for item in items {
        write_service(&mut doc, item, false)?;
    }
    doc.links(links)?;
    doc.end("services")?;
    doc.finish()
}

fn endpoint_template_element(view: &EndpointTemplateView, ns: bool) -> BytesStart<'static> {
    let t = &view.template;
    let mut el = BytesStart::new("endpointTemplate");
    if ns {
        el.push_attribute(("xmlns", KSADM_NS));
    }
    el.push_attribute(("id", t.id.as_str()));
    opt_attr(&mut el, "region", t.region.as_deref());
    el.push_attribute(("name", view.service_name.as_str()));
    el.push_attribute(("type", view.service_type.as_str()));
    opt_attr(&mut el, "publicURL", t.public_url.as_deref());
    opt_attr(&mut el, "adminURL", t.admin_url.as_deref());
    opt_attr(&mut el, "internalURL", t.internal_url.as_deref());
    bool_attr(&mut el, "enabled", t.enabled);
    bool_attr(&mut el, "global", t.is_global);
    opt_attr(&mut el, "versionId", t.version_id.as_deref());
    opt_attr(&mut el, "versionList", t.version_list.as_deref());
    opt_attr(&mut el, "versionInfo", t.version_info.as_deref());
    extra_attrs(&mut el, &t.extra);
    el
}

pub fn endpoint_template(view: &EndpointTemplateView) -> XmlResult {
    let mut doc = Doc::new();
    doc.empty(endpoint_template_element(view, true))?;
    doc.finish()
}

pub fn endpoint_templates(items: &[EndpointTemplateView], links: &[Link]) -> XmlResult {
    let mut doc = Doc::new();
    let mut root = BytesStart::new("endpointTemplates");
    root.push_attribute(("xmlns", KSADM_NS));
    doc.start(root)?;
    for item in items {
        doc.empty(endpoint_template_element(item, false))?;
    }
    doc.links(links)?;
    doc.end("endpointTemplates")?;
    doc.finish()
}

fn catalog_endpoint_element(
    endpoint: &CatalogEndpoint,
    include_admin_url: bool,
    ns: bool,
) -> BytesStart<'static> {
    let mut el = BytesStart::new("endpoint");
    if ns {
        el.push_attribute(("xmlns", IDENTITY_NS));
    }
    opt_attr(&mut el, "id", endpoint.id.as_deref());
    opt_attr(&mut el, "tenantId", endpoint.tenant_id.as_deref());
    opt_attr(&mut el, "region", endpoint.region.as_deref());
    el.push_attribute(("name", endpoint.service_name.as_str()));
    el.push_attribute(("type", endpoint.service_type.as_str()));
    opt_attr(&mut el, "publicURL", endpoint.public_url.as_deref());
    if include_admin_url {
        opt_attr(&mut el, "adminURL", endpoint.admin_url.as_deref());
    }
    opt_attr(&mut el, "internalURL", endpoint.internal_url.as_deref());
    opt_attr(&mut el, "versionId", endpoint.version_id.as_deref());
    opt_attr(&mut el, "versionList", endpoint.version_list.as_deref());
    opt_attr(&mut el, "versionInfo", endpoint.version_info.as_deref());
    extra_attrs(&mut el, &endpoint.extra);
    el
}

pub fn endpoint(endpoint: &CatalogEndpoint, include_admin_url: bool) -> XmlResult {
    let mut doc = Doc::new();
    doc.empty(catalog_endpoint_element(endpoint, include_admin_url, true))?;
    doc.finish()
}

pub fn endpoints(
    items: &[CatalogEndpoint],
    links: &[Link],
    include_admin_url: bool,
) -> XmlResult {
    let mut doc = Doc::new();
    let mut root = BytesStart::new("endpoints");
    root.push_attribute(("xmlns", IDENTITY_NS));
    doc.start(root)?;
    for item in items {
        doc.empty(catalog_endpoint_element(item, include_admin_url, false))?;
    }
    doc.links(links)?;
    doc.end("endpoints")?;
    doc.finish()
}

fn password_credentials_element(username: &str, ns: bool) -> BytesStart<'static> {
    let mut el = BytesStart::new("passwordCredentials");
    if ns {
        el.push_attribute(("xmlns", IDENTITY_NS));
    }
    el.push_attribute(("username", username));
    el
}

pub fn password_credentials(username: &str) -> XmlResult {
    let mut doc = Doc::new();
    doc.empty(password_credentials_element(username, true))?;
    doc.finish()
}

fn ec2_credential_element(credential: &Credential, ns: bool) -> BytesStart<'static> {
    let mut el = BytesStart::new("ec2Credentials");
    if ns {
        el.push_attribute(("xmlns", KSEC2_NS));
    }
    el.push_attribute(("id", credential.id.as_str()));
    el.push_attribute(("userId", credential.user_id.as_str()));
    opt_attr(&mut el, "tenantId", credential.tenant_id.as_deref());
    el.push_attribute(("key", credential.key.as_str()));
    el
}

pub fn ec2_credential(credential: &Credential) -> XmlResult {
    let mut doc = Doc::new();
    doc.empty(ec2_credential_element(credential, true))?;
    doc.finish()
}

/// Credentials listing: the password entry (secret never rendered) plus any
/// EC2 key pairs.
pub fn credentials(username: Option<&str>, ec2: &[Credential]) -> XmlResult {
    let mut doc = Doc::new();
    let mut root = BytesStart::new("credentials");
    root.push_attribute(("xmlns", IDENTITY_NS));
    doc.start(root)?;
    if let Some(username) = username {
        doc.empty(password_credentials_element(username, false))?;
    }
    for credential in ec2 {
        doc.empty(ec2_credential_element(credential, true))?;
    }
    doc.end("credentials")?;
    doc.finish()
}

fn token_element(doc: &mut Doc, data_token: &crate::models::Token, tenant: Option<&Tenant>)
    -> Result<(), ServiceError>
{
    let mut el = BytesStart::new("token");
    el.push_attribute(("id", data_token.id.as_str()));
    el.push_attribute(("expires", data_token.expires.to_rfc3339().as_str()));
    match tenant {
        None => doc.empty(el),
        Some(tenant) => {
            doc.start(el)?;
            let mut t = BytesStart::new("tenant");
            t.push_attribute(("id", tenant.id.as_str()));
            t.push_attribute(("name", tenant.name.as_str()));
            doc.empty(t)?;
            doc.end("token")
        }
    }
}

fn granted_role_element(granted: &crate::models::GrantedRole) -> BytesStart<'static> {
    let mut el = BytesStart::new("role");
    el.push_attribute(("id", granted.role.id.as_str()));
    el.push_attribute(("name", granted.role.name.as_str()));
    opt_attr(&mut el, "serviceId", granted.role.service_id.as_deref());
    opt_attr(&mut el, "tenantId", granted.tenant_id.as_deref());
    el
}

/// Authentication response: token, user with roles, service catalog.
pub fn auth(data: &AuthData) -> XmlResult {
    let mut doc = Doc::new();
    let mut root = BytesStart::new("access");
    root.push_attribute(("xmlns", IDENTITY_NS));
    doc.start(root)?;

    token_element(&mut doc, &data.token, data.tenant.as_ref())?;

    let mut user_el = BytesStart::new("user");
    user_el.push_attribute(("id", data.user.id.as_str()));
    user_el.push_attribute(("name", data.user.name.as_str()));
    doc.start(user_el)?;
    for granted in &data.roles {
        doc.empty(granted_role_element(granted))?;
    }
    doc.end("user")?;

    doc.start(BytesStart::new("serviceCatalog"))?;
    for (service_name, service_type, entries) in group_catalog(&data.catalog) {
        let mut svc = BytesStart::new("service");
        svc.push_attribute(("name", service_name));
        svc.push_attribute(("type", service_type));
        doc.start(svc)?;
        for entry in entries {
            let mut el = BytesStart::new("endpoint");
            opt_attr(&mut el, "region", entry.region.as_deref());
            opt_attr(&mut el, "publicURL", entry.public_url.as_deref());
            opt_attr(&mut el, "internalURL", entry.internal_url.as_deref());
            if data.include_admin_url {
                opt_attr(&mut el, "adminURL", entry.admin_url.as_deref());
            }
            opt_attr(&mut el, "versionId", entry.version_id.as_deref());
            doc.empty(el)?;
        }
        doc.end("service")?;
    }
    doc.end("serviceCatalog")?;

    doc.end("access")?;
    doc.finish()
}

/// Validation response: token plus user identity, no catalog.
pub fn validate(data: &ValidateData) -> XmlResult {
    let mut doc = Doc::new();
    let mut root = BytesStart::new("access");
    root.push_attribute(("xmlns", IDENTITY_NS));
    doc.start(root)?;

    token_element(&mut doc, &data.token, data.tenant.as_ref())?;

    let mut user_el = BytesStart::new("user");
    user_el.push_attribute(("id", data.user.id.as_str()));
    user_el.push_attribute(("name", data.user.name.as_str()));
    opt_attr(&mut user_el, "tenantId", data.user.tenant_id.as_deref());
    opt_attr(&mut user_el, "tenantName", data.user_tenant_name.as_deref());
    doc.start(user_el)?;
    for granted in &data.roles {
        doc.empty(granted_role_element(granted))?;
    }
    doc.end("user")?;

    doc.end("access")?;
    doc.finish()
}

/// Fault document: `<kind code="..."><message>...</message></kind>`.
pub fn fault(err: &ServiceError) -> XmlResult {
    let name = err.fault_name();
    let mut doc = Doc::new();
    let mut root = BytesStart::new(name);
    root.push_attribute(("xmlns", IDENTITY_NS));
    root.push_attribute(("code", err.status().as_str()));
    doc.start(root)?;
    doc.text_element("message", &err.public_message())?;
    doc.end(name)?;
    doc.finish()
}

/// Group catalog entries per `(service name, service type)` preserving first
/// appearance order.
pub fn group_catalog(
    catalog: &[CatalogEndpoint],
) -> Vec<(&str, &str, Vec<&CatalogEndpoint>)> {
    let mut groups: Vec<(&str, &str, Vec<&CatalogEndpoint>)> = Vec::new();
    for entry in catalog {
        match groups.iter_mut().find(|(name, kind, _)| {
            *name == entry.service_name.as_str() && *kind == entry.service_type.as_str()
        }) {
            Some((_, _, entries)) => entries.push(entry),
            None => groups.push((
                entry.service_name.as_str(),
                entry.service_type.as_str(),
                vec![entry],
            )),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Extra;

    #[test]
    fn tenant_renders_description_as_child_element() {
        let mut t = Tenant::new("acme");
        t.id = "t1".to_string();
        t.description = Some("the acme tenant".to_string());

        let xml = tenant(&t).unwrap();
        assert!(xml.starts_with(&format!("<tenant xmlns=\"{IDENTITY_NS}\"")));
        assert!(xml.contains("id=\"t1\""));
        assert!(xml.contains("name=\"acme\""));
        assert!(xml.contains("enabled=\"true\""));
        assert!(xml.contains("<description>the acme tenant</description>"));
        // description is not an attribute
        assert!(!xml.contains("description=\""));
    }

    #[test]
    fn parse_document_reads_attributes_and_description() {
        let (root, value) = parse_document(
            "<tenant xmlns=\"http://docs.openstack.org/identity/api/v2.0\" \
             name=\"acme\" enabled=\"true\"><description>d</description></tenant>",
        )
        .unwrap();
        assert_eq!(root, "tenant");
        assert_eq!(value["name"], "acme");
        assert_eq!(value["enabled"], "true");
        assert_eq!(value["description"], "d");
    }

    #[test]
    fn parse_document_handles_nested_elements() {
        let (root, value) = parse_document(
            "<auth tenantName=\"acme\">\
               <passwordCredentials username=\"alice\" password=\"p\"/>\
             </auth>",
        )
        .unwrap();
        assert_eq!(root, "auth");
        assert_eq!(value["tenantName"], "acme");
        assert_eq!(value["passwordCredentials"]["username"], "alice");
    }

    #[test]
    fn tenant_round_trips_through_xml() {
        let mut t = Tenant::new("acme");
        t.description = Some("the acme tenant".to_string());
        t.extra
            .insert("note".to_string(), serde_json::json!("keep"));

        let rendered = tenant(&t).unwrap();
        let (root, value) = parse_document(&rendered).unwrap();
        assert_eq!(root, "tenant");

        let parsed = super::super::json::parse_tenant(&value).unwrap();
        assert_eq!(parsed.id, t.id);
        assert_eq!(parsed.name, t.name);
        assert_eq!(parsed.description, t.description);
        assert_eq!(parsed.enabled, t.enabled);
        // attribute values come back as strings
        assert_eq!(parsed.extra.get("note"), Some(&serde_json::json!("keep")));
    }

    #[test]
    fn services_collection_uses_the_admin_extension_namespace() {
        let mut s = Service::new("nova", "compute");
        s.id = "s1".to_string();
        let xml = services(&[s], &[]).unwrap();
        assert!(xml.starts_with(&format!("<services xmlns=\"{KSADM_NS}\"")));
        assert!(xml.contains("type=\"compute\""));
    }

    #[test]
    fn links_render_as_atom_links() {
        let links = vec![Link {
            rel: "next".to_string(),
            href: "http://x?marker=m&limit=2".to_string(),
        }];
        let xml = tenants(&[], &links).unwrap();
        assert!(xml.contains("<atom:link"));
        assert!(xml.contains(&format!("xmlns:atom=\"{ATOM_NS}\"")));
        assert!(xml.contains("rel=\"next\""));
        // attribute value is escaped
        assert!(xml.contains("href=\"http://x?marker=m&amp;limit=2\""));
    }

    #[test]
    fn fault_carries_code_and_message() {
        let err = ServiceError::Unauthorized("bad token".to_string());
        let xml = fault(&err).unwrap();
        assert!(xml.starts_with(&format!("<unauthorized xmlns=\"{IDENTITY_NS}\" code=\"401\"")));
        assert!(xml.contains("<message>bad token</message>"));
    }

    #[test]
    fn scalar_extras_render_composites_do_not() {
        let mut t = Tenant::new("acme");
        let mut extra = Extra::new();
        extra.insert("note".to_string(), serde_json::json!("keep"));
        extra.insert("caps".to_string(), serde_json::json!(["a", "b"]));
        t.extra = extra;

        let xml = tenant(&t).unwrap();
        assert!(xml.contains("note=\"keep\""));
        assert!(!xml.contains("caps"));
    }
}
