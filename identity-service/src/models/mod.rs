//! Domain entities.
//!
//! Entities are plain records with a fixed, declared field set. Attributes
//! outside the contract travel in the `extra` map so they survive a
//! round-trip through the wire formats without becoming part of the model.

mod credential;
mod endpoint;
mod role;
mod service;
mod tenant;
mod token;
mod user;

pub use credential::{Credential, Ec2CredentialInput, EC2_CREDENTIAL_TYPE};
pub use endpoint::{
    CatalogEndpoint, Endpoint, EndpointTemplate, EndpointTemplateInput, EndpointTemplateView,
};
pub use role::{Role, UserRoleAssociation};
pub use service::Service;
pub use tenant::Tenant;
pub use token::{AuthData, GrantedRole, Token, ValidateData};
pub use user::User;

/// Passthrough attributes kept alongside an entity's declared fields.
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// Fresh opaque identifier. Ids are strings everywhere; nothing in the
/// service orders or parses them beyond lexicographic paging.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
