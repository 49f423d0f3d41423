//! Roles and role grants.

use super::new_id;

/// A named role, optionally owned by a service. A role named
/// `<service>:<suffix>` must reference the service carrying that name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub service_id: Option<String>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: None,
            service_id: None,
        }
    }

    /// The `<service>` prefix of a `<service>:<suffix>` role name, if any.
    pub fn service_prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }
}

/// Grant of a role to a user. A null `tenant_id` is a global grant; at most
/// one grant may exist per `(user_id, role_id, tenant_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRoleAssociation {
    pub id: String,
    pub user_id: String,
    pub role_id: String,
    pub tenant_id: Option<String>,
}

impl UserRoleAssociation {
    pub fn new(
        user_id: impl Into<String>,
        role_id: impl Into<String>,
        tenant_id: Option<String>,
    ) -> Self {
        Self {
            id: new_id(),
            user_id: user_id.into(),
            role_id: role_id.into(),
            tenant_id,
        }
    }
}
