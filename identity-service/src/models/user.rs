//! User entity.

use super::{new_id, Extra};

/// A principal. `password` holds the stored hash and is never rendered in
/// responses; `tenant_id` is the user's default tenant, used when an
/// authentication request names no tenant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub password: Option<String>,
    pub email: Option<String>,
    pub enabled: bool,
    pub tenant_id: Option<String>,
    pub extra: Extra,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            password: None,
            email: None,
            enabled: true,
            tenant_id: None,
            extra: Extra::new(),
        }
    }
}
