//! Tenant entity - the unit of scoping for tokens and role grants.

use super::{new_id, Extra};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub extra: Extra,
}

impl Tenant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: None,
            enabled: true,
            extra: Extra::new(),
        }
    }
}
