//! Service registry entity.

use super::new_id;

/// A cataloged collaborator (e.g. a compute service). `(name, kind)` is
/// unique; `owner_id` records the creating user, who may manage the
/// service's roles and endpoint templates without the admin role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Service {
    pub id: String,
    pub name: String,
    /// Rendered as `type` on the wire.
    pub kind: String,
    pub description: Option<String>,
    pub owner_id: Option<String>,
}

impl Service {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            kind: kind.into(),
            description: None,
            owner_id: None,
        }
    }
}
