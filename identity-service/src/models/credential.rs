//! Stored credentials (EC2-style key pairs).

use super::new_id;

pub const EC2_CREDENTIAL_TYPE: &str = "EC2";

/// Create input for an EC2 key pair.
#[derive(Debug, Clone)]
pub struct Ec2CredentialInput {
    pub tenant_id: Option<String>,
    pub key: String,
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub id: String,
    pub user_id: String,
    pub tenant_id: Option<String>,
    pub kind: String,
    pub key: String,
    pub secret: String,
}

impl Credential {
    pub fn ec2(
        user_id: impl Into<String>,
        tenant_id: Option<String>,
        key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            user_id: user_id.into(),
            tenant_id,
            kind: EC2_CREDENTIAL_TYPE.to_string(),
            key: key.into(),
            secret: secret.into(),
        }
    }
}
