//! Credential operations: the password sub-resource and EC2 key pairs.

use crate::models::{Credential, Ec2CredentialInput, User};
use crate::utils::password::hash_password;

use super::{IdentityService, ServiceError};

impl IdentityService {
    async fn require_user(&self, user_id: &str) -> Result<User, ServiceError> {
        self.repos
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("The user could not be found".to_string()))
    }

    /// List a user's credentials: the password entry (never the secret)
    /// plus any EC2 key pairs.
    pub async fn get_credentials(
        &self,
        admin_token: &str,
        user_id: &str,
    ) -> Result<(Option<String>, Vec<Credential>), ServiceError> {
        self.require_admin(admin_token).await?;
        let user = self.require_user(user_id).await?;
        let ec2 = self.repos.credentials.by_user(&user.id).await?;
        let username = user.password.is_some().then_some(user.name);
        Ok((username, ec2))
    }

    pub async fn get_password_credentials(
        &self,
        admin_token: &str,
        user_id: &str,
    ) -> Result<String, ServiceError> {
        self.require_admin(admin_token).await?;
        let user = self.require_user(user_id).await?;
        if user.password.is_none() {
            return Err(ServiceError::NotFound(
                "Password credentials could not be found".to_string(),
            ));
        }
        Ok(user.name)
    }

    /// Only valid while the user has no password yet; the username may be
    /// (re)assigned if it stays unique.
    pub async fn create_password_credentials(
        &self,
        admin_token: &str,
        user_id: &str,
        username: &str,
        password: Option<&str>,
    ) -> Result<String, ServiceError> {
        self.require_admin(admin_token).await?;
        let user = self.require_user(user_id).await?;

        if username.trim().is_empty() {
            return Err(ServiceError::BadRequest("Expecting a username.".to_string()));
        }
        let password = password.ok_or_else(|| {
            ServiceError::BadRequest("Expecting a password.".to_string())
        })?;

        if username != user.name && self.repos.users.get_by_name(username).await?.is_some() {
            return Err(ServiceError::Conflict(
                "A user with that name already exists".to_string(),
            ));
        }
        if user.password.is_some() {
            return Err(ServiceError::BadRequest(
                "Password credentials already available.".to_string(),
            ));
        }

        let updated = User {
            name: username.to_string(),
            password: Some(hash_password(password)?),
            ..user
        };
        let updated = self.repos.users.update(updated).await?;
        Ok(updated.name)
    }

    /// Replace the password; a rename is allowed but must stay unique.
    pub async fn update_password_credentials(
        &self,
        admin_token: &str,
        user_id: &str,
        username: &str,
        password: Option<&str>,
    ) -> Result<String, ServiceError> {
        self.require_admin(admin_token).await?;
        let user = self.require_user(user_id).await?;

        if username.trim().is_empty() {
            return Err(ServiceError::BadRequest("Expecting a username.".to_string()));
        }
        let password = password.ok_or_else(|| {
            ServiceError::BadRequest("Expecting a password.".to_string())
        })?;

        if let Some(existing) = self.repos.users.get_by_name(username).await? {
            if existing.id != user.id {
                return Err(ServiceError::Conflict(
                    "A user with that name already exists".to_string(),
                ));
            }
        }

        let updated = User {
            name: username.to_string(),
            password: Some(hash_password(password)?),
            ..user
        };
        let updated = self.repos.users.update(updated).await?;
        tracing::info!(user = %updated.id, "password credentials updated");
        Ok(updated.name)
    }

    pub async fn delete_password_credentials(
        &self,
        admin_token: &str,
        user_id: &str,
    ) -> Result<(), ServiceError> {
        self.require_admin(admin_token).await?;
        let user = self.require_user(user_id).await?;
        let updated = User {
            password: None,
            ..user
        };
        self.repos.users.update(updated).await?;
        Ok(())
    }

    /// EC2 secrets are stored as supplied; the signer needs the raw value.
    pub async fn create_ec2_credential(
        &self,
        admin_token: &str,
        user_id: &str,
        input: Ec2CredentialInput,
    ) -> Result<Credential, ServiceError> {
        self.require_admin(admin_token).await?;
        let user = self.require_user(user_id).await?;

        if let Some(tenant_id) = &input.tenant_id {
            if self.repos.tenants.get(tenant_id).await?.is_none() {
                return Err(ServiceError::NotFound("The tenant not found".to_string()));
            }
        }
        if input.key.trim().is_empty() || input.secret.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "Expecting a key and a secret.".to_string(),
            ));
        }

        let credential = self
            .repos
            .credentials
            .create(Credential::ec2(
                &user.id,
                input.tenant_id,
                input.key,
                input.secret,
            ))
            .await?;
        tracing::info!(user = %user.name, key = %credential.key, "ec2 credential created");
        Ok(credential)
    }

    pub async fn get_ec2_credential(
        &self,
        admin_token: &str,
        user_id: &str,
        credential_id: &str,
    ) -> Result<Credential, ServiceError> {
        self.require_admin(admin_token).await?;
        let user = self.require_user(user_id).await?;

        self.repos
            .credentials
            .get(credential_id)
            .await?
            .filter(|c| c.user_id == user.id)
            .ok_or_else(|| {
                ServiceError::NotFound("The credentials could not be found".to_string())
            })
    }

    pub async fn delete_ec2_credential(
        &self,
        admin_token: &str,
        user_id: &str,
        credential_id: &str,
    ) -> Result<(), ServiceError> {
        self.require_admin(admin_token).await?;
        let user = self.require_user(user_id).await?;

        let credential = self
            .repos
            .credentials
            .get(credential_id)
            .await?
            .filter(|c| c.user_id == user.id)
            .ok_or_else(|| {
                ServiceError::NotFound("The credentials could not be found".to_string())
            })?;
        self.repos.credentials.delete(&credential.id).await?;
        Ok(())
    }
}
