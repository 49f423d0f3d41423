//! Authentication, token validation and the authorization predicates.

use anyhow::anyhow;
use chrono::{Duration, Utc};

use crate::models::{
    AuthData, CatalogEndpoint, Credential, GrantedRole, Service, Tenant, Token, User,
    ValidateData,
};
use crate::repo::Repositories;
use crate::signer::{self, SignableRequest};
use crate::utils::password::verify_password;

use super::ServiceError;

/// The three accepted authentication inputs.
#[derive(Debug, Clone)]
pub enum AuthRequest {
    Password {
        username: String,
        password: String,
        tenant_id: Option<String>,
        tenant_name: Option<String>,
    },
    /// Re-scope an existing token.
    UnscopedToken {
        token_id: String,
        tenant_id: Option<String>,
        tenant_name: Option<String>,
    },
    Ec2 {
        access: String,
        signature: String,
        request: SignableRequest,
    },
}

/// The identity core. Holds the repository handle chosen at startup and the
/// admin/service-admin role ids, resolved once in the constructor.
pub struct IdentityService {
    pub(super) repos: Repositories,
    token_ttl: Duration,
    admin_role_id: String,
    service_admin_role_id: String,
}

impl IdentityService {
    /// Resolve the configured role names and build the core. Fails fast
    /// when either role does not exist, instead of limping along with
    /// nothing able to pass an admin check.
    pub async fn new(
        repos: Repositories,
        admin_role: &str,
        service_admin_role: &str,
        token_ttl_seconds: i64,
    ) -> Result<Self, ServiceError> {
        let admin = repos
            .roles
            .get_by_name(admin_role)
            .await?
            .ok_or_else(|| {
                ServiceError::Internal(anyhow!("admin role '{admin_role}' is not defined"))
            })?;
        let service_admin = repos
            .roles
            .get_by_name(service_admin_role)
            .await?
            .ok_or_else(|| {
                ServiceError::Internal(anyhow!(
                    "service admin role '{service_admin_role}' is not defined"
                ))
            })?;

        Ok(Self {
            repos,
            token_ttl: Duration::seconds(token_ttl_seconds),
            admin_role_id: admin.id,
            service_admin_role_id: service_admin.id,
        })
    }

    //
    // Authentication
    //

    pub async fn authenticate(&self, request: AuthRequest) -> Result<AuthData, ServiceError> {
        match request {
            AuthRequest::Password {
                username,
                password,
                tenant_id,
                tenant_name,
            } => {
                let tenant_id = self.resolve_requested_tenant(tenant_id, tenant_name).await?;
                let user = self
                    .repos
                    .users
                    .get_by_name(&username)
                    .await?
                    .ok_or_else(|| ServiceError::Unauthorized("Unauthorized".to_string()))?;

                self.finish_authentication(&user.id, tenant_id, |user| {
                    user.password
                        .as_deref()
                        .map(|hash| verify_password(&password, hash))
                        .unwrap_or(false)
                })
                .await
            }
            AuthRequest::UnscopedToken {
                token_id,
                tenant_id,
                tenant_name,
            } => {
                let (_token, user) = self.validate_claim(&token_id, None, false).await?;
                let tenant_id = self.resolve_requested_tenant(tenant_id, tenant_name).await?;

                // The presenter already proved who they are.
                self.finish_authentication(&user.id, tenant_id, |_| true)
                    .await
            }
            AuthRequest::Ec2 {
                access,
                signature,
                request,
            } => {
                let credential = self
                    .repos
                    .credentials
                    .get_by_access(&access)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::Unauthorized(format!("No credentials found for {access}"))
                    })?;

                let Credential {
                    user_id,
                    tenant_id,
                    secret,
                    ..
                } = credential;
                self.finish_authentication(&user_id, tenant_id, |_| {
                    signer::verify(&secret, &request, &signature, true)
                })
                .await
            }
        }
    }

    /// Shared tail of every authentication flow: load the principal (bound
    /// to the requested tenant if any), run the flow-specific check, then
    /// reuse or mint a token.
    async fn finish_authentication(
        &self,
        user_id: &str,
        tenant_id: Option<String>,
        check: impl FnOnce(&User) -> bool,
    ) -> Result<AuthData, ServiceError> {
        let user = match &tenant_id {
            Some(tenant_id) => self
                .repos
                .users
                .get_by_tenant(user_id, tenant_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::Unauthorized("Unauthorized on this tenant".to_string())
                })?,
            None => self
                .repos
                .users
                .get(user_id)
                .await?
                .ok_or_else(|| ServiceError::Unauthorized("Unauthorized".to_string()))?,
        };

        if !user.enabled {
            return Err(ServiceError::UserDisabled(
                "Your account has been disabled".to_string(),
            ));
        }

        if !check(&user) {
            return Err(ServiceError::Unauthorized("Unauthorized".to_string()));
        }

        // No tenant requested: scope to the user's default tenant, which may
        // itself be unset (unscoped token).
        let tenant_id = tenant_id.or_else(|| user.tenant_id.clone());

        let token = match self
            .repos
            .tokens
            .get_for_user_by_tenant(&user.id, tenant_id.as_deref())
            .await?
        {
            Some(token) if !token.is_expired(Utc::now()) => token,
            _ => {
                let token = Token::new(&user.id, tenant_id.clone(), self.token_ttl);
                tracing::info!(user = %user.name, scoped = tenant_id.is_some(), "issued token");
                self.repos.tokens.create(token).await?
            }
        };

        self.auth_data(token, user).await
    }

    /// Resolve the tenant an authentication request asks for. A tenant
    /// named but unknown is an authentication failure, not a lookup miss.
    async fn resolve_requested_tenant(
        &self,
        tenant_id: Option<String>,
        tenant_name: Option<String>,
    ) -> Result<Option<String>, ServiceError> {
        if let Some(name) = tenant_name {
            let tenant = self.require_enabled_tenant_by_name(&name).await?;
            return Ok(Some(tenant.id));
        }
        if let Some(id) = tenant_id {
            let tenant = self.require_enabled_tenant(&id).await?;
            return Ok(Some(tenant.id));
        }
        Ok(None)
    }

    pub(super) async fn require_enabled_tenant(
        &self,
        tenant_id: &str,
    ) -> Result<Tenant, ServiceError> {
        if tenant_id.is_empty() {
            return Err(ServiceError::Unauthorized("Missing tenant id".to_string()));
        }
        let tenant = self
            .repos
            .tenants
            .get(tenant_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Tenant not found".to_string()))?;
        ensure_tenant_enabled(tenant)
    }

    async fn require_enabled_tenant_by_name(&self, name: &str) -> Result<Tenant, ServiceError> {
        if name.is_empty() {
            return Err(ServiceError::Unauthorized("Missing tenant name".to_string()));
        }
        let tenant = self
            .repos
            .tenants
            .get_by_name(name)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Tenant not found".to_string()))?;
        ensure_tenant_enabled(tenant)
    }

    //
    // Validation
    //

    /// Validate a claim. `is_check_token` selects the fault classification
    /// of the explicit check-token flow, which answers not-found instead of
    /// unauthorized/forbidden so it cannot be used to probe token existence.
    pub(super) async fn validate_claim(
        &self,
        token_id: &str,
        belongs_to: Option<&str>,
        is_check_token: bool,
    ) -> Result<(Token, User), ServiceError> {
        if token_id.is_empty() {
            return Err(ServiceError::Unauthorized("Missing token".to_string()));
        }

        let token = match self.repos.tokens.get(token_id).await? {
            Some(token) => token,
            None if is_check_token => {
                return Err(ServiceError::NotFound("Token does not exist.".to_string()))
            }
            None => {
                return Err(ServiceError::Unauthorized(
                    "Bad token, please reauthenticate".to_string(),
                ))
            }
        };

        if token.is_expired(Utc::now()) {
            return Err(if is_check_token {
                ServiceError::NotFound("Token expired, please renew.".to_string())
            } else {
                ServiceError::Forbidden("Token expired, please renew.".to_string())
            });
        }

        let user = self
            .repos
            .users
            .get(&token.user_id)
            .await?
            .ok_or_else(|| {
                ServiceError::Unauthorized("Bad token, please reauthenticate".to_string())
            })?;

        if !user.enabled {
            return Err(ServiceError::UserDisabled(format!(
                "User {} has been disabled!",
                user.id
            )));
        }

        if let Some(tenant_id) = &user.tenant_id {
            self.require_enabled_tenant(tenant_id).await?;
        }
        if let Some(tenant_id) = &token.tenant_id {
            self.require_enabled_tenant(tenant_id).await?;
        }

        if let Some(belongs_to) = belongs_to {
            if token.tenant_id.as_deref() != Some(belongs_to) {
                return Err(ServiceError::Unauthorized(
                    "Unauthorized on this tenant".to_string(),
                ));
            }
        }

        Ok((token, user))
    }

    /// Check-token flow (`GET /tokens/{id}`): service-admin only.
    pub async fn validate_token(
        &self,
        admin_token: &str,
        token_id: &str,
        belongs_to: Option<&str>,
    ) -> Result<ValidateData, ServiceError> {
        self.require_service_admin(admin_token).await?;
        let (token, user) = self.validate_claim(token_id, belongs_to, true).await?;
        self.validate_data(token, user).await
    }

    /// In-process validation for the embedded middleware: normal-flow fault
    /// classification, plus the catalog for capability discovery.
    pub async fn validate_claim_with_catalog(
        &self,
        token_id: &str,
    ) -> Result<(ValidateData, Vec<CatalogEndpoint>), ServiceError> {
        let (token, user) = self.validate_claim(token_id, None, false).await?;
        let catalog = match &token.tenant_id {
            Some(tenant_id) => self.catalog_for_tenant(tenant_id).await?,
            None => Vec::new(),
        };
        let data = self.validate_data(token, user).await?;
        Ok((data, catalog))
    }

    pub async fn revoke_token(&self, admin_token: &str, token_id: &str) -> Result<(), ServiceError> {
        self.require_admin(admin_token).await?;

        if self.repos.tokens.get(token_id).await?.is_none() {
            return Err(ServiceError::NotFound("Token not found".to_string()));
        }
        self.repos.tokens.delete(token_id).await?;
        tracing::info!(token = %token_id, "token revoked");
        Ok(())
    }

    //
    // Authorization predicates
    //

    pub(super) async fn user_has_global_role(
        &self,
        user_id: &str,
        role_id: &str,
    ) -> Result<bool, ServiceError> {
        let grants = self.repos.roles.global_roles_for_user(user_id).await?;
        Ok(grants
            .iter()
            .any(|g| g.role_id == role_id && g.tenant_id.is_none()))
    }

    pub(super) async fn user_is_admin(&self, user_id: &str) -> Result<bool, ServiceError> {
        self.user_has_global_role(user_id, &self.admin_role_id).await
    }

    /// Admin rights include service-admin rights.
    pub(super) async fn user_is_service_admin(&self, user_id: &str) -> Result<bool, ServiceError> {
        if self
            .user_has_global_role(user_id, &self.service_admin_role_id)
            .await?
        {
            return Ok(true);
        }
        self.user_is_admin(user_id).await
    }

    /// Validate the caller's token and require the admin role.
    pub(super) async fn require_admin(
        &self,
        token_id: &str,
    ) -> Result<(Token, User), ServiceError> {
        let (token, user) = self.validate_claim(token_id, None, false).await?;
        if self.user_is_admin(&user.id).await? {
            Ok((token, user))
        } else {
            Err(ServiceError::Unauthorized(
                "You are not authorized to make this call".to_string(),
            ))
        }
    }

    /// Validate the caller's token and require service-admin (or admin).
    pub(super) async fn require_service_admin(
        &self,
        token_id: &str,
    ) -> Result<(Token, User), ServiceError> {
        let (token, user) = self.validate_claim(token_id, None, false).await?;
        if self.user_is_service_admin(&user.id).await? {
            Ok((token, user))
        } else {
            Err(ServiceError::Unauthorized(
                "You are not authorized to make this call".to_string(),
            ))
        }
    }

    /// Mutating a service-owned resource takes ownership of the service or
    /// the admin role.
    pub(super) async fn require_service_ownership(
        &self,
        user: &User,
        service: &Service,
    ) -> Result<(), ServiceError> {
        if is_owner(user, service) || self.user_is_admin(&user.id).await? {
            Ok(())
        } else {
            Err(ServiceError::Unauthorized(format!(
                "You do not have ownership of the '{}' service",
                service.name
            )))
        }
    }

    //
    // Response assembly
    //

    async fn granted_roles(
        &self,
        user_id: &str,
        tenant_id: Option<&str>,
    ) -> Result<Vec<GrantedRole>, ServiceError> {
        let mut grants = Vec::new();
        if let Some(tenant_id) = tenant_id {
            grants.extend(
                self.repos
                    .roles
                    .tenant_roles_for_user(user_id, tenant_id)
                    .await?,
            );
        }
        grants.extend(self.repos.roles.global_roles_for_user(user_id).await?);

        let mut roles = Vec::new();
        for grant in grants {
            if let Some(role) = self.repos.roles.get(&grant.role_id).await? {
                roles.push(GrantedRole {
                    role,
                    tenant_id: grant.tenant_id,
                });
            }
        }
        Ok(roles)
    }

    /// Denormalize a tenant's endpoint catalog (global templates plus the
    /// tenant's bindings) with each owning service's name and type.
    pub(super) async fn catalog_for_tenant(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<CatalogEndpoint>, ServiceError> {
        let templates = self.repos.tenants.endpoints_for_tenant(tenant_id).await?;
        let mut catalog = Vec::new();
        for template in templates {
            let Some(service) = self.repos.services.get(&template.service_id).await? else {
                tracing::warn!(template = %template.id, "endpoint template without service");
                continue;
            };
            catalog.push(CatalogEndpoint::from_template(
                &template,
                &service.name,
                &service.kind,
            ));
        }
        Ok(catalog)
    }

    async fn auth_data(&self, token: Token, user: User) -> Result<AuthData, ServiceError> {
        let (tenant, catalog) = match &token.tenant_id {
            Some(tenant_id) => {
                let tenant = self.repos.tenants.get(tenant_id).await?;
                let catalog = self.catalog_for_tenant(tenant_id).await?;
                (tenant, catalog)
            }
            None => (None, Vec::new()),
        };

        let roles = self
            .granted_roles(&user.id, token.tenant_id.as_deref())
            .await?;
        let include_admin_url = self.user_is_service_admin(&user.id).await?;

        Ok(AuthData {
            token,
            user,
            tenant,
            roles,
            catalog,
            include_admin_url,
        })
    }

    pub(super) async fn validate_data(
        &self,
        token: Token,
        user: User,
    ) -> Result<ValidateData, ServiceError> {
        let tenant = match &token.tenant_id {
            Some(tenant_id) => self.repos.tenants.get(tenant_id).await?,
            None => None,
        };

        let user_tenant_name = match &user.tenant_id {
            Some(tenant_id) => self
                .repos
                .tenants
                .get(tenant_id)
                .await?
                .map(|t| t.name),
            None => None,
        };

        let roles = self
            .granted_roles(&user.id, token.tenant_id.as_deref())
            .await?;

        Ok(ValidateData {
            token,
            tenant,
            user,
            user_tenant_name,
            roles,
        })
    }
}

fn ensure_tenant_enabled(tenant: Tenant) -> Result<Tenant, ServiceError> {
    if !tenant.enabled {
        return Err(ServiceError::TenantDisabled(format!(
            "Tenant {} has been disabled!",
            tenant.id
        )));
    }
    Ok(tenant)
}

/// Ownership: the user created the service.
pub(super) fn is_owner(user: &User, service: &Service) -> bool {
    service.owner_id.as_deref() == Some(user.id.as_str())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::{Credential, Role, Tenant, UserRoleAssociation};
    use crate::repo::Repositories;
    use crate::signer::SignableRequest;
    use crate::utils::password::hash_password;

    struct Fixture {
        identity: IdentityService,
        repos: Repositories,
        tenant: Tenant,
        user: User,
    }

    /// Memory backend seeded like a small deployment: admin roles, one
    /// enabled tenant `acme`, one user `alice` with password `p` defaulting
    /// to it.
    async fn fixture() -> Fixture {
        let repos = Repositories::memory();

        repos.roles.create(Role::new("Admin")).await.unwrap();
        repos
            .roles
            .create(Role::new("KeystoneServiceAdmin"))
            .await
            .unwrap();

        let tenant = repos.tenants.create(Tenant::new("acme")).await.unwrap();

        let mut user = User::new("alice");
        user.password = Some(hash_password("p").unwrap());
        user.tenant_id = Some(tenant.id.clone());
        let user = repos.users.create(user).await.unwrap();

        let identity = IdentityService::new(repos.clone(), "Admin", "KeystoneServiceAdmin", 86400)
            .await
            .unwrap();

        Fixture {
            identity,
            repos,
            tenant,
            user,
        }
    }

    fn password_auth(tenant_name: Option<&str>) -> AuthRequest {
        AuthRequest::Password {
            username: "alice".to_string(),
            password: "p".to_string(),
            tenant_id: None,
            tenant_name: tenant_name.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn password_auth_issues_scoped_token_and_reuses_it() {
        let f = fixture().await;

        let first = f
            .identity
            .authenticate(password_auth(Some("acme")))
            .await
            .unwrap();
        assert_eq!(first.user.id, f.user.id);
        assert_eq!(first.token.tenant_id.as_deref(), Some(f.tenant.id.as_str()));
        assert_eq!(
            first.tenant.as_ref().map(|t| t.name.as_str()),
            Some("acme")
        );

        // Same credentials within the TTL: same token id.
        let second = f
            .identity
            .authenticate(password_auth(Some("acme")))
            .await
            .unwrap();
        assert_eq!(second.token.id, first.token.id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_unauthorized() {
        let f = fixture().await;

        let wrong = AuthRequest::Password {
            username: "alice".to_string(),
            password: "nope".to_string(),
            tenant_id: None,
            tenant_name: None,
        };
        assert!(matches!(
            f.identity.authenticate(wrong).await.unwrap_err(),
            ServiceError::Unauthorized(_)
        ));

        let unknown = AuthRequest::Password {
            username: "bob".to_string(),
            password: "p".to_string(),
            tenant_id: None,
            tenant_name: None,
        };
        assert!(matches!(
            f.identity.authenticate(unknown).await.unwrap_err(),
            ServiceError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn unknown_tenant_is_unauthorized() {
        let f = fixture().await;
        let err = f
            .identity
            .authenticate(password_auth(Some("other")))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn missing_tenant_falls_back_to_the_users_default() {
        let f = fixture().await;
        let data = f.identity.authenticate(password_auth(None)).await.unwrap();
        assert_eq!(data.token.tenant_id.as_deref(), Some(f.tenant.id.as_str()));
    }

    #[tokio::test]
    async fn token_auth_rescopes_without_a_password() {
        let f = fixture().await;
        let first = f.identity.authenticate(password_auth(None)).await.unwrap();

        let rescoped = f
            .identity
            .authenticate(AuthRequest::UnscopedToken {
                token_id: first.token.id.clone(),
                tenant_id: Some(f.tenant.id.clone()),
                tenant_name: None,
            })
            .await
            .unwrap();
        assert_eq!(rescoped.user.id, f.user.id);
        assert_eq!(
            rescoped.token.tenant_id.as_deref(),
            Some(f.tenant.id.as_str())
        );
    }

    #[tokio::test]
    async fn ec2_auth_recovers_a_portless_signature() {
        let f = fixture().await;
        f.repos
            .credentials
            .create(Credential::ec2(
                &f.user.id,
                Some(f.tenant.id.clone()),
                "AK",
                "SK",
            ))
            .await
            .unwrap();

        // Signed against the bare hostname...
        let signed = SignableRequest {
            verb: "GET".to_string(),
            host: "api.example.com".to_string(),
            path: "/services/Cloud".to_string(),
            params: BTreeMap::new(),
        };
        let signature = crate::signer::sign("SK", &signed);

        // ...but transmitted with the port attached.
        let transmitted = SignableRequest {
            host: "api.example.com:443".to_string(),
            ..signed
        };
        let data = f
            .identity
            .authenticate(AuthRequest::Ec2 {
                access: "AK".to_string(),
                signature,
                request: transmitted,
            })
            .await
            .unwrap();
        assert_eq!(data.user.id, f.user.id);
        assert_eq!(data.token.tenant_id.as_deref(), Some(f.tenant.id.as_str()));
    }

    #[tokio::test]
    async fn ec2_auth_rejects_bad_signature_and_unknown_key() {
        let f = fixture().await;
        f.repos
            .credentials
            .create(Credential::ec2(&f.user.id, None, "AK", "SK"))
            .await
            .unwrap();

        let request = SignableRequest {
            verb: "GET".to_string(),
            host: "api.example.com".to_string(),
            path: "/".to_string(),
            params: BTreeMap::new(),
        };

        let bad = AuthRequest::Ec2 {
            access: "AK".to_string(),
            signature: "bogus".to_string(),
            request: request.clone(),
        };
        assert!(matches!(
            f.identity.authenticate(bad).await.unwrap_err(),
            ServiceError::Unauthorized(_)
        ));

        let unknown = AuthRequest::Ec2 {
            access: "NOPE".to_string(),
            signature: crate::signer::sign("SK", &request),
            request,
        };
        assert!(matches!(
            f.identity.authenticate(unknown).await.unwrap_err(),
            ServiceError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn validation_fault_classification() {
        let f = fixture().await;

        // missing claim
        assert!(matches!(
            f.identity.validate_claim("", None, false).await.unwrap_err(),
            ServiceError::Unauthorized(_)
        ));

        // unknown claim: unauthorized normally, not-found in check flow
        assert!(matches!(
            f.identity
                .validate_claim("nope", None, false)
                .await
                .unwrap_err(),
            ServiceError::Unauthorized(_)
        ));
        assert!(matches!(
            f.identity
                .validate_claim("nope", None, true)
                .await
                .unwrap_err(),
            ServiceError::NotFound(_)
        ));

        // expired: forbidden normally, not-found in check flow
        let expired = Token::new(&f.user.id, None, Duration::seconds(-60));
        let expired = f.repos.tokens.create(expired).await.unwrap();
        assert!(matches!(
            f.identity
                .validate_claim(&expired.id, None, false)
                .await
                .unwrap_err(),
            ServiceError::Forbidden(_)
        ));
        assert!(matches!(
            f.identity
                .validate_claim(&expired.id, None, true)
                .await
                .unwrap_err(),
            ServiceError::NotFound(_)
        ));

        // wrong belongs_to
        let data = f.identity.authenticate(password_auth(None)).await.unwrap();
        assert!(matches!(
            f.identity
                .validate_claim(&data.token.id, Some("elsewhere"), false)
                .await
                .unwrap_err(),
            ServiceError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn disabled_principals_fail_validation_with_their_own_kind() {
        let f = fixture().await;
        let data = f.identity.authenticate(password_auth(None)).await.unwrap();

        let disabled_user = User {
            enabled: false,
            ..f.user.clone()
        };
        f.repos.users.update(disabled_user).await.unwrap();
        assert!(matches!(
            f.identity
                .validate_claim(&data.token.id, None, false)
                .await
                .unwrap_err(),
            ServiceError::UserDisabled(_)
        ));

        // re-enable the user, disable the tenant
        f.repos.users.update(f.user.clone()).await.unwrap();
        let disabled_tenant = Tenant {
            enabled: false,
            ..f.tenant.clone()
        };
        f.repos.tenants.update(disabled_tenant).await.unwrap();
        assert!(matches!(
            f.identity
                .validate_claim(&data.token.id, None, false)
                .await
                .unwrap_err(),
            ServiceError::TenantDisabled(_)
        ));
    }

    #[tokio::test]
    async fn admin_implies_service_admin() {
        let f = fixture().await;

        let admin_role = f.repos.roles.get_by_name("Admin").await.unwrap().unwrap();
        f.repos
            .roles
            .grant_create(UserRoleAssociation::new(&f.user.id, &admin_role.id, None))
            .await
            .unwrap();

        let data = f.identity.authenticate(password_auth(None)).await.unwrap();
        assert!(f.identity.require_admin(&data.token.id).await.is_ok());
        assert!(f
            .identity
            .require_service_admin(&data.token.id)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn tenant_scoped_grant_does_not_confer_admin() {
        let f = fixture().await;

        let admin_role = f.repos.roles.get_by_name("Admin").await.unwrap().unwrap();
        f.repos
            .roles
            .grant_create(UserRoleAssociation::new(
                &f.user.id,
                &admin_role.id,
                Some(f.tenant.id.clone()),
            ))
            .await
            .unwrap();

        let data = f.identity.authenticate(password_auth(None)).await.unwrap();
        assert!(matches!(
            f.identity.require_admin(&data.token.id).await.unwrap_err(),
            ServiceError::Unauthorized(_)
        ));
    }
}
