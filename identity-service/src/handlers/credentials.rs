//! User credential handlers (OS-KSADM credentials sub-resource).

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;

use crate::wire::{
    CredentialInput, CredentialsDoc, Ec2CredentialDoc, PasswordCredentialsDoc, Wire,
};
use crate::AppState;

use super::AuthToken;

/// GET /v2.0/users/{user_id}/OS-KSADM/credentials
pub async fn list(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(user_id): Path<String>,
) -> Result<Response, Response> {
    let (username, ec2) = state
        .identity
        .get_credentials(&admin_token, &user_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &CredentialsDoc { username, ec2 }))
}

/// POST /v2.0/users/{user_id}/OS-KSADM/credentials: password or EC2,
/// dispatched on the document root.
pub async fn create(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Result<Response, Response> {
    match wire.parse_credential(&body).map_err(|e| wire.fail(e))? {
        CredentialInput::Password { username, password } => {
            let username = state
                .identity
                .create_password_credentials(
                    &admin_token,
                    &user_id,
                    &username,
                    password.as_deref(),
                )
                .await
                .map_err(|e| wire.fail(e))?;
            Ok(wire.render(StatusCode::CREATED, &PasswordCredentialsDoc(username)))
        }
        CredentialInput::Ec2(input) => {
            let credential = state
                .identity
                .create_ec2_credential(&admin_token, &user_id, input)
                .await
                .map_err(|e| wire.fail(e))?;
            Ok(wire.render(StatusCode::CREATED, &Ec2CredentialDoc(credential)))
        }
    }
}

/// GET /v2.0/users/{user_id}/OS-KSADM/credentials/passwordCredentials
pub async fn get_password(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(user_id): Path<String>,
) -> Result<Response, Response> {
    let username = state
        .identity
        .get_password_credentials(&admin_token, &user_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &PasswordCredentialsDoc(username)))
}

/// PUT /v2.0/users/{user_id}/OS-KSADM/credentials/passwordCredentials
pub async fn update_password(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Result<Response, Response> {
    let (username, password) = wire
        .parse_password_credentials(&body)
        .map_err(|e| wire.fail(e))?;
    let username = state
        .identity
        .update_password_credentials(&admin_token, &user_id, &username, password.as_deref())
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &PasswordCredentialsDoc(username)))
}

/// DELETE /v2.0/users/{user_id}/OS-KSADM/credentials/passwordCredentials
pub async fn delete_password(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path(user_id): Path<String>,
) -> Result<Response, Response> {
    state
        .identity
        .delete_password_credentials(&admin_token, &user_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(Wire::no_content())
}

/// GET /v2.0/users/{user_id}/OS-KSADM/credentials/OS-KSEC2:ec2Credentials/{credential_id}
pub async fn get_ec2(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path((user_id, credential_id)): Path<(String, String)>,
) -> Result<Response, Response> {
    let credential = state
        .identity
        .get_ec2_credential(&admin_token, &user_id, &credential_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(wire.render(StatusCode::OK, &Ec2CredentialDoc(credential)))
}

/// DELETE /v2.0/users/{user_id}/OS-KSADM/credentials/OS-KSEC2:ec2Credentials/{credential_id}
pub async fn delete_ec2(
    State(state): State<AppState>,
    wire: Wire,
    AuthToken(admin_token): AuthToken,
    Path((user_id, credential_id)): Path<(String, String)>,
) -> Result<Response, Response> {
    state
        .identity
        .delete_ec2_credential(&admin_token, &user_id, &credential_id)
        .await
        .map_err(|e| wire.fail(e))?;
    Ok(Wire::no_content())
}
