//! Service-layer error taxonomy.

use axum::http::StatusCode;
use thiserror::Error;

use crate::repo::RepoError;

/// Everything the identity core can fail with. The transport layer renders
/// these as JSON/XML fault documents; nothing is recovered internally.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    UserDisabled(String),

    #[error("{0}")]
    TenantDisabled(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_)
            | ServiceError::UserDisabled(_)
            | ServiceError::TenantDisabled(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Root element / JSON key of the rendered fault document.
    pub fn fault_name(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "badRequest",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::NotFound(_) => "itemNotFound",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::UserDisabled(_) => "userDisabled",
            ServiceError::TenantDisabled(_) => "tenantDisabled",
            ServiceError::Internal(_) => "identityFault",
        }
    }

    /// Message rendered to the client. Internal detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Conflict(msg) => ServiceError::Conflict(msg),
            RepoError::Backend(e) => ServiceError::Internal(e),
        }
    }
}
