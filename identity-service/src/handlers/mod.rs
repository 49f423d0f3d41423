//! Admin HTTP surface.
//!
//! Handlers are thin: negotiate the wire format, parse the body, call the
//! core with the caller's `X-Auth-Token`, render the document or the fault.

pub mod credentials;
pub mod endpoints;
pub mod roles;
pub mod services;
pub mod tenants;
pub mod tokens;
pub mod users;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Deserialize;

use crate::AppState;

/// The caller's bearer token. Missing headers become an empty claim, which
/// the core rejects as unauthorized.
pub struct AuthToken(pub String);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthToken {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("x-auth-token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Ok(AuthToken(token))
    }
}

/// Common paging query parameters; `name` turns list endpoints into
/// by-name lookups.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub marker: Option<String>,
    pub limit: Option<usize>,
    pub name: Option<String>,
}

impl ListQuery {
    /// Clamp the requested limit to the configured bounds.
    pub fn limit(&self, state: &AppState) -> usize {
        self.limit
            .unwrap_or(state.config.page_limit_default)
            .clamp(1, state.config.page_limit_max)
    }
}
