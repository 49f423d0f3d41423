use thiserror::Error;

#[derive(Debug, Error)]
pub enum MiddlewareError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// The identity service rejected (or could not confirm) a claim.
///
/// Everything the validator can fail with collapses into this one case: the
/// middleware either forwards with `X-Identity-Status: Invalid` (delayed
/// decision) or answers 401, regardless of the underlying cause.
#[derive(Debug, Error)]
#[error("token validation failed: {reason}")]
pub struct ValidationFailed {
    pub reason: String,
}

impl ValidationFailed {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
