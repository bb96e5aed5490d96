use std::str::FromStr;

use thiserror::Error;
use tracing::error;

use crate::repository::StoreError;

/// Outcome of a rejected service call. The message is safe to show to the
/// caller; infrastructure detail is logged, never embedded.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed identifiers, dates, missing fields.
    #[error("{0}")]
    InvalidInput(String),

    /// Caller is known but not allowed to do this.
    #[error("{0}")]
    Forbidden(String),

    /// Request clashes with current state (overlap, closed poll, duplicates).
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    /// Session or invitation token failed verification.
    #[error("{0}")]
    Unauthorized(String),

    /// Store failure. Carries only a generic description.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn no_permission() -> Self {
        Self::Forbidden("you have no permissions to do this".into())
    }

    pub fn group_not_found() -> Self {
        Self::NotFound("this group does not exist or you are not a member of it".into())
    }
}

/// Logs a store failure and replaces it with a generic message.
pub(crate) fn internal(context: &'static str) -> impl FnOnce(StoreError) -> ServiceError {
    move |e| {
        error!("{}: {}", context, e);
        ServiceError::Internal(context.to_string())
    }
}

pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ServiceError> {
    raw.parse()
        .map_err(|_| ServiceError::InvalidInput(format!("invalid {} id", what)))
}
