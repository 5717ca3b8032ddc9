use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{form::ValidationError, password::CredentialError, session::SessionError};
use crate::portier::store::StoreError;

/// Everything that can stop an auth transition.
///
/// None of these are fatal; the flow logs them and redirects back to the form
/// the submission came from.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid CSRF token")]
    Csrf,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("credentials do not match")]
    Mismatch,
    #[error("invitation code expired at {valid_until}")]
    Expired { valid_until: DateTime<Utc> },
    #[error("failed to encode password: {0}")]
    Encoding(String),
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AuthError {
    /// Failures caused by what the user submitted rather than by the system.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Csrf
                | Self::NotFound(_)
                | Self::Mismatch
                | Self::Expired { .. }
                | Self::Store(StoreError::Conflict)
        )
    }

    /// Map a store failure, naming the record kind when it was missing.
    pub(super) fn from_store(err: StoreError, record: &'static str) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound(record),
            other => Self::Store(other),
        }
    }
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Encoding(message) => Self::Encoding(message),
            CredentialError::Mismatch => Self::Mismatch,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
