//! Per-session anti-forgery tokens.
//!
//! The token lives in the session under [`CSRF_TOKEN_KEY`], so it follows the
//! session through token rotation and disappears with it on sign-out.

use serde_json::Value;
use std::sync::Arc;

use super::{
    error::AuthError,
    session::{SessionContext, SessionError, SessionStore},
    utils::{generate_token, tokens_match},
};

pub const CSRF_TOKEN_KEY: &str = "csrf_token";

#[derive(Clone)]
pub struct CsrfTokens {
    sessions: Arc<dyn SessionStore>,
}

impl CsrfTokens {
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    /// The session's token, created on first use.
    ///
    /// # Errors
    /// Returns an error if a new token cannot be generated or stored.
    pub async fn token(&self, ctx: &SessionContext) -> Result<String, SessionError> {
        if let Some(Value::String(token)) = self.sessions.get(ctx, CSRF_TOKEN_KEY).await {
            return Ok(token);
        }

        let token = generate_token().map_err(|e| SessionError::TokenGeneration(e.to_string()))?;
        self.sessions
            .insert(ctx, vec![(CSRF_TOKEN_KEY, Value::String(token.clone()))])
            .await?;
        Ok(token)
    }

    /// Check a submitted token against the session's.
    ///
    /// # Errors
    /// Returns [`AuthError::Csrf`] when the token is missing or does not match.
    pub async fn verify(&self, ctx: &SessionContext, submitted: Option<&str>) -> Result<(), AuthError> {
        let Some(submitted) = submitted.filter(|value| !value.is_empty()) else {
            return Err(AuthError::Csrf);
        };
        match self.sessions.get(ctx, CSRF_TOKEN_KEY).await {
            Some(Value::String(expected)) if tokens_match(&expected, submitted) => Ok(()),
            _ => Err(AuthError::Csrf),
        }
    }
}
