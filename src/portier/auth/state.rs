//! Auth configuration and the shared state handed to every request.

use std::sync::Arc;
use std::time::Duration;

use super::{
    csrf::CsrfTokens, form::FormPolicy, password::CredentialCodec, session::SessionStore,
};
use crate::portier::{render::Render, store::Store};

const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;

/// Longest accepted session TTL, one year.
pub const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: u64,
    session_cookie_secure: bool,
    form_policy: FormPolicy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_cookie_secure: false,
            form_policy: FormPolicy::default(),
        }
    }

    /// Set the idle session TTL, clamped to `1..=MAX_SESSION_TTL_SECONDS`.
    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds.clamp(1, MAX_SESSION_TTL_SECONDS);
        self
    }

    #[must_use]
    pub fn with_session_cookie_secure(mut self, secure: bool) -> Self {
        self.session_cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_form_policy(mut self, policy: FormPolicy) -> Self {
        self.form_policy = policy;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.session_cookie_secure
    }

    #[must_use]
    pub fn form_policy(&self) -> &FormPolicy {
        &self.form_policy
    }
}

/// Collaborators shared by all requests.
///
/// Nothing request-specific lives here; per-request data travels in
/// [`super::RequestContext`].
pub struct AuthState {
    config: AuthConfig,
    store: Arc<dyn Store>,
    sessions: Arc<dyn SessionStore>,
    csrf: CsrfTokens,
    codec: CredentialCodec,
    render: Arc<dyn Render>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn Store>,
        sessions: Arc<dyn SessionStore>,
        render: Arc<dyn Render>,
    ) -> Self {
        Self {
            config,
            store,
            csrf: CsrfTokens::new(sessions.clone()),
            sessions,
            codec: CredentialCodec::default(),
            render,
        }
    }

    #[must_use]
    pub fn with_codec(mut self, codec: CredentialCodec) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    #[must_use]
    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    #[must_use]
    pub fn csrf(&self) -> &CsrfTokens {
        &self.csrf
    }

    #[must_use]
    pub fn codec(&self) -> &CredentialCodec {
        &self.codec
    }

    #[must_use]
    pub fn render(&self) -> &dyn Render {
        self.render.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new();
        assert_eq!(config.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
        assert!(!config.session_cookie_secure());
        assert_eq!(config.form_policy(), &FormPolicy::default());

        let config = config
            .with_session_ttl_seconds(60)
            .with_session_cookie_secure(true)
            .with_form_policy(FormPolicy::default().with_min_password_len(12));

        assert_eq!(config.session_ttl(), Duration::from_secs(60));
        assert!(config.session_cookie_secure());
        assert_eq!(config.form_policy().min_password_len(), 12);
    }

    #[test]
    fn session_ttl_is_clamped() {
        let config = AuthConfig::new().with_session_ttl_seconds(u64::MAX);
        assert_eq!(config.session_ttl_seconds(), MAX_SESSION_TTL_SECONDS);

        let config = AuthConfig::new().with_session_ttl_seconds(0);
        assert_eq!(config.session_ttl_seconds(), 1);
    }
}
