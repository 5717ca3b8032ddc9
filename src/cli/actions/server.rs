use crate::portier::{
    self,
    auth::{form::FormPolicy, AuthConfig},
};
use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
    pub min_username_len: usize,
    pub max_username_len: usize,
    pub min_password_len: usize,
}

impl Args {
    #[must_use]
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new()
            .with_session_ttl_seconds(self.session_ttl_seconds)
            .with_session_cookie_secure(self.cookie_secure)
            .with_form_policy(
                FormPolicy::default()
                    .with_min_username_len(self.min_username_len)
                    .with_max_username_len(self.max_username_len)
                    .with_min_password_len(self.min_password_len),
            )
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = args.auth_config();
    debug!("Auth config: {:?}", auth_config);

    portier::new(
        args.port,
        args.dsn.expose_secret().to_string(),
        auth_config,
    )
    .await
}
