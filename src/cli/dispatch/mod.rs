//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action the binary executes.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::auth;
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use url::Url;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    validate_dsn(&dsn)?;

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn: SecretString::from(dsn),
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        cookie_secure: auth_opts.cookie_secure,
        min_username_len: auth_opts.min_username_len,
        max_username_len: auth_opts.max_username_len,
        min_password_len: auth_opts.min_password_len,
    }))
}

fn validate_dsn(dsn: &str) -> Result<()> {
    // Never echo the DSN back; it may carry a password.
    let url = Url::parse(dsn).map_err(|e| anyhow!("invalid --dsn: {e}"))?;
    match url.scheme() {
        "postgres" | "postgresql" => Ok(()),
        scheme => Err(anyhow!(
            "invalid --dsn: unsupported scheme '{scheme}', expected postgres:// or postgresql://"
        )),
    }
}
