use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::portier::auth::MAX_SESSION_TTL_SECONDS;

pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_MIN_USERNAME_LEN: &str = "min-username-len";
pub const ARG_MAX_USERNAME_LEN: &str = "max-username-len";
pub const ARG_MIN_PASSWORD_LEN: &str = "min-password-len";

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_session_args(command);
    with_form_args(command)
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Idle session TTL in seconds, also used as the cookie Max-Age")
                .env("PORTIER_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_SESSION_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark the session cookie Secure (serve over HTTPS)")
                .env("PORTIER_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
}

fn with_form_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MIN_USERNAME_LEN)
                .long(ARG_MIN_USERNAME_LEN)
                .help("Minimum username length on sign-up")
                .env("PORTIER_MIN_USERNAME_LEN")
                .default_value("3")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new(ARG_MAX_USERNAME_LEN)
                .long(ARG_MAX_USERNAME_LEN)
                .help("Maximum username length on sign-up")
                .env("PORTIER_MAX_USERNAME_LEN")
                .default_value("32")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new(ARG_MIN_PASSWORD_LEN)
                .long(ARG_MIN_PASSWORD_LEN)
                .help("Minimum password length on sign-up")
                .env("PORTIER_MIN_PASSWORD_LEN")
                .default_value("8")
                .value_parser(clap::value_parser!(usize)),
        )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
    pub min_username_len: usize,
    pub max_username_len: usize,
    pub min_password_len: usize,
}

impl Options {
    /// Read auth options from parsed arguments.
    ///
    /// # Errors
    /// Returns an error if the username length bounds are inconsistent.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let options = Self {
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(43_200),
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
            min_username_len: matches
                .get_one::<usize>(ARG_MIN_USERNAME_LEN)
                .copied()
                .unwrap_or(3),
            max_username_len: matches
                .get_one::<usize>(ARG_MAX_USERNAME_LEN)
                .copied()
                .unwrap_or(32),
            min_password_len: matches
                .get_one::<usize>(ARG_MIN_PASSWORD_LEN)
                .copied()
                .unwrap_or(8),
        };

        if options.min_username_len > options.max_username_len {
            return Err(anyhow!(
                "--{ARG_MIN_USERNAME_LEN} ({}) must not exceed --{ARG_MAX_USERNAME_LEN} ({})",
                options.min_username_len,
                options.max_username_len
            ));
        }

        Ok(options)
    }
}
