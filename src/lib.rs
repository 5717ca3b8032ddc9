//! # Portier (invitation-gated sign-in)
//!
//! `portier` gates a web application behind sign-in. Accounts are provisioned
//! through invitation codes and every browser is tracked by a server-side
//! session keyed by an opaque cookie token.
//!
//! ## Sessions
//!
//! - **Fixation:** the session token is rotated on every privilege change
//!   (successful sign-in and sign-out). The old token stops resolving at the
//!   moment of rotation.
//! - **Storage:** only a SHA-256 hash of the token is used as the session key.
//! - **CSRF:** each session carries one anti-forgery token that is injected into
//!   every rendered form and checked on every `POST`.
//!
//! ## Registration
//!
//! Sign-up requires an invitation code whose `valid_until` deadline has not
//! passed (the deadline itself is still valid). Registration never signs the
//! user in; an explicit sign-in is always required.
//!
//! ## Failures
//!
//! Every failed submission redirects (`303 See Other`) back to the form it came
//! from without changing any state. Unknown usernames and wrong passwords are
//! indistinguishable to the client.

pub mod cli;
pub mod portier;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
