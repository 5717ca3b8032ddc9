//! Sign-in, sign-up and sign-out.
//!
//! The [`flow`] functions are the only entry points the HTTP layer calls. Each
//! takes the shared [`AuthState`] and a per-request [`RequestContext`] and
//! returns an [`Outcome`]: a view to render or a route to redirect to.
//!
//! ## States
//!
//! A session is either anonymous or signed in, decided by the
//! `user_signed_in` session key. Only a successful sign-in moves a session to
//! signed in; only sign-out moves it back. Both rotate the session token.
//!
//! ## Failures
//!
//! Flow steps return [`AuthError`]; a single boundary logs the error (warn for
//! user input problems, error for system failures) and redirects back to the
//! originating form. The client never learns which step failed.

pub mod csrf;
pub mod error;
pub mod flow;
pub mod form;
pub mod invitation;
pub mod password;
pub mod session;
mod state;
mod utils;

pub use error::AuthError;
pub use flow::{Outcome, RequestContext, Route};
pub use state::{AuthConfig, AuthState, MAX_SESSION_TTL_SECONDS};
