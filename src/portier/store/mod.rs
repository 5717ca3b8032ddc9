//! Persistent store for users and invitation codes.
//!
//! The auth flow only talks to the [`Store`] trait. `PgStore` is the production
//! implementation; `MemoryStore` backs tests and embedded use.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use chrono::{DateTime, Utc};
use std::{future::Future, pin::Pin};
use thiserror::Error;
use uuid::Uuid;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A registered account.
///
/// `password_hash` is an Argon2 PHC string; the auth flow clears it as soon as
/// the password has been verified.
#[derive(Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"[redacted]")
            .field("last_login_at", &self.last_login_at)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvitationCode {
    pub code: String,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("username already taken")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Operations the auth flow needs from persistence.
///
/// Implementations surface failures synchronously; retries, if any, are their
/// own concern.
pub trait Store: Send + Sync {
    fn select_user_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, Result<User, StoreError>>;

    /// Stamp the user's last login with the current time.
    fn update_user_last_login<'a>(&'a self, user: &'a User) -> BoxFuture<'a, Result<(), StoreError>>;

    fn select_invitation_code<'a>(
        &'a self,
        code: &'a str,
    ) -> BoxFuture<'a, Result<InvitationCode, StoreError>>;

    /// Insert a new user; duplicate usernames fail with [`StoreError::Conflict`].
    fn insert_user<'a>(
        &'a self,
        username: &'a str,
        password_hash: &'a str,
    ) -> BoxFuture<'a, Result<Uuid, StoreError>>;

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>>;
}
