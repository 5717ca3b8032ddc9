//! Server-side session state keyed by an opaque cookie token.
//!
//! Flow Overview: every request resolves its cookie into a [`SessionContext`]
//! via [`SessionStore::load`], creating a fresh anonymous session when the
//! token is missing, unknown, or expired. Privilege changes go through the
//! combined operations (`renew_and_insert`, `destroy_and_renew`) so no other
//! request on the same token can observe a rotated token without its data, or
//! the reverse.
//!
//! Security boundaries: raw tokens only travel in the cookie; the table is
//! keyed by their SHA-256 hash.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::{sync::Mutex, task::JoinHandle, time::interval};
use tracing::debug;
use uuid::Uuid;

use super::state::MAX_SESSION_TTL_SECONDS;
use super::utils::{generate_token, hash_token};
use crate::portier::store::BoxFuture;

pub const USER_SIGNED_IN_KEY: &str = "user_signed_in";
pub const CURRENT_USER_ID_KEY: &str = "current_user_id";

const TOKEN_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to generate session token: {0}")]
    TokenGeneration(String),
    #[error("session renewal failed: {0}")]
    Renewal(String),
    #[error("session destruction failed: {0}")]
    Destruction(String),
    #[error("session was revoked")]
    Revoked,
}

/// The session a request is bound to.
///
/// `token_changed` is set when the token was created or rotated while handling
/// the request, meaning the client needs a new cookie.
#[derive(Clone)]
pub struct SessionContext {
    token: String,
    token_changed: bool,
}

impl SessionContext {
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn token_changed(&self) -> bool {
        self.token_changed
    }

    fn rotate(&mut self, token: String) {
        self.token = token;
        self.token_changed = true;
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("token", &"[redacted]")
            .field("token_changed", &self.token_changed)
            .finish()
    }
}

pub type SessionEntries = Vec<(&'static str, Value)>;

/// Session persistence used by the auth flow.
pub trait SessionStore: Send + Sync {
    /// Resolve `token` or start a new empty session.
    fn load<'a>(&'a self, token: Option<&'a str>) -> BoxFuture<'a, Result<SessionContext, SessionError>>;

    /// Read one key; a missing session or key reads as `None`.
    fn get<'a>(&'a self, ctx: &'a SessionContext, key: &'a str) -> BoxFuture<'a, Option<Value>>;

    fn insert<'a>(
        &'a self,
        ctx: &'a SessionContext,
        entries: SessionEntries,
    ) -> BoxFuture<'a, Result<(), SessionError>>;

    /// Move the session's data to a new token and revoke the old one.
    fn renew_token<'a>(&'a self, ctx: &'a mut SessionContext) -> BoxFuture<'a, Result<(), SessionError>>;

    /// Rotate the token and apply `entries` as one atomic step.
    fn renew_and_insert<'a>(
        &'a self,
        ctx: &'a mut SessionContext,
        entries: SessionEntries,
    ) -> BoxFuture<'a, Result<(), SessionError>>;

    /// Drop all data and revoke the token.
    fn destroy<'a>(&'a self, ctx: &'a mut SessionContext) -> BoxFuture<'a, Result<(), SessionError>>;

    /// Destroy the session and hand the context a fresh empty one, atomically.
    fn destroy_and_renew<'a>(
        &'a self,
        ctx: &'a mut SessionContext,
    ) -> BoxFuture<'a, Result<(), SessionError>>;
}

pub async fn is_signed_in(store: &dyn SessionStore, ctx: &SessionContext) -> bool {
    store
        .get(ctx, USER_SIGNED_IN_KEY)
        .await
        .and_then(|value| value.as_bool())
        .unwrap_or(false)
}

pub async fn current_user_id(store: &dyn SessionStore, ctx: &SessionContext) -> Option<Uuid> {
    store
        .get(ctx, CURRENT_USER_ID_KEY)
        .await
        .and_then(|value| value.as_str().and_then(|id| Uuid::parse_str(id).ok()))
}

/// Write the signed-in flag and the user it belongs to.
///
/// # Errors
/// Returns an error if the session can no longer be written.
pub async fn set_signed_in(
    store: &dyn SessionStore,
    ctx: &SessionContext,
    value: bool,
    user_id: Option<Uuid>,
) -> Result<(), SessionError> {
    store.insert(ctx, signed_in_entries(value, user_id)).await
}

/// Rotate the token and mark the session signed in for `user_id` in one step.
///
/// # Errors
/// Returns an error if the token cannot be rotated; nothing is written then.
pub async fn renew_and_sign_in(
    store: &dyn SessionStore,
    ctx: &mut SessionContext,
    user_id: Uuid,
) -> Result<(), SessionError> {
    store
        .renew_and_insert(ctx, signed_in_entries(true, Some(user_id)))
        .await
}

fn signed_in_entries(value: bool, user_id: Option<Uuid>) -> SessionEntries {
    vec![
        (USER_SIGNED_IN_KEY, Value::Bool(value)),
        (
            CURRENT_USER_ID_KEY,
            user_id.map_or(Value::Null, |id| Value::String(id.to_string())),
        ),
    ]
}

struct SessionEntry {
    data: HashMap<String, Value>,
    expires_at: Instant,
}

/// In-process session table with an idle TTL.
///
/// Expired entries are never served and are dropped when their token is seen
/// again; [`MemorySessionStore::spawn_sweeper`] reclaims the rest.
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<Vec<u8>, SessionEntry>>,
}

impl MemorySessionStore {
    /// `ttl` is capped at [`MAX_SESSION_TTL_SECONDS`].
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: ttl.min(Duration::from_secs(MAX_SESSION_TTL_SECONDS)),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Drop every expired entry, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        let now = Instant::now();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }

    /// Purge expired entries every `period` until the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let purged = store.purge_expired().await;
                if purged > 0 {
                    debug!(purged, "Purged expired sessions");
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        let sessions = self.sessions.lock().await;
        let now = Instant::now();
        sessions.values().filter(|entry| entry.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn expiry(&self, now: Instant) -> Instant {
        now.checked_add(self.ttl).unwrap_or(now)
    }

    fn entry(&self, data: HashMap<String, Value>) -> SessionEntry {
        SessionEntry {
            data,
            expires_at: self.expiry(Instant::now()),
        }
    }
}

/// Pick a token whose hash is not already in use.
fn fresh_token(sessions: &HashMap<Vec<u8>, SessionEntry>) -> Result<(String, Vec<u8>), SessionError> {
    for _ in 0..TOKEN_ATTEMPTS {
        let token = generate_token().map_err(|e| SessionError::TokenGeneration(e.to_string()))?;
        let token_hash = hash_token(&token);
        if !sessions.contains_key(&token_hash) {
            return Ok((token, token_hash));
        }
    }
    Err(SessionError::TokenGeneration(
        "failed to generate unique session token".to_string(),
    ))
}

fn live_entry<'a>(
    sessions: &'a mut HashMap<Vec<u8>, SessionEntry>,
    token_hash: &[u8],
) -> Option<&'a mut SessionEntry> {
    let now = Instant::now();
    sessions
        .get_mut(token_hash)
        .filter(|entry| entry.expires_at > now)
}

impl SessionStore for MemorySessionStore {
    fn load<'a>(&'a self, token: Option<&'a str>) -> BoxFuture<'a, Result<SessionContext, SessionError>> {
        Box::pin(async move {
            let mut sessions = self.sessions.lock().await;

            if let Some(token) = token {
                let token_hash = hash_token(token);
                if let Some(entry) = live_entry(&mut sessions, &token_hash) {
                    entry.expires_at = self.expiry(Instant::now());
                    return Ok(SessionContext {
                        token: token.to_string(),
                        token_changed: false,
                    });
                }
                // unknown is a no-op, expired is dropped
                sessions.remove(&token_hash);
            }

            let (token, token_hash) = fresh_token(&sessions)?;
            sessions.insert(token_hash, self.entry(HashMap::new()));
            Ok(SessionContext {
                token,
                token_changed: true,
            })
        })
    }

    fn get<'a>(&'a self, ctx: &'a SessionContext, key: &'a str) -> BoxFuture<'a, Option<Value>> {
        Box::pin(async move {
            let mut sessions = self.sessions.lock().await;
            live_entry(&mut sessions, &hash_token(&ctx.token))
                .and_then(|entry| entry.data.get(key).cloned())
        })
    }

    fn insert<'a>(
        &'a self,
        ctx: &'a SessionContext,
        entries: SessionEntries,
    ) -> BoxFuture<'a, Result<(), SessionError>> {
        Box::pin(async move {
            let mut sessions = self.sessions.lock().await;
            // A destroyed or expired token must not come back to life.
            let entry = live_entry(&mut sessions, &hash_token(&ctx.token))
                .ok_or(SessionError::Revoked)?;
            for (key, value) in entries {
                entry.data.insert(key.to_string(), value);
            }
            Ok(())
        })
    }

    fn renew_token<'a>(&'a self, ctx: &'a mut SessionContext) -> BoxFuture<'a, Result<(), SessionError>> {
        self.renew_and_insert(ctx, Vec::new())
    }

    fn renew_and_insert<'a>(
        &'a self,
        ctx: &'a mut SessionContext,
        entries: SessionEntries,
    ) -> BoxFuture<'a, Result<(), SessionError>> {
        Box::pin(async move {
            let mut sessions = self.sessions.lock().await;
            let (token, token_hash) =
                fresh_token(&sessions).map_err(|e| SessionError::Renewal(e.to_string()))?;

            let now = Instant::now();
            let mut data = sessions
                .remove(&hash_token(&ctx.token))
                .filter(|entry| entry.expires_at > now)
                .map(|entry| entry.data)
                .unwrap_or_default();
            for (key, value) in entries {
                data.insert(key.to_string(), value);
            }

            sessions.insert(token_hash, self.entry(data));
            ctx.rotate(token);
            Ok(())
        })
    }

    fn destroy<'a>(&'a self, ctx: &'a mut SessionContext) -> BoxFuture<'a, Result<(), SessionError>> {
        Box::pin(async move {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(&hash_token(&ctx.token));
            Ok(())
        })
    }

    fn destroy_and_renew<'a>(
        &'a self,
        ctx: &'a mut SessionContext,
    ) -> BoxFuture<'a, Result<(), SessionError>> {
        Box::pin(async move {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(&hash_token(&ctx.token));

            let (token, token_hash) =
                fresh_token(&sessions).map_err(|e| SessionError::Renewal(e.to_string()))?;
            sessions.insert(token_hash, self.entry(HashMap::new()));
            ctx.rotate(token);
            Ok(())
        })
    }
}
