//! Auth flow controller.
//!
//! Every function here maps one route to an [`Outcome`]. Steps that can fail
//! live in `try_*` helpers returning [`AuthError`]; the public wrappers hand
//! failures to [`fail`], which logs and picks the redirect.

use chrono::Utc;
use secrecy::SecretString;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    error::AuthError,
    form::{
        self, Fields, ValidationError, FIELD_CODE, FIELD_CSRF_TOKEN, FIELD_PASSWORD,
        FIELD_USERNAME, SIGN_IN_FIELDS,
    },
    invitation,
    session::{self, SessionContext},
    state::AuthState,
};
use crate::portier::{
    render::{View, ViewData},
    store::User,
};

/// Redirect targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Root,
    SignIn,
    SignUp,
    SignOut,
    Dashboard,
}

impl Route {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Root => "/",
            Self::SignIn => "/sign_in",
            Self::SignUp => "/sign_up",
            Self::SignOut => "/sign_out",
            Self::Dashboard => "/dashboard",
        }
    }
}

/// What the HTTP layer should answer with.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Render { view: View, data: ViewData },
    Redirect(Route),
}

/// Per-request auth context: the bound session and, after a successful
/// sign-in, the user that signed in.
#[derive(Debug)]
pub struct RequestContext {
    session: SessionContext,
    current_user: Option<User>,
    expire_cookie: bool,
}

impl RequestContext {
    #[must_use]
    pub fn new(session: SessionContext) -> Self {
        Self {
            session,
            current_user: None,
            expire_cookie: false,
        }
    }

    /// Whether the client must drop its session cookie, set when sign-out
    /// could not hand out a fresh token.
    #[must_use]
    pub fn expire_cookie(&self) -> bool {
        self.expire_cookie
    }

    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    #[must_use]
    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }
}

pub async fn root(state: &AuthState, ctx: &RequestContext) -> Outcome {
    if signed_in(state, ctx).await {
        Outcome::Redirect(Route::Dashboard)
    } else {
        Outcome::Redirect(Route::SignIn)
    }
}

pub async fn sign_in_form(state: &AuthState, ctx: &RequestContext) -> Outcome {
    if signed_in(state, ctx).await {
        return Outcome::Redirect(Route::Dashboard);
    }
    render(state, ctx, View::SignIn).await
}

pub async fn sign_up_form(state: &AuthState, ctx: &RequestContext) -> Outcome {
    if signed_in(state, ctx).await {
        return Outcome::Redirect(Route::Dashboard);
    }
    render(state, ctx, View::SignUp).await
}

pub async fn dashboard(state: &AuthState, ctx: &RequestContext) -> Outcome {
    if !signed_in(state, ctx).await {
        return Outcome::Redirect(Route::SignIn);
    }
    render(state, ctx, View::Dashboard).await
}

/// Authenticate the submitted credentials and sign the session in.
///
/// On success the session token has been rotated and `ctx` carries the user,
/// with its password hash cleared. On failure nothing about the session has
/// changed.
pub async fn sign_in(state: &AuthState, ctx: &mut RequestContext, fields: &Fields) -> Outcome {
    match try_sign_in(state, ctx, fields).await {
        Ok(user_id) => {
            info!(%user_id, "User signed in");
            Outcome::Redirect(Route::Dashboard)
        }
        Err(err) => fail("sign in", Route::SignIn, &err),
    }
}

async fn try_sign_in(
    state: &AuthState,
    ctx: &mut RequestContext,
    fields: &Fields,
) -> Result<Uuid, AuthError> {
    state
        .csrf()
        .verify(&ctx.session, fields.get(FIELD_CSRF_TOKEN))
        .await?;
    form::validate_required(fields, &SIGN_IN_FIELDS)?;

    let username = trimmed(fields, FIELD_USERNAME)?;
    let password = secret(fields, FIELD_PASSWORD)?;

    // Unknown user and wrong password end in the same redirect.
    let mut user = state
        .store()
        .select_user_by_username(username)
        .await
        .map_err(|err| AuthError::from_store(err, "user"))?;
    state
        .codec()
        .verify_blocking(&password, &user.password_hash)
        .await?;
    user.password_hash.clear();

    state.store().update_user_last_login(&user).await?;
    session::renew_and_sign_in(state.sessions(), &mut ctx.session, user.id).await?;

    let user_id = user.id;
    ctx.current_user = Some(user);
    Ok(user_id)
}

/// Register a new account from an invitation code.
///
/// Registration never signs the session in; success redirects to sign-in.
pub async fn sign_up(state: &AuthState, ctx: &RequestContext, fields: &Fields) -> Outcome {
    match try_sign_up(state, ctx, fields).await {
        Ok(user_id) => {
            info!(%user_id, "User registered");
            Outcome::Redirect(Route::SignIn)
        }
        Err(err) => fail("sign up", Route::SignUp, &err),
    }
}

async fn try_sign_up(
    state: &AuthState,
    ctx: &RequestContext,
    fields: &Fields,
) -> Result<Uuid, AuthError> {
    state
        .csrf()
        .verify(&ctx.session, fields.get(FIELD_CSRF_TOKEN))
        .await?;
    form::validate_sign_up(fields, state.config().form_policy())?;

    let username = trimmed(fields, FIELD_USERNAME)?;
    let code = trimmed(fields, FIELD_CODE)?;
    let password = secret(fields, FIELD_PASSWORD)?;

    let invitation = invitation::lookup(state.store(), code).await?;
    invitation::check_validity(&invitation, Utc::now())?;

    let password_hash = state.codec().hash_blocking(&password).await?;
    let user_id = state.store().insert_user(username, &password_hash).await?;
    Ok(user_id)
}

/// End the session and start a fresh anonymous one.
///
/// A forged submission goes back to `/` untouched. Session store failures are
/// logged and the redirect to sign-in happens regardless, but the old token
/// never stays signed in: when the combined step fails the session is
/// destroyed and renewed separately, and if no new token comes out of that
/// the client is told to drop its cookie.
pub async fn sign_out(state: &AuthState, ctx: &mut RequestContext, fields: &Fields) -> Outcome {
    if let Err(err) = state
        .csrf()
        .verify(&ctx.session, fields.get(FIELD_CSRF_TOKEN))
        .await
    {
        return fail("sign out", Route::Root, &err);
    }

    ctx.current_user = None;
    match state.sessions().destroy_and_renew(&mut ctx.session).await {
        Ok(()) => debug!("Session destroyed"),
        Err(err) => {
            log_failure("sign out", &AuthError::from(err));
            end_session_in_steps(state, ctx).await;
        }
    }
    Outcome::Redirect(Route::SignIn)
}

async fn end_session_in_steps(state: &AuthState, ctx: &mut RequestContext) {
    let sessions = state.sessions();
    let old_token = ctx.session.token().to_string();

    if let Err(err) = sessions.destroy(&mut ctx.session).await {
        log_failure("destroy session", &AuthError::from(err));
        // the record survived, so at least take the privilege away
        if let Err(err) = session::set_signed_in(sessions, &ctx.session, false, None).await {
            log_failure("clear sign-in flag", &AuthError::from(err));
        }
    }

    if let Err(err) = sessions.renew_token(&mut ctx.session).await {
        log_failure("renew session token", &AuthError::from(err));
    }

    if ctx.session.token() == old_token {
        ctx.expire_cookie = true;
    }
}

async fn signed_in(state: &AuthState, ctx: &RequestContext) -> bool {
    session::is_signed_in(state.sessions(), &ctx.session).await
}

/// Build view data with the session's CSRF token.
///
/// A token failure is logged and the view goes out without one; the renderer
/// decides whether it can still produce the page.
async fn render(state: &AuthState, ctx: &RequestContext, view: View) -> Outcome {
    let mut data = ViewData::new();
    match state.csrf().token(&ctx.session).await {
        Ok(token) => {
            data.insert(FIELD_CSRF_TOKEN, token);
        }
        Err(err) => error!("Failed to issue CSRF token for {}: {err}", view.name()),
    }
    Outcome::Render { view, data }
}

fn fail(action: &'static str, back_to: Route, err: &AuthError) -> Outcome {
    log_failure(action, err);
    Outcome::Redirect(back_to)
}

fn log_failure(action: &'static str, err: &AuthError) {
    if err.is_user_error() {
        warn!(action, "Rejected {action}: {err}");
    } else {
        error!(action, "Failed to {action}: {err}");
    }
}

fn trimmed<'f>(fields: &'f Fields, field: &'static str) -> Result<&'f str, ValidationError> {
    fields
        .trimmed(field)
        .ok_or(ValidationError::MissingField { field })
}

fn secret(fields: &Fields, field: &'static str) -> Result<SecretString, ValidationError> {
    fields
        .get(field)
        .map(|value| SecretString::from(value.to_string()))
        .ok_or(ValidationError::MissingField { field })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_map_to_paths() {
        assert_eq!(Route::Root.path(), "/");
        assert_eq!(Route::SignIn.path(), "/sign_in");
        assert_eq!(Route::SignUp.path(), "/sign_up");
        assert_eq!(Route::SignOut.path(), "/sign_out");
        assert_eq!(Route::Dashboard.path(), "/dashboard");
    }

    #[test]
    fn trimmed_rejects_blank_values() {
        let fields: Fields = [(FIELD_USERNAME, "  alice "), (FIELD_CODE, "   ")]
            .into_iter()
            .collect();
        assert_eq!(trimmed(&fields, FIELD_USERNAME), Ok("alice"));
        assert_eq!(
            trimmed(&fields, FIELD_CODE),
            Err(ValidationError::MissingField { field: FIELD_CODE })
        );
    }
}
