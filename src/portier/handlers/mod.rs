pub mod dashboard;
pub use self::dashboard::dashboard;

pub mod health;
pub use self::health::health;

pub mod registrations;
pub use self::registrations::{sign_up, sign_up_form};

pub mod root;
pub use self::root::root;

pub mod sessions;
pub use self::sessions::{sign_in, sign_in_form, sign_out};

// common functions for the handlers
use crate::portier::auth::{form::Fields, AuthConfig, AuthState, Outcome, RequestContext};
use axum::{
    http::{
        header::{InvalidHeaderValue, CACHE_CONTROL, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use std::collections::HashMap;
use tracing::error;

pub const SESSION_COOKIE_NAME: &str = "portier_session";

/// Submitted form body; a missing or unparseable body reads as no fields.
pub(crate) type FormBody = Option<Form<HashMap<String, String>>>;

pub(crate) fn fields(body: FormBody) -> Fields {
    body.map(|Form(map)| Fields::from(map)).unwrap_or_default()
}

/// Bind the request to its session, starting a new one when the cookie is
/// missing or no longer valid.
pub(crate) async fn request_context(
    state: &AuthState,
    headers: &HeaderMap,
) -> Result<RequestContext, Response> {
    let token = extract_session_token(headers);
    match state.sessions().load(token.as_deref()).await {
        Ok(session) => Ok(RequestContext::new(session)),
        Err(err) => {
            error!("Failed to load session: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}

/// Turn a flow outcome into a response.
///
/// The session cookie goes out on every response: loading the session
/// restarts its idle TTL, so `Max-Age` is restarted with it. A context marked
/// `expire_cookie` gets an expired cookie instead.
pub(crate) fn respond(state: &AuthState, ctx: &RequestContext, outcome: Outcome) -> Response {
    let mut response = match outcome {
        Outcome::Redirect(route) => Redirect::to(route.path()).into_response(),
        Outcome::Render { view, data } => {
            let html = state.render().write(view, &data).unwrap_or_else(|err| {
                error!("Failed to render {}: {err}", view.name());
                String::new()
            });
            ([(CACHE_CONTROL, "no-store")], Html(html)).into_response()
        }
    };

    let cookie = if ctx.expire_cookie() {
        expired_session_cookie(state.config())
    } else {
        session_cookie(state.config(), ctx.session().token())
    };
    match cookie {
        Ok(cookie) => {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build session cookie: {err}"),
    }

    response
}

/// Build an `HttpOnly` cookie for the session token.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Build a cookie that makes the client forget its session token.
pub(crate) fn expired_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == SESSION_COOKIE_NAME && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portier::auth::Route;
    use anyhow::Result;
    use axum::http::header::LOCATION;

    fn headers(cookie: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie)?);
        Ok(headers)
    }

    #[test]
    fn extract_session_token_finds_our_cookie() -> Result<()> {
        let headers = headers("theme=dark; portier_session=abc123; other=1")?;
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));
        Ok(())
    }

    #[test]
    fn extract_session_token_ignores_other_and_empty_cookies() -> Result<()> {
        assert_eq!(extract_session_token(&headers("theme=dark")?), None);
        assert_eq!(extract_session_token(&headers("portier_session=")?), None);
        assert_eq!(extract_session_token(&headers("malformed; x")?), None);
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
        Ok(())
    }

    #[test]
    fn session_cookie_attributes() -> Result<()> {
        let config = AuthConfig::new().with_session_ttl_seconds(60);
        let cookie = session_cookie(&config, "tok")?;
        assert_eq!(
            cookie.to_str()?,
            "portier_session=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );

        let cookie = session_cookie(&config.with_session_cookie_secure(true), "tok")?;
        assert!(cookie.to_str()?.ends_with("; Secure"));
        Ok(())
    }

    #[test]
    fn expired_session_cookie_clears_the_token() -> Result<()> {
        let cookie = expired_session_cookie(&AuthConfig::new())?;
        assert_eq!(
            cookie.to_str()?,
            "portier_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        );
        Ok(())
    }

    #[test]
    fn redirects_are_see_other() -> Result<()> {
        let response = Redirect::to(Route::Dashboard.path()).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION), Some(&HeaderValue::from_static("/dashboard")));
        Ok(())
    }

    #[test]
    fn missing_body_reads_as_no_fields() {
        let fields = fields(None);
        assert_eq!(fields.get("username"), None);
    }
}
