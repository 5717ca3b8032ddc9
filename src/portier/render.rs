//! View rendering collaborator.
//!
//! The auth flow only decides *which* view to show and with what data; turning
//! that into markup is behind the [`Render`] trait. [`FormRender`] is a minimal
//! built-in implementation producing bare HTML forms.

use std::collections::BTreeMap;
use thiserror::Error;

use super::auth::{
    form::{FIELD_CODE, FIELD_CSRF_TOKEN, FIELD_PASSWORD, FIELD_USERNAME},
    Route,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    SignIn,
    SignUp,
    Dashboard,
}

impl View {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SignIn => "sign_in",
            Self::SignUp => "sign_up",
            Self::Dashboard => "dashboard",
        }
    }
}

pub type ViewData = BTreeMap<&'static str, String>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("view {view} requires {key}")]
    MissingData {
        view: &'static str,
        key: &'static str,
    },
}

pub trait Render: Send + Sync {
    /// Render `view` with `data` into an HTML document.
    ///
    /// # Errors
    /// Returns an error if the view cannot be produced from `data`.
    fn write(&self, view: View, data: &ViewData) -> Result<String, RenderError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FormRender;

impl Render for FormRender {
    fn write(&self, view: View, data: &ViewData) -> Result<String, RenderError> {
        let csrf = data
            .get(FIELD_CSRF_TOKEN)
            .map(|token| escape(token))
            .ok_or(RenderError::MissingData {
                view: view.name(),
                key: FIELD_CSRF_TOKEN,
            })?;
        let hidden = format!(r#"<input type="hidden" name="{FIELD_CSRF_TOKEN}" value="{csrf}">"#);

        let body = match view {
            View::SignIn => format!(
                r#"<h1>Sign in</h1>
<form method="post" action="{action}">{hidden}
<label>Username <input name="{FIELD_USERNAME}" autocomplete="username" required></label>
<label>Password <input type="password" name="{FIELD_PASSWORD}" autocomplete="current-password" required></label>
<button type="submit">Sign in</button>
</form>
<p><a href="{sign_up}">Have an invitation code? Sign up</a></p>"#,
                action = Route::SignIn.path(),
                sign_up = Route::SignUp.path(),
            ),
            View::SignUp => format!(
                r#"<h1>Sign up</h1>
<form method="post" action="{action}">{hidden}
<label>Username <input name="{FIELD_USERNAME}" autocomplete="username" required></label>
<label>Password <input type="password" name="{FIELD_PASSWORD}" autocomplete="new-password" required></label>
<label>Invitation code <input name="{FIELD_CODE}" required></label>
<button type="submit">Sign up</button>
</form>
<p><a href="{sign_in}">Already registered? Sign in</a></p>"#,
                action = Route::SignUp.path(),
                sign_in = Route::SignIn.path(),
            ),
            View::Dashboard => format!(
                r#"<h1>Dashboard</h1>
<form method="post" action="{action}">{hidden}
<button type="submit">Sign out</button>
</form>"#,
                action = Route::SignOut.path(),
            ),
        };

        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{body}\n</body>\n</html>\n",
            view.name()
        ))
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
