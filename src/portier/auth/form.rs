//! Structural validation of submitted sign-in and sign-up forms.

use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

pub const FIELD_USERNAME: &str = "username";
pub const FIELD_PASSWORD: &str = "password";
pub const FIELD_CODE: &str = "code";
pub const FIELD_CSRF_TOKEN: &str = "csrf_token";

pub const SIGN_IN_FIELDS: [&str; 2] = [FIELD_USERNAME, FIELD_PASSWORD];
pub const SIGN_UP_FIELDS: [&str; 3] = [FIELD_USERNAME, FIELD_PASSWORD, FIELD_CODE];

const DEFAULT_MIN_USERNAME_LEN: usize = 3;
const DEFAULT_MAX_USERNAME_LEN: usize = 32;
const DEFAULT_MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{field} contains invalid characters")]
    InvalidCharacters { field: &'static str },
}

/// Submitted form fields, keyed by input name.
#[derive(Clone, Default)]
pub struct Fields(HashMap<String, String>);

impl Fields {
    /// Raw submitted value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Submitted value with surrounding whitespace removed; blank counts as absent.
    #[must_use]
    pub fn trimmed(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|value| !value.is_empty())
    }
}

impl From<HashMap<String, String>> for Fields {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

// Passwords and tokens must never reach the logs.
impl std::fmt::Debug for Fields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.0.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Fields").field("names", &names).finish()
    }
}

/// Length limits applied to sign-up submissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormPolicy {
    min_username_len: usize,
    max_username_len: usize,
    min_password_len: usize,
}

impl Default for FormPolicy {
    fn default() -> Self {
        Self {
            min_username_len: DEFAULT_MIN_USERNAME_LEN,
            max_username_len: DEFAULT_MAX_USERNAME_LEN,
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }
}

impl FormPolicy {
    #[must_use]
    pub fn with_min_username_len(mut self, len: usize) -> Self {
        self.min_username_len = len;
        self
    }

    #[must_use]
    pub fn with_max_username_len(mut self, len: usize) -> Self {
        self.max_username_len = len;
        self
    }

    #[must_use]
    pub fn with_min_password_len(mut self, len: usize) -> Self {
        self.min_password_len = len;
        self
    }

    #[must_use]
    pub fn min_username_len(&self) -> usize {
        self.min_username_len
    }

    #[must_use]
    pub fn max_username_len(&self) -> usize {
        self.max_username_len
    }

    #[must_use]
    pub fn min_password_len(&self) -> usize {
        self.min_password_len
    }
}

/// Fail on the first required field that is missing or blank, in `required` order.
///
/// # Errors
/// Returns [`ValidationError::MissingField`] naming the field.
pub fn validate_required(fields: &Fields, required: &[&'static str]) -> Result<(), ValidationError> {
    match required
        .iter()
        .find(|field| fields.trimmed(field).is_none())
    {
        Some(field) => Err(ValidationError::MissingField { field: *field }),
        None => Ok(()),
    }
}

/// Validate a registration form against `policy`.
///
/// # Errors
/// Returns the first [`ValidationError`] found.
pub fn validate_sign_up(fields: &Fields, policy: &FormPolicy) -> Result<(), ValidationError> {
    validate_required(fields, &SIGN_UP_FIELDS)?;

    let username = fields.trimmed(FIELD_USERNAME).unwrap_or_default();
    let username_len = username.chars().count();
    if username_len < policy.min_username_len {
        return Err(ValidationError::TooShort {
            field: FIELD_USERNAME,
            min: policy.min_username_len,
        });
    }
    if username_len > policy.max_username_len {
        return Err(ValidationError::TooLong {
            field: FIELD_USERNAME,
            max: policy.max_username_len,
        });
    }
    if !valid_username(username) {
        return Err(ValidationError::InvalidCharacters {
            field: FIELD_USERNAME,
        });
    }

    let password = fields.get(FIELD_PASSWORD).unwrap_or_default();
    if password.chars().count() < policy.min_password_len {
        return Err(ValidationError::TooShort {
            field: FIELD_PASSWORD,
            min: policy.min_password_len,
        });
    }

    Ok(())
}

fn valid_username(username: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9_.-]+$").is_ok_and(|re| re.is_match(username))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up(username: &str, password: &str, code: &str) -> Fields {
        [
            (FIELD_USERNAME, username),
            (FIELD_PASSWORD, password),
            (FIELD_CODE, code),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn validate_required_names_first_missing_field() {
        let fields: Fields = [(FIELD_PASSWORD, "pw")].into_iter().collect();
        assert_eq!(
            validate_required(&fields, &SIGN_IN_FIELDS),
            Err(ValidationError::MissingField {
                field: FIELD_USERNAME
            })
        );
    }

    #[test]
    fn validate_required_treats_blank_as_missing() {
        let fields: Fields = [(FIELD_USERNAME, "alice"), (FIELD_PASSWORD, "   ")]
            .into_iter()
            .collect();
        assert_eq!(
            validate_required(&fields, &SIGN_IN_FIELDS),
            Err(ValidationError::MissingField {
                field: FIELD_PASSWORD
            })
        );
    }

    #[test]
    fn validate_required_accepts_complete_form() {
        let fields: Fields = [(FIELD_USERNAME, "alice"), (FIELD_PASSWORD, "correct")]
            .into_iter()
            .collect();
        assert_eq!(validate_required(&fields, &SIGN_IN_FIELDS), Ok(()));
    }

    #[test]
    fn validate_sign_up_requires_code() {
        let fields: Fields = [(FIELD_USERNAME, "bob"), (FIELD_PASSWORD, "pw123456")]
            .into_iter()
            .collect();
        assert_eq!(
            validate_sign_up(&fields, &FormPolicy::default()),
            Err(ValidationError::MissingField { field: FIELD_CODE })
        );
    }

    #[test]
    fn validate_sign_up_accepts_valid_form() {
        assert_eq!(
            validate_sign_up(&sign_up("bob", "pw123456", "XYZ"), &FormPolicy::default()),
            Ok(())
        );
    }

    #[test]
    fn validate_sign_up_enforces_username_bounds() {
        let policy = FormPolicy::default()
            .with_min_username_len(3)
            .with_max_username_len(5);
        assert_eq!(
            validate_sign_up(&sign_up("bo", "pw123456", "XYZ"), &policy),
            Err(ValidationError::TooShort {
                field: FIELD_USERNAME,
                min: 3
            })
        );
        assert_eq!(
            validate_sign_up(&sign_up("robert", "pw123456", "XYZ"), &policy),
            Err(ValidationError::TooLong {
                field: FIELD_USERNAME,
                max: 5
            })
        );
        assert_eq!(validate_sign_up(&sign_up("bobby", "pw123456", "XYZ"), &policy), Ok(()));
    }

    #[test]
    fn validate_sign_up_counts_characters_not_bytes() {
        let policy = FormPolicy::default().with_min_password_len(4);
        // four characters, eight bytes
        assert_eq!(validate_sign_up(&sign_up("bob", "éééé", "XYZ"), &policy), Ok(()));
    }

    #[test]
    fn validate_sign_up_enforces_password_length() {
        let policy = FormPolicy::default().with_min_password_len(8);
        assert_eq!(
            validate_sign_up(&sign_up("bob", "short", "XYZ"), &policy),
            Err(ValidationError::TooShort {
                field: FIELD_PASSWORD,
                min: 8
            })
        );
    }

    #[test]
    fn validate_sign_up_rejects_username_characters() {
        assert_eq!(
            validate_sign_up(&sign_up("bob smith", "pw123456", "XYZ"), &FormPolicy::default()),
            Err(ValidationError::InvalidCharacters {
                field: FIELD_USERNAME
            })
        );
    }

    #[test]
    fn fields_debug_hides_values() {
        let fields = sign_up("bob", "pw123456", "XYZ");
        let rendered = format!("{fields:?}");
        assert!(!rendered.contains("pw123456"));
        assert!(rendered.contains("password"));
    }
}
