//! Invitation code lookup and validity window.

use chrono::{DateTime, Utc};

use super::error::AuthError;
use crate::portier::store::{InvitationCode, Store};

/// Find the invitation for `code`.
///
/// # Errors
/// Returns [`AuthError::NotFound`] for unknown codes and [`AuthError::Store`]
/// when the lookup itself fails.
pub async fn lookup(store: &dyn Store, code: &str) -> Result<InvitationCode, AuthError> {
    store
        .select_invitation_code(code)
        .await
        .map_err(|err| AuthError::from_store(err, "invitation code"))
}

/// An invitation is usable up to and including its `valid_until` instant.
///
/// # Errors
/// Returns [`AuthError::Expired`] once `now` is past the deadline.
pub fn check_validity(invitation: &InvitationCode, now: DateTime<Utc>) -> Result<(), AuthError> {
    if now > invitation.valid_until {
        return Err(AuthError::Expired {
            valid_until: invitation.valid_until,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portier::store::MemoryStore;
    use anyhow::Result;
    use chrono::{Duration, TimeZone};

    fn invitation(valid_until: DateTime<Utc>) -> InvitationCode {
        InvitationCode {
            code: "XYZ".to_string(),
            valid_until,
        }
    }

    #[test]
    fn deadline_instant_is_still_valid() -> Result<()> {
        let deadline = Utc
            .with_ymd_and_hms(2026, 1, 31, 23, 59, 59)
            .single()
            .ok_or_else(|| anyhow::anyhow!("ambiguous timestamp"))?;
        assert!(check_validity(&invitation(deadline), deadline).is_ok());
        Ok(())
    }

    #[test]
    fn one_tick_past_deadline_is_expired() {
        let deadline = Utc::now();
        let result = check_validity(&invitation(deadline), deadline + Duration::nanoseconds(1));
        assert!(matches!(
            result,
            Err(AuthError::Expired { valid_until }) if valid_until == deadline
        ));
    }

    #[test]
    fn before_deadline_is_valid() {
        let now = Utc::now();
        assert!(check_validity(&invitation(now + Duration::days(7)), now).is_ok());
    }

    #[tokio::test]
    async fn lookup_unknown_code_is_not_found() {
        let store = MemoryStore::new();
        let result = lookup(&store, "missing").await;
        assert!(matches!(result, Err(AuthError::NotFound("invitation code"))));
    }

    #[tokio::test]
    async fn lookup_returns_stored_invitation() -> Result<()> {
        let store = MemoryStore::new();
        let deadline = Utc::now() + Duration::hours(1);
        store.add_invitation("XYZ", deadline).await;

        let found = lookup(&store, "XYZ").await?;
        assert_eq!(found, invitation(deadline));
        Ok(())
    }
}
