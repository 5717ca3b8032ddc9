//! In-process store used by tests and by embedders without a database.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BoxFuture, InvitationCode, Store, StoreError, User};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    invitations: HashMap<String, InvitationCode>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision an invitation code, replacing any code with the same value.
    pub async fn add_invitation(&self, code: &str, valid_until: DateTime<Utc>) {
        let mut tables = self.tables.lock().await;
        tables.invitations.insert(
            code.to_string(),
            InvitationCode {
                code: code.to_string(),
                valid_until,
            },
        );
    }

    pub async fn user(&self, username: &str) -> Option<User> {
        self.tables.lock().await.users.get(username).cloned()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.lock().await.users.len()
    }
}

impl Store for MemoryStore {
    fn select_user_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, Result<User, StoreError>> {
        Box::pin(async move {
            let tables = self.tables.lock().await;
            tables
                .users
                .get(username)
                .cloned()
                .ok_or(StoreError::NotFound)
        })
    }

    fn update_user_last_login<'a>(&'a self, user: &'a User) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            let stored = tables
                .users
                .values_mut()
                .find(|stored| stored.id == user.id)
                .ok_or(StoreError::NotFound)?;
            stored.last_login_at = Some(Utc::now());
            Ok(())
        })
    }

    fn select_invitation_code<'a>(
        &'a self,
        code: &'a str,
    ) -> BoxFuture<'a, Result<InvitationCode, StoreError>> {
        Box::pin(async move {
            let tables = self.tables.lock().await;
            tables
                .invitations
                .get(code)
                .cloned()
                .ok_or(StoreError::NotFound)
        })
    }

    fn insert_user<'a>(
        &'a self,
        username: &'a str,
        password_hash: &'a str,
    ) -> BoxFuture<'a, Result<Uuid, StoreError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            if tables.users.contains_key(username) {
                return Err(StoreError::Conflict);
            }
            let id = Uuid::new_v4();
            tables.users.insert(
                username.to_string(),
                User {
                    id,
                    username: username.to_string(),
                    password_hash: password_hash.to_string(),
                    last_login_at: None,
                },
            );
            Ok(id)
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::Duration;

    #[tokio::test]
    async fn insert_user_rejects_duplicate_username() -> Result<()> {
        let store = MemoryStore::new();
        store.insert_user("alice", "hash").await?;

        let second = store.insert_user("alice", "other").await;
        assert!(matches!(second, Err(StoreError::Conflict)));
        assert_eq!(store.user_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn update_last_login_stamps_existing_user() -> Result<()> {
        let store = MemoryStore::new();
        store.insert_user("alice", "hash").await?;
        let user = store.select_user_by_username("alice").await?;
        assert!(user.last_login_at.is_none());

        store.update_user_last_login(&user).await?;

        let user = store.select_user_by_username("alice").await?;
        assert!(user.last_login_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_records_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.select_user_by_username("ghost").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.select_invitation_code("nope").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn add_invitation_is_visible_to_lookup() -> Result<()> {
        let store = MemoryStore::new();
        let deadline = Utc::now() + Duration::days(1);
        store.add_invitation("XYZ", deadline).await;

        let invitation = store.select_invitation_code("XYZ").await?;
        assert_eq!(invitation.code, "XYZ");
        assert_eq!(invitation.valid_until, deadline);
        Ok(())
    }
}
