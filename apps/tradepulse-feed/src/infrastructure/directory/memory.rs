//! In-memory user directory.
//!
//! Stands in for the account store. Users must be registered before they
//! can hold subscriptions.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{DirectoryError, UserDirectoryPort};
use crate::domain::subscription::{SubscriptionSet, UserId};

/// User directory held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, SubscriptionSet>>,
}

impl InMemoryUserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory with the given users registered.
    ///
    /// Blank identifiers are ignored.
    #[must_use]
    pub fn with_users<'a>(users: impl IntoIterator<Item = &'a str>) -> Self {
        let directory = Self::new();
        for raw in users {
            if let Ok(user) = UserId::parse(raw) {
                directory.register(user);
            }
        }
        directory
    }

    /// Register a user with an empty subscription set.
    ///
    /// Returns `false` if the user already exists; their set is untouched.
    pub fn register(&self, user: UserId) -> bool {
        let mut users = self.users.write();
        if users.contains_key(&user) {
            return false;
        }
        tracing::debug!(user = %user, "Registered user");
        users.insert(user, SubscriptionSet::new());
        true
    }

    /// Number of registered users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }

    fn mutate(
        &self,
        user: &UserId,
        apply: impl FnOnce(&mut SubscriptionSet),
    ) -> Result<SubscriptionSet, DirectoryError> {
        let mut users = self.users.write();
        let set = users
            .get_mut(user)
            .ok_or_else(|| DirectoryError::UserNotFound(user.clone()))?;
        apply(set);
        Ok(set.clone())
    }
}

#[async_trait]
impl UserDirectoryPort for InMemoryUserDirectory {
    async fn subscriptions(&self, user: &UserId) -> Result<SubscriptionSet, DirectoryError> {
        self.users
            .read()
            .get(user)
            .cloned()
            .ok_or_else(|| DirectoryError::UserNotFound(user.clone()))
    }

    async fn subscribe(
        &self,
        user: &UserId,
        symbol: &str,
    ) -> Result<SubscriptionSet, DirectoryError> {
        self.mutate(user, |set| {
            set.insert(symbol);
        })
    }

    async fn unsubscribe(
        &self,
        user: &UserId,
        symbol: &str,
    ) -> Result<SubscriptionSet, DirectoryError> {
        self.mutate(user, |set| {
            set.remove(symbol);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(raw: &str) -> UserId {
        UserId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let directory = InMemoryUserDirectory::new();
        let err = directory.subscriptions(&user("a@x.com")).await.unwrap_err();
        assert_eq!(err, DirectoryError::UserNotFound(user("a@x.com")));
    }

    #[tokio::test]
    async fn subscribe_then_unsubscribe() {
        let directory = InMemoryUserDirectory::with_users(["a@x.com"]);
        let a = user("a@x.com");

        let set = directory.subscribe(&a, "TSLA").await.unwrap();
        assert_eq!(set.to_vec(), vec!["TSLA"]);

        let set = directory.subscribe(&a, "GOOG").await.unwrap();
        assert_eq!(set.to_vec(), vec!["GOOG", "TSLA"]);

        let set = directory.unsubscribe(&a, "TSLA").await.unwrap();
        assert_eq!(set.to_vec(), vec!["GOOG"]);
    }

    #[test]
    fn register_twice_keeps_existing_set() {
        let directory = InMemoryUserDirectory::new();
        assert!(directory.register(user("a@x.com")));
        assert!(!directory.register(user("A@X.com ")));
        assert_eq!(directory.user_count(), 1);
    }

    #[test]
    fn with_users_skips_blank() {
        let directory = InMemoryUserDirectory::with_users(["a@x.com", "  ", "b@y.com"]);
        assert_eq!(directory.user_count(), 2);
    }
}
