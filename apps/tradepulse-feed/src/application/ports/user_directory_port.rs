//! User Directory Port (Driven Port)
//!
//! Interface to the external collaborator that owns user records and their
//! stored subscription sets. Each mutation is applied and persisted by the
//! directory before it returns.

use async_trait::async_trait;

use crate::domain::subscription::{SubscriptionSet, UserId};

/// User directory error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// No user with this identifier.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The directory rejected the symbol.
    #[error("directory rejected symbol: {0}")]
    InvalidSymbol(String),

    /// Transport or storage failure; nothing was changed.
    #[error("directory unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },
}

/// Port for reading and mutating a user's subscriptions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectoryPort: Send + Sync {
    /// Stored subscriptions for a user.
    async fn subscriptions(&self, user: &UserId) -> Result<SubscriptionSet, DirectoryError>;

    /// Add a symbol and return the stored set.
    async fn subscribe(&self, user: &UserId, symbol: &str)
    -> Result<SubscriptionSet, DirectoryError>;

    /// Remove a symbol and return the stored set.
    async fn unsubscribe(
        &self,
        user: &UserId,
        symbol: &str,
    ) -> Result<SubscriptionSet, DirectoryError>;
}
