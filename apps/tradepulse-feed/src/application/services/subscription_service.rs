//! Subscription Service
//!
//! Thin facade over the user directory. Validates and normalises requests,
//! enforces that only universe symbols can be added, and maps directory
//! failures onto [`SubscriptionError`].

use std::sync::Arc;

use crate::application::ports::{DirectoryError, UserDirectoryPort};
use crate::domain::instrument::{SharedUniverse, Universe};
use crate::domain::subscription::{SubscriptionError, SubscriptionSet, UserId};
use crate::infrastructure::metrics::{self, SubscriptionOperation};

/// Subscribe/unsubscribe facade.
pub struct SubscriptionService {
    universe: SharedUniverse,
    directory: Arc<dyn UserDirectoryPort>,
}

impl std::fmt::Debug for SubscriptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionService")
            .field("universe", &self.universe.len())
            .finish_non_exhaustive()
    }
}

impl SubscriptionService {
    /// Create a facade over `directory` restricted to `universe`.
    #[must_use]
    pub fn new(universe: SharedUniverse, directory: Arc<dyn UserDirectoryPort>) -> Self {
        Self {
            universe,
            directory,
        }
    }

    /// The instrument universe.
    #[must_use]
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Add `ticker` to the user's set and return the stored set.
    ///
    /// Subscribing to an already-subscribed symbol returns the same set.
    ///
    /// # Errors
    ///
    /// - `MissingField` for a blank e-mail or ticker
    /// - `InvalidSymbol` if the ticker is not in the universe
    /// - `NotFound` if the user is unknown
    /// - `Directory` if the directory failed
    pub async fn subscribe(
        &self,
        email: &str,
        ticker: &str,
    ) -> Result<SubscriptionSet, SubscriptionError> {
        let result = self.try_subscribe(email, ticker).await;
        record(SubscriptionOperation::Subscribe, email, ticker, &result);
        result
    }

    /// Remove `ticker` from the user's set and return the stored set.
    ///
    /// Removing a symbol the user does not hold is a no-op.
    ///
    /// # Errors
    ///
    /// - `MissingField` for a blank e-mail or ticker
    /// - `NotFound` if the user is unknown
    /// - `Directory` if the directory failed
    pub async fn unsubscribe(
        &self,
        email: &str,
        ticker: &str,
    ) -> Result<SubscriptionSet, SubscriptionError> {
        let result = self.try_unsubscribe(email, ticker).await;
        record(SubscriptionOperation::Unsubscribe, email, ticker, &result);
        result
    }

    /// The user's stored set.
    ///
    /// # Errors
    ///
    /// - `MissingField` for a blank e-mail
    /// - `NotFound` if the user is unknown
    /// - `Directory` if the directory failed
    pub async fn subscriptions(&self, email: &str) -> Result<SubscriptionSet, SubscriptionError> {
        let result = match UserId::parse(email) {
            Ok(user) => self
                .directory
                .subscriptions(&user)
                .await
                .map_err(|e| map_directory_error(e, "")),
            Err(e) => Err(e),
        };
        record(SubscriptionOperation::List, email, "", &result);
        result
    }

    async fn try_subscribe(
        &self,
        email: &str,
        ticker: &str,
    ) -> Result<SubscriptionSet, SubscriptionError> {
        let (user, symbol) = parse_request(email, ticker)?;

        if !self.universe.contains(symbol) {
            return Err(SubscriptionError::InvalidSymbol(symbol.to_string()));
        }

        self.directory
            .subscribe(&user, symbol)
            .await
            .map_err(|e| map_directory_error(e, symbol))
    }

    async fn try_unsubscribe(
        &self,
        email: &str,
        ticker: &str,
    ) -> Result<SubscriptionSet, SubscriptionError> {
        let (user, symbol) = parse_request(email, ticker)?;

        self.directory
            .unsubscribe(&user, symbol)
            .await
            .map_err(|e| map_directory_error(e, symbol))
    }
}

fn parse_request<'a>(
    email: &str,
    ticker: &'a str,
) -> Result<(UserId, &'a str), SubscriptionError> {
    let user = UserId::parse(email)?;
    let symbol = ticker.trim();
    if symbol.is_empty() {
        return Err(SubscriptionError::MissingField("ticker"));
    }
    Ok((user, symbol))
}

fn map_directory_error(err: DirectoryError, symbol: &str) -> SubscriptionError {
    match err {
        DirectoryError::UserNotFound(user) => SubscriptionError::NotFound(user),
        DirectoryError::InvalidSymbol(_) => SubscriptionError::InvalidSymbol(symbol.to_string()),
        DirectoryError::Unavailable { message } => SubscriptionError::Directory(message),
    }
}

fn record(
    operation: SubscriptionOperation,
    email: &str,
    ticker: &str,
    result: &Result<SubscriptionSet, SubscriptionError>,
) {
    match result {
        Ok(set) => {
            metrics::record_subscription_request(operation, "ok");
            tracing::info!(
                ?operation,
                user = %email.trim(),
                ticker = %ticker.trim(),
                subscriptions = set.len(),
                "Subscription request completed"
            );
        }
        Err(SubscriptionError::Directory(message)) => {
            metrics::record_subscription_request(operation, "directory");
            tracing::error!(?operation, user = %email.trim(), error = %message, "User directory failure");
        }
        Err(err) => {
            metrics::record_subscription_request(operation, err.kind());
            tracing::warn!(?operation, user = %email.trim(), ticker = %ticker.trim(), error = %err, "Subscription request rejected");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::application::ports::MockUserDirectoryPort;
    use crate::domain::instrument::Universe;
    use crate::infrastructure::directory::InMemoryUserDirectory;

    use super::*;

    fn service_with(directory: impl UserDirectoryPort + 'static) -> SubscriptionService {
        SubscriptionService::new(Arc::new(Universe::standard()), Arc::new(directory))
    }

    fn seeded() -> SubscriptionService {
        service_with(InMemoryUserDirectory::with_users(["a@x.com"]))
    }

    #[tokio::test]
    async fn subscribe_is_idempotent() {
        let service = seeded();

        let first = service.subscribe("a@x.com", "GOOG").await.unwrap();
        let second = service.subscribe("a@x.com", "GOOG").await.unwrap();

        assert_eq!(first.to_vec(), vec!["GOOG"]);
        assert_eq!(second.to_vec(), vec!["GOOG"]);
    }

    #[tokio::test]
    async fn subscribe_unknown_symbol_rejected_and_set_unchanged() {
        let service = seeded();
        service.subscribe("a@x.com", "TSLA").await.unwrap();

        let err = service.subscribe("a@x.com", "BOGUS").await.unwrap_err();

        assert_eq!(err, SubscriptionError::InvalidSymbol("BOGUS".to_string()));
        let set = service.subscriptions("a@x.com").await.unwrap();
        assert_eq!(set.to_vec(), vec!["TSLA"]);
    }

    #[tokio::test]
    async fn unsubscribe_absent_symbol_is_noop() {
        let service = seeded();
        service.subscribe("a@x.com", "NVDA").await.unwrap();

        let set = service.unsubscribe("a@x.com", "META").await.unwrap();

        assert_eq!(set.to_vec(), vec!["NVDA"]);
    }

    #[tokio::test]
    async fn email_is_normalised() {
        let service = seeded();
        let set = service.subscribe("  A@X.COM ", "AMZN").await.unwrap();
        assert_eq!(set.to_vec(), vec!["AMZN"]);
        assert!(service.subscriptions("a@x.com").await.unwrap().contains("AMZN"));
    }

    #[tokio::test]
    async fn unknown_user_not_found() {
        let service = seeded();
        let err = service.subscribe("nobody@x.com", "GOOG").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn blank_fields_rejected_before_directory() {
        let mut directory = MockUserDirectoryPort::new();
        directory.expect_subscribe().never();
        directory.expect_unsubscribe().never();
        let service = service_with(directory);

        assert_eq!(
            service.subscribe("", "GOOG").await.unwrap_err(),
            SubscriptionError::MissingField("email")
        );
        assert_eq!(
            service.unsubscribe("a@x.com", "   ").await.unwrap_err(),
            SubscriptionError::MissingField("ticker")
        );
    }

    #[tokio::test]
    async fn invalid_symbol_never_reaches_directory() {
        let mut directory = MockUserDirectoryPort::new();
        directory.expect_subscribe().never();
        let service = service_with(directory);

        let err = service.subscribe("a@x.com", "goog").await.unwrap_err();
        assert!(matches!(err, SubscriptionError::InvalidSymbol(_)));
    }

    #[tokio::test]
    async fn directory_failure_surfaces_as_directory_error() {
        let mut directory = MockUserDirectoryPort::new();
        directory
            .expect_subscribe()
            .withf(|user, symbol| user.as_str() == "a@x.com" && symbol == "GOOG")
            .times(1)
            .returning(|_, _| {
                Err(DirectoryError::Unavailable {
                    message: "disk full".to_string(),
                })
            });
        let service = service_with(directory);

        let err = service.subscribe("a@x.com", "GOOG").await.unwrap_err();

        assert_eq!(err, SubscriptionError::Directory("disk full".to_string()));
    }

    #[tokio::test]
    async fn directory_symbol_rejection_maps_to_invalid_symbol() {
        let mut directory = MockUserDirectoryPort::new();
        directory
            .expect_unsubscribe()
            .returning(|_, _| Err(DirectoryError::InvalidSymbol("Invalid ticker symbol".to_string())));
        let service = service_with(directory);

        let err = service.unsubscribe("a@x.com", "XYZ").await.unwrap_err();

        assert_eq!(err, SubscriptionError::InvalidSymbol("XYZ".to_string()));
    }
}
