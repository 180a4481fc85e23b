//! HTTP user directory.
//!
//! Talks to a feed server's subscription API so the watch client can manage
//! a watchlist through the same facade the server uses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::application::ports::{DirectoryError, UserDirectoryPort};
use crate::domain::subscription::{SubscriptionSet, UserId};
use crate::infrastructure::server::INVALID_TICKER_MESSAGE;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SubscriptionRequest<'a> {
    email: &'a str,
    ticker: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    #[serde(default)]
    subscriptions: SubscriptionSet,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// User directory reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpUserDirectory {
    client: Client,
    base_url: String,
}

impl HttpUserDirectory {
    /// Create a client for the API rooted at `base_url` (e.g. `http://host:5000/api`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DirectoryError::Unavailable {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post(
        &self,
        path: &str,
        user: &UserId,
        symbol: &str,
    ) -> Result<SubscriptionSet, DirectoryError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SubscriptionRequest {
                email: user.as_str(),
                ticker: symbol,
            })
            .send()
            .await
            .map_err(unavailable)?;

        read_response(response, user).await
    }
}

#[async_trait]
impl UserDirectoryPort for HttpUserDirectory {
    async fn subscriptions(&self, user: &UserId) -> Result<SubscriptionSet, DirectoryError> {
        let url = format!("{}/subscriptions", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("email", user.as_str())])
            .send()
            .await
            .map_err(unavailable)?;

        read_response(response, user).await
    }

    async fn subscribe(
        &self,
        user: &UserId,
        symbol: &str,
    ) -> Result<SubscriptionSet, DirectoryError> {
        self.post("/subscribe", user, symbol).await
    }

    async fn unsubscribe(
        &self,
        user: &UserId,
        symbol: &str,
    ) -> Result<SubscriptionSet, DirectoryError> {
        self.post("/unsubscribe", user, symbol).await
    }
}

async fn read_response(
    response: reqwest::Response,
    user: &UserId,
) -> Result<SubscriptionSet, DirectoryError> {
    let status = response.status();

    if status.is_success() {
        let body: SubscriptionResponse = response.json().await.map_err(unavailable)?;
        return Ok(body.subscriptions);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body).map_or(body, |e| e.error);

    tracing::debug!(status = status.as_u16(), message = %message, "Directory request rejected");

    Err(rejection_error(status, message, user))
}

fn rejection_error(status: StatusCode, message: String, user: &UserId) -> DirectoryError {
    match status {
        StatusCode::NOT_FOUND => DirectoryError::UserNotFound(user.clone()),
        StatusCode::BAD_REQUEST if message == INVALID_TICKER_MESSAGE => {
            DirectoryError::InvalidSymbol(message)
        }
        _ => DirectoryError::Unavailable {
            message: format!("{}: {message}", status.as_u16()),
        },
    }
}

fn unavailable(err: reqwest::Error) -> DirectoryError {
    DirectoryError::Unavailable {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let directory = HttpUserDirectory::new("http://127.0.0.1:5000/api/").unwrap();
        assert_eq!(directory.base_url, "http://127.0.0.1:5000/api");
    }

    #[test]
    fn success_body_parses() {
        let body: SubscriptionResponse =
            serde_json::from_str(r#"{"success":true,"subscriptions":["TSLA","GOOG"]}"#).unwrap();
        assert_eq!(body.subscriptions.to_vec(), vec!["GOOG", "TSLA"]);
    }

    #[test]
    fn only_ticker_rejections_map_to_invalid_symbol() {
        let user = UserId::parse("a@x.com").unwrap();

        assert!(matches!(
            rejection_error(StatusCode::BAD_REQUEST, INVALID_TICKER_MESSAGE.to_string(), &user),
            DirectoryError::InvalidSymbol(_)
        ));
        assert!(matches!(
            rejection_error(StatusCode::BAD_REQUEST, "Invalid request body".to_string(), &user),
            DirectoryError::Unavailable { .. }
        ));
        assert_eq!(
            rejection_error(StatusCode::NOT_FOUND, "User not found".to_string(), &user),
            DirectoryError::UserNotFound(user)
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        let directory = HttpUserDirectory::new("http://127.0.0.1:1/api").unwrap();
        let user = UserId::parse("a@x.com").unwrap();
        let err = directory.subscriptions(&user).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Unavailable { .. }));
    }
}
