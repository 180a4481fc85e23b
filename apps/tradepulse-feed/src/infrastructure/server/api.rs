//! Subscription API handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use super::FeedServerState;
use crate::domain::instrument::Instrument;
use crate::domain::subscription::{SubscriptionError, SubscriptionSet};

/// Error text for a ticker outside the instrument universe.
pub const INVALID_TICKER_MESSAGE: &str = "Invalid ticker symbol";

/// Body of subscribe and unsubscribe requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    /// User e-mail.
    #[serde(default)]
    pub email: String,
    /// Symbol to add or remove.
    #[serde(default)]
    pub ticker: String,
}

/// Successful subscription response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    /// Always `true`.
    pub success: bool,
    /// The stored set after the operation.
    pub subscriptions: SubscriptionSet,
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable reason.
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct EmailQuery {
    #[serde(default)]
    email: String,
}

pub(super) async fn subscribe_handler(
    State(state): State<Arc<FeedServerState>>,
    request: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };
    respond(
        state
            .subscriptions
            .subscribe(&request.email, &request.ticker)
            .await,
        "Email and ticker are required",
    )
}

pub(super) async fn unsubscribe_handler(
    State(state): State<Arc<FeedServerState>>,
    request: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };
    respond(
        state
            .subscriptions
            .unsubscribe(&request.email, &request.ticker)
            .await,
        "Email and ticker are required",
    )
}

pub(super) async fn subscriptions_handler(
    State(state): State<Arc<FeedServerState>>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };
    respond(
        state.subscriptions.subscriptions(&query.email).await,
        "Email is required",
    )
}

pub(super) async fn instruments_handler(
    State(state): State<Arc<FeedServerState>>,
) -> Json<Vec<Instrument>> {
    Json(state.subscriptions.universe().iter().cloned().collect())
}

fn bad_request(detail: &str) -> Response {
    tracing::debug!(detail, "Rejected malformed subscription request");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "Invalid request body".to_string(),
        }),
    )
        .into_response()
}

fn respond(
    result: Result<SubscriptionSet, SubscriptionError>,
    missing_field_message: &str,
) -> Response {
    let err = match result {
        Ok(subscriptions) => {
            return (
                StatusCode::OK,
                Json(SubscriptionResponse {
                    success: true,
                    subscriptions,
                }),
            )
                .into_response();
        }
        Err(err) => err,
    };

    let (status, message) = match err {
        SubscriptionError::MissingField(_) => {
            (StatusCode::BAD_REQUEST, missing_field_message.to_string())
        }
        SubscriptionError::InvalidSymbol(_) => {
            (StatusCode::BAD_REQUEST, INVALID_TICKER_MESSAGE.to_string())
        }
        SubscriptionError::NotFound(_) => (StatusCode::NOT_FOUND, "User not found".to_string()),
        SubscriptionError::Directory(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    };

    (status, Json(ErrorResponse { error: message })).into_response()
}
