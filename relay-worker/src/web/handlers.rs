//! User publish endpoint handlers.
//!
//! These handlers are designed to be extremely fast - they only:
//! 1. Hand the record to the RabbitMQ publisher
//! 2. Return immediately
//!
//! Whether the record is ultimately persisted is decided in the consumer
//! process; no delivery outcome is reported here.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::{error, info};

use crate::queue::{Publisher, UserRecord};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub publisher: Publisher,
}

impl AppState {
    pub fn new(publisher: Publisher) -> Self {
        Self { publisher }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// User Publish
// =============================================================================

/// Publish response.
#[derive(Serialize)]
pub struct PublishResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// User publish endpoint.
///
/// This endpoint:
/// 1. Accepts a JSON user record
/// 2. Publishes it to the user exchange immediately
/// 3. Returns 202 Accepted
pub async fn publish_user(
    State(state): State<AppState>,
    Json(record): Json<UserRecord>,
) -> impl IntoResponse {
    info!(
        user_id = %record.user_id,
        user_name_length = record.user_name.len(),
        "user_publish_received"
    );

    if let Err(e) = state.publisher.publish(&record).await {
        error!(user_id = %record.user_id, error = %e, "user_publish_failed");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(PublishResponse {
                status: "error",
                user_id: None,
            }),
        );
    }

    info!(user_id = %record.user_id, "user_enqueued");

    (
        StatusCode::ACCEPTED,
        Json(PublishResponse {
            status: "published",
            user_id: Some(record.user_id),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_response_omits_missing_user_id() {
        let ok = PublishResponse {
            status: "published",
            user_id: Some("u1".to_string()),
        };
        let err = PublishResponse {
            status: "error",
            user_id: None,
        };

        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"status":"published","user_id":"u1"}"#
        );
        assert_eq!(serde_json::to_string(&err).unwrap(), r#"{"status":"error"}"#);
    }
}
