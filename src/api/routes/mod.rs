pub mod actions;
pub mod allocation;
pub mod app;
pub mod approval;
pub mod auth;
pub mod cases;
pub mod closure;
pub mod comments;
pub mod dashboard;
pub mod documents;
pub mod investigation;
pub mod legal;
pub mod regulatory;
pub mod review;
pub mod risk;
pub mod state;
pub mod users;

use axum::{http::StatusCode, Json};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use serde::Serialize;

use crate::db::Database;

/// Error response structure with user-friendly message. `fields` carries
/// per-field messages on form validation failures and is omitted otherwise.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

/// The error side of every handler: an HTTP status plus a JSON body.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            fields: None,
        }),
    )
}

/// 400 carrying the per-field messages from a form validation.
pub fn validation_error(fields: Vec<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "Validation failed".to_string(),
            fields: Some(fields),
        }),
    )
}

/// Logs the real error and returns a generic 500 body.
pub fn internal_error<E: std::fmt::Display>(context: &str, err: E) -> ApiError {
    log::error!("{}: {}", context, err);
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "An internal error occurred",
    )
}

/// Checks out a pooled connection, mapping failure to a 500.
pub fn db_connection() -> Result<PooledConnection<SqliteConnectionManager>, ApiError> {
    Database::get_connection().map_err(|e| internal_error("Database connection error", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_omits_fields_unless_validation() {
        let (status, Json(body)) = api_error(StatusCode::NOT_FOUND, "Case not found");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"error":"Case not found"}"#
        );

        let (status, Json(body)) =
            validation_error(vec!["category is required".to_string()]);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"error":"Validation failed","fields":["category is required"]}"#
        );
    }
}
