//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Errors are rendered as
//!
//! ```json
//! { "success": false, "status": 400, "message": "..." }
//! ```
//!
//! Server-side failures are captured to Sentry before responding and their
//! details are never sent to the client.

use axum::{
    Json,
    extract::rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use bazaar_core::{CartError, FilterError, IdError, TransitionError};

use crate::db::{RepositoryError, TimeoutKind};
use crate::models::ProductError;
use crate::services::auth::AuthError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request refused with a specific status, such as an oversized body.
    #[error("Rejected ({0}): {1}")]
    Rejected(StatusCode, String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Uniform error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub status: u16,
    pub message: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Store(err) => repository_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::TokenExpired => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::InvalidName(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(err) => repository_status(err),
                AuthError::Token(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rejected(status, _) => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wrap an extractor rejection. Body size and content type keep their
    /// own status; every other malformed input is a 400.
    fn rejection(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::PAYLOAD_TOO_LARGE | StatusCode::UNSUPPORTED_MEDIA_TYPE => {
                Self::Rejected(status, message)
            }
            _ => Self::BadRequest(message),
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        match self {
            Self::Store(err) | Self::Auth(AuthError::Repository(err)) => {
                repository_message(err)
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::InvalidToken => "Authentication required".to_string(),
                AuthError::TokenExpired => "Token expired, please sign in again".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) | AuthError::InvalidName(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                _ => "Internal server error".to_string(),
            },
            Self::NotFound(msg) | Self::BadRequest(msg) | Self::Rejected(_, msg) => msg.clone(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::UnknownProduct(_)
        | RepositoryError::EmptyCart
        | RepositoryError::InvalidProduct(_)
        | RepositoryError::Cart(_)
        | RepositoryError::Transition(_) => StatusCode::BAD_REQUEST,
        RepositoryError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn repository_message(err: &RepositoryError) -> String {
    match err {
        RepositoryError::NotFound => "Not found".to_string(),
        RepositoryError::Conflict(msg) => msg.clone(),
        RepositoryError::UnknownProduct(id) => format!("Product {id} does not exist"),
        RepositoryError::EmptyCart => "Cart is empty".to_string(),
        RepositoryError::InvalidProduct(e) => e.to_string(),
        RepositoryError::Cart(e) => e.to_string(),
        RepositoryError::Transition(e) => e.to_string(),
        RepositoryError::Timeout(TimeoutKind::Acquire | TimeoutKind::Statement) => {
            "Storage is busy, please retry".to_string()
        }
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            "Internal server error".to_string()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = ErrorBody {
            success: false,
            status: status.as_u16(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<IdError> for AppError {
    fn from(err: IdError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<FilterError> for AppError {
    fn from(err: FilterError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::rejection(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::rejection(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::rejection(rejection.status(), rejection.body_text())
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        Self::rejection(rejection.status(), rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{OrderStatus, ProductId};

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                AppError::Auth(AuthError::InvalidToken),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AppError::Auth(AuthError::UserAlreadyExists),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Rejected(StatusCode::PAYLOAD_TOO_LARGE, "x".into()),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                AppError::rejection(StatusCode::UNPROCESSABLE_ENTITY, "x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::rejection(StatusCode::UNSUPPORTED_MEDIA_TYPE, "x".into()),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                AppError::Store(RepositoryError::EmptyCart),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Store(RepositoryError::UnknownProduct(ProductId::new_v4())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Store(RepositoryError::Timeout(TimeoutKind::Statement)),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::Store(RepositoryError::DataCorruption("bad row".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Auth(AuthError::Repository(RepositoryError::Timeout(
                    TimeoutKind::Acquire,
                ))),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::from(OrderStatus::Delivered.transition(OrderStatus::Processing).unwrap_err()),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let (status, body) = body_of(AppError::NotFound("Product not found".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["status"], 404);
        assert_eq!(body["message"], "Product not found");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) = body_of(AppError::Store(RepositoryError::DataCorruption(
            "negative stock: -4".into(),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }
}
