//! Unified error handling for admin.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lustre_core::store::StoreError;
use lustre_core::{DeliveryPolicyError, LifecycleError};
use serde::Serialize;
use thiserror::Error;

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Order lifecycle operation failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Store operation failed outside the lifecycle manager.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Submitted delivery settings were rejected.
    #[error(transparent)]
    DeliveryPolicy(#[from] DeliveryPolicyError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Lifecycle(err) => match err {
                LifecycleError::NotFound => StatusCode::NOT_FOUND,
                LifecycleError::InvalidTransition { .. }
                | LifecycleError::AnnotationsLocked { .. }
                | LifecycleError::NotDeletable { .. } => StatusCode::CONFLICT,
                LifecycleError::TrackingNumberTooLong { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                LifecycleError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DeliveryPolicy(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
