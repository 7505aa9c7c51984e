//! Error types for the dashboard API.
//!
//! [`ApiError`] unifies all failure modes of a request into a single enum
//! that renders as a JSON `{error, status}` body via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use waypoint_core::DispatchError;
use waypoint_data::DataError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An invalid path or query parameter was provided.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The dispatcher rejected an interaction.
    #[error("interaction rejected: {0}")]
    Rejected(#[from] DispatchError),

    /// The data backend failed.
    #[error("data error: {0}")]
    Data(#[from] DataError),
}

impl ApiError {
    /// HTTP status of this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidQuery(_) | Self::Data(DataError::SpatialFilter(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Data(DataError::InvalidRecord(_)) => StatusCode::BAD_GATEWAY,
            Self::Data(DataError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Data(DataError::Unsupported(_)) => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
