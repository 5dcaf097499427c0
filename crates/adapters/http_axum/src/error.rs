//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use housebridge_domain::error::{BridgeError, ControlError, RegistryError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`BridgeError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(BridgeError);

impl<E: Into<BridgeError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            BridgeError::Validation(_)
            | BridgeError::Control(
                ControlError::UnsupportedType(_) | ControlError::UnsupportedAction { .. },
            )
            | BridgeError::Registry(RegistryError::InvalidPattern { .. }) => {
                StatusCode::BAD_REQUEST
            }
            BridgeError::NotFound(_) => StatusCode::NOT_FOUND,
            BridgeError::Control(ControlError::Busy(_))
            | BridgeError::Registry(RegistryError::DuplicatePattern(_)) => StatusCode::CONFLICT,
            BridgeError::Control(ControlError::NotConnected) => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::Control(ControlError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            BridgeError::Control(ControlError::Publish(_)) | BridgeError::Transport(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            BridgeError::Validation(err) => err.to_string(),
            BridgeError::NotFound(err) => err.to_string(),
            BridgeError::Control(err) => err.to_string(),
            BridgeError::Registry(err) => err.to_string(),
            BridgeError::Transport(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self.0, "bridge error");
        }
        (
            status,
            Json(ErrorBody {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
