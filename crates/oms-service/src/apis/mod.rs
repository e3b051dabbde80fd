//! API handlers for the order management service.
//!
//! Each module covers one resource; the error-to-status mapping lives
//! here so every handler reports rejections the same way: the message
//! always names the rejected action and the current state, and invalid
//! transitions additionally list the actions that would have been legal.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use oms_core::OmsError;
use oms_state::StateError;
use oms_types::ErrorResponse;

/// Invoice record endpoints.
pub mod invoices;
/// Order endpoints.
pub mod orders;
/// Payment endpoints.
pub mod payments;
/// Return endpoints.
pub mod returns;

/// Wrapper turning orchestration errors into HTTP responses.
pub struct ApiError(pub OmsError);

impl From<OmsError> for ApiError {
	fn from(err: OmsError) -> Self {
		ApiError(err)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let (status, code) = match &self.0 {
			OmsError::State(StateError::InvalidTransition { .. }) => {
				(StatusCode::BAD_REQUEST, "INVALID_TRANSITION")
			}
			OmsError::State(StateError::AlreadyInState { .. }) => {
				(StatusCode::BAD_REQUEST, "ALREADY_IN_STATE")
			}
			OmsError::State(StateError::InvalidOperation(_)) => {
				(StatusCode::BAD_REQUEST, "INVALID_OPERATION")
			}
			OmsError::State(StateError::InvalidState(_)) => {
				(StatusCode::BAD_REQUEST, "INVALID_STATE")
			}
			OmsError::Reference(_) => (StatusCode::BAD_REQUEST, "REFERENCE_ERROR"),
			OmsError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
			OmsError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
			OmsError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
			OmsError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
		};

		if status.is_server_error() {
			tracing::error!(error = %self.0, "Request failed");
		} else {
			tracing::warn!(error = %self.0, "Request rejected");
		}

		(
			status,
			Json(ErrorResponse {
				error: code.to_string(),
				message: self.0.to_string(),
			}),
		)
			.into_response()
	}
}
