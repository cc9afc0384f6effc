use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use seatwatch::SeatwatchError;
use seatwatch::protocol::ErrorBody;
use tracing::warn;

/// Control-plane failure rendered as an [`ErrorBody`].
#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	message: String,
}

impl ApiError {
	pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
		Self {
			status,
			message: message.into(),
		}
	}

	pub fn bad_request(message: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, message)
	}

	pub fn task_not_found(id: &str) -> Self {
		Self::new(StatusCode::NOT_FOUND, format!("task {id} not found"))
	}

	pub fn status(&self) -> StatusCode {
		self.status
	}
}

impl From<SeatwatchError> for ApiError {
	fn from(err: SeatwatchError) -> Self {
		let status = match &err {
			SeatwatchError::Config(_) => StatusCode::BAD_REQUEST,
			SeatwatchError::EventNotFound(_) => StatusCode::NOT_FOUND,
			SeatwatchError::Transient(_) | SeatwatchError::Http(_) => StatusCode::BAD_GATEWAY,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		};
		Self::new(status, err.to_string())
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		if self.status.is_server_error() {
			warn!(target = "seatwatch.server", status = %self.status, error = %self.message, "request failed");
		}
		let body = ErrorBody {
			success: false,
			message: self.message,
		};
		(self.status, Json(body)).into_response()
	}
}
