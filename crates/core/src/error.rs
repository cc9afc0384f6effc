use seatwatch_protocol::FailureReason;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeatwatchError {
	/// Timeouts, 5xx responses and connection resets.
	#[error("Transient network error: {0}")]
	Transient(String),

	#[error("Session expired")]
	SessionExpired,

	#[error("Login failed: {0}")]
	LoginFailed(String),

	#[error("Ticket selection failed: {0}")]
	SelectionFailed(String),

	#[error("Insufficient seats: wanted {wanted}, found {found}")]
	InsufficientSeats { wanted: u32, found: u32 },

	#[error("Checkout unconfirmed: {0}")]
	CheckoutUnconfirmed(String),

	#[error("Event not found: {0}")]
	EventNotFound(String),

	#[error("HTTP error: {0}")]
	Http(String),

	#[error("Invalid configuration: {0}")]
	Config(String),

	#[error(transparent)]
	Browser(#[from] seatwatch_runtime::RuntimeError),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl SeatwatchError {
	/// Whether a transition may be retried after this error.
	pub fn is_transient(&self) -> bool {
		matches!(self, SeatwatchError::Transient(_))
	}

	/// Reason code recorded on a failed purchase.
	pub fn failure_reason(&self) -> FailureReason {
		match self {
			SeatwatchError::Transient(_) => FailureReason::TransientNetwork,
			SeatwatchError::SessionExpired => FailureReason::SessionExpired,
			SeatwatchError::LoginFailed(_) => FailureReason::LoginFailed,
			SeatwatchError::SelectionFailed(_) => FailureReason::SelectionFailed,
			SeatwatchError::InsufficientSeats { .. } => FailureReason::NoSeatsAvailable,
			SeatwatchError::CheckoutUnconfirmed(_) => FailureReason::CheckoutUnconfirmed,
			SeatwatchError::EventNotFound(_) => FailureReason::EventNotFound,
			_ => FailureReason::Unexpected,
		}
	}
}

impl From<reqwest::Error> for SeatwatchError {
	fn from(err: reqwest::Error) -> Self {
		if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
			SeatwatchError::Transient(err.to_string())
		} else {
			SeatwatchError::Http(err.to_string())
		}
	}
}

pub type Result<T> = std::result::Result<T, SeatwatchError>;
