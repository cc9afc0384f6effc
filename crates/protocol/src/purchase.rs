//! Terminal purchase outcomes.

use serde::{Deserialize, Serialize};

/// Reason code for a failed purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
	LoginFailed,
	SelectionFailed,
	NoSeatsAvailable,
	CheckoutUnconfirmed,
	SessionExpired,
	TransientNetwork,
	EventNotFound,
	Unexpected,
}

impl std::fmt::Display for FailureReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			FailureReason::LoginFailed => write!(f, "LOGIN_FAILED"),
			FailureReason::SelectionFailed => write!(f, "SELECTION_FAILED"),
			FailureReason::NoSeatsAvailable => write!(f, "NO_SEATS_AVAILABLE"),
			FailureReason::CheckoutUnconfirmed => write!(f, "CHECKOUT_UNCONFIRMED"),
			FailureReason::SessionExpired => write!(f, "SESSION_EXPIRED"),
			FailureReason::TransientNetwork => write!(f, "TRANSIENT_NETWORK"),
			FailureReason::EventNotFound => write!(f, "EVENT_NOT_FOUND"),
			FailureReason::Unexpected => write!(f, "UNEXPECTED"),
		}
	}
}

/// Terminal record of one checkout run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResult {
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<FailureReason>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	/// Short excerpt of the page text that was read as confirmation.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub confirmation_snippet: Option<String>,
	/// Unix timestamp in milliseconds.
	pub finished_at: u64,
}

impl PurchaseResult {
	pub fn confirmed(order_id: Option<String>, snippet: Option<String>, finished_at: u64) -> Self {
		Self {
			success: true,
			order_id,
			reason: None,
			error: None,
			confirmation_snippet: snippet,
			finished_at,
		}
	}

	pub fn failed(reason: FailureReason, error: impl Into<String>, finished_at: u64) -> Self {
		Self {
			success: false,
			order_id: None,
			reason: Some(reason),
			error: Some(error.into()),
			confirmation_snippet: None,
			finished_at,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn failed_result_carries_reason_code() {
		let result = PurchaseResult::failed(FailureReason::CheckoutUnconfirmed, "no marker", 7);
		let json = serde_json::to_value(&result).unwrap();
		assert_eq!(json["success"], false);
		assert_eq!(json["reason"], "CHECKOUT_UNCONFIRMED");
		assert_eq!(json["error"], "no marker");
		assert!(json.get("orderId").is_none());
	}
}
