//! Control-plane request and response bodies.

use serde::{Deserialize, Serialize};

use crate::{AvailabilitySnapshot, MatchConfig, PurchaseResult};

/// Body of `POST /api/tasks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTaskRequest {
	#[serde(rename = "match")]
	pub target: MatchConfig,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTaskResponse {
	pub task_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopTaskResponse {
	pub task_id: String,
	pub stopped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskResponse {
	pub task_id: String,
	pub updated: bool,
}

/// What an on-demand check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckOutcome {
	/// A tick was already in flight.
	Skipped,
	AlreadyPurchased,
	Checked,
	Attempted,
}

/// Response of `POST /api/tasks/{id}/check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckTaskResponse {
	pub task_id: String,
	pub outcome: CheckOutcome,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub snapshot: Option<AvailabilitySnapshot>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub purchase: Option<PurchaseResult>,
}

/// Body of `POST /api/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
	pub search_term: String,
}

/// One event card found on the site's search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListing {
	pub title: String,
	pub url: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub date: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub price: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub teams: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
	pub success: bool,
	pub message: String,
	pub events: Vec<EventListing>,
}

/// Uniform error body for control-plane failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
	pub success: bool,
	pub message: String,
}
