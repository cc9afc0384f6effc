//! Status report returned by the monitoring scheduler.

use serde::{Deserialize, Serialize};

use crate::{AvailabilitySnapshot, PurchaseResult};

/// Lifecycle state of a monitor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
	Running,
	Stopped,
	Purchased,
}

/// Snapshot of one monitor task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
	pub id: String,
	pub name: String,
	pub state: TaskState,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	pub quantity: u32,
	pub interval_secs: u64,
	pub ticks: u64,
	pub purchase_attempts: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_checked_at: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_snapshot: Option<AvailabilitySnapshot>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_purchase: Option<PurchaseResult>,
}

/// Aggregate status across all tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
	/// Unix timestamp in milliseconds.
	pub started_at: u64,
	pub uptime_secs: u64,
	pub tasks: Vec<TaskStatus>,
	/// Tasks that finished with a confirmed purchase.
	#[serde(default)]
	pub completed: Vec<TaskStatus>,
}
