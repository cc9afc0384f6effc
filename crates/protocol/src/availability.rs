//! Availability probe results.

use serde::{Deserialize, Serialize};

/// One purchasable ticket category as reported by the target site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketCategory {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub price: Option<String>,
	#[serde(default = "default_true")]
	pub available: bool,
}

fn default_true() -> bool {
	true
}

/// Technique that produced an availability answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeStrategy {
	/// JSON availability endpoint keyed by event id.
	StructuredApi,
	/// Plain HTTP fetch of the event page.
	StaticHtml,
	/// Event page loaded in a real browser engine.
	RenderedBrowser,
	/// No strategy produced a definitive answer.
	None,
}

impl std::fmt::Display for ProbeStrategy {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ProbeStrategy::StructuredApi => write!(f, "structured-api"),
			ProbeStrategy::StaticHtml => write!(f, "static-html"),
			ProbeStrategy::RenderedBrowser => write!(f, "rendered-browser"),
			ProbeStrategy::None => write!(f, "none"),
		}
	}
}

/// Reason code attached to an availability snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AvailabilityReason {
	Available,
	SoldOut,
	/// No strategy gave a definitive signal; treated as unavailable.
	Unknown,
}

impl std::fmt::Display for AvailabilityReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			AvailabilityReason::Available => write!(f, "available"),
			AvailabilityReason::SoldOut => write!(f, "sold-out"),
			AvailabilityReason::Unknown => write!(f, "unknown"),
		}
	}
}

/// Result of one probe against the target event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySnapshot {
	pub available: bool,
	pub reason: AvailabilityReason,
	pub strategy: ProbeStrategy,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub ticket_categories: Vec<TicketCategory>,
	/// Unix timestamp in milliseconds.
	pub checked_at: u64,
}

impl AvailabilitySnapshot {
	/// Fail-closed snapshot used when no strategy was definitive.
	pub fn unknown(checked_at: u64) -> Self {
		Self {
			available: false,
			reason: AvailabilityReason::Unknown,
			strategy: ProbeStrategy::None,
			ticket_categories: Vec::new(),
			checked_at,
		}
	}
}
