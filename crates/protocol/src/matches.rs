//! Match configuration shapes used by the settings file and the control plane.

use serde::{Deserialize, Serialize};

/// Seat-section preference: which section, how many seats, and whether they must sit together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPolicy {
	pub section: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub quantity: Option<u32>,
	#[serde(default)]
	pub adjacent: bool,
}

/// Configured event to monitor.
///
/// Either `url` or `searchTerm` must be present. When only a search term is
/// given the event URL is resolved through the site's search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchConfig {
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub search_term: Option<String>,
	#[serde(default = "default_quantity")]
	pub quantity: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ticket_category: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub team: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub preferred_seats: Option<SectionPolicy>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub alternative: Option<SectionPolicy>,
	/// Per-match poll interval; falls back to the global interval.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub interval_secs: Option<u64>,
}

fn default_quantity() -> u32 {
	1
}

/// Runtime configuration change for a running task. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub team: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub quantity: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ticket_category: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub preferred_seats: Option<SectionPolicy>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub alternative: Option<SectionPolicy>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub search_term: Option<String>,
}

impl ConfigUpdate {
	pub fn is_empty(&self) -> bool {
		self == &ConfigUpdate::default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn match_config_accepts_minimal_shape() {
		let config: MatchConfig = serde_json::from_str(r#"{"name":"Derby","searchTerm":"alnassr vs alittihad"}"#).unwrap();
		assert_eq!(config.quantity, 1);
		assert_eq!(config.url, None);
		assert_eq!(config.search_term.as_deref(), Some("alnassr vs alittihad"));
	}

	#[test]
	fn section_policy_reads_camel_case() {
		let config: MatchConfig = serde_json::from_str(
			r#"{"name":"Derby","url":"https://example.com/en/events/derby-1","quantity":2,
			"preferredSeats":{"section":"A","quantity":2,"adjacent":true}}"#,
		)
		.unwrap();
		let preferred = config.preferred_seats.unwrap();
		assert_eq!(preferred.section, "A");
		assert!(preferred.adjacent);
	}

	#[test]
	fn empty_update_is_detected() {
		assert!(ConfigUpdate::default().is_empty());
		let update = ConfigUpdate {
			team: Some("Al Nassr".into()),
			..Default::default()
		};
		assert!(!update.is_empty());
	}
}
