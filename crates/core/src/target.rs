//! What to monitor: the immutable match descriptor built from configuration.

use std::sync::LazyLock;

use regex_lite::Regex;
use seatwatch_protocol::{ConfigUpdate, MatchConfig, SectionPolicy};

use crate::error::{Result, SeatwatchError};

static EVENT_PATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/events/([^/?#]+)-(\d+)").expect("EVENT_PATH_RE regex should compile"));

/// Where the event page comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTarget {
	Url(String),
	/// Resolved through the site search on each tick until a URL is found.
	Search(String),
}

/// Seat-section preferences handed to the seat selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeatPreference {
	pub primary: Option<String>,
	pub secondary: Option<String>,
	pub adjacent: bool,
}

impl SeatPreference {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn primary(mut self, section: impl Into<String>) -> Self {
		self.primary = Some(section.into());
		self
	}

	pub fn secondary(mut self, section: impl Into<String>) -> Self {
		self.secondary = Some(section.into());
		self
	}

	pub fn adjacent(mut self, adjacent: bool) -> Self {
		self.adjacent = adjacent;
		self
	}

	fn from_policies(preferred: Option<&SectionPolicy>, alternative: Option<&SectionPolicy>) -> Self {
		Self {
			primary: preferred.map(|p| p.section.clone()).filter(|s| !s.trim().is_empty()),
			secondary: alternative.map(|p| p.section.clone()).filter(|s| !s.trim().is_empty()),
			adjacent: preferred.or(alternative).is_some_and(|p| p.adjacent),
		}
	}
}

/// Immutable descriptor of one monitored event.
///
/// Never mutated once monitoring starts; configuration changes build a new
/// value through [`TargetMatch::with_update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMatch {
	pub name: String,
	pub target: EventTarget,
	pub quantity: u32,
	pub ticket_category: Option<String>,
	pub team: Option<String>,
	pub seats: SeatPreference,
	config: MatchConfig,
}

impl TargetMatch {
	pub fn from_config(config: &MatchConfig) -> Result<Self> {
		let target = match (non_empty(config.url.as_deref()), non_empty(config.search_term.as_deref())) {
			(Some(url), _) => EventTarget::Url(url.to_string()),
			(None, Some(term)) => EventTarget::Search(term.to_string()),
			(None, None) => {
				return Err(SeatwatchError::Config(format!("match {:?} needs a url or a searchTerm", config.name)));
			}
		};

		let quantity = config.preferred_seats.as_ref().and_then(|p| p.quantity).unwrap_or(config.quantity);
		if quantity == 0 {
			return Err(SeatwatchError::Config(format!("match {:?} has zero quantity", config.name)));
		}

		Ok(Self {
			name: config.name.clone(),
			target,
			quantity,
			ticket_category: config.ticket_category.clone().filter(|c| !c.trim().is_empty()),
			team: config.team.clone().filter(|t| !t.trim().is_empty()),
			seats: SeatPreference::from_policies(config.preferred_seats.as_ref(), config.alternative.as_ref()),
			config: config.clone(),
		})
	}

	/// Applies a runtime update, producing a new descriptor.
	pub fn with_update(&self, update: &ConfigUpdate) -> Result<Self> {
		let mut config = self.config.clone();
		if let Some(team) = &update.team {
			config.team = Some(team.clone());
		}
		if let Some(quantity) = update.quantity {
			config.quantity = quantity;
			if let Some(preferred) = config.preferred_seats.as_mut() {
				preferred.quantity = None;
			}
		}
		if let Some(category) = &update.ticket_category {
			config.ticket_category = Some(category.clone());
		}
		if let Some(preferred) = &update.preferred_seats {
			config.preferred_seats = Some(preferred.clone());
		}
		if let Some(alternative) = &update.alternative {
			config.alternative = Some(alternative.clone());
		}
		if let Some(term) = &update.search_term {
			config.search_term = Some(term.clone());
			config.url = None;
		}
		Self::from_config(&config)
	}

	/// Same match pinned to a resolved event URL.
	pub fn with_resolved_url(&self, url: impl Into<String>) -> Self {
		let url = url.into();
		let mut resolved = self.clone();
		resolved.config.url = Some(url.clone());
		resolved.target = EventTarget::Url(url);
		resolved
	}

	pub fn url(&self) -> Option<&str> {
		match &self.target {
			EventTarget::Url(url) => Some(url),
			EventTarget::Search(_) => None,
		}
	}

	pub fn config(&self) -> &MatchConfig {
		&self.config
	}
}

fn non_empty(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|v| !v.is_empty())
}

/// Slug and numeric id of an event page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRef {
	pub slug: String,
	pub id: String,
}

/// Extracts the event reference from `/events/<slug>-<digits>`, falling back
/// to a trailing `-<digits>` on the last path segment.
pub fn parse_event_url(url: &str) -> Option<EventRef> {
	if let Some(caps) = EVENT_PATH_RE.captures(url) {
		return Some(EventRef {
			slug: caps[1].to_string(),
			id: caps[2].to_string(),
		});
	}

	let path = url.split(['?', '#']).next().unwrap_or(url);
	let last = path.trim_end_matches('/').rsplit('/').next()?;
	let (slug, id) = last.rsplit_once('-')?;
	if slug.is_empty() || id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
		return None;
	}
	Some(EventRef {
		slug: slug.to_string(),
		id: id.to_string(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config(json: &str) -> MatchConfig {
		serde_json::from_str(json).unwrap()
	}

	#[test]
	fn parses_event_urls() {
		let event = parse_event_url("https://webook.com/en/events/al-nassr-vs-al-hilal-4821/").unwrap();
		assert_eq!(event.slug, "al-nassr-vs-al-hilal");
		assert_eq!(event.id, "4821");

		let fallback = parse_event_url("https://webook.com/en/matches/derby-77?ref=home").unwrap();
		assert_eq!(fallback.id, "77");

		assert_eq!(parse_event_url("https://webook.com/en/events/derby"), None);
		assert_eq!(parse_event_url("https://webook.com/en/-12"), None);
	}

	#[test]
	fn builds_target_from_config() {
		let target = TargetMatch::from_config(&config(
			r#"{"name":"Derby","url":"https://webook.com/en/events/derby-1","quantity":2,"team":"",
			"preferredSeats":{"section":"North","adjacent":true},"alternative":{"section":"South"}}"#,
		))
		.unwrap();
		assert_eq!(target.url(), Some("https://webook.com/en/events/derby-1"));
		assert_eq!(target.team, None);
		assert_eq!(target.seats, SeatPreference::new().primary("North").secondary("South").adjacent(true));
	}

	#[test]
	fn rejects_match_without_location_or_quantity() {
		assert!(TargetMatch::from_config(&config(r#"{"name":"Nowhere"}"#)).is_err());
		assert!(TargetMatch::from_config(&config(r#"{"name":"Zero","searchTerm":"x","quantity":0}"#)).is_err());
	}

	#[test]
	fn updates_create_a_new_descriptor() {
		let original = TargetMatch::from_config(&config(
			r#"{"name":"Derby","url":"https://webook.com/en/events/derby-1","preferredSeats":{"section":"A","quantity":4}}"#,
		))
		.unwrap();
		assert_eq!(original.quantity, 4);

		let update = ConfigUpdate {
			team: Some("Al Hilal".into()),
			quantity: Some(2),
			..Default::default()
		};
		let updated = original.with_update(&update).unwrap();
		assert_eq!(updated.quantity, 2);
		assert_eq!(updated.team.as_deref(), Some("Al Hilal"));
		assert_eq!(original.quantity, 4);
		assert_eq!(updated.url(), original.url());
	}

	#[test]
	fn resolved_search_target_keeps_preferences() {
		let target = TargetMatch::from_config(&config(r#"{"name":"Derby","searchTerm":"derby","ticketCategory":"Gold"}"#)).unwrap();
		assert_eq!(target.url(), None);
		let resolved = target.with_resolved_url("https://webook.com/en/events/derby-9");
		assert_eq!(resolved.url(), Some("https://webook.com/en/events/derby-9"));
		assert_eq!(resolved.ticket_category.as_deref(), Some("Gold"));
	}
}
