//! Event discovery through the site's search page.

use std::sync::Arc;

use seatwatch_protocol::EventListing;
use tracing::{debug, info};

use crate::error::{Result, SeatwatchError};
use crate::html::{Document, Element};
use crate::session::SessionClient;

pub struct EventFinder {
	client: Arc<SessionClient>,
}

impl EventFinder {
	pub fn new(client: Arc<SessionClient>) -> Self {
		Self { client }
	}

	/// Event cards for `term`, in page order, deduplicated by URL.
	pub async fn find(&self, term: &str) -> Result<Vec<EventListing>> {
		let term = term.trim();
		if term.is_empty() {
			return Err(SeatwatchError::Config("search term is empty".into()));
		}
		let site = self.client.site();
		let url = site.search_url(term)?;
		let response = self.client.navigate(&url, false).await?;
		if !response.is_success() {
			return Err(SeatwatchError::Http(format!("search page returned status {}", response.status)));
		}

		let doc = Document::parse(response.body.as_str());
		let listings = scrape_listings(&self.client, &response.url, &doc);
		info!(target = "seatwatch.finder", term, results = listings.len(), "search finished");
		Ok(listings)
	}

	/// URL of the first listing for `term`.
	pub async fn resolve(&self, term: &str) -> Result<String> {
		self.find(term)
			.await?
			.into_iter()
			.next()
			.map(|listing| listing.url)
			.ok_or_else(|| SeatwatchError::EventNotFound(term.to_string()))
	}
}

fn scrape_listings(client: &SessionClient, page_url: &str, doc: &Document) -> Vec<EventListing> {
	let site = client.site();
	let Some((selector, cards)) = site.selectors.event_card.first_match(doc) else {
		debug!(target = "seatwatch.finder", "no event cards on the search page");
		return Vec::new();
	};
	debug!(target = "seatwatch.finder", selector = %selector, cards = cards.len(), "matched event cards");

	let mut listings: Vec<EventListing> = Vec::new();
	for card in &cards {
		let Some(href) = card_href(card) else {
			continue;
		};
		let Ok(url) = site.resolve(page_url, &href) else {
			continue;
		};
		if listings.iter().any(|l| l.url == url) {
			continue;
		}

		let title = first_text(card, &["h1", "h2", "h3", "h4", ".title", ".event-title"])
			.or_else(|| Some(card.text()).filter(|t| !t.is_empty()))
			.unwrap_or_else(|| url.clone());
		let mut teams: Vec<String> = card.find(".team, .participant").iter().map(|t| t.text()).filter(|t| !t.is_empty()).collect();
		if teams.is_empty() {
			teams = split_teams(&title);
		}

		listings.push(EventListing {
			title,
			url,
			date: first_text(card, &[".date", "time", ".event-date"]),
			price: first_text(card, &[".price", ".event-price"]),
			location: first_text(card, &[".location", ".venue"]),
			teams,
		});
	}
	listings
}

fn card_href(card: &Element<'_>) -> Option<String> {
	card.attr("href")
		.or_else(|| card.find_first("a[href]").and_then(|a| a.attr("href")))
		.filter(|href| !href.trim().is_empty() && !href.starts_with('#'))
}

fn first_text(card: &Element<'_>, selectors: &[&str]) -> Option<String> {
	selectors.iter().find_map(|selector| card.find_first(selector).map(|el| el.text()).filter(|t| !t.is_empty()))
}

/// "Al Nassr vs Al Ittihad" → both sides.
fn split_teams(title: &str) -> Vec<String> {
	let lower = title.to_ascii_lowercase();
	for separator in [" vs. ", " vs ", " v "] {
		if let Some(at) = lower.find(separator) {
			let home = title[..at].trim();
			let away = title[at + separator.len()..].trim();
			if !home.is_empty() && !away.is_empty() {
				return vec![home.to_string(), away.to_string()];
			}
		}
	}
	Vec::new()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::session::{Credentials, FakeTransport};
	use crate::site::Site;

	const SEARCH_PAGE: &str = r#"<html><body>
		<div class="event-card">
			<a href="/en/events/alnassr-vs-alittihad-4412"><h3>Al Nassr vs Al Ittihad</h3></a>
			<span class="date">Fri 12 Dec</span><span class="venue">Al-Awwal Park</span>
			<span class="price">From 75 SAR</span>
		</div>
		<div class="event-card">
			<a href="/en/events/alnassr-vs-alittihad-4412">Duplicate link</a>
		</div>
		<div class="event-card">
			<a href="/en/events/cup-final-9001"><h3>Cup Final</h3></a>
			<span class="team">Al Hilal</span><span class="team">Al Ahli</span>
		</div>
		<div class="event-card"><h3>Card without link</h3></div>
	</body></html>"#;

	fn finder(transport: &FakeTransport) -> EventFinder {
		let client = SessionClient::new(Arc::new(transport.clone()), Arc::new(Site::default()), Credentials::default());
		EventFinder::new(Arc::new(client))
	}

	#[tokio::test]
	async fn scrapes_and_deduplicates_event_cards() {
		let transport = FakeTransport::new();
		transport.on_get("https://webook.com/en/search?q=al+nassr", 200, SEARCH_PAGE);

		let listings = finder(&transport).find("al nassr").await.unwrap();
		assert_eq!(listings.len(), 2);

		let derby = &listings[0];
		assert_eq!(derby.title, "Al Nassr vs Al Ittihad");
		assert_eq!(derby.url, "https://webook.com/en/events/alnassr-vs-alittihad-4412");
		assert_eq!(derby.date.as_deref(), Some("Fri 12 Dec"));
		assert_eq!(derby.location.as_deref(), Some("Al-Awwal Park"));
		assert_eq!(derby.price.as_deref(), Some("From 75 SAR"));
		assert_eq!(derby.teams, ["Al Nassr", "Al Ittihad"]);

		assert_eq!(listings[1].teams, ["Al Hilal", "Al Ahli"]);
	}

	#[tokio::test]
	async fn resolve_without_results_is_event_not_found() {
		let transport = FakeTransport::new();
		transport.on_get("https://webook.com/en/search?q=nothing", 200, "<p>No events</p>");
		match finder(&transport).resolve("nothing").await {
			Err(SeatwatchError::EventNotFound(term)) => assert_eq!(term, "nothing"),
			other => panic!("expected EventNotFound, got {other:?}"),
		}
	}

	#[test]
	fn splits_versus_titles() {
		assert_eq!(split_teams("Hilal VS Ahli"), ["Hilal", "Ahli"]);
		assert!(split_teams("Riyadh Season Concert").is_empty());
	}
}
