//! Availability classification of an event page, shared by the static and
//! rendered strategies.

use seatwatch_protocol::TicketCategory;

use crate::html::Document;
use crate::site::Site;

/// What a page says about availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageVerdict {
	Available(Vec<TicketCategory>),
	SoldOut,
	Inconclusive,
}

pub fn classify_page(site: &Site, doc: &Document) -> PageVerdict {
	let selectors = &site.selectors;

	if let Some((selector, _)) = selectors.ticket_available.first_match(doc) {
		tracing::debug!(target = "seatwatch.probe", selector = %selector, "ticket indicator found");
		return PageVerdict::Available(scrape_categories(site, doc));
	}

	if let Some((selector, _)) = selectors.sold_out.first_match(doc) {
		tracing::debug!(target = "seatwatch.probe", selector = %selector, "sold-out marker found");
		return PageVerdict::SoldOut;
	}

	let indicator_says_unavailable = selectors
		.availability_indicator
		.first_match(doc)
		.is_some_and(|(_, found)| found.iter().any(|el| site.mentions_unavailable(&el.text())));
	if indicator_says_unavailable {
		return PageVerdict::SoldOut;
	}

	PageVerdict::Inconclusive
}

/// Ticket categories listed on an event page.
pub fn scrape_categories(site: &Site, doc: &Document) -> Vec<TicketCategory> {
	let selectors = &site.selectors;
	let Some((_, elements)) = selectors.ticket_category.first_match(doc) else {
		return Vec::new();
	};

	elements
		.iter()
		.map(|el| {
			let first_text = |chain: &crate::html::SelectorChain| {
				chain.first_match_in(el).and_then(|found| found.first().map(|e| e.text())).filter(|t| !t.is_empty())
			};
			let name = first_text(&selectors.category_name)
				.or_else(|| el.attr("data-name"))
				.unwrap_or_else(|| "Unknown".to_string());
			let available = match first_text(&selectors.category_availability) {
				Some(text) => !site.mentions_unavailable(&text),
				None => !el.has_class("sold-out"),
			};
			TicketCategory {
				id: el.attr("data-id").or_else(|| el.attr("data-ticket-id")).or_else(|| el.attr("id")),
				name,
				price: first_text(&selectors.category_price),
				available,
			}
		})
		.collect()
}
