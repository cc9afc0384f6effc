//! Reading the final checkout page.

use crate::html::{Document, snippet};
use crate::site::Site;

const SNIPPET_CHARS: usize = 240;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
	Confirmed { order_id: Option<String>, snippet: String },
	/// No confirmation signal anywhere on the page.
	Unconfirmed { snippet: String },
}

/// Classifies a checkout response page.
///
/// Confirmed only on an explicit marker, a confirmation phrase in a heading,
/// or an order-status field that reads as confirmed. HTTP status is not
/// consulted.
pub fn classify_confirmation(site: &Site, doc: &Document) -> Confirmation {
	let selectors = &site.selectors;
	let order_id = extract_order_id(site, doc);

	if let Some((_, markers)) = selectors.confirmation.first_match(doc) {
		let text = markers.iter().map(|m| m.text()).find(|t| !t.is_empty()).unwrap_or_default();
		return Confirmation::Confirmed {
			order_id,
			snippet: snippet(&text, SNIPPET_CHARS),
		};
	}

	if let Some((_, headings)) = selectors.heading.first_match(doc) {
		if let Some(text) = headings.iter().map(|h| h.text()).find(|t| site.mentions_confirmation(t)) {
			return Confirmation::Confirmed {
				order_id,
				snippet: snippet(&text, SNIPPET_CHARS),
			};
		}
	}

	if let Some((_, fields)) = selectors.order_status.first_match(doc) {
		for field in fields {
			let status = field.attr("data-order-status").unwrap_or_else(|| field.text());
			if site.is_confirmed_status(&status) {
				return Confirmation::Confirmed {
					order_id,
					snippet: snippet(&format!("order status: {}", status.trim()), SNIPPET_CHARS),
				};
			}
		}
	}

	Confirmation::Unconfirmed {
		snippet: snippet(&doc.text(), SNIPPET_CHARS),
	}
}

fn extract_order_id(site: &Site, doc: &Document) -> Option<String> {
	let (_, found) = site.selectors.order_id.first_match(doc)?;
	found.iter().find_map(|el| {
		el.attr("data-order-id")
			.or_else(|| {
				let text = el.text();
				let id = text.rsplit([':', '#']).next().unwrap_or(&text).trim().to_string();
				Some(id)
			})
			.filter(|id| !id.is_empty())
	})
}
