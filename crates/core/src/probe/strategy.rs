//! The three availability strategies.

use std::sync::Arc;

use async_trait::async_trait;
use seatwatch_protocol::{ProbeStrategy as StrategyKind, TicketCategory};
use serde_json::Value;

use super::classify::{PageVerdict, classify_page};
use super::renderer::PageRenderer;
use crate::html::Document;
use crate::session::SessionClient;
use crate::site::Site;
use crate::target::parse_event_url;

/// Result of one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
	Available(Vec<TicketCategory>),
	/// Explicit negative indicator found.
	SoldOut,
	/// Error or no signal; the next strategy is tried.
	Inconclusive(String),
}

#[async_trait]
pub trait Strategy: Send + Sync {
	fn kind(&self) -> StrategyKind;

	async fn check(&self, event_url: &str) -> StrategyOutcome;
}

/// JSON availability endpoint keyed by event id.
pub struct ApiStrategy {
	client: Arc<SessionClient>,
}

impl ApiStrategy {
	pub fn new(client: Arc<SessionClient>) -> Self {
		Self { client }
	}
}

#[async_trait]
impl Strategy for ApiStrategy {
	fn kind(&self) -> StrategyKind {
		StrategyKind::StructuredApi
	}

	async fn check(&self, event_url: &str) -> StrategyOutcome {
		let Some(event) = parse_event_url(event_url) else {
			return StrategyOutcome::Inconclusive("no event id in url".into());
		};
		let url = self.client.site().availability_url(&event.id);
		let response = match self.client.get_json(&url).await {
			Ok(response) => response,
			Err(e) => return StrategyOutcome::Inconclusive(e.to_string()),
		};
		if response.status != 200 {
			return StrategyOutcome::Inconclusive(format!("status {}", response.status));
		}
		match response.json::<Value>() {
			Ok(body) => classify_api_body(&body),
			Err(e) => StrategyOutcome::Inconclusive(format!("unparseable body: {}", e)),
		}
	}
}

/// Reads an availability payload: `available: true` is positive, `available:
/// false` is negative only alongside `soldOut: true` or a sold-out status.
pub fn classify_api_body(body: &Value) -> StrategyOutcome {
	match body.get("available").and_then(Value::as_bool) {
		Some(true) => {
			let categories = ["categories", "ticketCategories"]
				.iter()
				.find_map(|key| body.get(*key).and_then(Value::as_array))
				.map(|items| items.iter().filter_map(category_from_json).collect())
				.unwrap_or_default();
			StrategyOutcome::Available(categories)
		}
		Some(false) => {
			let sold_out_flag = body.get("soldOut").and_then(Value::as_bool).unwrap_or(false);
			let sold_out_status = body
				.get("status")
				.and_then(Value::as_str)
				.is_some_and(|s| matches!(s.to_ascii_lowercase().as_str(), "sold_out" | "sold-out" | "soldout"));
			if sold_out_flag || sold_out_status {
				StrategyOutcome::SoldOut
			} else {
				StrategyOutcome::Inconclusive("available=false without sold-out indicator".into())
			}
		}
		None => StrategyOutcome::Inconclusive("no availability field".into()),
	}
}

fn category_from_json(item: &Value) -> Option<TicketCategory> {
	let text = |key: &str| match item.get(key)? {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	};
	let name = text("name").or_else(|| text("title"))?;
	Some(TicketCategory {
		id: text("id"),
		name,
		price: text("price"),
		available: item.get("available").and_then(Value::as_bool).unwrap_or(true),
	})
}

/// Plain HTTP fetch of the event page.
pub struct StaticHtmlStrategy {
	client: Arc<SessionClient>,
}

impl StaticHtmlStrategy {
	pub fn new(client: Arc<SessionClient>) -> Self {
		Self { client }
	}
}

#[async_trait]
impl Strategy for StaticHtmlStrategy {
	fn kind(&self) -> StrategyKind {
		StrategyKind::StaticHtml
	}

	async fn check(&self, event_url: &str) -> StrategyOutcome {
		let response = match self.client.navigate(event_url, false).await {
			Ok(response) => response,
			Err(e) => return StrategyOutcome::Inconclusive(e.to_string()),
		};
		if !response.is_success() {
			return StrategyOutcome::Inconclusive(format!("status {}", response.status));
		}
		let doc = Document::parse(response.body);
		verdict_to_outcome(classify_page(self.client.site(), &doc))
	}
}

/// Event page loaded in a browser engine.
pub struct RenderedStrategy {
	renderer: Arc<dyn PageRenderer>,
	site: Arc<Site>,
}

impl RenderedStrategy {
	pub fn new(renderer: Arc<dyn PageRenderer>, site: Arc<Site>) -> Self {
		Self { renderer, site }
	}
}

#[async_trait]
impl Strategy for RenderedStrategy {
	fn kind(&self) -> StrategyKind {
		StrategyKind::RenderedBrowser
	}

	async fn check(&self, event_url: &str) -> StrategyOutcome {
		match self.renderer.render(event_url).await {
			Ok(html) => verdict_to_outcome(classify_page(&self.site, &Document::parse(html))),
			Err(e) => StrategyOutcome::Inconclusive(e.to_string()),
		}
	}
}

fn verdict_to_outcome(verdict: PageVerdict) -> StrategyOutcome {
	match verdict {
		PageVerdict::Available(categories) => StrategyOutcome::Available(categories),
		PageVerdict::SoldOut => StrategyOutcome::SoldOut,
		PageVerdict::Inconclusive => StrategyOutcome::Inconclusive("no availability indicators".into()),
	}
}
