//! Availability Prober.
//!
//! Strategies run in a fixed order (structured API, static HTML, rendered
//! browser) until one is definitive: a positive answer, or a negative one
//! backed by an explicit sold-out indicator. When none is definitive the
//! snapshot is unavailable with reason `unknown`, so an ambiguous page never
//! triggers a purchase.

mod classify;
mod renderer;
mod strategy;

use std::sync::Arc;

use seatwatch_protocol::{AvailabilityReason, AvailabilitySnapshot};
use tracing::{debug, info};

pub use classify::{PageVerdict, classify_page, scrape_categories};
pub use renderer::{BrowserRenderer, PageRenderer, StaticRenderer};
pub use strategy::{ApiStrategy, RenderedStrategy, StaticHtmlStrategy, Strategy, StrategyOutcome, classify_api_body};

use crate::clock::now_ms;
use crate::session::SessionClient;

pub struct Prober {
	strategies: Vec<Box<dyn Strategy>>,
}

impl Prober {
	pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
		Self { strategies }
	}

	/// API, static HTML and (when a renderer is given) rendered-browser strategies.
	pub fn standard(client: Arc<SessionClient>, renderer: Option<Arc<dyn PageRenderer>>) -> Self {
		let site = Arc::clone(client.site());
		let mut strategies: Vec<Box<dyn Strategy>> = vec![
			Box::new(ApiStrategy::new(Arc::clone(&client))),
			Box::new(StaticHtmlStrategy::new(client)),
		];
		if let Some(renderer) = renderer {
			strategies.push(Box::new(RenderedStrategy::new(renderer, site)));
		}
		Self { strategies }
	}

	pub async fn probe(&self, event_url: &str) -> AvailabilitySnapshot {
		for strategy in &self.strategies {
			let kind = strategy.kind();
			match strategy.check(event_url).await {
				StrategyOutcome::Available(ticket_categories) => {
					info!(target = "seatwatch.probe", strategy = %kind, url = event_url, categories = ticket_categories.len(), "tickets available");
					return AvailabilitySnapshot {
						available: true,
						reason: AvailabilityReason::Available,
						strategy: kind,
						ticket_categories,
						checked_at: now_ms(),
					};
				}
				StrategyOutcome::SoldOut => {
					info!(target = "seatwatch.probe", strategy = %kind, url = event_url, "sold out");
					return AvailabilitySnapshot {
						available: false,
						reason: AvailabilityReason::SoldOut,
						strategy: kind,
						ticket_categories: Vec::new(),
						checked_at: now_ms(),
					};
				}
				StrategyOutcome::Inconclusive(detail) => {
					debug!(target = "seatwatch.probe", strategy = %kind, url = event_url, detail = %detail, "inconclusive");
				}
			}
		}

		info!(target = "seatwatch.probe", url = event_url, "no strategy was definitive; treating as unavailable");
		AvailabilitySnapshot::unknown(now_ms())
	}
}
