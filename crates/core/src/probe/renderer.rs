//! Rendered-DOM access for client-rendered pages.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use seatwatch_runtime::{Browser, LaunchOptions};
use tracing::{debug, warn};

use crate::error::{Result, SeatwatchError};

/// Loads a page in a browser engine and returns its live DOM as HTML.
#[async_trait]
pub trait PageRenderer: Send + Sync {
	async fn render(&self, url: &str) -> Result<String>;
}

/// Launches a private Chromium per render and always closes it afterwards.
#[derive(Debug, Clone)]
pub struct BrowserRenderer {
	options: LaunchOptions,
}

impl BrowserRenderer {
	pub fn new(options: LaunchOptions) -> Self {
		Self { options }
	}
}

#[async_trait]
impl PageRenderer for BrowserRenderer {
	async fn render(&self, url: &str) -> Result<String> {
		let browser = Browser::launch(&self.options).await?;
		debug!(target = "seatwatch.browser", port = browser.port(), version = ?browser.version(), url, "rendering page");

		let rendered = browser.render(url).await;

		// Release happens on every path; a failed close never masks the render result.
		if let Err(e) = browser.close().await {
			warn!(target = "seatwatch.browser", error = %e, "browser did not close cleanly");
		}

		Ok(rendered?.html)
	}
}

/// Renderer that serves fixed HTML per URL and counts calls.
#[derive(Debug, Clone, Default)]
pub struct StaticRenderer {
	pages: Arc<Mutex<HashMap<String, String>>>,
	calls: Arc<AtomicUsize>,
}

impl StaticRenderer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_page(self, url: &str, html: &str) -> Self {
		self.pages.lock().insert(url.to_string(), html.to_string());
		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl PageRenderer for StaticRenderer {
	async fn render(&self, url: &str) -> Result<String> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.pages
			.lock()
			.get(url)
			.cloned()
			.ok_or_else(|| SeatwatchError::Transient(format!("no rendered page for {}", url)))
	}
}
