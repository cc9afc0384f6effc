//! Target-site profile: URLs, selector lists and text phrases.
//!
//! Everything that depends on the ticketing site's markup lives here as
//! configuration. Each page element is described by an ordered list of
//! selectors that is compiled once into a [`SelectorChain`].

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SeatwatchError};
use crate::html::SelectorChain;

/// Serializable site description, as found in the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteProfile {
	pub base_url: String,
	pub api_base: String,
	pub login_path: String,
	pub search_path: String,
	/// Availability endpoint relative to `api_base`; `{id}` is the event id.
	pub availability_path: String,
	/// Appended to the event URL for the ticket-selection POST.
	pub book_suffix: String,
	/// Fallback checkout location when the funnel does not name one.
	pub checkout_suffix: String,
	/// Path segments that mark the seat-selection step, compared whole and
	/// case-insensitively. Event slugs never match a segment by substring.
	pub seat_path_segments: Vec<String>,
	pub user_agent: String,
	pub request_timeout_secs: u64,
	pub selectors: SiteSelectors,
	pub unavailability_phrases: Vec<String>,
	pub confirmation_phrases: Vec<String>,
	pub confirmed_statuses: Vec<String>,
}

impl Default for SiteProfile {
	fn default() -> Self {
		Self {
			base_url: "https://webook.com".into(),
			api_base: "https://webook.com/api".into(),
			login_path: "/en/login".into(),
			search_path: "/en/search".into(),
			availability_path: "/events/{id}/availability".into(),
			book_suffix: "/book".into(),
			checkout_suffix: "/checkout".into(),
			seat_path_segments: strings(&["seats", "seat-selection", "seat-map"]),
			user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36".into(),
			request_timeout_secs: 20,
			selectors: SiteSelectors::default(),
			unavailability_phrases: strings(&["Sold Out", "Not Available", "Coming Soon"]),
			confirmation_phrases: strings(&[
				"thank you",
				"order confirmed",
				"booking confirmed",
				"purchase complete",
				"payment successful",
			]),
			confirmed_statuses: strings(&["confirmed", "success", "completed", "paid"]),
		}
	}
}

/// Ordered selector lists per page element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSelectors {
	pub ticket_available: Vec<String>,
	pub sold_out: Vec<String>,
	pub availability_indicator: Vec<String>,
	pub ticket_category: Vec<String>,
	pub category_name: Vec<String>,
	pub category_price: Vec<String>,
	pub category_availability: Vec<String>,
	pub login_form: Vec<String>,
	pub login_error: Vec<String>,
	pub logged_in: Vec<String>,
	pub seat_step: Vec<String>,
	pub seat: Vec<String>,
	pub checkout_form: Vec<String>,
	pub confirmation: Vec<String>,
	pub order_id: Vec<String>,
	pub order_status: Vec<String>,
	pub heading: Vec<String>,
	pub event_card: Vec<String>,
}

impl Default for SiteSelectors {
	fn default() -> Self {
		Self {
			ticket_available: strings(&[
				".ticket-category:not(.sold-out)",
				".book-button",
				r#"[data-testid="buy-ticket-button"]"#,
				"#buy-tickets-button",
			]),
			sold_out: strings(&[".sold-out", ".unavailable", ".no-tickets"]),
			availability_indicator: strings(&[".ticket-availability", ".availability"]),
			ticket_category: strings(&[".ticket-category", r#"[data-testid="ticket-category"]"#]),
			category_name: strings(&[".name", ".category-name"]),
			category_price: strings(&[".price", ".category-price"]),
			category_availability: strings(&[".availability"]),
			login_form: strings(&["form.login-form", r#"[data-testid="login-form"]"#, r#"form[action*="login"]"#]),
			login_error: strings(&[".alert-danger", ".error-message", ".invalid-feedback", r#"[role="alert"]"#]),
			logged_in: strings(&[".user-profile", r#"[data-testid="user-menu"]"#, r#"a[href*="logout"]"#]),
			seat_step: strings(&[r#"form[action$="/seats"]"#, ".seat-map", "#seat-selection"]),
			seat: strings(&[".seat:not(.sold-out):not(.taken)", "[data-seat-id]:not(.sold-out)"]),
			checkout_form: strings(&[r#"form[action*="checkout"]"#, "form#checkout-form"]),
			confirmation: strings(&[
				".confirmation-message",
				".purchase-confirmation",
				r#"[data-testid="order-confirmation"]"#,
				".order-success",
			]),
			order_id: strings(&[".order-number", r#"[data-testid="order-number"]"#, "[data-order-id]"]),
			order_status: strings(&["[data-order-status]", ".order-status"]),
			heading: strings(&["h1", "h2"]),
			event_card: strings(&[".event-card, .event-item", r#"[data-testid="event-card"]"#, r#"a[href*="/events/"]"#]),
		}
	}
}

fn strings(items: &[&str]) -> Vec<String> {
	items.iter().map(|s| s.to_string()).collect()
}

/// Compiled selector chains.
#[derive(Debug, Clone)]
pub struct Selectors {
	pub ticket_available: SelectorChain,
	pub sold_out: SelectorChain,
	pub availability_indicator: SelectorChain,
	pub ticket_category: SelectorChain,
	pub category_name: SelectorChain,
	pub category_price: SelectorChain,
	pub category_availability: SelectorChain,
	pub login_form: SelectorChain,
	pub login_error: SelectorChain,
	pub logged_in: SelectorChain,
	pub seat_step: SelectorChain,
	pub seat: SelectorChain,
	pub checkout_form: SelectorChain,
	pub confirmation: SelectorChain,
	pub order_id: SelectorChain,
	pub order_status: SelectorChain,
	pub heading: SelectorChain,
	pub event_card: SelectorChain,
}

impl SiteSelectors {
	fn compile(&self) -> Result<Selectors> {
		let chain = |field: &str, list: &[String]| {
			SelectorChain::parse(list).map_err(|e| SeatwatchError::Config(format!("selectors.{}: {}", field, e)))
		};
		Ok(Selectors {
			ticket_available: chain("ticketAvailable", &self.ticket_available)?,
			sold_out: chain("soldOut", &self.sold_out)?,
			availability_indicator: chain("availabilityIndicator", &self.availability_indicator)?,
			ticket_category: chain("ticketCategory", &self.ticket_category)?,
			category_name: chain("categoryName", &self.category_name)?,
			category_price: chain("categoryPrice", &self.category_price)?,
			category_availability: chain("categoryAvailability", &self.category_availability)?,
			login_form: chain("loginForm", &self.login_form)?,
			login_error: chain("loginError", &self.login_error)?,
			logged_in: chain("loggedIn", &self.logged_in)?,
			seat_step: chain("seatStep", &self.seat_step)?,
			seat: chain("seat", &self.seat)?,
			checkout_form: chain("checkoutForm", &self.checkout_form)?,
			confirmation: chain("confirmation", &self.confirmation)?,
			order_id: chain("orderId", &self.order_id)?,
			order_status: chain("orderStatus", &self.order_status)?,
			heading: chain("heading", &self.heading)?,
			event_card: chain("eventCard", &self.event_card)?,
		})
	}
}

/// Validated site profile with compiled selectors, shared by every component.
#[derive(Debug, Clone)]
pub struct Site {
	profile: SiteProfile,
	base: Url,
	pub selectors: Selectors,
}

impl Site {
	pub fn new(profile: SiteProfile) -> Result<Self> {
		let base = Url::parse(&profile.base_url)
			.map_err(|e| SeatwatchError::Config(format!("site.baseUrl {:?}: {}", profile.base_url, e)))?;
		Url::parse(&profile.api_base).map_err(|e| SeatwatchError::Config(format!("site.apiBase {:?}: {}", profile.api_base, e)))?;
		let selectors = profile.selectors.compile()?;
		Ok(Self {
			profile,
			base,
			selectors,
		})
	}

	pub fn profile(&self) -> &SiteProfile {
		&self.profile
	}

	/// Resolves `href` against the site base URL.
	pub fn absolute_url(&self, href: &str) -> Result<String> {
		self.resolve(self.base.as_str(), href)
	}

	/// Resolves `href` against `page` (falling back to the site base).
	pub fn resolve(&self, page: &str, href: &str) -> Result<String> {
		let base = Url::parse(page).unwrap_or_else(|_| self.base.clone());
		base.join(href.trim())
			.map(String::from)
			.map_err(|e| SeatwatchError::Http(format!("bad URL {:?}: {}", href, e)))
	}

	pub fn login_url(&self) -> Result<String> {
		self.absolute_url(&self.profile.login_path)
	}

	pub fn search_url(&self, term: &str) -> Result<String> {
		let mut url = Url::parse(&self.absolute_url(&self.profile.search_path)?)
			.map_err(|e| SeatwatchError::Config(format!("site.searchPath: {}", e)))?;
		url.query_pairs_mut().append_pair("q", term);
		Ok(url.into())
	}

	pub fn availability_url(&self, event_id: &str) -> String {
		let path = self.profile.availability_path.replace("{id}", event_id);
		format!("{}{}", self.profile.api_base.trim_end_matches('/'), path)
	}

	pub fn book_url(&self, event_url: &str) -> String {
		format!("{}{}", event_url.trim_end_matches('/'), self.profile.book_suffix)
	}

	pub fn checkout_url(&self, event_url: &str) -> String {
		format!("{}{}", event_url.trim_end_matches('/'), self.profile.checkout_suffix)
	}

	/// Whether `url` points at the login page.
	pub fn is_login_url(&self, url: &str) -> bool {
		let login = self.profile.login_path.trim_end_matches('/');
		match Url::parse(url).or_else(|_| self.base.join(url)) {
			Ok(parsed) => !login.is_empty() && parsed.path().trim_end_matches('/').ends_with(login),
			Err(_) => false,
		}
	}

	/// Whether the path of `url` has one of the seat-step segments.
	pub fn is_seat_step_url(&self, url: &str) -> bool {
		let Ok(parsed) = Url::parse(url).or_else(|_| self.base.join(url)) else {
			return false;
		};
		parsed.path_segments().is_some_and(|mut segments| {
			segments.any(|segment| self.profile.seat_path_segments.iter().any(|s| s.eq_ignore_ascii_case(segment)))
		})
	}

	/// Whether `text` contains one of the unavailability phrases.
	pub fn mentions_unavailable(&self, text: &str) -> bool {
		let lower = text.to_lowercase();
		self.profile.unavailability_phrases.iter().any(|p| lower.contains(&p.to_lowercase()))
	}

	pub fn mentions_confirmation(&self, text: &str) -> bool {
		let lower = text.to_lowercase();
		self.profile.confirmation_phrases.iter().any(|p| lower.contains(&p.to_lowercase()))
	}

	pub fn is_confirmed_status(&self, status: &str) -> bool {
		let status = status.trim();
		self.profile.confirmed_statuses.iter().any(|s| s.eq_ignore_ascii_case(status))
	}
}

impl Default for Site {
	fn default() -> Self {
		Site::new(SiteProfile::default()).expect("default site profile should compile")
	}
}
