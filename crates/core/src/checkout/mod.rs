//! Checkout Orchestrator: drives the purchase funnel to one terminal result.
//!
//! Stages run in order `LoggingIn → SelectingTickets → SelectingSeats
//! (optional) → SubmittingCheckout → Confirmed | Failed`. Network-bound
//! stages retry transient failures through the shared [`RetryPolicy`].
//! A lost session triggers one fresh login and one retry of the current
//! stage; a second loss in the same run is terminal.

mod confirm;

use std::future::Future;
use std::sync::Arc;

use seatwatch_protocol::{AvailabilitySnapshot, PurchaseResult, TicketCategory};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

pub use confirm::{Confirmation, classify_confirmation};

use crate::audit::{AuditLog, AuditRecord};
use crate::clock::now_ms;
use crate::error::{Result, SeatwatchError};
use crate::html::{Document, Form, contains_ignore_case, meta_content, snippet};
use crate::probe::scrape_categories;
use crate::retry::RetryPolicy;
use crate::seats::{scrape_seats, select_seats};
use crate::session::{Method, RawResponse, RequestBody, SessionClient};
use crate::target::TargetMatch;

/// Contact details submitted on the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Payer {
	pub first_name: String,
	pub last_name: String,
	pub email: String,
	pub phone: String,
}

impl Payer {
	fn full_name(&self) -> String {
		format!("{} {}", self.first_name.trim(), self.last_name.trim()).trim().to_string()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
	LoggingIn,
	SelectingTickets,
	SelectingSeats,
	SubmittingCheckout,
	Confirmed,
	Failed,
}

impl std::fmt::Display for CheckoutStage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			CheckoutStage::LoggingIn => write!(f, "logging-in"),
			CheckoutStage::SelectingTickets => write!(f, "selecting-tickets"),
			CheckoutStage::SelectingSeats => write!(f, "selecting-seats"),
			CheckoutStage::SubmittingCheckout => write!(f, "submitting-checkout"),
			CheckoutStage::Confirmed => write!(f, "confirmed"),
			CheckoutStage::Failed => write!(f, "failed"),
		}
	}
}

/// A page reached inside the funnel.
#[derive(Debug, Clone)]
struct FunnelPage {
	url: String,
	body: String,
}

struct Confirmed {
	order_id: Option<String>,
	snippet: String,
	url: String,
}

/// Per-run bookkeeping.
struct Run<'a> {
	task_id: &'a str,
	target: &'a TargetMatch,
	event_url: &'a str,
	stage: CheckoutStage,
	relogged: bool,
}

pub struct CheckoutOrchestrator {
	client: Arc<SessionClient>,
	payer: Payer,
	retry: RetryPolicy,
	audit: Arc<AuditLog>,
}

impl CheckoutOrchestrator {
	pub fn new(client: Arc<SessionClient>, payer: Payer, retry: RetryPolicy, audit: Arc<AuditLog>) -> Self {
		Self {
			client,
			payer,
			retry,
			audit,
		}
	}

	/// Runs the funnel once. Always yields exactly one result; errors become
	/// a failed result with their reason code.
	pub async fn run(&self, task_id: &str, target: &TargetMatch, event_url: &str, snapshot: &AvailabilitySnapshot) -> PurchaseResult {
		let mut run = Run {
			task_id,
			target,
			event_url,
			stage: CheckoutStage::LoggingIn,
			relogged: false,
		};
		info!(target = "seatwatch.checkout", task_id, match_name = %target.name, url = event_url, quantity = target.quantity, "starting checkout");

		match self.drive(&mut run, snapshot).await {
			Ok(confirmed) => {
				info!(target = "seatwatch.checkout", task_id, stage = %CheckoutStage::Confirmed, order_id = ?confirmed.order_id, "purchase confirmed");
				self.audit.record(&AuditRecord {
					task_id: task_id.to_string(),
					match_name: target.name.clone(),
					order_id: confirmed.order_id.clone(),
					url: confirmed.url,
					snippet: confirmed.snippet.clone(),
					confirmed: true,
					at: now_ms(),
				});
				PurchaseResult::confirmed(confirmed.order_id, Some(confirmed.snippet), now_ms())
			}
			Err(e) => {
				error!(target = "seatwatch.checkout", task_id, stage = %CheckoutStage::Failed, failed_in = %run.stage, error = %e, "checkout failed");
				PurchaseResult::failed(e.failure_reason(), e.to_string(), now_ms())
			}
		}
	}

	async fn drive(&self, run: &mut Run<'_>, snapshot: &AvailabilitySnapshot) -> Result<Confirmed> {
		self.enter(run, CheckoutStage::LoggingIn);
		if !self.client.is_authenticated() {
			self.login().await?;
		}

		let (target, event_url) = (run.target, run.event_url);
		self.enter(run, CheckoutStage::SelectingTickets);
		let mut page = self
			.step(run, "select-tickets", || self.select_tickets(target, event_url, snapshot))
			.await
			.map_err(selection_failure)?;

		if self.needs_seat_selection(&page) {
			self.enter(run, CheckoutStage::SelectingSeats);
			let seat_page = page.clone();
			page = self.step(run, "select-seats", || self.select_seats(target, &seat_page)).await?;
		}

		self.enter(run, CheckoutStage::SubmittingCheckout);
		let result = self.step(run, "submit-checkout", || self.submit_checkout(event_url, &page)).await?;

		let doc = Document::parse(result.body.as_str());
		match classify_confirmation(self.client.site(), &doc) {
			Confirmation::Confirmed { order_id, snippet } => Ok(Confirmed {
				order_id,
				snippet,
				url: result.url,
			}),
			Confirmation::Unconfirmed { snippet } => {
				warn!(target = "seatwatch.checkout", task_id = run.task_id, url = %result.url, "checkout response carried no confirmation");
				self.audit.record(&AuditRecord {
					task_id: run.task_id.to_string(),
					match_name: run.target.name.clone(),
					order_id: None,
					url: result.url.clone(),
					snippet: snippet.clone(),
					confirmed: false,
					at: now_ms(),
				});
				Err(SeatwatchError::CheckoutUnconfirmed(snippet))
			}
		}
	}

	fn enter(&self, run: &mut Run<'_>, stage: CheckoutStage) {
		run.stage = stage;
		info!(target = "seatwatch.checkout", task_id = run.task_id, %stage, "entering stage");
	}

	/// Login with bounded retries. Any failure is reported as `LoginFailed`.
	async fn login(&self) -> Result<()> {
		let retryable = |e: &SeatwatchError| e.is_transient() || matches!(e, SeatwatchError::LoginFailed(_));
		match self.retry.run_when("login", retryable, || self.client.login()).await {
			Ok(_) => Ok(()),
			Err(e @ SeatwatchError::LoginFailed(_)) => Err(e),
			Err(other) => Err(SeatwatchError::LoginFailed(other.to_string())),
		}
	}

	/// Runs one network-bound stage with transient retries and a single
	/// re-login on session loss.
	async fn step<T, F, Fut>(&self, run: &mut Run<'_>, label: &str, op: F) -> Result<T>
	where
		F: Fn() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		loop {
			match self.retry.run(label, &op).await {
				Err(SeatwatchError::SessionExpired) if !run.relogged => {
					run.relogged = true;
					warn!(target = "seatwatch.checkout", task_id = run.task_id, stage = %run.stage, "session lost; logging in again");
					self.login().await?;
				}
				other => return other,
			}
		}
	}

	async fn select_tickets(&self, target: &TargetMatch, event_url: &str, snapshot: &AvailabilitySnapshot) -> Result<FunnelPage> {
		let site = self.client.site();
		let event_page = self.client.navigate(event_url, true).await?;
		if !event_page.is_success() {
			return Err(SeatwatchError::SelectionFailed(format!("event page returned status {}", event_page.status)));
		}
		let doc = Document::parse(event_page.body.as_str());

		let mut categories = scrape_categories(site, &doc);
		if categories.is_empty() {
			categories = snapshot.ticket_categories.clone();
		}
		let category = pick_category(&categories, target.ticket_category.as_deref())
			.ok_or_else(|| SeatwatchError::SelectionFailed("no ticket categories on the event page".into()))?;
		let ticket_id = category.id.clone().unwrap_or_else(|| category.name.clone());
		info!(target = "seatwatch.checkout", category = %category.name, ticket_id = %ticket_id, quantity = target.quantity, "selecting tickets");

		let mut fields = Vec::new();
		if let Some(token) = csrf_token(&doc) {
			fields.push(("_token".to_string(), token));
		}
		fields.push(("ticket_id".to_string(), ticket_id));
		fields.push(("quantity".to_string(), target.quantity.to_string()));
		if let Some(team) = &target.team {
			fields.push(("team".to_string(), team.clone()));
		}

		let book_url = site.book_url(event_url);
		let response = self.client.request(Method::Post, &book_url, Some(RequestBody::Form(fields)), true).await?;
		let page = self
			.follow(&book_url, response)
			.await?
			.ok_or_else(|| SeatwatchError::SelectionFailed(format!("{} rejected the selection", book_url)))?;

		let doc = Document::parse(page.body.as_str());
		if let Some((_, errors)) = site.selectors.login_error.first_match(&doc) {
			let message = errors.iter().map(|e| e.text()).find(|t| !t.is_empty()).unwrap_or_else(|| "selection rejected".into());
			return Err(SeatwatchError::SelectionFailed(snippet(&message, 200)));
		}
		Ok(page)
	}

	fn needs_seat_selection(&self, page: &FunnelPage) -> bool {
		let site = self.client.site();
		site.is_seat_step_url(&page.url) || site.selectors.seat_step.matches_any(&Document::parse(page.body.as_str()))
	}

	async fn select_seats(&self, target: &TargetMatch, page: &FunnelPage) -> Result<FunnelPage> {
		let site = self.client.site();
		let doc = Document::parse(page.body.as_str());
		let candidates = scrape_seats(site, &doc);
		let chosen = select_seats(&candidates, target.quantity, &target.seats)?;
		info!(
			target = "seatwatch.checkout",
			seats = ?chosen.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
			available = candidates.len(),
			"seats chosen"
		);

		let form_el = site
			.selectors
			.seat_step
			.first_match(&doc)
			.and_then(|(_, found)| found.into_iter().find(|el| el.tag() == "form"))
			.or_else(|| doc.find_first("form"));
		let mut form = form_el.as_ref().map(Form::from_element).unwrap_or_default();
		form.fields.retain(|(name, _)| name != "seats[]");
		if form.field("_token").is_none() {
			if let Some(token) = csrf_token(&doc) {
				form.set("_token", token);
			}
		}
		for seat in &chosen {
			form.fields.push(("seats[]".to_string(), seat.id.clone()));
		}

		let action = match form.action.as_deref() {
			Some(action) => site.resolve(&page.url, action)?,
			None => page.url.clone(),
		};
		let response = self.client.request(Method::Post, &action, Some(RequestBody::Form(form.fields)), true).await?;
		self.follow(&action, response)
			.await?
			.ok_or_else(|| SeatwatchError::SelectionFailed(format!("{} rejected the seat selection", action)))
	}

	async fn submit_checkout(&self, event_url: &str, page: &FunnelPage) -> Result<FunnelPage> {
		let site = self.client.site();
		let mut checkout_page = page.clone();
		let mut doc = Document::parse(checkout_page.body.as_str());

		if !site.selectors.checkout_form.matches_any(&doc) {
			let fallback = site.checkout_url(event_url);
			warn!(target = "seatwatch.checkout", url = %fallback, "no checkout form on the funnel page; loading fallback");
			let response = self.client.navigate(&fallback, true).await?;
			checkout_page = FunnelPage {
				url: response.url,
				body: response.body,
			};
			doc = Document::parse(checkout_page.body.as_str());
		}

		let form_el = site.selectors.checkout_form.first_match(&doc).and_then(|(_, found)| found.into_iter().next());
		let mut form = form_el.as_ref().map(Form::from_element).unwrap_or_default();
		if form.field("_token").is_none() {
			if let Some(token) = csrf_token(&doc) {
				form.set("_token", token);
			}
		}
		self.fill_payer(&mut form);

		let action = match form.action.as_deref() {
			Some(action) => site.resolve(&checkout_page.url, action)?,
			None => checkout_page.url.clone(),
		};
		info!(target = "seatwatch.checkout", url = %action, "submitting checkout");
		let response = self.client.request(Method::Post, &action, Some(RequestBody::Form(form.fields)), true).await?;
		match self.follow(&action, response).await? {
			Some(result) => Ok(result),
			None => Err(SeatwatchError::CheckoutUnconfirmed(format!("{} rejected the checkout", action))),
		}
	}

	fn fill_payer(&self, form: &mut Form) {
		let payer = &self.payer;
		let pairs = [
			("first_name", payer.first_name.clone()),
			("last_name", payer.last_name.clone()),
			("name", payer.full_name()),
			("email", payer.email.clone()),
			("phone", payer.phone.clone()),
		];
		for (name, value) in pairs {
			if !value.is_empty() {
				form.set(name, value);
			}
		}
		if form.field("payment_method").is_none_or(str::is_empty) {
			form.set("payment_method", "card");
		}
	}

	/// Follows a redirect from a funnel POST. `None` means the site answered
	/// with a client error.
	async fn follow(&self, request_url: &str, response: RawResponse) -> Result<Option<FunnelPage>> {
		if let Some(location) = response.location() {
			let next = self.client.site().resolve(request_url, location)?;
			let page = self.client.navigate(&next, true).await?;
			return Ok(page.is_success().then(|| FunnelPage {
				url: page.url,
				body: page.body,
			}));
		}
		if response.status >= 400 {
			warn!(target = "seatwatch.checkout", url = request_url, status = response.status, "funnel step rejected");
			return Ok(None);
		}
		Ok(Some(FunnelPage {
			url: response.url,
			body: response.body,
		}))
	}
}

/// Ticket selection reports its own failures; session and login errors pass through.
fn selection_failure(e: SeatwatchError) -> SeatwatchError {
	match e {
		SeatwatchError::SessionExpired | SeatwatchError::SelectionFailed(_) | SeatwatchError::LoginFailed(_) => e,
		other => SeatwatchError::SelectionFailed(other.to_string()),
	}
}

fn csrf_token(doc: &Document) -> Option<String> {
	meta_content(doc, "csrf-token").or_else(|| doc.find_first(r#"input[name="_token"]"#).and_then(|i| i.attr("value")))
}

/// Configured category by case-insensitive substring, else the first one,
/// preferring categories still marked available.
pub fn pick_category<'a>(categories: &'a [TicketCategory], wanted: Option<&str>) -> Option<&'a TicketCategory> {
	if let Some(wanted) = wanted {
		let named = || categories.iter().filter(|c| contains_ignore_case(&c.name, wanted));
		if let Some(found) = named().find(|c| c.available).or_else(|| named().next()) {
			return Some(found);
		}
	}
	categories.iter().find(|c| c.available).or_else(|| categories.first())
}
