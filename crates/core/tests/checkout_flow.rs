use std::sync::Arc;
use std::time::Duration;

use seatwatch::audit::{AuditLog, AuditRecord};
use seatwatch::checkout::{CheckoutOrchestrator, Payer};
use seatwatch::protocol::{AvailabilityReason, AvailabilitySnapshot, FailureReason, MatchConfig, ProbeStrategy};
use seatwatch::retry::RetryPolicy;
use seatwatch::session::{Credentials, FakeTransport, Method};
use seatwatch::site::Site;
use seatwatch::{Pipeline, TargetMatch};
use tempfile::TempDir;

const LOGIN: &str = "https://webook.com/en/login";
const EVENT: &str = "https://webook.com/en/events/derby-12";
const BOOK: &str = "https://webook.com/en/events/derby-12/book";
const SEATS: &str = "https://webook.com/en/events/derby-12/seats";
const CHECKOUT: &str = "https://webook.com/en/events/derby-12/checkout";
const SUBMIT: &str = "https://webook.com/en/checkout/submit";

const LOGIN_PAGE: &str = r#"<form class="login-form" action="/en/login" method="post">
	<input type="hidden" name="_token" value="login-tok">
	<input type="email" name="email"><input type="password" name="password">
</form>"#;

const EVENT_PAGE: &str = r#"<html><head><meta name="csrf-token" content="tok-9"></head><body>
	<div class="ticket-category" data-id="7"><span class="name">Gold</span><span class="price">250 SAR</span></div>
	<div class="ticket-category" data-id="8"><span class="name">Silver Upper</span><span class="price">120 SAR</span></div>
</body></html>"#;

const SEAT_PAGE: &str = r#"<form action="/en/events/derby-12/seats" method="post">
	<input type="hidden" name="_token" value="tok-9">
	<div data-section="South"><div data-row="A">
		<span class="seat" data-seat-id="s1" data-number="1"></span>
		<span class="seat" data-seat-id="s2" data-number="2"></span>
	</div></div>
	<div data-section="North"><div data-row="C">
		<span class="seat" data-seat-id="n4" data-number="4"></span>
		<span class="seat taken" data-seat-id="n5" data-number="5"></span>
		<span class="seat" data-seat-id="n6" data-number="6"></span>
		<span class="seat" data-seat-id="n7" data-number="7"></span>
	</div></div>
</form>"#;

const CHECKOUT_PAGE: &str = r#"<form id="checkout-form" action="/en/checkout/submit" method="post">
	<input type="hidden" name="_token" value="tok-9">
	<input type="hidden" name="order_ref" value="r-1">
	<input name="email" value="">
	<button type="submit">Pay</button>
</form>"#;

const CONFIRMED_PAGE: &str = r#"<div class="confirmation-message">Booking confirmed</div><p class="order-number">Order #WB-77</p>"#;

struct Harness {
	fake: FakeTransport,
	audit_dir: TempDir,
}

impl Harness {
	/// Site with only the login page routed.
	fn bare() -> Self {
		let _ = tracing_subscriber::fmt().with_test_writer().try_init();
		let fake = FakeTransport::new();
		fake.on_get(LOGIN, 200, LOGIN_PAGE);
		Self {
			fake,
			audit_dir: tempfile::tempdir().unwrap(),
		}
	}

	fn new() -> Self {
		let h = Self::bare();
		h.fake.on_post(LOGIN, 302, "").location("/en/account").cookie("session=s1; Path=/");
		h.fake.on_get(EVENT, 200, EVENT_PAGE);
		h.fake.on_get(CHECKOUT, 200, CHECKOUT_PAGE);
		h
	}

	fn audit_path(&self) -> std::path::PathBuf {
		self.audit_dir.path().join("audit.jsonl")
	}

	fn orchestrator(&self) -> CheckoutOrchestrator {
		let pipeline = Pipeline::new(Arc::new(self.fake.clone()), Arc::new(Site::default()))
			.with_credentials(Credentials::new("fan@example.com", "hunter2"))
			.with_payer(Payer {
				first_name: "Sara".into(),
				last_name: "Ali".into(),
				email: "sara@example.com".into(),
				phone: "0500000000".into(),
			})
			.with_retry(RetryPolicy::linear(3, Duration::from_millis(1)))
			.with_audit(Arc::new(AuditLog::new(Some(self.audit_path()))));
		pipeline.orchestrator(pipeline.session())
	}

	fn audit_records(&self) -> Vec<AuditRecord> {
		std::fs::read_to_string(self.audit_path())
			.unwrap_or_default()
			.lines()
			.map(|line| serde_json::from_str(line).unwrap())
			.collect()
	}
}

fn target(json: serde_json::Value) -> TargetMatch {
	let config: MatchConfig = serde_json::from_value(json).unwrap();
	TargetMatch::from_config(&config).unwrap()
}

fn derby() -> TargetMatch {
	target(serde_json::json!({ "name": "Derby", "url": EVENT, "quantity": 2 }))
}

fn snapshot() -> AvailabilitySnapshot {
	AvailabilitySnapshot {
		available: true,
		reason: AvailabilityReason::Available,
		strategy: ProbeStrategy::StaticHtml,
		ticket_categories: Vec::new(),
		checked_at: 1,
	}
}

#[tokio::test]
async fn full_funnel_with_seat_step_is_confirmed_and_audited() {
	let h = Harness::new();
	h.fake.on_post(BOOK, 302, "").location("/en/events/derby-12/seats");
	h.fake.on_get(SEATS, 200, SEAT_PAGE);
	h.fake.on_post(SEATS, 302, "").location("/en/events/derby-12/checkout");
	h.fake.on_post(SUBMIT, 200, CONFIRMED_PAGE);

	let target = target(serde_json::json!({
		"name": "Derby",
		"url": EVENT,
		"quantity": 2,
		"ticketCategory": "silver",
		"team": "Al Nassr",
		"preferredSeats": { "section": "North", "adjacent": true }
	}));
	let result = h.orchestrator().run("task-1", &target, EVENT, &snapshot()).await;

	assert!(result.success, "unexpected failure: {:?}", result.error);
	assert_eq!(result.order_id.as_deref(), Some("WB-77"));
	assert_eq!(result.confirmation_snippet.as_deref(), Some("Booking confirmed"));

	let book = h.fake.last_request(Method::Post, "/book").unwrap();
	assert_eq!(book.form_value("_token"), Some("tok-9"));
	assert_eq!(book.form_value("ticket_id"), Some("8"));
	assert_eq!(book.form_value("quantity"), Some("2"));
	assert_eq!(book.form_value("team"), Some("Al Nassr"));
	assert!(book.header_value("Cookie").is_some_and(|c| c.contains("session=s1")));

	let seats = h.fake.last_request(Method::Post, "/seats").unwrap();
	assert_eq!(seats.form_values("seats[]"), ["n6", "n7"]);
	assert_eq!(seats.form_value("_token"), Some("tok-9"));

	let submit = h.fake.last_request(Method::Post, "/checkout/submit").unwrap();
	assert_eq!(submit.form_value("order_ref"), Some("r-1"));
	assert_eq!(submit.form_value("email"), Some("sara@example.com"));
	assert_eq!(submit.form_value("name"), Some("Sara Ali"));
	assert_eq!(submit.form_value("payment_method"), Some("card"));

	let records = h.audit_records();
	assert_eq!(records.len(), 1);
	assert!(records[0].confirmed);
	assert_eq!(records[0].order_id.as_deref(), Some("WB-77"));
	assert_eq!(records[0].url, SUBMIT);
}

#[tokio::test]
async fn http_success_without_confirmation_is_unconfirmed() {
	let h = Harness::new();
	h.fake.on_post(BOOK, 302, "").location("/en/events/derby-12/checkout");
	h.fake.on_post(SUBMIT, 200, "<h1>Checkout</h1><p>Please review your order.</p>");

	let result = h.orchestrator().run("task-1", &derby(), EVENT, &snapshot()).await;
	assert!(!result.success);
	assert_eq!(result.reason, Some(FailureReason::CheckoutUnconfirmed));
	assert_eq!(h.fake.count(Method::Post, "/checkout/submit"), 1);

	let records = h.audit_records();
	assert_eq!(records.len(), 1);
	assert!(!records[0].confirmed);
	assert!(records[0].snippet.contains("Please review"));
}

#[tokio::test]
async fn session_loss_triggers_one_relogin() {
	let h = Harness::new();
	h.fake.on_post(BOOK, 302, "").location("/en/login");
	h.fake.on_post(BOOK, 302, "").location("/en/events/derby-12/checkout");
	h.fake.on_post(SUBMIT, 200, CONFIRMED_PAGE);

	let result = h.orchestrator().run("task-1", &derby(), EVENT, &snapshot()).await;
	assert!(result.success, "unexpected failure: {:?}", result.error);
	assert_eq!(h.fake.count(Method::Post, "/en/login"), 2);
	assert_eq!(h.fake.count(Method::Post, "/book"), 2);
}

#[tokio::test]
async fn second_session_loss_is_terminal() {
	let h = Harness::new();
	h.fake.on_post(BOOK, 302, "").location("/en/login");

	let result = h.orchestrator().run("task-1", &derby(), EVENT, &snapshot()).await;
	assert!(!result.success);
	assert_eq!(result.reason, Some(FailureReason::SessionExpired));
	assert_eq!(h.fake.count(Method::Post, "/en/login"), 2);
	assert_eq!(h.fake.count(Method::Post, "/checkout/submit"), 0);
}

#[tokio::test]
async fn transient_failures_are_retried_within_the_stage() {
	let h = Harness::new();
	h.fake.fail(Method::Post, BOOK, "connection reset");
	h.fake.on_post(BOOK, 302, "").location("/en/events/derby-12/checkout");
	h.fake.on_post(SUBMIT, 200, CONFIRMED_PAGE);

	let result = h.orchestrator().run("task-1", &derby(), EVENT, &snapshot()).await;
	assert!(result.success, "unexpected failure: {:?}", result.error);
	assert_eq!(h.fake.count(Method::Post, "/book"), 2);
}

#[tokio::test]
async fn rejected_login_is_login_failed() {
	let h = Harness::bare();
	h.fake.on_post(LOGIN, 200, r#"<div class="alert-danger">Invalid credentials</div>"#);

	let result = h.orchestrator().run("task-1", &derby(), EVENT, &snapshot()).await;
	assert!(!result.success);
	assert_eq!(result.reason, Some(FailureReason::LoginFailed));
	assert_eq!(h.fake.count(Method::Post, "/en/login"), 3);
	assert_eq!(h.fake.count(Method::Post, "/book"), 0);
}

#[tokio::test]
async fn too_few_adjacent_seats_is_no_seats_available() {
	let h = Harness::new();
	h.fake.on_post(BOOK, 302, "").location("/en/events/derby-12/seats");
	h.fake.on_get(SEATS, 200, SEAT_PAGE);

	let target = target(serde_json::json!({
		"name": "Derby",
		"url": EVENT,
		"quantity": 3,
		"preferredSeats": { "section": "North", "adjacent": true }
	}));
	let result = h.orchestrator().run("task-1", &target, EVENT, &snapshot()).await;
	assert!(!result.success);
	assert_eq!(result.reason, Some(FailureReason::NoSeatsAvailable));
	assert_eq!(h.fake.count(Method::Post, "/seats"), 0);
}

#[tokio::test]
async fn event_slug_mentioning_seats_skips_the_seat_step() {
	const SEATTLE: &str = "https://webook.com/en/events/seattle-vs-portland-12";
	let h = Harness::new();
	h.fake.on_get(SEATTLE, 200, EVENT_PAGE);
	h.fake.on_post(&format!("{SEATTLE}/book"), 302, "").location("/en/events/seattle-vs-portland-12/checkout");
	h.fake.on_get(&format!("{SEATTLE}/checkout"), 200, CHECKOUT_PAGE);
	h.fake.on_post(SUBMIT, 200, CONFIRMED_PAGE);

	let target = target(serde_json::json!({ "name": "Seattle", "url": SEATTLE, "quantity": 2 }));
	let result = h.orchestrator().run("task-1", &target, SEATTLE, &snapshot()).await;
	assert!(result.success, "unexpected failure: {:?}", result.error);
	assert_eq!(result.order_id.as_deref(), Some("WB-77"));
	assert_eq!(h.fake.count(Method::Post, "/checkout/submit"), 1);
}

#[tokio::test]
async fn exhausted_server_errors_on_booking_are_selection_failures() {
	let h = Harness::new();
	h.fake.on_post(BOOK, 503, "Service Unavailable");

	let result = h.orchestrator().run("task-1", &derby(), EVENT, &snapshot()).await;
	assert!(!result.success);
	assert_eq!(result.reason, Some(FailureReason::SelectionFailed));
	assert!(result.error.as_deref().is_some_and(|e| e.contains("503")));
	assert_eq!(h.fake.count(Method::Post, "/book"), 3);
	assert_eq!(h.fake.count(Method::Post, "/checkout/submit"), 0);
}
