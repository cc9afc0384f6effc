use std::sync::Arc;
use std::time::Duration;

use seatwatch::protocol::{AvailabilityReason, MatchConfig, TaskState};
use seatwatch::retry::RetryPolicy;
use seatwatch::session::{Credentials, FakeTransport, Method};
use seatwatch::site::Site;
use seatwatch::{Pipeline, Scheduler, TickOutcome};

const LOGIN: &str = "https://webook.com/en/login";
const EVENT: &str = "https://webook.com/en/events/derby-12";
const BOOK: &str = "https://webook.com/en/events/derby-12/book";
const CHECKOUT: &str = "https://webook.com/en/events/derby-12/checkout";
const SUBMIT: &str = "https://webook.com/en/checkout/submit";

const LOGIN_PAGE: &str = r#"<form class="login-form" action="/en/login" method="post">
	<input type="email" name="email"><input type="password" name="password">
</form>"#;
const ON_SALE: &str = r#"<div class="ticket-category" data-id="7"><span class="name">Gold</span></div>"#;
const SOLD_OUT: &str = r#"<div class="sold-out">Sold Out</div>"#;
const CHECKOUT_PAGE: &str = r#"<form action="/en/checkout/submit" method="post"><input type="hidden" name="ref" value="r-1"></form>"#;

fn site_with_sale(confirmation: &str) -> FakeTransport {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	let fake = FakeTransport::new();
	fake.on_get(LOGIN, 200, LOGIN_PAGE);
	fake.on_post(LOGIN, 302, "").location("/en/account").cookie("session=s1");
	fake.on_get(EVENT, 200, ON_SALE);
	fake.on_post(BOOK, 302, "").location("/en/events/derby-12/checkout");
	fake.on_get(CHECKOUT, 200, CHECKOUT_PAGE);
	fake.on_post(SUBMIT, 200, confirmation);
	fake
}

fn scheduler(fake: &FakeTransport) -> Scheduler {
	let pipeline = Pipeline::new(Arc::new(fake.clone()), Arc::new(Site::default()))
		.with_credentials(Credentials::new("fan@example.com", "hunter2"))
		.with_retry(RetryPolicy::linear(3, Duration::from_millis(1)));
	Scheduler::new(pipeline, Duration::from_secs(3600))
}

fn derby() -> MatchConfig {
	serde_json::from_value(serde_json::json!({ "name": "Derby", "url": EVENT, "quantity": 1 })).unwrap()
}

/// Polls `condition` for up to two seconds.
async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
	for _ in 0..200 {
		if condition() {
			return true;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	condition()
}

/// On-demand tick, retried while the timer's own tick is still finishing.
async fn check_when_idle(scheduler: &Scheduler, id: &str) -> TickOutcome {
	loop {
		match scheduler.check_now(id).await {
			Some(TickOutcome::Skipped) => tokio::time::sleep(Duration::from_millis(5)).await,
			Some(outcome) => return outcome,
			None => panic!("task {id} is not running"),
		}
	}
}

#[tokio::test]
async fn confirmed_purchase_happens_at_most_once() {
	let fake = site_with_sale(r#"<div class="order-success">Payment successful</div><span data-order-id="A-1"></span>"#);
	let scheduler = scheduler(&fake);
	let id = scheduler.start(&derby(), Some(Duration::from_millis(20))).unwrap();

	assert!(eventually(|| !scheduler.status().completed.is_empty()).await);
	tokio::time::sleep(Duration::from_millis(150)).await;

	assert_eq!(fake.count(Method::Post, "/checkout/submit"), 1);
	assert_eq!(fake.count(Method::Post, "/book"), 1);

	let status = scheduler.status();
	assert!(status.tasks.is_empty());
	let done = &status.completed[0];
	assert_eq!(done.id, id);
	assert_eq!(done.state, TaskState::Purchased);
	assert_eq!(done.purchase_attempts, 1);
	let purchase = done.last_purchase.as_ref().unwrap();
	assert!(purchase.success);
	assert_eq!(purchase.order_id.as_deref(), Some("A-1"));

	assert!(scheduler.check_now(&id).await.is_none());
	assert!(!scheduler.stop(&id));
	scheduler.shutdown().await;
}

#[tokio::test]
async fn failed_purchases_keep_monitoring() {
	let fake = site_with_sale("<h1>Checkout</h1><p>Payment pending</p>");
	let scheduler = scheduler(&fake);
	let id = scheduler.start(&derby(), Some(Duration::from_millis(20))).unwrap();

	assert!(eventually(|| scheduler.status().tasks.first().is_some_and(|t| t.purchase_attempts >= 2)).await);
	let status = scheduler.status();
	assert!(status.completed.is_empty());
	let task = &status.tasks[0];
	assert_eq!(task.state, TaskState::Running);
	assert!(task.last_purchase.as_ref().is_some_and(|p| !p.success));

	assert!(scheduler.stop(&id));
	scheduler.shutdown().await;
	let submitted = fake.count(Method::Post, "/checkout/submit");
	tokio::time::sleep(Duration::from_millis(80)).await;
	assert_eq!(fake.count(Method::Post, "/checkout/submit"), submitted);
}

#[tokio::test]
async fn search_targets_resolve_and_fail_closed_until_found() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	let fake = FakeTransport::new();
	fake.on_get("https://webook.com/en/search?q=derby", 200, "<p>No events yet</p>");
	fake.on_get(
		"https://webook.com/en/search?q=derby",
		200,
		r#"<div class="event-card"><a href="/en/events/derby-12"><h3>Derby</h3></a></div>"#,
	);
	fake.on_get(EVENT, 200, SOLD_OUT);

	let scheduler = scheduler(&fake);
	let config: MatchConfig = serde_json::from_value(serde_json::json!({ "name": "Derby", "searchTerm": "derby" })).unwrap();
	let id = scheduler.start(&config, None).unwrap();

	assert!(eventually(|| scheduler.status().tasks.first().is_some_and(|t| t.last_snapshot.is_some())).await);
	let first = scheduler.status().tasks[0].clone();
	assert_eq!(first.url, None);
	assert_eq!(first.last_snapshot.as_ref().map(|s| s.reason), Some(AvailabilityReason::Unknown));

	let outcome = check_when_idle(&scheduler, &id).await;
	let TickOutcome::Checked(snapshot) = outcome else {
		panic!("expected a probe-only tick, got {outcome:?}");
	};
	assert_eq!(snapshot.reason, AvailabilityReason::SoldOut);

	let task = scheduler.status().tasks[0].clone();
	assert_eq!(task.url.as_deref(), Some(EVENT));
	assert_eq!(task.ticks, 2);
	assert_eq!(task.purchase_attempts, 0);

	check_when_idle(&scheduler, &id).await;
	assert_eq!(fake.count(Method::Get, "/en/search"), 2);
	scheduler.shutdown().await;
}

#[tokio::test]
async fn check_now_on_unknown_task_is_none() {
	let fake = FakeTransport::new();
	let scheduler = scheduler(&fake);
	assert!(scheduler.check_now("task-9").await.is_none());
}

#[tokio::test]
async fn timer_ticks_during_a_slow_check_are_dropped() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	let fake = FakeTransport::new();
	fake.on_get(EVENT, 200, SOLD_OUT);
	fake.on_get(EVENT, 200, SOLD_OUT).delay(Duration::from_millis(450));
	fake.on_get(EVENT, 200, SOLD_OUT);

	let scheduler = scheduler(&fake);
	let id = scheduler.start(&derby(), Some(Duration::from_millis(200))).unwrap();
	assert!(eventually(|| scheduler.status().tasks.first().is_some_and(|t| t.ticks == 1)).await);

	// Holds the tick lock across the timer's next two periods.
	let outcome = check_when_idle(&scheduler, &id).await;
	assert!(matches!(outcome, TickOutcome::Checked(_)), "got {outcome:?}");
	assert_eq!(scheduler.status().tasks[0].ticks, 2);

	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(scheduler.status().tasks[0].ticks, 2);
	assert_eq!(fake.count(Method::Get, "/en/events/derby-12"), 2);
	scheduler.shutdown().await;
}
