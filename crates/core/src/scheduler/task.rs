use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use parking_lot::Mutex;
use seatwatch_protocol::{AvailabilitySnapshot, ConfigUpdate, FailureReason, PurchaseResult, TaskState, TaskStatus};
use tracing::{error, info, warn};

use crate::checkout::CheckoutOrchestrator;
use crate::clock::now_ms;
use crate::error::Result;
use crate::finder::EventFinder;
use crate::pipeline::Pipeline;
use crate::probe::Prober;
use crate::target::{EventTarget, TargetMatch};

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
	/// Another tick was in flight.
	Skipped,
	/// The match was already bought; nothing ran.
	AlreadyPurchased,
	/// Probed; no purchase was attempted.
	Checked(AvailabilitySnapshot),
	/// A checkout ran to a terminal result.
	Attempted(PurchaseResult),
}

impl TickOutcome {
	pub fn is_purchase(&self) -> bool {
		matches!(self, TickOutcome::Attempted(result) if result.success)
	}
}

#[derive(Debug, Default)]
struct TaskStats {
	ticks: u64,
	purchase_attempts: u64,
	last_checked_at: Option<u64>,
	last_snapshot: Option<AvailabilitySnapshot>,
	last_purchase: Option<PurchaseResult>,
}

/// One monitored match with its own session, prober and orchestrator.
pub(crate) struct MonitorTask {
	pub(crate) id: String,
	pub(crate) interval: Duration,
	target: Mutex<TargetMatch>,
	purchased: AtomicBool,
	tick_lock: tokio::sync::Mutex<()>,
	stats: Mutex<TaskStats>,
	prober: Prober,
	orchestrator: CheckoutOrchestrator,
	finder: EventFinder,
}

impl MonitorTask {
	pub(crate) fn new(id: String, target: TargetMatch, interval: Duration, pipeline: &Pipeline) -> Self {
		let client = pipeline.session();
		Self {
			id,
			interval,
			target: Mutex::new(target),
			purchased: AtomicBool::new(false),
			tick_lock: tokio::sync::Mutex::new(()),
			stats: Mutex::new(TaskStats::default()),
			prober: pipeline.prober(client.clone()),
			orchestrator: pipeline.orchestrator(client.clone()),
			finder: pipeline.finder(client),
		}
	}

	pub(crate) fn is_purchased(&self) -> bool {
		self.purchased.load(Ordering::SeqCst)
	}

	/// Runs one tick unless another is in flight.
	pub(crate) async fn try_tick(&self) -> TickOutcome {
		match self.tick_lock.try_lock() {
			Ok(_guard) => self.tick_exclusive().await,
			Err(_) => {
				info!(target = "seatwatch.scheduler", task_id = %self.id, "tick already in flight; skipping");
				TickOutcome::Skipped
			}
		}
	}

	/// Caller holds `tick_lock`. The purchased flag is only written here, so
	/// checking it under the lock orders every tick after a recorded success.
	async fn tick_exclusive(&self) -> TickOutcome {
		if self.is_purchased() {
			return TickOutcome::AlreadyPurchased;
		}

		match AssertUnwindSafe(self.run_tick()).catch_unwind().await {
			Ok(outcome) => outcome,
			Err(panic) => {
				let message = panic
					.downcast_ref::<&str>()
					.map(|s| s.to_string())
					.or_else(|| panic.downcast_ref::<String>().cloned())
					.unwrap_or_else(|| "tick panicked".to_string());
				error!(target = "seatwatch.scheduler", task_id = %self.id, error = %message, "tick panicked");
				let result = PurchaseResult::failed(FailureReason::Unexpected, message, now_ms());
				self.stats.lock().last_purchase = Some(result.clone());
				TickOutcome::Attempted(result)
			}
		}
	}

	async fn run_tick(&self) -> TickOutcome {
		let target = self.target.lock().clone();
		self.stats.lock().ticks += 1;

		let snapshot;
		let event_url = match self.event_url(&target).await {
			Some(url) => {
				snapshot = self.prober.probe(&url).await;
				Some(url)
			}
			None => {
				snapshot = AvailabilitySnapshot::unknown(now_ms());
				None
			}
		};
		{
			let mut stats = self.stats.lock();
			stats.last_checked_at = Some(snapshot.checked_at);
			stats.last_snapshot = Some(snapshot.clone());
		}

		let Some(event_url) = event_url.filter(|_| snapshot.available) else {
			return TickOutcome::Checked(snapshot);
		};

		self.stats.lock().purchase_attempts += 1;
		let result = self.orchestrator.run(&self.id, &target, &event_url, &snapshot).await;
		if result.success {
			self.purchased.store(true, Ordering::SeqCst);
		} else {
			warn!(
				target = "seatwatch.scheduler",
				task_id = %self.id,
				reason = ?result.reason,
				"purchase attempt failed; monitoring continues"
			);
		}
		self.stats.lock().last_purchase = Some(result.clone());
		TickOutcome::Attempted(result)
	}

	/// Event URL for this tick. A search target is resolved and pinned; a
	/// failed search leaves the tick fail-closed.
	async fn event_url(&self, target: &TargetMatch) -> Option<String> {
		let term = match &target.target {
			EventTarget::Url(url) => return Some(url.clone()),
			EventTarget::Search(term) => term,
		};
		match self.finder.resolve(term).await {
			Ok(url) => {
				info!(target = "seatwatch.scheduler", task_id = %self.id, term = %term, url = %url, "resolved event from search");
				let mut current = self.target.lock();
				if current.target == target.target {
					*current = current.with_resolved_url(url.as_str());
				}
				Some(url)
			}
			Err(e) => {
				warn!(target = "seatwatch.scheduler", task_id = %self.id, term = %term, error = %e, "search did not resolve an event");
				None
			}
		}
	}

	/// Replaces the match descriptor; takes effect on the next tick.
	pub(crate) fn update(&self, update: &ConfigUpdate) -> Result<()> {
		let mut target = self.target.lock();
		*target = target.with_update(update)?;
		Ok(())
	}

	pub(crate) fn status(&self, state: TaskState) -> TaskStatus {
		let target = self.target.lock();
		let stats = self.stats.lock();
		TaskStatus {
			id: self.id.clone(),
			name: target.name.clone(),
			state,
			url: target.url().map(str::to_string),
			quantity: target.quantity,
			interval_secs: self.interval.as_secs(),
			ticks: stats.ticks,
			purchase_attempts: stats.purchase_attempts,
			last_checked_at: stats.last_checked_at,
			last_snapshot: stats.last_snapshot.clone(),
			last_purchase: stats.last_purchase.clone(),
		}
	}
}
