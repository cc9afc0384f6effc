//! Monitoring Scheduler.
//!
//! One timer loop per task. Ticks never overlap: missed timer ticks are
//! skipped, and a timer or on-demand tick that fires while another is in
//! flight is dropped rather than queued. After a confirmed purchase the task
//! is flagged before its tick lock is released, moved to `completed` and
//! never ticks again.

mod task;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use seatwatch_protocol::{ConfigUpdate, MatchConfig, StatusReport, TaskState, TaskStatus};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub use task::TickOutcome;

use crate::clock::now_ms;
use crate::error::{Result, SeatwatchError};
use crate::pipeline::Pipeline;
use crate::target::TargetMatch;
use task::MonitorTask;

struct Entry {
	task: Arc<MonitorTask>,
	stop: watch::Sender<bool>,
	handle: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
	next_id: u64,
	active: Vec<Entry>,
	/// Stopped tasks whose loop may still be finishing a tick.
	draining: Vec<(Arc<MonitorTask>, JoinHandle<()>)>,
	completed: Vec<TaskStatus>,
}

impl Registry {
	fn take(&mut self, id: &str) -> Option<Entry> {
		let index = self.active.iter().position(|e| e.task.id == id)?;
		Some(self.active.remove(index))
	}

	fn find(&self, id: &str) -> Option<Arc<MonitorTask>> {
		self.active.iter().find(|e| e.task.id == id).map(|e| Arc::clone(&e.task))
	}
}

pub struct Scheduler {
	pipeline: Pipeline,
	default_interval: Duration,
	started_at: u64,
	registry: Arc<Mutex<Registry>>,
}

impl Scheduler {
	pub fn new(pipeline: Pipeline, default_interval: Duration) -> Self {
		Self {
			pipeline,
			default_interval,
			started_at: now_ms(),
			registry: Arc::new(Mutex::new(Registry::default())),
		}
	}

	pub fn pipeline(&self) -> &Pipeline {
		&self.pipeline
	}

	/// Registers a task and starts its timer. The first tick fires immediately.
	///
	/// Interval precedence: `interval`, then the match's own `intervalSecs`,
	/// then the scheduler default.
	pub fn start(&self, config: &MatchConfig, interval: Option<Duration>) -> Result<String> {
		let target = TargetMatch::from_config(config)?;
		let interval = interval
			.or(config.interval_secs.map(Duration::from_secs))
			.unwrap_or(self.default_interval);
		if interval.is_zero() {
			return Err(SeatwatchError::Config(format!("match {:?} has a zero poll interval", config.name)));
		}

		let mut registry = self.registry.lock();
		registry.next_id += 1;
		let id = format!("task-{}", registry.next_id);
		let task = Arc::new(MonitorTask::new(id.clone(), target, interval, &self.pipeline));
		let (stop, stop_rx) = watch::channel(false);
		let handle = tokio::spawn(run_loop(Arc::clone(&task), Arc::clone(&self.registry), stop_rx));
		registry.active.push(Entry { task, stop, handle });

		info!(target = "seatwatch.scheduler", task_id = %id, match_name = %config.name, interval_secs = interval.as_secs(), "monitoring started");
		Ok(id)
	}

	/// Halts the timer and removes the task. A tick already in flight runs to
	/// completion. Unknown or already-stopped ids report `false`.
	pub fn stop(&self, id: &str) -> bool {
		let mut registry = self.registry.lock();
		let Some(entry) = registry.take(id) else {
			debug!(target = "seatwatch.scheduler", task_id = id, "stop for unknown task");
			return false;
		};
		let _ = entry.stop.send(true);
		registry.draining.retain(|(_, handle)| !handle.is_finished());
		registry.draining.push((entry.task, entry.handle));
		info!(target = "seatwatch.scheduler", task_id = id, "monitoring stopped");
		true
	}

	/// Applies a configuration change to a running task; the next tick uses it.
	/// Returns `false` for an unknown task.
	pub fn update_config(&self, id: &str, update: &ConfigUpdate) -> Result<bool> {
		let Some(task) = self.registry.lock().find(id) else {
			return Ok(false);
		};
		task.update(update)?;
		info!(target = "seatwatch.scheduler", task_id = id, ?update, "task configuration updated");
		Ok(true)
	}

	/// Runs one tick now, unless a tick is already in flight. `None` for an
	/// unknown task.
	pub async fn check_now(&self, id: &str) -> Option<TickOutcome> {
		let task = self.registry.lock().find(id)?;
		let outcome = task.try_tick().await;
		if outcome.is_purchase() {
			complete(&self.registry, &task);
		}
		Some(outcome)
	}

	pub fn status(&self) -> StatusReport {
		let registry = self.registry.lock();
		let mut tasks: Vec<TaskStatus> = registry.active.iter().map(|e| e.task.status(TaskState::Running)).collect();
		tasks.extend(
			registry
				.draining
				.iter()
				.filter(|(_, handle)| !handle.is_finished())
				.map(|(task, _)| task.status(TaskState::Stopped)),
		);
		let now = now_ms();
		StatusReport {
			started_at: self.started_at,
			uptime_secs: now.saturating_sub(self.started_at) / 1000,
			tasks,
			completed: registry.completed.clone(),
		}
	}

	/// Stops every task and waits for their loops, so in-flight ticks reach a
	/// terminal state.
	pub async fn shutdown(&self) {
		let handles: Vec<JoinHandle<()>> = {
			let mut registry = self.registry.lock();
			let mut handles: Vec<JoinHandle<()>> = registry.draining.drain(..).map(|(_, handle)| handle).collect();
			for entry in registry.active.drain(..) {
				let _ = entry.stop.send(true);
				handles.push(entry.handle);
			}
			handles
		};
		info!(target = "seatwatch.scheduler", tasks = handles.len(), "shutting down");
		for handle in handles {
			if let Err(e) = handle.await {
				warn!(target = "seatwatch.scheduler", error = %e, "task loop ended abnormally");
			}
		}
	}
}

/// Records a confirmed purchase and retires the task.
fn complete(registry: &Mutex<Registry>, task: &MonitorTask) {
	let mut registry = registry.lock();
	if let Some(entry) = registry.take(&task.id) {
		let _ = entry.stop.send(true);
	}
	if !registry.completed.iter().any(|s| s.id == task.id) {
		registry.completed.push(task.status(TaskState::Purchased));
		info!(target = "seatwatch.scheduler", task_id = %task.id, "purchase recorded; task retired");
	}
}

async fn run_loop(task: Arc<MonitorTask>, registry: Arc<Mutex<Registry>>, mut stop: watch::Receiver<bool>) {
	let mut ticker = tokio::time::interval(task.interval);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

	loop {
		tokio::select! {
			biased;
			_ = stop.changed() => break,
			_ = ticker.tick() => {}
		}
		let stopped = *stop.borrow();
		if stopped || task.is_purchased() {
			break;
		}

		// A timer tick that lands on an in-flight check is dropped, not queued.
		let outcome = task.try_tick().await;
		if outcome.is_purchase() || task.is_purchased() {
			complete(&registry, &task);
			break;
		}
	}
	debug!(target = "seatwatch.scheduler", task_id = %task.id, "task loop exited");
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::session::FakeTransport;
	use crate::site::Site;

	fn scheduler() -> Scheduler {
		let pipeline = Pipeline::new(Arc::new(FakeTransport::new()), Arc::new(Site::default()));
		Scheduler::new(pipeline, Duration::from_secs(3600))
	}

	fn config(name: &str) -> MatchConfig {
		serde_json::from_value(serde_json::json!({ "name": name, "url": "https://webook.com/en/events/derby-12" })).unwrap()
	}

	#[tokio::test]
	async fn stop_reports_true_then_false() {
		let scheduler = scheduler();
		let id = scheduler.start(&config("Derby"), None).unwrap();
		assert!(scheduler.stop(&id));
		assert!(!scheduler.stop(&id));
		assert!(!scheduler.stop("task-404"));
		scheduler.shutdown().await;
	}

	#[tokio::test]
	async fn rejects_invalid_matches() {
		let scheduler = scheduler();
		let missing: MatchConfig = serde_json::from_value(serde_json::json!({ "name": "Nothing" })).unwrap();
		assert!(matches!(scheduler.start(&missing, None), Err(SeatwatchError::Config(_))));
		assert!(matches!(scheduler.start(&config("Derby"), Some(Duration::ZERO)), Err(SeatwatchError::Config(_))));
	}

	#[tokio::test]
	async fn update_applies_to_running_tasks_only() {
		let scheduler = scheduler();
		let id = scheduler.start(&config("Derby"), None).unwrap();
		let update = ConfigUpdate {
			quantity: Some(4),
			..Default::default()
		};
		assert!(scheduler.update_config(&id, &update).unwrap());
		assert!(!scheduler.update_config("task-404", &update).unwrap());

		let status = scheduler.status();
		assert_eq!(status.tasks.len(), 1);
		assert_eq!(status.tasks[0].quantity, 4);
		assert_eq!(status.tasks[0].state, TaskState::Running);

		let zero = ConfigUpdate {
			quantity: Some(0),
			..Default::default()
		};
		assert!(scheduler.update_config(&id, &zero).is_err());
		scheduler.shutdown().await;
		assert!(scheduler.status().tasks.is_empty());
	}
}
