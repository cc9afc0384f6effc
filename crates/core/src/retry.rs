//! Bounded retry with backoff for network-bound transitions.
//!
//! One policy type is shared by the session client and every checkout
//! transition: attempt limit, a backoff function and a retryable-error
//! predicate. Business failures (sold out, rejected selection) are never
//! retried because [`SeatwatchError::is_transient`] is false for them.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Result, SeatwatchError};

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
	/// `attempt × step`, so 1s, 2s, 3s for a one-second step.
	Linear { step: Duration },
	None,
}

impl Backoff {
	/// Delay after the given failed attempt (1-based).
	pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
		match *self {
			Backoff::Linear { step } => step.saturating_mul(attempt),
			Backoff::None => Duration::ZERO,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub backoff: Backoff,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			backoff: Backoff::Linear {
				step: Duration::from_secs(1),
			},
		}
	}
}

impl RetryPolicy {
	pub const fn linear(max_attempts: u32, step: Duration) -> Self {
		Self {
			max_attempts,
			backoff: Backoff::Linear { step },
		}
	}

	/// Single attempt, no delay. Useful for tests and one-shot commands.
	pub const fn once() -> Self {
		Self {
			max_attempts: 1,
			backoff: Backoff::None,
		}
	}

	/// Runs `operation`, retrying transient failures.
	pub async fn run<T, F, Fut>(&self, label: &str, operation: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		self.run_when(label, SeatwatchError::is_transient, operation).await
	}

	/// Runs `operation`, retrying failures accepted by `retryable`.
	pub async fn run_when<T, F, Fut, P>(&self, label: &str, retryable: P, mut operation: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
		P: Fn(&SeatwatchError) -> bool,
	{
		let max_attempts = self.max_attempts.max(1);
		let mut attempt = 1;

		loop {
			match operation().await {
				Ok(value) => {
					if attempt > 1 {
						debug!(target = "seatwatch.retry", label, attempt, "succeeded after retry");
					}
					return Ok(value);
				}
				Err(err) if attempt < max_attempts && retryable(&err) => {
					let delay = self.backoff.delay_for_attempt(attempt);
					warn!(
						target = "seatwatch.retry",
						label,
						attempt,
						max_attempts,
						delay_ms = delay.as_millis() as u64,
						error = %err,
						"retrying after failure"
					);
					sleep(delay).await;
					attempt += 1;
				}
				Err(err) => return Err(err),
			}
		}
	}
}
