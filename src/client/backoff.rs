//! Rate-limit backoff with bounded exponential delays.

// self
use crate::{
	_prelude::*,
	config::BackoffConfig,
	obs::{self, Outcome, Stage},
};

/// Per-request retry bookkeeping threaded through backoff and session renewal.
///
/// A fresh value is created for every logical request and dropped when it settles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryState {
	/// Backoff retries performed so far.
	pub attempts: u32,
	/// Whether the request already went through renewal and replay.
	pub refresh_attempted: bool,
}

/// Computes and applies `2^attempt * base` delays for `429` responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffController {
	max_retries: u32,
	base_delay: Duration,
}
impl BackoffController {
	/// Creates a controller from configuration.
	pub fn new(config: BackoffConfig) -> Self {
		Self { max_retries: config.max_retries, base_delay: config.base_delay() }
	}

	/// Retry budget per logical request.
	pub fn max_retries(&self) -> u32 {
		self.max_retries
	}

	/// Delay applied before retry number `attempt` (1-based).
	pub fn delay_for(&self, attempt: u32) -> Duration {
		self.base_delay.saturating_mul(2_u32.checked_pow(attempt).unwrap_or(u32::MAX))
	}

	/// Consumes one retry from `state`, returning the delay, or `None` once exhausted.
	pub fn next_delay(&self, state: &mut RetryState) -> Option<Duration> {
		if state.attempts >= self.max_retries {
			return None;
		}

		state.attempts += 1;

		Some(self.delay_for(state.attempts))
	}

	/// Sleeps for the next delay; returns false without sleeping once the budget is spent.
	pub(crate) async fn wait(&self, state: &mut RetryState) -> bool {
		let Some(delay) = self.next_delay(state) else {
			obs::record_stage(Stage::Backoff, Outcome::Failure);

			return false;
		};

		obs::record_stage(Stage::Backoff, Outcome::Attempt);
		obs::backing_off(state.attempts, delay);
		tokio::time::sleep(delay).await;

		true
	}
}
