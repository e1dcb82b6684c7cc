// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for pipeline recoveries.
#[derive(Debug, Default)]
pub struct ClientMetrics {
	renewal_attempts: AtomicU64,
	renewal_successes: AtomicU64,
	renewal_failures: AtomicU64,
	rate_limit_retries: AtomicU64,
	sessions_expired: AtomicU64,
}
impl ClientMetrics {
	/// Returns the number of renewal calls issued.
	pub fn renewal_attempts(&self) -> u64 {
		self.renewal_attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of renewal calls that produced a new access token.
	pub fn renewal_successes(&self) -> u64 {
		self.renewal_successes.load(Ordering::Relaxed)
	}

	/// Returns the number of renewal calls that failed.
	pub fn renewal_failures(&self) -> u64 {
		self.renewal_failures.load(Ordering::Relaxed)
	}

	/// Returns the number of backoff retries performed after `429` responses.
	pub fn rate_limit_retries(&self) -> u64 {
		self.rate_limit_retries.load(Ordering::Relaxed)
	}

	/// Returns the number of times stored credentials were cleared by the pipeline.
	pub fn sessions_expired(&self) -> u64 {
		self.sessions_expired.load(Ordering::Relaxed)
	}

	pub(crate) fn record_renewal_attempt(&self) {
		self.renewal_attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_renewal_success(&self) {
		self.renewal_successes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_renewal_failure(&self) {
		self.renewal_failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rate_limit_retry(&self) {
		self.rate_limit_retries.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_session_expired(&self) {
		self.sessions_expired.fetch_add(1, Ordering::Relaxed);
	}
}
