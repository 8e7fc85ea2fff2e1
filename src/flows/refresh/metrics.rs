// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for [`TokenBroker::refresh_access_token`](crate::flows::TokenBroker::refresh_access_token).
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
}
impl RefreshMetrics {
	/// Refresh calls made.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Calls that returned a token, including fresh stored ones.
	pub fn successes(&self) -> u64 {
		self.successes.load(Ordering::Relaxed)
	}

	/// Calls that returned an error.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.successes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
