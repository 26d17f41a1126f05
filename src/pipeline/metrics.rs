// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for pipeline activity.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
	requests: AtomicU64,
	cache_hits: AtomicU64,
	refreshes: AtomicU64,
	refresh_failures: AtomicU64,
	coalesced_refreshes: AtomicU64,
	replayed_refresh_failures: AtomicU64,
}
impl PipelineMetrics {
	/// Returns the number of `execute` calls.
	pub fn requests(&self) -> u64 {
		self.requests.load(Ordering::Relaxed)
	}

	/// Returns the number of calls answered from the response cache.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh exchanges sent to the token endpoint.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh exchanges (or owner callbacks) that failed.
	pub fn refresh_failures(&self) -> u64 {
		self.refresh_failures.load(Ordering::Relaxed)
	}

	/// Returns the number of refreshes skipped because another caller already renewed the token.
	pub fn coalesced_refreshes(&self) -> u64 {
		self.coalesced_refreshes.load(Ordering::Relaxed)
	}

	/// Returns the number of callers that reused another caller's failed refresh.
	pub fn replayed_refresh_failures(&self) -> u64 {
		self.replayed_refresh_failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_request(&self) {
		self.requests.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh_failure(&self) {
		self.refresh_failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_coalesced_refresh(&self) {
		self.coalesced_refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_replayed_refresh_failure(&self) {
		self.replayed_refresh_failures.fetch_add(1, Ordering::Relaxed);
	}
}
