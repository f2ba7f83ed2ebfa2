// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing where a token source's tokens came from.
#[derive(Debug, Default)]
pub struct TokenSourceStats {
	memory_hits: AtomicU64,
	cache_hits: AtomicU64,
	fetches: AtomicU64,
	fetch_failures: AtomicU64,
}
impl TokenSourceStats {
	/// Calls answered from the in-memory token.
	pub fn memory_hits(&self) -> u64 {
		self.memory_hits.load(Ordering::Relaxed)
	}

	/// Calls answered from the external cache.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Successful token endpoint exchanges.
	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::Relaxed)
	}

	/// Failed token endpoint exchanges.
	pub fn fetch_failures(&self) -> u64 {
		self.fetch_failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_memory_hit(&self) {
		self.memory_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_fetch(&self) {
		self.fetches.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_fetch_failure(&self) {
		self.fetch_failures.fetch_add(1, Ordering::Relaxed);
	}
}
