//! Thread-safe in-memory [`TokenCache`] for single-process sharing, local development, and tests.

// self
use crate::{
	_prelude::*,
	cache::{CacheFuture, TokenCache},
	clock::{Clock, SystemClock},
};

type EntryMap = Arc<RwLock<HashMap<String, Entry>>>;

#[derive(Clone, Debug)]
struct Entry {
	value: String,
	expires_at: Option<OffsetDateTime>,
}
impl Entry {
	fn is_live_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_none_or(|deadline| now < deadline)
	}
}

/// Process-local cache whose clones share entries.
///
/// Entries expire according to the configured [`Clock`]; a non-positive TTL stores the entry
/// without expiry.
#[derive(Clone)]
pub struct MemoryCache {
	entries: EntryMap,
	clock: Arc<dyn Clock>,
}
impl MemoryCache {
	/// Creates an empty cache driven by the wall clock.
	pub fn new() -> Self {
		Self::with_clock(Arc::new(SystemClock))
	}

	/// Creates an empty cache that evaluates TTLs against `clock`.
	pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
		Self { entries: Default::default(), clock }
	}

	/// Number of live entries.
	pub fn len(&self) -> usize {
		let now = self.clock.now();

		self.entries.read().values().filter(|entry| entry.is_live_at(now)).count()
	}

	/// Returns `true` when no live entry remains.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Drops `key`, returning whether it was present.
	pub fn remove(&self, key: &str) -> bool {
		self.entries.write().remove(key).is_some()
	}

	fn get_now(&self, key: &str) -> Option<String> {
		let now = self.clock.now();
		let mut guard = self.entries.write();

		match guard.get(key) {
			Some(entry) if entry.is_live_at(now) => Some(entry.value.clone()),
			Some(_) => {
				guard.remove(key);

				None
			},
			None => None,
		}
	}

	fn set_now(&self, key: &str, value: String, ttl: Duration) {
		let expires_at =
			if ttl.is_positive() { self.clock.now().checked_add(ttl) } else { None };

		self.entries.write().insert(key.to_owned(), Entry { value, expires_at });
	}
}
impl Default for MemoryCache {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for MemoryCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryCache").field("entries", &self.entries.read().len()).finish()
	}
}
impl TokenCache for MemoryCache {
	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>> {
		Box::pin(async move { Ok(self.get_now(key)) })
	}

	fn set<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			self.set_now(key, value, ttl);

			Ok(())
		})
	}
}
