//! Thread-safe in-memory [`ResponseCache`] with per-entry expiry.

// self
use crate::{
	_prelude::*,
	cache::{CacheError, CacheFuture, CacheKey, ResponseCache},
};

type EntryMap = Arc<RwLock<HashMap<CacheKey, CacheEntry>>>;

/// Cached response body plus its expiry instant.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
	/// Decoded response body.
	pub value: Value,
	/// Instant after which the entry is treated as absent.
	pub expires_at: OffsetDateTime,
}
impl CacheEntry {
	/// Returns `true` while the entry is live at `instant`.
	pub fn is_live_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}
}

/// Process-local cache for demos, tests, and single-node deployments.
///
/// Expired entries are evicted lazily on lookup or in bulk via
/// [`purge_expired`](Self::purge_expired).
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(EntryMap);
impl MemoryCache {
	/// Returns `true` if a live entry exists for `key` at `instant`.
	pub fn contains_at(&self, key: &CacheKey, instant: OffsetDateTime) -> bool {
		self.0.read().get(key).is_some_and(|entry| entry.is_live_at(instant))
	}

	/// Number of stored entries, including expired ones not yet evicted.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no entries are stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Drops every entry that expired at or before `instant`, returning the count removed.
	pub fn purge_expired(&self, instant: OffsetDateTime) -> usize {
		let mut guard = self.0.write();
		let before = guard.len();

		guard.retain(|_, entry| entry.is_live_at(instant));

		before - guard.len()
	}

	fn get_now(map: &EntryMap, key: &CacheKey, instant: OffsetDateTime) -> Option<Value> {
		{
			let guard = map.read();

			match guard.get(key) {
				Some(entry) if entry.is_live_at(instant) => return Some(entry.value.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		map.write().remove(key);

		None
	}

	fn set_now(
		map: &EntryMap,
		key: CacheKey,
		value: Value,
		ttl: Duration,
		instant: OffsetDateTime,
	) -> Result<(), CacheError> {
		if ttl.is_negative() {
			return Err(CacheError::Backend { message: format!("Negative TTL {ttl} rejected") });
		}

		map.write().insert(key, CacheEntry { value, expires_at: instant.saturating_add(ttl) });

		Ok(())
	}
}
impl ResponseCache for MemoryCache {
	fn has<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, bool> {
		let live = self.contains_at(key, OffsetDateTime::now_utc());

		Box::pin(async move { Ok(live) })
	}

	fn get<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<Value>> {
		let value = Self::get_now(&self.0, key, OffsetDateTime::now_utc());

		Box::pin(async move { Ok(value) })
	}

	fn set<'a>(&'a self, key: &'a CacheKey, value: Value, ttl: Duration) -> CacheFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Self::set_now(&map, key, value, ttl, OffsetDateTime::now_utc()) })
	}
}
