//! Thread-safe TTL cache shared by the token validators and the data aggregator.
//!
//! Entries carry an absolute expiry instant. Reads never extend it, and an expired entry is a miss
//! even before the sweeper removes it. Concurrent writers to one key simply replace each other.

// crates.io
use time::PrimitiveDateTime;
// self
use crate::{_prelude::*, sweep::Sweep};

/// Cached value stamped with the instant it stops being served.
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
	/// Cached payload.
	pub value: V,
	/// Absolute expiry instant; lookups at or after it miss.
	pub expires_at: OffsetDateTime,
}
impl<V> CacheEntry<V> {
	/// Returns `true` if the entry is expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}

/// Pure TTL key/value store (no LRU promotion, no per-key locking).
///
/// Owners that share the cache with a [`SweepHandle`](crate::sweep::SweepHandle) keep it behind an
/// [`Arc`].
#[derive(Debug)]
pub struct TtlCache<V>(RwLock<HashMap<String, CacheEntry<V>>>);
impl<V> TtlCache<V>
where
	V: Clone,
{
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self(Default::default())
	}

	/// Stores `value` under `key` for `ttl`, measured from now.
	pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
		self.set_at(key, value, ttl, OffsetDateTime::now_utc());
	}

	/// Stores `value` under `key` for `ttl`, measured from `now`.
	///
	/// Non-positive TTLs are ignored so an already-expired entry never lands in the map. An expiry
	/// past the representable range saturates at the latest instant `time` supports.
	pub fn set_at(&self, key: impl Into<String>, value: V, ttl: Duration, now: OffsetDateTime) {
		if !ttl.is_positive() {
			return;
		}

		let expires_at = now.checked_add(ttl).unwrap_or(PrimitiveDateTime::MAX.assume_utc());

		self.0.write().insert(key.into(), CacheEntry { value, expires_at });
	}

	/// Returns the cached value if present and unexpired.
	pub fn get(&self, key: &str) -> Option<V> {
		self.get_at(key, OffsetDateTime::now_utc())
	}

	/// Returns the cached value if present and unexpired at `now`.
	pub fn get_at(&self, key: &str, now: OffsetDateTime) -> Option<V> {
		self.0
			.read()
			.get(key)
			.filter(|entry| !entry.is_expired_at(now))
			.map(|entry| entry.value.clone())
	}

	/// Removes `key`, returning whether an entry existed.
	pub fn remove(&self, key: &str) -> bool {
		self.0.write().remove(key).is_some()
	}

	/// Number of stored entries, including expired ones the sweeper has not reached yet.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` if nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl<V> Default for TtlCache<V>
where
	V: Clone,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<V> Sweep for TtlCache<V>
where
	V: 'static + Clone + Send + Sync,
{
	const LABEL: &'static str = "ttl_cache";

	fn sweep_at(&self, now: OffsetDateTime) -> usize {
		let mut guard = self.0.write();
		let before = guard.len();

		guard.retain(|_, entry| !entry.is_expired_at(now));

		before - guard.len()
	}
}
