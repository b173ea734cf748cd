use std::sync::Arc;

/// One value stored under a key, plus its TTL metadata.
///
/// `cache`, the Hit/Stale/Miss provenance tag, is not stored here: it is a per-read attribute computed by
/// [`CacheManager::get`][crate::CacheManager::get] against the current time, not a property of the stored entry
/// itself.
#[derive(Clone)]
pub struct Entry<V> {
	pub(crate) value: Arc<V>,
	/// Milliseconds of validity from `created_ms`. `<= 0` means immediately stale.
	pub(crate) ttl_ms: i64,
	pub(crate) created_ms: u64
}

impl<V> Entry<V> {
	pub(crate) fn new(value: Arc<V>, ttl_ms: i64, created_ms: u64) -> Self {
		Self { value, ttl_ms, created_ms }
	}

	pub(crate) fn classify(&self, now_ms: u64) -> bool {
		// Returns true if fresh.
		let age = now_ms.saturating_sub(self.created_ms) as i64;
		self.ttl_ms > 0 && age < self.ttl_ms
	}

	/// Forces this entry stale by zeroing its TTL. Used by [`CacheManager::expire`][crate::CacheManager::expire].
	pub(crate) fn force_stale(&mut self) {
		self.ttl_ms = 0;
	}

	pub fn value(&self) -> &Arc<V> {
		&self.value
	}

	pub fn ttl_ms(&self) -> i64 {
		self.ttl_ms
	}

	pub fn created_ms(&self) -> u64 {
		self.created_ms
	}
}

/// The classification of a key's store state relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
	/// An entry exists and its TTL has not elapsed.
	Fresh,
	/// An entry exists but its TTL has elapsed.
	Stale,
	/// No entry exists for the key.
	Missing
}
