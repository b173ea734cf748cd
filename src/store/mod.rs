//! The bounded LRU+TTL store backing [`CacheManager`][crate::CacheManager].

mod entry;

use std::num::NonZeroUsize;

pub use self::entry::{Classification, Entry};
use lru::LruCache;

/// A bounded, string-keyed LRU store with per-entry TTLs.
///
/// Eviction is delegated to the [`lru`] crate rather than reimplemented; the exact eviction data structure is an
/// implementation detail, not something this crate needs to invent.
pub(crate) struct Store<V> {
	cache: LruCache<String, Entry<V>>
}

impl<V> Store<V> {
	pub(crate) fn new(max_length: Option<NonZeroUsize>) -> Self {
		Self {
			cache: match max_length {
				Some(cap) => LruCache::new(cap),
				None => LruCache::unbounded()
			}
		}
	}

	/// Looks up `key` without disturbing its recency; TTL evaluation is the caller's responsibility.
	pub(crate) fn get(&self, key: &str) -> Option<Entry<V>>
	where
		V: Clone
	{
		self.cache.peek(key).cloned()
	}

	pub(crate) fn classify(&self, key: &str, now_ms: u64) -> Classification
	where
		V: Clone
	{
		match self.get(key) {
			None => Classification::Missing,
			Some(entry) if entry.classify(now_ms) => Classification::Fresh,
			Some(_) => Classification::Stale
		}
	}

	/// Inserts or replaces `key`'s entry, evicting the least-recently-used entry if this exceeds capacity.
	pub(crate) fn set(&mut self, key: String, entry: Entry<V>) {
		self.cache.put(key, entry);
	}

	pub(crate) fn has(&self, key: &str) -> bool {
		self.cache.contains(key)
	}

	pub(crate) fn del(&mut self, key: &str) {
		self.cache.pop(key);
	}

	pub(crate) fn clear(&mut self) {
		self.cache.clear();
	}

	/// Forces every key matched by any of `patterns` stale by zeroing its TTL, leaving the entry in place.
	///
	/// Each pattern is either a literal key or a trailing-`*` glob matching any suffix (`house/*` matches
	/// `house/1`).
	pub(crate) fn expire(&mut self, patterns: &[&str]) {
		let matched: Vec<String> = self.cache.iter().map(|(k, _)| k.clone()).filter(|key| patterns.iter().any(|p| matches(p, key))).collect();
		for key in matched {
			if let Some(entry) = self.cache.peek_mut(&key) {
				entry.force_stale();
			}
		}
	}

	/// Returns current keys, most-recently-used first.
	pub(crate) fn keys(&self) -> Vec<String> {
		self.cache.iter().map(|(k, _)| k.clone()).collect()
	}

	#[cfg(test)]
	pub(crate) fn len(&self) -> usize {
		self.cache.len()
	}
}

fn matches(pattern: &str, key: &str) -> bool {
	match pattern.strip_suffix('*') {
		Some(prefix) => key.starts_with(prefix),
		None => pattern == key
	}
}
