use std::{num::NonZeroUsize, sync::Arc};

use crate::log::Log;

/// Default `workerTimeout`, in milliseconds, used when neither a per-call nor per-instance value is set.
pub const DEFAULT_WORKER_TIMEOUT_MS: u64 = 5_000;
/// Default `deltaWait`, in milliseconds, used when neither a per-call nor per-instance value is set.
pub const DEFAULT_DELTA_WAIT_MS: u64 = 10_000;
/// Default entry TTL, in milliseconds, used when neither a per-call nor per-instance `ttl` is set.
pub const DEFAULT_TTL_MS: i64 = 60_000;

/// Construction-time options for [`CacheManager::new`][crate::CacheManager::new]/
/// [`CacheManager::new_in`][crate::CacheManager::new_in].
pub struct CacheOptions<V> {
	/// Keys to preload at construction, in order. A `Vec` (rather than a map) so that eviction order on an
	/// over-capacity seed is deterministic: the caller's mutation of a value after pushing it here cannot affect
	/// the cached value, since construction takes ownership of each value rather than borrowing it.
	pub initial: Vec<(String, V)>,
	/// LRU capacity. `None` means unbounded.
	pub max_length: Option<NonZeroUsize>,
	/// Diagnostic sink; see [`Log`].
	pub log: Option<Arc<dyn Log>>,
	/// Default TTL, in milliseconds, stamped on entries produced by a successful worker or by
	/// [`CacheManager::set`][crate::CacheManager::set], unless overridden per call.
	pub ttl_ms: i64,
	/// Default worker timeout, in milliseconds, unless overridden per call.
	pub worker_timeout_ms: u64,
	/// Default cooldown length, in milliseconds, unless overridden per call.
	pub delta_wait_ms: u64
}

impl<V> Default for CacheOptions<V> {
	fn default() -> Self {
		Self {
			initial: Vec::new(),
			max_length: None,
			log: None,
			ttl_ms: DEFAULT_TTL_MS,
			worker_timeout_ms: DEFAULT_WORKER_TIMEOUT_MS,
			delta_wait_ms: DEFAULT_DELTA_WAIT_MS
		}
	}
}

/// Per-call options for [`CacheManager::get`][crate::CacheManager::get]/[`CacheManager::set`][crate::CacheManager::set].
///
/// Any field left `None` falls back to the instance's [`CacheOptions`] default.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetOptions {
	/// Overrides the instance's `worker_timeout_ms` for this call.
	pub worker_timeout_ms: Option<u64>,
	/// Overrides the instance's `delta_wait_ms` for this call.
	pub delta_wait_ms: Option<u64>,
	/// Overrides the instance's `ttl_ms` for this call.
	pub ttl_ms: Option<i64>
}

impl GetOptions {
	pub(crate) fn worker_timeout_ms(&self, defaults: &Defaults) -> u64 {
		self.worker_timeout_ms.unwrap_or(defaults.worker_timeout_ms)
	}

	pub(crate) fn delta_wait_ms(&self, defaults: &Defaults) -> u64 {
		self.delta_wait_ms.unwrap_or(defaults.delta_wait_ms)
	}

	pub(crate) fn ttl_ms(&self, defaults: &Defaults) -> i64 {
		self.ttl_ms.unwrap_or(defaults.ttl_ms)
	}
}

/// The subset of [`CacheOptions`] that persists for the lifetime of the cache (everything but the one-shot
/// `initial` seed and `max_length`, which are consumed at construction).
pub(crate) struct Defaults {
	pub(crate) log: Option<Arc<dyn Log>>,
	pub(crate) ttl_ms: i64,
	pub(crate) worker_timeout_ms: u64,
	pub(crate) delta_wait_ms: u64
}

impl<V> From<&CacheOptions<V>> for Defaults {
	fn from(options: &CacheOptions<V>) -> Self {
		Self {
			log: options.log.clone(),
			ttl_ms: options.ttl_ms,
			worker_timeout_ms: options.worker_timeout_ms,
			delta_wait_ms: options.delta_wait_ms
		}
	}
}
