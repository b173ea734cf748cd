//! Provides the [`Clock`] trait, the cache's monotonic time source.
//!
//! Every classification and cooldown decision in [`CacheManager`][crate::CacheManager] is taken against a single
//! `now` read from the configured `Clock`, so tests can swap in a [`ManualClock`] and drive time deterministically
//! instead of racing real wall-clock milliseconds.

use std::{
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering}
	},
	time::Instant
};

/// A monotonic millisecond time source.
///
/// Implementations must never go backwards within the lifetime of a single `Clock` instance; the cache relies on
/// `now - entry.created_ms` never underflowing in a way that would misclassify an entry.
pub trait Clock: Clone + Send + Sync + 'static {
	/// Returns the current time, in milliseconds, on this clock's monotonic timeline.
	fn now_ms(&self) -> u64;
}

/// The default [`Clock`], backed by [`std::time::Instant`].
#[derive(Clone)]
pub struct SystemClock {
	base: Instant
}

impl SystemClock {
	/// Creates a new [`SystemClock`] whose epoch is the instant of construction.
	pub fn new() -> Self {
		Self { base: Instant::now() }
	}
}

impl Default for SystemClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for SystemClock {
	fn now_ms(&self) -> u64 {
		self.base.elapsed().as_millis() as u64
	}
}

/// A [`Clock`] whose time is set manually, for deterministic tests.
///
/// ```
/// use swr_cache::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// assert_eq!(clock.now_ms(), 0);
/// clock.advance(150);
/// assert_eq!(clock.now_ms(), 150);
/// ```
#[derive(Clone, Default)]
pub struct ManualClock {
	millis: Arc<AtomicU64>
}

impl ManualClock {
	/// Creates a new [`ManualClock`] starting at `0`.
	pub fn new() -> Self {
		Self::default()
	}

	/// Advances the clock forward by `millis` milliseconds.
	pub fn advance(&self, millis: u64) {
		self.millis.fetch_add(millis, Ordering::AcqRel);
	}

	/// Sets the clock to an absolute millisecond value.
	pub fn set(&self, millis: u64) {
		self.millis.store(millis, Ordering::Release);
	}
}

impl Clock for ManualClock {
	fn now_ms(&self) -> u64 {
		self.millis.load(Ordering::Acquire)
	}
}
