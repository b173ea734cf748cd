//! An in-memory stale-while-revalidate cache with single-flight coalescing and failure backoff.
//!
//! A [`CacheManager`] wraps a bounded, TTL'd key-value store. A [`CacheManager::get`] call classifies its key as
//! fresh, stale, or missing, and, if a `worker` future is supplied, coalesces concurrent calls for the same key
//! into a single worker invocation, falling back to stale data (or a cooldown) when the worker fails or times out.
//!
//! ```
//! use swr_cache::{CacheManager, CacheOptions, GetOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cache: CacheManager<String, std::convert::Infallible> = CacheManager::new(CacheOptions::default());
//!
//! let outcome = cache
//!     .get("greeting", GetOptions::default(), Some(|| async { Ok("hello".to_string()) }))
//!     .await?
//!     .expect("a worker was supplied");
//! assert_eq!(*outcome.value, "hello");
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod error;
pub mod log;
mod options;
pub mod runtime;
mod store;
mod waiting;
mod worker;

use std::{
	future::Future,
	panic::AssertUnwindSafe,
	sync::{Arc, atomic::Ordering},
	time::Duration
};

use futures_util::{
	FutureExt,
	future::{Either, select}
};
use parking_lot::Mutex;
use tokio::sync::watch;

pub use self::{
	error::CacheError,
	options::{CacheOptions, DEFAULT_DELTA_WAIT_MS, DEFAULT_TTL_MS, DEFAULT_WORKER_TIMEOUT_MS, GetOptions}
};
use self::{
	clock::{Clock, SystemClock},
	log::Log,
	options::Defaults,
	runtime::{DefaultRuntime, Runtime, RuntimeDefault},
	store::{Classification, Entry, Store},
	waiting::WaitingRegistry,
	worker::{WorkerHandle, WorkerOutcome, WorkerRegistry}
};

/// Where a resolved value came from, relative to this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
	/// Served directly from a fresh cache entry; no worker ran.
	Hit,
	/// Served from a worker this call originated or attached to, which completed successfully.
	Miss,
	/// Served from a stale entry while a worker failed, timed out, or is still revalidating in the background.
	Stale
}

/// The resolved value of a [`CacheManager::get`] call that did not error.
#[derive(Debug, Clone)]
pub struct Outcome<V> {
	/// The resolved value.
	pub value: Arc<V>,
	/// Where the value came from.
	pub cache: CacheStatus,
	/// When the underlying entry was created, on the cache's clock.
	pub created_ms: u64,
	/// The TTL, in milliseconds, stamped on the underlying entry.
	pub ttl_ms: i64
}

impl<V> Outcome<V> {
	fn from_entry(entry: Entry<V>, cache: CacheStatus) -> Self {
		Self { value: entry.value().clone(), cache, created_ms: entry.created_ms(), ttl_ms: entry.ttl_ms() }
	}
}

struct Shared<V, E> {
	store: Store<V>,
	waiting: WaitingRegistry,
	workers: WorkerRegistry<V, E>
}

struct Inner<V, E, R, C> {
	shared: Mutex<Shared<V, E>>,
	runtime: R,
	clock: C,
	defaults: Defaults
}

/// The cache itself: a bounded store plus the single-flight/backoff machinery around it.
///
/// Cheap to clone (an [`Arc`] internally), so it can be shared across tasks the same way a [`runtime::Runtime`]'s
/// spawned tasks expect.
pub struct CacheManager<V, E, R: Runtime = DefaultRuntime, C: Clock = SystemClock> {
	inner: Arc<Inner<V, E, R, C>>
}

impl<V, E, R: Runtime, C: Clock> Clone for CacheManager<V, E, R, C> {
	fn clone(&self) -> Self {
		Self { inner: Arc::clone(&self.inner) }
	}
}

impl<V, E, R: Runtime> CacheManager<V, E, R>
where
	R: RuntimeDefault
{
	/// Creates a cache using the default runtime for whichever single runtime Cargo feature is enabled.
	///
	/// See [`RuntimeDefault`][runtime::RuntimeDefault] if this fails to resolve: either enable exactly one of the
	/// `tokio`/`smol` features, or use [`CacheManager::new_in`] with an explicit runtime.
	pub fn new(options: CacheOptions<V>) -> Self {
		Self::new_in(options, R::default())
	}
}

impl<V, E, R: Runtime> CacheManager<V, E, R> {
	/// Creates a cache backed by the given runtime, using [`clock::SystemClock`] as its time source.
	pub fn new_in(options: CacheOptions<V>, runtime: R) -> Self {
		Self::with_clock(options, runtime, SystemClock::new())
	}
}

impl<V, E, R: Runtime, C: Clock> CacheManager<V, E, R, C> {
	/// Creates a cache backed by the given runtime and [`Clock`].
	///
	/// Exposed primarily for tests that need a [`clock::ManualClock`] to drive TTL/cooldown expiry deterministically.
	pub fn with_clock(options: CacheOptions<V>, runtime: R, clock: C) -> Self {
		let defaults = Defaults::from(&options);
		let now = clock.now_ms();
		let mut store = Store::new(options.max_length);
		for (key, value) in options.initial {
			store.set(key, Entry::new(Arc::new(value), defaults.ttl_ms, now));
		}
		Self {
			inner: Arc::new(Inner { shared: Mutex::new(Shared { store, waiting: WaitingRegistry::default(), workers: WorkerRegistry::default() }), runtime, clock, defaults })
		}
	}

	fn log(&self) -> &dyn Log {
		self.inner.defaults.log.as_deref().unwrap_or(&log::NoopLog)
	}
}

impl<V, E, R, C> CacheManager<V, E, R, C>
where
	V: Clone + Send + Sync + 'static,
	E: std::error::Error + Send + Sync + 'static,
	R: Runtime,
	C: Clock
{
	/// Reads `key`, optionally dispatching or attaching to `worker` to revalidate it.
	///
	/// Returns `Ok(None)` if the key is not fresh, no `worker` was supplied, and (for a missing key) no cooldown or
	/// in-flight worker applies: there is nothing to serve and nothing to revalidate with.
	pub async fn get<W, Fut>(&self, key: &str, options: GetOptions, worker: Option<W>) -> Result<Option<Outcome<V>>, CacheError<E>>
	where
		W: FnOnce() -> Fut + Send + 'static,
		Fut: Future<Output = Result<V, E>> + Send + 'static
	{
		enum Plan<V, E> {
			Return(Result<Option<Outcome<V>>, CacheError<E>>),
			Attach { classification: Classification, stale_entry: Option<Entry<V>>, handle: Arc<WorkerHandle<V, E>> },
			Originate { classification: Classification, stale_entry: Option<Entry<V>>, handle: Arc<WorkerHandle<V, E>> }
		}

		let now = self.inner.clock.now_ms();

		let plan = {
			let mut shared = self.inner.shared.lock();
			let classification = shared.store.classify(key, now);

			if classification == Classification::Fresh {
				let entry = shared.store.get(key).expect("classified Fresh implies an entry is present");
				Plan::Return(Ok(Some(Outcome::from_entry(entry, CacheStatus::Hit))))
			} else if worker.is_none() {
				Plan::Return(Ok(None))
			} else if shared.waiting.is_live(key, now) {
				match classification {
					Classification::Stale => {
						let entry = shared.store.get(key).expect("classified Stale implies an entry is present");
						Plan::Return(Ok(Some(Outcome::from_entry(entry, CacheStatus::Stale))))
					}
					Classification::Missing => Plan::Return(Err(CacheError::ColdCooldown { key: key.to_string() })),
					Classification::Fresh => unreachable!("handled above")
				}
			} else {
				let stale_entry = match classification {
					Classification::Stale => shared.store.get(key),
					_ => None
				};
				if let Some(handle) = shared.workers.get(key) {
					Plan::Attach { classification, stale_entry, handle }
				} else {
					let (handle, _rx) = shared.workers.insert(key.to_string());
					Plan::Originate { classification, stale_entry, handle }
				}
			}
		};

		match plan {
			Plan::Return(result) => result,
			Plan::Attach { classification, stale_entry, handle } => {
				let rx = handle.subscribe();
				let outcome = Self::await_attached(rx).await;
				self.resolve(key, classification, stale_entry, outcome, CacheStatus::Hit)
			}
			Plan::Originate { classification, stale_entry, handle } => {
				let worker = worker.expect("Originate is only produced when worker.is_some()");
				let worker_timeout_ms = options.worker_timeout_ms(&self.inner.defaults);
				let delta_wait_ms = options.delta_wait_ms(&self.inner.defaults);
				let ttl_ms = options.ttl_ms(&self.inner.defaults);

				let rx = handle.subscribe();
				self.spawn_worker(key, Arc::clone(&handle), worker, ttl_ms, delta_wait_ms);
				let outcome = self.await_originated(key, &handle, rx, worker_timeout_ms, delta_wait_ms).await;
				self.resolve(key, classification, stale_entry, outcome, CacheStatus::Miss)
			}
		}
	}

	/// Spawns the detached task that runs `worker` to completion and finalizes store/registry state, regardless of
	/// whether anyone is still waiting on it by the time it settles.
	fn spawn_worker<W, Fut>(&self, key: &str, handle: Arc<WorkerHandle<V, E>>, worker: W, ttl_ms: i64, delta_wait_ms: u64)
	where
		W: FnOnce() -> Fut + Send + 'static,
		Fut: Future<Output = Result<V, E>> + Send + 'static
	{
		let inner = Arc::clone(&self.inner);
		let key = key.to_string();
		self.inner.runtime.spawn(async move {
			let result = AssertUnwindSafe(async move { worker().await }).catch_unwind().await;

			if handle.settled.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
				// The originator's timeout already finalized this invocation; this result arrived too late to matter.
				return;
			}

			let now = inner.clock.now_ms();
			let outcome = {
				let mut shared = inner.shared.lock();
				match result {
					Ok(Ok(value)) => {
						let entry = Entry::new(Arc::new(value), ttl_ms, now);
						shared.store.set(key.clone(), entry.clone());
						shared.waiting.clear(&key);
						shared.workers.remove_if_current(&key, &handle);
						WorkerOutcome::Success(entry)
					}
					Ok(Err(source)) => {
						shared.waiting.arm(&key, now, delta_wait_ms);
						shared.workers.remove_if_current(&key, &handle);
						WorkerOutcome::Failure(Some(Arc::new(source)))
					}
					Err(_panic) => {
						shared.waiting.arm(&key, now, delta_wait_ms);
						shared.workers.remove_if_current(&key, &handle);
						WorkerOutcome::Failure(None)
					}
				}
			};

			let log = inner.defaults.log.as_deref().unwrap_or(&log::NoopLog);
			match &outcome {
				WorkerOutcome::Failure(Some(source)) => {
					log.warn(&format!("worker for key `{key}` rejected: {source}"));
					#[cfg(feature = "tracing")]
					tracing::warn!(key = %key, error = %source, "worker rejected");
				}
				WorkerOutcome::Failure(None) => {
					log.warn(&format!("worker for key `{key}` panicked"));
					#[cfg(feature = "tracing")]
					tracing::warn!(key = %key, "worker panicked");
				}
				WorkerOutcome::Success(_) | WorkerOutcome::Timeout => {}
			}

			handle.publish(outcome);
		});
	}

	/// Waits, with no timeout of its own, for the originator's invocation to settle.
	///
	/// `rx` may already be subscribed to a handle that settled before this call attached to it, so the current
	/// value is checked before ever awaiting a change.
	async fn await_attached(mut rx: watch::Receiver<Option<WorkerOutcome<V, E>>>) -> WorkerOutcome<V, E> {
		if let Some(outcome) = rx.borrow().clone() {
			return outcome;
		}
		loop {
			if rx.changed().await.is_err() {
				return WorkerOutcome::Failure(None);
			}
			if let Some(outcome) = rx.borrow().clone() {
				return outcome;
			}
		}
	}

	/// Waits for the invocation this call originated, racing the worker's natural completion against
	/// `worker_timeout_ms`. If the timeout wins, this call finalizes the cooldown/registry state itself.
	async fn await_originated(&self, key: &str, handle: &Arc<WorkerHandle<V, E>>, mut rx: watch::Receiver<Option<WorkerOutcome<V, E>>>, worker_timeout_ms: u64, delta_wait_ms: u64) -> WorkerOutcome<V, E> {
		let changed = rx.changed();
		let timer = self.inner.runtime.wait(Duration::from_millis(worker_timeout_ms));
		futures_util::pin_mut!(changed);
		futures_util::pin_mut!(timer);

		match select(changed, timer).await {
			Either::Left((Ok(()), _)) => rx.borrow().clone().expect("watch channel only ever publishes Some"),
			Either::Left((Err(_), _)) => WorkerOutcome::Failure(None),
			Either::Right((_, changed)) => {
				if handle.settled.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok() {
					let now = self.inner.clock.now_ms();
					{
						let mut shared = self.inner.shared.lock();
						shared.workers.remove_if_current(key, handle);
						shared.waiting.arm(key, now, delta_wait_ms);
					}
					self.log().warn(&format!("worker for key `{key}` timed out"));
					#[cfg(feature = "tracing")]
					tracing::warn!(key, "worker timed out");
					handle.publish(WorkerOutcome::Timeout);
					WorkerOutcome::Timeout
				} else {
					// Lost the settlement race: the worker finished essentially simultaneously. Wait for its
					// publication instead of fabricating a second, conflicting outcome.
					let _ = changed.await;
					rx.borrow().clone().expect("settled handle publishes before releasing the settlement race")
				}
			}
		}
	}

	fn resolve(&self, key: &str, classification: Classification, stale_entry: Option<Entry<V>>, outcome: WorkerOutcome<V, E>, success_status: CacheStatus) -> Result<Option<Outcome<V>>, CacheError<E>> {
		match outcome {
			WorkerOutcome::Success(entry) => Ok(Some(Outcome::from_entry(entry, success_status))),
			WorkerOutcome::Failure(source) => match classification {
				Classification::Stale => Ok(Some(Outcome::from_entry(stale_entry.expect("Stale classification always carries its entry"), CacheStatus::Stale))),
				Classification::Missing => Err(CacheError::ColdRejection { key: key.to_string(), source }),
				Classification::Fresh => unreachable!("Fresh never dispatches or attaches to a worker")
			},
			WorkerOutcome::Timeout => match classification {
				Classification::Stale => Ok(Some(Outcome::from_entry(stale_entry.expect("Stale classification always carries its entry"), CacheStatus::Stale))),
				Classification::Missing => Err(CacheError::ColdTimeout { key: key.to_string() }),
				Classification::Fresh => unreachable!("Fresh never dispatches or attaches to a worker")
			}
		}
	}

	/// Writes `value` directly into the store under `key`, bypassing the worker machinery entirely.
	pub fn set(&self, key: &str, value: V, options: GetOptions) {
		let now = self.inner.clock.now_ms();
		let ttl_ms = options.ttl_ms(&self.inner.defaults);
		let mut shared = self.inner.shared.lock();
		shared.store.set(key.to_string(), Entry::new(Arc::new(value), ttl_ms, now));
	}

	/// Returns `true` if an entry exists for `key`, fresh or stale.
	pub fn has(&self, key: &str) -> bool {
		self.inner.shared.lock().store.has(key)
	}

	/// Removes `key`'s entry, if any.
	pub fn del(&self, key: &str) {
		self.inner.shared.lock().store.del(key);
	}

	/// Clears every entry from the store.
	///
	/// Any worker invocation currently in flight, and any armed cooldown, is left untouched: only the store is
	/// cleared.
	pub fn clear(&self) {
		self.inner.shared.lock().store.clear();
	}

	/// Forces every key matched by any of `patterns` stale, without removing it.
	///
	/// Each pattern is either a literal key or a trailing-`*` glob (`house/*` matches `house/1`).
	pub fn expire(&self, patterns: &[&str]) {
		self.inner.shared.lock().store.expire(patterns);
	}

	/// Returns the store's current keys, most-recently-used first.
	pub fn keys(&self) -> Vec<String> {
		self.inner.shared.lock().store.keys()
	}

	#[cfg(test)]
	pub(crate) fn waiting_record(&self, key: &str) -> Option<waiting::WaitingRecord> {
		self.inner.shared.lock().waiting.get(key)
	}
}

/// Creates a cache for the default runtime. See [`CacheManager::new`].
pub fn new<V, E, R: Runtime + RuntimeDefault>(options: CacheOptions<V>) -> CacheManager<V, E, R> {
	CacheManager::new(options)
}

/// Creates a cache for an explicit runtime. See [`CacheManager::new_in`].
pub fn new_in<V, E, R: Runtime>(options: CacheOptions<V>, runtime: R) -> CacheManager<V, E, R> {
	CacheManager::new_in(options, runtime)
}

#[cfg(test)]
mod tests;
