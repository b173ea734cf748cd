use std::{
	convert::Infallible,
	fmt,
	num::NonZeroUsize,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering}
	},
	time::Duration
};

use tokio::{task::yield_now, time::advance};

use crate::{
	CacheError, CacheManager, CacheOptions, CacheStatus, GetOptions,
	clock::ManualClock,
	runtime::Tokio
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Place {
	ns: &'static str
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rejected;

impl fmt::Display for Rejected {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "rejected")
	}
}

impl std::error::Error for Rejected {}

type TestCache<V = Place, E = Infallible> = CacheManager<V, E, Tokio, ManualClock>;

fn fresh_place_cache(clock: &ManualClock) -> TestCache {
	CacheManager::with_clock(
		CacheOptions { initial: [("hei/verden".to_string(), Place { ns: "v" })].into_iter().collect(), ..Default::default() },
		Tokio,
		clock.clone()
	)
}

/// Seeds `hei/verden` and advances past its TTL so it reads as stale.
fn stale_place_cache(clock: &ManualClock) -> TestCache {
	let cache = fresh_place_cache(clock);
	clock.advance(crate::DEFAULT_TTL_MS as u64 + 1);
	cache
}

/// Advances both the injected [`ManualClock`] and tokio's paused virtual clock in lockstep, so TTL/cooldown
/// classification (driven by `Clock`) and `worker_timeout` races (driven by `tokio::time::sleep`) agree.
async fn tick(clock: &ManualClock, ms: u64) {
	clock.advance(ms);
	advance(Duration::from_millis(ms)).await;
}

fn never() -> impl std::future::Future<Output = Result<Place, Infallible>> {
	async {
		std::future::pending::<()>().await;
		unreachable!()
	}
}

#[tokio::test(start_paused = true)]
async fn hot_hit_never_calls_worker() {
	let clock = ManualClock::new();
	let cache = fresh_place_cache(&clock);

	let calls = Arc::new(AtomicUsize::new(0));
	let spy_calls = Arc::clone(&calls);
	let outcome = cache
		.get("hei/verden", GetOptions::default(), Some(move || {
			spy_calls.fetch_add(1, Ordering::SeqCst);
			async { Ok::<_, Infallible>(Place { ns: "v" }) }
		}))
		.await
		.unwrap()
		.unwrap();

	assert_eq!(outcome.value.as_ref(), &Place { ns: "v" });
	assert_eq!(outcome.cache, CacheStatus::Hit);
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn cold_miss_invokes_worker_once() {
	let clock = ManualClock::new();
	let cache: TestCache<i32> = CacheManager::with_clock(CacheOptions::default(), Tokio, clock.clone());

	let calls = Arc::new(AtomicUsize::new(0));
	let spy_calls = Arc::clone(&calls);
	let handle = tokio::spawn({
		let cache = cache.clone();
		async move {
			cache
				.get("N/A", GetOptions::default(), Some(move || {
					spy_calls.fetch_add(1, Ordering::SeqCst);
					async {
						tokio::time::sleep(Duration::from_millis(10)).await;
						Ok::<_, Infallible>(42)
					}
				}))
				.await
		}
	});

	yield_now().await;
	tick(&clock, 10).await;
	let outcome = handle.await.unwrap().unwrap().unwrap();

	assert_eq!(*outcome.value, 42);
	assert_eq!(outcome.cache, CacheStatus::Miss);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn single_flight_coalesces_concurrent_callers() {
	let clock = ManualClock::new();
	let cache = stale_place_cache(&clock);

	let calls = Arc::new(AtomicUsize::new(0));
	let make_worker = |calls: Arc<AtomicUsize>| {
		move || {
			calls.fetch_add(1, Ordering::SeqCst);
			async move {
				tokio::time::sleep(Duration::from_millis(10)).await;
				Ok::<_, Infallible>(Place { ns: "T" })
			}
		}
	};

	let first = tokio::spawn({
		let cache = cache.clone();
		let worker = make_worker(Arc::clone(&calls));
		async move { cache.get("hei/verden", GetOptions::default(), Some(worker)).await }
	});
	yield_now().await;
	let second = tokio::spawn({
		let cache = cache.clone();
		let worker = make_worker(Arc::clone(&calls));
		async move { cache.get("hei/verden", GetOptions::default(), Some(worker)).await }
	});
	yield_now().await;

	tick(&clock, 10).await;

	let first = first.await.unwrap().unwrap().unwrap();
	let second = second.await.unwrap().unwrap().unwrap();

	assert_eq!(*first.value, Place { ns: "T" });
	assert_eq!(first.cache, CacheStatus::Miss);
	assert_eq!(*second.value, Place { ns: "T" });
	assert_eq!(second.cache, CacheStatus::Hit);
	assert_eq!(calls.load(Ordering::SeqCst), 1, "only the originator invokes the worker");
}

#[tokio::test(start_paused = true)]
async fn timeout_on_stale_falls_back_and_arms_cooldown() {
	let clock = ManualClock::new();
	let cache = stale_place_cache(&clock);

	let options = GetOptions { worker_timeout_ms: Some(0), ..Default::default() };
	let outcome = cache.get("hei/verden", options, Some(never)).await.unwrap().unwrap();

	assert_eq!(*outcome.value, Place { ns: "v" });
	assert_eq!(outcome.cache, CacheStatus::Stale);
	assert!(cache.waiting_record("hei/verden").is_some_and(|record| record.wait_ms > 0));
}

#[tokio::test(start_paused = true)]
async fn cooldown_then_retry() {
	let clock = ManualClock::new();
	let cache = stale_place_cache(&clock);
	let slow_options = GetOptions { worker_timeout_ms: Some(10), delta_wait_ms: Some(10), ..Default::default() };

	let first = tokio::spawn({
		let cache = cache.clone();
		async move { cache.get("hei/verden", slow_options, Some(never)).await }
	});
	yield_now().await;
	tick(&clock, 10).await;
	let first = first.await.unwrap().unwrap().unwrap();
	assert_eq!(first.cache, CacheStatus::Stale);

	let fast_calls = Arc::new(AtomicUsize::new(0));
	let spy_calls = Arc::clone(&fast_calls);
	let second = cache
		.get("hei/verden", slow_options, Some(move || {
			spy_calls.fetch_add(1, Ordering::SeqCst);
			async { Ok::<_, Infallible>(Place { ns: "fast" }) }
		}))
		.await
		.unwrap()
		.unwrap();
	assert_eq!(*second.value, Place { ns: "v" });
	assert_eq!(second.cache, CacheStatus::Stale);
	assert_eq!(fast_calls.load(Ordering::SeqCst), 0, "a live cooldown must suppress the fast worker entirely");

	tick(&clock, 10).await;

	let third = cache
		.get("hei/verden", slow_options, Some(move || {
			fast_calls.fetch_add(1, Ordering::SeqCst);
			async { Ok::<_, Infallible>(Place { ns: "fast" }) }
		}))
		.await
		.unwrap()
		.unwrap();
	assert_eq!(*third.value, Place { ns: "fast" });
	assert_eq!(third.cache, CacheStatus::Miss);
}

#[tokio::test(start_paused = true)]
async fn cooldown_on_cold_rejection_then_retry() {
	let clock = ManualClock::new();
	let cache: TestCache<i32, Rejected> = CacheManager::with_clock(CacheOptions { delta_wait_ms: 10, ..Default::default() }, Tokio, clock.clone());

	let calls = Arc::new(AtomicUsize::new(0));
	let make_worker = |calls: Arc<AtomicUsize>| {
		move || {
			calls.fetch_add(1, Ordering::SeqCst);
			async { Err::<i32, _>(Rejected) }
		}
	};

	let first = cache.get("N/A", GetOptions::default(), Some(make_worker(Arc::clone(&calls)))).await;
	assert!(matches!(first, Err(CacheError::ColdRejection { .. })));
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	let armed_at_first = cache.waiting_record("N/A").unwrap().started_ms;

	let second = cache.get("N/A", GetOptions::default(), Some(make_worker(Arc::clone(&calls)))).await;
	assert!(matches!(second, Err(CacheError::ColdCooldown { .. })));
	assert_eq!(calls.load(Ordering::SeqCst), 1);

	tick(&clock, 10).await;

	let third = cache.get("N/A", GetOptions::default(), Some(make_worker(Arc::clone(&calls)))).await;
	assert!(matches!(third, Err(CacheError::ColdRejection { .. })));
	assert_eq!(calls.load(Ordering::SeqCst), 2);
	let armed_at_third = cache.waiting_record("N/A").unwrap().started_ms;
	assert_ne!(armed_at_first, armed_at_third, "a fresh cooldown must be armed on each failure");
}

#[tokio::test(start_paused = true)]
async fn lru_fifo_on_seed() {
	let clock = ManualClock::new();
	let cache: TestCache<&'static str> = CacheManager::with_clock(
		CacheOptions {
			initial: [("a".to_string(), "A"), ("b".to_string(), "B"), ("c".to_string(), "C")].into_iter().collect(),
			max_length: NonZeroUsize::new(2),
			..Default::default()
		},
		Tokio,
		clock.clone()
	);

	assert!(!cache.has("a"));
	assert!(cache.has("b"));
	assert!(cache.has("c"));
	assert_eq!(cache.keys(), vec!["c".to_string(), "b".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn expire_glob_matches_prefix_only() {
	let clock = ManualClock::new();
	let cache: TestCache<&'static str> = CacheManager::with_clock(
		CacheOptions {
			initial: [("house/1".to_string(), "1"), ("house/2".to_string(), "2"), ("guest/2".to_string(), "guest")].into_iter().collect(),
			..Default::default()
		},
		Tokio,
		clock.clone()
	);

	cache.expire(&["house/*"]);

	let calls = Arc::new(AtomicUsize::new(0));
	for key in ["house/1", "house/2"] {
		let spy_calls = Arc::clone(&calls);
		let outcome = cache
			.get(key, GetOptions::default(), Some(move || {
				spy_calls.fetch_add(1, Ordering::SeqCst);
				async { Ok::<_, Infallible>("revalidated") }
			}))
			.await
			.unwrap()
			.unwrap();
		assert_eq!(outcome.cache, CacheStatus::Stale);
	}
	assert_eq!(calls.load(Ordering::SeqCst), 0, "expire only flips TTL; it never invokes a worker itself");

	let no_worker: Option<fn() -> std::future::Ready<Result<&'static str, Infallible>>> = None;
	let guest = cache.get("guest/2", GetOptions::default(), no_worker).await.unwrap().unwrap();
	assert_eq!(guest.cache, CacheStatus::Hit);
}

#[tokio::test(start_paused = true)]
async fn idempotent_expire() {
	let clock = ManualClock::new();
	let cache: TestCache<&'static str> = CacheManager::with_clock(CacheOptions { initial: [("house/1".to_string(), "1")].into_iter().collect(), ..Default::default() }, Tokio, clock.clone());

	cache.expire(&["house/*"]);
	let keys_once = cache.keys();
	cache.expire(&["house/*"]);
	let keys_twice = cache.keys();
	assert_eq!(keys_once, keys_twice);
}

#[tokio::test(start_paused = true)]
async fn seeding_deep_copies_the_initial_value() {
	let clock = ManualClock::new();
	let mut original = Place { ns: "v" };
	let cache: TestCache = CacheManager::with_clock(CacheOptions { initial: [("k".to_string(), original.clone())].into_iter().collect(), ..Default::default() }, Tokio, clock.clone());
	original.ns = "mutated-after-seed";

	let no_worker: Option<fn() -> std::future::Ready<Result<Place, Infallible>>> = None;
	let outcome = cache.get("k", GetOptions::default(), no_worker).await.unwrap().unwrap();
	assert_eq!(*outcome.value, Place { ns: "v" });
}
