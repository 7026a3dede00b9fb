//! Concurrent access to the compilation cache.

use reinhardt_compile_cache::{CompilationCache, Fingerprint};
use reinhardt_lang_core::{Error, ErrorKind, Position};
use rstest::rstest;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

fn fingerprint(source: &str) -> Fingerprint {
	Fingerprint::new("template", "autoescape=true", source)
}

/// Poll until `condition` holds, giving up after a few seconds.
async fn eventually(condition: impl Fn() -> bool) {
	for _ in 0..500 {
		if condition() {
			return;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	panic!("condition not reached in time");
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_compile_once() {
	let cache: Arc<CompilationCache<String>> = Arc::new(CompilationCache::new());
	let compiles = Arc::new(AtomicUsize::new(0));
	let key = fingerprint("Hello {{ name }}");

	let handles: Vec<_> = (0..16)
		.map(|_| {
			let cache = Arc::clone(&cache);
			let compiles = Arc::clone(&compiles);
			let key = key.clone();
			tokio::spawn(async move {
				cache
					.get_or_compile(&key, || {
						compiles.fetch_add(1, Ordering::SeqCst);
						std::thread::sleep(Duration::from_millis(50));
						Ok("compiled".to_string())
					})
					.await
			})
		})
		.collect();

	let mut artifacts = Vec::new();
	for handle in handles {
		artifacts.push(handle.await.unwrap().unwrap());
	}

	assert_eq!(compiles.load(Ordering::SeqCst), 1);
	assert!(artifacts.iter().all(|artifact| Arc::ptr_eq(artifact, &artifacts[0])));
	let stats = cache.statistics();
	assert_eq!(stats.misses, 1);
	assert_eq!(stats.hits + stats.coalesced, 15);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failure_reaches_every_waiter() {
	let cache: Arc<CompilationCache<String>> = Arc::new(CompilationCache::new());
	let key = fingerprint("{% if %}");
	let (release, released) = mpsc::channel::<()>();
	let failure = Error::Syntax {
		position: Position::START,
		expected: vec!["expression".to_string()],
		found: "%}".to_string(),
	};

	let leader = {
		let cache = Arc::clone(&cache);
		let key = key.clone();
		let failure = failure.clone();
		tokio::spawn(async move {
			cache
				.get_or_compile(&key, move || {
					let _ = released.recv();
					Err(failure)
				})
				.await
		})
	};
	eventually(|| cache.statistics().misses == 1).await;

	let waiter = {
		let cache = Arc::clone(&cache);
		let key = key.clone();
		tokio::spawn(async move {
			cache
				.get_or_compile(&key, || Ok("never".to_string()))
				.await
		})
	};
	eventually(|| cache.statistics().coalesced == 1).await;
	release.send(()).unwrap();

	assert_eq!(leader.await.unwrap().unwrap_err(), failure);
	assert_eq!(waiter.await.unwrap().unwrap_err(), failure);
	assert!(!cache.contains(&key));

	let retried = cache
		.get_or_compile(&key, || Ok("fixed".to_string()))
		.await
		.unwrap();
	assert_eq!(retried.as_str(), "fixed");
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_compile_releases_waiters() {
	let cache: Arc<CompilationCache<String>> = Arc::new(CompilationCache::new());
	let key = fingerprint("{{ boom }}");
	let (release, released) = mpsc::channel::<()>();

	let leader = {
		let cache = Arc::clone(&cache);
		let key = key.clone();
		tokio::spawn(async move {
			cache
				.get_or_compile(&key, move || -> reinhardt_lang_core::Result<String> {
					let _ = released.recv();
					panic!("compiler bug");
				})
				.await
		})
	};
	eventually(|| cache.statistics().misses == 1).await;

	let waiter = {
		let cache = Arc::clone(&cache);
		let key = key.clone();
		tokio::spawn(async move {
			cache
				.get_or_compile(&key, || Ok("never".to_string()))
				.await
		})
	};
	eventually(|| cache.statistics().coalesced == 1).await;
	release.send(()).unwrap();

	assert!(leader.await.is_err());
	let err = waiter.await.unwrap().unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Cache);
	assert!(matches!(err, Error::Abandoned { fingerprint } if fingerprint == key.as_str()));

	let retried = cache
		.get_or_compile(&key, || Ok("recovered".to_string()))
		.await
		.unwrap();
	assert_eq!(retried.as_str(), "recovered");
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_waiter_timeout_leaves_cache_usable() {
	let cache: Arc<CompilationCache<String>> = Arc::new(CompilationCache::new());
	let key = fingerprint("{{ slow }}");
	let (release, released) = mpsc::channel::<()>();

	let leader = {
		let cache = Arc::clone(&cache);
		let key = key.clone();
		tokio::spawn(async move {
			cache
				.get_or_compile(&key, move || {
					let _ = released.recv();
					Ok("slow".to_string())
				})
				.await
		})
	};
	eventually(|| cache.statistics().misses == 1).await;

	let timed_out = tokio::time::timeout(
		Duration::from_millis(20),
		cache.get_or_compile(&key, || Ok("never".to_string())),
	)
	.await;
	assert!(timed_out.is_err());

	release.send(()).unwrap();
	let artifact = leader.await.unwrap().unwrap();
	let again = cache
		.get_or_compile(&key, || Ok("never".to_string()))
		.await
		.unwrap();
	assert!(Arc::ptr_eq(&artifact, &again));
}

#[rstest]
#[tokio::test]
async fn test_distinct_fingerprints_compile_independently() {
	let cache = CompilationCache::new();

	let a = cache.get_or_compile(&fingerprint("a"), || Ok(1)).await.unwrap();
	let b = cache.get_or_compile(&fingerprint("b"), || Ok(2)).await.unwrap();

	assert_eq!((*a, *b), (1, 2));
	assert_eq!(cache.len(), 2);
}

#[rstest]
#[tokio::test]
async fn test_least_recently_used_is_evicted() {
	let cache = CompilationCache::new().with_max_entries(2);
	let (a, b, c) = (fingerprint("a"), fingerprint("b"), fingerprint("c"));

	cache.get_or_compile(&a, || Ok("a")).await.unwrap();
	tokio::time::sleep(Duration::from_millis(2)).await;
	cache.get_or_compile(&b, || Ok("b")).await.unwrap();
	tokio::time::sleep(Duration::from_millis(2)).await;
	cache.get_or_compile(&a, || Ok("unused")).await.unwrap();
	tokio::time::sleep(Duration::from_millis(2)).await;
	cache.get_or_compile(&c, || Ok("c")).await.unwrap();

	assert!(cache.contains(&a));
	assert!(!cache.contains(&b));
	assert!(cache.contains(&c));
	assert_eq!(cache.statistics().evictions, 1);
}

#[rstest]
#[tokio::test]
async fn test_expired_artifact_is_recompiled() {
	let cache = CompilationCache::new().with_ttl(Duration::from_millis(30));
	let key = fingerprint("a");
	let compiles = AtomicUsize::new(0);
	let compile = || {
		compiles.fetch_add(1, Ordering::SeqCst);
		Ok("artifact")
	};

	cache.get_or_compile(&key, compile).await.unwrap();
	cache.get_or_compile(&key, compile).await.unwrap();
	assert_eq!(compiles.load(Ordering::SeqCst), 1);

	tokio::time::sleep(Duration::from_millis(60)).await;
	assert!(!cache.contains(&key));
	assert_eq!(cache.purge_expired(), 1);
	cache.get_or_compile(&key, compile).await.unwrap();

	assert_eq!(compiles.load(Ordering::SeqCst), 2);
}

#[rstest]
#[tokio::test]
async fn test_unbounded_ttl_keeps_fingerprint_usable() {
	let cache = CompilationCache::new().with_ttl(Duration::from_secs(i64::MAX as u64));
	let key = fingerprint("{{ forever }}");
	let compiles = AtomicUsize::new(0);
	let compile = || {
		compiles.fetch_add(1, Ordering::SeqCst);
		Ok("forever")
	};

	for _ in 0..3 {
		let artifact = cache.get_or_compile(&key, compile).await.unwrap();
		assert_eq!(*artifact, "forever");
	}

	assert_eq!(compiles.load(Ordering::SeqCst), 1);
	assert!(cache.contains(&key));
	assert_eq!(cache.inspect(&key).unwrap().ttl_remaining, None);
}
