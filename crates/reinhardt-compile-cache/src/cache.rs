//! Coalescing compilation cache

use crate::entry::{CacheEntry, CacheEntryInfo};
use crate::fingerprint::Fingerprint;
use crate::statistics::{CacheStatistics, Counters};
use parking_lot::Mutex;
use reinhardt_lang_core::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

type Outcome<T> = Result<Arc<T>>;

enum Slot<T> {
	Ready(CacheEntry<T>),
	/// Compilation in flight; the receiver yields its outcome
	Pending(watch::Receiver<Option<Outcome<T>>>),
}

enum Lookup<T> {
	Hit(Arc<T>),
	Wait(watch::Receiver<Option<Outcome<T>>>),
	Lead(watch::Sender<Option<Outcome<T>>>),
}

/// Map from [`Fingerprint`] to compiled artifact.
///
/// At most one compilation per fingerprint runs at a time: callers arriving
/// while it is in flight wait for its outcome instead of compiling again.
/// Failed compilations are reported to every waiter and never stored.
///
/// # Examples
///
/// ```
/// use reinhardt_compile_cache::{CompilationCache, Fingerprint};
///
/// # async fn example() {
/// let cache = CompilationCache::new();
/// let fingerprint = Fingerprint::new("query", "generic", "SELECT 1");
///
/// let first = cache
///     .get_or_compile(&fingerprint, || Ok(String::from("SELECT 1")))
///     .await
///     .unwrap();
/// let second = cache
///     .get_or_compile(&fingerprint, || unreachable!("already cached"))
///     .await
///     .unwrap();
///
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// # }
/// ```
pub struct CompilationCache<T> {
	slots: Mutex<HashMap<Fingerprint, Slot<T>>>,
	max_entries: Option<usize>,
	ttl: Option<Duration>,
	counters: Counters,
}

impl<T> Default for CompilationCache<T> {
	fn default() -> Self {
		Self {
			slots: Mutex::new(HashMap::new()),
			max_entries: None,
			ttl: None,
			counters: Counters::default(),
		}
	}
}

impl<T> fmt::Debug for CompilationCache<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CompilationCache")
			.field("slots", &self.slots.lock().len())
			.field("max_entries", &self.max_entries)
			.field("ttl", &self.ttl)
			.finish()
	}
}

impl<T> CompilationCache<T>
where
	T: Send + Sync + 'static,
{
	/// Unbounded cache without expiry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Keep at most `max_entries` artifacts, evicting the least recently used.
	pub fn with_max_entries(mut self, max_entries: usize) -> Self {
		self.max_entries = Some(max_entries);
		self
	}

	/// Drop artifacts `ttl` after they were stored.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = Some(ttl);
		self
	}

	/// Artifact for `fingerprint`, compiling it with `compile` when absent.
	///
	/// `compile` runs on the calling task, outside any lock. When another
	/// caller is already compiling the same fingerprint, this waits for that
	/// outcome instead; if that compilation panics the waiters receive
	/// [`Error::Abandoned`] and the next caller compiles afresh.
	pub async fn get_or_compile<F>(&self, fingerprint: &Fingerprint, compile: F) -> Result<Arc<T>>
	where
		F: FnOnce() -> Result<T>,
	{
		match self.lookup(fingerprint) {
			Lookup::Hit(artifact) => Ok(artifact),
			Lookup::Lead(sender) => self.lead(fingerprint, sender, compile),
			Lookup::Wait(receiver) => wait(fingerprint, receiver).await,
		}
	}

	fn lookup(&self, fingerprint: &Fingerprint) -> Lookup<T> {
		let now = Instant::now();
		let mut slots = self.slots.lock();
		match slots.get_mut(fingerprint) {
			Some(Slot::Ready(entry)) if !entry.is_expired_at(now) => {
				entry.touch(now);
				self.counters.hit();
				trace!(fingerprint = fingerprint.short(), "compilation cache hit");
				return Lookup::Hit(Arc::clone(entry.artifact()));
			}
			Some(Slot::Pending(receiver)) => {
				self.counters.coalesce();
				debug!(fingerprint = fingerprint.short(), "waiting on in-flight compilation");
				return Lookup::Wait(receiver.clone());
			}
			Some(Slot::Ready(_)) => {
				trace!(fingerprint = fingerprint.short(), "cached artifact expired");
			}
			None => {}
		}

		self.counters.miss();
		let (sender, receiver) = watch::channel(None);
		slots.insert(fingerprint.clone(), Slot::Pending(receiver));
		Lookup::Lead(sender)
	}

	fn lead<F>(
		&self,
		fingerprint: &Fingerprint,
		sender: watch::Sender<Option<Outcome<T>>>,
		compile: F,
	) -> Result<Arc<T>>
	where
		F: FnOnce() -> Result<T>,
	{
		let guard = PendingGuard {
			cache: self,
			fingerprint,
			sender: Some(sender),
		};
		debug!(fingerprint = fingerprint.short(), "compiling");
		let outcome = compile().map(Arc::new);
		guard.complete(&outcome);
		outcome
	}

	fn settle(&self, fingerprint: &Fingerprint, outcome: &Outcome<T>) {
		let mut slots = self.slots.lock();
		match outcome {
			Ok(artifact) => {
				let entry = CacheEntry::new(fingerprint.clone(), Arc::clone(artifact), self.ttl);
				slots.insert(fingerprint.clone(), Slot::Ready(entry));
				self.evict_over_capacity(&mut slots);
				debug!(fingerprint = fingerprint.short(), "compiled artifact stored");
			}
			Err(err) => {
				slots.remove(fingerprint);
				self.counters.failure();
				debug!(fingerprint = fingerprint.short(), error = %err, "compilation failed");
			}
		}
	}

	fn evict_over_capacity(&self, slots: &mut HashMap<Fingerprint, Slot<T>>) {
		let Some(max_entries) = self.max_entries else {
			return;
		};
		loop {
			let ready = slots
				.values()
				.filter(|slot| matches!(slot, Slot::Ready(_)))
				.count();
			if ready <= max_entries {
				return;
			}
			let oldest = slots
				.iter()
				.filter_map(|(fingerprint, slot)| match slot {
					Slot::Ready(entry) => Some((fingerprint, entry.last_access())),
					Slot::Pending(_) => None,
				})
				.min_by_key(|(_, last_access)| *last_access)
				.map(|(fingerprint, _)| fingerprint.clone());
			let Some(oldest) = oldest else {
				return;
			};
			slots.remove(&oldest);
			self.counters.evict();
			debug!(fingerprint = oldest.short(), "evicted least recently used artifact");
		}
	}

	/// Drop the stored artifact for `fingerprint`.
	///
	/// A compilation in flight is left alone. Returns whether an artifact was
	/// removed.
	pub fn invalidate(&self, fingerprint: &Fingerprint) -> bool {
		let mut slots = self.slots.lock();
		if matches!(slots.get(fingerprint), Some(Slot::Ready(_))) {
			slots.remove(fingerprint);
			debug!(fingerprint = fingerprint.short(), "invalidated");
			return true;
		}
		false
	}

	/// Drop every stored artifact; compilations in flight still complete.
	pub fn clear(&self) {
		self.slots
			.lock()
			.retain(|_, slot| matches!(slot, Slot::Pending(_)));
	}

	/// Drop artifacts past their TTL, returning how many were removed.
	pub fn purge_expired(&self) -> usize {
		let now = Instant::now();
		let mut slots = self.slots.lock();
		let before = slots.len();
		slots.retain(|_, slot| match slot {
			Slot::Ready(entry) => !entry.is_expired_at(now),
			Slot::Pending(_) => true,
		});
		before - slots.len()
	}

	/// Whether a live artifact is stored for `fingerprint`.
	pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
		let now = Instant::now();
		matches!(
			self.slots.lock().get(fingerprint),
			Some(Slot::Ready(entry)) if !entry.is_expired_at(now)
		)
	}

	pub fn inspect(&self, fingerprint: &Fingerprint) -> Option<CacheEntryInfo> {
		let now = Instant::now();
		match self.slots.lock().get(fingerprint) {
			Some(Slot::Ready(entry)) => Some(entry.info(now)),
			_ => None,
		}
	}

	/// Number of stored artifacts.
	pub fn len(&self) -> usize {
		self.slots
			.lock()
			.values()
			.filter(|slot| matches!(slot, Slot::Ready(_)))
			.count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn statistics(&self) -> CacheStatistics {
		self.counters.snapshot(self.len())
	}
}

async fn wait<T>(
	fingerprint: &Fingerprint,
	mut receiver: watch::Receiver<Option<Outcome<T>>>,
) -> Result<Arc<T>> {
	loop {
		let current = (*receiver.borrow_and_update()).clone();
		if let Some(outcome) = current {
			return outcome;
		}
		if receiver.changed().await.is_err() {
			let last = (*receiver.borrow()).clone();
			return last.unwrap_or_else(|| {
				Err(Error::Abandoned {
					fingerprint: fingerprint.to_string(),
				})
			});
		}
	}
}

/// Owns the pending slot of a compilation in flight.
///
/// Dropped without [`complete`](PendingGuard::complete), e.g. while
/// unwinding from a panicking compile, it removes the slot and closes the
/// channel so waiters see the compilation as abandoned.
struct PendingGuard<'c, T>
where
	T: Send + Sync + 'static,
{
	cache: &'c CompilationCache<T>,
	fingerprint: &'c Fingerprint,
	sender: Option<watch::Sender<Option<Outcome<T>>>>,
}

impl<T> PendingGuard<'_, T>
where
	T: Send + Sync + 'static,
{
	/// Store the outcome, then publish it to waiters.
	///
	/// The sender stays in the guard until the slot is settled, so a panic
	/// while settling still releases the slot on drop.
	fn complete(mut self, outcome: &Outcome<T>) {
		self.cache.settle(self.fingerprint, outcome);
		if let Some(sender) = self.sender.take() {
			sender.send_replace(Some(outcome.clone()));
		}
	}
}

impl<T> Drop for PendingGuard<'_, T>
where
	T: Send + Sync + 'static,
{
	fn drop(&mut self) {
		if let Some(sender) = self.sender.take() {
			self.cache.slots.lock().remove(self.fingerprint);
			drop(sender);
			warn!(
				fingerprint = self.fingerprint.short(),
				"compilation abandoned before completing"
			);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn fingerprint(source: &str) -> Fingerprint {
		Fingerprint::new("query", "generic", source)
	}

	#[rstest]
	#[tokio::test]
	async fn test_second_request_is_a_hit() {
		let cache = CompilationCache::new();
		let compiles = AtomicUsize::new(0);
		let key = fingerprint("a");

		for _ in 0..3 {
			let artifact = cache
				.get_or_compile(&key, || {
					compiles.fetch_add(1, Ordering::SeqCst);
					Ok("artifact")
				})
				.await
				.unwrap();
			assert_eq!(*artifact, "artifact");
		}

		assert_eq!(compiles.load(Ordering::SeqCst), 1);
		let stats = cache.statistics();
		assert_eq!(stats.misses, 1);
		assert_eq!(stats.hits, 2);
		assert_eq!(stats.entry_count, 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_failure_is_not_stored() {
		let cache: CompilationCache<String> = CompilationCache::new();
		let key = fingerprint("bad");
		let failure = Error::UnknownEntity {
			name: "Missing".to_string(),
			position: reinhardt_lang_core::Position::START,
		};

		let err = cache
			.get_or_compile(&key, || Err(failure.clone()))
			.await
			.unwrap_err();
		assert_eq!(err, failure);
		assert!(!cache.contains(&key));
		assert_eq!(cache.statistics().failures, 1);

		let recovered = cache
			.get_or_compile(&key, || Ok("fixed".to_string()))
			.await
			.unwrap();
		assert_eq!(recovered.as_str(), "fixed");
	}

	#[rstest]
	#[tokio::test]
	async fn test_invalidate_forces_recompile() {
		let cache = CompilationCache::new();
		let key = fingerprint("a");
		cache.get_or_compile(&key, || Ok(1)).await.unwrap();

		assert!(cache.invalidate(&key));
		assert!(!cache.invalidate(&key));
		let value = cache.get_or_compile(&key, || Ok(2)).await.unwrap();

		assert_eq!(*value, 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_clear_and_inspect() {
		let cache = CompilationCache::new().with_ttl(Duration::from_secs(60));
		let key = fingerprint("a");
		cache.get_or_compile(&key, || Ok(1)).await.unwrap();

		let info = cache.inspect(&key).unwrap();
		assert_eq!(info.fingerprint, key);
		assert!(info.ttl_remaining.is_some_and(|ttl| ttl <= Duration::from_secs(60)));

		cache.clear();
		assert!(cache.is_empty());
		assert!(cache.inspect(&key).is_none());
	}
}
