//! Cache statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatistics {
	/// Requests served from a stored artifact
	pub hits: u64,
	/// Requests that started a compilation
	pub misses: u64,
	/// Requests that waited on a compilation already in flight
	pub coalesced: u64,
	/// Compilations that returned an error
	pub failures: u64,
	/// Artifacts dropped to stay within capacity
	pub evictions: u64,
	/// Artifacts currently stored
	pub entry_count: u64,
}

impl CacheStatistics {
	pub fn total_requests(&self) -> u64 {
		self.hits + self.misses + self.coalesced
	}

	/// Share of requests that did not compile (0.0 to 1.0)
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_compile_cache::CacheStatistics;
	///
	/// let stats = CacheStatistics {
	///     hits: 6,
	///     misses: 2,
	///     coalesced: 2,
	///     ..Default::default()
	/// };
	///
	/// assert_eq!(stats.hit_rate(), 0.8);
	/// ```
	pub fn hit_rate(&self) -> f64 {
		let total = self.total_requests();
		if total == 0 {
			0.0
		} else {
			(self.hits + self.coalesced) as f64 / total as f64
		}
	}
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
	hits: AtomicU64,
	misses: AtomicU64,
	coalesced: AtomicU64,
	failures: AtomicU64,
	evictions: AtomicU64,
}

impl Counters {
	pub(crate) fn hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn miss(&self) {
		self.misses.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn coalesce(&self) {
		self.coalesced.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn evict(&self) {
		self.evictions.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn snapshot(&self, entry_count: usize) -> CacheStatistics {
		CacheStatistics {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			coalesced: self.coalesced.load(Ordering::Relaxed),
			failures: self.failures.load(Ordering::Relaxed),
			evictions: self.evictions.load(Ordering::Relaxed),
			entry_count: entry_count as u64,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_hit_rate_zero_requests() {
		assert_eq!(CacheStatistics::default().hit_rate(), 0.0);
	}

	#[rstest]
	fn test_snapshot_reads_counters() {
		let counters = Counters::default();
		counters.hit();
		counters.hit();
		counters.miss();
		counters.coalesce();
		counters.failure();
		counters.evict();

		let stats = counters.snapshot(3);

		assert_eq!(
			stats,
			CacheStatistics {
				hits: 2,
				misses: 1,
				coalesced: 1,
				failures: 1,
				evictions: 1,
				entry_count: 3,
			}
		);
		assert_eq!(stats.total_requests(), 4);
	}
}
