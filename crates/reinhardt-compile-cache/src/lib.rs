//! # Reinhardt Compile Cache
//!
//! Reuse of compiled query and template artifacts across invocations.
//!
//! Artifacts are keyed by a [`Fingerprint`] over the compiler version, the
//! language, a variant string and the source text, so a cached artifact is
//! always valid in place of recompiling. [`CompilationCache`] coalesces
//! concurrent requests for one fingerprint onto a single compilation and
//! shares the result as an `Arc`.
//!
//! ## Features
//!
//! - optional capacity with least-recently-used eviction
//! - optional time-to-live
//! - hit, miss, coalesce, failure and eviction counters via
//!   [`CompilationCache::statistics`]

mod cache;
mod entry;
mod fingerprint;
mod statistics;

pub use cache::CompilationCache;
pub use entry::{CacheEntry, CacheEntryInfo};
pub use fingerprint::Fingerprint;
pub use statistics::CacheStatistics;
