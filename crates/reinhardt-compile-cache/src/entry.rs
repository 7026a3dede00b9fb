//! Cached artifacts and their bookkeeping

use crate::fingerprint::Fingerprint;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A compiled artifact stored under its fingerprint.
#[derive(Debug)]
pub struct CacheEntry<T> {
	fingerprint: Fingerprint,
	artifact: Arc<T>,
	created_at: Instant,
	expires_at: Option<Instant>,
	last_access: Instant,
}

impl<T> CacheEntry<T> {
	/// Entry stored now. A `ttl` too large to represent never expires.
	pub fn new(fingerprint: Fingerprint, artifact: Arc<T>, ttl: Option<Duration>) -> Self {
		let now = Instant::now();
		Self {
			fingerprint,
			artifact,
			created_at: now,
			expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
			last_access: now,
		}
	}

	pub fn fingerprint(&self) -> &Fingerprint {
		&self.fingerprint
	}

	pub fn artifact(&self) -> &Arc<T> {
		&self.artifact
	}

	pub fn created_at(&self) -> Instant {
		self.created_at
	}

	pub fn expires_at(&self) -> Option<Instant> {
		self.expires_at
	}

	pub fn last_access(&self) -> Instant {
		self.last_access
	}

	pub fn is_expired(&self) -> bool {
		self.is_expired_at(Instant::now())
	}

	pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
		self.expires_at.is_some_and(|expires_at| now >= expires_at)
	}

	pub(crate) fn touch(&mut self, now: Instant) {
		self.last_access = now;
	}

	pub(crate) fn info(&self, now: Instant) -> CacheEntryInfo {
		CacheEntryInfo {
			fingerprint: self.fingerprint.clone(),
			age: now.saturating_duration_since(self.created_at),
			idle: now.saturating_duration_since(self.last_access),
			ttl_remaining: self
				.expires_at
				.map(|expires_at| expires_at.saturating_duration_since(now)),
		}
	}
}

/// Cache entry information for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntryInfo {
	pub fingerprint: Fingerprint,
	/// Time since the artifact was stored
	pub age: Duration,
	/// Time since the artifact was last returned
	pub idle: Duration,
	/// Time until expiration (if applicable)
	pub ttl_remaining: Option<Duration>,
}
