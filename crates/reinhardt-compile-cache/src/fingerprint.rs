//! Cache keys for compiled artifacts.

use reinhardt_lang_core::COMPILER_VERSION;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest identifying one compilation input.
///
/// Covers the compiler version, the language, a variant string (the dialect
/// for queries, the translation settings for templates) and the source text.
/// Every part is length-prefixed, so no two distinct inputs share a byte
/// stream.
///
/// # Examples
///
/// ```
/// use reinhardt_compile_cache::Fingerprint;
///
/// let a = Fingerprint::new("query", "postgres", "SELECT id FROM Users");
/// let b = Fingerprint::new("query", "mysql", "SELECT id FROM Users");
///
/// assert_ne!(a, b);
/// assert_eq!(a.as_str().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
	/// Fingerprint under the running compiler version.
	pub fn new(language: &str, variant: &str, source: &str) -> Self {
		Self::with_version(COMPILER_VERSION, language, variant, source)
	}

	pub fn with_version(version: &str, language: &str, variant: &str, source: &str) -> Self {
		let mut hasher = Sha256::new();
		for part in [version, language, variant, source] {
			hasher.update((part.len() as u64).to_le_bytes());
			hasher.update(part.as_bytes());
		}
		Self(hex::encode(hasher.finalize()))
	}

	/// Lower-case hex digest.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// First twelve hex digits, for log lines.
	pub fn short(&self) -> &str {
		&self.0[..12]
	}
}

impl fmt::Display for Fingerprint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl AsRef<str> for Fingerprint {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
