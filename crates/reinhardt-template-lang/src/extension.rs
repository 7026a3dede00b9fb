//! Custom directive registry consulted by the translator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shape of a custom directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
	/// `{% name args %}` on its own
	Inline,
	/// `{% name args %} ... {% endname %}`
	Block,
}

/// Directive names the host runtime knows how to execute.
///
/// # Examples
///
/// ```
/// use reinhardt_template_lang::extension::{ExtensionTable, TagKind};
///
/// let table = ExtensionTable::new()
///     .with_tag("csrf_token", TagKind::Inline)
///     .with_tag("spaceless", TagKind::Block);
/// assert_eq!(table.get("spaceless"), Some(TagKind::Block));
/// assert_eq!(table.get("unknown"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionTable {
	tags: BTreeMap<String, TagKind>,
}

impl ExtensionTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_tag(mut self, name: impl Into<String>, kind: TagKind) -> Self {
		self.register(name, kind);
		self
	}

	pub fn register(&mut self, name: impl Into<String>, kind: TagKind) {
		self.tags.insert(name.into(), kind);
	}

	pub fn get(&self, name: &str) -> Option<TagKind> {
		self.tags.get(name).copied()
	}

	pub fn is_empty(&self) -> bool {
		self.tags.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, TagKind)> {
		self.tags.iter().map(|(name, kind)| (name.as_str(), *kind))
	}

	/// Stable textual form folded into cache fingerprints.
	pub fn signature(&self) -> String {
		self.iter()
			.map(|(name, kind)| {
				let kind = match kind {
					TagKind::Inline => "inline",
					TagKind::Block => "block",
				};
				format!("{}={}", name, kind)
			})
			.collect::<Vec<_>>()
			.join(",")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_signature_is_sorted() {
		let table = ExtensionTable::new()
			.with_tag("zeta", TagKind::Inline)
			.with_tag("alpha", TagKind::Block);
		assert_eq!(table.signature(), "alpha=block,zeta=inline");
	}

	#[rstest]
	fn test_register_overrides() {
		let mut table = ExtensionTable::new();
		table.register("t", TagKind::Inline);
		table.register("t", TagKind::Block);
		assert_eq!(table.get("t"), Some(TagKind::Block));
	}
}
