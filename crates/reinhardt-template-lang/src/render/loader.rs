//! Template lookup for `{% include %}` and `{% extends %}`.

use super::error::{RenderError, RenderResult};
use crate::instruction::CompiledTemplate;
use crate::translator::compile;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves template names to compiled templates.
pub trait TemplateLoader: Send + Sync {
	fn load(&self, name: &str) -> RenderResult<Arc<CompiledTemplate>>;
}

/// Loader over templates registered in memory.
///
/// # Examples
///
/// ```
/// use reinhardt_template_lang::render::{MemoryLoader, TemplateLoader};
///
/// let loader = MemoryLoader::new();
/// loader.add_source("greeting", "Hello {{ name }}").unwrap();
/// assert!(loader.load("greeting").is_ok());
/// assert!(loader.load("missing").is_err());
/// ```
#[derive(Debug, Default)]
pub struct MemoryLoader {
	templates: RwLock<HashMap<String, Arc<CompiledTemplate>>>,
}

impl MemoryLoader {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&self, name: impl Into<String>, template: Arc<CompiledTemplate>) {
		self.templates.write().insert(name.into(), template);
	}

	/// Compile `source` with default settings and register it as `name`.
	pub fn add_source(&self, name: &str, source: &str) -> RenderResult<()> {
		let compiled = compile(source).map_err(|source| RenderError::Compile {
			name: name.to_string(),
			source,
		})?;
		self.insert(name, Arc::new(compiled));
		Ok(())
	}

	pub fn len(&self) -> usize {
		self.templates.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.templates.read().is_empty()
	}
}

impl TemplateLoader for MemoryLoader {
	fn load(&self, name: &str) -> RenderResult<Arc<CompiledTemplate>> {
		self.templates
			.read()
			.get(name)
			.cloned()
			.ok_or_else(|| RenderError::TemplateNotFound(name.to_string()))
	}
}
