//! Compile entry points with caching
//!
//! [`QueryEngine`] and [`TemplateEngine`] own the immutable configuration a
//! compilation needs (metadata, dialect, extension table, escaping mode) and
//! an optional [`CompilationCache`] keyed by a fingerprint over the source and
//! that configuration.

use crate::settings::{CacheSettings, SettingsError, SettingsResult};
use reinhardt_compile_cache::{CompilationCache, Fingerprint};
use reinhardt_lang_core::Result;
use std::sync::Arc;
use tracing::debug;

fn build_cache<T>(settings: &CacheSettings) -> Option<CompilationCache<T>>
where
	T: Send + Sync + 'static,
{
	if !settings.enabled {
		return None;
	}
	let mut cache = CompilationCache::new();
	if let Some(capacity) = settings.capacity {
		cache = cache.with_max_entries(capacity);
	}
	if let Some(ttl) = settings.ttl() {
		cache = cache.with_ttl(ttl);
	}
	Some(cache)
}

async fn cached<T, F>(
	cache: Option<&CompilationCache<T>>,
	fingerprint: impl FnOnce() -> Fingerprint,
	compile: F,
) -> Result<Arc<T>>
where
	T: Send + Sync + 'static,
	F: FnOnce() -> Result<T>,
{
	match cache {
		Some(cache) => cache.get_or_compile(&fingerprint(), compile).await,
		None => compile().map(Arc::new),
	}
}

#[cfg(feature = "query")]
pub use query::QueryEngine;
#[cfg(feature = "template")]
pub use template::TemplateEngine;

#[cfg(feature = "query")]
mod query {
	use super::*;
	use crate::settings::LangSettings;
	use reinhardt_query_lang::{CompiledQuery, Dialect, ModelMetadata, LANGUAGE};

	/// Query compiler bound to one metadata provider and dialect.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_lang::engine::QueryEngine;
	/// use reinhardt_lang::query::{ColumnType, Dialect, StaticMetadata, TableSchema};
	/// use std::sync::Arc;
	///
	/// let metadata = StaticMetadata::new()
	///     .table(TableSchema::new("Users", "users").column("id", ColumnType::Integer));
	/// let engine = QueryEngine::new(Arc::new(metadata), Dialect::sqlite());
	///
	/// let query = engine.compile("SELECT id FROM Users WHERE id = 7").unwrap();
	/// assert_eq!(query.binds.len(), 1);
	/// ```
	pub struct QueryEngine {
		metadata: Arc<dyn ModelMetadata>,
		dialect: Dialect,
		variant: String,
		cache: Option<CompilationCache<CompiledQuery>>,
	}

	impl QueryEngine {
		/// Engine with an unbounded cache.
		pub fn new(metadata: Arc<dyn ModelMetadata>, dialect: Dialect) -> Self {
			let variant = dialect.signature();
			Self {
				metadata,
				dialect,
				variant,
				cache: Some(CompilationCache::new()),
			}
		}

		pub fn from_settings(
			metadata: Arc<dyn ModelMetadata>,
			settings: &LangSettings,
		) -> SettingsResult<Self> {
			let dialect = Dialect::by_name(&settings.query.dialect).ok_or_else(|| {
				SettingsError::ValidationError(format!(
					"unknown query dialect '{}'",
					settings.query.dialect
				))
			})?;
			let mut engine = Self::new(metadata, dialect);
			engine.cache = build_cache(&settings.cache);
			Ok(engine)
		}

		pub fn without_cache(mut self) -> Self {
			self.cache = None;
			self
		}

		pub fn dialect(&self) -> &Dialect {
			&self.dialect
		}

		pub fn cache(&self) -> Option<&CompilationCache<CompiledQuery>> {
			self.cache.as_ref()
		}

		pub fn fingerprint(&self, source: &str) -> Fingerprint {
			Fingerprint::new(LANGUAGE, &self.variant, source)
		}

		/// Compile `source`, bypassing the cache.
		pub fn compile(&self, source: &str) -> Result<CompiledQuery> {
			let compiled = reinhardt_query_lang::compile(source, self.metadata.as_ref(), &self.dialect)?;
			debug!(dialect = self.dialect.name(), binds = compiled.binds.len(), "compiled query");
			Ok(compiled)
		}

		/// Compile `source` once per distinct text and share the result.
		pub async fn compile_cached(&self, source: &str) -> Result<Arc<CompiledQuery>> {
			cached(
				self.cache.as_ref(),
				|| self.fingerprint(source),
				|| self.compile(source),
			)
			.await
		}
	}
}

#[cfg(feature = "template")]
mod template {
	use super::*;
	use crate::settings::LangSettings;
	use reinhardt_template_lang::{
		parse_template, CompiledTemplate, ExtensionTable, TemplateTranslator, LANGUAGE,
	};

	/// Template compiler bound to one extension table and escaping mode.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_lang::engine::TemplateEngine;
	/// use reinhardt_lang::template::{ExtensionTable, TagKind};
	///
	/// let engine = TemplateEngine::new(ExtensionTable::new().with_tag("csrf_token", TagKind::Inline));
	///
	/// assert!(engine.compile("<form>{% csrf_token %}</form>").is_ok());
	/// assert!(engine.compile("{% markdown %}").is_err());
	/// ```
	pub struct TemplateEngine {
		extensions: ExtensionTable,
		autoescape: bool,
		cache: Option<CompilationCache<CompiledTemplate>>,
	}

	impl TemplateEngine {
		/// Engine with autoescaping and an unbounded cache.
		pub fn new(extensions: ExtensionTable) -> Self {
			Self {
				extensions,
				autoescape: true,
				cache: Some(CompilationCache::new()),
			}
		}

		pub fn from_settings(settings: &LangSettings) -> Self {
			Self {
				extensions: settings.template.extensions.clone(),
				autoescape: settings.template.autoescape,
				cache: build_cache(&settings.cache),
			}
		}

		pub fn with_autoescape(mut self, autoescape: bool) -> Self {
			self.autoescape = autoescape;
			self
		}

		pub fn without_cache(mut self) -> Self {
			self.cache = None;
			self
		}

		pub fn extensions(&self) -> &ExtensionTable {
			&self.extensions
		}

		pub fn cache(&self) -> Option<&CompilationCache<CompiledTemplate>> {
			self.cache.as_ref()
		}

		/// Fingerprint over `source`, the escaping mode and the extension table.
		pub fn fingerprint(&self, source: &str) -> Fingerprint {
			let variant = format!(
				"autoescape={};extensions={}",
				self.autoescape,
				self.extensions.signature()
			);
			Fingerprint::new(LANGUAGE, &variant, source)
		}

		/// Compile `source`, bypassing the cache.
		pub fn compile(&self, source: &str) -> Result<CompiledTemplate> {
			let template = parse_template(source)?;
			let compiled = TemplateTranslator::new(&self.extensions)
				.with_autoescape(self.autoescape)
				.translate(&template)?;
			debug!(
				instructions = compiled.instructions.len(),
				autoescape = self.autoescape,
				"compiled template"
			);
			Ok(compiled)
		}

		/// Compile `source` once per distinct text and share the result.
		pub async fn compile_cached(&self, source: &str) -> Result<Arc<CompiledTemplate>> {
			cached(
				self.cache.as_ref(),
				|| self.fingerprint(source),
				|| self.compile(source),
			)
			.await
		}
	}
}
