//! Compiler settings
//!
//! Settings are read from TOML; every section and key is optional:
//!
//! ```toml
//! [query]
//! dialect = "postgres"
//!
//! [template]
//! autoescape = true
//!
//! [template.extensions]
//! markdown = "block"
//! csrf_token = "inline"
//!
//! [cache]
//! enabled = true
//! capacity = 512
//! ttl_seconds = 3600
//! ```
//!
//! `REINHARDT_LANG_*` environment variables override file values, see
//! [`LangSettings::with_env_overrides`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("Failed to read {}: {source}", .path.display())]
	FileError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("TOML parse error: {0}")]
	ParseError(#[from] toml::de::Error),

	#[error("Validation error: {0}")]
	ValidationError(String),
}

pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LangSettings {
	#[cfg(feature = "query")]
	pub query: QuerySettings,
	#[cfg(feature = "template")]
	pub template: TemplateSettings,
	pub cache: CacheSettings,
}

/// Query language settings
#[cfg(feature = "query")]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
	/// Built-in dialect name: `generic`, `postgres`, `mysql` or `sqlite`
	pub dialect: String,
}

#[cfg(feature = "query")]
impl Default for QuerySettings {
	fn default() -> Self {
		Self {
			dialect: "generic".to_string(),
		}
	}
}

/// Template language settings
#[cfg(feature = "template")]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
	/// Escape `{{ }}` output unless marked raw
	pub autoescape: bool,
	/// Custom directives accepted by the translator
	pub extensions: reinhardt_template_lang::ExtensionTable,
}

#[cfg(feature = "template")]
impl Default for TemplateSettings {
	fn default() -> Self {
		Self {
			autoescape: true,
			extensions: reinhardt_template_lang::ExtensionTable::new(),
		}
	}
}

/// Compilation cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
	pub enabled: bool,
	/// Maximum number of artifacts kept; unbounded when absent
	pub capacity: Option<usize>,
	/// Lifetime of a cached artifact; unlimited when absent
	pub ttl_seconds: Option<u64>,
}

impl Default for CacheSettings {
	fn default() -> Self {
		Self {
			enabled: true,
			capacity: None,
			ttl_seconds: None,
		}
	}
}

impl CacheSettings {
	pub fn ttl(&self) -> Option<Duration> {
		self.ttl_seconds.map(Duration::from_secs)
	}
}

impl LangSettings {
	/// Parse and validate settings from TOML text.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_lang::settings::LangSettings;
	///
	/// let settings = LangSettings::from_toml_str("[cache]\ncapacity = 16\n").unwrap();
	/// assert_eq!(settings.cache.capacity, Some(16));
	/// assert!(settings.cache.enabled);
	/// ```
	pub fn from_toml_str(source: &str) -> SettingsResult<Self> {
		let settings: LangSettings = toml::from_str(source)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Load settings from a TOML file
	pub fn from_file(path: impl AsRef<Path>) -> SettingsResult<Self> {
		let path = path.as_ref();
		let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::FileError {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&contents)
	}

	/// Apply `REINHARDT_LANG_*` variables from the process environment.
	///
	/// Recognized variables: `REINHARDT_LANG_DIALECT`,
	/// `REINHARDT_LANG_AUTOESCAPE`, `REINHARDT_LANG_CACHE_ENABLED`,
	/// `REINHARDT_LANG_CACHE_CAPACITY` and `REINHARDT_LANG_CACHE_TTL_SECONDS`.
	pub fn with_env_overrides(self) -> SettingsResult<Self> {
		self.with_overrides(|name| std::env::var(name).ok())
	}

	/// Apply overrides resolved by `lookup`, as [`with_env_overrides`] does.
	///
	/// [`with_env_overrides`]: LangSettings::with_env_overrides
	pub fn with_overrides(
		mut self,
		lookup: impl Fn(&str) -> Option<String>,
	) -> SettingsResult<Self> {
		#[cfg(feature = "query")]
		if let Some(dialect) = lookup("REINHARDT_LANG_DIALECT") {
			self.query.dialect = dialect;
		}
		#[cfg(feature = "template")]
		if let Some(value) = lookup("REINHARDT_LANG_AUTOESCAPE") {
			self.template.autoescape = parse_flag("REINHARDT_LANG_AUTOESCAPE", &value)?;
		}
		if let Some(value) = lookup("REINHARDT_LANG_CACHE_ENABLED") {
			self.cache.enabled = parse_flag("REINHARDT_LANG_CACHE_ENABLED", &value)?;
		}
		if let Some(value) = lookup("REINHARDT_LANG_CACHE_CAPACITY") {
			self.cache.capacity = Some(parse_number("REINHARDT_LANG_CACHE_CAPACITY", &value)?);
		}
		if let Some(value) = lookup("REINHARDT_LANG_CACHE_TTL_SECONDS") {
			self.cache.ttl_seconds = Some(parse_number("REINHARDT_LANG_CACHE_TTL_SECONDS", &value)?);
		}
		self.validate()?;
		Ok(self)
	}

	pub fn validate(&self) -> SettingsResult<()> {
		#[cfg(feature = "query")]
		if reinhardt_query_lang::Dialect::by_name(&self.query.dialect).is_none() {
			return Err(SettingsError::ValidationError(format!(
				"unknown query dialect '{}'",
				self.query.dialect
			)));
		}
		if self.cache.capacity == Some(0) {
			return Err(SettingsError::ValidationError(
				"cache capacity must be at least 1".to_string(),
			));
		}
		if self.cache.ttl_seconds == Some(0) {
			return Err(SettingsError::ValidationError(
				"cache ttl_seconds must be at least 1".to_string(),
			));
		}
		Ok(())
	}
}

fn parse_flag(name: &str, value: &str) -> SettingsResult<bool> {
	match value.trim().to_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(SettingsError::ValidationError(format!(
			"{} must be a boolean, got '{}'",
			name, value
		))),
	}
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> SettingsResult<T> {
	value.trim().parse().map_err(|_| {
		SettingsError::ValidationError(format!("{} must be a number, got '{}'", name, value))
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::collections::HashMap;

	#[rstest]
	fn test_default_settings() {
		let settings = LangSettings::default();

		assert!(settings.cache.enabled);
		assert_eq!(settings.cache.capacity, None);
		assert_eq!(settings.cache.ttl(), None);
		assert!(settings.validate().is_ok());
	}

	#[rstest]
	fn test_empty_document_uses_defaults() {
		assert_eq!(LangSettings::from_toml_str("").unwrap(), LangSettings::default());
	}

	#[cfg(all(feature = "query", feature = "template"))]
	#[rstest]
	fn test_full_document() {
		use reinhardt_template_lang::TagKind;

		let settings = LangSettings::from_toml_str(
			r#"
			[query]
			dialect = "postgres"

			[template]
			autoescape = false

			[template.extensions]
			markdown = "block"
			csrf_token = "inline"

			[cache]
			capacity = 64
			ttl_seconds = 300
			"#,
		)
		.unwrap();

		assert_eq!(settings.query.dialect, "postgres");
		assert!(!settings.template.autoescape);
		assert_eq!(settings.template.extensions.get("markdown"), Some(TagKind::Block));
		assert_eq!(settings.template.extensions.get("csrf_token"), Some(TagKind::Inline));
		assert_eq!(settings.cache.capacity, Some(64));
		assert_eq!(settings.cache.ttl(), Some(Duration::from_secs(300)));
	}

	#[rstest]
	#[case("[cache]\ncapacity = 0\n")]
	#[case("[cache]\nttl_seconds = 0\n")]
	fn test_invalid_values_are_rejected(#[case] source: &str) {
		let err = LangSettings::from_toml_str(source).unwrap_err();

		assert!(matches!(err, SettingsError::ValidationError(_)));
	}

	#[cfg(feature = "query")]
	#[rstest]
	fn test_unknown_dialect_is_rejected() {
		let err = LangSettings::from_toml_str("[query]\ndialect = \"oracle\"\n").unwrap_err();

		assert!(err.to_string().contains("oracle"));
	}

	#[rstest]
	fn test_malformed_toml() {
		let err = LangSettings::from_toml_str("[cache\n").unwrap_err();

		assert!(matches!(err, SettingsError::ParseError(_)));
	}

	#[rstest]
	fn test_overrides() {
		let vars: HashMap<&str, &str> = HashMap::from([
			("REINHARDT_LANG_CACHE_ENABLED", "off"),
			("REINHARDT_LANG_CACHE_CAPACITY", " 8 "),
		]);

		let settings = LangSettings::default()
			.with_overrides(|name| vars.get(name).map(|v| v.to_string()))
			.unwrap();

		assert!(!settings.cache.enabled);
		assert_eq!(settings.cache.capacity, Some(8));
	}

	#[rstest]
	fn test_malformed_override() {
		let err = LangSettings::default()
			.with_overrides(|name| {
				(name == "REINHARDT_LANG_CACHE_TTL_SECONDS").then(|| "soon".to_string())
			})
			.unwrap_err();

		assert!(err.to_string().contains("REINHARDT_LANG_CACHE_TTL_SECONDS"));
	}
}
