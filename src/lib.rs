//! # Reinhardt Lang
//!
//! Embedded languages for Reinhardt: an ORM query language compiled to
//! dialect-specific SQL, and a template language compiled to render
//! instructions. Both share one compiler pipeline:
//!
//! source → scanner → tokens → parser → AST → translator → artifact → cache
//!
//! ## Feature Flags
//!
//! - `query` - the query language ([`query`])
//! - `template` - the template language and reference renderer ([`template`])
//! - `full` (default) - both
//!
//! The shared pipeline ([`compiler`]), the compilation cache ([`cache`]) and
//! [`settings`] are always available.
//!
//! ## Quick Example
//!
//! ```rust
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use reinhardt_lang::engine::TemplateEngine;
//! use reinhardt_lang::settings::LangSettings;
//!
//! let settings = LangSettings::from_toml_str("[cache]\ncapacity = 128\n").unwrap();
//! let engine = TemplateEngine::from_settings(&settings);
//!
//! let first = engine.compile_cached("Hello {{ name }}!").await.unwrap();
//! let second = engine.compile_cached("Hello {{ name }}!").await.unwrap();
//! assert!(std::sync::Arc::ptr_eq(&first, &second));
//! # }
//! ```

pub mod cache;
pub mod engine;
#[cfg(feature = "query")]
pub mod query;
pub mod settings;
#[cfg(feature = "template")]
pub mod template;

/// Shared scanner, expression AST, parser and errors.
pub mod compiler {
	pub use reinhardt_lang_core::*;
}

pub use reinhardt_lang_core::{COMPILER_VERSION, Error, ErrorKind, Position, Result};

#[cfg(feature = "query")]
pub use engine::QueryEngine;
#[cfg(feature = "template")]
pub use engine::TemplateEngine;
pub use settings::{LangSettings, SettingsError};
