//! # Reinhardt Query Lang
//!
//! A SQL-like query language over application models, compiled to
//! dialect-specific SQL with ordered bind parameters.
//!
//! ## Pipeline
//!
//! - [`parser::parse_query`] turns source text into a [`Statement`]
//! - [`translator::translate`] resolves models and columns against
//!   [`ModelMetadata`] and lowers the statement through a [`Dialect`]
//! - the result is a [`CompiledQuery`] ready to hand to a database driver
//!
//! ## Example
//!
//! ```
//! use reinhardt_query_lang::{compile, ColumnType, Dialect, StaticMetadata, TableSchema};
//!
//! let metadata = StaticMetadata::new().table(
//!     TableSchema::new("Users", "users")
//!         .column("id", ColumnType::Integer)
//!         .column("email", ColumnType::Text),
//! );
//!
//! let query = compile("SELECT id FROM Users WHERE email = 'a@b.c'", &metadata, &Dialect::postgres()).unwrap();
//! assert_eq!(query.sql, r#"SELECT "id" FROM "users" WHERE "email" = $1"#);
//! ```

pub mod ast;
pub mod compiled;
pub mod dialect;
pub mod grammar;
pub mod metadata;
pub mod parser;
pub mod translator;
pub mod writer;

pub use ast::Statement;
pub use compiled::{BindParameter, BindSource, BindValue, CompiledQuery};
pub use dialect::{Construct, Dialect, PlaceholderStyle, SyntaxTemplate};
pub use grammar::QueryGrammar;
pub use metadata::{ColumnSchema, ColumnType, JoinPath, ModelMetadata, StaticMetadata, TableSchema};
pub use parser::parse_query;
pub use translator::{compile, translate};

/// Language name used in cache fingerprints.
pub const LANGUAGE: &str = "query";
