//! Query language module.
//!
//! Source text to dialect SQL with ordered bind parameters.
//!
//! # Examples
//!
//! ```rust
//! use reinhardt_lang::query::{compile, ColumnType, Dialect, StaticMetadata, TableSchema};
//!
//! let metadata = StaticMetadata::new()
//!     .table(TableSchema::new("Users", "users").column("age", ColumnType::Integer));
//! let query = compile("SELECT age FROM Users LIMIT 5", &metadata, &Dialect::mysql()).unwrap();
//! assert_eq!(query.sql, "SELECT `age` FROM `users` LIMIT ?");
//! ```

pub use reinhardt_query_lang::*;
