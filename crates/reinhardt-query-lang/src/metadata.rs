//! Model metadata consulted while translating queries.
//!
//! The translator only needs three lookups: model → table schema, column
//! type, and the join path between two models. [`StaticMetadata`] is an
//! in-memory provider suitable for tests and for applications that
//! register their models up front.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Storage type of a column, used to type bind parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
	Integer,
	Float,
	Decimal,
	Text,
	Boolean,
	Date,
	DateTime,
	Binary,
	Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
	pub name: String,
	#[serde(rename = "type")]
	pub ty: ColumnType,
}

/// Physical table behind a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
	/// Model name used in queries
	pub model: String,
	/// Table name written to SQL
	pub table: String,
	/// Columns in declaration order
	pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
	pub fn new(model: impl Into<String>, table: impl Into<String>) -> Self {
		Self {
			model: model.into(),
			table: table.into(),
			columns: Vec::new(),
		}
	}

	/// Append a column.
	pub fn column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
		self.columns.push(ColumnSchema {
			name: name.into(),
			ty,
		});
		self
	}

	pub fn find_column(&self, name: &str) -> Option<&ColumnSchema> {
		self.columns.iter().find(|c| c.name == name)
	}
}

/// Column pairs joining one model to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPath {
	pub from_columns: Vec<String>,
	pub to_columns: Vec<String>,
}

impl JoinPath {
	pub fn new<I, J, S, T>(from_columns: I, to_columns: J) -> Self
	where
		I: IntoIterator<Item = S>,
		J: IntoIterator<Item = T>,
		S: Into<String>,
		T: Into<String>,
	{
		Self {
			from_columns: from_columns.into_iter().map(Into::into).collect(),
			to_columns: to_columns.into_iter().map(Into::into).collect(),
		}
	}

	/// Same path seen from the other end.
	pub fn reversed(&self) -> Self {
		Self {
			from_columns: self.to_columns.clone(),
			to_columns: self.from_columns.clone(),
		}
	}
}

/// Source of model information for the query translator.
pub trait ModelMetadata: Send + Sync {
	fn resolve_table(&self, model: &str) -> Option<TableSchema>;

	fn resolve_column(&self, model: &str, column: &str) -> Option<ColumnType> {
		self.resolve_table(model)?.find_column(column).map(|c| c.ty)
	}

	fn resolve_relationship(&self, from: &str, to: &str) -> Option<JoinPath>;
}

/// In-memory [`ModelMetadata`].
///
/// # Examples
///
/// ```
/// use reinhardt_query_lang::metadata::{ColumnType, JoinPath, ModelMetadata, StaticMetadata, TableSchema};
///
/// let metadata = StaticMetadata::new()
///     .table(TableSchema::new("Users", "users").column("id", ColumnType::Integer))
///     .table(TableSchema::new("Posts", "posts").column("user_id", ColumnType::Integer))
///     .relationship("Posts", "Users", JoinPath::new(["user_id"], ["id"]));
///
/// assert_eq!(metadata.resolve_column("Users", "id"), Some(ColumnType::Integer));
/// assert_eq!(
///     metadata.resolve_relationship("Users", "Posts"),
///     Some(JoinPath::new(["id"], ["user_id"]))
/// );
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticMetadata {
	#[serde(default)]
	tables: HashMap<String, TableSchema>,
	#[serde(default)]
	relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Relationship {
	from: String,
	to: String,
	path: JoinPath,
}

impl StaticMetadata {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a table, replacing any previous schema for the same model.
	pub fn table(mut self, schema: TableSchema) -> Self {
		self.tables.insert(schema.model.clone(), schema);
		self
	}

	/// Register a relationship; it is usable in both directions.
	pub fn relationship(mut self, from: impl Into<String>, to: impl Into<String>, path: JoinPath) -> Self {
		self.relationships.push(Relationship {
			from: from.into(),
			to: to.into(),
			path,
		});
		self
	}

	pub fn models(&self) -> impl Iterator<Item = &str> {
		self.tables.keys().map(String::as_str)
	}
}

impl ModelMetadata for StaticMetadata {
	fn resolve_table(&self, model: &str) -> Option<TableSchema> {
		self.tables.get(model).cloned()
	}

	fn resolve_relationship(&self, from: &str, to: &str) -> Option<JoinPath> {
		self.relationships.iter().find_map(|r| {
			if r.from == from && r.to == to {
				Some(r.path.clone())
			} else if r.from == to && r.to == from {
				Some(r.path.reversed())
			} else {
				None
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn metadata() -> StaticMetadata {
		StaticMetadata::new()
			.table(
				TableSchema::new("Users", "users")
					.column("id", ColumnType::Integer)
					.column("name", ColumnType::Text),
			)
			.table(TableSchema::new("Posts", "posts").column("user_id", ColumnType::Integer))
			.relationship("Posts", "Users", JoinPath::new(["user_id"], ["id"]))
	}

	#[rstest]
	#[case("Users", "name", Some(ColumnType::Text))]
	#[case("Users", "missing", None)]
	#[case("Missing", "id", None)]
	fn test_resolve_column(#[case] model: &str, #[case] column: &str, #[case] expected: Option<ColumnType>) {
		assert_eq!(metadata().resolve_column(model, column), expected);
	}

	#[rstest]
	fn test_relationship_is_bidirectional() {
		let metadata = metadata();
		assert_eq!(
			metadata.resolve_relationship("Posts", "Users"),
			Some(JoinPath::new(["user_id"], ["id"]))
		);
		assert_eq!(
			metadata.resolve_relationship("Users", "Posts"),
			Some(JoinPath::new(["id"], ["user_id"]))
		);
		assert_eq!(metadata.resolve_relationship("Users", "Users"), None);
	}

	#[rstest]
	fn test_deserialize_from_json() {
		let json = serde_json::json!({
			"tables": {
				"Users": {
					"model": "Users",
					"table": "users",
					"columns": [{ "name": "id", "type": "integer" }]
				}
			}
		});
		let metadata: StaticMetadata = serde_json::from_value(json).unwrap();
		assert_eq!(metadata.resolve_column("Users", "id"), Some(ColumnType::Integer));
	}
}
