//! Output of the query translator.

use crate::metadata::ColumnType;
use reinhardt_lang_core::ast::Literal;
use serde::Serialize;

/// A literal value lifted out of the query text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BindValue {
	Boolean(bool),
	Integer(i64),
	Float(f64),
	String(String),
}

impl BindValue {
	/// Bind value for a literal; `None` for `NULL`, which is written inline.
	pub fn from_literal(literal: &Literal) -> Option<Self> {
		match literal {
			Literal::Null => None,
			Literal::Boolean(b) => Some(BindValue::Boolean(*b)),
			Literal::Integer(i) => Some(BindValue::Integer(*i)),
			Literal::Float(f) => Some(BindValue::Float(*f)),
			Literal::String(s) => Some(BindValue::String(s.clone())),
		}
	}

	/// Column type a value of this kind naturally binds as.
	pub fn natural_type(&self) -> ColumnType {
		match self {
			BindValue::Boolean(_) => ColumnType::Boolean,
			BindValue::Integer(_) => ColumnType::Integer,
			BindValue::Float(_) => ColumnType::Float,
			BindValue::String(_) => ColumnType::Text,
		}
	}
}

/// Where the driver takes a bind's value from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BindSource {
	/// Literal written in the query
	Literal(BindValue),
	/// Caller-supplied `:name:` parameter
	Named(String),
	/// Caller-supplied `?n` parameter
	Numbered(u32),
}

/// One placeholder in the generated SQL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindParameter {
	/// 1-based position among the statement's placeholders
	pub index: usize,
	pub source: BindSource,
	/// Inferred column type, `None` when nothing constrains it
	pub ty: Option<ColumnType>,
}

/// SQL text and its ordered bind list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
	pub sql: String,
	/// In order of appearance in `sql`
	pub binds: Vec<BindParameter>,
	/// Name of the dialect the SQL targets
	pub dialect: String,
}

impl CompiledQuery {
	/// Literal bind values in order; caller-supplied binds are skipped.
	pub fn literal_values(&self) -> Vec<&BindValue> {
		self.binds
			.iter()
			.filter_map(|b| match &b.source {
				BindSource::Literal(value) => Some(value),
				_ => None,
			})
			.collect()
	}

	pub fn is_empty(&self) -> bool {
		self.sql.is_empty()
	}
}
