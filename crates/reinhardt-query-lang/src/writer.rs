//! SQL writer used by the translator
//!
//! [`SqlWriter`] accumulates SQL text interleaved with bind slots. Slots are
//! only numbered in [`SqlWriter::finish`], so fragments can be built
//! independently and spliced into dialect syntax templates in any order
//! while the final bind list still follows the order of appearance.

use crate::compiled::{BindParameter, BindSource, BindValue};
use crate::dialect::Dialect;
use crate::metadata::ColumnType;
use reinhardt_lang_core::ast::Literal;
use reinhardt_lang_core::error::Result;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
	Text(String),
	Bind { source: BindSource, ty: Option<ColumnType> },
}

/// SQL fragment under construction.
///
/// # Examples
///
/// ```
/// use reinhardt_query_lang::dialect::Dialect;
/// use reinhardt_query_lang::writer::SqlWriter;
/// use reinhardt_lang_core::ast::Literal;
///
/// let dialect = Dialect::postgres();
/// let mut writer = SqlWriter::new();
/// writer.push("SELECT");
/// writer.push_space();
/// writer.push_identifier("id", &dialect);
/// writer.push_keyword("FROM");
/// writer.push_space();
/// writer.push_identifier("users", &dialect);
/// writer.push_keyword("WHERE");
/// writer.push_space();
/// writer.push_identifier("age", &dialect);
/// writer.push(" > ");
/// writer.push_literal(&Literal::Integer(18), None);
///
/// let (sql, binds) = writer.finish(&dialect);
/// assert_eq!(sql, r#"SELECT "id" FROM "users" WHERE "age" > $1"#);
/// assert_eq!(binds.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlWriter {
	segments: Vec<Segment>,
}

impl SqlWriter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Writer holding `text` only.
	pub fn text(text: impl Into<String>) -> Self {
		let mut writer = Self::new();
		writer.push(&text.into());
		writer
	}

	/// Push raw SQL text
	pub fn push(&mut self, s: &str) {
		if s.is_empty() {
			return;
		}
		match self.segments.last_mut() {
			Some(Segment::Text(text)) => text.push_str(s),
			_ => self.segments.push(Segment::Text(s.to_string())),
		}
	}

	/// Push a space unless the fragment is empty or already ends with one
	pub fn push_space(&mut self) {
		let ends_with_space = match self.segments.last() {
			None => true,
			Some(Segment::Text(text)) => text.ends_with(' '),
			Some(Segment::Bind { .. }) => false,
		};
		if !ends_with_space {
			self.push(" ");
		}
	}

	/// Push a keyword with automatic spacing
	pub fn push_keyword(&mut self, keyword: &str) {
		self.push_space();
		self.push(keyword);
	}

	/// Push an identifier quoted for `dialect`
	pub fn push_identifier(&mut self, ident: &str, dialect: &Dialect) {
		self.push(&dialect.quote_identifier(ident));
	}

	/// Push `qualifier.ident`, both quoted
	pub fn push_qualified(&mut self, qualifier: &str, ident: &str, dialect: &Dialect) {
		self.push_identifier(qualifier, dialect);
		self.push(".");
		self.push_identifier(ident, dialect);
	}

	pub fn push_comma(&mut self) {
		self.push(", ");
	}

	/// Push a bind slot.
	pub fn push_bind(&mut self, source: BindSource, ty: Option<ColumnType>) {
		self.segments.push(Segment::Bind { source, ty });
	}

	/// Push a literal as a bind slot.
	///
	/// NULL is written inline as the keyword and consumes no slot. Returns
	/// whether a slot was used.
	pub fn push_literal(&mut self, literal: &Literal, ty: Option<ColumnType>) -> bool {
		match BindValue::from_literal(literal) {
			None => {
				self.push("NULL");
				false
			}
			Some(value) => {
				let ty = ty.or(Some(value.natural_type()));
				self.push_bind(BindSource::Literal(value), ty);
				true
			}
		}
	}

	/// Append another fragment, keeping its bind slots in order
	pub fn append(&mut self, other: SqlWriter) {
		for segment in other.segments {
			match segment {
				Segment::Text(text) => self.push(&text),
				bind => self.segments.push(bind),
			}
		}
	}

	/// Push a list of items with a separator
	pub fn push_list<I, T, F>(&mut self, items: I, separator: &str, mut f: F) -> Result<()>
	where
		I: IntoIterator<Item = T>,
		F: FnMut(&mut Self, T) -> Result<()>,
	{
		let mut first = true;
		for item in items {
			if !first {
				self.push(separator);
			}
			f(self, item)?;
			first = false;
		}
		Ok(())
	}

	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}

	/// Number of bind slots written so far
	pub fn bind_count(&self) -> usize {
		self.segments
			.iter()
			.filter(|s| matches!(s, Segment::Bind { .. }))
			.count()
	}

	/// Number slots in order and render placeholders for `dialect`.
	pub fn finish(self, dialect: &Dialect) -> (String, Vec<BindParameter>) {
		let mut sql = String::new();
		let mut binds = Vec::new();
		for segment in self.segments {
			match segment {
				Segment::Text(text) => sql.push_str(&text),
				Segment::Bind { source, ty } => {
					let index = binds.len() + 1;
					sql.push_str(&dialect.placeholder(index, &source));
					binds.push(BindParameter { index, source, ty });
				}
			}
		}
		(sql, binds)
	}
}
