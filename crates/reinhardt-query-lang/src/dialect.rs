//! SQL dialects
//!
//! A [`Dialect`] is an immutable value describing how one database spells
//! identifiers, placeholders and every operator, join, limit form and
//! function the translator can emit. Each of those is a [`Construct`]
//! mapped to a [`SyntaxTemplate`] whose `{0}`, `{1}` … slots receive the
//! translated operands and `{*}` receives all of them comma separated.
//! A construct missing from the table is reported as
//! [`Error::Dialect`](reinhardt_lang_core::Error::Dialect).

use crate::ast::JoinKind;
use crate::compiled::BindSource;
use crate::writer::SqlWriter;
use reinhardt_lang_core::ast::{BinaryOp, UnaryOp};
use reinhardt_lang_core::error::{Error, Result};
use reinhardt_lang_core::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How bind placeholders are spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
	/// `?`
	Question,
	/// `$1`, `$2`, …
	Numbered,
	/// `:name` for named binds, `:p1`, `:p2`, … otherwise
	Named,
}

/// Dialect table key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Construct {
	Binary(BinaryOp),
	Unary(UnaryOp),
	Join(JoinKind),
	/// `LIMIT n` on a select
	Limit,
	/// `LIMIT n OFFSET m` on a select; `{0}` is the count, `{1}` the offset
	LimitOffset,
	UpdateLimit,
	DeleteLimit,
	/// Function call by upper-cased name
	Function(String),
}

impl fmt::Display for Construct {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Construct::Binary(op) => write!(f, "{}", op),
			Construct::Unary(op) => write!(f, "unary {}", op),
			Construct::Join(kind) => write!(f, "{}", kind),
			Construct::Limit => f.write_str("LIMIT"),
			Construct::LimitOffset => f.write_str("LIMIT with OFFSET"),
			Construct::UpdateLimit => f.write_str("UPDATE with LIMIT"),
			Construct::DeleteLimit => f.write_str("DELETE with LIMIT"),
			Construct::Function(name) => write!(f, "{}()", name),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
	Text(String),
	Slot(usize),
	All,
}

/// Output shape of one construct, e.g. `CONCAT({0}, {1})`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTemplate {
	source: String,
	parts: Vec<Part>,
}

impl SyntaxTemplate {
	pub fn parse(source: &str) -> Self {
		let mut parts = Vec::new();
		let mut text = String::new();
		let mut rest = source;
		while let Some(open) = rest.find('{') {
			text.push_str(&rest[..open]);
			let after = &rest[open + 1..];
			let slot = after.find('}').and_then(|close| {
				let inner = &after[..close];
				let part = if inner == "*" {
					Some(Part::All)
				} else {
					inner.parse::<usize>().ok().map(Part::Slot)
				};
				part.map(|p| (p, close))
			});
			match slot {
				Some((part, close)) => {
					if !text.is_empty() {
						parts.push(Part::Text(std::mem::take(&mut text)));
					}
					parts.push(part);
					rest = &after[close + 1..];
				}
				None => {
					text.push('{');
					rest = after;
				}
			}
		}
		text.push_str(rest);
		if !text.is_empty() {
			parts.push(Part::Text(text));
		}
		Self {
			source: source.to_string(),
			parts,
		}
	}

	pub fn as_str(&self) -> &str {
		&self.source
	}

	/// Splice `args` into the template.
	pub fn apply(&self, args: &[SqlWriter], position: Position) -> Result<SqlWriter> {
		let mut out = SqlWriter::new();
		for part in &self.parts {
			match part {
				Part::Text(text) => out.push(text),
				Part::Slot(i) => {
					let arg = args.get(*i).ok_or_else(|| {
						Error::invalid(
							position,
							format!("syntax template '{}' expects at least {} operands", self.source, i + 1),
						)
					})?;
					out.append(arg.clone());
				}
				Part::All => {
					for (i, arg) in args.iter().enumerate() {
						if i > 0 {
							out.push_comma();
						}
						out.append(arg.clone());
					}
				}
			}
		}
		Ok(out)
	}
}

/// Identifier quoting, placeholder style and construct table of a database.
///
/// # Examples
///
/// ```
/// use reinhardt_query_lang::dialect::{Construct, Dialect};
/// use reinhardt_lang_core::ast::BinaryOp;
///
/// let dialect = Dialect::mysql();
/// assert_eq!(dialect.quote_identifier("order"), "`order`");
/// assert!(!dialect.supports(&Construct::Binary(BinaryOp::ILike)));
///
/// let patched = dialect.with_construct(Construct::Binary(BinaryOp::ILike), "LOWER({0}) LIKE LOWER({1})");
/// assert!(patched.supports(&Construct::Binary(BinaryOp::ILike)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Dialect {
	name: String,
	open_quote: char,
	close_quote: char,
	placeholder_style: PlaceholderStyle,
	constructs: HashMap<Construct, SyntaxTemplate>,
}

impl Dialect {
	/// Dialect with no constructs at all.
	pub fn new(
		name: impl Into<String>,
		quotes: (char, char),
		placeholder_style: PlaceholderStyle,
	) -> Self {
		Self {
			name: name.into(),
			open_quote: quotes.0,
			close_quote: quotes.1,
			placeholder_style,
			constructs: HashMap::new(),
		}
	}

	/// ANSI flavored dialect: `"` quoting, `?` placeholders, everything the
	/// translator can emit.
	pub fn generic() -> Self {
		Self::new("generic", ('"', '"'), PlaceholderStyle::Question)
			.with_standard_constructs()
			.with_construct(Construct::Binary(BinaryOp::ILike), "{0} ILIKE {1}")
			.with_construct(Construct::Binary(BinaryOp::NotILike), "{0} NOT ILIKE {1}")
			.with_construct(Construct::Join(JoinKind::Right), "RIGHT JOIN {0} ON {1}")
			.with_construct(Construct::Join(JoinKind::Full), "FULL JOIN {0} ON {1}")
			.with_construct(Construct::UpdateLimit, "LIMIT {0}")
			.with_construct(Construct::DeleteLimit, "LIMIT {0}")
	}

	pub fn postgres() -> Self {
		Self::new("postgres", ('"', '"'), PlaceholderStyle::Numbered)
			.with_standard_constructs()
			.with_construct(Construct::Binary(BinaryOp::ILike), "{0} ILIKE {1}")
			.with_construct(Construct::Binary(BinaryOp::NotILike), "{0} NOT ILIKE {1}")
			.with_construct(Construct::Binary(BinaryOp::BitXor), "{0} # {1}")
			.with_construct(Construct::Join(JoinKind::Right), "RIGHT JOIN {0} ON {1}")
			.with_construct(Construct::Join(JoinKind::Full), "FULL JOIN {0} ON {1}")
	}

	pub fn mysql() -> Self {
		Self::new("mysql", ('`', '`'), PlaceholderStyle::Question)
			.with_standard_constructs()
			.with_construct(Construct::Binary(BinaryOp::Concat), "CONCAT({0}, {1})")
			.with_construct(Construct::Join(JoinKind::Right), "RIGHT JOIN {0} ON {1}")
			.with_construct(Construct::LimitOffset, "LIMIT {1}, {0}")
			.with_construct(Construct::UpdateLimit, "LIMIT {0}")
			.with_construct(Construct::DeleteLimit, "LIMIT {0}")
			.with_construct(Construct::Function("LENGTH".into()), "CHAR_LENGTH({0})")
	}

	pub fn sqlite() -> Self {
		Self::new("sqlite", ('"', '"'), PlaceholderStyle::Question)
			.with_standard_constructs()
			.with_construct(Construct::Function("NOW".into()), "CURRENT_TIMESTAMP")
	}

	/// Built-in dialect by name.
	pub fn by_name(name: &str) -> Option<Self> {
		match name.to_ascii_lowercase().as_str() {
			"generic" => Some(Self::generic()),
			"postgres" | "postgresql" => Some(Self::postgres()),
			"mysql" => Some(Self::mysql()),
			"sqlite" => Some(Self::sqlite()),
			_ => None,
		}
	}

	fn with_standard_constructs(mut self) -> Self {
		let binary = [
			(BinaryOp::Or, "{0} OR {1}"),
			(BinaryOp::And, "{0} AND {1}"),
			(BinaryOp::Eq, "{0} = {1}"),
			(BinaryOp::NotEq, "{0} <> {1}"),
			(BinaryOp::Lt, "{0} < {1}"),
			(BinaryOp::Gt, "{0} > {1}"),
			(BinaryOp::LtEq, "{0} <= {1}"),
			(BinaryOp::GtEq, "{0} >= {1}"),
			(BinaryOp::Like, "{0} LIKE {1}"),
			(BinaryOp::NotLike, "{0} NOT LIKE {1}"),
			(BinaryOp::In, "{0} IN {1}"),
			(BinaryOp::NotIn, "{0} NOT IN {1}"),
			(BinaryOp::Add, "{0} + {1}"),
			(BinaryOp::Sub, "{0} - {1}"),
			(BinaryOp::Mul, "{0} * {1}"),
			(BinaryOp::Div, "{0} / {1}"),
			(BinaryOp::Mod, "{0} % {1}"),
			(BinaryOp::Concat, "{0} || {1}"),
			(BinaryOp::BitAnd, "{0} & {1}"),
			(BinaryOp::BitOr, "{0} | {1}"),
			(BinaryOp::BitXor, "{0} ^ {1}"),
		];
		for (op, template) in binary {
			self.constructs
				.insert(Construct::Binary(op), SyntaxTemplate::parse(template));
		}

		let unary = [
			(UnaryOp::Not, "NOT {0}"),
			(UnaryOp::Neg, "-{0}"),
			(UnaryOp::Plus, "+{0}"),
			(UnaryOp::BitNot, "~{0}"),
		];
		for (op, template) in unary {
			self.constructs
				.insert(Construct::Unary(op), SyntaxTemplate::parse(template));
		}

		let functions = [
			("COUNT", "COUNT({*})"),
			("SUM", "SUM({*})"),
			("AVG", "AVG({*})"),
			("MIN", "MIN({*})"),
			("MAX", "MAX({*})"),
			("LOWER", "LOWER({0})"),
			("UPPER", "UPPER({0})"),
			("LENGTH", "LENGTH({0})"),
			("ABS", "ABS({0})"),
			("ROUND", "ROUND({*})"),
			("COALESCE", "COALESCE({*})"),
			("NOW", "NOW()"),
		];
		for (name, template) in functions {
			self.constructs.insert(
				Construct::Function(name.to_string()),
				SyntaxTemplate::parse(template),
			);
		}

		self.constructs.insert(
			Construct::Join(JoinKind::Inner),
			SyntaxTemplate::parse("INNER JOIN {0} ON {1}"),
		);
		self.constructs.insert(
			Construct::Join(JoinKind::Left),
			SyntaxTemplate::parse("LEFT JOIN {0} ON {1}"),
		);
		self.constructs.insert(
			Construct::Join(JoinKind::Cross),
			SyntaxTemplate::parse("CROSS JOIN {0}"),
		);
		self.constructs
			.insert(Construct::Limit, SyntaxTemplate::parse("LIMIT {0}"));
		self.constructs.insert(
			Construct::LimitOffset,
			SyntaxTemplate::parse("LIMIT {0} OFFSET {1}"),
		);
		self
	}

	/// Copy of this dialect with `construct` mapped to `template`.
	pub fn with_construct(mut self, construct: Construct, template: &str) -> Self {
		self.constructs
			.insert(construct, SyntaxTemplate::parse(template));
		self
	}

	/// Copy of this dialect without `construct`.
	pub fn without_construct(mut self, construct: &Construct) -> Self {
		self.constructs.remove(construct);
		self
	}

	/// Rename the dialect, e.g. after customizing a built-in one.
	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn placeholder_style(&self) -> PlaceholderStyle {
		self.placeholder_style
	}

	pub fn supports(&self, construct: &Construct) -> bool {
		self.constructs.contains_key(construct)
	}

	pub fn template(&self, construct: &Construct) -> Option<&SyntaxTemplate> {
		self.constructs.get(construct)
	}

	/// Quote an identifier, doubling any embedded closing quote.
	pub fn quote_identifier(&self, ident: &str) -> String {
		let close = self.close_quote.to_string();
		let escaped = ident.replace(self.close_quote, &format!("{}{}", close, close));
		format!("{}{}{}", self.open_quote, escaped, self.close_quote)
	}

	/// Placeholder text for the bind at 1-based `index`.
	pub fn placeholder(&self, index: usize, source: &BindSource) -> String {
		match (self.placeholder_style, source) {
			(PlaceholderStyle::Question, _) => "?".to_string(),
			(PlaceholderStyle::Numbered, _) => format!("${}", index),
			(PlaceholderStyle::Named, BindSource::Named(name)) => format!(":{}", name),
			(PlaceholderStyle::Named, _) => format!(":p{}", index),
		}
	}

	/// Render `construct` with `args`, failing when the dialect lacks it.
	pub fn render(&self, construct: &Construct, args: &[SqlWriter], position: Position) -> Result<SqlWriter> {
		let template = self.template(construct).ok_or_else(|| Error::Dialect {
			construct: construct.to_string(),
			dialect: self.name.clone(),
			position,
		})?;
		template.apply(args, position)
	}

	/// Deterministic description of everything that affects output, used to
	/// tell customized dialects apart in cache fingerprints.
	pub fn signature(&self) -> String {
		let mut entries: Vec<String> = self
			.constructs
			.iter()
			.map(|(construct, template)| format!("{:?}={}", construct, template.as_str()))
			.collect();
		entries.sort();
		format!(
			"{}|{}{}|{:?}|{}",
			self.name,
			self.open_quote,
			self.close_quote,
			self.placeholder_style,
			entries.join(";")
		)
	}
}

impl Default for Dialect {
	fn default() -> Self {
		Self::generic()
	}
}
