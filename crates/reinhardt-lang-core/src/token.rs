//! Tokens produced by the [`Scanner`](crate::scanner::Scanner).

use crate::position::Position;
use std::fmt;

/// Token category.
///
/// Keywords and operators carry their canonical spelling from the
/// [`LanguageTable`](crate::table::LanguageTable) so grammars can match on
/// them without caring how the source spelled them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
	/// Reserved word
	Keyword(&'static str),
	/// Bare identifier
	Identifier,
	/// Bracket-quoted identifier (`[order]`)
	QuotedIdentifier,
	/// Quoted string literal, lexeme includes the quotes
	String,
	/// Integer literal
	Integer,
	/// Floating point literal
	Float,
	/// Operator or punctuation
	Operator(&'static str),
	/// Bind placeholder (`:name:` or `?0`)
	Placeholder,
	/// Literal text outside template directives
	RawText,
	/// `{%`
	OpenStatement,
	/// `%}`
	CloseStatement,
	/// `{{`
	OpenEcho,
	/// `}}`
	CloseEcho,
}

impl fmt::Display for TokenKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TokenKind::Keyword(kw) => write!(f, "keyword {}", kw),
			TokenKind::Identifier | TokenKind::QuotedIdentifier => f.write_str("identifier"),
			TokenKind::String => f.write_str("string"),
			TokenKind::Integer => f.write_str("integer"),
			TokenKind::Float => f.write_str("number"),
			TokenKind::Operator(op) => write!(f, "'{}'", op),
			TokenKind::Placeholder => f.write_str("placeholder"),
			TokenKind::RawText => f.write_str("text"),
			TokenKind::OpenStatement => f.write_str("statement opener"),
			TokenKind::CloseStatement => f.write_str("statement closer"),
			TokenKind::OpenEcho => f.write_str("echo opener"),
			TokenKind::CloseEcho => f.write_str("echo closer"),
		}
	}
}

/// A single token borrowed from the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
	pub kind: TokenKind,
	/// Exact source slice of the token
	pub lexeme: &'a str,
	/// Position of the first character
	pub position: Position,
}

impl<'a> Token<'a> {
	pub fn new(kind: TokenKind, lexeme: &'a str, position: Position) -> Self {
		Self {
			kind,
			lexeme,
			position,
		}
	}

	/// Whether this token is the keyword `keyword` (canonical spelling).
	pub fn is_keyword(&self, keyword: &str) -> bool {
		matches!(self.kind, TokenKind::Keyword(kw) if kw == keyword)
	}

	/// Whether this token is the operator `op`.
	pub fn is_operator(&self, op: &str) -> bool {
		matches!(self.kind, TokenKind::Operator(o) if o == op)
	}

	/// Canonical spelling used to match operator tables: the keyword or
	/// operator text, `None` for every other kind.
	pub fn symbol(&self) -> Option<&'static str> {
		match self.kind {
			TokenKind::Keyword(s) | TokenKind::Operator(s) => Some(s),
			_ => None,
		}
	}

	/// Short description used in "found ..." diagnostics.
	pub fn describe(&self) -> String {
		match self.kind {
			TokenKind::RawText => "text".to_string(),
			TokenKind::Keyword(kw) => format!("'{}'", kw),
			_ => format!("'{}'", self.lexeme),
		}
	}
}
