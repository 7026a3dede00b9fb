//! Grammar descriptions consumed by the shared expression parser.
//!
//! A [`Grammar`] supplies a language table, binary and prefix operator
//! tables with precedence and associativity, and two hooks for syntax the
//! tables cannot express.

use crate::ast::{BinaryOp, Expr, ExprExtension, UnaryOp};
use crate::error::Result;
use crate::parser::Parser;
use crate::table::LanguageTable;
use std::fmt;

/// Operator associativity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
	Left,
	Right,
}

/// A binary operator spelled as one or more tokens (`NOT LIKE`).
#[derive(Debug, Clone, Copy)]
pub struct OperatorSpec {
	/// Canonical keyword or operator spellings, matched in sequence
	pub tokens: &'static [&'static str],
	pub op: BinaryOp,
	/// Higher binds tighter; must be at least 1
	pub precedence: u8,
	pub assoc: Assoc,
}

/// A prefix operator.
#[derive(Debug, Clone, Copy)]
pub struct PrefixSpec {
	pub token: &'static str,
	pub op: UnaryOp,
	/// Precedence of the operand: `NOT a = b` parses as `NOT (a = b)` when
	/// this is at or below the precedence of `=`
	pub precedence: u8,
}

/// Outcome of [`Grammar::infix_extension`].
#[derive(Debug)]
pub enum Infix<X> {
	/// The hook consumed an operator and produced a new left operand
	Handled(Expr<X>),
	/// Nothing applicable; the left operand is handed back unchanged
	NotHandled(Expr<X>),
}

/// Syntax description of one language.
pub trait Grammar: Copy {
	/// Language-specific expression payload
	type Ext: ExprExtension + fmt::Debug + Clone + PartialEq;

	fn table(&self) -> &'static LanguageTable;

	fn binary_operators(&self) -> &'static [OperatorSpec];

	fn prefix_operators(&self) -> &'static [PrefixSpec];

	/// Parse a primary expression the shared parser does not know.
	///
	/// Runs before the built-in primaries; return `Ok(None)` without
	/// consuming input to fall through.
	fn primary_extension(&self, _parser: &mut Parser<'_, Self>) -> Result<Option<Expr<Self::Ext>>> {
		Ok(None)
	}

	/// Parse a postfix or infix construct after `left`.
	///
	/// Called when no table operator follows `left`. Implementations must
	/// hand `left` back untouched when they do not consume anything, and
	/// must respect `min_precedence` the same way table operators do.
	fn infix_extension(
		&self,
		_parser: &mut Parser<'_, Self>,
		left: Expr<Self::Ext>,
		_min_precedence: u8,
	) -> Result<Infix<Self::Ext>> {
		Ok(Infix::NotHandled(left))
	}
}
