//! Expression tree shared by both languages.
//!
//! The tree is generic over an extension payload `X` so each language can
//! add node kinds that only it understands (placeholders and `CASE` for
//! queries, filters and tests for templates) while reusing the common
//! operators, calls, member access and literals.

use crate::position::Position;
use serde::Serialize;
use std::fmt;

/// Literal value as written in source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
	Null,
	Boolean(bool),
	Integer(i64),
	Float(f64),
	String(String),
}

impl fmt::Display for Literal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Literal::Null => f.write_str("null"),
			Literal::Boolean(b) => write!(f, "{}", b),
			Literal::Integer(i) => write!(f, "{}", i),
			Literal::Float(v) => write!(f, "{}", v),
			Literal::String(s) => write!(f, "'{}'", s),
		}
	}
}

/// Binary operators understood by at least one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
	Or,
	And,
	Eq,
	NotEq,
	/// `===`
	Identical,
	/// `!==`
	NotIdentical,
	Lt,
	Gt,
	LtEq,
	GtEq,
	Like,
	NotLike,
	ILike,
	NotILike,
	In,
	NotIn,
	Add,
	Sub,
	Mul,
	Div,
	/// `//`
	FloorDiv,
	Mod,
	/// `**`
	Pow,
	/// String concatenation (`||` in queries, `~` in templates)
	Concat,
	/// `a..b`
	Range,
	BitAnd,
	BitOr,
	BitXor,
}

impl BinaryOp {
	/// Neutral spelling used in diagnostics and dialect lookups.
	pub fn name(self) -> &'static str {
		match self {
			BinaryOp::Or => "OR",
			BinaryOp::And => "AND",
			BinaryOp::Eq => "=",
			BinaryOp::NotEq => "<>",
			BinaryOp::Identical => "===",
			BinaryOp::NotIdentical => "!==",
			BinaryOp::Lt => "<",
			BinaryOp::Gt => ">",
			BinaryOp::LtEq => "<=",
			BinaryOp::GtEq => ">=",
			BinaryOp::Like => "LIKE",
			BinaryOp::NotLike => "NOT LIKE",
			BinaryOp::ILike => "ILIKE",
			BinaryOp::NotILike => "NOT ILIKE",
			BinaryOp::In => "IN",
			BinaryOp::NotIn => "NOT IN",
			BinaryOp::Add => "+",
			BinaryOp::Sub => "-",
			BinaryOp::Mul => "*",
			BinaryOp::Div => "/",
			BinaryOp::FloorDiv => "//",
			BinaryOp::Mod => "%",
			BinaryOp::Pow => "**",
			BinaryOp::Concat => "||",
			BinaryOp::Range => "..",
			BinaryOp::BitAnd => "&",
			BinaryOp::BitOr => "|",
			BinaryOp::BitXor => "^",
		}
	}
}

impl fmt::Display for BinaryOp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
	Not,
	Neg,
	Plus,
	BitNot,
}

impl UnaryOp {
	pub fn name(self) -> &'static str {
		match self {
			UnaryOp::Not => "NOT",
			UnaryOp::Neg => "-",
			UnaryOp::Plus => "+",
			UnaryOp::BitNot => "~",
		}
	}
}

impl fmt::Display for UnaryOp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Call argument, optionally named (`f(limit: 3)`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Argument<X> {
	pub name: Option<String>,
	pub value: Expr<X>,
}

/// List literal element, optionally keyed (`['a': 1]`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem<X> {
	pub key: Option<String>,
	pub value: Expr<X>,
}

/// Expression node with the position of its first token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr<X> {
	pub kind: ExprKind<X>,
	pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind<X> {
	Literal(Literal),
	Identifier(String),
	Unary {
		op: UnaryOp,
		operand: Box<Expr<X>>,
	},
	Binary {
		op: BinaryOp,
		left: Box<Expr<X>>,
		right: Box<Expr<X>>,
	},
	Call {
		callee: Box<Expr<X>>,
		args: Vec<Argument<X>>,
		distinct: bool,
	},
	Member {
		object: Box<Expr<X>>,
		property: String,
	},
	Index {
		object: Box<Expr<X>>,
		index: Box<Expr<X>>,
	},
	Slice {
		object: Box<Expr<X>>,
		start: Option<Box<Expr<X>>>,
		end: Option<Box<Expr<X>>>,
	},
	List(Vec<ListItem<X>>),
	/// Parenthesized expression, kept so output can preserve grouping
	Grouped(Box<Expr<X>>),
	Conditional {
		condition: Box<Expr<X>>,
		then: Box<Expr<X>>,
		otherwise: Box<Expr<X>>,
	},
	/// Language-specific node
	Ext(X),
}

/// Language-specific expression payload.
///
/// Extensions that embed sub-expressions report them through
/// [`for_each_child`](ExprExtension::for_each_child) so generic walks see
/// the whole tree.
pub trait ExprExtension: Sized {
	fn for_each_child<'e>(&'e self, _visit: &mut dyn FnMut(&'e Expr<Self>)) {}
}

impl ExprExtension for () {}

impl<X> Expr<X> {
	pub fn new(kind: ExprKind<X>, position: Position) -> Self {
		Self { kind, position }
	}

	pub fn literal(literal: Literal, position: Position) -> Self {
		Self::new(ExprKind::Literal(literal), position)
	}

	/// Name of a bare identifier expression.
	pub fn as_identifier(&self) -> Option<&str> {
		match &self.kind {
			ExprKind::Identifier(name) => Some(name),
			_ => None,
		}
	}

	/// Strip any number of enclosing parentheses.
	pub fn ungrouped(&self) -> &Expr<X> {
		match &self.kind {
			ExprKind::Grouped(inner) => inner.ungrouped(),
			_ => self,
		}
	}
}

impl<X: ExprExtension> Expr<X> {
	/// Visit the direct children of this node.
	pub fn for_each_child<'e>(&'e self, visit: &mut dyn FnMut(&'e Expr<X>)) {
		match &self.kind {
			ExprKind::Literal(_) | ExprKind::Identifier(_) => {}
			ExprKind::Unary { operand, .. } => visit(operand),
			ExprKind::Binary { left, right, .. } => {
				visit(left);
				visit(right);
			}
			ExprKind::Call { callee, args, .. } => {
				visit(callee);
				args.iter().for_each(|arg| visit(&arg.value));
			}
			ExprKind::Member { object, .. } => visit(object),
			ExprKind::Index { object, index } => {
				visit(object);
				visit(index);
			}
			ExprKind::Slice { object, start, end } => {
				visit(object);
				if let Some(start) = start {
					visit(start);
				}
				if let Some(end) = end {
					visit(end);
				}
			}
			ExprKind::List(items) => items.iter().for_each(|item| visit(&item.value)),
			ExprKind::Grouped(inner) => visit(inner),
			ExprKind::Conditional {
				condition,
				then,
				otherwise,
			} => {
				visit(condition);
				visit(then);
				visit(otherwise);
			}
			ExprKind::Ext(ext) => ext.for_each_child(visit),
		}
	}

	/// Pre-order walk over this node and every descendant.
	pub fn walk<'e>(&'e self, visit: &mut dyn FnMut(&'e Expr<X>)) {
		visit(self);
		self.for_each_child(&mut |child| child.walk(visit));
	}
}
