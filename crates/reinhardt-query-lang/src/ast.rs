//! Statement tree of the query language.

use reinhardt_lang_core::ast::{Expr, ExprExtension};
use reinhardt_lang_core::position::Position;
use serde::Serialize;
use std::fmt;

/// Expression node of the query language.
pub type QueryExpr = Expr<QueryExt>;

/// Bind placeholder written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
	/// `:name:`
	Named(String),
	/// `?0`
	Numbered(u32),
}

/// `WHEN condition THEN result`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhenClause {
	pub condition: QueryExpr,
	pub result: QueryExpr,
}

/// Query-only expression nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryExt {
	Placeholder(Placeholder),
	/// `*` in a projection or `COUNT(*)`
	Star,
	/// `Model.*`
	QualifiedStar(String),
	Between {
		expr: Box<QueryExpr>,
		low: Box<QueryExpr>,
		high: Box<QueryExpr>,
		negated: bool,
	},
	IsNull {
		expr: Box<QueryExpr>,
		negated: bool,
	},
	Case {
		operand: Option<Box<QueryExpr>>,
		branches: Vec<WhenClause>,
		otherwise: Option<Box<QueryExpr>>,
	},
	Cast {
		expr: Box<QueryExpr>,
		target: String,
	},
	Exists(Box<Select>),
	Subquery(Box<Select>),
}

impl ExprExtension for QueryExt {
	// Subqueries open their own scope and are not walked into.
	fn for_each_child<'e>(&'e self, visit: &mut dyn FnMut(&'e QueryExpr)) {
		match self {
			QueryExt::Placeholder(_)
			| QueryExt::Star
			| QueryExt::QualifiedStar(_)
			| QueryExt::Exists(_)
			| QueryExt::Subquery(_) => {}
			QueryExt::Between { expr, low, high, .. } => {
				visit(expr);
				visit(low);
				visit(high);
			}
			QueryExt::IsNull { expr, .. } | QueryExt::Cast { expr, .. } => visit(expr),
			QueryExt::Case {
				operand,
				branches,
				otherwise,
			} => {
				if let Some(operand) = operand {
					visit(operand);
				}
				for branch in branches {
					visit(&branch.condition);
					visit(&branch.result);
				}
				if let Some(otherwise) = otherwise {
					visit(otherwise);
				}
			}
		}
	}
}

/// A model referenced in `FROM`, `JOIN`, `INSERT INTO`, `UPDATE` or
/// `DELETE FROM`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
	pub model: String,
	pub alias: Option<String>,
	pub position: Position,
}

impl Source {
	/// Name the source is referenced by inside the statement.
	pub fn reference_name(&self) -> &str {
		self.alias.as_deref().unwrap_or(&self.model)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
	Inner,
	Left,
	Right,
	Full,
	Cross,
}

impl fmt::Display for JoinKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			JoinKind::Inner => "INNER JOIN",
			JoinKind::Left => "LEFT JOIN",
			JoinKind::Right => "RIGHT JOIN",
			JoinKind::Full => "FULL JOIN",
			JoinKind::Cross => "CROSS JOIN",
		})
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Join {
	pub kind: JoinKind,
	pub source: Source,
	/// `None` when the relationship from metadata should be used
	pub condition: Option<QueryExpr>,
	pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
	pub expr: QueryExpr,
	pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
	Asc,
	Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
	pub expr: QueryExpr,
	pub direction: Option<Direction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitClause {
	pub count: QueryExpr,
	pub offset: Option<QueryExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Select {
	pub distinct: bool,
	pub projections: Vec<Projection>,
	pub from: Vec<Source>,
	pub joins: Vec<Join>,
	pub filter: Option<QueryExpr>,
	pub group_by: Vec<QueryExpr>,
	pub having: Option<QueryExpr>,
	pub order_by: Vec<OrderItem>,
	pub limit: Option<LimitClause>,
	pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insert {
	pub source: Source,
	/// Explicit column list; empty means every column in metadata order
	pub columns: Vec<(String, Position)>,
	pub rows: Vec<Vec<QueryExpr>>,
	pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
	pub column: String,
	pub position: Position,
	pub value: QueryExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
	pub source: Source,
	pub assignments: Vec<Assignment>,
	pub filter: Option<QueryExpr>,
	pub limit: Option<QueryExpr>,
	pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delete {
	pub source: Source,
	pub filter: Option<QueryExpr>,
	pub limit: Option<QueryExpr>,
	pub position: Position,
}

/// A parsed query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "statement", rename_all = "snake_case")]
pub enum Statement {
	Select(Select),
	Insert(Insert),
	Update(Update),
	Delete(Delete),
	/// Blank source (whitespace and comments only)
	Empty,
}
