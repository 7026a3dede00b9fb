//! Template syntax tree.
//!
//! Expressions reuse the shared [`Expr`] tree with [`TemplateExt`] for
//! filters and tests. Directives form a nested [`Node`] tree; directives the
//! parser does not know are kept flat as [`NodeKind::Tag`] and
//! [`NodeKind::EndTag`] and paired up by the translator.

use reinhardt_lang_core::ast::{Argument, Expr, ExprExtension, Literal};
use reinhardt_lang_core::position::Position;
use serde::Serialize;

pub type TemplateExpr = Expr<TemplateExt>;

/// Template-only expression nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateExt {
	/// `expr|name(args)`
	Filter {
		expr: Box<TemplateExpr>,
		name: String,
		args: Vec<Argument<TemplateExt>>,
	},
	/// `expr is [not] defined`
	Defined { expr: Box<TemplateExpr>, negated: bool },
	/// `expr is [not] name(args)`
	Test {
		expr: Box<TemplateExpr>,
		name: String,
		args: Vec<Argument<TemplateExt>>,
		negated: bool,
	},
}

impl ExprExtension for TemplateExt {
	fn for_each_child<'e>(&'e self, visit: &mut dyn FnMut(&'e Expr<Self>)) {
		match self {
			TemplateExt::Filter { expr, args, .. } | TemplateExt::Test { expr, args, .. } => {
				visit(expr);
				args.iter().for_each(|arg| visit(&arg.value));
			}
			TemplateExt::Defined { expr, .. } => visit(expr),
		}
	}
}

/// Compound assignment operator of `{% set %}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOp {
	Assign,
	Add,
	Sub,
	Mul,
	Div,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
	pub target: String,
	pub op: AssignOp,
	pub value: TemplateExpr,
	pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfBranch {
	pub condition: TemplateExpr,
	pub body: Vec<Node>,
}

/// Macro parameter; defaults are restricted to literals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroParam {
	pub name: String,
	pub default: Option<Literal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
	pub kind: NodeKind,
	pub position: Position,
}

impl Node {
	pub fn new(kind: NodeKind, position: Position) -> Self {
		Self { kind, position }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum NodeKind {
	Text {
		text: String,
	},
	Echo {
		expr: TemplateExpr,
		/// Output marked with an outer `|raw`, which is stripped from `expr`
		raw: bool,
	},
	If {
		branches: Vec<IfBranch>,
		otherwise: Option<Vec<Node>>,
	},
	For {
		key: Option<String>,
		value: String,
		iterable: TemplateExpr,
		filter: Option<TemplateExpr>,
		body: Vec<Node>,
		otherwise: Option<Vec<Node>>,
	},
	Set {
		assignments: Vec<Assignment>,
	},
	Block {
		name: String,
		body: Vec<Node>,
	},
	Extends {
		template: String,
	},
	Include {
		template: TemplateExpr,
		with: Option<TemplateExpr>,
	},
	Macro {
		name: String,
		params: Vec<MacroParam>,
		body: Vec<Node>,
	},
	Cache {
		key: TemplateExpr,
		lifetime: Option<i64>,
		body: Vec<Node>,
	},
	Autoescape {
		enabled: bool,
		body: Vec<Node>,
	},
	Do {
		expr: TemplateExpr,
	},
	Break,
	Continue,
	/// `{% name args %}` for a directive the parser does not know
	Tag {
		name: String,
		args: Vec<TemplateExpr>,
	},
	/// `{% endname %}` matching a [`NodeKind::Tag`]
	EndTag {
		name: String,
	},
}

/// Parsed template.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Template {
	pub nodes: Vec<Node>,
}

impl Template {
	/// Parent template name when the template starts with `{% extends %}`.
	pub fn extends(&self) -> Option<&str> {
		self.nodes.iter().find_map(|node| match &node.kind {
			NodeKind::Extends { template } => Some(template.as_str()),
			_ => None,
		})
	}
}
