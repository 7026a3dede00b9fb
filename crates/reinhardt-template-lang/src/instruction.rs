//! Render instructions produced by the translator.
//!
//! A [`CompiledTemplate`] is a tree of [`Instruction`] sequences plus the
//! macros hoisted out of it. Escaping decisions are already folded into
//! [`Instruction::EmitExpr`], so a runtime never needs to track
//! `autoescape` scopes.

use crate::ast::{AssignOp, MacroParam, TemplateExpr};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Branch {
	pub condition: TemplateExpr,
	pub body: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "instruction", rename_all = "snake_case")]
pub enum Instruction {
	/// Write text verbatim
	EmitLiteral { text: String },
	/// Evaluate and write, HTML-escaped when `escape` is set
	EmitExpr { expr: TemplateExpr, escape: bool },
	/// Run the body of the first branch whose condition holds
	Branch {
		branches: Vec<Branch>,
		otherwise: Vec<Instruction>,
	},
	/// Iterate `iterable`; `otherwise` runs when nothing was iterated
	Loop {
		key: Option<String>,
		value: String,
		iterable: TemplateExpr,
		filter: Option<TemplateExpr>,
		body: Vec<Instruction>,
		otherwise: Vec<Instruction>,
	},
	Assign {
		target: String,
		op: AssignOp,
		value: TemplateExpr,
	},
	/// Evaluate for side effects only
	Evaluate { expr: TemplateExpr },
	Break,
	Continue,
	/// Overridable region
	Block { name: String, body: Vec<Instruction> },
	Include {
		template: TemplateExpr,
		with: Option<TemplateExpr>,
	},
	/// Region whose output may be reused for `lifetime` seconds
	Cache {
		key: TemplateExpr,
		lifetime: Option<i64>,
		body: Vec<Instruction>,
	},
	/// Custom directive; `body` is set for block directives
	Extension {
		name: String,
		args: Vec<TemplateExpr>,
		body: Option<Vec<Instruction>>,
	},
}

/// Macro hoisted out of the instruction stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroDefinition {
	pub params: Vec<MacroParam>,
	pub body: Vec<Instruction>,
}

/// Names a compiled template depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct References {
	/// Templates included by literal name
	pub includes: BTreeSet<String>,
	/// Free functions called anywhere in the template
	pub functions: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompiledTemplate {
	pub instructions: Vec<Instruction>,
	pub macros: BTreeMap<String, MacroDefinition>,
	/// Parent template for `{% extends %}`
	pub extends: Option<String>,
	pub references: References,
}

impl CompiledTemplate {
	/// Whether rendering always produces empty output.
	pub fn is_empty(&self) -> bool {
		self.instructions.is_empty() && self.extends.is_none()
	}

	/// Blocks declared at the top level, in order.
	pub fn blocks(&self) -> impl Iterator<Item = (&str, &[Instruction])> {
		self.instructions.iter().filter_map(|instruction| match instruction {
			Instruction::Block { name, body } => Some((name.as_str(), body.as_slice())),
			_ => None,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::translator::compile;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_instructions_serialize_with_tag() {
		let compiled = compile("{% set n += 1 %}{{ n }}").unwrap();

		let value = serde_json::to_value(&compiled.instructions).unwrap();

		assert_eq!(value[0]["instruction"], json!("assign"));
		assert_eq!(value[0]["target"], json!("n"));
		assert!(value[0].get("op").is_some());
		assert_eq!(value[1]["instruction"], json!("emit_expr"));
		assert_eq!(value[1]["escape"], json!(true));
	}
}
