//! Template translator
//!
//! Lowers the [`Template`] node tree to [`Instruction`] sequences:
//!
//! - text and echoes become emit instructions, with the escaping decision
//!   resolved from `autoescape` scopes, the raw marker and outer escape
//!   filters
//! - control flow becomes nested instruction sequences
//! - macros are hoisted into [`CompiledTemplate::macros`]
//! - custom `{% name %}` / `{% endname %}` pairs are matched against the
//!   [`ExtensionTable`]

use crate::ast::{MacroParam, Node, NodeKind, Template, TemplateExpr, TemplateExt};
use crate::extension::{ExtensionTable, TagKind};
use crate::instruction::{Branch, CompiledTemplate, Instruction, MacroDefinition, References};
use crate::parser::parse_template;
use reinhardt_lang_core::ast::{ExprKind, Literal};
use reinhardt_lang_core::error::{Error, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Parse and translate `source` with autoescaping and no custom directives.
///
/// # Examples
///
/// ```
/// use reinhardt_template_lang::instruction::Instruction;
/// use reinhardt_template_lang::translator::compile;
///
/// let compiled = compile("Hello {{ name }}!").unwrap();
/// assert!(matches!(
///     &compiled.instructions[1],
///     Instruction::EmitExpr { escape: true, .. }
/// ));
/// ```
pub fn compile(source: &str) -> Result<CompiledTemplate> {
	translate(&parse_template(source)?)
}

/// Translate with autoescaping and no custom directives.
pub fn translate(template: &Template) -> Result<CompiledTemplate> {
	let extensions = ExtensionTable::new();
	TemplateTranslator::new(&extensions).translate(template)
}

/// Configurable translator.
#[derive(Debug, Clone, Copy)]
pub struct TemplateTranslator<'t> {
	extensions: &'t ExtensionTable,
	autoescape: bool,
}

impl<'t> TemplateTranslator<'t> {
	pub fn new(extensions: &'t ExtensionTable) -> Self {
		Self {
			extensions,
			autoescape: true,
		}
	}

	/// Initial escaping mode outside any `{% autoescape %}` directive.
	pub fn with_autoescape(mut self, autoescape: bool) -> Self {
		self.autoescape = autoescape;
		self
	}

	pub fn translate(&self, template: &Template) -> Result<CompiledTemplate> {
		let mut state = State {
			extensions: self.extensions,
			macros: BTreeMap::new(),
			references: References::default(),
			extends: None,
		};
		let instructions = state.nodes(&template.nodes, self.autoescape)?;
		debug!(
			instructions = instructions.len(),
			macros = state.macros.len(),
			extends = state.extends.as_deref().unwrap_or(""),
			"translated template"
		);
		Ok(CompiledTemplate {
			instructions,
			macros: state.macros,
			extends: state.extends,
			references: state.references,
		})
	}
}

struct State<'t> {
	extensions: &'t ExtensionTable,
	macros: BTreeMap<String, MacroDefinition>,
	references: References,
	extends: Option<String>,
}

impl State<'_> {
	fn nodes(&mut self, nodes: &[Node], escape: bool) -> Result<Vec<Instruction>> {
		let mut out = Vec::new();
		let mut index = 0;
		while index < nodes.len() {
			index = self.node(nodes, index, escape, &mut out)?;
		}
		Ok(out)
	}

	/// Translate `nodes[index]`, returning the index of the next node to
	/// translate.
	fn node(
		&mut self,
		nodes: &[Node],
		index: usize,
		escape: bool,
		out: &mut Vec<Instruction>,
	) -> Result<usize> {
		let node = &nodes[index];
		match &node.kind {
			NodeKind::Text { text } => {
				if let Some(Instruction::EmitLiteral { text: previous }) = out.last_mut() {
					previous.push_str(text);
				} else if !text.is_empty() {
					out.push(Instruction::EmitLiteral { text: text.clone() });
				}
			}
			NodeKind::Echo { expr, raw } => {
				self.collect(expr);
				let escape = escape && !raw && !is_escape_filter(expr);
				out.push(Instruction::EmitExpr {
					expr: expr.clone(),
					escape,
				});
			}
			NodeKind::If { branches, otherwise } => {
				let mut lowered = Vec::with_capacity(branches.len());
				for branch in branches {
					self.collect(&branch.condition);
					lowered.push(Branch {
						condition: branch.condition.clone(),
						body: self.nodes(&branch.body, escape)?,
					});
				}
				let otherwise = match otherwise {
					Some(nodes) => self.nodes(nodes, escape)?,
					None => Vec::new(),
				};
				out.push(Instruction::Branch {
					branches: lowered,
					otherwise,
				});
			}
			NodeKind::For {
				key,
				value,
				iterable,
				filter,
				body,
				otherwise,
			} => {
				self.collect(iterable);
				if let Some(filter) = filter {
					self.collect(filter);
				}
				let body = self.nodes(body, escape)?;
				let otherwise = match otherwise {
					Some(nodes) => self.nodes(nodes, escape)?,
					None => Vec::new(),
				};
				out.push(Instruction::Loop {
					key: key.clone(),
					value: value.clone(),
					iterable: iterable.clone(),
					filter: filter.clone(),
					body,
					otherwise,
				});
			}
			NodeKind::Set { assignments } => {
				for assignment in assignments {
					self.collect(&assignment.value);
					out.push(Instruction::Assign {
						target: assignment.target.clone(),
						op: assignment.op,
						value: assignment.value.clone(),
					});
				}
			}
			NodeKind::Block { name, body } => {
				let body = self.nodes(body, escape)?;
				out.push(Instruction::Block {
					name: name.clone(),
					body,
				});
			}
			NodeKind::Extends { template } => {
				self.extends = Some(template.clone());
			}
			NodeKind::Include { template, with } => {
				self.collect(template);
				if let ExprKind::Literal(Literal::String(name)) = &template.ungrouped().kind {
					self.references.includes.insert(name.clone());
				}
				if let Some(with) = with {
					self.collect(with);
				}
				out.push(Instruction::Include {
					template: template.clone(),
					with: with.clone(),
				});
			}
			NodeKind::Macro { name, params, body } => {
				self.define_macro(node, name, params, body, escape)?;
			}
			NodeKind::Cache {
				key,
				lifetime,
				body,
			} => {
				self.collect(key);
				let body = self.nodes(body, escape)?;
				out.push(Instruction::Cache {
					key: key.clone(),
					lifetime: *lifetime,
					body,
				});
			}
			NodeKind::Autoescape { enabled, body } => {
				let body = self.nodes(body, *enabled)?;
				for instruction in body {
					match (instruction, out.last_mut()) {
						(
							Instruction::EmitLiteral { text },
							Some(Instruction::EmitLiteral { text: previous }),
						) => previous.push_str(&text),
						(instruction, _) => out.push(instruction),
					}
				}
			}
			NodeKind::Do { expr } => {
				self.collect(expr);
				out.push(Instruction::Evaluate { expr: expr.clone() });
			}
			NodeKind::Break => out.push(Instruction::Break),
			NodeKind::Continue => out.push(Instruction::Continue),
			NodeKind::Tag { name, args } => {
				return self.tag(nodes, index, name, args, escape, out);
			}
			NodeKind::EndTag { name } => {
				let closer = format!("end{}", name);
				return Err(match self.extensions.get(name) {
					Some(TagKind::Block) => Error::UnbalancedBlock {
						position: node.position,
						expected_closer: "end of template".to_string(),
						found: closer,
					},
					_ => Error::UnknownDirective {
						name: closer,
						position: node.position,
					},
				});
			}
		}
		Ok(index + 1)
	}

	fn define_macro(
		&mut self,
		node: &Node,
		name: &str,
		params: &[MacroParam],
		body: &[Node],
		escape: bool,
	) -> Result<()> {
		if self.macros.contains_key(name) {
			return Err(Error::invalid(
				node.position,
				format!("macro '{}' is already defined", name),
			));
		}
		let body = self.nodes(body, escape)?;
		self.macros.insert(
			name.to_string(),
			MacroDefinition {
				params: params.to_vec(),
				body,
			},
		);
		Ok(())
	}

	/// Fold a custom directive, pairing block directives with their
	/// `{% endname %}` at the same nesting level.
	fn tag(
		&mut self,
		nodes: &[Node],
		index: usize,
		name: &str,
		args: &[TemplateExpr],
		escape: bool,
		out: &mut Vec<Instruction>,
	) -> Result<usize> {
		let node = &nodes[index];
		let Some(kind) = self.extensions.get(name) else {
			return Err(Error::UnknownDirective {
				name: name.to_string(),
				position: node.position,
			});
		};
		args.iter().for_each(|arg| self.collect(arg));

		if kind == TagKind::Inline {
			out.push(Instruction::Extension {
				name: name.to_string(),
				args: args.to_vec(),
				body: None,
			});
			return Ok(index + 1);
		}

		let mut depth = 0usize;
		let mut end = None;
		for (offset, candidate) in nodes[index + 1..].iter().enumerate() {
			match &candidate.kind {
				NodeKind::Tag { name: other, .. } if other == name => depth += 1,
				NodeKind::EndTag { name: other } if other == name => {
					if depth == 0 {
						end = Some(index + 1 + offset);
						break;
					}
					depth -= 1;
				}
				_ => {}
			}
		}
		let Some(end) = end else {
			return Err(Error::UnbalancedBlock {
				position: node.position,
				expected_closer: format!("end{}", name),
				found: "end of template".to_string(),
			});
		};

		let body = self.nodes(&nodes[index + 1..end], escape)?;
		out.push(Instruction::Extension {
			name: name.to_string(),
			args: args.to_vec(),
			body: Some(body),
		});
		Ok(end + 1)
	}

	/// Record functions called in `expr`.
	fn collect(&mut self, expr: &TemplateExpr) {
		expr.walk(&mut |e| {
			if let ExprKind::Call { callee, .. } = &e.kind {
				if let Some(name) = callee.as_identifier() {
					self.references.functions.insert(name.to_string());
				}
			}
		});
	}
}

/// Whether the outermost operation of `expr` already escapes its output.
fn is_escape_filter(expr: &TemplateExpr) -> bool {
	matches!(
		&expr.kind,
		ExprKind::Ext(TemplateExt::Filter { name, .. }) if name == "e" || name == "escape"
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn compile_with(source: &str, extensions: &ExtensionTable) -> Result<CompiledTemplate> {
		TemplateTranslator::new(extensions).translate(&parse_template(source)?)
	}

	fn escapes(compiled: &CompiledTemplate) -> Vec<bool> {
		compiled
			.instructions
			.iter()
			.filter_map(|i| match i {
				Instruction::EmitExpr { escape, .. } => Some(*escape),
				_ => None,
			})
			.collect()
	}

	#[rstest]
	#[case("{{ a }}", vec![true])]
	#[case("{{ a|raw }}", vec![false])]
	#[case("{{ a|e }}", vec![false])]
	#[case("{{ a|escape }}", vec![false])]
	#[case("{{ a|upper }}", vec![true])]
	#[case("{% autoescape false %}{{ a }}{% endautoescape %}{{ b }}", vec![false, true])]
	#[case("{% autoescape false %}{% autoescape true %}{{ a }}{% endautoescape %}{% endautoescape %}", vec![true])]
	fn test_escape_decisions(#[case] source: &str, #[case] expected: Vec<bool>) {
		assert_eq!(escapes(&compile(source).unwrap()), expected);
	}

	#[rstest]
	fn test_autoescape_disabled_by_default_setting() {
		let extensions = ExtensionTable::new();
		let compiled = TemplateTranslator::new(&extensions)
			.with_autoescape(false)
			.translate(&parse_template("{{ a }}").unwrap())
			.unwrap();
		assert_eq!(escapes(&compiled), vec![false]);
	}

	#[rstest]
	fn test_macros_are_hoisted() {
		let compiled = compile("a{% macro m(x) %}{{ x }}{% endmacro %}b").unwrap();
		assert_eq!(
			compiled.instructions,
			vec![Instruction::EmitLiteral { text: "ab".into() }]
		);
		assert_eq!(compiled.macros["m"].params[0].name, "x");
	}

	#[rstest]
	fn test_duplicate_macro() {
		let err = compile("{% macro m() %}{% endmacro %}{% macro m() %}{% endmacro %}").unwrap_err();
		assert!(matches!(err, Error::InvalidConstruct { .. }));
	}

	#[rstest]
	fn test_unknown_directive() {
		let err = compile("{% spaceless %}x{% endspaceless %}").unwrap_err();
		assert!(matches!(err, Error::UnknownDirective { ref name, .. } if name == "spaceless"));
	}

	#[rstest]
	fn test_block_extension_is_folded() {
		let extensions = ExtensionTable::new().with_tag("spaceless", TagKind::Block);
		let compiled = compile_with(
			"{% spaceless %}{% if a %}x{% endif %}{% endspaceless %}!",
			&extensions,
		)
		.unwrap();
		let Instruction::Extension { name, body, .. } = &compiled.instructions[0] else {
			panic!("expected extension");
		};
		assert_eq!(name, "spaceless");
		assert_eq!(body.as_ref().map(Vec::len), Some(1));
		assert_eq!(compiled.instructions[1], Instruction::EmitLiteral { text: "!".into() });
	}

	#[rstest]
	fn test_nested_block_extensions_pair_correctly() {
		let extensions = ExtensionTable::new().with_tag("box", TagKind::Block);
		let compiled = compile_with(
			"{% box %}{% box %}in{% endbox %}{% endbox %}",
			&extensions,
		)
		.unwrap();
		assert_eq!(compiled.instructions.len(), 1);
		let Instruction::Extension { body: Some(body), .. } = &compiled.instructions[0] else {
			panic!("expected block extension");
		};
		assert!(matches!(&body[0], Instruction::Extension { body: Some(_), .. }));
	}

	#[rstest]
	fn test_unclosed_block_extension() {
		let extensions = ExtensionTable::new().with_tag("box", TagKind::Block);
		let err = compile_with("{% box %}x", &extensions).unwrap_err();
		assert!(matches!(err, Error::UnbalancedBlock { ref expected_closer, .. } if expected_closer == "endbox"));
	}

	#[rstest]
	fn test_inline_extension_with_args() {
		let extensions = ExtensionTable::new().with_tag("csrf", TagKind::Inline);
		let compiled = compile_with("{% csrf 'form', 2 %}", &extensions).unwrap();
		assert!(matches!(
			&compiled.instructions[0],
			Instruction::Extension { args, body: None, .. } if args.len() == 2
		));
	}

	#[rstest]
	fn test_references() {
		let compiled =
			compile("{% include 'header.volt' %}{{ url('home') ~ asset(x) }}{% include name %}").unwrap();
		assert_eq!(
			compiled.references.includes.iter().collect::<Vec<_>>(),
			vec!["header.volt"]
		);
		assert_eq!(
			compiled.references.functions.iter().collect::<Vec<_>>(),
			vec!["asset", "url"]
		);
	}

	#[rstest]
	fn test_extends_is_recorded() {
		let compiled = compile("{% extends 'base' %}{% block body %}x{% endblock %}").unwrap();
		assert_eq!(compiled.extends.as_deref(), Some("base"));
		assert_eq!(compiled.blocks().count(), 1);
	}
}
