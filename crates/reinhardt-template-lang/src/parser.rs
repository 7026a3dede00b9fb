//! Template parser
//!
//! Builds the [`Node`] tree from the token stream. Raw text, echoes and
//! directives are read by [`TemplateParser::parse_body`], which stops at one
//! of the closing keywords its caller expects; anything else that closes a
//! block at that point is reported as
//! [`Error::UnbalancedBlock`](reinhardt_lang_core::Error::UnbalancedBlock).

use crate::ast::{
	AssignOp, Assignment, IfBranch, MacroParam, Node, NodeKind, Template, TemplateExpr, TemplateExt,
};
use crate::grammar::TemplateGrammar;
use reinhardt_lang_core::ast::{ExprKind, Literal};
use reinhardt_lang_core::error::{Error, Result};
use reinhardt_lang_core::parser::Parser;
use reinhardt_lang_core::position::Position;
use reinhardt_lang_core::token::TokenKind;

/// Keywords that only make sense as the end of an enclosing block.
const CLOSING_KEYWORDS: &[&str] = &[
	"elseif",
	"else",
	"elsefor",
	"endif",
	"endfor",
	"endblock",
	"endmacro",
	"endcache",
	"endautoescape",
];

/// Parse a template source.
///
/// # Examples
///
/// ```
/// use reinhardt_template_lang::ast::NodeKind;
/// use reinhardt_template_lang::parser::parse_template;
///
/// let template = parse_template("Hello {{ name }}!").unwrap();
/// assert_eq!(template.nodes.len(), 3);
/// assert!(matches!(template.nodes[1].kind, NodeKind::Echo { raw: false, .. }));
/// ```
pub fn parse_template(source: &str) -> Result<Template> {
	let mut parser = TemplateParser::new(source);
	let (nodes, _) = parser.parse_body(&[])?;
	Ok(Template { nodes })
}

/// Closing directive that ended a body.
#[derive(Debug, Clone, Copy)]
struct Closer {
	keyword: &'static str,
	position: Position,
}

struct TemplateParser<'a> {
	parser: Parser<'a, TemplateGrammar>,
	loop_depth: usize,
	block_depth: usize,
	/// Nesting depth of bodies below the top level
	depth: usize,
	/// Whether any non-whitespace content has been seen at the top level
	seen_content: bool,
	is_child: bool,
}

impl<'a> TemplateParser<'a> {
	fn new(source: &'a str) -> Self {
		Self {
			parser: Parser::new(TemplateGrammar, source),
			loop_depth: 0,
			block_depth: 0,
			depth: 0,
			seen_content: false,
			is_child: false,
		}
	}

	/// Parse nodes until one of `closers` (consumed up to and including the
	/// keyword) or, when `closers` is empty, the end of input.
	fn parse_body(&mut self, closers: &[&'static str]) -> Result<(Vec<Node>, Option<Closer>)> {
		let mut nodes = Vec::new();
		loop {
			let Some(token) = self.parser.next_token()? else {
				if let Some(expected) = closers.last() {
					return Err(Error::UnbalancedBlock {
						position: self.parser.position()?,
						expected_closer: (*expected).to_string(),
						found: "end of template".to_string(),
					});
				}
				return Ok((nodes, None));
			};

			let position = token.position;
			match token.kind {
				TokenKind::RawText => {
					let blank = token.lexeme.trim().is_empty();
					if self.depth == 0 && self.is_child && !blank {
						return Err(Error::invalid(position, "child templates may only contain blocks"));
					}
					if !blank {
						self.seen_content = true;
					}
					nodes.push(Node::new(
						NodeKind::Text {
							text: token.lexeme.to_string(),
						},
						position,
					));
				}
				TokenKind::OpenEcho => {
					self.check_child_content(position)?;
					let expr = self.parser.parse_expression()?;
					self.parser.expect_kind(TokenKind::CloseEcho)?;
					let (expr, raw) = strip_raw(expr);
					nodes.push(Node::new(NodeKind::Echo { expr, raw }, position));
				}
				TokenKind::OpenStatement => {
					if let Some(closer) = self.parse_statement(closers, &mut nodes)? {
						return Ok((nodes, Some(closer)));
					}
				}
				_ => return Err(Error::syntax(position, ["text", "{{", "{%"], token.describe())),
			}
		}
	}

	fn check_child_content(&mut self, position: Position) -> Result<()> {
		if self.depth == 0 {
			if self.is_child {
				return Err(Error::invalid(position, "child templates may only contain blocks"));
			}
			self.seen_content = true;
		}
		Ok(())
	}

	/// Parse one `{% ... %}` after its opener. Returns the closer when the
	/// statement ends the current body.
	fn parse_statement(
		&mut self,
		closers: &[&'static str],
		nodes: &mut Vec<Node>,
	) -> Result<Option<Closer>> {
		let Some(token) = self.parser.peek()? else {
			return Err(self.parser.error_expected(["directive"]));
		};
		let position = token.position;

		if token.kind == TokenKind::CloseStatement {
			self.parser.next_token()?;
			return Ok(None);
		}

		if let TokenKind::Keyword(keyword) = token.kind {
			if closers.contains(&keyword) {
				self.parser.next_token()?;
				return Ok(Some(Closer { keyword, position }));
			}
			if CLOSING_KEYWORDS.contains(&keyword) {
				return Err(Error::UnbalancedBlock {
					position,
					expected_closer: closers.last().unwrap_or(&"end of template").to_string(),
					found: keyword.to_string(),
				});
			}
		}
		if !matches!(token.kind, TokenKind::Keyword("extends" | "block" | "macro")) {
			self.check_child_content(position)?;
		}
		if self.depth == 0 && !token.is_keyword("extends") {
			self.seen_content = true;
		}

		self.parser.next_token()?;
		let kind = match token.kind {
			TokenKind::Keyword("if") => self.parse_if()?,
			TokenKind::Keyword("for") => self.parse_for()?,
			TokenKind::Keyword("set") => self.parse_set()?,
			TokenKind::Keyword("block") => self.parse_block(position)?,
			TokenKind::Keyword("extends") => self.parse_extends(position)?,
			TokenKind::Keyword("include") => {
				let template = self.parser.parse_expression()?;
				let with = if self.parser.eat_keyword("with")? {
					Some(self.parser.parse_expression()?)
				} else {
					None
				};
				NodeKind::Include { template, with }
			}
			TokenKind::Keyword("macro") => self.parse_macro()?,
			TokenKind::Keyword("cache") => self.parse_cache()?,
			TokenKind::Keyword("autoescape") => self.parse_autoescape()?,
			TokenKind::Keyword("do") => NodeKind::Do {
				expr: self.parser.parse_expression()?,
			},
			TokenKind::Keyword(kw @ ("break" | "continue")) => {
				if self.loop_depth == 0 {
					return Err(Error::invalid(
						position,
						format!("'{}' must be used inside a for loop", kw),
					));
				}
				if kw == "break" {
					NodeKind::Break
				} else {
					NodeKind::Continue
				}
			}
			TokenKind::Identifier => self.parse_tag(token.lexeme)?,
			_ => {
				return Err(Error::syntax(
					position,
					["directive"],
					token.describe(),
				));
			}
		};
		self.parser.expect_kind(TokenKind::CloseStatement)?;
		nodes.push(Node::new(kind, position));
		Ok(None)
	}

	/// Parse a nested body, keeping track of depth.
	fn nested(&mut self, closers: &[&'static str]) -> Result<(Vec<Node>, Closer)> {
		self.depth += 1;
		let result = self.parse_body(closers);
		self.depth -= 1;
		let (nodes, closer) = result?;
		match closer {
			Some(closer) => Ok((nodes, closer)),
			None => Err(self.parser.error_expected(closers.iter().copied())),
		}
	}

	fn parse_if(&mut self) -> Result<NodeKind> {
		let mut branches = Vec::new();
		let mut condition = self.parser.parse_expression()?;
		self.parser.expect_kind(TokenKind::CloseStatement)?;
		loop {
			let (body, closer) = self.nested(&["elseif", "else", "endif"])?;
			branches.push(IfBranch { condition, body });
			match closer.keyword {
				"elseif" => {
					condition = self.parser.parse_expression()?;
					self.parser.expect_kind(TokenKind::CloseStatement)?;
				}
				"else" => {
					self.parser.expect_kind(TokenKind::CloseStatement)?;
					let (otherwise, _) = self.nested(&["endif"])?;
					return Ok(NodeKind::If {
						branches,
						otherwise: Some(otherwise),
					});
				}
				_ => {
					return Ok(NodeKind::If {
						branches,
						otherwise: None,
					});
				}
			}
		}
	}

	fn parse_for(&mut self) -> Result<NodeKind> {
		let (first, _) = self.parser.expect_identifier()?;
		let (key, value) = if self.parser.eat_operator(",")? {
			let (value, _) = self.parser.expect_identifier()?;
			(Some(first), value)
		} else {
			(None, first)
		};
		self.parser.expect_keyword("in")?;
		let iterable = self.parser.parse_expression()?;
		let filter = if self.parser.eat_keyword("if")? {
			Some(self.parser.parse_expression()?)
		} else {
			None
		};
		self.parser.expect_kind(TokenKind::CloseStatement)?;

		self.loop_depth += 1;
		let body = self.nested(&["else", "elsefor", "endfor"]);
		self.loop_depth -= 1;
		let (body, closer) = body?;

		let otherwise = if closer.keyword == "endfor" {
			None
		} else {
			self.parser.expect_kind(TokenKind::CloseStatement)?;
			let (otherwise, _) = self.nested(&["endfor"])?;
			Some(otherwise)
		};
		Ok(NodeKind::For {
			key,
			value,
			iterable,
			filter,
			body,
			otherwise,
		})
	}

	fn parse_set(&mut self) -> Result<NodeKind> {
		let mut assignments = Vec::new();
		loop {
			let (target, position) = self.parser.expect_identifier()?;
			let op = match self.parser.next_token()? {
				Some(t) if t.is_operator("=") => AssignOp::Assign,
				Some(t) if t.is_operator("+=") => AssignOp::Add,
				Some(t) if t.is_operator("-=") => AssignOp::Sub,
				Some(t) if t.is_operator("*=") => AssignOp::Mul,
				Some(t) if t.is_operator("/=") => AssignOp::Div,
				Some(t) => {
					return Err(Error::syntax(
						t.position,
						["'='", "'+='", "'-='", "'*='", "'/='"],
						t.describe(),
					));
				}
				None => return Err(self.parser.error_expected(["'='"])),
			};
			let value = self.parser.parse_expression()?;
			assignments.push(Assignment {
				target,
				op,
				value,
				position,
			});
			if !self.parser.eat_operator(",")? {
				break;
			}
		}
		Ok(NodeKind::Set { assignments })
	}

	fn parse_block(&mut self, position: Position) -> Result<NodeKind> {
		if self.block_depth > 0 {
			return Err(Error::invalid(position, "blocks cannot be nested in other blocks"));
		}
		let (name, _) = self.parser.expect_identifier()?;
		self.parser.expect_kind(TokenKind::CloseStatement)?;

		self.block_depth += 1;
		let body = self.nested(&["endblock"]);
		self.block_depth -= 1;
		let (body, _) = body?;
		Ok(NodeKind::Block { name, body })
	}

	fn parse_extends(&mut self, position: Position) -> Result<NodeKind> {
		if self.depth > 0 || self.seen_content || self.is_child {
			return Err(Error::invalid(
				position,
				"'extends' must be the first statement in the template",
			));
		}
		let (template, _) = self.parser.expect_string()?;
		self.is_child = true;
		Ok(NodeKind::Extends { template })
	}

	fn parse_macro(&mut self) -> Result<NodeKind> {
		let (name, _) = self.parser.expect_identifier()?;
		let mut params = Vec::new();
		self.parser.expect_operator("(")?;
		if !self.parser.eat_operator(")")? {
			loop {
				let (param, _) = self.parser.expect_identifier()?;
				let default = if self.parser.eat_operator("=")? {
					Some(self.parse_literal()?)
				} else {
					None
				};
				params.push(MacroParam { name: param, default });
				if !self.parser.eat_operator(",")? {
					break;
				}
			}
			self.parser.expect_operator(")")?;
		}
		self.parser.expect_kind(TokenKind::CloseStatement)?;

		let loop_depth = std::mem::replace(&mut self.loop_depth, 0);
		let body = self.nested(&["endmacro"]);
		self.loop_depth = loop_depth;
		let (body, _) = body?;
		Ok(NodeKind::Macro { name, params, body })
	}

	fn parse_literal(&mut self) -> Result<Literal> {
		let expr = self.parser.parse_expression()?;
		match expr.kind {
			ExprKind::Literal(literal) => Ok(literal),
			_ => Err(Error::invalid(
				expr.position,
				"macro parameter defaults must be literals",
			)),
		}
	}

	fn parse_cache(&mut self) -> Result<NodeKind> {
		let key = self.parser.parse_expression()?;
		let lifetime = match self.parser.peek()? {
			Some(t) if t.kind == TokenKind::Integer => {
				self.parser.next_token()?;
				Some(
					t.lexeme
						.parse::<i64>()
						.map_err(|_| Error::invalid(t.position, "cache lifetime out of range"))?,
				)
			}
			_ => None,
		};
		self.parser.expect_kind(TokenKind::CloseStatement)?;
		let (body, _) = self.nested(&["endcache"])?;
		Ok(NodeKind::Cache {
			key,
			lifetime,
			body,
		})
	}

	fn parse_autoescape(&mut self) -> Result<NodeKind> {
		let enabled = if self.parser.eat_keyword("true")? {
			true
		} else if self.parser.eat_keyword("false")? {
			false
		} else {
			return Err(self.parser.error_expected(["true", "false"]));
		};
		self.parser.expect_kind(TokenKind::CloseStatement)?;
		let (body, _) = self.nested(&["endautoescape"])?;
		Ok(NodeKind::Autoescape { enabled, body })
	}

	/// `{% name args %}` or `{% endname %}` for directives resolved later.
	fn parse_tag(&mut self, name: &str) -> Result<NodeKind> {
		if let Some(opened) = name.strip_prefix("end").filter(|rest| !rest.is_empty()) {
			return Ok(NodeKind::EndTag {
				name: opened.to_string(),
			});
		}
		let mut args = Vec::new();
		if !self.parser.at_kind(TokenKind::CloseStatement)? {
			loop {
				args.push(self.parser.parse_expression()?);
				if !self.parser.eat_operator(",")? {
					break;
				}
			}
		}
		Ok(NodeKind::Tag {
			name: name.to_string(),
			args,
		})
	}
}

/// Strip an outermost `|raw` filter.
fn strip_raw(expr: TemplateExpr) -> (TemplateExpr, bool) {
	match expr.kind {
		ExprKind::Ext(TemplateExt::Filter { expr, name, args }) if name == "raw" && args.is_empty() => {
			(*expr, true)
		}
		kind => (TemplateExpr::new(kind, expr.position), false),
	}
}
