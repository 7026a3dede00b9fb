//! Token cursor and precedence-climbing expression parser.
//!
//! [`Parser`] wraps a [`Scanner`] with a small lookahead buffer. Statement
//! level syntax lives in each language crate; they drive the cursor
//! methods here and delegate expressions to
//! [`parse_expression`](Parser::parse_expression).

use crate::ast::{Argument, Expr, ExprKind, ListItem, Literal, UnaryOp};
use crate::error::{Error, Result};
use crate::grammar::{Assoc, Grammar, Infix, OperatorSpec};
use crate::position::Position;
use crate::scanner::Scanner;
use crate::table::LanguageTable;
use crate::token::{Token, TokenKind};
use std::collections::VecDeque;

/// Cursor over the token stream of one source text.
pub struct Parser<'a, G: Grammar> {
	grammar: G,
	scanner: Scanner<'a>,
	lookahead: VecDeque<Token<'a>>,
}

impl<'a, G: Grammar> Parser<'a, G> {
	pub fn new(grammar: G, source: &'a str) -> Self {
		Self {
			grammar,
			scanner: Scanner::new(source, grammar.table()),
			lookahead: VecDeque::new(),
		}
	}

	pub fn grammar(&self) -> G {
		self.grammar
	}

	pub fn table(&self) -> &'static LanguageTable {
		self.grammar.table()
	}

	// ── cursor ───────────────────────────────────────────────────────

	fn fill(&mut self, n: usize) -> Result<()> {
		while self.lookahead.len() <= n {
			match self.scanner.next() {
				Some(token) => self.lookahead.push_back(token?),
				None => break,
			}
		}
		Ok(())
	}

	/// Token `n` positions ahead, without consuming anything.
	pub fn peek_nth(&mut self, n: usize) -> Result<Option<Token<'a>>> {
		self.fill(n)?;
		Ok(self.lookahead.get(n).copied())
	}

	pub fn peek(&mut self) -> Result<Option<Token<'a>>> {
		self.peek_nth(0)
	}

	/// Consume and return the next token.
	pub fn next_token(&mut self) -> Result<Option<Token<'a>>> {
		self.fill(0)?;
		Ok(self.lookahead.pop_front())
	}

	pub fn is_eof(&mut self) -> Result<bool> {
		Ok(self.peek()?.is_none())
	}

	/// Position of the next token, or of the end of input.
	pub fn position(&mut self) -> Result<Position> {
		Ok(match self.peek()? {
			Some(token) => token.position,
			None => self.scanner.position(),
		})
	}

	/// Syntax error at the next token listing what would have been valid.
	pub fn error_expected<I, S>(&mut self, expected: I) -> Error
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		match self.peek() {
			Ok(Some(token)) => Error::syntax(token.position, expected, token.describe()),
			Ok(None) => Error::syntax(self.scanner.position(), expected, "end of input"),
			Err(error) => error,
		}
	}

	pub fn at_keyword(&mut self, keyword: &str) -> Result<bool> {
		Ok(self.peek()?.is_some_and(|t| t.is_keyword(keyword)))
	}

	pub fn eat_keyword(&mut self, keyword: &str) -> Result<bool> {
		if self.at_keyword(keyword)? {
			self.next_token()?;
			return Ok(true);
		}
		Ok(false)
	}

	pub fn expect_keyword(&mut self, keyword: &str) -> Result<Token<'a>> {
		match self.peek()? {
			Some(token) if token.is_keyword(keyword) => {
				self.next_token()?;
				Ok(token)
			}
			_ => Err(self.error_expected([keyword])),
		}
	}

	pub fn at_operator(&mut self, op: &str) -> Result<bool> {
		Ok(self.peek()?.is_some_and(|t| t.is_operator(op)))
	}

	pub fn eat_operator(&mut self, op: &str) -> Result<bool> {
		if self.at_operator(op)? {
			self.next_token()?;
			return Ok(true);
		}
		Ok(false)
	}

	pub fn expect_operator(&mut self, op: &str) -> Result<Token<'a>> {
		match self.peek()? {
			Some(token) if token.is_operator(op) => {
				self.next_token()?;
				Ok(token)
			}
			_ => Err(self.error_expected([format!("'{}'", op)])),
		}
	}

	pub fn at_kind(&mut self, kind: TokenKind) -> Result<bool> {
		Ok(self.peek()?.is_some_and(|t| t.kind == kind))
	}

	pub fn expect_kind(&mut self, kind: TokenKind) -> Result<Token<'a>> {
		match self.peek()? {
			Some(token) if token.kind == kind => {
				self.next_token()?;
				Ok(token)
			}
			_ => Err(self.error_expected([kind.to_string()])),
		}
	}

	/// Whether the next token is an identifier (bare or bracket-quoted).
	pub fn at_identifier(&mut self) -> Result<bool> {
		Ok(self.peek()?.is_some_and(|t| {
			matches!(t.kind, TokenKind::Identifier | TokenKind::QuotedIdentifier)
		}))
	}

	/// Consume an identifier, returning its name without brackets.
	pub fn expect_identifier(&mut self) -> Result<(String, Position)> {
		match self.peek()? {
			Some(token) if matches!(token.kind, TokenKind::Identifier | TokenKind::QuotedIdentifier) => {
				self.next_token()?;
				Ok((identifier_name(&token), token.position))
			}
			_ => Err(self.error_expected(["identifier"])),
		}
	}

	/// Consume a string literal, returning its decoded value.
	pub fn expect_string(&mut self) -> Result<(String, Position)> {
		let token = self.expect_kind(TokenKind::String)?;
		Ok((self.table().unescape(token.lexeme), token.position))
	}

	// ── expressions ──────────────────────────────────────────────────

	pub fn parse_expression(&mut self) -> Result<Expr<G::Ext>> {
		self.parse_expression_bp(0)
	}

	/// Parse an expression whose operators all bind at least as tightly as
	/// `min_precedence`.
	pub fn parse_expression_bp(&mut self, min_precedence: u8) -> Result<Expr<G::Ext>> {
		let mut left = self.parse_unary()?;
		loop {
			if let Some(spec) = self.match_binary()? {
				if spec.precedence < min_precedence {
					break;
				}
				for _ in spec.tokens {
					self.next_token()?;
				}
				let next_min = match spec.assoc {
					Assoc::Left => spec.precedence + 1,
					Assoc::Right => spec.precedence,
				};
				let right = self.parse_expression_bp(next_min)?;
				let position = left.position;
				left = Expr::new(
					ExprKind::Binary {
						op: spec.op,
						left: Box::new(left),
						right: Box::new(right),
					},
					position,
				);
				continue;
			}

			let grammar = self.grammar;
			match grammar.infix_extension(self, left, min_precedence)? {
				Infix::Handled(expr) => left = expr,
				Infix::NotHandled(expr) => return Ok(expr),
			}
		}
		Ok(left)
	}

	/// Longest table operator starting at the next token.
	fn match_binary(&mut self) -> Result<Option<&'static OperatorSpec>> {
		let mut best: Option<&'static OperatorSpec> = None;
		for spec in self.grammar.binary_operators() {
			if best.is_some_and(|b| b.tokens.len() >= spec.tokens.len()) {
				continue;
			}
			let mut matched = true;
			for (i, expected) in spec.tokens.iter().enumerate() {
				let symbol = self.peek_nth(i)?.and_then(|t| t.symbol());
				if symbol != Some(*expected) {
					matched = false;
					break;
				}
			}
			if matched {
				best = Some(spec);
			}
		}
		Ok(best)
	}

	pub fn parse_unary(&mut self) -> Result<Expr<G::Ext>> {
		let Some(token) = self.peek()? else {
			return Err(self.error_expected(["expression"]));
		};
		let prefix = token.symbol().and_then(|symbol| {
			self.grammar
				.prefix_operators()
				.iter()
				.find(|spec| spec.token == symbol)
		});
		let Some(spec) = prefix else {
			return self.parse_primary();
		};

		self.next_token()?;
		let operand = self.parse_expression_bp(spec.precedence)?;
		let folded = match (spec.op, &operand.kind) {
			(UnaryOp::Neg, ExprKind::Literal(Literal::Integer(i))) => Some(Literal::Integer(-i)),
			(UnaryOp::Neg, ExprKind::Literal(Literal::Float(f))) => Some(Literal::Float(-f)),
			_ => None,
		};
		if let Some(literal) = folded {
			return Ok(Expr::literal(literal, token.position));
		}
		Ok(Expr::new(
			ExprKind::Unary {
				op: spec.op,
				operand: Box::new(operand),
			},
			token.position,
		))
	}

	pub fn parse_primary(&mut self) -> Result<Expr<G::Ext>> {
		let grammar = self.grammar;
		if let Some(expr) = grammar.primary_extension(self)? {
			return self.parse_postfix(expr);
		}

		let Some(token) = self.peek()? else {
			return Err(self.error_expected(["expression"]));
		};
		let table = self.table();
		let position = token.position;
		let kind = match token.kind {
			TokenKind::Integer => {
				let value = token
					.lexeme
					.parse::<i64>()
					.map_err(|_| Error::invalid(position, "integer literal out of range"))?;
				ExprKind::Literal(Literal::Integer(value))
			}
			TokenKind::Float => {
				let value = token
					.lexeme
					.parse::<f64>()
					.map_err(|_| Error::invalid(position, "malformed number"))?;
				ExprKind::Literal(Literal::Float(value))
			}
			TokenKind::String => ExprKind::Literal(Literal::String(table.unescape(token.lexeme))),
			TokenKind::Keyword(kw) if kw == table.null_keyword => ExprKind::Literal(Literal::Null),
			TokenKind::Keyword(kw) if kw == table.true_keyword => ExprKind::Literal(Literal::Boolean(true)),
			TokenKind::Keyword(kw) if kw == table.false_keyword => {
				ExprKind::Literal(Literal::Boolean(false))
			}
			TokenKind::Identifier | TokenKind::QuotedIdentifier => {
				ExprKind::Identifier(identifier_name(&token))
			}
			TokenKind::Operator("(") => {
				self.next_token()?;
				let inner = self.parse_expression()?;
				self.expect_operator(")")?;
				let grouped = Expr::new(ExprKind::Grouped(Box::new(inner)), position);
				return self.parse_postfix(grouped);
			}
			TokenKind::Operator("[") if table.list_literals => {
				self.next_token()?;
				let items = self.parse_list_items("]")?;
				return self.parse_postfix(Expr::new(ExprKind::List(items), position));
			}
			_ => return Err(self.error_expected(["expression"])),
		};
		self.next_token()?;
		self.parse_postfix(Expr::new(kind, position))
	}

	/// Parse comma separated list items up to and including `closer`.
	///
	/// An item is keyed when a string or identifier is followed by `:`.
	pub fn parse_list_items(&mut self, closer: &str) -> Result<Vec<ListItem<G::Ext>>> {
		let mut items = Vec::new();
		if self.eat_operator(closer)? {
			return Ok(items);
		}
		loop {
			let key = self.parse_item_key()?;
			let value = self.parse_expression()?;
			items.push(ListItem { key, value });
			if !self.eat_operator(",")? {
				break;
			}
		}
		self.expect_operator(closer)?;
		Ok(items)
	}

	fn parse_item_key(&mut self) -> Result<Option<String>> {
		let (Some(first), Some(second)) = (self.peek()?, self.peek_nth(1)?) else {
			return Ok(None);
		};
		if !second.is_operator(":") {
			return Ok(None);
		}
		let key = match first.kind {
			TokenKind::String => self.table().unescape(first.lexeme),
			TokenKind::Identifier | TokenKind::Integer => first.lexeme.to_string(),
			_ => return Ok(None),
		};
		self.next_token()?;
		self.next_token()?;
		Ok(Some(key))
	}

	/// Apply call, member and subscript suffixes to `expr`.
	pub fn parse_postfix(&mut self, mut expr: Expr<G::Ext>) -> Result<Expr<G::Ext>> {
		let table = self.table();
		loop {
			let callable = table.calls_on_expressions
				|| matches!(expr.kind, ExprKind::Identifier(_) | ExprKind::Member { .. });
			if callable && self.at_operator("(")? {
				self.next_token()?;
				let (args, distinct) = self.parse_arguments()?;
				let position = expr.position;
				expr = Expr::new(
					ExprKind::Call {
						callee: Box::new(expr),
						args,
						distinct,
					},
					position,
				);
			} else if self.at_operator(".")? {
				self.next_token()?;
				let property = match self.peek()? {
					Some(token)
						if matches!(
							token.kind,
							TokenKind::Identifier | TokenKind::QuotedIdentifier | TokenKind::Keyword(_)
						) =>
					{
						self.next_token()?;
						identifier_name(&token)
					}
					_ => return Err(self.error_expected(["identifier"])),
				};
				let position = expr.position;
				expr = Expr::new(
					ExprKind::Member {
						object: Box::new(expr),
						property,
					},
					position,
				);
			} else if table.subscripts && self.at_operator("[")? {
				self.next_token()?;
				expr = self.parse_subscript(expr)?;
			} else {
				return Ok(expr);
			}
		}
	}

	/// Parse call arguments after an opening `(` through the closing `)`.
	///
	/// Returns the arguments and whether the distinct keyword preceded them.
	pub fn parse_arguments(&mut self) -> Result<(Vec<Argument<G::Ext>>, bool)> {
		let table = self.table();
		let mut args = Vec::new();
		let mut distinct = false;
		if self.eat_operator(")")? {
			return Ok((args, distinct));
		}
		if let Some(kw) = table.distinct_keyword {
			distinct = self.eat_keyword(kw)?;
		}
		loop {
			let mut name = None;
			if table.named_arguments {
				if let (Some(first), Some(second)) = (self.peek()?, self.peek_nth(1)?) {
					if first.kind == TokenKind::Identifier && second.is_operator(":") {
						self.next_token()?;
						self.next_token()?;
						name = Some(first.lexeme.to_string());
					}
				}
			}
			let value = self.parse_expression()?;
			args.push(Argument { name, value });
			if !self.eat_operator(",")? {
				break;
			}
		}
		self.expect_operator(")")?;
		Ok((args, distinct))
	}

	fn parse_subscript(&mut self, object: Expr<G::Ext>) -> Result<Expr<G::Ext>> {
		let position = object.position;
		let start = if self.at_operator(":")? {
			None
		} else {
			Some(Box::new(self.parse_expression()?))
		};

		if self.eat_operator(":")? {
			let end = if self.at_operator("]")? {
				None
			} else {
				Some(Box::new(self.parse_expression()?))
			};
			self.expect_operator("]")?;
			return Ok(Expr::new(
				ExprKind::Slice {
					object: Box::new(object),
					start,
					end,
				},
				position,
			));
		}

		self.expect_operator("]")?;
		match start {
			Some(index) => Ok(Expr::new(
				ExprKind::Index {
					object: Box::new(object),
					index,
				},
				position,
			)),
			None => Err(self.error_expected(["expression"])),
		}
	}
}

/// Name of an identifier token, without bracket quoting.
pub fn identifier_name(token: &Token<'_>) -> String {
	match token.kind {
		TokenKind::QuotedIdentifier => token
			.lexeme
			.trim_start_matches('[')
			.trim_end_matches(']')
			.to_string(),
		_ => token.lexeme.to_string(),
	}
}
