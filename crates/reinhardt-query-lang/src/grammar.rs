//! Lexical table and operator precedence of the query language.
//!
//! Precedence, loosest first: `OR`, `AND`, `NOT`, comparisons (including
//! `LIKE`, `IN`, `BETWEEN`, `IS`), `|` and `^`, `&`, `+ - ||`, `* / %`,
//! unary `- + ~`.

use crate::ast::{Placeholder, QueryExpr, QueryExt, WhenClause};
use crate::parser::parse_select;
use reinhardt_lang_core::ast::{BinaryOp, Expr, ExprKind, ListItem, UnaryOp};
use reinhardt_lang_core::error::{Error, Result};
use reinhardt_lang_core::grammar::{Assoc, Grammar, Infix, OperatorSpec, PrefixSpec};
use reinhardt_lang_core::parser::Parser;
use reinhardt_lang_core::table::{KeywordCase, LanguageTable};
use reinhardt_lang_core::token::TokenKind;

/// Precedence of comparisons and the comparison-like extensions.
const COMPARISON: u8 = 4;

pub static QUERY_TABLE: LanguageTable = LanguageTable {
	name: "query",
	keywords: &[
		"SELECT", "DISTINCT", "ALL", "FROM", "AS", "WHERE", "GROUP", "BY", "HAVING", "ORDER",
		"ASC", "DESC", "LIMIT", "OFFSET", "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE",
		"JOIN", "INNER", "LEFT", "RIGHT", "FULL", "OUTER", "CROSS", "ON", "AND", "OR", "NOT",
		"LIKE", "ILIKE", "IN", "BETWEEN", "IS", "NULL", "TRUE", "FALSE", "CASE", "WHEN", "THEN",
		"ELSE", "END", "CAST", "EXISTS",
	],
	keyword_case: KeywordCase::Insensitive,
	operators: &[
		",", ".", "(", ")", "*", "/", "%", "+", "-", "=", "<>", "!=", "<", "<=", ">", ">=",
		"||", "&", "|", "^", "~", ";",
	],
	string_quotes: &['\'', '"'],
	escape: Some('\\'),
	line_comment: Some("--"),
	block_comment: Some(("/*", "*/")),
	bracket_identifiers: true,
	placeholders: true,
	delimiters: None,
	null_keyword: "NULL",
	true_keyword: "TRUE",
	false_keyword: "FALSE",
	named_arguments: false,
	distinct_keyword: Some("DISTINCT"),
	list_literals: false,
	subscripts: false,
	calls_on_expressions: false,
};

const fn left_assoc(tokens: &'static [&'static str], op: BinaryOp, precedence: u8) -> OperatorSpec {
	OperatorSpec {
		tokens,
		op,
		precedence,
		assoc: Assoc::Left,
	}
}

static BINARY_OPERATORS: &[OperatorSpec] = &[
	left_assoc(&["OR"], BinaryOp::Or, 1),
	left_assoc(&["AND"], BinaryOp::And, 2),
	left_assoc(&["="], BinaryOp::Eq, COMPARISON),
	left_assoc(&["<>"], BinaryOp::NotEq, COMPARISON),
	left_assoc(&["!="], BinaryOp::NotEq, COMPARISON),
	left_assoc(&["<"], BinaryOp::Lt, COMPARISON),
	left_assoc(&["<="], BinaryOp::LtEq, COMPARISON),
	left_assoc(&[">"], BinaryOp::Gt, COMPARISON),
	left_assoc(&[">="], BinaryOp::GtEq, COMPARISON),
	left_assoc(&["LIKE"], BinaryOp::Like, COMPARISON),
	left_assoc(&["NOT", "LIKE"], BinaryOp::NotLike, COMPARISON),
	left_assoc(&["ILIKE"], BinaryOp::ILike, COMPARISON),
	left_assoc(&["NOT", "ILIKE"], BinaryOp::NotILike, COMPARISON),
	left_assoc(&["|"], BinaryOp::BitOr, 5),
	left_assoc(&["^"], BinaryOp::BitXor, 5),
	left_assoc(&["&"], BinaryOp::BitAnd, 6),
	left_assoc(&["+"], BinaryOp::Add, 7),
	left_assoc(&["-"], BinaryOp::Sub, 7),
	left_assoc(&["||"], BinaryOp::Concat, 7),
	left_assoc(&["*"], BinaryOp::Mul, 8),
	left_assoc(&["/"], BinaryOp::Div, 8),
	left_assoc(&["%"], BinaryOp::Mod, 8),
];

static PREFIX_OPERATORS: &[PrefixSpec] = &[
	PrefixSpec {
		token: "NOT",
		op: UnaryOp::Not,
		precedence: 3,
	},
	PrefixSpec {
		token: "-",
		op: UnaryOp::Neg,
		precedence: 9,
	},
	PrefixSpec {
		token: "+",
		op: UnaryOp::Plus,
		precedence: 9,
	},
	PrefixSpec {
		token: "~",
		op: UnaryOp::BitNot,
		precedence: 9,
	},
];

/// Grammar of the model query language.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryGrammar;

impl Grammar for QueryGrammar {
	type Ext = QueryExt;

	fn table(&self) -> &'static LanguageTable {
		&QUERY_TABLE
	}

	fn binary_operators(&self) -> &'static [OperatorSpec] {
		BINARY_OPERATORS
	}

	fn prefix_operators(&self) -> &'static [PrefixSpec] {
		PREFIX_OPERATORS
	}

	fn primary_extension(&self, parser: &mut Parser<'_, Self>) -> Result<Option<QueryExpr>> {
		let Some(token) = parser.peek()? else {
			return Ok(None);
		};
		let position = token.position;
		let ext = match token.kind {
			TokenKind::Placeholder => {
				parser.next_token()?;
				QueryExt::Placeholder(parse_placeholder(token.lexeme, position)?)
			}
			TokenKind::Operator("*") => {
				parser.next_token()?;
				QueryExt::Star
			}
			TokenKind::Identifier | TokenKind::QuotedIdentifier => {
				let dot = parser.peek_nth(1)?.is_some_and(|t| t.is_operator("."));
				let star = parser.peek_nth(2)?.is_some_and(|t| t.is_operator("*"));
				if !(dot && star) {
					return Ok(None);
				}
				let (qualifier, _) = parser.expect_identifier()?;
				parser.next_token()?;
				parser.next_token()?;
				QueryExt::QualifiedStar(qualifier)
			}
			TokenKind::Keyword("CASE") => {
				parser.next_token()?;
				parse_case(parser)?
			}
			TokenKind::Keyword("CAST") => {
				parser.next_token()?;
				parse_cast(parser)?
			}
			TokenKind::Keyword("EXISTS") => {
				parser.next_token()?;
				parser.expect_operator("(")?;
				let select = parse_select(parser)?;
				parser.expect_operator(")")?;
				QueryExt::Exists(Box::new(select))
			}
			TokenKind::Operator("(") => {
				let subquery = parser.peek_nth(1)?.is_some_and(|t| t.is_keyword("SELECT"));
				if !subquery {
					return Ok(None);
				}
				parser.next_token()?;
				let select = parse_select(parser)?;
				parser.expect_operator(")")?;
				QueryExt::Subquery(Box::new(select))
			}
			_ => return Ok(None),
		};
		Ok(Some(Expr::new(ExprKind::Ext(ext), position)))
	}

	fn infix_extension(
		&self,
		parser: &mut Parser<'_, Self>,
		left: QueryExpr,
		min_precedence: u8,
	) -> Result<Infix<QueryExt>> {
		if COMPARISON < min_precedence {
			return Ok(Infix::NotHandled(left));
		}
		let Some(token) = parser.peek()? else {
			return Ok(Infix::NotHandled(left));
		};

		let negated = token.is_keyword("NOT");
		let operator = if negated { parser.peek_nth(1)? } else { Some(token) };
		let Some(operator) = operator else {
			return Ok(Infix::NotHandled(left));
		};

		let position = left.position;
		let expr = match operator.kind {
			TokenKind::Keyword("BETWEEN") => {
				skip(parser, negated)?;
				let low = parser.parse_expression_bp(COMPARISON + 1)?;
				parser.expect_keyword("AND")?;
				let high = parser.parse_expression_bp(COMPARISON + 1)?;
				ExprKind::Ext(QueryExt::Between {
					expr: Box::new(left),
					low: Box::new(low),
					high: Box::new(high),
					negated,
				})
			}
			TokenKind::Keyword("IN") => {
				skip(parser, negated)?;
				let right = parse_in_operand(parser)?;
				ExprKind::Binary {
					op: if negated { BinaryOp::NotIn } else { BinaryOp::In },
					left: Box::new(left),
					right: Box::new(right),
				}
			}
			TokenKind::Keyword("IS") if !negated => {
				parser.next_token()?;
				let negated = parser.eat_keyword("NOT")?;
				parser.expect_keyword("NULL")?;
				ExprKind::Ext(QueryExt::IsNull {
					expr: Box::new(left),
					negated,
				})
			}
			_ => return Ok(Infix::NotHandled(left)),
		};
		Ok(Infix::Handled(Expr::new(expr, position)))
	}
}

fn skip(parser: &mut Parser<'_, QueryGrammar>, negated: bool) -> Result<()> {
	if negated {
		parser.next_token()?;
	}
	parser.next_token()?;
	Ok(())
}

fn parse_placeholder(lexeme: &str, position: reinhardt_lang_core::Position) -> Result<Placeholder> {
	if let Some(digits) = lexeme.strip_prefix('?') {
		let index = digits
			.parse::<u32>()
			.map_err(|_| Error::invalid(position, "placeholder index out of range"))?;
		return Ok(Placeholder::Numbered(index));
	}
	Ok(Placeholder::Named(lexeme.trim_matches(':').to_string()))
}

/// `( subquery )` or `( expr, ... )`
fn parse_in_operand(parser: &mut Parser<'_, QueryGrammar>) -> Result<QueryExpr> {
	let open = parser.expect_operator("(")?;
	if parser.at_keyword("SELECT")? {
		let select = parse_select(parser)?;
		parser.expect_operator(")")?;
		return Ok(Expr::new(
			ExprKind::Ext(QueryExt::Subquery(Box::new(select))),
			open.position,
		));
	}
	let mut items = Vec::new();
	loop {
		let value = parser.parse_expression()?;
		items.push(ListItem { key: None, value });
		if !parser.eat_operator(",")? {
			break;
		}
	}
	parser.expect_operator(")")?;
	Ok(Expr::new(ExprKind::List(items), open.position))
}

fn parse_case(parser: &mut Parser<'_, QueryGrammar>) -> Result<QueryExt> {
	let operand = if parser.at_keyword("WHEN")? {
		None
	} else {
		Some(Box::new(parser.parse_expression()?))
	};

	let mut branches = Vec::new();
	while parser.eat_keyword("WHEN")? {
		let condition = parser.parse_expression()?;
		parser.expect_keyword("THEN")?;
		let result = parser.parse_expression()?;
		branches.push(WhenClause { condition, result });
	}
	if branches.is_empty() {
		return Err(parser.error_expected(["WHEN"]));
	}

	let otherwise = if parser.eat_keyword("ELSE")? {
		Some(Box::new(parser.parse_expression()?))
	} else {
		None
	};
	if !parser.eat_keyword("END")? {
		let expected: &[&str] = if otherwise.is_some() {
			&["END"]
		} else {
			&["WHEN", "ELSE", "END"]
		};
		return Err(parser.error_expected(expected.iter().copied()));
	}

	Ok(QueryExt::Case {
		operand,
		branches,
		otherwise,
	})
}

/// `CAST(expr AS type)`, where type may carry `(n[, m])`.
fn parse_cast(parser: &mut Parser<'_, QueryGrammar>) -> Result<QueryExt> {
	parser.expect_operator("(")?;
	let expr = parser.parse_expression()?;
	parser.expect_keyword("AS")?;
	let (mut target, _) = parser.expect_identifier()?;
	target.make_ascii_uppercase();
	if parser.eat_operator("(")? {
		let mut sizes = Vec::new();
		loop {
			let size = parser.expect_kind(TokenKind::Integer)?;
			sizes.push(size.lexeme.to_string());
			if !parser.eat_operator(",")? {
				break;
			}
		}
		parser.expect_operator(")")?;
		target = format!("{}({})", target, sizes.join(", "));
	}
	parser.expect_operator(")")?;
	Ok(QueryExt::Cast {
		expr: Box::new(expr),
		target,
	})
}
