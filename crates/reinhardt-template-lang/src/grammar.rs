//! Lexical table and operator precedence of the template language.
//!
//! Precedence, loosest first: ternary `? :`, `or`, `and`, `not`,
//! comparisons (`== != === !== < > <= >= in`, `not in`, `is`), `..`,
//! `~ + -`, `* / // %`, `**` (right associative), unary `- +`, filters `|`.

use crate::ast::{TemplateExpr, TemplateExt};
use reinhardt_lang_core::ast::{Argument, BinaryOp, Expr, ExprKind, UnaryOp};
use reinhardt_lang_core::error::Result;
use reinhardt_lang_core::grammar::{Assoc, Grammar, Infix, OperatorSpec, PrefixSpec};
use reinhardt_lang_core::parser::Parser;
use reinhardt_lang_core::table::{Delimiters, KeywordCase, LanguageTable};
use reinhardt_lang_core::token::TokenKind;

const TERNARY: u8 = 1;
const COMPARISON: u8 = 5;
const FILTER: u8 = 11;

pub static TEMPLATE_TABLE: LanguageTable = LanguageTable {
	name: "template",
	keywords: &[
		"if", "elseif", "else", "endif", "for", "in", "endfor", "elsefor", "set", "macro",
		"endmacro", "block", "endblock", "extends", "include", "with", "cache", "endcache",
		"autoescape", "endautoescape", "do", "break", "continue", "and", "or", "not", "is",
		"defined", "null", "true", "false",
	],
	keyword_case: KeywordCase::Sensitive,
	operators: &[
		"|", ".", "..", ",", ":", "?", "(", ")", "[", "]", "{", "}", "+", "-", "*", "**", "/",
		"//", "%", "~", "=", "==", "!=", "===", "!==", "<", ">", "<=", ">=", "+=", "-=", "*=",
		"/=",
	],
	string_quotes: &['\'', '"'],
	escape: Some('\\'),
	line_comment: None,
	block_comment: None,
	bracket_identifiers: false,
	placeholders: false,
	delimiters: Some(Delimiters::JINJA),
	null_keyword: "null",
	true_keyword: "true",
	false_keyword: "false",
	named_arguments: true,
	distinct_keyword: None,
	list_literals: true,
	subscripts: true,
	calls_on_expressions: true,
};

const fn op(tokens: &'static [&'static str], op: BinaryOp, precedence: u8, assoc: Assoc) -> OperatorSpec {
	OperatorSpec {
		tokens,
		op,
		precedence,
		assoc,
	}
}

static BINARY_OPERATORS: &[OperatorSpec] = &[
	op(&["or"], BinaryOp::Or, 2, Assoc::Left),
	op(&["and"], BinaryOp::And, 3, Assoc::Left),
	op(&["=="], BinaryOp::Eq, COMPARISON, Assoc::Left),
	op(&["!="], BinaryOp::NotEq, COMPARISON, Assoc::Left),
	op(&["==="], BinaryOp::Identical, COMPARISON, Assoc::Left),
	op(&["!=="], BinaryOp::NotIdentical, COMPARISON, Assoc::Left),
	op(&["<"], BinaryOp::Lt, COMPARISON, Assoc::Left),
	op(&[">"], BinaryOp::Gt, COMPARISON, Assoc::Left),
	op(&["<="], BinaryOp::LtEq, COMPARISON, Assoc::Left),
	op(&[">="], BinaryOp::GtEq, COMPARISON, Assoc::Left),
	op(&["in"], BinaryOp::In, COMPARISON, Assoc::Left),
	op(&["not", "in"], BinaryOp::NotIn, COMPARISON, Assoc::Left),
	op(&[".."], BinaryOp::Range, 6, Assoc::Left),
	op(&["~"], BinaryOp::Concat, 7, Assoc::Left),
	op(&["+"], BinaryOp::Add, 7, Assoc::Left),
	op(&["-"], BinaryOp::Sub, 7, Assoc::Left),
	op(&["*"], BinaryOp::Mul, 8, Assoc::Left),
	op(&["/"], BinaryOp::Div, 8, Assoc::Left),
	op(&["//"], BinaryOp::FloorDiv, 8, Assoc::Left),
	op(&["%"], BinaryOp::Mod, 8, Assoc::Left),
	op(&["**"], BinaryOp::Pow, 9, Assoc::Right),
];

static PREFIX_OPERATORS: &[PrefixSpec] = &[
	PrefixSpec {
		token: "not",
		op: UnaryOp::Not,
		precedence: 4,
	},
	PrefixSpec {
		token: "-",
		op: UnaryOp::Neg,
		precedence: 10,
	},
	PrefixSpec {
		token: "+",
		op: UnaryOp::Plus,
		precedence: 10,
	},
];

/// Grammar of template expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGrammar;

impl Grammar for TemplateGrammar {
	type Ext = TemplateExt;

	fn table(&self) -> &'static LanguageTable {
		&TEMPLATE_TABLE
	}

	fn binary_operators(&self) -> &'static [OperatorSpec] {
		BINARY_OPERATORS
	}

	fn prefix_operators(&self) -> &'static [PrefixSpec] {
		PREFIX_OPERATORS
	}

	/// `{ 'key': value, ... }` hash literals.
	fn primary_extension(&self, parser: &mut Parser<'_, Self>) -> Result<Option<TemplateExpr>> {
		if !parser.at_operator("{")? {
			return Ok(None);
		}
		let open = parser.expect_operator("{")?;
		let items = parser.parse_list_items("}")?;
		Ok(Some(Expr::new(ExprKind::List(items), open.position)))
	}

	fn infix_extension(
		&self,
		parser: &mut Parser<'_, Self>,
		left: TemplateExpr,
		min_precedence: u8,
	) -> Result<Infix<TemplateExt>> {
		let Some(token) = parser.peek()? else {
			return Ok(Infix::NotHandled(left));
		};
		let position = left.position;

		if token.is_operator("|") && FILTER >= min_precedence {
			parser.next_token()?;
			let (name, _) = parser.expect_identifier()?;
			let args = parse_optional_arguments(parser)?;
			let ext = TemplateExt::Filter {
				expr: Box::new(left),
				name,
				args,
			};
			return Ok(Infix::Handled(Expr::new(ExprKind::Ext(ext), position)));
		}

		if token.is_keyword("is") && COMPARISON >= min_precedence {
			parser.next_token()?;
			let negated = parser.eat_keyword("not")?;
			if parser.eat_keyword("defined")? {
				let ext = TemplateExt::Defined {
					expr: Box::new(left),
					negated,
				};
				return Ok(Infix::Handled(Expr::new(ExprKind::Ext(ext), position)));
			}
			let name = match parser.peek()? {
				Some(t) if t.kind == TokenKind::Identifier => t.lexeme.to_string(),
				Some(t) if t.is_keyword("null") => "null".to_string(),
				_ => return Err(parser.error_expected(["defined", "test name"])),
			};
			parser.next_token()?;
			let args = parse_optional_arguments(parser)?;
			let ext = TemplateExt::Test {
				expr: Box::new(left),
				name,
				args,
				negated,
			};
			return Ok(Infix::Handled(Expr::new(ExprKind::Ext(ext), position)));
		}

		if token.is_operator("?") && TERNARY >= min_precedence {
			parser.next_token()?;
			let then = parser.parse_expression()?;
			parser.expect_operator(":")?;
			let otherwise = parser.parse_expression_bp(TERNARY)?;
			let kind = ExprKind::Conditional {
				condition: Box::new(left),
				then: Box::new(then),
				otherwise: Box::new(otherwise),
			};
			return Ok(Infix::Handled(Expr::new(kind, position)));
		}

		Ok(Infix::NotHandled(left))
	}
}

fn parse_optional_arguments(
	parser: &mut Parser<'_, TemplateGrammar>,
) -> Result<Vec<Argument<TemplateExt>>> {
	if !parser.eat_operator("(")? {
		return Ok(Vec::new());
	}
	let (args, _) = parser.parse_arguments()?;
	Ok(args)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn parse(source: &str) -> TemplateExpr {
		let wrapped = format!("{{{{ {} }}}}", source);
		let mut parser = Parser::new(TemplateGrammar, &wrapped);
		parser.expect_kind(TokenKind::OpenEcho).unwrap();
		let expr = parser.parse_expression().unwrap();
		parser.expect_kind(TokenKind::CloseEcho).unwrap();
		expr
	}

	#[rstest]
	fn test_filter_binds_tighter_than_concat() {
		let expr = parse("a ~ b|upper");
		let ExprKind::Binary { op, right, .. } = expr.kind else {
			panic!("expected binary");
		};
		assert_eq!(op, BinaryOp::Concat);
		assert!(matches!(right.kind, ExprKind::Ext(TemplateExt::Filter { ref name, .. }) if name == "upper"));
	}

	#[rstest]
	fn test_filter_arguments() {
		let expr = parse("items|join(', ')");
		let ExprKind::Ext(TemplateExt::Filter { name, args, .. }) = expr.kind else {
			panic!("expected filter");
		};
		assert_eq!(name, "join");
		assert_eq!(args.len(), 1);
	}

	#[rstest]
	#[case("x is defined", false)]
	#[case("x is not defined", true)]
	fn test_defined(#[case] source: &str, #[case] expected: bool) {
		let expr = parse(source);
		assert!(matches!(
			expr.kind,
			ExprKind::Ext(TemplateExt::Defined { negated, .. }) if negated == expected
		));
	}

	#[rstest]
	fn test_named_test_with_arguments() {
		let expr = parse("n is divisibleby(3)");
		let ExprKind::Ext(TemplateExt::Test { name, args, negated, .. }) = expr.kind else {
			panic!("expected test");
		};
		assert_eq!(name, "divisibleby");
		assert_eq!(args.len(), 1);
		assert!(!negated);
	}

	#[rstest]
	fn test_ternary_is_loosest() {
		let expr = parse("a or b ? 1 : 2");
		let ExprKind::Conditional { condition, .. } = expr.kind else {
			panic!("expected conditional");
		};
		assert!(matches!(condition.kind, ExprKind::Binary { op: BinaryOp::Or, .. }));
	}

	#[rstest]
	fn test_power_is_right_associative() {
		let expr = parse("2 ** 3 ** 2");
		let ExprKind::Binary { op, right, .. } = expr.kind else {
			panic!("expected binary");
		};
		assert_eq!(op, BinaryOp::Pow);
		assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Pow, .. }));
	}

	#[rstest]
	fn test_not_in() {
		let expr = parse("a not in [1, 2]");
		assert!(matches!(expr.kind, ExprKind::Binary { op: BinaryOp::NotIn, .. }));
	}

	#[rstest]
	fn test_hash_literal() {
		let expr = parse("{'a': 1, 'b': 2}");
		let ExprKind::List(items) = expr.kind else {
			panic!("expected list");
		};
		assert_eq!(items[1].key.as_deref(), Some("b"));
	}

	#[rstest]
	fn test_range() {
		let expr = parse("1..3");
		assert!(matches!(expr.kind, ExprKind::Binary { op: BinaryOp::Range, .. }));
	}
}
