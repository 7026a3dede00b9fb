//! Expression parser behavior with a small arithmetic grammar.

use proptest::prelude::*;
use reinhardt_lang_core::{
	Assoc, BinaryOp, Error, Expr, ExprKind, Grammar, KeywordCase, LanguageTable, Literal,
	OperatorSpec, Parser, Position, PrefixSpec, Scanner, UnaryOp,
};
use rstest::rstest;

static TABLE: LanguageTable = LanguageTable {
	name: "arith",
	keywords: &["and", "or", "not", "null", "true", "false"],
	keyword_case: KeywordCase::Sensitive,
	operators: &["+", "-", "*", "/", "**", "(", ")", ",", ".", "[", "]", ":", "=="],
	string_quotes: &['\'', '"'],
	escape: Some('\\'),
	line_comment: None,
	block_comment: None,
	bracket_identifiers: false,
	placeholders: false,
	delimiters: None,
	null_keyword: "null",
	true_keyword: "true",
	false_keyword: "false",
	named_arguments: true,
	distinct_keyword: None,
	list_literals: true,
	subscripts: true,
	calls_on_expressions: false,
};

static BINARY: &[OperatorSpec] = &[
	OperatorSpec { tokens: &["or"], op: BinaryOp::Or, precedence: 1, assoc: Assoc::Left },
	OperatorSpec { tokens: &["and"], op: BinaryOp::And, precedence: 2, assoc: Assoc::Left },
	OperatorSpec { tokens: &["=="], op: BinaryOp::Eq, precedence: 4, assoc: Assoc::Left },
	OperatorSpec { tokens: &["+"], op: BinaryOp::Add, precedence: 5, assoc: Assoc::Left },
	OperatorSpec { tokens: &["-"], op: BinaryOp::Sub, precedence: 5, assoc: Assoc::Left },
	OperatorSpec { tokens: &["*"], op: BinaryOp::Mul, precedence: 6, assoc: Assoc::Left },
	OperatorSpec { tokens: &["/"], op: BinaryOp::Div, precedence: 6, assoc: Assoc::Left },
	OperatorSpec { tokens: &["**"], op: BinaryOp::Pow, precedence: 8, assoc: Assoc::Right },
];

static PREFIX: &[PrefixSpec] = &[
	PrefixSpec { token: "not", op: UnaryOp::Not, precedence: 3 },
	PrefixSpec { token: "-", op: UnaryOp::Neg, precedence: 7 },
];

#[derive(Debug, Clone, Copy)]
struct Arith;

impl Grammar for Arith {
	type Ext = ();

	fn table(&self) -> &'static LanguageTable {
		&TABLE
	}

	fn binary_operators(&self) -> &'static [OperatorSpec] {
		BINARY
	}

	fn prefix_operators(&self) -> &'static [PrefixSpec] {
		PREFIX
	}
}

/// Fully parenthesized rendering of a tree.
fn show(expr: &Expr<()>) -> String {
	match &expr.kind {
		ExprKind::Literal(Literal::Integer(i)) => i.to_string(),
		ExprKind::Literal(other) => other.to_string(),
		ExprKind::Identifier(name) => name.clone(),
		ExprKind::Unary { op, operand } => format!("({} {})", op, show(operand)),
		ExprKind::Binary { op, left, right } => format!("({} {} {})", show(left), op, show(right)),
		ExprKind::Grouped(inner) => format!("[{}]", show(inner)),
		ExprKind::Call { callee, args, .. } => {
			let args: Vec<String> = args
				.iter()
				.map(|a| match &a.name {
					Some(name) => format!("{}={}", name, show(&a.value)),
					None => show(&a.value),
				})
				.collect();
			format!("{}({})", show(callee), args.join(", "))
		}
		ExprKind::Member { object, property } => format!("{}.{}", show(object), property),
		ExprKind::Index { object, index } => format!("{}[{}]", show(object), show(index)),
		ExprKind::Slice { object, start, end } => format!(
			"{}[{}:{}]",
			show(object),
			start.as_ref().map(|e| show(e)).unwrap_or_default(),
			end.as_ref().map(|e| show(e)).unwrap_or_default()
		),
		ExprKind::List(items) => {
			let items: Vec<String> = items.iter().map(|i| show(&i.value)).collect();
			format!("list({})", items.join(", "))
		}
		ExprKind::Conditional { .. } | ExprKind::Ext(_) => unreachable!(),
	}
}

fn parse(source: &str) -> Result<Expr<()>, Error> {
	let mut parser = Parser::new(Arith, source);
	let expr = parser.parse_expression()?;
	if !parser.is_eof()? {
		return Err(parser.error_expected(["end of input"]));
	}
	Ok(expr)
}

#[rstest]
#[case("1 + 2 * 3", "(1 + (2 * 3))")]
#[case("1 - 2 - 3", "((1 - 2) - 3)")]
#[case("2 ** 3 ** 2", "(2 ** (3 ** 2))")]
#[case("(1 + 2) * 3", "([(1 + 2)] * 3)")]
#[case("not a == b and c", "((NOT (a = b)) AND c)")]
#[case("a or b and c", "(a OR (b AND c))")]
#[case("-a * b", "((- a) * b)")]
#[case("-5 + 1", "(-5 + 1)")]
#[case("f(1, limit: 2).x[0]", "f(1, limit=2).x[0]")]
#[case("items[1:]", "items[1:]")]
#[case("items[:2]", "items[:2]")]
#[case("[1, 2][0]", "list(1, 2)[0]")]
fn test_precedence_and_postfix(#[case] source: &str, #[case] expected: &str) {
	let expr = parse(source).unwrap();
	assert_eq!(show(&expr), expected);
}

#[rstest]
fn test_missing_operand_reports_expected_set() {
	let error = parse("1 +").unwrap_err();
	assert_eq!(
		error,
		Error::Syntax {
			position: Position::new(1, 4, 3),
			expected: vec!["expression".into()],
			found: "end of input".into(),
		}
	);
}

#[rstest]
fn test_unclosed_paren() {
	let error = parse("(1 + 2").unwrap_err();
	assert!(matches!(error, Error::Syntax { ref expected, .. } if expected == &vec!["')'".to_string()]));
}

#[rstest]
fn test_integer_overflow_is_rejected() {
	let error = parse("99999999999999999999").unwrap_err();
	assert!(matches!(error, Error::InvalidConstruct { .. }));
}

#[rstest]
fn test_expression_positions_point_at_first_token() {
	let expr = parse("  a + b").unwrap();
	assert_eq!(expr.position, Position::new(1, 3, 2));
}

fn token_strategy() -> impl Strategy<Value = String> {
	prop_oneof![
		"[a-z_][a-z0-9_]{0,6}",
		"[0-9]{1,5}",
		"[0-9]{1,3}\\.[0-9]{1,3}",
		"'[a-z ]{0,6}'",
		prop::sample::select(vec!["+", "-", "*", "**", "(", ")", ",", "==", "and", "not"])
			.prop_map(str::to_string),
	]
}

proptest! {
	/// Re-scanning the space-joined lexemes of a token stream yields the
	/// same stream.
	#[test]
	fn scanner_round_trip(pieces in prop::collection::vec(token_strategy(), 0..24)) {
		let source = pieces.join(" ");
		let first: Vec<(String, String)> = Scanner::new(&source, &TABLE)
			.map(|t| t.map(|t| (t.kind.to_string(), t.lexeme.to_string())))
			.collect::<Result<_, _>>()
			.unwrap();

		let rejoined = first.iter().map(|(_, l)| l.as_str()).collect::<Vec<_>>().join(" ");
		let second: Vec<(String, String)> = Scanner::new(&rejoined, &TABLE)
			.map(|t| t.map(|t| (t.kind.to_string(), t.lexeme.to_string())))
			.collect::<Result<_, _>>()
			.unwrap();

		prop_assert_eq!(first, second);
	}

	/// Parsing is a pure function of its input.
	#[test]
	fn parse_is_deterministic(a in 0i64..1000, b in 0i64..1000, name in "[a-z]{1,5}") {
		prop_assume!(!["and", "or", "not", "null", "true", "false"].contains(&name.as_str()));
		let source = format!("{} + {} * {}", a, name, b);
		prop_assert_eq!(parse(&source).unwrap(), parse(&source).unwrap());
	}
}
