//! Template source to instruction sequence.

use proptest::prelude::*;
use reinhardt_lang_core::ast::ExprKind;
use reinhardt_lang_core::{Error, ErrorKind};
use reinhardt_template_lang::{
	compile, parse_template, CompiledTemplate, ExtensionTable, Instruction, TagKind,
	TemplateTranslator,
};
use rstest::rstest;

fn literal(text: &str) -> Instruction {
	Instruction::EmitLiteral {
		text: text.to_string(),
	}
}

#[rstest]
fn test_greeting_compiles_to_three_instructions() {
	let compiled = compile("Hello {{ name }}!").unwrap();

	assert_eq!(compiled.instructions.len(), 3);
	assert_eq!(compiled.instructions[0], literal("Hello "));
	let Instruction::EmitExpr { expr, escape } = &compiled.instructions[1] else {
		panic!("expected an expression, got {:?}", compiled.instructions[1]);
	};
	assert_eq!(expr.kind, ExprKind::Identifier("name".to_string()));
	assert!(escape);
	assert_eq!(compiled.instructions[2], literal("!"));
}

#[rstest]
fn test_balanced_if_else() {
	let compiled = compile("{% if x %}A{% else %}B{% endif %}").unwrap();

	let [Instruction::Branch { branches, otherwise }] = compiled.instructions.as_slice() else {
		panic!("expected one branch, got {:?}", compiled.instructions);
	};
	assert_eq!(branches.len(), 1);
	assert_eq!(branches[0].body, vec![literal("A")]);
	assert_eq!(otherwise, &vec![literal("B")]);
}

#[rstest]
fn test_extra_endif_is_unbalanced() {
	let err = compile("{% if x %}A{% endif %}{% endif %}").unwrap_err();

	assert_eq!(err.kind(), ErrorKind::Syntax);
	let Error::UnbalancedBlock {
		expected_closer,
		found,
		..
	} = err
	else {
		panic!("expected an unbalanced block, got {:?}", err);
	};
	assert_eq!(expected_closer, "end of template");
	assert_eq!(found, "endif");
}

#[rstest]
#[case("{% for x in xs %}{{ x }}", "endfor")]
#[case("{% block a %}", "endblock")]
#[case("{% if a %}{% for b in c %}{% endif %}", "endfor")]
fn test_unclosed_blocks(#[case] source: &str, #[case] expected: &str) {
	let err = compile(source).unwrap_err();

	let Error::UnbalancedBlock {
		expected_closer, ..
	} = err
	else {
		panic!("expected an unbalanced block, got {:?}", err);
	};
	assert_eq!(expected_closer, expected);
}

#[rstest]
#[case("")]
#[case("{# only a comment #}")]
fn test_empty_template(#[case] source: &str) {
	let compiled = compile(source).unwrap();

	assert!(compiled.is_empty());
	assert_eq!(compiled, CompiledTemplate::default());
}

#[rstest]
fn test_literal_only_template() {
	let compiled = compile("<p>plain {text} with % signs</p>").unwrap();

	assert_eq!(
		compiled.instructions,
		vec![literal("<p>plain {text} with % signs</p>")]
	);
}

#[rstest]
fn test_raw_and_autoescape_control_escaping() {
	let compiled = compile(
		"{{ a|raw }}{% autoescape false %}{{ b }}{% autoescape true %}{{ c }}{% endautoescape %}{% endautoescape %}",
	)
	.unwrap();

	let escapes: Vec<bool> = compiled
		.instructions
		.iter()
		.filter_map(|instruction| match instruction {
			Instruction::EmitExpr { escape, .. } => Some(*escape),
			_ => None,
		})
		.collect();
	assert_eq!(escapes, vec![false, false, true]);
}

#[rstest]
fn test_translator_without_autoescape() {
	let extensions = ExtensionTable::new();
	let template = parse_template("{{ a }}").unwrap();

	let compiled = TemplateTranslator::new(&extensions)
		.with_autoescape(false)
		.translate(&template)
		.unwrap();

	assert!(matches!(
		compiled.instructions[0],
		Instruction::EmitExpr { escape: false, .. }
	));
}

#[rstest]
fn test_registered_block_directive() {
	let extensions = ExtensionTable::new().with_tag("markdown", TagKind::Block);
	let template = parse_template("{% markdown %}*hi*{% endmarkdown %}").unwrap();

	let compiled = TemplateTranslator::new(&extensions)
		.translate(&template)
		.unwrap();

	assert_eq!(
		compiled.instructions,
		vec![Instruction::Extension {
			name: "markdown".to_string(),
			args: Vec::new(),
			body: Some(vec![literal("*hi*")]),
		}]
	);
}

#[rstest]
fn test_unregistered_directive_is_rejected() {
	let err = compile("{% markdown %}x{% endmarkdown %}").unwrap_err();

	assert_eq!(err.kind(), ErrorKind::Resolution);
}

#[rstest]
#[case("{% extends 'base' %}<p>stray</p>")]
#[case("<p>x</p>{% extends 'base' %}")]
#[case("{% break %}")]
#[case("{% macro m(a = b) %}{% endmacro %}")]
#[case("{% macro m() %}{% endmacro %}{% macro m() %}{% endmacro %}")]
fn test_invalid_constructs(#[case] source: &str) {
	assert!(compile(source).is_err(), "{} should not compile", source);
}

proptest! {
	#[test]
	fn prop_compilation_is_deterministic(
		words in proptest::collection::vec("[a-z]{1,6}", 1..6),
		escape in any::<bool>(),
	) {
		let body = words
			.iter()
			.map(|word| format!("{{{{ {} }}}} {} ", word, word))
			.collect::<String>();
		let source = if escape {
			body
		} else {
			format!("{{% autoescape false %}}{}{{% endautoescape %}}", body)
		};

		let first = compile(&source);
		let second = compile(&source);
		prop_assert_eq!(first, second);
	}
}
