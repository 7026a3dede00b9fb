//! Compiled templates executed by the reference renderer.

use reinhardt_lang_core::{Argument, BinaryOp, Expr, ExprKind, Literal, Position};
use reinhardt_template_lang::ast::MacroParam;
use reinhardt_template_lang::render::{Args, RenderError};
use reinhardt_template_lang::{
	compile, parse_template, Branch, CompiledTemplate, ExtensionTable, Instruction, MacroDefinition,
	MemoryLoader, Renderer, TagKind, TemplateExpr, TemplateTranslator,
};
use rstest::{fixture, rstest};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

fn render(source: &str, context: Value) -> String {
	let compiled = compile(source).unwrap();
	Renderer::new().render(&compiled, &context).unwrap()
}

#[fixture]
fn loader() -> Arc<MemoryLoader> {
	let loader = MemoryLoader::new();
	loader
		.add_source(
			"base",
			"<title>{% block title %}Site{% endblock %}</title><main>{% block body %}{% endblock %}</main>",
		)
		.unwrap();
	loader
		.add_source(
			"page",
			"{% extends 'base' %}{% block body %}<h1>{{ heading }}</h1>{% endblock %}",
		)
		.unwrap();
	loader
		.add_source(
			"article",
			"{% extends 'page' %}{% block title %}{{ heading }} | Site{% endblock %}",
		)
		.unwrap();
	loader
		.add_source("item", "<li>{{ label }}</li>")
		.unwrap();
	Arc::new(loader)
}

#[rstest]
fn test_greeting_is_escaped() {
	let output = render("Hello {{ name }}!", json!({"name": "<b>A</b>"}));

	assert_eq!(output, "Hello &lt;b&gt;A&lt;/b&gt;!");
}

#[rstest]
#[case("{{ html|raw }}", "<i>x</i>")]
#[case("{% autoescape false %}{{ html }}{% endautoescape %}", "<i>x</i>")]
#[case("{{ html|e }}", "&lt;i&gt;x&lt;/i&gt;")]
#[case("{{ html|upper }}", "&lt;I&gt;X&lt;/I&gt;")]
fn test_escaping_modes(#[case] source: &str, #[case] expected: &str) {
	assert_eq!(render(source, json!({"html": "<i>x</i>"})), expected);
}

#[rstest]
#[case(json!({"x": true}), "A")]
#[case(json!({"x": 0}), "B")]
#[case(json!({}), "B")]
fn test_if_else(#[case] context: Value, #[case] expected: &str) {
	assert_eq!(
		render("{% if x %}A{% else %}B{% endif %}", context),
		expected
	);
}

#[rstest]
fn test_elseif_chain() {
	let source = "{% if n > 10 %}big{% elseif n > 5 %}medium{% else %}small{% endif %}";

	assert_eq!(render(source, json!({"n": 7})), "medium");
	assert_eq!(render(source, json!({"n": 11})), "big");
	assert_eq!(render(source, json!({"n": 1})), "small");
}

#[rstest]
fn test_loop_variable() {
	let source = "{% for item in items %}{{ loop.index }}:{{ item }}{% if not loop.last %},{% endif %}{% endfor %}";

	assert_eq!(render(source, json!({"items": ["a", "b", "c"]})), "1:a,2:b,3:c");
}

#[rstest]
fn test_loop_with_key_filter_and_else() {
	let source = "{% for k, v in scores if v > 1 %}{{ k }}={{ v }};{% else %}none{% endfor %}";

	assert_eq!(render(source, json!({"scores": {"a": 1, "b": 2, "c": 3}})), "b=2;c=3;");
	assert_eq!(render(source, json!({"scores": {"a": 1}})), "none");
	assert_eq!(render(source, json!({})), "none");
}

#[rstest]
fn test_break_and_continue() {
	let source = "{% for n in 1..10 %}{% if n == 2 %}{% continue %}{% endif %}{% if n > 4 %}{% break %}{% endif %}{{ n }}{% endfor %}";

	assert_eq!(render(source, json!({})), "134");
}

#[rstest]
fn test_set_and_compound_assignment() {
	let source = "{% set total = 0 %}{% for n in [1, 2, 3] %}{% set total += n %}{% endfor %}{{ total }}";

	assert_eq!(render(source, json!({})), "6");
}

#[rstest]
#[case("{{ 7 // 2 }}", "3")]
#[case("{{ 6 / 3 }}", "2")]
#[case("{{ 2 ** 10 }}", "1024")]
#[case("{{ 'a' ~ 1 ~ true }}", "a1true")]
#[case("{{ missing is defined ? 'yes' : 'no' }}", "no")]
#[case("{{ 4 is even }}", "true")]
#[case("{{ [3, 1, 2]|sort|join('-') }}", "1-2-3")]
#[case("{{ 'hello'[1:3] }}", "el")]
#[case("{{ {'a': 1}['a'] }}", "1")]
#[case("{{ null|default('fallback') }}", "fallback")]
fn test_expressions(#[case] source: &str, #[case] expected: &str) {
	assert_eq!(render(source, json!({})), expected);
}

#[rstest]
fn test_division_by_zero_is_an_error() {
	let compiled = compile("{{ 1 / 0 }}").unwrap();

	let err = Renderer::new().render(&compiled, &json!({})).unwrap_err();
	assert!(matches!(err, RenderError::DivisionByZero));
}

#[rstest]
fn test_macros_with_defaults_and_named_arguments() {
	let source = "{% macro link(href, label = 'here') %}<a href=\"{{ href }}\">{{ label }}</a>{% endmacro %}{{ link('/a') }} {{ link(label: 'B', href: '/b') }}";

	assert_eq!(
		render(source, json!({})),
		"<a href=\"/a\">here</a> <a href=\"/b\">B</a>"
	);
}

#[rstest]
fn test_macro_scope_is_isolated() {
	let source = "{% macro show() %}[{{ secret }}]{% endmacro %}{{ show() }}";

	assert_eq!(render(source, json!({"secret": "s"})), "[]");
}

#[rstest]
fn test_missing_macro_argument() {
	let compiled = compile("{% macro m(a) %}{{ a }}{% endmacro %}{{ m() }}").unwrap();

	let err = Renderer::new().render(&compiled, &json!({})).unwrap_err();
	assert!(matches!(err, RenderError::MissingArgument { .. }));
}

#[rstest]
fn test_two_level_inheritance(loader: Arc<MemoryLoader>) {
	let renderer = Renderer::new().with_loader(loader);

	let output = renderer
		.render_name("article", &json!({"heading": "News"}))
		.unwrap();

	assert_eq!(output, "<title>News | Site</title><main><h1>News</h1></main>");
}

#[rstest]
fn test_include_with_variables(loader: Arc<MemoryLoader>) {
	let renderer = Renderer::new().with_loader(loader);
	let compiled = compile(
		"<ul>{% for x in xs %}{% include 'item' with {'label': x} %}{% endfor %}</ul>",
	)
	.unwrap();

	let output = renderer.render(&compiled, &json!({"xs": ["a", "b"]})).unwrap();

	assert_eq!(output, "<ul><li>a</li><li>b</li></ul>");
}

#[rstest]
fn test_missing_parent_template() {
	let compiled = compile("{% extends 'nowhere' %}").unwrap();

	let err = Renderer::new().render(&compiled, &json!({})).unwrap_err();
	assert!(matches!(err, RenderError::TemplateNotFound(name) if name == "nowhere"));
}

#[rstest]
fn test_cached_fragment_is_reused() {
	let renderer = Renderer::new();
	let compiled = compile("{% cache 'greeting' %}{{ name }}{% endcache %}").unwrap();

	let first = renderer.render(&compiled, &json!({"name": "first"})).unwrap();
	let second = renderer.render(&compiled, &json!({"name": "second"})).unwrap();
	renderer.clear_fragments();
	let third = renderer.render(&compiled, &json!({"name": "third"})).unwrap();

	assert_eq!(first, "first");
	assert_eq!(second, "first");
	assert_eq!(third, "third");
}

#[rstest]
fn test_fragment_lifetime_beyond_clock_range() {
	let renderer = Renderer::new();
	let compiled = compile("{% cache 'k' 9223372036854775807 %}{{ n }}{% endcache %}").unwrap();

	let first = renderer.render(&compiled, &json!({"n": 1})).unwrap();
	let second = renderer.render(&compiled, &json!({"n": 2})).unwrap();

	assert_eq!((first.as_str(), second.as_str()), ("1", "1"));
}

#[rstest]
fn test_custom_filter_and_function() {
	let mut renderer = Renderer::new();
	renderer.register_filter("shout", |value: &Value, _args: &Args| {
		Ok(Value::String(format!("{}!", value.as_str().unwrap_or_default())))
	});
	renderer.register_function("answer", |_args: &Args| Ok(json!(42)));
	let compiled = compile("{{ 'hi'|shout }} {{ answer() }}").unwrap();

	assert_eq!(renderer.render(&compiled, &json!({})).unwrap(), "hi! 42");
}

#[rstest]
fn test_unknown_filter_is_a_render_error() {
	let compiled = compile("{{ x|nope }}").unwrap();

	let err = Renderer::new().render(&compiled, &json!({"x": 1})).unwrap_err();
	assert!(matches!(err, RenderError::UnknownFilter(name) if name == "nope"));
}

#[rstest]
fn test_block_extension_receives_rendered_body() {
	let extensions = ExtensionTable::new().with_tag("wrap", TagKind::Block);
	let template = parse_template("{% wrap 'div' %}{{ x }}{% endwrap %}").unwrap();
	let compiled = TemplateTranslator::new(&extensions).translate(&template).unwrap();
	let mut renderer = Renderer::new();
	renderer.register_extension("wrap", |args: &Args, body: Option<&str>| {
		let tag = args.positional.first().and_then(Value::as_str).unwrap_or("span");
		Ok(format!("<{tag}>{}</{tag}>", body.unwrap_or_default()))
	});

	let output = renderer.render(&compiled, &json!({"x": "<y>"})).unwrap();

	assert_eq!(output, "<div>&lt;y&gt;</div>");
}

#[rstest]
fn test_context_must_be_an_object() {
	let compiled = compile("x").unwrap();

	let err = Renderer::new().render(&compiled, &json!([1])).unwrap_err();
	assert!(matches!(err, RenderError::Type(_)));
}

fn ident(name: &str) -> TemplateExpr {
	Expr::new(ExprKind::Identifier(name.to_string()), Position::START)
}

fn int(value: i64) -> TemplateExpr {
	Expr::literal(Literal::Integer(value), Position::START)
}

fn text(value: &str) -> TemplateExpr {
	Expr::literal(Literal::String(value.to_string()), Position::START)
}

fn binary(op: BinaryOp, left: TemplateExpr, right: TemplateExpr) -> TemplateExpr {
	Expr::new(
		ExprKind::Binary {
			op,
			left: Box::new(left),
			right: Box::new(right),
		},
		Position::START,
	)
}

fn literal(text: &str) -> Instruction {
	Instruction::EmitLiteral {
		text: text.to_string(),
	}
}

fn echo(expr: TemplateExpr) -> Instruction {
	Instruction::EmitExpr { expr, escape: true }
}

fn program(instructions: Vec<Instruction>) -> CompiledTemplate {
	CompiledTemplate {
		instructions,
		..CompiledTemplate::default()
	}
}

fn assert_same_output(
	renderer: &Renderer,
	compiled: &CompiledTemplate,
	expected: &CompiledTemplate,
	context: Value,
) {
	let from_source = renderer.render(compiled, &context).unwrap();
	let by_hand = renderer.render(expected, &context).unwrap();

	assert_eq!(from_source, by_hand, "context: {context}");
}

#[rstest]
#[case(json!({"n": 0}))]
#[case(json!({"n": 1}))]
#[case(json!({"n": 5}))]
fn test_branch_matches_hand_built_instructions(#[case] context: Value) {
	let compiled =
		compile("{% if n > 1 %}many{% elseif n == 1 %}one{% else %}none{% endif %}").unwrap();
	let expected = program(vec![Instruction::Branch {
		branches: vec![
			Branch {
				condition: binary(BinaryOp::Gt, ident("n"), int(1)),
				body: vec![literal("many")],
			},
			Branch {
				condition: binary(BinaryOp::Eq, ident("n"), int(1)),
				body: vec![literal("one")],
			},
		],
		otherwise: vec![literal("none")],
	}]);

	assert_same_output(&Renderer::new(), &compiled, &expected, context);
}

#[rstest]
#[case(json!({"items": ["a", "<b>"]}))]
#[case(json!({"items": []}))]
fn test_loop_with_else_matches_hand_built_instructions(#[case] context: Value) {
	let compiled = compile("{% for item in items %}[{{ item }}]{% else %}empty{% endfor %}").unwrap();
	let expected = program(vec![Instruction::Loop {
		key: None,
		value: "item".to_string(),
		iterable: ident("items"),
		filter: None,
		body: vec![literal("["), echo(ident("item")), literal("]")],
		otherwise: vec![literal("empty")],
	}]);

	assert_same_output(&Renderer::new(), &compiled, &expected, context);
}

#[rstest]
fn test_macro_matches_hand_built_instructions() {
	let compiled = compile(
		"{% macro greet(name, greeting = 'Hello') %}{{ greeting }}, {{ name }}!{% endmacro %}{{ greet(user) }}",
	)
	.unwrap();
	let call = Expr::new(
		ExprKind::Call {
			callee: Box::new(ident("greet")),
			args: vec![Argument {
				name: None,
				value: ident("user"),
			}],
			distinct: false,
		},
		Position::START,
	);
	let macros = BTreeMap::from([(
		"greet".to_string(),
		MacroDefinition {
			params: vec![
				MacroParam {
					name: "name".to_string(),
					default: None,
				},
				MacroParam {
					name: "greeting".to_string(),
					default: Some(Literal::String("Hello".to_string())),
				},
			],
			body: vec![echo(ident("greeting")), literal(", "), echo(ident("name")), literal("!")],
		},
	)]);
	let expected = CompiledTemplate {
		instructions: vec![echo(call)],
		macros,
		..CompiledTemplate::default()
	};

	assert_same_output(&Renderer::new(), &compiled, &expected, json!({"user": "<Ann>"}));
	assert_eq!(
		Renderer::new().render(&expected, &json!({"user": "<Ann>"})).unwrap(),
		"Hello, &lt;Ann&gt;!"
	);
}

#[rstest]
fn test_extension_pair_matches_hand_built_instructions() {
	let extensions = ExtensionTable::new().with_tag("wrap", TagKind::Block);
	let template = parse_template("{% wrap 'p' %}{{ x }}!{% endwrap %}").unwrap();
	let compiled = TemplateTranslator::new(&extensions).translate(&template).unwrap();
	let expected = program(vec![Instruction::Extension {
		name: "wrap".to_string(),
		args: vec![text("p")],
		body: Some(vec![echo(ident("x")), literal("!")]),
	}]);
	let mut renderer = Renderer::new();
	renderer.register_extension("wrap", |args: &Args, body: Option<&str>| {
		let tag = args.positional.first().and_then(Value::as_str).unwrap_or("span");
		Ok(format!("<{tag}>{}</{tag}>", body.unwrap_or_default()))
	});

	assert_same_output(&renderer, &compiled, &expected, json!({"x": "a&b"}));
}
