//! Reference renderer for compiled templates
//!
//! Executes a [`CompiledTemplate`] against a JSON context. Values are
//! [`serde_json::Value`]; undefined names evaluate to `null`.
//!
//! ## Features
//!
//! - template inheritance through a [`TemplateLoader`]: blocks of the child
//!   replace the blocks of the same name in its parents
//! - includes, macros with literal defaults and named arguments
//! - the `loop` variable inside `for` (`index`, `index0`, `revindex`,
//!   `revindex0`, `first`, `last`, `length`)
//! - fragment caching for `{% cache %}`
//! - user filters, tests, functions and custom directive handlers
//!
//! Macro output and values passed through `raw`, `e` or `escape` are written
//! without further escaping.
//!
//! ## Example
//!
//! ```
//! use reinhardt_template_lang::render::Renderer;
//! use reinhardt_template_lang::translator::compile;
//! use serde_json::json;
//!
//! let compiled = compile("{% for n in items %}{{ n }}{% if not loop.last %}, {% endif %}{% endfor %}").unwrap();
//! let output = Renderer::new().render(&compiled, &json!({"items": [1, 2, 3]})).unwrap();
//! assert_eq!(output, "1, 2, 3");
//! ```

mod builtins;
mod error;
mod loader;
pub mod value;

pub use builtins::Args;
pub use error::{RenderError, RenderResult};
pub use loader::{MemoryLoader, TemplateLoader};

use crate::ast::{AssignOp, TemplateExpr, TemplateExt};
use crate::escape::escape_html_into;
use crate::instruction::{CompiledTemplate, Instruction, MacroDefinition};
use parking_lot::Mutex;
use reinhardt_lang_core::ast::{Argument, BinaryOp, ExprKind, UnaryOp};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use value::{
	binary, from_literal, is_truthy, normalize_index, slice_bounds, to_display, type_name,
};

pub type FilterFn = Arc<dyn Fn(&Value, &Args) -> RenderResult<Value> + Send + Sync>;
pub type TestFn = Arc<dyn Fn(&Value, &Args) -> RenderResult<bool> + Send + Sync>;
pub type FunctionFn = Arc<dyn Fn(&Args) -> RenderResult<Value> + Send + Sync>;
/// Handler of a custom directive: evaluated arguments and, for block
/// directives, the rendered body.
pub type ExtensionFn = Arc<dyn Fn(&Args, Option<&str>) -> RenderResult<String> + Send + Sync>;

const DEFAULT_MAX_DEPTH: usize = 64;
const MAX_EXTENDS: usize = 16;

struct Fragment {
	text: String,
	expires_at: Option<Instant>,
}

/// Executes compiled templates.
pub struct Renderer {
	filters: HashMap<String, FilterFn>,
	tests: HashMap<String, TestFn>,
	functions: HashMap<String, FunctionFn>,
	extensions: HashMap<String, ExtensionFn>,
	loader: Option<Arc<dyn TemplateLoader>>,
	fragments: Mutex<HashMap<String, Fragment>>,
	max_depth: usize,
}

impl Default for Renderer {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Renderer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Renderer")
			.field("filters", &self.filters.len())
			.field("tests", &self.tests.len())
			.field("functions", &self.functions.len())
			.field("extensions", &self.extensions.len())
			.field("has_loader", &self.loader.is_some())
			.field("max_depth", &self.max_depth)
			.finish()
	}
}

impl Renderer {
	/// Renderer with the built-in filters, tests and functions.
	pub fn new() -> Self {
		Self {
			filters: builtins::filters(),
			tests: builtins::tests(),
			functions: builtins::functions(),
			extensions: HashMap::new(),
			loader: None,
			fragments: Mutex::new(HashMap::new()),
			max_depth: DEFAULT_MAX_DEPTH,
		}
	}

	pub fn with_loader(mut self, loader: Arc<dyn TemplateLoader>) -> Self {
		self.loader = Some(loader);
		self
	}

	/// Limit on nested macro calls and includes.
	pub fn with_max_depth(mut self, max_depth: usize) -> Self {
		self.max_depth = max_depth;
		self
	}

	pub fn register_filter<F>(&mut self, name: impl Into<String>, filter: F)
	where
		F: Fn(&Value, &Args) -> RenderResult<Value> + Send + Sync + 'static,
	{
		self.filters.insert(name.into(), Arc::new(filter));
	}

	pub fn register_test<F>(&mut self, name: impl Into<String>, test: F)
	where
		F: Fn(&Value, &Args) -> RenderResult<bool> + Send + Sync + 'static,
	{
		self.tests.insert(name.into(), Arc::new(test));
	}

	pub fn register_function<F>(&mut self, name: impl Into<String>, function: F)
	where
		F: Fn(&Args) -> RenderResult<Value> + Send + Sync + 'static,
	{
		self.functions.insert(name.into(), Arc::new(function));
	}

	pub fn register_extension<F>(&mut self, name: impl Into<String>, handler: F)
	where
		F: Fn(&Args, Option<&str>) -> RenderResult<String> + Send + Sync + 'static,
	{
		self.extensions.insert(name.into(), Arc::new(handler));
	}

	/// Drop every cached fragment.
	pub fn clear_fragments(&self) {
		self.fragments.lock().clear();
	}

	/// Render `template` with `context`, which must be an object or null.
	pub fn render(&self, template: &CompiledTemplate, context: &Value) -> RenderResult<String> {
		let globals = match context {
			Value::Object(map) => map.clone(),
			Value::Null => Map::new(),
			other => {
				return Err(RenderError::type_error(format!(
					"render context must be an object, found {}",
					type_name(other)
				)));
			}
		};
		self.render_with(template, globals, 0)
	}

	/// Load `name` through the configured loader and render it.
	pub fn render_name(&self, name: &str, context: &Value) -> RenderResult<String> {
		let template = self.load(name)?;
		self.render(&template, context)
	}

	fn load(&self, name: &str) -> RenderResult<Arc<CompiledTemplate>> {
		match &self.loader {
			Some(loader) => loader.load(name),
			None => Err(RenderError::TemplateNotFound(name.to_string())),
		}
	}

	/// Parents of `template`, nearest first.
	fn parents(&self, template: &CompiledTemplate) -> RenderResult<Vec<Arc<CompiledTemplate>>> {
		let mut parents = Vec::new();
		let mut next = template.extends.clone();
		while let Some(name) = next {
			if parents.len() >= MAX_EXTENDS {
				return Err(RenderError::RecursionLimit(MAX_EXTENDS));
			}
			let parent = self.load(&name)?;
			next = parent.extends.clone();
			parents.push(parent);
		}
		Ok(parents)
	}

	fn render_with(
		&self,
		template: &CompiledTemplate,
		globals: Map<String, Value>,
		depth: usize,
	) -> RenderResult<String> {
		let parents = self.parents(template)?;
		let mut chain: Vec<&CompiledTemplate> = vec![template];
		chain.extend(parents.iter().map(Arc::as_ref));

		let mut blocks = HashMap::new();
		let mut macros = HashMap::new();
		for member in chain.iter().copied() {
			for (name, body) in member.blocks() {
				blocks.entry(name).or_insert(body);
			}
			for (name, definition) in &member.macros {
				macros.entry(name.as_str()).or_insert(definition);
			}
		}
		let root = chain.last().copied().unwrap_or(template);

		let mut state = State {
			renderer: self,
			scopes: vec![globals],
			blocks,
			macros,
			depth,
		};
		let mut out = String::new();
		state.exec(&root.instructions, &mut out)?;
		debug!(depth, parents = parents.len(), bytes = out.len(), "rendered template");
		Ok(out)
	}

	fn cached_fragment(&self, key: &str, now: Instant) -> Option<String> {
		let mut fragments = self.fragments.lock();
		match fragments.get(key) {
			Some(fragment) if fragment.expires_at.is_none_or(|at| at > now) => {
				Some(fragment.text.clone())
			}
			Some(_) => {
				fragments.remove(key);
				None
			}
			None => None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
	Normal,
	Break,
	Continue,
}

struct State<'a> {
	renderer: &'a Renderer,
	/// Innermost scope last; the first scope holds the render context
	scopes: Vec<Map<String, Value>>,
	blocks: HashMap<&'a str, &'a [Instruction]>,
	macros: HashMap<&'a str, &'a MacroDefinition>,
	depth: usize,
}

impl<'a> State<'a> {
	fn exec(&mut self, instructions: &'a [Instruction], out: &mut String) -> RenderResult<Flow> {
		for instruction in instructions {
			let flow = self.step(instruction, out)?;
			if flow != Flow::Normal {
				return Ok(flow);
			}
		}
		Ok(Flow::Normal)
	}

	fn step(&mut self, instruction: &'a Instruction, out: &mut String) -> RenderResult<Flow> {
		match instruction {
			Instruction::EmitLiteral { text } => out.push_str(text),
			Instruction::EmitExpr { expr, escape } => {
				let text = to_display(&self.eval(expr)?);
				if *escape && !self.is_safe(expr) {
					escape_html_into(&text, out);
				} else {
					out.push_str(&text);
				}
			}
			Instruction::Branch { branches, otherwise } => {
				for branch in branches {
					if is_truthy(&self.eval(&branch.condition)?) {
						return self.exec(&branch.body, out);
					}
				}
				return self.exec(otherwise, out);
			}
			Instruction::Loop {
				key,
				value,
				iterable,
				filter,
				body,
				otherwise,
			} => {
				let target = LoopTarget {
					key: key.as_deref(),
					value,
				};
				return self.run_loop(target, iterable, filter.as_ref(), body, otherwise, out);
			}
			Instruction::Assign { target, op, value } => self.assign(target, *op, value)?,
			Instruction::Evaluate { expr } => {
				self.eval(expr)?;
			}
			Instruction::Break => return Ok(Flow::Break),
			Instruction::Continue => return Ok(Flow::Continue),
			Instruction::Block { name, body } => {
				let body = self
					.blocks
					.get(name.as_str())
					.copied()
					.unwrap_or(body.as_slice());
				return self.exec(body, out);
			}
			Instruction::Include { template, with } => self.include(template, with.as_ref(), out)?,
			Instruction::Cache {
				key,
				lifetime,
				body,
			} => return self.cache(key, *lifetime, body, out),
			Instruction::Extension { name, args, body } => {
				return self.extension(name, args, body.as_deref(), out);
			}
		}
		Ok(Flow::Normal)
	}

	fn run_loop(
		&mut self,
		target: LoopTarget<'_>,
		iterable: &TemplateExpr,
		filter: Option<&TemplateExpr>,
		body: &'a [Instruction],
		otherwise: &'a [Instruction],
		out: &mut String,
	) -> RenderResult<Flow> {
		let entries: Vec<(Value, Value)> = match self.eval(iterable)? {
			Value::Array(items) => items
				.into_iter()
				.enumerate()
				.map(|(index, item)| (Value::from(index as u64), item))
				.collect(),
			Value::Object(map) => map.into_iter().map(|(k, v)| (Value::String(k), v)).collect(),
			Value::Null => Vec::new(),
			other => {
				return Err(RenderError::type_error(format!(
					"cannot iterate over {}",
					type_name(&other)
				)));
			}
		};

		let mut kept = Vec::with_capacity(entries.len());
		for (key, item) in entries {
			if let Some(filter) = filter {
				self.scopes.push(target.scope(&key, &item));
				let keep = self.eval(filter);
				self.scopes.pop();
				if !is_truthy(&keep?) {
					continue;
				}
			}
			kept.push((key, item));
		}

		if kept.is_empty() {
			return self.exec(otherwise, out);
		}

		let length = kept.len();
		for (index, (key, item)) in kept.into_iter().enumerate() {
			let mut scope = target.scope(&key, &item);
			scope.insert(
				"loop".to_string(),
				json!({
					"index": index + 1,
					"index0": index,
					"revindex": length - index,
					"revindex0": length - index - 1,
					"first": index == 0,
					"last": index + 1 == length,
					"length": length,
				}),
			);
			self.scopes.push(scope);
			let flow = self.exec(body, out);
			self.scopes.pop();
			if flow? == Flow::Break {
				break;
			}
		}
		Ok(Flow::Normal)
	}

	fn assign(&mut self, target: &str, op: AssignOp, value: &TemplateExpr) -> RenderResult<()> {
		let value = self.eval(value)?;
		let op = match op {
			AssignOp::Assign => None,
			AssignOp::Add => Some(BinaryOp::Add),
			AssignOp::Sub => Some(BinaryOp::Sub),
			AssignOp::Mul => Some(BinaryOp::Mul),
			AssignOp::Div => Some(BinaryOp::Div),
		};
		let value = match op {
			None => value,
			Some(op) => {
				let current = match self.lookup(target) {
					None | Some(Value::Null) => Value::from(0),
					Some(current) => current.clone(),
				};
				binary(op, &current, &value)?
			}
		};

		let index = self
			.scopes
			.iter()
			.rposition(|scope| scope.contains_key(target))
			.unwrap_or_else(|| self.scopes.len().saturating_sub(1));
		if let Some(scope) = self.scopes.get_mut(index) {
			scope.insert(target.to_string(), value);
		}
		Ok(())
	}

	fn include(
		&mut self,
		template: &TemplateExpr,
		with: Option<&TemplateExpr>,
		out: &mut String,
	) -> RenderResult<()> {
		let name = to_display(&self.eval(template)?);
		let mut globals = Map::new();
		for scope in &self.scopes {
			globals.extend(scope.clone());
		}
		if let Some(with) = with {
			match self.eval(with)? {
				Value::Object(extra) => globals.extend(extra),
				Value::Null => {}
				other => {
					return Err(RenderError::type_error(format!(
						"include variables must be an object, found {}",
						type_name(&other)
					)));
				}
			}
		}
		if self.depth >= self.renderer.max_depth {
			return Err(RenderError::RecursionLimit(self.renderer.max_depth));
		}
		let included = self.renderer.load(&name)?;
		trace!(template = %name, "including template");
		out.push_str(&self.renderer.render_with(&included, globals, self.depth + 1)?);
		Ok(())
	}

	fn cache(
		&mut self,
		key: &TemplateExpr,
		lifetime: Option<i64>,
		body: &'a [Instruction],
		out: &mut String,
	) -> RenderResult<Flow> {
		let key = to_display(&self.eval(key)?);
		let now = Instant::now();
		if let Some(text) = self.renderer.cached_fragment(&key, now) {
			trace!(key = %key, "fragment cache hit");
			out.push_str(&text);
			return Ok(Flow::Normal);
		}

		let mut text = String::new();
		let flow = self.exec(body, &mut text)?;
		out.push_str(&text);
		// a lifetime past what `Instant` can represent never expires
		let expires_at =
			lifetime.and_then(|seconds| now.checked_add(Duration::from_secs(seconds.max(0) as u64)));
		self.renderer
			.fragments
			.lock()
			.insert(key, Fragment { text, expires_at });
		Ok(flow)
	}

	fn extension(
		&mut self,
		name: &str,
		args: &[TemplateExpr],
		body: Option<&'a [Instruction]>,
		out: &mut String,
	) -> RenderResult<Flow> {
		let handler = self
			.renderer
			.extensions
			.get(name)
			.cloned()
			.ok_or_else(|| RenderError::UnknownExtension(name.to_string()))?;
		let mut evaluated = Vec::with_capacity(args.len());
		for arg in args {
			evaluated.push(self.eval(arg)?);
		}

		let mut flow = Flow::Normal;
		let content = match body {
			Some(body) => {
				let mut text = String::new();
				flow = self.exec(body, &mut text)?;
				Some(text)
			}
			None => None,
		};
		out.push_str(&handler(&Args::new(evaluated), content.as_deref())?);
		Ok(flow)
	}

	fn lookup(&self, name: &str) -> Option<&Value> {
		self.scopes.iter().rev().find_map(|scope| scope.get(name))
	}

	/// Whether the value of `expr` is already safe to write unescaped.
	fn is_safe(&self, expr: &TemplateExpr) -> bool {
		match &expr.ungrouped().kind {
			ExprKind::Call { callee, .. } => callee
				.as_identifier()
				.is_some_and(|name| self.macros.contains_key(name)),
			ExprKind::Ext(TemplateExt::Filter { name, .. }) => {
				matches!(name.as_str(), "raw" | "e" | "escape" | "nl2br")
			}
			_ => false,
		}
	}

	fn eval(&mut self, expr: &TemplateExpr) -> RenderResult<Value> {
		match &expr.kind {
			ExprKind::Literal(literal) => Ok(from_literal(literal)),
			ExprKind::Identifier(name) => Ok(self.lookup(name).cloned().unwrap_or(Value::Null)),
			ExprKind::Unary { op, operand } => {
				let operand = self.eval(operand)?;
				unary(*op, operand)
			}
			ExprKind::Binary {
				op: BinaryOp::And,
				left,
				right,
			} => {
				if !is_truthy(&self.eval(left)?) {
					return Ok(Value::Bool(false));
				}
				Ok(Value::Bool(is_truthy(&self.eval(right)?)))
			}
			ExprKind::Binary {
				op: BinaryOp::Or,
				left,
				right,
			} => {
				if is_truthy(&self.eval(left)?) {
					return Ok(Value::Bool(true));
				}
				Ok(Value::Bool(is_truthy(&self.eval(right)?)))
			}
			ExprKind::Binary { op, left, right } => {
				let left = self.eval(left)?;
				let right = self.eval(right)?;
				binary(*op, &left, &right)
			}
			ExprKind::Call { callee, args, .. } => self.call(callee, args),
			ExprKind::Member { .. } | ExprKind::Index { .. } => {
				Ok(self.resolve(expr)?.unwrap_or(Value::Null))
			}
			ExprKind::Slice { object, start, end } => {
				let object = self.eval(object)?;
				let start = self.slice_bound(start.as_deref())?;
				let end = self.slice_bound(end.as_deref())?;
				slice(object, start, end)
			}
			ExprKind::List(items) => {
				if items.iter().all(|item| item.key.is_none()) {
					let mut values = Vec::with_capacity(items.len());
					for item in items {
						values.push(self.eval(&item.value)?);
					}
					return Ok(Value::Array(values));
				}
				let mut map = Map::new();
				let mut next_index = 0u64;
				for item in items {
					let key = match &item.key {
						Some(key) => key.clone(),
						None => {
							next_index += 1;
							(next_index - 1).to_string()
						}
					};
					let value = self.eval(&item.value)?;
					map.insert(key, value);
				}
				Ok(Value::Object(map))
			}
			ExprKind::Grouped(inner) => self.eval(inner),
			ExprKind::Conditional {
				condition,
				then,
				otherwise,
			} => {
				if is_truthy(&self.eval(condition)?) {
					self.eval(then)
				} else {
					self.eval(otherwise)
				}
			}
			ExprKind::Ext(TemplateExt::Filter { expr, name, args }) => {
				let value = self.eval(expr)?;
				let args = self.args(args)?;
				let filter = self
					.renderer
					.filters
					.get(name)
					.cloned()
					.ok_or_else(|| RenderError::UnknownFilter(name.clone()))?;
				filter(&value, &args)
			}
			ExprKind::Ext(TemplateExt::Defined { expr, negated }) => {
				let defined = self.resolve(expr)?.is_some();
				Ok(Value::Bool(defined != *negated))
			}
			ExprKind::Ext(TemplateExt::Test {
				expr,
				name,
				args,
				negated,
			}) => {
				let value = self.eval(expr)?;
				let args = self.args(args)?;
				let test = self
					.renderer
					.tests
					.get(name)
					.cloned()
					.ok_or_else(|| RenderError::UnknownTest(name.clone()))?;
				Ok(Value::Bool(test(&value, &args)? != *negated))
			}
		}
	}

	/// Look up a variable path, distinguishing missing values from `null`.
	fn resolve(&mut self, expr: &TemplateExpr) -> RenderResult<Option<Value>> {
		match &expr.kind {
			ExprKind::Identifier(name) => Ok(self.lookup(name).cloned()),
			ExprKind::Member { object, property } => {
				Ok(self.resolve(object)?.and_then(|object| member(&object, property)))
			}
			ExprKind::Index { object, index } => {
				let Some(object) = self.resolve(object)? else {
					return Ok(None);
				};
				let index = self.eval(index)?;
				Ok(subscript(&object, &index))
			}
			ExprKind::Grouped(inner) => self.resolve(inner),
			_ => self.eval(expr).map(Some),
		}
	}

	fn slice_bound(&mut self, bound: Option<&TemplateExpr>) -> RenderResult<Option<i64>> {
		let Some(bound) = bound else {
			return Ok(None);
		};
		match self.eval(bound)? {
			Value::Null => Ok(None),
			value => value
				.as_i64()
				.map(Some)
				.ok_or_else(|| RenderError::type_error("slice bounds must be integers")),
		}
	}

	fn args(&mut self, args: &[Argument<TemplateExt>]) -> RenderResult<Args> {
		let mut evaluated = Args::default();
		for arg in args {
			let value = self.eval(&arg.value)?;
			match &arg.name {
				Some(name) => {
					evaluated.named.insert(name.clone(), value);
				}
				None => evaluated.positional.push(value),
			}
		}
		Ok(evaluated)
	}

	fn call(&mut self, callee: &TemplateExpr, args: &[Argument<TemplateExt>]) -> RenderResult<Value> {
		let Some(name) = callee.ungrouped().as_identifier() else {
			return Err(RenderError::NotCallable);
		};
		if let Some(definition) = self.macros.get(name).copied() {
			return self.call_macro(name, definition, args);
		}
		let function = self
			.renderer
			.functions
			.get(name)
			.cloned()
			.ok_or_else(|| RenderError::UnknownFunction(name.to_string()))?;
		let args = self.args(args)?;
		function(&args)
	}

	/// Run a macro body in a scope holding only its parameters.
	fn call_macro(
		&mut self,
		name: &str,
		definition: &'a MacroDefinition,
		args: &[Argument<TemplateExt>],
	) -> RenderResult<Value> {
		if self.depth >= self.renderer.max_depth {
			return Err(RenderError::RecursionLimit(self.renderer.max_depth));
		}
		let args = self.args(args)?;
		let mut frame = Map::new();
		for (index, param) in definition.params.iter().enumerate() {
			let value = match (args.get(index, &param.name), &param.default) {
				(Some(value), _) => value.clone(),
				(None, Some(default)) => from_literal(default),
				(None, None) => {
					return Err(RenderError::MissingArgument {
						name: name.to_string(),
						param: param.name.clone(),
					});
				}
			};
			frame.insert(param.name.clone(), value);
		}

		let saved = std::mem::replace(&mut self.scopes, vec![frame]);
		self.depth += 1;
		let mut out = String::new();
		let result = self.exec(&definition.body, &mut out);
		self.depth -= 1;
		self.scopes = saved;
		result?;
		Ok(Value::String(out))
	}
}

/// Names bound by one loop iteration.
#[derive(Clone, Copy)]
struct LoopTarget<'n> {
	key: Option<&'n str>,
	value: &'n str,
}

impl LoopTarget<'_> {
	fn scope(&self, key: &Value, item: &Value) -> Map<String, Value> {
		let mut scope = Map::new();
		if let Some(name) = self.key {
			scope.insert(name.to_string(), key.clone());
		}
		scope.insert(self.value.to_string(), item.clone());
		scope
	}
}

fn unary(op: UnaryOp, operand: Value) -> RenderResult<Value> {
	match op {
		UnaryOp::Not => Ok(Value::Bool(!is_truthy(&operand))),
		UnaryOp::Neg => binary(BinaryOp::Sub, &Value::from(0), &operand),
		UnaryOp::Plus if operand.is_number() => Ok(operand),
		other => Err(RenderError::type_error(format!(
			"operator {} cannot be applied to {}",
			other,
			type_name(&operand)
		))),
	}
}

fn member(object: &Value, property: &str) -> Option<Value> {
	match object {
		Value::Object(map) => map.get(property).cloned(),
		Value::Array(items) => property.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
		_ => None,
	}
}

fn subscript(object: &Value, index: &Value) -> Option<Value> {
	match object {
		Value::Array(items) => index
			.as_i64()
			.and_then(|i| normalize_index(i, items.len()))
			.and_then(|i| items.get(i).cloned()),
		Value::Object(map) => map.get(&to_display(index)).cloned(),
		Value::String(s) => {
			let chars: Vec<char> = s.chars().collect();
			index
				.as_i64()
				.and_then(|i| normalize_index(i, chars.len()))
				.and_then(|i| chars.get(i))
				.map(|c| Value::String(c.to_string()))
		}
		_ => None,
	}
}

fn slice(object: Value, start: Option<i64>, end: Option<i64>) -> RenderResult<Value> {
	match object {
		Value::Array(items) => {
			let (start, end) = slice_bounds(start, end, items.len());
			Ok(Value::Array(items[start..end].to_vec()))
		}
		Value::String(s) => {
			let chars: Vec<char> = s.chars().collect();
			let (start, end) = slice_bounds(start, end, chars.len());
			Ok(Value::String(chars[start..end].iter().collect()))
		}
		Value::Null => Ok(Value::Null),
		other => Err(RenderError::type_error(format!(
			"cannot slice {}",
			type_name(&other)
		))),
	}
}
