//! Built-in filters, tests and functions of the reference renderer.
//!
//! Each filter takes the filtered value and its evaluated [`Args`], in the
//! same shape as user-registered filters.

use super::error::{RenderError, RenderResult};
use super::value::{compare, is_truthy, length, loose_eq, to_display, type_name};
use super::{FilterFn, FunctionFn, TestFn};
use crate::escape::{escape_html, escape_js, escape_url};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Evaluated call arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
	pub positional: Vec<Value>,
	pub named: BTreeMap<String, Value>,
}

impl Args {
	pub fn new(positional: Vec<Value>) -> Self {
		Self {
			positional,
			named: BTreeMap::new(),
		}
	}

	/// Argument passed by `name` or else at position `index`.
	pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
		self.named.get(name).or_else(|| self.positional.get(index))
	}

	pub fn is_empty(&self) -> bool {
		self.positional.is_empty() && self.named.is_empty()
	}
}

fn require_str<'v>(filter: &str, value: &'v Value) -> RenderResult<&'v str> {
	value.as_str().ok_or_else(|| {
		RenderError::type_error(format!(
			"{} filter requires a string, found {}",
			filter,
			type_name(value)
		))
	})
}

fn require_array<'v>(filter: &str, value: &'v Value) -> RenderResult<&'v [Value]> {
	match value {
		Value::Array(items) => Ok(items.as_slice()),
		other => Err(RenderError::type_error(format!(
			"{} filter requires an array, found {}",
			filter,
			type_name(other)
		))),
	}
}

/// Escape HTML; non-strings are escaped in their display form.
pub fn escape(value: &Value, _args: &Args) -> RenderResult<Value> {
	Ok(Value::String(escape_html(&to_display(value))))
}

pub fn escape_js_filter(value: &Value, _args: &Args) -> RenderResult<Value> {
	Ok(Value::String(escape_js(&to_display(value))))
}

pub fn url_encode(value: &Value, _args: &Args) -> RenderResult<Value> {
	Ok(Value::String(escape_url(&to_display(value))))
}

pub fn raw(value: &Value, _args: &Args) -> RenderResult<Value> {
	Ok(value.clone())
}

pub fn upper(value: &Value, _args: &Args) -> RenderResult<Value> {
	Ok(Value::String(require_str("upper", value)?.to_uppercase()))
}

pub fn lower(value: &Value, _args: &Args) -> RenderResult<Value> {
	Ok(Value::String(require_str("lower", value)?.to_lowercase()))
}

/// Uppercase the first character, lowercase the rest.
pub fn capitalize(value: &Value, _args: &Args) -> RenderResult<Value> {
	let s = require_str("capitalize", value)?;
	let mut chars = s.chars();
	let out = match chars.next() {
		Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
		None => String::new(),
	};
	Ok(Value::String(out))
}

pub fn title(value: &Value, _args: &Args) -> RenderResult<Value> {
	let s = require_str("title", value)?;
	let mut out = String::with_capacity(s.len());
	let mut at_word_start = true;
	for c in s.chars() {
		if at_word_start {
			out.extend(c.to_uppercase());
		} else {
			out.extend(c.to_lowercase());
		}
		at_word_start = !c.is_alphanumeric();
	}
	Ok(Value::String(out))
}

pub fn trim(value: &Value, _args: &Args) -> RenderResult<Value> {
	Ok(Value::String(require_str("trim", value)?.trim().to_string()))
}

pub fn left_trim(value: &Value, _args: &Args) -> RenderResult<Value> {
	Ok(Value::String(require_str("left_trim", value)?.trim_start().to_string()))
}

pub fn right_trim(value: &Value, _args: &Args) -> RenderResult<Value> {
	Ok(Value::String(require_str("right_trim", value)?.trim_end().to_string()))
}

pub fn length_filter(value: &Value, _args: &Args) -> RenderResult<Value> {
	length(value)
		.map(|len| Value::from(len as u64))
		.ok_or_else(|| RenderError::type_error(format!("{} has no length", type_name(value))))
}

/// `value` unless it is null, empty or false.
pub fn default(value: &Value, args: &Args) -> RenderResult<Value> {
	if is_truthy(value) {
		return Ok(value.clone());
	}
	Ok(args.get(0, "value").cloned().unwrap_or(Value::Null))
}

pub fn join(value: &Value, args: &Args) -> RenderResult<Value> {
	let items = require_array("join", value)?;
	let separator = args.get(0, "separator").map(to_display).unwrap_or_default();
	let parts: Vec<String> = items.iter().map(to_display).collect();
	Ok(Value::String(parts.join(&separator)))
}

pub fn first(value: &Value, _args: &Args) -> RenderResult<Value> {
	match value {
		Value::String(s) => Ok(s.chars().next().map(|c| Value::String(c.to_string())).unwrap_or(Value::Null)),
		other => Ok(require_array("first", other)?.first().cloned().unwrap_or(Value::Null)),
	}
}

pub fn last(value: &Value, _args: &Args) -> RenderResult<Value> {
	match value {
		Value::String(s) => Ok(s.chars().last().map(|c| Value::String(c.to_string())).unwrap_or(Value::Null)),
		other => Ok(require_array("last", other)?.last().cloned().unwrap_or(Value::Null)),
	}
}

pub fn keys(value: &Value, _args: &Args) -> RenderResult<Value> {
	match value {
		Value::Object(map) => Ok(Value::Array(map.keys().cloned().map(Value::String).collect())),
		Value::Array(items) => Ok(Value::Array((0..items.len() as u64).map(Value::from).collect())),
		other => Err(RenderError::type_error(format!(
			"keys filter requires an array or object, found {}",
			type_name(other)
		))),
	}
}

/// Sort numbers and strings; mixed or unordered values keep their order.
pub fn sort(value: &Value, _args: &Args) -> RenderResult<Value> {
	let mut items = require_array("sort", value)?.to_vec();
	items.sort_by(|a, b| compare(a, b).unwrap_or(std::cmp::Ordering::Equal));
	Ok(Value::Array(items))
}

pub fn reverse(value: &Value, _args: &Args) -> RenderResult<Value> {
	match value {
		Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
		other => {
			let mut items = require_array("reverse", other)?.to_vec();
			items.reverse();
			Ok(Value::Array(items))
		}
	}
}

pub fn abs(value: &Value, _args: &Args) -> RenderResult<Value> {
	if let Some(i) = value.as_i64() {
		return Ok(i.checked_abs().map(Value::from).unwrap_or_else(|| Value::from((i as f64).abs())));
	}
	match value.as_f64() {
		Some(f) => Ok(Value::from(f.abs())),
		None => Err(RenderError::type_error(format!(
			"abs filter requires a number, found {}",
			type_name(value)
		))),
	}
}

pub fn json_encode(value: &Value, _args: &Args) -> RenderResult<Value> {
	serde_json::to_string(value)
		.map(Value::String)
		.map_err(|e| RenderError::type_error(e.to_string()))
}

/// Replace newlines with `<br />`; the input is escaped first.
pub fn nl2br(value: &Value, _args: &Args) -> RenderResult<Value> {
	let escaped = escape_html(&to_display(value));
	Ok(Value::String(escaped.replace('\n', "<br />\n")))
}

pub fn test_empty(value: &Value, _args: &Args) -> RenderResult<bool> {
	Ok(!is_truthy(value) && !matches!(value, Value::Number(_) | Value::Bool(true)))
}

pub fn test_even(value: &Value, _args: &Args) -> RenderResult<bool> {
	integer_test("even", value).map(|i| i % 2 == 0)
}

pub fn test_odd(value: &Value, _args: &Args) -> RenderResult<bool> {
	integer_test("odd", value).map(|i| i % 2 != 0)
}

pub fn test_numeric(value: &Value, _args: &Args) -> RenderResult<bool> {
	Ok(match value {
		Value::Number(_) => true,
		Value::String(s) => s.trim().parse::<f64>().is_ok(),
		_ => false,
	})
}

pub fn test_scalar(value: &Value, _args: &Args) -> RenderResult<bool> {
	Ok(matches!(value, Value::Bool(_) | Value::Number(_) | Value::String(_)))
}

pub fn test_iterable(value: &Value, _args: &Args) -> RenderResult<bool> {
	Ok(matches!(value, Value::Array(_) | Value::Object(_)))
}

pub fn test_null(value: &Value, _args: &Args) -> RenderResult<bool> {
	Ok(value.is_null())
}

pub fn test_divisibleby(value: &Value, args: &Args) -> RenderResult<bool> {
	let n = integer_test("divisibleby", value)?;
	let divisor = args
		.get(0, "num")
		.and_then(Value::as_i64)
		.ok_or_else(|| RenderError::type_error("divisibleby test requires an integer argument"))?;
	if divisor == 0 {
		return Err(RenderError::DivisionByZero);
	}
	Ok(n.checked_rem(divisor).unwrap_or(0) == 0)
}

pub fn test_sameas(value: &Value, args: &Args) -> RenderResult<bool> {
	Ok(args.get(0, "other").is_some_and(|other| other == value))
}

/// `x is type('string')`
pub fn test_type(value: &Value, args: &Args) -> RenderResult<bool> {
	let expected = args
		.get(0, "name")
		.and_then(Value::as_str)
		.ok_or_else(|| RenderError::type_error("type test requires a type name"))?;
	Ok(type_name(value) == expected)
}

fn integer_test(test: &str, value: &Value) -> RenderResult<i64> {
	value.as_i64().ok_or_else(|| {
		RenderError::type_error(format!("{} test requires an integer, found {}", test, type_name(value)))
	})
}

/// `range(end)`, `range(start, end)` or `range(start, end, step)`, end
/// inclusive.
pub fn range(args: &Args) -> RenderResult<Value> {
	let int = |index: usize, name: &str| args.get(index, name).and_then(Value::as_i64);
	let (start, end) = match (int(0, "start"), int(1, "end")) {
		(Some(start), Some(end)) => (start, end),
		(Some(end), None) => (0, end),
		_ => return Err(RenderError::type_error("range requires integer bounds")),
	};
	let step = int(2, "step").unwrap_or(1);
	if step <= 0 {
		return Err(RenderError::type_error("range step must be positive"));
	}
	if start.abs_diff(end) / step.unsigned_abs() >= 100_000 {
		return Err(RenderError::type_error("range is too large"));
	}
	let values: Vec<Value> = if start <= end {
		(start..=end).step_by(step as usize).map(Value::from).collect()
	} else {
		(end..=start).rev().step_by(step as usize).map(Value::from).collect()
	};
	Ok(Value::Array(values))
}

fn extreme(args: &Args, want: std::cmp::Ordering) -> RenderResult<Value> {
	let values: &[Value] = match args.positional.as_slice() {
		[Value::Array(items)] => items.as_slice(),
		all => all,
	};
	let mut best: Option<&Value> = None;
	for value in values {
		best = match best {
			None => Some(value),
			Some(current) => match compare(value, current) {
				Some(ordering) if ordering == want => Some(value),
				Some(_) => Some(current),
				None => {
					return Err(RenderError::type_error(format!(
						"cannot compare {} with {}",
						type_name(value),
						type_name(current)
					)));
				}
			},
		};
	}
	Ok(best.cloned().unwrap_or(Value::Null))
}

pub fn max(args: &Args) -> RenderResult<Value> {
	extreme(args, std::cmp::Ordering::Greater)
}

pub fn min(args: &Args) -> RenderResult<Value> {
	extreme(args, std::cmp::Ordering::Less)
}

/// `in_array(needle, haystack)`
pub fn in_array(args: &Args) -> RenderResult<Value> {
	match (args.get(0, "needle"), args.get(1, "haystack")) {
		(Some(needle), Some(Value::Array(items))) => {
			Ok(Value::Bool(items.iter().any(|item| loose_eq(item, needle))))
		}
		_ => Err(RenderError::type_error("in_array requires a value and an array")),
	}
}

pub(super) fn filters() -> HashMap<String, FilterFn> {
	let mut map: HashMap<String, FilterFn> = HashMap::new();
	map.insert("e".into(), Arc::new(escape));
	map.insert("escape".into(), Arc::new(escape));
	map.insert("escape_js".into(), Arc::new(escape_js_filter));
	map.insert("url_encode".into(), Arc::new(url_encode));
	map.insert("raw".into(), Arc::new(raw));
	map.insert("upper".into(), Arc::new(upper));
	map.insert("lower".into(), Arc::new(lower));
	map.insert("capitalize".into(), Arc::new(capitalize));
	map.insert("title".into(), Arc::new(title));
	map.insert("trim".into(), Arc::new(trim));
	map.insert("left_trim".into(), Arc::new(left_trim));
	map.insert("right_trim".into(), Arc::new(right_trim));
	map.insert("length".into(), Arc::new(length_filter));
	map.insert("default".into(), Arc::new(default));
	map.insert("join".into(), Arc::new(join));
	map.insert("first".into(), Arc::new(first));
	map.insert("last".into(), Arc::new(last));
	map.insert("keys".into(), Arc::new(keys));
	map.insert("sort".into(), Arc::new(sort));
	map.insert("reverse".into(), Arc::new(reverse));
	map.insert("abs".into(), Arc::new(abs));
	map.insert("json_encode".into(), Arc::new(json_encode));
	map.insert("nl2br".into(), Arc::new(nl2br));
	map
}

pub(super) fn tests() -> HashMap<String, TestFn> {
	let mut map: HashMap<String, TestFn> = HashMap::new();
	map.insert("empty".into(), Arc::new(test_empty));
	map.insert("even".into(), Arc::new(test_even));
	map.insert("odd".into(), Arc::new(test_odd));
	map.insert("numeric".into(), Arc::new(test_numeric));
	map.insert("scalar".into(), Arc::new(test_scalar));
	map.insert("iterable".into(), Arc::new(test_iterable));
	map.insert("null".into(), Arc::new(test_null));
	map.insert("divisibleby".into(), Arc::new(test_divisibleby));
	map.insert("sameas".into(), Arc::new(test_sameas));
	map.insert("type".into(), Arc::new(test_type));
	map
}

pub(super) fn functions() -> HashMap<String, FunctionFn> {
	let mut map: HashMap<String, FunctionFn> = HashMap::new();
	map.insert("range".into(), Arc::new(range));
	map.insert("max".into(), Arc::new(max));
	map.insert("min".into(), Arc::new(min));
	map.insert("in_array".into(), Arc::new(in_array));
	map
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn args(values: Vec<Value>) -> Args {
		Args::new(values)
	}

	#[rstest]
	#[case(json!("hello world"), json!("Hello World"))]
	#[case(json!("HELLO-there"), json!("Hello-There"))]
	fn test_title(#[case] input: Value, #[case] expected: Value) {
		assert_eq!(title(&input, &Args::default()).unwrap(), expected);
	}

	#[rstest]
	#[case(json!(null), json!("fallback"))]
	#[case(json!(""), json!("fallback"))]
	#[case(json!("set"), json!("set"))]
	fn test_default(#[case] input: Value, #[case] expected: Value) {
		assert_eq!(default(&input, &args(vec![json!("fallback")])).unwrap(), expected);
	}

	#[rstest]
	fn test_named_argument_takes_precedence() {
		let mut a = args(vec![json!("-")]);
		a.named.insert("separator".into(), json!("+"));
		assert_eq!(join(&json!([1, 2]), &a).unwrap(), json!("1+2"));
	}

	#[rstest]
	fn test_upper_requires_string() {
		assert!(matches!(upper(&json!(1), &Args::default()), Err(RenderError::Type(_))));
	}

	#[rstest]
	#[case(json!(""), true)]
	#[case(json!([]), true)]
	#[case(json!(null), true)]
	#[case(json!(0), false)]
	#[case(json!("x"), false)]
	fn test_empty_test(#[case] input: Value, #[case] expected: bool) {
		assert_eq!(test_empty(&input, &Args::default()).unwrap(), expected);
	}

	#[rstest]
	#[case(vec![json!(3)], json!([0, 1, 2, 3]))]
	#[case(vec![json!(1), json!(7), json!(3)], json!([1, 4, 7]))]
	#[case(vec![json!(3), json!(1)], json!([3, 2, 1]))]
	fn test_range_function(#[case] input: Vec<Value>, #[case] expected: Value) {
		assert_eq!(range(&args(input)).unwrap(), expected);
	}

	#[rstest]
	fn test_max_min() {
		assert_eq!(max(&args(vec![json!([3, 9, 2])])).unwrap(), json!(9));
		assert_eq!(min(&args(vec![json!(3), json!(9), json!(2)])).unwrap(), json!(2));
	}

	#[rstest]
	fn test_sort_and_reverse() {
		let sorted = sort(&json!([3, 1, 2]), &Args::default()).unwrap();
		assert_eq!(sorted, json!([1, 2, 3]));
		assert_eq!(reverse(&sorted, &Args::default()).unwrap(), json!([3, 2, 1]));
		assert_eq!(reverse(&json!("abc"), &Args::default()).unwrap(), json!("cba"));
	}

	#[rstest]
	fn test_nl2br_escapes_first() {
		assert_eq!(
			nl2br(&json!("<a>\nb"), &Args::default()).unwrap(),
			json!("&lt;a&gt;<br />\nb")
		);
	}
}
