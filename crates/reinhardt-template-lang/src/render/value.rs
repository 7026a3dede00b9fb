//! Operator semantics over [`serde_json::Value`].

use super::error::{RenderError, RenderResult};
use reinhardt_lang_core::ast::{BinaryOp, Literal};
use serde_json::Value;
use std::cmp::Ordering;

/// Upper bound on the number of elements a `..` range may produce.
const MAX_RANGE: u64 = 100_000;

#[derive(Debug, Clone, Copy)]
enum Number {
	Int(i64),
	Float(f64),
}

impl Number {
	fn of(value: &Value) -> Option<Self> {
		let number = value.as_number()?;
		match number.as_i64() {
			Some(i) => Some(Number::Int(i)),
			None => number.as_f64().map(Number::Float),
		}
	}

	fn as_f64(self) -> f64 {
		match self {
			Number::Int(i) => i as f64,
			Number::Float(f) => f,
		}
	}
}

pub fn from_literal(literal: &Literal) -> Value {
	match literal {
		Literal::Null => Value::Null,
		Literal::Boolean(b) => Value::Bool(*b),
		Literal::Integer(i) => Value::from(*i),
		Literal::Float(f) => Value::from(*f),
		Literal::String(s) => Value::String(s.clone()),
	}
}

pub fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
		Value::String(s) => !s.is_empty(),
		Value::Array(items) => !items.is_empty(),
		Value::Object(map) => !map.is_empty(),
	}
}

/// Text written to the output for `value`.
pub fn to_display(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::Bool(b) => b.to_string(),
		Value::Number(n) => n.to_string(),
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

pub fn type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(n) if n.is_f64() => "float",
		Value::Number(_) => "integer",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

/// `==`: numbers compare by value regardless of representation.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
	match (Number::of(left), Number::of(right)) {
		(Some(a), Some(b)) => a.as_f64() == b.as_f64(),
		_ => left == right,
	}
}

pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
	match (left, right) {
		(Value::Number(_), Value::Number(_)) => match (Number::of(left)?, Number::of(right)?) {
			(Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
			(a, b) => a.as_f64().partial_cmp(&b.as_f64()),
		},
		(Value::String(a), Value::String(b)) => Some(a.cmp(b)),
		(Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
		_ => None,
	}
}

/// Number of elements or characters, if `value` has a length.
pub fn length(value: &Value) -> Option<usize> {
	match value {
		Value::String(s) => Some(s.chars().count()),
		Value::Array(items) => Some(items.len()),
		Value::Object(map) => Some(map.len()),
		Value::Null => Some(0),
		_ => None,
	}
}

/// Membership test behind `in` and `not in`.
pub fn contains(haystack: &Value, needle: &Value) -> RenderResult<bool> {
	match haystack {
		Value::Array(items) => Ok(items.iter().any(|item| loose_eq(item, needle))),
		Value::Object(map) => Ok(map.contains_key(&to_display(needle))),
		Value::String(s) => Ok(s.contains(&to_display(needle))),
		Value::Null => Ok(false),
		other => Err(RenderError::type_error(format!(
			"cannot test membership in {}",
			type_name(other)
		))),
	}
}

/// Evaluate a non short-circuiting binary operator.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> RenderResult<Value> {
	let ordering = |accept: fn(Ordering) -> bool| -> RenderResult<Value> {
		compare(left, right)
			.map(|ordering| Value::Bool(accept(ordering)))
			.ok_or_else(|| {
				RenderError::type_error(format!(
					"cannot compare {} with {}",
					type_name(left),
					type_name(right)
				))
			})
	};

	match op {
		BinaryOp::Eq => Ok(Value::Bool(loose_eq(left, right))),
		BinaryOp::NotEq => Ok(Value::Bool(!loose_eq(left, right))),
		BinaryOp::Identical => Ok(Value::Bool(left == right)),
		BinaryOp::NotIdentical => Ok(Value::Bool(left != right)),
		BinaryOp::Lt => ordering(Ordering::is_lt),
		BinaryOp::Gt => ordering(Ordering::is_gt),
		BinaryOp::LtEq => ordering(Ordering::is_le),
		BinaryOp::GtEq => ordering(Ordering::is_ge),
		BinaryOp::In => contains(right, left).map(Value::Bool),
		BinaryOp::NotIn => contains(right, left).map(|found| Value::Bool(!found)),
		BinaryOp::Concat => Ok(Value::String(to_display(left) + &to_display(right))),
		BinaryOp::Range => range(left, right),
		BinaryOp::And => Ok(Value::Bool(is_truthy(left) && is_truthy(right))),
		BinaryOp::Or => Ok(Value::Bool(is_truthy(left) || is_truthy(right))),
		BinaryOp::Add
		| BinaryOp::Sub
		| BinaryOp::Mul
		| BinaryOp::Div
		| BinaryOp::FloorDiv
		| BinaryOp::Mod
		| BinaryOp::Pow => arithmetic(op, left, right),
		other => Err(RenderError::type_error(format!(
			"operator {} is not supported in templates",
			other
		))),
	}
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> RenderResult<Value> {
	let (Some(a), Some(b)) = (Number::of(left), Number::of(right)) else {
		return Err(RenderError::type_error(format!(
			"operator {} expects numbers, found {} and {}",
			op,
			type_name(left),
			type_name(right)
		)));
	};

	if let (Number::Int(a), Number::Int(b)) = (a, b) {
		let exact = match op {
			BinaryOp::Add => a.checked_add(b),
			BinaryOp::Sub => a.checked_sub(b),
			BinaryOp::Mul => a.checked_mul(b),
			BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if b == 0 => {
				return Err(RenderError::DivisionByZero);
			}
			BinaryOp::Div => match a.checked_rem(b) {
				Some(0) => a.checked_div(b),
				_ => None,
			},
			BinaryOp::FloorDiv => a.checked_div(b).map(|quotient| {
				if a % b != 0 && (a < 0) != (b < 0) {
					quotient - 1
				} else {
					quotient
				}
			}),
			BinaryOp::Mod => a.checked_rem(b),
			BinaryOp::Pow => u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp)),
			_ => None,
		};
		if let Some(value) = exact {
			return Ok(Value::from(value));
		}
	}

	let (a, b) = (a.as_f64(), b.as_f64());
	let result = match op {
		BinaryOp::Add => a + b,
		BinaryOp::Sub => a - b,
		BinaryOp::Mul => a * b,
		BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if b == 0.0 => {
			return Err(RenderError::DivisionByZero);
		}
		BinaryOp::Div => a / b,
		BinaryOp::FloorDiv => (a / b).floor(),
		BinaryOp::Mod => a % b,
		_ => a.powf(b),
	};
	Ok(Value::from(result))
}

/// Inclusive range of integers or single characters, descending when the
/// start is greater than the end.
fn range(start: &Value, end: &Value) -> RenderResult<Value> {
	if let (Some(a), Some(b)) = (start.as_i64(), end.as_i64()) {
		if a.abs_diff(b) >= MAX_RANGE {
			return Err(RenderError::type_error("range is too large"));
		}
		let values: Vec<Value> = if a <= b {
			(a..=b).map(Value::from).collect()
		} else {
			(b..=a).rev().map(Value::from).collect()
		};
		return Ok(Value::Array(values));
	}

	let single = |v: &Value| {
		let s = v.as_str()?;
		let mut chars = s.chars();
		let c = chars.next()?;
		chars.next().is_none().then_some(c)
	};
	match (single(start), single(end)) {
		(Some(a), Some(b)) => {
			if u64::from(a).abs_diff(u64::from(b)) >= MAX_RANGE {
				return Err(RenderError::type_error("range is too large"));
			}
			let chars: Vec<Value> = if a <= b {
				(a..=b).map(|c| Value::String(c.to_string())).collect()
			} else {
				(b..=a).rev().map(|c| Value::String(c.to_string())).collect()
			};
			Ok(Value::Array(chars))
		}
		_ => Err(RenderError::type_error(format!(
			"cannot build a range from {} to {}",
			type_name(start),
			type_name(end)
		))),
	}
}

/// Resolve a negative index against `len`.
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
	let len = i64::try_from(len).ok()?;
	let index = if index < 0 { len + index } else { index };
	(0..len).contains(&index).then_some(index as usize)
}

/// Clamp slice bounds into `0..=len`.
pub fn slice_bounds(start: Option<i64>, end: Option<i64>, len: usize) -> (usize, usize) {
	let len_i = len as i64;
	let clamp = |i: i64| -> usize {
		let i = if i < 0 { len_i + i } else { i };
		i.clamp(0, len_i) as usize
	};
	let start = start.map(clamp).unwrap_or(0);
	let end = end.map(clamp).unwrap_or(len);
	(start, end.max(start))
}
