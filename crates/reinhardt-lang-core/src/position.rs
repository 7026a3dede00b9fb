//! Source positions used by tokens, AST nodes and diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A location in DSL source text.
///
/// `line` and `column` are 1-based and count characters, `offset` is the
/// byte offset into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
	/// 1-based line number
	pub line: usize,
	/// 1-based column number (in characters)
	pub column: usize,
	/// Byte offset into the source
	pub offset: usize,
}

impl Position {
	/// Position of the first character of a source.
	pub const START: Position = Position {
		line: 1,
		column: 1,
		offset: 0,
	};

	/// Create a new position
	pub fn new(line: usize, column: usize, offset: usize) -> Self {
		Self {
			line,
			column,
			offset,
		}
	}

	/// Advance past `c`, returning the position of the next character.
	pub fn advance(self, c: char) -> Self {
		if c == '\n' {
			Self {
				line: self.line + 1,
				column: 1,
				offset: self.offset + 1,
			}
		} else {
			Self {
				line: self.line,
				column: self.column + 1,
				offset: self.offset + c.len_utf8(),
			}
		}
	}

	/// Advance past every character of `text`.
	pub fn advance_str(self, text: &str) -> Self {
		text.chars().fold(self, Position::advance)
	}
}

impl Default for Position {
	fn default() -> Self {
		Self::START
	}
}

impl fmt::Display for Position {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "line {}, column {}", self.line, self.column)
	}
}
