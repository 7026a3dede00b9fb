//! Compilation errors shared by both languages.
//!
//! Every failure carries the source position it was detected at and a
//! human readable description. Errors are `Clone` so a single failed
//! compilation can be reported to every caller waiting on it.

use crate::position::Position;
use thiserror::Error;

/// Error category, mirroring the stage that detected the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Unterminated literal, unexpected character
	Lexical,
	/// Grammar violation, unbalanced block
	Syntax,
	/// Unknown entity, column or directive
	Resolution,
	/// Construct without a mapping in the requested dialect
	Dialect,
	/// In-flight compilation lost before producing a result
	Cache,
}

/// Errors raised while scanning, parsing, translating or caching.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
	/// A quoted literal or identifier is missing its closing quote.
	#[error("unterminated literal starting at {position}")]
	UnterminatedLiteral { position: Position },

	/// A comment is missing its closing marker.
	#[error("unterminated comment starting at {position}")]
	UnterminatedComment { position: Position },

	/// A character that does not start any token.
	#[error("unexpected character '{character}' at {position}")]
	UnexpectedCharacter { character: char, position: Position },

	/// The token stream does not match the grammar.
	#[error("syntax error at {position}: expected {}, found {found}", .expected.join(" or "))]
	Syntax {
		position: Position,
		expected: Vec<String>,
		found: String,
	},

	/// A block directive is closed by the wrong closer, or never closed.
	#[error("unbalanced block at {position}: expected {expected_closer}, found {found}")]
	UnbalancedBlock {
		position: Position,
		expected_closer: String,
		found: String,
	},

	/// A well-formed construct used where the language forbids it.
	#[error("invalid construct at {position}: {message}")]
	InvalidConstruct { position: Position, message: String },

	/// A model name the metadata provider does not know.
	#[error("unknown entity '{name}' at {position}")]
	UnknownEntity { name: String, position: Position },

	/// A column that does not exist on the resolved table.
	#[error("unknown column '{name}' on '{table}' at {position}")]
	UnknownColumn {
		table: String,
		name: String,
		position: Position,
	},

	/// An unqualified column present on more than one joined source.
	#[error("ambiguous column '{name}' at {position}: present on {}", .candidates.join(", "))]
	AmbiguousColumn {
		name: String,
		candidates: Vec<String>,
		position: Position,
	},

	/// A join without `ON` between models that have no relationship.
	#[error("no relationship between '{from}' and '{to}' at {position}")]
	NoRelationship {
		from: String,
		to: String,
		position: Position,
	},

	/// A template directive that is neither built in nor registered.
	#[error("unknown directive '{name}' at {position}")]
	UnknownDirective { name: String, position: Position },

	/// The dialect has no syntax for the construct.
	#[error("'{construct}' is not supported by dialect '{dialect}' (at {position})")]
	Dialect {
		construct: String,
		dialect: String,
		position: Position,
	},

	/// The compilation a caller was waiting on ended without a result.
	#[error("compilation for fingerprint {fingerprint} was abandoned")]
	Abandoned { fingerprint: String },
}

impl Error {
	/// Category of this error
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::UnterminatedLiteral { .. }
			| Error::UnterminatedComment { .. }
			| Error::UnexpectedCharacter { .. } => ErrorKind::Lexical,
			Error::Syntax { .. } | Error::UnbalancedBlock { .. } | Error::InvalidConstruct { .. } => {
				ErrorKind::Syntax
			}
			Error::UnknownEntity { .. }
			| Error::UnknownColumn { .. }
			| Error::AmbiguousColumn { .. }
			| Error::NoRelationship { .. }
			| Error::UnknownDirective { .. } => ErrorKind::Resolution,
			Error::Dialect { .. } => ErrorKind::Dialect,
			Error::Abandoned { .. } => ErrorKind::Cache,
		}
	}

	/// Source position the error was detected at, if it has one.
	pub fn position(&self) -> Option<Position> {
		match self {
			Error::UnterminatedLiteral { position }
			| Error::UnterminatedComment { position }
			| Error::UnexpectedCharacter { position, .. }
			| Error::Syntax { position, .. }
			| Error::UnbalancedBlock { position, .. }
			| Error::InvalidConstruct { position, .. }
			| Error::UnknownEntity { position, .. }
			| Error::UnknownColumn { position, .. }
			| Error::AmbiguousColumn { position, .. }
			| Error::NoRelationship { position, .. }
			| Error::UnknownDirective { position, .. }
			| Error::Dialect { position, .. } => Some(*position),
			Error::Abandoned { .. } => None,
		}
	}

	/// Build a syntax error from an expected set and a found description.
	pub fn syntax<I, S>(position: Position, expected: I, found: impl Into<String>) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Error::Syntax {
			position,
			expected: expected.into_iter().map(Into::into).collect(),
			found: found.into(),
		}
	}

	/// Build an [`Error::InvalidConstruct`].
	pub fn invalid(position: Position, message: impl Into<String>) -> Self {
		Error::InvalidConstruct {
			position,
			message: message.into(),
		}
	}
}

/// Result type alias for compilation operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_syntax_error_message_lists_expected_set() {
		let error = Error::syntax(Position::new(1, 8, 7), ["FROM", "','"], "'WHERE'");
		assert_eq!(
			error.to_string(),
			"syntax error at line 1, column 8: expected FROM or ',', found 'WHERE'"
		);
		assert_eq!(error.kind(), ErrorKind::Syntax);
	}

	#[rstest]
	#[case(Error::UnterminatedLiteral { position: Position::START }, ErrorKind::Lexical)]
	#[case(Error::UnknownEntity { name: "Missing".into(), position: Position::START }, ErrorKind::Resolution)]
	#[case(Error::UnknownDirective { name: "spaceless".into(), position: Position::START }, ErrorKind::Resolution)]
	#[case(Error::Dialect { construct: "FULL JOIN".into(), dialect: "mysql".into(), position: Position::START }, ErrorKind::Dialect)]
	#[case(Error::Abandoned { fingerprint: "abc".into() }, ErrorKind::Cache)]
	fn test_error_kind(#[case] error: Error, #[case] kind: ErrorKind) {
		assert_eq!(error.kind(), kind);
	}

	#[rstest]
	fn test_abandoned_has_no_position() {
		let error = Error::Abandoned {
			fingerprint: "abc".into(),
		};
		assert_eq!(error.position(), None);
	}
}
