//! Language tables: the lexical description each DSL hands to the scanner.
//!
//! Tables are plain immutable values. Both languages define theirs as
//! `static` items and pass them explicitly into every scanner and parser.

/// How keywords are matched against identifier-shaped words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordCase {
	/// `select` and `SELECT` are the same keyword
	Insensitive,
	/// Only the exact spelling is a keyword
	Sensitive,
}

/// Directive markers that switch a template scanner between raw text and
/// language mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
	pub open_statement: &'static str,
	pub close_statement: &'static str,
	pub open_echo: &'static str,
	pub close_echo: &'static str,
	pub open_comment: &'static str,
	pub close_comment: &'static str,
	/// Marker placed inside a delimiter to trim adjacent whitespace
	pub trim: char,
}

impl Delimiters {
	/// `{% %}`, `{{ }}`, `{# #}` with `-` for whitespace control.
	pub const JINJA: Delimiters = Delimiters {
		open_statement: "{%",
		close_statement: "%}",
		open_echo: "{{",
		close_echo: "}}",
		open_comment: "{#",
		close_comment: "#}",
		trim: '-',
	};
}

/// Lexical and syntactic switches for one language.
#[derive(Debug, Clone, Copy)]
pub struct LanguageTable {
	/// Short name used in diagnostics
	pub name: &'static str,
	/// Reserved words, in canonical spelling
	pub keywords: &'static [&'static str],
	pub keyword_case: KeywordCase,
	/// Operators and punctuation, matched by longest match
	pub operators: &'static [&'static str],
	/// Characters that open and close string literals
	pub string_quotes: &'static [char],
	/// Escape character inside string literals
	pub escape: Option<char>,
	pub line_comment: Option<&'static str>,
	pub block_comment: Option<(&'static str, &'static str)>,
	/// `[name]` scans as a quoted identifier
	pub bracket_identifiers: bool,
	/// `:name:` and `?0` scan as placeholders
	pub placeholders: bool,
	/// Template directive markers; `None` for languages without raw text
	pub delimiters: Option<Delimiters>,
	pub null_keyword: &'static str,
	pub true_keyword: &'static str,
	pub false_keyword: &'static str,
	/// `f(name: value)` call arguments
	pub named_arguments: bool,
	/// Keyword accepted before the first call argument (`COUNT(DISTINCT x)`)
	pub distinct_keyword: Option<&'static str>,
	/// `[a, b]` list literals
	pub list_literals: bool,
	/// `expr[index]` and `expr[start:end]` suffixes
	pub subscripts: bool,
	/// Calls allowed on any expression rather than only on names
	pub calls_on_expressions: bool,
}

impl LanguageTable {
	/// Canonical keyword spelling for `word`, if it is reserved.
	pub fn keyword(&self, word: &str) -> Option<&'static str> {
		match self.keyword_case {
			KeywordCase::Sensitive => self.keywords.iter().copied().find(|kw| *kw == word),
			KeywordCase::Insensitive => self
				.keywords
				.iter()
				.copied()
				.find(|kw| kw.eq_ignore_ascii_case(word)),
		}
	}

	/// Longest operator that prefixes `rest`.
	pub fn longest_operator(&self, rest: &str) -> Option<&'static str> {
		self.operators
			.iter()
			.copied()
			.filter(|op| rest.starts_with(op))
			.max_by_key(|op| op.len())
	}

	/// Decode a string literal lexeme (including its quotes).
	///
	/// Recognized escapes are `\n`, `\t`, `\r`, `\0` and an escaped escape
	/// or quote character; any other escaped character stands for itself.
	pub fn unescape(&self, lexeme: &str) -> String {
		let mut chars = lexeme.chars();
		let quote = chars.next();
		let mut inner: Vec<char> = chars.collect();
		if inner.last().copied() == quote {
			inner.pop();
		}

		let mut out = String::with_capacity(inner.len());
		let mut iter = inner.into_iter();
		while let Some(c) = iter.next() {
			if Some(c) == self.escape {
				match iter.next() {
					Some('n') => out.push('\n'),
					Some('t') => out.push('\t'),
					Some('r') => out.push('\r'),
					Some('0') => out.push('\0'),
					Some(other) => out.push(other),
					None => out.push(c),
				}
			} else {
				out.push(c);
			}
		}
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	const TABLE: LanguageTable = LanguageTable {
		name: "test",
		keywords: &["SELECT", "FROM"],
		keyword_case: KeywordCase::Insensitive,
		operators: &["<", "<=", "<>", "="],
		string_quotes: &['\''],
		escape: Some('\\'),
		line_comment: None,
		block_comment: None,
		bracket_identifiers: false,
		placeholders: false,
		delimiters: None,
		null_keyword: "NULL",
		true_keyword: "TRUE",
		false_keyword: "FALSE",
		named_arguments: false,
		distinct_keyword: None,
		list_literals: false,
		subscripts: false,
		calls_on_expressions: false,
	};

	#[rstest]
	#[case("select", Some("SELECT"))]
	#[case("From", Some("FROM"))]
	#[case("users", None)]
	fn test_keyword_lookup(#[case] word: &str, #[case] expected: Option<&str>) {
		assert_eq!(TABLE.keyword(word), expected);
	}

	#[rstest]
	#[case("<= 3", Some("<="))]
	#[case("<> 3", Some("<>"))]
	#[case("< 3", Some("<"))]
	#[case("+ 3", None)]
	fn test_longest_operator(#[case] rest: &str, #[case] expected: Option<&str>) {
		assert_eq!(TABLE.longest_operator(rest), expected);
	}

	#[rstest]
	#[case(r"'plain'", "plain")]
	#[case(r"'it\'s'", "it's")]
	#[case(r"'a\nb'", "a\nb")]
	#[case(r"'back\\slash'", "back\\slash")]
	fn test_unescape(#[case] lexeme: &str, #[case] expected: &str) {
		assert_eq!(TABLE.unescape(lexeme), expected);
	}
}
