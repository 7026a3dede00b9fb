//! Token stream scanner
//!
//! A single forward pass over the source producing [`Token`]s lazily. The
//! scanner is parameterized by a [`LanguageTable`]; when the table declares
//! template [`Delimiters`](crate::table::Delimiters) the scanner starts in
//! raw-text mode and switches to language mode between directive markers.
//!
//! ```
//! use reinhardt_lang_core::scanner::Scanner;
//! use reinhardt_lang_core::table::{KeywordCase, LanguageTable};
//! use reinhardt_lang_core::token::TokenKind;
//!
//! static TABLE: LanguageTable = LanguageTable {
//!     name: "demo",
//!     keywords: &["SELECT"],
//!     keyword_case: KeywordCase::Insensitive,
//!     operators: &[",", ">"],
//!     string_quotes: &['\''],
//!     escape: Some('\\'),
//!     line_comment: None,
//!     block_comment: None,
//!     bracket_identifiers: false,
//!     placeholders: false,
//!     delimiters: None,
//!     null_keyword: "NULL",
//!     true_keyword: "TRUE",
//!     false_keyword: "FALSE",
//!     named_arguments: false,
//!     distinct_keyword: None,
//!     list_literals: false,
//!     subscripts: false,
//!     calls_on_expressions: false,
//! };
//!
//! let kinds: Vec<TokenKind> = Scanner::new("select a > 1", &TABLE)
//!     .map(|t| t.map(|t| t.kind))
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(kinds[0], TokenKind::Keyword("SELECT"));
//! assert_eq!(kinds[3], TokenKind::Integer);
//! ```

use crate::error::{Error, Result};
use crate::position::Position;
use crate::table::{Delimiters, LanguageTable};
use crate::token::{Token, TokenKind};
use std::iter::FusedIterator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
	Raw,
	Language,
}

/// Lazy tokenizer over one source text.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
	source: &'a str,
	table: &'a LanguageTable,
	position: Position,
	mode: Mode,
	trim_next_raw: bool,
	/// `{` operators not yet closed in the current tag
	open_braces: usize,
	finished: bool,
}

impl<'a> Scanner<'a> {
	/// Create a scanner over `source`.
	pub fn new(source: &'a str, table: &'a LanguageTable) -> Self {
		let mode = if table.delimiters.is_some() {
			Mode::Raw
		} else {
			Mode::Language
		};
		Self {
			source,
			table,
			position: Position::START,
			mode,
			trim_next_raw: false,
			open_braces: 0,
			finished: false,
		}
	}

	/// Table this scanner classifies words with.
	pub fn table(&self) -> &'a LanguageTable {
		self.table
	}

	/// Position of the next unread character.
	pub fn position(&self) -> Position {
		self.position
	}

	fn rest(&self) -> &'a str {
		&self.source[self.position.offset..]
	}

	fn peek_char(&self) -> Option<char> {
		self.rest().chars().next()
	}

	fn peek_nth_char(&self, n: usize) -> Option<char> {
		self.rest().chars().nth(n)
	}

	fn bump(&mut self) -> Option<char> {
		let c = self.peek_char()?;
		self.position = self.position.advance(c);
		Some(c)
	}

	fn bump_str(&mut self, text: &str) {
		self.position = self.position.advance_str(text);
	}

	fn slice_from(&self, start: Position) -> &'a str {
		&self.source[start.offset..self.position.offset]
	}

	fn token_from(&self, kind: TokenKind, start: Position) -> Token<'a> {
		Token::new(kind, self.slice_from(start), start)
	}

	fn next_token(&mut self) -> Result<Option<Token<'a>>> {
		match (self.mode, self.table.delimiters) {
			(Mode::Raw, Some(delimiters)) => self.scan_raw(delimiters),
			_ => self.scan_language(),
		}
	}

	// ── raw text mode ────────────────────────────────────────────────

	fn scan_raw(&mut self, d: Delimiters) -> Result<Option<Token<'a>>> {
		loop {
			if self.trim_next_raw {
				self.trim_next_raw = false;
				while self.peek_char().is_some_and(char::is_whitespace) {
					self.bump();
				}
			}

			let rest = self.rest();
			if rest.is_empty() {
				return Ok(None);
			}

			let start = self.position;
			let next_opener = [d.open_statement, d.open_echo, d.open_comment]
				.into_iter()
				.filter_map(|opener| rest.find(opener).map(|idx| (idx, opener)))
				.min_by_key(|(idx, _)| *idx);

			let Some((idx, opener)) = next_opener else {
				self.bump_str(rest);
				return Ok(Some(self.token_from(TokenKind::RawText, start)));
			};

			let trims = rest[idx + opener.len()..].starts_with(d.trim);
			let mut text = &rest[..idx];
			if trims {
				text = text.trim_end();
			}
			self.bump_str(&rest[..idx]);
			if !text.is_empty() {
				return Ok(Some(Token::new(TokenKind::RawText, text, start)));
			}

			let opener_start = self.position;
			self.bump_str(opener);
			if trims {
				self.bump();
			}

			if opener == d.open_comment {
				self.skip_template_comment(d, opener_start)?;
				continue;
			}

			self.mode = Mode::Language;
			self.open_braces = 0;
			let kind = if opener == d.open_statement {
				TokenKind::OpenStatement
			} else {
				TokenKind::OpenEcho
			};
			return Ok(Some(self.token_from(kind, opener_start)));
		}
	}

	fn skip_template_comment(&mut self, d: Delimiters, start: Position) -> Result<()> {
		let rest = self.rest();
		let Some(idx) = rest.find(d.close_comment) else {
			return Err(Error::UnterminatedComment { position: start });
		};
		if rest[..idx].ends_with(d.trim) {
			self.trim_next_raw = true;
		}
		self.bump_str(&rest[..idx + d.close_comment.len()]);
		Ok(())
	}

	// ── language mode ────────────────────────────────────────────────

	fn skip_trivia(&mut self) -> Result<()> {
		loop {
			while self.peek_char().is_some_and(char::is_whitespace) {
				self.bump();
			}
			let rest = self.rest();
			if let Some(marker) = self.table.line_comment {
				if rest.starts_with(marker) {
					let len = rest.find('\n').unwrap_or(rest.len());
					self.bump_str(&rest[..len]);
					continue;
				}
			}
			if let Some((open, close)) = self.table.block_comment {
				if rest.starts_with(open) {
					let start = self.position;
					match rest[open.len()..].find(close) {
						Some(idx) => {
							self.bump_str(&rest[..open.len() + idx + close.len()]);
							continue;
						}
						None => return Err(Error::UnterminatedComment { position: start }),
					}
				}
			}
			return Ok(());
		}
	}

	fn scan_language(&mut self) -> Result<Option<Token<'a>>> {
		self.skip_trivia()?;
		let start = self.position;
		let rest = self.rest();
		let Some(c) = self.peek_char() else {
			return Ok(None);
		};

		let in_braces = self.open_braces > 0 && c == '}';
		if let Some(d) = self.table.delimiters.filter(|_| !in_braces) {
			for (close, kind) in [
				(d.close_statement, TokenKind::CloseStatement),
				(d.close_echo, TokenKind::CloseEcho),
			] {
				let trimmed = rest.starts_with(d.trim) && rest[d.trim.len_utf8()..].starts_with(close);
				if trimmed || rest.starts_with(close) {
					if trimmed {
						self.bump();
						self.trim_next_raw = true;
					}
					self.bump_str(close);
					self.mode = Mode::Raw;
					return Ok(Some(self.token_from(kind, start)));
				}
			}
		}

		if self.table.string_quotes.contains(&c) {
			return self.scan_string(c).map(Some);
		}
		if c.is_ascii_digit() {
			return Ok(Some(self.scan_number()));
		}
		if is_ident_start(c) {
			return Ok(Some(self.scan_word()));
		}
		if c == '[' && self.table.bracket_identifiers {
			return self.scan_bracket_identifier().map(Some);
		}
		if self.table.placeholders {
			if let Some(token) = self.scan_placeholder() {
				return Ok(Some(token));
			}
		}
		if let Some(op) = self.table.longest_operator(rest) {
			match op {
				"{" => self.open_braces += 1,
				"}" => self.open_braces = self.open_braces.saturating_sub(1),
				_ => {}
			}
			self.bump_str(op);
			return Ok(Some(self.token_from(TokenKind::Operator(op), start)));
		}

		Err(Error::UnexpectedCharacter {
			character: c,
			position: start,
		})
	}

	fn scan_string(&mut self, quote: char) -> Result<Token<'a>> {
		let start = self.position;
		self.bump();
		loop {
			match self.bump() {
				None => return Err(Error::UnterminatedLiteral { position: start }),
				Some(c) if Some(c) == self.table.escape => {
					if self.bump().is_none() {
						return Err(Error::UnterminatedLiteral { position: start });
					}
				}
				Some(c) if c == quote => break,
				Some(_) => {}
			}
		}
		Ok(self.token_from(TokenKind::String, start))
	}

	fn scan_number(&mut self) -> Token<'a> {
		let start = self.position;
		let mut kind = TokenKind::Integer;
		self.eat_digits();

		if self.peek_char() == Some('.') && self.peek_nth_char(1).is_some_and(|c| c.is_ascii_digit()) {
			kind = TokenKind::Float;
			self.bump();
			self.eat_digits();
		}

		if matches!(self.peek_char(), Some('e' | 'E')) {
			let exponent_digit = match self.peek_nth_char(1) {
				Some('+' | '-') => self.peek_nth_char(2),
				other => other,
			};
			if exponent_digit.is_some_and(|c| c.is_ascii_digit()) {
				kind = TokenKind::Float;
				self.bump();
				if matches!(self.peek_char(), Some('+' | '-')) {
					self.bump();
				}
				self.eat_digits();
			}
		}

		self.token_from(kind, start)
	}

	fn eat_digits(&mut self) {
		while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
			self.bump();
		}
	}

	fn scan_word(&mut self) -> Token<'a> {
		let start = self.position;
		while self.peek_char().is_some_and(is_ident_continue) {
			self.bump();
		}
		let word = self.slice_from(start);
		let kind = match self.table.keyword(word) {
			Some(kw) => TokenKind::Keyword(kw),
			None => TokenKind::Identifier,
		};
		Token::new(kind, word, start)
	}

	fn scan_bracket_identifier(&mut self) -> Result<Token<'a>> {
		let start = self.position;
		self.bump();
		loop {
			match self.bump() {
				None | Some('\n') => return Err(Error::UnterminatedLiteral { position: start }),
				Some(']') => break,
				Some(_) => {}
			}
		}
		Ok(self.token_from(TokenKind::QuotedIdentifier, start))
	}

	/// `:name:` or `?digits`; `None` leaves the input untouched.
	fn scan_placeholder(&mut self) -> Option<Token<'a>> {
		let start = self.position;
		let rest = self.rest();
		let mut chars = rest.char_indices();
		let len = match chars.next()? {
			(_, ':') => {
				let (_, first) = chars.next()?;
				if !is_ident_start(first) {
					return None;
				}
				let close = chars.find(|(_, c)| !is_ident_continue(*c))?;
				if close.1 != ':' {
					return None;
				}
				close.0 + 1
			}
			(_, '?') => {
				let digits = rest[1..].chars().take_while(char::is_ascii_digit).count();
				if digits == 0 {
					return None;
				}
				1 + digits
			}
			_ => return None,
		};
		self.bump_str(&rest[..len]);
		Some(self.token_from(TokenKind::Placeholder, start))
	}
}

impl<'a> Iterator for Scanner<'a> {
	type Item = Result<Token<'a>>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.finished {
			return None;
		}
		match self.next_token() {
			Ok(Some(token)) => Some(Ok(token)),
			Ok(None) => {
				self.finished = true;
				None
			}
			Err(error) => {
				self.finished = true;
				Some(Err(error))
			}
		}
	}
}

impl FusedIterator for Scanner<'_> {}

/// Scan `source` with `table`.
pub fn scan<'a>(source: &'a str, table: &'a LanguageTable) -> Scanner<'a> {
	Scanner::new(source, table)
}

fn is_ident_start(c: char) -> bool {
	c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '_'
}
