//! # Reinhardt Lang Core
//!
//! Compiler front-end shared by the query and template languages.
//!
//! ## Overview
//!
//! Both languages go through the same pipeline:
//!
//! - [`scanner`]: a lazy tokenizer driven by a [`LanguageTable`]
//! - [`parser`]: a token cursor plus a precedence-climbing expression
//!   parser driven by a [`Grammar`]
//! - [`ast`]: the expression tree, generic over a per-language extension
//!
//! Statement syntax and translation live in the language crates.
//!
//! ## Errors
//!
//! Every stage reports [`Error`], which carries the source [`Position`]
//! and an [`ErrorKind`] naming the stage that failed.

pub mod ast;
pub mod error;
pub mod grammar;
pub mod parser;
pub mod position;
pub mod scanner;
pub mod table;
pub mod token;

pub use ast::{Argument, BinaryOp, Expr, ExprExtension, ExprKind, ListItem, Literal, UnaryOp};
pub use error::{Error, ErrorKind, Result};
pub use grammar::{Assoc, Grammar, Infix, OperatorSpec, PrefixSpec};
pub use parser::Parser;
pub use position::Position;
pub use scanner::Scanner;
pub use table::{Delimiters, KeywordCase, LanguageTable};
pub use token::{Token, TokenKind};

/// Version of the compiler, folded into cache fingerprints.
pub const COMPILER_VERSION: &str = env!("CARGO_PKG_VERSION");
