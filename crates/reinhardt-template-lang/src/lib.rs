//! # Reinhardt Template Lang
//!
//! A Volt/Jinja style template language compiled to a flat sequence of
//! render instructions.
//!
//! ## Syntax
//!
//! - `{{ expr }}` emits a value, HTML-escaped unless autoescape is off or the
//!   value passes through `raw`
//! - `{% ... %}` holds control directives: `if`/`elseif`/`else`,
//!   `for ... in ... if ...`/`elsefor`, `set`, `block`, `extends`,
//!   `include ... with`, `macro`, `cache`, `autoescape`, `do`, `break`,
//!   `continue`
//! - `{# ... #}` is a comment
//!
//! Directives outside that set are accepted only when registered in an
//! [`ExtensionTable`].
//!
//! ## Example
//!
//! ```
//! use reinhardt_template_lang::{compile, Instruction};
//!
//! let compiled = compile("Hello {{ name }}!").unwrap();
//! assert_eq!(compiled.instructions.len(), 3);
//! assert!(matches!(compiled.instructions[1], Instruction::EmitExpr { escape: true, .. }));
//! ```

pub mod ast;
pub mod escape;
pub mod extension;
pub mod grammar;
pub mod instruction;
pub mod parser;
pub mod render;
pub mod translator;

pub use ast::{Node, NodeKind, Template, TemplateExpr, TemplateExt};
pub use extension::{ExtensionTable, TagKind};
pub use grammar::TemplateGrammar;
pub use instruction::{Branch, CompiledTemplate, Instruction, MacroDefinition, References};
pub use parser::parse_template;
pub use render::{MemoryLoader, RenderError, Renderer, TemplateLoader};
pub use translator::{compile, translate, TemplateTranslator};

/// Language name used in cache fingerprints.
pub const LANGUAGE: &str = "template";
