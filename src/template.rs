//! Template language module.
//!
//! Source text to render instruction sequences, plus the reference
//! [`Renderer`].
//!
//! # Examples
//!
//! ```rust
//! use reinhardt_lang::template::{compile, Renderer};
//! use serde_json::json;
//!
//! let compiled = compile("Hello {{ name }}!").unwrap();
//! let output = Renderer::new().render(&compiled, &json!({"name": "<b>A</b>"})).unwrap();
//! assert_eq!(output, "Hello &lt;b&gt;A&lt;/b&gt;!");
//! ```

pub use reinhardt_template_lang::*;
