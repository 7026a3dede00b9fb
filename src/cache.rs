//! Compilation cache module.
//!
//! # Examples
//!
//! ```rust
//! use reinhardt_lang::cache::Fingerprint;
//!
//! let a = Fingerprint::new("template", "autoescape=true;extensions=", "{{ x }}");
//! let b = Fingerprint::new("template", "autoescape=false;extensions=", "{{ x }}");
//! assert_ne!(a, b);
//! ```

pub use reinhardt_compile_cache::*;
