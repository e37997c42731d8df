#![forbid(unsafe_code)]

//! Query template parsing and placeholder substitution.
//!
//! A template is scanned once, left to right, in three mutually exclusive
//! lexical modes: `:identifier` variables, `'...'` quote-enclosed literals,
//! and `$tag$...$tag$` dollar-enclosed literals. Literal regions are never
//! scanned for variables.

mod parser;
mod template;

pub use parser::parse_template;
pub use template::{StringTemplate, Variable};
