//! Typed parameter marshalling and result materialization over binary
//! prepared-statement transports.
//!
//! Application code works with a dynamically-typed, reflectable value model
//! ([`types::Tagged`]); the wire speaks typed buffers, null flags and
//! fixed-width columns. Between them sit a query-template parser that
//! extracts `:named` parameters while skipping quoted literal regions, a
//! type-indexed serializer and deserializer, and a per-statement result
//! state machine that owns column buffers and assembles rows into objects,
//! collections and maps.
//!
//! Connection establishment, pooling and transaction control live behind
//! the [`wire::Connection`] and [`wire::PreparedStatement`] traits and are
//! the transport's concern.

#![warn(missing_docs)]

pub mod error;
pub mod executor;
pub mod mapping;
pub mod template;
pub mod types;
pub mod wire;

pub use error::{BindrowError, Result};
pub use executor::{BinderOptions, Executor, MissingParam, Params, QueryResult};
pub use template::{parse_template, StringTemplate, Variable};
pub use types::{Tagged, Type, TypeResolver};
