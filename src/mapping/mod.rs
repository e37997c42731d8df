#![forbid(unsafe_code)]

//! Bidirectional type-directed marshalling.
//!
//! Three dispatch tables, all dense arrays indexed by class id and grown on
//! demand: value-to-wire handlers, wire-to-value handlers keyed by target
//! type, and row-assembly handlers keyed by target container. Classes
//! without a handler fall back to their enabled interpretation chain, with
//! recursion bounded by [`MAX_INTERPRETATION_DEPTH`].

mod deserializer;
mod result;
mod serializer;

pub use deserializer::{Deserializer, DeserializeFn};
pub use result::{ReadOneRowFn, ReadRowsFn, ResultData, ResultMapper};
pub use serializer::{SerializeFn, Serializer};

/// Bound on interpretation-chain recursion; exceeding it is an error
/// rather than unbounded recursion over a cyclic chain.
pub const MAX_INTERPRETATION_DEPTH: usize = 32;
