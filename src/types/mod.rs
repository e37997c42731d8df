#![forbid(unsafe_code)]

//! Closed-world dynamic type model.
//!
//! Both marshalling directions dispatch on a dense [`ClassId`]; the
//! structures here carry everything a handler needs beyond the class:
//! enum definitions, object schemas, container item types, and declared
//! interpretations for host-defined classes.

/// Dense type-class identifiers.
pub mod class;

/// Property-path resolution and enabled interpretations.
pub mod resolver;

/// Type descriptors: scalars, enums, objects, containers, custom classes.
pub mod ty;

/// Tagged values.
pub mod value;

pub use class::ClassId;
pub use resolver::{Resolution, TypeResolver};
pub use ty::{EnumDef, EnumError, Field, Interpretation, ObjectSchema, Type, TypeInfo, TypeSelector};
pub use value::{ObjectValue, Payload, Tagged};
