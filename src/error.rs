//! Error taxonomy shared across the crate.

use thiserror::Error;

use crate::wire::WireType;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, BindrowError>;

/// Structured errors emitted by the marshalling layer.
///
/// Every fatal condition names the failing component and, where available,
/// the offending identifier (column name, type name, parameter name) so
/// failures can be diagnosed without source inspection. Transport-reported
/// failures carry the transport's message verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindrowError {
    /// Query template text is malformed.
    #[error("template parse error at position {position}: {message}")]
    Parse {
        /// What went wrong.
        message: String,
        /// Byte offset into the original template text.
        position: usize,
    },
    /// No handler is registered for the type class and no interpretation applies.
    #[error("no {direction} method for type '{type_name}'")]
    UnsupportedType {
        /// Which dispatch table was consulted.
        direction: &'static str,
        /// Name of the offending type.
        type_name: String,
    },
    /// A handler was invoked against a wire-type tag it does not recognize.
    #[error("{component}: unknown wire type tag {tag:?}")]
    UnknownWireType {
        /// The handler that rejected the tag.
        component: &'static str,
        /// The rejected tag.
        tag: WireType,
    },
    /// Enum not-null constraint broken during encode or decode.
    #[error("enum '{type_name}': not-null constraint violated")]
    EnumConstraint {
        /// Name of the enum type.
        type_name: String,
    },
    /// A value has no representation among the enum's entries.
    #[error("enum '{type_name}': value has no matching entry")]
    EnumValue {
        /// Name of the enum type.
        type_name: String,
    },
    /// A template variable's name has an empty root segment.
    #[error("malformed parameter name '{name}'")]
    MalformedParameterName {
        /// The variable name as written in the template.
        name: String,
    },
    /// A property path did not resolve against the supplied parameter value.
    #[error("can't resolve parameter '{name}': property not found or its type is unknown")]
    UnresolvedParameter {
        /// The variable name as written in the template.
        name: String,
    },
    /// A named parameter is absent from the parameter bag (strict mode only).
    #[error("missing parameter '{name}'")]
    MissingParameter {
        /// Root name of the missing parameter.
        name: String,
    },
    /// A returned column has no same-named field on the target object type.
    #[error("object type '{type_name}' has no field to map column '{column}'")]
    SchemaMismatch {
        /// Target object type.
        type_name: String,
        /// The unmatched result column.
        column: String,
    },
    /// The target map's key type is not textual.
    #[error("invalid map key type '{type_name}': map keys must be text")]
    InvalidKeyType {
        /// The offending key type.
        type_name: String,
    },
    /// Interpretation chains recursed past the configured bound.
    #[error("interpretation chain exceeds depth {max}")]
    InterpretationDepth {
        /// The depth bound.
        max: usize,
    },
    /// Statement preparation rejected by the transport.
    #[error("prepare failed: {0}")]
    Prepare(String),
    /// Parameter bind rejected by the transport.
    #[error("bind failed: {0}")]
    Bind(String),
    /// Statement execution rejected by the transport.
    #[error("execute failed: {0}")]
    Execute(String),
    /// Row fetch failed mid-stream.
    #[error("fetch failed: {0}")]
    Fetch(String),
}
