#![forbid(unsafe_code)]

//! Transport contract: wire type tags, bind descriptors, column buffers,
//! and the statement traits the marshalling core drives.
//!
//! The physical wire encoding belongs to the transport. The core only
//! relies on the tags below, on fixed little-endian widths for numeric
//! buffers, and on NUL-terminated text in string buffers.

/// In-memory transport used by tests.
pub mod mock;

use bytes::Bytes;

/// Transport-defined tag identifying a column's or parameter's on-the-wire
/// representation.
///
/// Transports that surface richer source types (dates, timestamps,
/// variable-width strings) fold them into these canonical tags when
/// reporting result metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// 8-bit integer.
    Tiny,
    /// 16-bit integer.
    Short,
    /// 32-bit integer.
    Long,
    /// 64-bit integer.
    LongLong,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Fixed-capacity text.
    String,
}

impl WireType {
    /// Buffer width for fixed-width tags; `None` for text.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            WireType::Tiny => Some(1),
            WireType::Short => Some(2),
            WireType::Long => Some(4),
            WireType::LongLong => Some(8),
            WireType::Float => Some(4),
            WireType::Double => Some(8),
            WireType::String => None,
        }
    }
}

/// One column of a result set's schema.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    /// Column name.
    pub name: String,
    /// Wire representation of the column.
    pub wire_type: WireType,
    /// Declared length; meaningful for text columns.
    pub length: usize,
}

impl ColumnMeta {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, wire_type: WireType, length: usize) -> ColumnMeta {
        ColumnMeta {
            name: name.into(),
            wire_type,
            length,
        }
    }
}

/// Bind descriptor for one query parameter, passed to the transport at
/// bind time.
///
/// The value buffer is owned by the descriptor; each descriptor carries its
/// own null flag, never shared across parameters. A null descriptor still
/// names the wire type of the declared parameter type so the transport can
/// bind a typed NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindParam {
    /// Wire representation of the parameter.
    pub wire_type: WireType,
    /// Value bytes; `None` for a logical null.
    pub value: Option<Bytes>,
    /// Logical value length. Zero for fixed-width types, whose width is
    /// implied by the tag.
    pub length: usize,
    /// Dedicated null flag for this parameter.
    pub is_null: bool,
}

impl BindParam {
    /// Descriptor for a present value.
    pub fn with_value(wire_type: WireType, value: Bytes) -> BindParam {
        let length = match wire_type {
            WireType::String => value.len(),
            _ => 0,
        };
        BindParam {
            wire_type,
            value: Some(value),
            length,
            is_null: false,
        }
    }

    /// Descriptor for a typed null.
    pub fn null(wire_type: WireType) -> BindParam {
        BindParam {
            wire_type,
            value: None,
            length: 0,
            is_null: true,
        }
    }
}

/// Owned buffer state for one result column, reused in place across rows.
///
/// The statement-scoped result state exclusively owns every binding; the
/// deserializer must consume a column before the next fetch overwrites it.
#[derive(Debug)]
pub struct ColumnBinding {
    /// Column name from the result schema.
    pub name: String,
    /// Wire representation of the column.
    pub wire_type: WireType,
    /// Value buffer; length equals the bound capacity and never changes.
    pub buffer: Vec<u8>,
    /// Null flag for the current row.
    pub is_null: bool,
    /// Whether the transport truncated the current row's value.
    pub truncated: bool,
}

impl ColumnBinding {
    /// Allocates the buffer for a column: the tag's fixed width, or the
    /// declared length plus a terminator byte for text.
    pub fn for_column(meta: &ColumnMeta) -> ColumnBinding {
        let capacity = meta.wire_type.fixed_width().unwrap_or(meta.length + 1);
        ColumnBinding {
            name: meta.name.clone(),
            wire_type: meta.wire_type,
            buffer: vec![0; capacity],
            is_null: false,
            truncated: false,
        }
    }

    /// Bound buffer capacity.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

/// Result of one wire fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A row was written into the column bindings.
    Row,
    /// A row was written but at least one value was truncated.
    Truncated,
    /// Clean end of data.
    NoData,
    /// The fetch failed; see the statement's last error.
    Error,
}

/// A prepared statement handle owned by the transport.
pub trait PreparedStatement {
    /// Commits the accumulated descriptor list. A position may be unset
    /// when a named parameter was skipped by the binder. Returns `false`
    /// when the transport rejects the bind; the message is available via
    /// [`PreparedStatement::last_error`].
    fn bind_params(&mut self, params: &[Option<BindParam>]) -> bool;

    /// Executes the statement. Returns `false` on failure.
    fn execute(&mut self) -> bool;

    /// Result schema, or `None` when the statement produces no result set.
    fn metadata(&self) -> Option<Vec<ColumnMeta>>;

    /// Fetches the next row into the supplied column bindings.
    fn fetch(&mut self, columns: &mut [ColumnBinding]) -> FetchOutcome;

    /// Last transport error message for this statement.
    fn last_error(&self) -> String;
}

/// A live transport connection.
pub trait Connection {
    /// Statement handle type.
    type Stmt: PreparedStatement;

    /// Prepares a statement from transport-ready query text.
    fn prepare(&mut self, sql: &str) -> Result<Self::Stmt, String>;

    /// Row id generated by the last insert on this connection.
    fn last_insert_id(&self) -> i64;
}
