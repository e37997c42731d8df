//! Tagged value model shared by both marshalling directions.
//!
//! A [`Tagged`] pairs a type with an optional payload; a null keeps its
//! declared type so the serializer can still emit the right wire tag for it.

use std::fmt;
use std::sync::Arc;

use super::ty::Type;

/// A dynamically-typed value: declared type plus optional payload.
#[derive(Clone)]
pub struct Tagged {
    ty: Arc<Type>,
    payload: Option<Payload>,
}

/// Payload carried by a non-null [`Tagged`] value.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// UTF-8 text.
    Text(String),
    /// Boolean.
    Bool(bool),
    /// Signed 8-bit integer.
    Int8(i8),
    /// Unsigned 8-bit integer.
    UInt8(u8),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Unsigned 16-bit integer.
    UInt16(u16),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Unsigned 32-bit integer.
    UInt32(u32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 64-bit integer.
    UInt64(u64),
    /// 32-bit float.
    Float32(f32),
    /// 64-bit float.
    Float64(f64),
    /// Enum entry name.
    Enum(String),
    /// Concrete value held by an Any-typed slot.
    Any(Box<Tagged>),
    /// Object field values.
    Object(ObjectValue),
    /// Collection elements in declared order.
    Collection(Vec<Tagged>),
    /// Map entries; insertion order preserved.
    Map(Vec<(String, Tagged)>),
}

impl Tagged {
    /// A value with an explicit type and payload.
    ///
    /// Callers are expected to keep the payload consistent with the type's
    /// class; the convenience constructors below do this automatically.
    pub fn new(ty: Arc<Type>, payload: Payload) -> Tagged {
        Tagged {
            ty,
            payload: Some(payload),
        }
    }

    /// A null value of the given declared type.
    pub fn null(ty: Arc<Type>) -> Tagged {
        Tagged { ty, payload: None }
    }

    /// Text value.
    pub fn text(value: impl Into<String>) -> Tagged {
        Tagged::new(Type::text(), Payload::Text(value.into()))
    }

    /// Boolean value.
    pub fn boolean(value: bool) -> Tagged {
        Tagged::new(Type::boolean(), Payload::Bool(value))
    }

    /// Signed 8-bit value.
    pub fn int8(value: i8) -> Tagged {
        Tagged::new(Type::int8(), Payload::Int8(value))
    }

    /// Unsigned 8-bit value.
    pub fn uint8(value: u8) -> Tagged {
        Tagged::new(Type::uint8(), Payload::UInt8(value))
    }

    /// Signed 16-bit value.
    pub fn int16(value: i16) -> Tagged {
        Tagged::new(Type::int16(), Payload::Int16(value))
    }

    /// Unsigned 16-bit value.
    pub fn uint16(value: u16) -> Tagged {
        Tagged::new(Type::uint16(), Payload::UInt16(value))
    }

    /// Signed 32-bit value.
    pub fn int32(value: i32) -> Tagged {
        Tagged::new(Type::int32(), Payload::Int32(value))
    }

    /// Unsigned 32-bit value.
    pub fn uint32(value: u32) -> Tagged {
        Tagged::new(Type::uint32(), Payload::UInt32(value))
    }

    /// Signed 64-bit value.
    pub fn int64(value: i64) -> Tagged {
        Tagged::new(Type::int64(), Payload::Int64(value))
    }

    /// Unsigned 64-bit value.
    pub fn uint64(value: u64) -> Tagged {
        Tagged::new(Type::uint64(), Payload::UInt64(value))
    }

    /// 32-bit float value.
    pub fn float32(value: f32) -> Tagged {
        Tagged::new(Type::float32(), Payload::Float32(value))
    }

    /// 64-bit float value.
    pub fn float64(value: f64) -> Tagged {
        Tagged::new(Type::float64(), Payload::Float64(value))
    }

    /// Enum value by entry name.
    pub fn enum_entry(ty: Arc<Type>, entry: impl Into<String>) -> Tagged {
        Tagged::new(ty, Payload::Enum(entry.into()))
    }

    /// A concrete value wrapped in an Any slot.
    pub fn any(value: Tagged) -> Tagged {
        Tagged::new(Type::any(), Payload::Any(Box::new(value)))
    }

    /// Declared type.
    pub fn ty(&self) -> &Arc<Type> {
        &self.ty
    }

    /// Payload, when present.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Whether the value carries no payload.
    pub fn is_null(&self) -> bool {
        self.payload.is_none()
    }

    /// Text payload, if this is a non-null text value.
    pub fn as_text(&self) -> Option<&str> {
        match self.payload() {
            Some(Payload::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Concrete value held by a non-null Any slot.
    pub fn as_any(&self) -> Option<&Tagged> {
        match self.payload() {
            Some(Payload::Any(inner)) => Some(inner),
            _ => None,
        }
    }

    /// Object payload, if present.
    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self.payload() {
            Some(Payload::Object(obj)) => Some(obj),
            _ => None,
        }
    }

    /// Collection elements, if present.
    pub fn as_collection(&self) -> Option<&[Tagged]> {
        match self.payload() {
            Some(Payload::Collection(items)) => Some(items),
            _ => None,
        }
    }

    /// Map entries, if present.
    pub fn as_map(&self) -> Option<&[(String, Tagged)]> {
        match self.payload() {
            Some(Payload::Map(entries)) => Some(entries),
            _ => None,
        }
    }
}

impl PartialEq for Tagged {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.payload == other.payload
    }
}

impl fmt::Debug for Tagged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            None => write!(f, "{}(null)", self.ty.name()),
            Some(p) => write!(f, "{}({:?})", self.ty.name(), p),
        }
    }
}

impl From<&str> for Tagged {
    fn from(value: &str) -> Self {
        Tagged::text(value)
    }
}

impl From<String> for Tagged {
    fn from(value: String) -> Self {
        Tagged::text(value)
    }
}

impl From<bool> for Tagged {
    fn from(value: bool) -> Self {
        Tagged::boolean(value)
    }
}

impl From<i8> for Tagged {
    fn from(value: i8) -> Self {
        Tagged::int8(value)
    }
}

impl From<u8> for Tagged {
    fn from(value: u8) -> Self {
        Tagged::uint8(value)
    }
}

impl From<i16> for Tagged {
    fn from(value: i16) -> Self {
        Tagged::int16(value)
    }
}

impl From<u16> for Tagged {
    fn from(value: u16) -> Self {
        Tagged::uint16(value)
    }
}

impl From<i32> for Tagged {
    fn from(value: i32) -> Self {
        Tagged::int32(value)
    }
}

impl From<u32> for Tagged {
    fn from(value: u32) -> Self {
        Tagged::uint32(value)
    }
}

impl From<i64> for Tagged {
    fn from(value: i64) -> Self {
        Tagged::int64(value)
    }
}

impl From<u64> for Tagged {
    fn from(value: u64) -> Self {
        Tagged::uint64(value)
    }
}

impl From<f32> for Tagged {
    fn from(value: f32) -> Self {
        Tagged::float32(value)
    }
}

impl From<f64> for Tagged {
    fn from(value: f64) -> Self {
        Tagged::float64(value)
    }
}

/// Field values of an object under assembly, in set order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectValue {
    entries: Vec<(String, Tagged)>,
}

impl ObjectValue {
    /// An object with no fields set.
    pub fn new() -> ObjectValue {
        ObjectValue::default()
    }

    /// Sets a field, replacing any previous value under the same name.
    pub fn set(&mut self, name: impl Into<String>, value: Tagged) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Value of a field, if set.
    pub fn get(&self, name: &str) -> Option<&Tagged> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// All set fields in set order.
    pub fn entries(&self) -> &[(String, Tagged)] {
        &self.entries
    }

    /// Number of set fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no fields are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
