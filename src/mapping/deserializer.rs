use std::sync::Arc;

use tracing::debug;

use super::MAX_INTERPRETATION_DEPTH;
use crate::error::{BindrowError, Result};
use crate::types::{ClassId, EnumError, Payload, Tagged, Type, TypeResolver};
use crate::wire::{ColumnBinding, WireType};

/// Handler converting one column's buffer into a tagged value of the
/// target type.
pub type DeserializeFn =
    fn(&Deserializer, &mut ColumnBinding, &Arc<Type>, &TypeResolver, usize) -> Result<Tagged>;

/// Wire-to-value mapper.
///
/// Dispatches on the TARGET type's class id through a dense table mirroring
/// the serializer's; classes without a handler fall back to the enabled
/// interpretation chain before failing. Every handler checks the column's
/// null flag before touching the buffer, and consumed bytes are cleared so
/// a later null-flagged read cannot observe stale data.
pub struct Deserializer {
    methods: Vec<Option<DeserializeFn>>,
}

impl Deserializer {
    /// A deserializer with the default handlers registered.
    pub fn new() -> Deserializer {
        let mut d = Deserializer {
            methods: vec![None; ClassId::BUILTIN_COUNT as usize],
        };

        d.set_method(ClassId::TEXT, Some(deserialize_text));
        d.set_method(ClassId::ANY, Some(deserialize_any));

        d.set_method(ClassId::BOOL, Some(deserialize_bool));
        d.set_method(ClassId::INT8, Some(deserialize_int8));
        d.set_method(ClassId::UINT8, Some(deserialize_uint8));
        d.set_method(ClassId::INT16, Some(deserialize_int16));
        d.set_method(ClassId::UINT16, Some(deserialize_uint16));
        d.set_method(ClassId::INT32, Some(deserialize_int32));
        d.set_method(ClassId::UINT32, Some(deserialize_uint32));
        d.set_method(ClassId::INT64, Some(deserialize_int64));
        d.set_method(ClassId::UINT64, Some(deserialize_uint64));
        d.set_method(ClassId::FLOAT32, Some(deserialize_float32));
        d.set_method(ClassId::FLOAT64, Some(deserialize_float64));

        d.set_method(ClassId::OBJECT, None);
        d.set_method(ClassId::ENUM, Some(deserialize_enum));

        d.set_method(ClassId::VECTOR, None);
        d.set_method(ClassId::LIST, None);
        d.set_method(ClassId::SET, None);
        d.set_method(ClassId::PAIR_LIST, None);
        d.set_method(ClassId::UNORDERED_MAP, None);

        d
    }

    /// Registers or clears the handler for a class, growing the table when
    /// the id lies past its current end.
    pub fn set_method(&mut self, class: ClassId, method: Option<DeserializeFn>) {
        if class.index() >= self.methods.len() {
            self.methods.resize(class.index() + 1, None);
        }
        self.methods[class.index()] = method;
    }

    /// Converts the column's current value into a tagged value of `ty`.
    pub fn deserialize(
        &self,
        column: &mut ColumnBinding,
        ty: &Arc<Type>,
        resolver: &TypeResolver,
    ) -> Result<Tagged> {
        self.deserialize_at_depth(column, ty, resolver, 0)
    }

    fn deserialize_at_depth(
        &self,
        column: &mut ColumnBinding,
        ty: &Arc<Type>,
        resolver: &TypeResolver,
        depth: usize,
    ) -> Result<Tagged> {
        if depth > MAX_INTERPRETATION_DEPTH {
            return Err(BindrowError::InterpretationDepth {
                max: MAX_INTERPRETATION_DEPTH,
            });
        }

        let class = ty.class();
        debug!(
            class = class.0,
            type_name = ty.name(),
            tag = ?column.wire_type,
            is_null = column.is_null,
            "deserialize"
        );

        if let Some(method) = self.methods.get(class.index()).copied().flatten() {
            return method(self, column, ty, resolver, depth);
        }

        if let Some(interpretation) = resolver.interpretation_for(ty) {
            let inner =
                self.deserialize_at_depth(column, interpretation.target(), resolver, depth + 1)?;
            return interpretation.from_target(inner);
        }

        Err(BindrowError::UnsupportedType {
            direction: "deserialize",
            type_name: ty.name().to_string(),
        })
    }
}

impl Default for Deserializer {
    fn default() -> Self {
        Deserializer::new()
    }
}

// Reads a little-endian integer of the column's tagged width and clears the
// consumed bytes.
fn read_int(column: &mut ColumnBinding) -> Result<i64> {
    let value = match column.wire_type {
        WireType::Tiny => i8::from_le_bytes([column.buffer[0]]) as i64,
        WireType::Short => {
            let mut raw = [0u8; 2];
            raw.copy_from_slice(&column.buffer[..2]);
            i16::from_le_bytes(raw) as i64
        }
        WireType::Long => {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&column.buffer[..4]);
            i32::from_le_bytes(raw) as i64
        }
        WireType::LongLong => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&column.buffer[..8]);
            i64::from_le_bytes(raw)
        }
        tag => {
            return Err(BindrowError::UnknownWireType {
                component: "integer deserializer",
                tag,
            })
        }
    };
    let width = column.wire_type.fixed_width().unwrap_or(0);
    column.buffer[..width].fill(0);
    Ok(value)
}

fn deserialize_text(
    _this: &Deserializer,
    column: &mut ColumnBinding,
    ty: &Arc<Type>,
    _resolver: &TypeResolver,
    _depth: usize,
) -> Result<Tagged> {
    if column.is_null {
        return Ok(Tagged::null(ty.clone()));
    }

    let capacity = column.buffer.len();
    let detected = column
        .buffer
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(capacity);
    // Cap at capacity - 1 in case the terminator never arrived.
    let len = detected.min(capacity.saturating_sub(1));
    let text = String::from_utf8_lossy(&column.buffer[..len]).into_owned();

    column.buffer.fill(0);

    Ok(Tagged::new(ty.clone(), Payload::Text(text)))
}

fn deserialize_bool(
    _this: &Deserializer,
    column: &mut ColumnBinding,
    ty: &Arc<Type>,
    _resolver: &TypeResolver,
    _depth: usize,
) -> Result<Tagged> {
    if column.is_null {
        return Ok(Tagged::null(ty.clone()));
    }
    let value = read_int(column)?;
    Ok(Tagged::new(ty.clone(), Payload::Bool(value != 0)))
}

macro_rules! int_deserializer {
    ($name:ident, $variant:ident, $t:ty) => {
        fn $name(
            _this: &Deserializer,
            column: &mut ColumnBinding,
            ty: &Arc<Type>,
            _resolver: &TypeResolver,
            _depth: usize,
        ) -> Result<Tagged> {
            if column.is_null {
                return Ok(Tagged::null(ty.clone()));
            }
            let value = read_int(column)?;
            Ok(Tagged::new(ty.clone(), Payload::$variant(value as $t)))
        }
    };
}

int_deserializer!(deserialize_int8, Int8, i8);
int_deserializer!(deserialize_uint8, UInt8, u8);
int_deserializer!(deserialize_int16, Int16, i16);
int_deserializer!(deserialize_uint16, UInt16, u16);
int_deserializer!(deserialize_int32, Int32, i32);
int_deserializer!(deserialize_uint32, UInt32, u32);
int_deserializer!(deserialize_int64, Int64, i64);
int_deserializer!(deserialize_uint64, UInt64, u64);

fn deserialize_float32(
    _this: &Deserializer,
    column: &mut ColumnBinding,
    ty: &Arc<Type>,
    _resolver: &TypeResolver,
    _depth: usize,
) -> Result<Tagged> {
    if column.is_null {
        return Ok(Tagged::null(ty.clone()));
    }
    match column.wire_type {
        WireType::Long | WireType::Float => {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&column.buffer[..4]);
            column.buffer[..4].fill(0);
            Ok(Tagged::new(
                ty.clone(),
                Payload::Float32(f32::from_le_bytes(raw)),
            ))
        }
        tag => Err(BindrowError::UnknownWireType {
            component: "float32 deserializer",
            tag,
        }),
    }
}

fn deserialize_float64(
    _this: &Deserializer,
    column: &mut ColumnBinding,
    ty: &Arc<Type>,
    _resolver: &TypeResolver,
    _depth: usize,
) -> Result<Tagged> {
    if column.is_null {
        return Ok(Tagged::null(ty.clone()));
    }
    match column.wire_type {
        WireType::LongLong | WireType::Double => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&column.buffer[..8]);
            column.buffer[..8].fill(0);
            Ok(Tagged::new(
                ty.clone(),
                Payload::Float64(f64::from_le_bytes(raw)),
            ))
        }
        tag => Err(BindrowError::UnknownWireType {
            component: "float64 deserializer",
            tag,
        }),
    }
}

// The concrete target type is inferred purely from the column's wire tag.
fn deserialize_any(
    this: &Deserializer,
    column: &mut ColumnBinding,
    ty: &Arc<Type>,
    resolver: &TypeResolver,
    depth: usize,
) -> Result<Tagged> {
    if column.is_null {
        return Ok(Tagged::null(ty.clone()));
    }

    let concrete = match column.wire_type {
        WireType::Tiny => Type::int8(),
        WireType::Short => Type::int16(),
        WireType::Long => Type::int32(),
        WireType::LongLong => Type::int64(),
        WireType::Float => Type::float32(),
        WireType::Double => Type::float64(),
        WireType::String => Type::text(),
    };

    let value = this.deserialize_at_depth(column, &concrete, resolver, depth + 1)?;
    Ok(Tagged::new(ty.clone(), Payload::Any(Box::new(value))))
}

fn deserialize_enum(
    this: &Deserializer,
    column: &mut ColumnBinding,
    ty: &Arc<Type>,
    resolver: &TypeResolver,
    depth: usize,
) -> Result<Tagged> {
    let def = match ty.enum_def() {
        Some(def) => def,
        None => {
            return Err(BindrowError::UnsupportedType {
                direction: "deserialize",
                type_name: ty.name().to_string(),
            })
        }
    };

    let interpretation = def.interpretation_type().clone();
    let value = this.deserialize_at_depth(column, &interpretation, resolver, depth + 1)?;

    match def.entry_for(&value) {
        Ok(Some(entry)) => Ok(Tagged::new(ty.clone(), Payload::Enum(entry.to_string()))),
        Ok(None) => Ok(Tagged::null(ty.clone())),
        Err(EnumError::NotNull) => Err(BindrowError::EnumConstraint {
            type_name: ty.name().to_string(),
        }),
        Err(EnumError::NoEntry) => Err(BindrowError::EnumValue {
            type_name: ty.name().to_string(),
        }),
    }
}
