use bytes::Bytes;
use tracing::debug;

use super::MAX_INTERPRETATION_DEPTH;
use crate::error::{BindrowError, Result};
use crate::types::{ClassId, EnumError, Payload, Tagged, TypeResolver};
use crate::wire::{BindParam, WireType};

/// Handler converting one tagged value into the bind descriptor at a
/// positional index.
pub type SerializeFn =
    fn(&mut Serializer, usize, &Tagged, &TypeResolver, usize) -> Result<()>;

/// Value-to-wire mapper.
///
/// Dispatches on the value's class id through a dense table, growing on
/// demand; classes without a handler fall back to the type's enabled
/// interpretation chain before failing. The accumulated descriptor list
/// belongs to one statement-binding call; [`Serializer::reset`] clears it
/// for reuse without leaking prior descriptors.
pub struct Serializer {
    methods: Vec<Option<SerializeFn>>,
    params: Vec<Option<BindParam>>,
}

impl Serializer {
    /// A serializer with the default scalar and enum handlers registered.
    ///
    /// Object, collection, map and Any classes are deliberately left
    /// without handlers: they are only valid as whole-row outputs, not as
    /// scalar bind parameters.
    pub fn new() -> Serializer {
        let mut s = Serializer {
            methods: vec![None; ClassId::BUILTIN_COUNT as usize],
            params: Vec::new(),
        };

        s.set_method(ClassId::TEXT, Some(serialize_text));
        s.set_method(ClassId::ANY, None);

        s.set_method(ClassId::BOOL, Some(serialize_bool));
        s.set_method(ClassId::INT8, Some(serialize_int8));
        s.set_method(ClassId::UINT8, Some(serialize_uint8));
        s.set_method(ClassId::INT16, Some(serialize_int16));
        s.set_method(ClassId::UINT16, Some(serialize_uint16));
        s.set_method(ClassId::INT32, Some(serialize_int32));
        s.set_method(ClassId::UINT32, Some(serialize_uint32));
        s.set_method(ClassId::INT64, Some(serialize_int64));
        s.set_method(ClassId::UINT64, Some(serialize_uint64));
        s.set_method(ClassId::FLOAT32, Some(serialize_float32));
        s.set_method(ClassId::FLOAT64, Some(serialize_float64));

        s.set_method(ClassId::OBJECT, None);
        s.set_method(ClassId::ENUM, Some(serialize_enum));

        s.set_method(ClassId::VECTOR, None);
        s.set_method(ClassId::LIST, None);
        s.set_method(ClassId::SET, None);
        s.set_method(ClassId::PAIR_LIST, None);
        s.set_method(ClassId::UNORDERED_MAP, None);

        s
    }

    /// Registers or clears the handler for a class, growing the table when
    /// the id lies past its current end.
    pub fn set_method(&mut self, class: ClassId, method: Option<SerializeFn>) {
        if class.index() >= self.methods.len() {
            self.methods.resize(class.index() + 1, None);
        }
        self.methods[class.index()] = method;
    }

    /// Serializes `value` into the descriptor at `index`, replacing any
    /// descriptor previously written there.
    pub fn serialize(
        &mut self,
        index: usize,
        value: &Tagged,
        resolver: &TypeResolver,
    ) -> Result<()> {
        self.serialize_at_depth(index, value, resolver, 0)
    }

    pub(crate) fn serialize_at_depth(
        &mut self,
        index: usize,
        value: &Tagged,
        resolver: &TypeResolver,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_INTERPRETATION_DEPTH {
            return Err(BindrowError::InterpretationDepth {
                max: MAX_INTERPRETATION_DEPTH,
            });
        }

        let class = value.ty().class();
        debug!(
            class = class.0,
            type_name = value.ty().name(),
            index,
            "serialize"
        );

        if let Some(method) = self.methods.get(class.index()).copied().flatten() {
            return method(self, index, value, resolver, depth);
        }

        if let Some(interpretation) = resolver.interpretation_for(value.ty()) {
            let target = interpretation.to_target(value)?;
            return self.serialize_at_depth(index, &target, resolver, depth + 1);
        }

        Err(BindrowError::UnsupportedType {
            direction: "serialize",
            type_name: value.ty().name().to_string(),
        })
    }

    /// The accumulated descriptor list. Unset positions correspond to
    /// parameters the binder skipped.
    pub fn slots(&self) -> &[Option<BindParam>] {
        &self.params
    }

    /// Extends the descriptor list with unset positions up to `len`, so
    /// the committed list always spans every template variable.
    pub fn pad_to(&mut self, len: usize) {
        if self.params.len() < len {
            self.params.resize(len, None);
        }
    }

    /// Clears the descriptor list for the next statement-binding call.
    pub fn reset(&mut self) {
        self.params.clear();
    }

    fn set_param(&mut self, index: usize, param: BindParam) {
        if index >= self.params.len() {
            self.params.resize(index + 1, None);
        }
        self.params[index] = Some(param);
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Serializer::new()
    }
}

fn mismatched(value: &Tagged) -> BindrowError {
    BindrowError::UnsupportedType {
        direction: "serialize",
        type_name: value.ty().name().to_string(),
    }
}

fn serialize_text(
    this: &mut Serializer,
    index: usize,
    value: &Tagged,
    _resolver: &TypeResolver,
    _depth: usize,
) -> Result<()> {
    let param = match value.payload() {
        None => BindParam::null(WireType::String),
        Some(Payload::Text(text)) => {
            BindParam::with_value(WireType::String, Bytes::copy_from_slice(text.as_bytes()))
        }
        Some(_) => return Err(mismatched(value)),
    };
    this.set_param(index, param);
    Ok(())
}

fn serialize_bool(
    this: &mut Serializer,
    index: usize,
    value: &Tagged,
    _resolver: &TypeResolver,
    _depth: usize,
) -> Result<()> {
    let param = match value.payload() {
        None => BindParam::null(WireType::Tiny),
        Some(Payload::Bool(b)) => {
            BindParam::with_value(WireType::Tiny, Bytes::copy_from_slice(&[*b as u8]))
        }
        Some(_) => return Err(mismatched(value)),
    };
    this.set_param(index, param);
    Ok(())
}

macro_rules! numeric_serializer {
    ($name:ident, $variant:ident, $wire:expr) => {
        fn $name(
            this: &mut Serializer,
            index: usize,
            value: &Tagged,
            _resolver: &TypeResolver,
            _depth: usize,
        ) -> Result<()> {
            let param = match value.payload() {
                None => BindParam::null($wire),
                Some(Payload::$variant(v)) => {
                    BindParam::with_value($wire, Bytes::copy_from_slice(&v.to_le_bytes()))
                }
                Some(_) => return Err(mismatched(value)),
            };
            this.set_param(index, param);
            Ok(())
        }
    };
}

numeric_serializer!(serialize_int8, Int8, WireType::Tiny);
numeric_serializer!(serialize_uint8, UInt8, WireType::Tiny);
numeric_serializer!(serialize_int16, Int16, WireType::Short);
numeric_serializer!(serialize_uint16, UInt16, WireType::Short);
numeric_serializer!(serialize_int32, Int32, WireType::Long);
numeric_serializer!(serialize_uint32, UInt32, WireType::Long);
numeric_serializer!(serialize_int64, Int64, WireType::LongLong);
numeric_serializer!(serialize_uint64, UInt64, WireType::LongLong);
numeric_serializer!(serialize_float32, Float32, WireType::Float);
numeric_serializer!(serialize_float64, Float64, WireType::Double);

// The enum's configured interpretation value is serialized in its place;
// a broken not-null constraint is distinct from a value with no entry.
fn serialize_enum(
    this: &mut Serializer,
    index: usize,
    value: &Tagged,
    resolver: &TypeResolver,
    depth: usize,
) -> Result<()> {
    let def = match value.ty().enum_def() {
        Some(def) => def,
        None => return Err(mismatched(value)),
    };
    match def.to_interpretation(value) {
        Ok(interpretation) => this.serialize_at_depth(index, &interpretation, resolver, depth + 1),
        Err(EnumError::NotNull) => Err(BindrowError::EnumConstraint {
            type_name: value.ty().name().to_string(),
        }),
        Err(EnumError::NoEntry) => Err(BindrowError::EnumValue {
            type_name: value.ty().name().to_string(),
        }),
    }
}
