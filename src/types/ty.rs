use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::class::ClassId;
use super::value::{ObjectValue, Payload, Tagged};
use crate::error::Result;

/// Chooses the concrete decoding type for a polymorphic field, given the
/// already-populated sibling fields of the row being assembled.
pub type TypeSelector = Arc<dyn Fn(&ObjectValue) -> Result<Arc<Type>> + Send + Sync>;

/// Converts a value of the declaring type into its interpretation type.
pub type InterpretFn = Arc<dyn Fn(&Tagged) -> Result<Tagged> + Send + Sync>;

/// Lifts a value of the interpretation type back into the declaring type.
pub type LiftFn = Arc<dyn Fn(Tagged) -> Result<Tagged> + Send + Sync>;

/// A marshallable type: class id plus the shape information the mappers
/// need (enum definition, object schema, container item types, declared
/// interpretations for host-defined classes).
pub struct Type {
    class: ClassId,
    name: String,
    info: TypeInfo,
}

/// Shape information attached to a [`Type`].
pub enum TypeInfo {
    /// Plain scalar; the class id says everything.
    Scalar,
    /// Type-erased value.
    Any,
    /// Enumeration.
    Enum(EnumDef),
    /// Object with declared fields.
    Object(ObjectSchema),
    /// Homogeneous sequence or set.
    Collection {
        /// Declared element type.
        item: Arc<Type>,
    },
    /// String-keyed map.
    Map {
        /// Declared key type.
        key: Arc<Type>,
        /// Declared value type.
        value: Arc<Type>,
    },
    /// Host-defined class with declared alternate representations.
    Custom {
        /// Interpretations, tried in declaration order.
        interpretations: Vec<Interpretation>,
    },
}

impl Type {
    fn scalar(class: ClassId, name: &str) -> Arc<Type> {
        Arc::new(Type {
            class,
            name: name.to_string(),
            info: TypeInfo::Scalar,
        })
    }

    /// UTF-8 text type.
    pub fn text() -> Arc<Type> {
        Self::scalar(ClassId::TEXT, "Text")
    }

    /// Boolean type.
    pub fn boolean() -> Arc<Type> {
        Self::scalar(ClassId::BOOL, "Boolean")
    }

    /// Signed 8-bit integer type.
    pub fn int8() -> Arc<Type> {
        Self::scalar(ClassId::INT8, "Int8")
    }

    /// Unsigned 8-bit integer type.
    pub fn uint8() -> Arc<Type> {
        Self::scalar(ClassId::UINT8, "UInt8")
    }

    /// Signed 16-bit integer type.
    pub fn int16() -> Arc<Type> {
        Self::scalar(ClassId::INT16, "Int16")
    }

    /// Unsigned 16-bit integer type.
    pub fn uint16() -> Arc<Type> {
        Self::scalar(ClassId::UINT16, "UInt16")
    }

    /// Signed 32-bit integer type.
    pub fn int32() -> Arc<Type> {
        Self::scalar(ClassId::INT32, "Int32")
    }

    /// Unsigned 32-bit integer type.
    pub fn uint32() -> Arc<Type> {
        Self::scalar(ClassId::UINT32, "UInt32")
    }

    /// Signed 64-bit integer type.
    pub fn int64() -> Arc<Type> {
        Self::scalar(ClassId::INT64, "Int64")
    }

    /// Unsigned 64-bit integer type.
    pub fn uint64() -> Arc<Type> {
        Self::scalar(ClassId::UINT64, "UInt64")
    }

    /// 32-bit float type.
    pub fn float32() -> Arc<Type> {
        Self::scalar(ClassId::FLOAT32, "Float32")
    }

    /// 64-bit float type.
    pub fn float64() -> Arc<Type> {
        Self::scalar(ClassId::FLOAT64, "Float64")
    }

    /// Type-erased "any" type.
    pub fn any() -> Arc<Type> {
        Arc::new(Type {
            class: ClassId::ANY,
            name: "Any".to_string(),
            info: TypeInfo::Any,
        })
    }

    /// Enumeration type from a definition.
    pub fn enumeration(def: EnumDef) -> Arc<Type> {
        Arc::new(Type {
            class: ClassId::ENUM,
            name: def.name.clone(),
            info: TypeInfo::Enum(def),
        })
    }

    /// Object type from a schema.
    pub fn object(schema: ObjectSchema) -> Arc<Type> {
        Arc::new(Type {
            class: ClassId::OBJECT,
            name: schema.name.clone(),
            info: TypeInfo::Object(schema),
        })
    }

    /// Growable ordered sequence of `item`.
    pub fn vector(item: Arc<Type>) -> Arc<Type> {
        Arc::new(Type {
            class: ClassId::VECTOR,
            name: format!("Vector<{}>", item.name),
            info: TypeInfo::Collection { item },
        })
    }

    /// Ordered sequence of `item`.
    pub fn list(item: Arc<Type>) -> Arc<Type> {
        Arc::new(Type {
            class: ClassId::LIST,
            name: format!("List<{}>", item.name),
            info: TypeInfo::Collection { item },
        })
    }

    /// Unordered set of `item`.
    pub fn set(item: Arc<Type>) -> Arc<Type> {
        Arc::new(Type {
            class: ClassId::SET,
            name: format!("Set<{}>", item.name),
            info: TypeInfo::Collection { item },
        })
    }

    /// Ordered map from `key` to `value`.
    pub fn pair_list(key: Arc<Type>, value: Arc<Type>) -> Arc<Type> {
        Arc::new(Type {
            class: ClassId::PAIR_LIST,
            name: format!("PairList<{}, {}>", key.name, value.name),
            info: TypeInfo::Map { key, value },
        })
    }

    /// Unordered map from `key` to `value`.
    pub fn unordered_map(key: Arc<Type>, value: Arc<Type>) -> Arc<Type> {
        Arc::new(Type {
            class: ClassId::UNORDERED_MAP,
            name: format!("UnorderedMap<{}, {}>", key.name, value.name),
            info: TypeInfo::Map { key, value },
        })
    }

    /// Host-defined type with declared alternate representations.
    ///
    /// Neither mapper has a handler for a custom class; marshalling goes
    /// through the first enabled interpretation.
    pub fn custom(
        name: impl Into<String>,
        class: ClassId,
        interpretations: Vec<Interpretation>,
    ) -> Arc<Type> {
        Arc::new(Type {
            class,
            name: name.into(),
            info: TypeInfo::Custom { interpretations },
        })
    }

    /// Class id of this type.
    #[inline]
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Human-readable type name, used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shape information.
    pub fn info(&self) -> &TypeInfo {
        &self.info
    }

    /// Declared element type, for collection classes.
    pub fn item_type(&self) -> Option<&Arc<Type>> {
        match &self.info {
            TypeInfo::Collection { item } => Some(item),
            _ => None,
        }
    }

    /// Declared key type, for map classes.
    pub fn key_type(&self) -> Option<&Arc<Type>> {
        match &self.info {
            TypeInfo::Map { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Declared value type, for map classes.
    pub fn value_type(&self) -> Option<&Arc<Type>> {
        match &self.info {
            TypeInfo::Map { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Enum definition, for enum types.
    pub fn enum_def(&self) -> Option<&EnumDef> {
        match &self.info {
            TypeInfo::Enum(def) => Some(def),
            _ => None,
        }
    }

    /// Object schema, for object types.
    pub fn object_schema(&self) -> Option<&ObjectSchema> {
        match &self.info {
            TypeInfo::Object(schema) => Some(schema),
            _ => None,
        }
    }

    /// First declared interpretation that is enabled.
    ///
    /// Unnamed interpretations are always enabled; named ones require
    /// membership in the resolver's enabled set.
    pub fn find_interpretation(&self, enabled: &[String]) -> Option<&Interpretation> {
        match &self.info {
            TypeInfo::Custom { interpretations } => interpretations.iter().find(|i| match &i.name {
                None => true,
                Some(name) => enabled.iter().any(|e| e == name),
            }),
            _ => None,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.name == other.name
    }
}

impl Eq for Type {}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.name)
    }
}

/// Outcome of an enum conversion that did not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumError {
    /// Null value on an enum declared not-null.
    NotNull,
    /// No entry matches the value.
    NoEntry,
}

struct EnumEntry {
    name: String,
    value: Tagged,
}

/// Enumeration definition: named entries, each carrying its underlying
/// interpretation value, plus an optional not-null constraint.
pub struct EnumDef {
    name: String,
    interpretation: Arc<Type>,
    entries: Vec<EnumEntry>,
    not_null: bool,
}

impl EnumDef {
    /// Starts a definition with the given interpretation (underlying) type.
    pub fn new(name: impl Into<String>, interpretation: Arc<Type>) -> Self {
        EnumDef {
            name: name.into(),
            interpretation,
            entries: Vec::new(),
            not_null: false,
        }
    }

    /// Adds a named entry with its underlying value.
    pub fn entry(mut self, name: impl Into<String>, value: Tagged) -> Self {
        self.entries.push(EnumEntry {
            name: name.into(),
            value,
        });
        self
    }

    /// Marks the enum as not-null in both marshalling directions.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Enum name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared interpretation type.
    pub fn interpretation_type(&self) -> &Arc<Type> {
        &self.interpretation
    }

    /// Converts an enum-typed value into its interpretation value.
    pub fn to_interpretation(&self, value: &Tagged) -> std::result::Result<Tagged, EnumError> {
        match value.payload() {
            None => {
                if self.not_null {
                    Err(EnumError::NotNull)
                } else {
                    Ok(Tagged::null(self.interpretation.clone()))
                }
            }
            Some(Payload::Enum(entry)) => self
                .entries
                .iter()
                .find(|e| e.name == *entry)
                .map(|e| e.value.clone())
                .ok_or(EnumError::NoEntry),
            Some(_) => Err(EnumError::NoEntry),
        }
    }

    /// Maps an interpretation value back to an entry name; `None` for null.
    pub fn entry_for(&self, value: &Tagged) -> std::result::Result<Option<&str>, EnumError> {
        if value.is_null() {
            return if self.not_null {
                Err(EnumError::NotNull)
            } else {
                Ok(None)
            };
        }
        self.entries
            .iter()
            .find(|e| e.value.payload() == value.payload())
            .map(|e| Some(e.name.as_str()))
            .ok_or(EnumError::NoEntry)
    }
}

/// One declared field of an object type.
pub struct Field {
    /// Field name; matched against result column names.
    pub name: String,
    /// Declared field type.
    pub ty: Arc<Type>,
    /// Selector for polymorphic fields; only honored on Any-typed fields.
    pub selector: Option<TypeSelector>,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("polymorphic", &self.selector.is_some())
            .finish()
    }
}

/// Declared fields of an object type.
pub struct ObjectSchema {
    name: String,
    fields: Vec<Field>,
    index: FxHashMap<String, usize>,
}

impl ObjectSchema {
    /// Starts an empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        ObjectSchema {
            name: name.into(),
            fields: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Adds a concretely-typed field.
    pub fn field(mut self, name: impl Into<String>, ty: Arc<Type>) -> Self {
        let name = name.into();
        self.index.insert(name.clone(), self.fields.len());
        self.fields.push(Field {
            name,
            ty,
            selector: None,
        });
        self
    }

    /// Adds a polymorphic Any-typed field resolved by `selector` after the
    /// concrete fields of the row are populated.
    pub fn polymorphic(mut self, name: impl Into<String>, selector: TypeSelector) -> Self {
        let name = name.into();
        self.index.insert(name.clone(), self.fields.len());
        self.fields.push(Field {
            name,
            ty: Type::any(),
            selector: Some(selector),
        });
        self
    }

    /// Schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field with the given name.
    pub fn field_named(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&i| &self.fields[i])
    }
}

/// A declared alternate representation for a host-defined type.
pub struct Interpretation {
    name: Option<String>,
    target: Arc<Type>,
    to_target: InterpretFn,
    from_target: LiftFn,
}

impl Interpretation {
    /// Always-enabled interpretation.
    pub fn new(target: Arc<Type>, to_target: InterpretFn, from_target: LiftFn) -> Self {
        Interpretation {
            name: None,
            target,
            to_target,
            from_target,
        }
    }

    /// Interpretation enabled only when its name is in the resolver's
    /// enabled set.
    pub fn named(
        name: impl Into<String>,
        target: Arc<Type>,
        to_target: InterpretFn,
        from_target: LiftFn,
    ) -> Self {
        Interpretation {
            name: Some(name.into()),
            target,
            to_target,
            from_target,
        }
    }

    /// The representation type marshalling goes through.
    pub fn target(&self) -> &Arc<Type> {
        &self.target
    }

    /// Converts a declaring-type value into the representation type.
    pub fn to_target(&self, value: &Tagged) -> Result<Tagged> {
        (self.to_target)(value)
    }

    /// Lifts a representation-type value back into the declaring type.
    pub fn from_target(&self, value: Tagged) -> Result<Tagged> {
        (self.from_target)(value)
    }
}
