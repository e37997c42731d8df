use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, error};

use super::deserializer::Deserializer;
use super::MAX_INTERPRETATION_DEPTH;
use crate::error::{BindrowError, Result};
use crate::types::{ClassId, ObjectValue, Payload, Tagged, Type, TypeResolver};
use crate::wire::{ColumnBinding, ColumnMeta, FetchOutcome, PreparedStatement};

/// Per-statement result state.
///
/// Owns one buffer and null flag per result column, bound from the
/// statement's metadata before the first fetch and reused in place across
/// rows. A statement with no result set has zero columns and starts
/// exhausted with success.
pub struct ResultData {
    columns: Vec<ColumnBinding>,
    names: Vec<String>,
    index_by_name: FxHashMap<String, usize>,
    row_index: i64,
    has_more: bool,
    is_success: bool,
}

impl ResultData {
    /// Binds column buffers from result metadata.
    pub fn new(metadata: Option<Vec<ColumnMeta>>) -> ResultData {
        match metadata {
            None => ResultData {
                columns: Vec::new(),
                names: Vec::new(),
                index_by_name: FxHashMap::default(),
                row_index: 0,
                has_more: false,
                is_success: true,
            },
            Some(metas) => {
                let mut names = Vec::with_capacity(metas.len());
                let mut index_by_name = FxHashMap::default();
                let columns = metas
                    .iter()
                    .enumerate()
                    .map(|(i, meta)| {
                        names.push(meta.name.clone());
                        index_by_name.insert(meta.name.clone(), i);
                        ColumnBinding::for_column(meta)
                    })
                    .collect();
                let has_more = !metas.is_empty();
                ResultData {
                    columns,
                    names,
                    index_by_name,
                    row_index: 0,
                    has_more,
                    is_success: true,
                }
            }
        }
    }

    /// Performs the first fetch and resets the row index.
    pub fn init(&mut self, stmt: &mut dyn PreparedStatement) {
        if !self.columns.is_empty() {
            self.next(stmt);
        }
        self.row_index = 0;
    }

    /// Fetches the next row into the column buffers.
    ///
    /// Truncated rows still count as rows; the per-column truncation flags
    /// say which values were cut.
    pub fn next(&mut self, stmt: &mut dyn PreparedStatement) {
        match stmt.fetch(&mut self.columns) {
            FetchOutcome::Row | FetchOutcome::Truncated => {
                self.has_more = true;
                self.is_success = true;
            }
            FetchOutcome::NoData => {
                self.has_more = false;
                self.is_success = true;
            }
            FetchOutcome::Error => {
                self.has_more = false;
                self.is_success = false;
            }
        }
    }

    /// Number of bound result columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Name of the column at `index`.
    pub fn column_name(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// Index of the named column, if it exists.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    /// Mutable access to the column binding at `index`.
    pub fn column_mut(&mut self, index: usize) -> &mut ColumnBinding {
        &mut self.columns[index]
    }

    /// Index of the row the state machine is positioned on.
    pub fn row_index(&self) -> i64 {
        self.row_index
    }

    /// Whether another row is available to read.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Whether the last transition succeeded. False only after a fetch
    /// error; a clean end of data keeps this true.
    pub fn is_success(&self) -> bool {
        self.is_success
    }
}

/// Handler assembling the current row into a value of the target container
/// type.
pub type ReadOneRowFn = fn(&ResultMapper, &mut ResultData, &Arc<Type>, &TypeResolver) -> Result<Tagged>;

/// Handler reading up to `count` rows into a collection of the target type.
pub type ReadRowsFn = fn(
    &ResultMapper,
    &mut ResultData,
    &mut dyn PreparedStatement,
    &Arc<Type>,
    &TypeResolver,
    i64,
) -> Result<Tagged>;

/// Assembles wire rows into caller-requested shapes.
///
/// Row assembly dispatches on the target CONTAINER class through the same
/// dense-table scheme as the scalar mappers: objects, collections and maps
/// for single rows; collections for multi-row reads.
pub struct ResultMapper {
    deserializer: Deserializer,
    read_one_row_methods: Vec<Option<ReadOneRowFn>>,
    read_rows_methods: Vec<Option<ReadRowsFn>>,
}

impl ResultMapper {
    /// A mapper with the default container handlers registered.
    pub fn new() -> ResultMapper {
        let mut m = ResultMapper {
            deserializer: Deserializer::new(),
            read_one_row_methods: vec![None; ClassId::BUILTIN_COUNT as usize],
            read_rows_methods: vec![None; ClassId::BUILTIN_COUNT as usize],
        };

        m.set_read_one_row_method(ClassId::OBJECT, Some(read_row_as_object));

        m.set_read_one_row_method(ClassId::VECTOR, Some(read_row_as_collection));
        m.set_read_one_row_method(ClassId::LIST, Some(read_row_as_collection));
        m.set_read_one_row_method(ClassId::SET, Some(read_row_as_collection));

        m.set_read_one_row_method(ClassId::PAIR_LIST, Some(read_row_as_map));
        m.set_read_one_row_method(ClassId::UNORDERED_MAP, Some(read_row_as_map));

        m.set_read_rows_method(ClassId::VECTOR, Some(read_rows_as_collection));
        m.set_read_rows_method(ClassId::LIST, Some(read_rows_as_collection));
        m.set_read_rows_method(ClassId::SET, Some(read_rows_as_collection));

        m
    }

    /// Registers or clears a single-row handler for a container class.
    pub fn set_read_one_row_method(&mut self, class: ClassId, method: Option<ReadOneRowFn>) {
        if class.index() >= self.read_one_row_methods.len() {
            self.read_one_row_methods.resize(class.index() + 1, None);
        }
        self.read_one_row_methods[class.index()] = method;
    }

    /// Registers or clears a multi-row handler for a container class.
    pub fn set_read_rows_method(&mut self, class: ClassId, method: Option<ReadRowsFn>) {
        if class.index() >= self.read_rows_methods.len() {
            self.read_rows_methods.resize(class.index() + 1, None);
        }
        self.read_rows_methods[class.index()] = method;
    }

    /// Scalar deserializer used for individual columns.
    pub fn deserializer(&self) -> &Deserializer {
        &self.deserializer
    }

    /// Assembles the current row into a value of `ty`.
    pub fn read_one_row(
        &self,
        data: &mut ResultData,
        ty: &Arc<Type>,
        resolver: &TypeResolver,
    ) -> Result<Tagged> {
        self.read_one_row_at_depth(data, ty, resolver, 0)
    }

    fn read_one_row_at_depth(
        &self,
        data: &mut ResultData,
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
        if let Some(method) = self.read_one_row_methods.get(class.index()).copied().flatten() {
            return method(self, data, ty, resolver);
        }

        if let Some(interpretation) = resolver.interpretation_for(ty) {
            let inner =
                self.read_one_row_at_depth(data, interpretation.target(), resolver, depth + 1)?;
            return interpretation.from_target(inner);
        }

        Err(BindrowError::UnsupportedType {
            direction: "row read",
            type_name: ty.name().to_string(),
        })
    }

    /// Reads up to `count` rows into a collection of `ty`, advancing the
    /// state machine once per row.
    ///
    /// `count == 0` yields an empty container without touching the state
    /// machine; `count < 0` reads all remaining rows; a positive count
    /// stops early at `count` rows or exhaustion, whichever comes first.
    pub fn read_rows(
        &self,
        data: &mut ResultData,
        stmt: &mut dyn PreparedStatement,
        ty: &Arc<Type>,
        resolver: &TypeResolver,
        count: i64,
    ) -> Result<Tagged> {
        debug!(type_name = ty.name(), count, "read rows");
        let class = ty.class();
        match self.read_rows_methods.get(class.index()).copied().flatten() {
            Some(method) => method(self, data, stmt, ty, resolver, count),
            None => Err(BindrowError::UnsupportedType {
                direction: "rows read",
                type_name: ty.name().to_string(),
            }),
        }
    }
}

impl Default for ResultMapper {
    fn default() -> Self {
        ResultMapper::new()
    }
}

fn container_mismatch(direction: &'static str, ty: &Type) -> BindrowError {
    BindrowError::UnsupportedType {
        direction,
        type_name: ty.name().to_string(),
    }
}

// Each bound column becomes one homogeneous element, in column order.
fn read_row_as_collection(
    mapper: &ResultMapper,
    data: &mut ResultData,
    ty: &Arc<Type>,
    resolver: &TypeResolver,
) -> Result<Tagged> {
    let item = match ty.item_type() {
        Some(item) => item.clone(),
        None => return Err(container_mismatch("row read", ty)),
    };

    let mut items = Vec::with_capacity(data.column_count());
    for i in 0..data.column_count() {
        items.push(mapper.deserializer.deserialize(data.column_mut(i), &item, resolver)?);
    }
    Ok(Tagged::new(ty.clone(), Payload::Collection(items)))
}

// Each bound column becomes one key/value pair keyed by column name.
fn read_row_as_map(
    mapper: &ResultMapper,
    data: &mut ResultData,
    ty: &Arc<Type>,
    resolver: &TypeResolver,
) -> Result<Tagged> {
    let key = match ty.key_type() {
        Some(key) => key,
        None => return Err(container_mismatch("row read", ty)),
    };
    if key.class() != ClassId::TEXT {
        return Err(BindrowError::InvalidKeyType {
            type_name: key.name().to_string(),
        });
    }
    let value_ty = match ty.value_type() {
        Some(value) => value.clone(),
        None => return Err(container_mismatch("row read", ty)),
    };

    let mut entries = Vec::with_capacity(data.column_count());
    for i in 0..data.column_count() {
        let name = data.column_name(i).to_string();
        let value = mapper
            .deserializer
            .deserialize(data.column_mut(i), &value_ty, resolver)?;
        entries.push((name, value));
    }
    Ok(Tagged::new(ty.clone(), Payload::Map(entries)))
}

// Concrete fields are populated first; polymorphic Any fields are deferred
// so their selector can inspect already-populated siblings.
fn read_row_as_object(
    mapper: &ResultMapper,
    data: &mut ResultData,
    ty: &Arc<Type>,
    resolver: &TypeResolver,
) -> Result<Tagged> {
    let schema = match ty.object_schema() {
        Some(schema) => schema,
        None => return Err(container_mismatch("row read", ty)),
    };

    let mut object = ObjectValue::new();
    let mut deferred = Vec::new();

    for i in 0..data.column_count() {
        let name = data.column_name(i).to_string();
        match schema.field_named(&name) {
            None => {
                error!(type_name = ty.name(), column = %name, "no field for result column");
                return Err(BindrowError::SchemaMismatch {
                    type_name: ty.name().to_string(),
                    column: name,
                });
            }
            Some(field) if field.selector.is_some() && field.ty.class() == ClassId::ANY => {
                deferred.push(i);
            }
            Some(field) => {
                let field_ty = field.ty.clone();
                let value =
                    mapper
                        .deserializer
                        .deserialize(data.column_mut(i), &field_ty, resolver)?;
                object.set(name, value);
            }
        }
    }

    for i in deferred {
        let name = data.column_name(i).to_string();
        let field = match schema.field_named(&name) {
            Some(field) => field,
            None => continue,
        };
        let selector = match &field.selector {
            Some(selector) => Arc::clone(selector),
            None => continue,
        };
        let selected = selector(&object)?;
        let value = mapper
            .deserializer
            .deserialize(data.column_mut(i), &selected, resolver)?;
        let slot = if value.is_null() {
            Tagged::null(field.ty.clone())
        } else {
            Tagged::new(field.ty.clone(), Payload::Any(Box::new(value)))
        };
        object.set(name, slot);
    }

    Ok(Tagged::new(ty.clone(), Payload::Object(object)))
}

fn read_rows_as_collection(
    mapper: &ResultMapper,
    data: &mut ResultData,
    stmt: &mut dyn PreparedStatement,
    ty: &Arc<Type>,
    resolver: &TypeResolver,
    count: i64,
) -> Result<Tagged> {
    let mut items = Vec::new();

    if count != 0 {
        let item = match ty.item_type() {
            Some(item) => item.clone(),
            None => return Err(container_mismatch("rows read", ty)),
        };

        let mut read: i64 = 0;
        while data.has_more {
            items.push(mapper.read_one_row(data, &item, resolver)?);
            data.row_index += 1;
            data.next(stmt);
            if !data.is_success {
                return Err(BindrowError::Fetch(stmt.last_error()));
            }
            if count > 0 {
                read += 1;
                if read == count {
                    break;
                }
            }
        }
    }

    Ok(Tagged::new(ty.clone(), Payload::Collection(items)))
}
