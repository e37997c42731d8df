//! Parameter binding and statement execution.
//!
//! Glues the template parser's variable list to the serializer: each named
//! placeholder is split into a root and a dotted property path, resolved
//! against the caller's parameter bag, and serialized at the variable's
//! positional index. The accumulated descriptor list is committed to the
//! transport in one call.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{BindrowError, Result};
use crate::mapping::{ResultData, ResultMapper, Serializer};
use crate::template::{parse_template, StringTemplate};
use crate::types::{Resolution, Tagged, Type, TypeResolver};
use crate::wire::{Connection, PreparedStatement};

/// A template variable name split into its root and property path.
///
/// `"user.name.first"` splits into root `user` and path `["name", "first"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParameter {
    /// Name looked up in the parameter bag.
    pub root: String,
    /// Remaining segments walked through nested object fields.
    pub property_path: SmallVec<[String; 4]>,
}

/// Splits a variable name on `.`. A trailing dot is ignored; an empty root
/// is reported by the binder as a malformed parameter name.
pub fn parse_query_parameter(name: &str) -> QueryParameter {
    match name.find('.') {
        Some(i) if i + 1 < name.len() => QueryParameter {
            root: name[..i].to_string(),
            property_path: name[i + 1..].split('.').map(str::to_string).collect(),
        },
        Some(i) => QueryParameter {
            root: name[..i].to_string(),
            property_path: SmallVec::new(),
        },
        None => QueryParameter {
            root: name.to_string(),
            property_path: SmallVec::new(),
        },
    }
}

/// What to do when a template names a parameter absent from the bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingParam {
    /// Leave the position unset and continue. Compatible default; the
    /// transport sees an unbound position.
    Skip,
    /// Fail the bind with [`BindrowError::MissingParameter`].
    Error,
}

/// Binder configuration.
#[derive(Debug, Clone)]
pub struct BinderOptions {
    /// Policy for parameters absent from the bag.
    pub missing_param: MissingParam,
}

impl Default for BinderOptions {
    fn default() -> Self {
        BinderOptions {
            missing_param: MissingParam::Skip,
        }
    }
}

impl BinderOptions {
    /// Absent parameters are skipped silently.
    pub fn permissive() -> BinderOptions {
        BinderOptions::default()
    }

    /// Absent parameters fail the bind.
    pub fn strict() -> BinderOptions {
        BinderOptions {
            missing_param: MissingParam::Error,
        }
    }
}

/// Name-to-value parameter bag supplied per execution.
#[derive(Clone, Default)]
pub struct Params {
    values: FxHashMap<String, Tagged>,
}

impl Params {
    /// An empty bag.
    pub fn new() -> Params {
        Params::default()
    }

    /// Adds a parameter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Tagged>) -> Params {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Adds a parameter in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Tagged>) {
        self.values.insert(name.into(), value.into());
    }

    /// Value bound to `name`, if present.
    pub fn get(&self, name: &str) -> Option<&Tagged> {
        self.values.get(name)
    }

    /// Number of parameters in the bag.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Executes parsed templates against a transport connection.
///
/// Owns the serializer whose descriptor list is rebuilt per execution, the
/// result mapper shared with the query results it produces, and the type
/// resolver used for property paths and interpretation fallback.
pub struct Executor<C: Connection> {
    connection: C,
    serializer: Serializer,
    mapper: Arc<ResultMapper>,
    resolver: TypeResolver,
    options: BinderOptions,
}

impl<C: Connection> Executor<C> {
    /// An executor with default (permissive) binder options.
    pub fn new(connection: C) -> Executor<C> {
        Executor::with_options(connection, BinderOptions::default())
    }

    /// An executor with explicit binder options.
    pub fn with_options(connection: C, options: BinderOptions) -> Executor<C> {
        Executor {
            connection,
            serializer: Serializer::new(),
            mapper: Arc::new(ResultMapper::new()),
            resolver: TypeResolver::new(),
            options,
        }
    }

    /// Replaces the type resolver.
    pub fn set_resolver(&mut self, resolver: TypeResolver) {
        self.resolver = resolver;
    }

    /// The type resolver in use.
    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    /// Parses a query template and attaches its name and prepare flag.
    pub fn parse_query_template(
        name: impl Into<String>,
        text: &str,
        prepare: bool,
    ) -> Result<StringTemplate> {
        Ok(parse_template(text)?.with_name(name).with_prepare(prepare))
    }

    /// Row id generated by the last insert on the underlying connection.
    pub fn last_insert_id(&self) -> i64 {
        self.connection.last_insert_id()
    }

    fn bind_params(
        &mut self,
        stmt: &mut C::Stmt,
        template: &StringTemplate,
        params: &Params,
    ) -> Result<()> {
        self.serializer.reset();

        for (index, var) in template.variables().iter().enumerate() {
            let query_param = parse_query_parameter(&var.name);
            if query_param.root.is_empty() {
                return Err(BindrowError::MalformedParameterName {
                    name: var.name.clone(),
                });
            }

            let value = match params.get(&query_param.root) {
                Some(value) => value,
                None => match self.options.missing_param {
                    MissingParam::Skip => {
                        debug!(name = %var.name, index, "parameter absent; position left unset");
                        continue;
                    }
                    MissingParam::Error => {
                        return Err(BindrowError::MissingParameter {
                            name: query_param.root,
                        })
                    }
                },
            };

            match self
                .resolver
                .resolve_property_path(value, &query_param.property_path)
            {
                Resolution::Unknown { .. } => {
                    return Err(BindrowError::UnresolvedParameter {
                        name: var.name.clone(),
                    })
                }
                Resolution::Value(resolved) => {
                    self.serializer.serialize(index, &resolved, &self.resolver)?
                }
            }
        }

        self.serializer.pad_to(template.variables().len());
        if !stmt.bind_params(self.serializer.slots()) {
            return Err(BindrowError::Bind(stmt.last_error()));
        }
        Ok(())
    }

    /// Prepares, binds and executes a template, returning the streaming
    /// result.
    pub fn execute(
        &mut self,
        template: &StringTemplate,
        params: &Params,
    ) -> Result<QueryResult<C::Stmt>> {
        let mut stmt = self
            .connection
            .prepare(template.prepared_text())
            .map_err(BindrowError::Prepare)?;

        self.bind_params(&mut stmt, template, params)?;

        if !stmt.execute() {
            return Err(BindrowError::Execute(stmt.last_error()));
        }

        let mut data = ResultData::new(stmt.metadata());
        data.init(&mut stmt);
        let error_message = if data.is_success() {
            String::new()
        } else {
            stmt.last_error()
        };

        Ok(QueryResult {
            stmt,
            data,
            mapper: Arc::clone(&self.mapper),
            resolver: self.resolver.clone(),
            error_message,
        })
    }
}

/// Streaming result of one executed statement.
///
/// Owns the statement handle and the column buffers for its lifetime; both
/// are released when the result is dropped.
pub struct QueryResult<S: PreparedStatement> {
    stmt: S,
    data: ResultData,
    mapper: Arc<ResultMapper>,
    resolver: TypeResolver,
    error_message: String,
}

impl<S: PreparedStatement> QueryResult<S> {
    /// False after a fetch error; a clean end of data keeps this true, so
    /// "query succeeded, zero rows" and "failed mid-stream" stay
    /// distinguishable.
    pub fn is_success(&self) -> bool {
        self.data.is_success()
    }

    /// Transport message captured when the first fetch failed.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Index of the row the state machine is positioned on.
    pub fn position(&self) -> i64 {
        self.data.row_index()
    }

    /// Total result count when the transport knows it ahead of streaming.
    /// Always `None` here: rows are streamed and counted only as they are
    /// fetched.
    pub fn known_count(&self) -> Option<i64> {
        None
    }

    /// Whether another row is available.
    pub fn has_more_to_fetch(&self) -> bool {
        self.data.has_more()
    }

    /// Reads up to `count` rows into a collection of `ty`; `count < 0`
    /// reads all remaining rows, `count == 0` yields an empty container
    /// without touching the state machine.
    pub fn fetch(&mut self, ty: &Arc<Type>, count: i64) -> Result<Tagged> {
        if count != 0 && !self.data.is_success() {
            let message = if self.error_message.is_empty() {
                self.stmt.last_error()
            } else {
                self.error_message.clone()
            };
            return Err(BindrowError::Fetch(message));
        }
        self.mapper
            .read_rows(&mut self.data, &mut self.stmt, ty, &self.resolver, count)
    }

    /// Reads all remaining rows into a collection of `ty`.
    pub fn fetch_all(&mut self, ty: &Arc<Type>) -> Result<Tagged> {
        self.fetch(ty, -1)
    }
}

impl<S: PreparedStatement> std::fmt::Debug for QueryResult<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResult")
            .field("is_success", &self.data.is_success())
            .field("position", &self.data.row_index())
            .field("error_message", &self.error_message)
            .finish_non_exhaustive()
    }
}
