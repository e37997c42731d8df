//! In-memory transport for tests.
//!
//! Scripts rows per statement text and encodes them into column bindings
//! the way a binary-protocol client library would: little-endian numerics
//! into fixed-width buffers, NUL-terminated text capped at the bound
//! capacity with truncation signaled. Bind descriptors, execute and fetch
//! calls are recorded for assertions.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use super::{BindParam, ColumnBinding, ColumnMeta, Connection, FetchOutcome, PreparedStatement, WireType};

/// A scripted cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum MockValue {
    /// SQL NULL.
    Null,
    /// 8-bit integer.
    I8(i8),
    /// 16-bit integer.
    I16(i16),
    /// 32-bit integer.
    I32(i32),
    /// 64-bit integer.
    I64(i64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// Text.
    Text(String),
}

impl From<i8> for MockValue {
    fn from(v: i8) -> Self {
        MockValue::I8(v)
    }
}

impl From<i16> for MockValue {
    fn from(v: i16) -> Self {
        MockValue::I16(v)
    }
}

impl From<i32> for MockValue {
    fn from(v: i32) -> Self {
        MockValue::I32(v)
    }
}

impl From<i64> for MockValue {
    fn from(v: i64) -> Self {
        MockValue::I64(v)
    }
}

impl From<f32> for MockValue {
    fn from(v: f32) -> Self {
        MockValue::F32(v)
    }
}

impl From<f64> for MockValue {
    fn from(v: f64) -> Self {
        MockValue::F64(v)
    }
}

impl From<&str> for MockValue {
    fn from(v: &str) -> Self {
        MockValue::Text(v.to_string())
    }
}

impl MockValue {
    fn as_i64(&self, column: &str) -> i64 {
        match self {
            MockValue::I8(v) => *v as i64,
            MockValue::I16(v) => *v as i64,
            MockValue::I32(v) => *v as i64,
            MockValue::I64(v) => *v,
            other => panic!("mock: column '{column}' scripted {other:?} into an integer slot"),
        }
    }
}

/// Scripted result set: schema plus rows.
#[derive(Debug, Clone, Default)]
pub struct MockResultSet {
    /// Result schema.
    pub columns: Vec<ColumnMeta>,
    /// Scripted rows; each row must match the schema width.
    pub rows: Vec<Vec<MockValue>>,
}

impl MockResultSet {
    /// A result set with the given schema and no rows yet.
    pub fn new(columns: Vec<ColumnMeta>) -> MockResultSet {
        MockResultSet {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    pub fn row(mut self, cells: Vec<MockValue>) -> MockResultSet {
        assert_eq!(
            cells.len(),
            self.columns.len(),
            "mock: row width must match column count"
        );
        self.rows.push(cells);
        self
    }
}

/// Per-statement behavior script.
#[derive(Debug, Clone, Default)]
pub struct MockScript {
    /// Result set; `None` means the statement produces no result set.
    pub result: Option<MockResultSet>,
    /// Reject the bind call with this message.
    pub reject_bind: Option<String>,
    /// Fail the execute call with this message.
    pub fail_execute: Option<String>,
    /// Fail the fetch of the row with this index.
    pub fail_fetch_at: Option<usize>,
}

impl MockScript {
    /// Script returning the given rows.
    pub fn returning(result: MockResultSet) -> MockScript {
        MockScript {
            result: Some(result),
            ..MockScript::default()
        }
    }

    /// Script for a statement with no result set.
    pub fn no_result_set() -> MockScript {
        MockScript::default()
    }

    /// Fails the fetch of row `index`.
    pub fn failing_fetch_at(mut self, index: usize) -> MockScript {
        self.fail_fetch_at = Some(index);
        self
    }

    /// Rejects the bind call.
    pub fn rejecting_bind(mut self, message: impl Into<String>) -> MockScript {
        self.reject_bind = Some(message.into());
        self
    }

    /// Fails the execute call.
    pub fn failing_execute(mut self, message: impl Into<String>) -> MockScript {
        self.fail_execute = Some(message.into());
        self
    }
}

/// Record of transport calls, shared by a connection and its statements.
#[derive(Debug, Clone, Default)]
pub struct MockLog {
    /// Statement texts passed to prepare, in order.
    pub prepared: Vec<String>,
    /// Descriptor lists committed by bind calls, in order.
    pub bound: Vec<Vec<Option<BindParam>>>,
    /// Number of execute calls.
    pub executes: usize,
    /// Number of fetch calls, terminal no-data fetches included.
    pub fetches: usize,
}

/// In-memory connection with scripted statements.
pub struct MockConnection {
    scripts: FxHashMap<String, MockScript>,
    log: Arc<Mutex<MockLog>>,
    insert_id: i64,
}

impl MockConnection {
    /// A connection with no scripted statements.
    pub fn new() -> MockConnection {
        MockConnection {
            scripts: FxHashMap::default(),
            log: Arc::new(Mutex::new(MockLog::default())),
            insert_id: 0,
        }
    }

    /// Scripts the given statement text.
    pub fn with_script(mut self, sql: impl Into<String>, script: MockScript) -> MockConnection {
        self.scripts.insert(sql.into(), script);
        self
    }

    /// Scripts a plain result set for the given statement text.
    pub fn with_result(self, sql: impl Into<String>, result: MockResultSet) -> MockConnection {
        self.with_script(sql, MockScript::returning(result))
    }

    /// Sets the id reported by [`Connection::last_insert_id`].
    pub fn with_last_insert_id(mut self, id: i64) -> MockConnection {
        self.insert_id = id;
        self
    }

    /// Snapshot of the call log.
    pub fn log(&self) -> MockLog {
        self.log.lock().unwrap().clone()
    }

    /// Shared handle to the call log, usable after the connection has been
    /// moved into an executor.
    pub fn log_handle(&self) -> Arc<Mutex<MockLog>> {
        Arc::clone(&self.log)
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        MockConnection::new()
    }
}

impl Connection for MockConnection {
    type Stmt = MockStatement;

    fn prepare(&mut self, sql: &str) -> Result<MockStatement, String> {
        match self.scripts.get(sql) {
            Some(script) => {
                self.log.lock().unwrap().prepared.push(sql.to_string());
                Ok(MockStatement {
                    script: script.clone(),
                    cursor: 0,
                    log: Arc::clone(&self.log),
                    last_error: String::new(),
                })
            }
            None => Err(format!("no script for statement: {sql}")),
        }
    }

    fn last_insert_id(&self) -> i64 {
        self.insert_id
    }
}

/// Statement handle produced by [`MockConnection::prepare`].
pub struct MockStatement {
    script: MockScript,
    cursor: usize,
    log: Arc<Mutex<MockLog>>,
    last_error: String,
}

impl PreparedStatement for MockStatement {
    fn bind_params(&mut self, params: &[Option<BindParam>]) -> bool {
        self.log.lock().unwrap().bound.push(params.to_vec());
        match &self.script.reject_bind {
            Some(message) => {
                self.last_error = message.clone();
                false
            }
            None => true,
        }
    }

    fn execute(&mut self) -> bool {
        self.log.lock().unwrap().executes += 1;
        match &self.script.fail_execute {
            Some(message) => {
                self.last_error = message.clone();
                false
            }
            None => true,
        }
    }

    fn metadata(&self) -> Option<Vec<ColumnMeta>> {
        self.script.result.as_ref().map(|r| r.columns.clone())
    }

    fn fetch(&mut self, columns: &mut [ColumnBinding]) -> FetchOutcome {
        self.log.lock().unwrap().fetches += 1;

        if self.script.fail_fetch_at == Some(self.cursor) {
            self.last_error = "injected fetch failure".to_string();
            return FetchOutcome::Error;
        }

        let rows = match &self.script.result {
            Some(result) => &result.rows,
            None => return FetchOutcome::NoData,
        };
        if self.cursor >= rows.len() {
            return FetchOutcome::NoData;
        }

        let row = &rows[self.cursor];
        self.cursor += 1;
        assert_eq!(
            row.len(),
            columns.len(),
            "mock: scripted row width must match bound column count"
        );

        let mut truncated = false;
        for (cell, column) in row.iter().zip(columns.iter_mut()) {
            column.truncated = false;
            if encode_cell(cell, column) {
                truncated = true;
            }
        }

        if truncated {
            FetchOutcome::Truncated
        } else {
            FetchOutcome::Row
        }
    }

    fn last_error(&self) -> String {
        self.last_error.clone()
    }
}

// Returns true when the value was truncated to fit the bound capacity.
fn encode_cell(cell: &MockValue, column: &mut ColumnBinding) -> bool {
    if let MockValue::Null = cell {
        column.is_null = true;
        return false;
    }
    column.is_null = false;

    match column.wire_type {
        WireType::Tiny => {
            let v = cell.as_i64(&column.name) as i8;
            column.buffer[..1].copy_from_slice(&v.to_le_bytes());
        }
        WireType::Short => {
            let v = cell.as_i64(&column.name) as i16;
            column.buffer[..2].copy_from_slice(&v.to_le_bytes());
        }
        WireType::Long => {
            let v = cell.as_i64(&column.name) as i32;
            column.buffer[..4].copy_from_slice(&v.to_le_bytes());
        }
        WireType::LongLong => {
            let v = cell.as_i64(&column.name);
            column.buffer[..8].copy_from_slice(&v.to_le_bytes());
        }
        WireType::Float => match cell {
            MockValue::F32(v) => column.buffer[..4].copy_from_slice(&v.to_le_bytes()),
            other => panic!(
                "mock: column '{}' scripted {other:?} into a float slot",
                column.name
            ),
        },
        WireType::Double => match cell {
            MockValue::F64(v) => column.buffer[..8].copy_from_slice(&v.to_le_bytes()),
            other => panic!(
                "mock: column '{}' scripted {other:?} into a double slot",
                column.name
            ),
        },
        WireType::String => match cell {
            MockValue::Text(text) => {
                let capacity = column.buffer.len();
                let writable = capacity.saturating_sub(1);
                let bytes = text.as_bytes();
                let n = bytes.len().min(writable);
                column.buffer[..n].copy_from_slice(&bytes[..n]);
                column.buffer[n..].fill(0);
                if bytes.len() > writable {
                    column.truncated = true;
                    return true;
                }
            }
            other => panic!(
                "mock: column '{}' scripted {other:?} into a text slot",
                column.name
            ),
        },
    }
    false
}
