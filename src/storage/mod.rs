//! Storage Layer - the relational engine behind a mapped document
//!
//! The mapping layer only talks to `RelationalEngine`:
//! - load a generated script atomically
//! - introspect table and column names
//! - fetch rows of one table, optionally filtered by parent reference
//! - run arbitrary queries

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::mapping::Script;
use crate::Result;
use rusqlite::types::ValueRef;
use serde::Serialize;
use std::fmt;

/// A single value read back from the engine, typed by storage class
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl CellValue {
    /// Attribute text for this value; `None` for NULL
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Integer(n) => Some(n.to_string()),
            CellValue::Real(n) => Some(n.to_string()),
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Blob(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CellValue::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(n) => CellValue::Integer(n),
            ValueRef::Real(n) => CellValue::Real(n),
            ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => CellValue::Blob(bytes.to_vec()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "NULL"),
        }
    }
}

pub type Row = Vec<CellValue>;

/// Result set with column names in select order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell of `row` under column `name`
    pub fn get(&self, row: usize, name: &str) -> Option<&CellValue> {
        let index = self.column_index(name)?;
        self.rows.get(row)?.get(index)
    }
}

/// The engine a document is loaded into.
pub trait RelationalEngine {
    /// Run the whole script or nothing of it
    fn load_script(&mut self, script: &Script) -> Result<()>;

    /// User tables in creation order
    fn table_names(&self) -> Result<Vec<String>>;

    /// Column names of a table in declaration order
    fn column_names(&self, table: &str) -> Result<Vec<String>>;

    /// All columns of a table's rows.
    ///
    /// `parent_filter` restricts to rows whose column equals the given id;
    /// rows are ordered by `order_by`, or by insertion order when `None`.
    fn fetch_rows(
        &self,
        table: &str,
        parent_filter: Option<(&str, i64)>,
        order_by: Option<&str>,
    ) -> Result<QueryRows>;

    fn query(&self, sql: &str) -> Result<QueryRows>;
}
