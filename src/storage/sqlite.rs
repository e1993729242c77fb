//! SQLite engine implementation

use super::{schema, CellValue, QueryRows, RelationalEngine, Row};
use crate::mapping::Script;
use crate::{Error, Result};
use rusqlite::{Connection, Params};
use std::path::Path;
use tempfile::TempPath;

/// SQLite-backed engine for mapped documents
pub struct SqliteStore {
    conn: Connection,
    /// Database file removed when the store is dropped
    _backing: Option<TempPath>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_connection(Connection::open(path)?, None)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    /// Open a fresh database file that lives as long as the store
    pub fn open_temporary() -> Result<Self> {
        let path = tempfile::Builder::new()
            .prefix("xmlsql-")
            .suffix(".db")
            .tempfile()?
            .into_temp_path();
        let conn = Connection::open(&path)?;
        tracing::debug!("temporary database at {}", path.display());
        Self::with_connection(conn, Some(path))
    }

    fn with_connection(conn: Connection, backing: Option<TempPath>) -> Result<Self> {
        conn.execute_batch(schema::ENABLE_FOREIGN_KEYS)?;
        Ok(Self {
            conn,
            _backing: backing,
        })
    }

    /// Raw connection for statements the engine trait does not cover
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Location of the backing file, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.conn
            .path()
            .filter(|p| !p.is_empty())
            .map(Path::new)
    }

    /// Execute one or more statements that return no rows
    pub fn execute(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|source| engine_error(sql, source))
    }

    fn select<P: Params>(&self, sql: &str, params: P) -> Result<QueryRows> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|source| engine_error(sql, source))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = stmt
            .query_map(params, |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(CellValue::from))
                    .collect::<rusqlite::Result<Row>>()
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<Row>>>())
            .map_err(|source| engine_error(sql, source))?;

        Ok(QueryRows { columns, rows })
    }
}

fn engine_error(statement: &str, source: rusqlite::Error) -> Error {
    Error::EngineExecution {
        statement: statement.trim().to_string(),
        source,
    }
}

impl RelationalEngine for SqliteStore {
    fn load_script(&mut self, script: &Script) -> Result<()> {
        // Dropping the transaction on an early return rolls everything back
        let tx = self.conn.transaction()?;
        for statement in script.statements() {
            tx.execute_batch(statement)
                .map_err(|source| engine_error(statement, source))?;
        }
        // Deferred references are checked here
        tx.commit().map_err(|source| engine_error("COMMIT", source))?;

        tracing::info!("loaded {} statements", script.len());
        Ok(())
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(schema::LIST_TABLES)?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    fn column_names(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(schema::LIST_COLUMNS)?;
        let names = stmt
            .query_map([table], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    fn fetch_rows(
        &self,
        table: &str,
        parent_filter: Option<(&str, i64)>,
        order_by: Option<&str>,
    ) -> Result<QueryRows> {
        let sql = schema::select_rows(table, parent_filter.map(|(column, _)| column), order_by);
        match parent_filter {
            Some((_, id)) => self.select(&sql, [id]),
            None => self.select(&sql, []),
        }
    }

    fn query(&self, sql: &str) -> Result<QueryRows> {
        self.select(sql, [])
    }
}
