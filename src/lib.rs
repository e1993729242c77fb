//! # xmlsql - Relational queries over XML documents
//!
//! Maps a hierarchical document onto SQLite tables and back.
//!
//! xmlsql provides:
//! - Streaming forward conversion with synthetic ids and parent references
//! - Table names that encode the element hierarchy
//! - A load script (tables, rows, indexes) applied atomically to SQLite
//! - Reverse synchronization from the tables to an equivalent XML tree
//! - A document facade for query-and-write-back sessions

pub mod column;
pub mod key;
pub mod table;
pub mod config;
pub mod source;
pub mod mapping;
pub mod storage;
pub mod document;
pub mod ui;

// Re-exports for convenient access
pub use column::{Column, DataKind, ForeignKey};
pub use key::Key;
pub use table::{TableCatalog, TableDefinition};
pub use config::{MappingConfig, ProjectConfig};
pub use mapping::{Envelope, Script, TableHierarchy};
pub use storage::{CellValue, QueryRows, RelationalEngine, SqliteStore};
pub use document::XmlDocument;

/// Result type alias for xmlsql operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for xmlsql operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Table {table} resolves to zero columns")]
    SchemaResolution { table: String },

    #[error("Naming collision on {name}: {detail}")]
    NamingCollision { name: String, detail: String },

    #[error("Engine rejected statement `{statement}`: {source}")]
    EngineExecution {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Parse error: {0}")]
    SourceParse(String),

    #[error("Column {column} not found in table {table}")]
    ColumnNotFound { table: String, column: String },

    #[error("Invalid literal {value:?} for column {table}.{column}")]
    InvalidLiteral {
        table: String,
        column: String,
        value: String,
    },

    #[error("Attribute {column} on {table} uses a reserved column name")]
    ReservedColumn { table: String, column: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
