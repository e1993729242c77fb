//! Column types - what a mapped attribute is stored as
//!
//! Data kinds follow SQLite's storage classes:
//! - `Integer`: whole numbers, staged as raw numeric literals
//! - `Real`: floating point, staged as raw numeric literals
//! - `Text`: character data, staged as quoted literals
//! - `Blob`: opaque data, staged as quoted literals

use serde::{Deserialize, Serialize};

/// Storage kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Integer,
    Real,
    #[default]
    Text,
    Blob,
}

impl DataKind {
    /// SQL type name used in table-creation statements
    pub fn as_sql(&self) -> &'static str {
        match self {
            DataKind::Integer => "INTEGER",
            DataKind::Real => "REAL",
            DataKind::Text => "TEXT",
            DataKind::Blob => "BLOB",
        }
    }

    /// Whether values of this kind are staged as quoted string literals
    pub fn is_textual(&self) -> bool {
        matches!(self, DataKind::Text | DataKind::Blob)
    }
}

/// Referential constraint from a local column to a column of another table.
///
/// Always emitted deferrable: tables are created in discovery order, so the
/// referenced table may not have been created (or filled) yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Table holding the referenced column
    pub referenced_table: String,
    /// Referenced column, normally the parent's synthetic id
    pub referenced_column: String,
    /// Column of the owning table that carries the reference
    pub local_column: String,
}

impl ForeignKey {
    pub fn new(
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
        local_column: impl Into<String>,
    ) -> Self {
        Self {
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
            local_column: local_column.into(),
        }
    }
}

/// A column of a mapped table. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    #[serde(default)]
    kind: DataKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    foreign_key: Option<ForeignKey>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: DataKind) -> Self {
        Self {
            name: name.into(),
            kind,
            foreign_key: None,
        }
    }

    /// Column holding a reference to `referenced_table.referenced_column`
    pub fn with_foreign_key(
        name: impl Into<String>,
        kind: DataKind,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let foreign_key = ForeignKey::new(referenced_table, referenced_column, name.clone());
        Self {
            name,
            kind,
            foreign_key: Some(foreign_key),
        }
    }

    /// Default definition for an attribute nobody declared
    pub fn inferred(name: impl Into<String>) -> Self {
        Self::new(name, DataKind::Text)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DataKind {
        self.kind
    }

    pub fn foreign_key(&self) -> Option<&ForeignKey> {
        self.foreign_key.as_ref()
    }
}
