//! Key types - constraints a table definition can declare
//!
//! Keys form a closed set; the emitter matches on every variant:
//! - `PrimaryKey`: exactly one column, annotated inline
//! - `Index` / `UniqueIndex`: one or more columns, created after the data
//! - `ForeignKey`: inline deferrable reference to another table

use crate::column::ForeignKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A constraint declared on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Key {
    PrimaryKey { column: String },
    /// Column sets are order-insensitive; a `BTreeSet` keeps them sorted
    Index { columns: BTreeSet<String> },
    UniqueIndex { columns: BTreeSet<String> },
    ForeignKey(ForeignKey),
}

impl Key {
    pub fn primary_key(column: impl Into<String>) -> Self {
        Key::PrimaryKey {
            column: column.into(),
        }
    }

    pub fn index<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Key::Index {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn unique_index<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Key::UniqueIndex {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn foreign_key(
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
        local_column: impl Into<String>,
    ) -> Self {
        Key::ForeignKey(ForeignKey::new(
            referenced_table,
            referenced_column,
            local_column,
        ))
    }

    /// Local columns affected by this key, in sorted order for index keys
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Key::PrimaryKey { column } => vec![column.as_str()],
            Key::Index { columns } | Key::UniqueIndex { columns } => {
                columns.iter().map(String::as_str).collect()
            }
            Key::ForeignKey(fk) => vec![fk.local_column.as_str()],
        }
    }
}
