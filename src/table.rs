//! Table definitions - declared or inferred shape of a mapped table
//!
//! Callers may declare tables up front to give columns a data kind or to add
//! keys; every other table is synthesized on first encounter during conversion.

use crate::column::Column;
use crate::key::Key;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named bag of column and constraint definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    name: String,
    #[serde(default)]
    columns: Vec<Column>,
    #[serde(default)]
    constraints: Vec<Key>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Builder-style column declaration
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Builder-style key declaration
    pub fn with_key(mut self, key: Key) -> Self {
        self.constraints.push(key);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared columns in declaration order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn constraints(&self) -> &[Key] {
        &self.constraints
    }

    /// Look up a declared column, failing if the table never declared it
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.find_column(name).ok_or_else(|| Error::ColumnNotFound {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.find_column(name).is_some()
    }

    /// Column of the declared primary key, if any
    pub fn primary_key(&self) -> Option<&str> {
        self.constraints.iter().find_map(|key| match key {
            Key::PrimaryKey { column } => Some(column.as_str()),
            _ => None,
        })
    }

    pub(crate) fn push_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub(crate) fn push_constraint(&mut self, key: Key) {
        self.constraints.push(key);
    }

    fn validate(&self) -> Result<()> {
        for (i, column) in self.columns.iter().enumerate() {
            if let Some(other) = self.columns[i + 1..]
                .iter()
                .find(|c| c.name().eq_ignore_ascii_case(column.name()))
            {
                return Err(Error::NamingCollision {
                    name: format!("{}.{}", self.name, other.name()),
                    detail: format!("collides with declared column {}", column.name()),
                });
            }
        }
        for key in &self.constraints {
            if key.columns().is_empty() {
                return Err(Error::Config(format!(
                    "key on table {} has no columns",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Ordered collection of table definitions, uniquely named.
///
/// Iteration order is discovery order: declared tables first, in the order the
/// caller supplied them, then inferred tables as the walk meets them.
#[derive(Debug, Default, Clone)]
pub struct TableCatalog {
    tables: Vec<TableDefinition>,
    positions: HashMap<String, usize>,
}

impl TableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from caller-declared definitions
    pub fn from_definitions(definitions: impl IntoIterator<Item = TableDefinition>) -> Result<Self> {
        let mut catalog = Self::new();
        for definition in definitions {
            definition.validate()?;
            if catalog.positions.contains_key(definition.name()) {
                return Err(Error::NamingCollision {
                    name: definition.name().to_string(),
                    detail: "table declared more than once".to_string(),
                });
            }
            catalog.insert(definition);
        }
        Ok(catalog)
    }

    fn insert(&mut self, definition: TableDefinition) -> usize {
        let index = self.tables.len();
        self.positions.insert(definition.name().to_string(), index);
        self.tables.push(definition);
        index
    }

    pub fn get(&self, name: &str) -> Option<&TableDefinition> {
        self.positions.get(name).map(|&i| &self.tables[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TableDefinition> {
        match self.positions.get(name) {
            Some(&i) => Some(&mut self.tables[i]),
            None => None,
        }
    }

    /// Look up a definition, synthesizing an empty one for undeclared tables
    pub fn get_or_insert(&mut self, name: &str) -> &mut TableDefinition {
        let index = match self.positions.get(name) {
            Some(&i) => i,
            None => self.insert(TableDefinition::new(name)),
        };
        &mut self.tables[index]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableDefinition> {
        self.tables.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(TableDefinition::name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
