//! Schema accumulator - mapping state gathered during the forward walk
//!
//! Tracks, per table:
//! - the union of attribute names seen on its elements
//! - the synthetic id counter
//! - whether meta-columns were already appended to its definition
//! - the identifier the engine will see, to catch names that only differ by case

use super::naming;
use crate::column::{Column, DataKind};
use crate::config::MappingConfig;
use crate::key::Key;
use crate::table::TableDefinition;
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Per-table registry of columns, id counters and meta-column guards.
#[derive(Debug, Default)]
pub struct SchemaAccumulator {
    /// table → attribute names, first-seen order
    columns: HashMap<String, Vec<String>>,
    /// table → next id to hand out
    next_ids: HashMap<String, i64>,
    /// tables whose definition already received meta-columns
    meta_applied: HashSet<String>,
    /// folded identifier → canonical table name
    claimed: HashMap<String, String>,
    id_column: Option<String>,
    parent_column: Option<String>,
    text_column: Option<String>,
    separator: String,
}

impl SchemaAccumulator {
    pub fn new(config: &MappingConfig) -> Self {
        Self {
            id_column: config.id_column_name.clone(),
            parent_column: config.parent_reference_column_name.clone(),
            text_column: config.text_column_name.clone(),
            separator: config.separator.clone(),
            ..Self::default()
        }
    }

    /// Reserve a table name, failing if a different name maps to the same identifier
    pub fn claim_table(&mut self, table_name: &str) -> Result<()> {
        let folded = naming::fold(table_name);
        match self.claimed.get(&folded) {
            Some(existing) if existing != table_name => Err(Error::NamingCollision {
                name: table_name.to_string(),
                detail: format!("collides with table {}", existing),
            }),
            Some(_) => Ok(()),
            None => {
                self.claimed.insert(folded, table_name.to_string());
                Ok(())
            }
        }
    }

    /// Add `column_name` to the column set of `table_name`, failing if the set
    /// already holds a name that only differs by case
    pub fn register_attribute(&mut self, table_name: &str, column_name: &str) -> Result<()> {
        let columns = self.columns.entry(table_name.to_string()).or_default();
        let folded = naming::fold(column_name);
        match columns.iter().find(|c| naming::fold(c) == folded) {
            Some(existing) if existing != column_name => Err(Error::NamingCollision {
                name: format!("{}.{}", table_name, column_name),
                detail: format!("collides with column {}", existing),
            }),
            Some(_) => Ok(()),
            None => {
                columns.push(column_name.to_string());
                Ok(())
            }
        }
    }

    /// Registered attribute names of a table
    pub fn columns(&self, table_name: &str) -> &[String] {
        self.columns
            .get(table_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Hand out the next synthetic id for a table; the first is 1
    pub fn next_id(&mut self, table_name: &str) -> i64 {
        let counter = self.next_ids.entry(table_name.to_string()).or_insert(1);
        let id = *counter;
        *counter += 1;
        id
    }

    /// Number of ids handed out so far for a table
    pub fn issued_ids(&self, table_name: &str) -> i64 {
        self.next_ids.get(table_name).map(|n| n - 1).unwrap_or(0)
    }

    /// Append the enabled meta-columns to a definition, once per table.
    ///
    /// Returns `true` when columns were appended by this call.
    pub fn ensure_meta_columns(&mut self, table_name: &str, definition: &mut TableDefinition) -> bool {
        if !self.meta_applied.insert(table_name.to_string()) {
            return false;
        }

        if let Some(id) = &self.id_column {
            if !definition.declares(id) {
                definition.push_column(Column::new(id.as_str(), DataKind::Integer));
            }
            match definition.primary_key() {
                None => definition.push_constraint(Key::primary_key(id.as_str())),
                Some(declared) if declared != id => {
                    tracing::warn!(
                        "table {} declares primary key {}; {} stays a unique candidate key",
                        table_name,
                        declared,
                        id
                    );
                }
                Some(_) => {}
            }
        }

        if let (Some(id), Some(parent)) = (&self.id_column, &self.parent_column) {
            if let Some(parent_table) = naming::parent_table(table_name, &self.separator) {
                if !definition.declares(parent) {
                    definition.push_column(Column::with_foreign_key(
                        parent.as_str(),
                        DataKind::Integer,
                        parent_table,
                        id.as_str(),
                    ));
                }
            }
        }

        if let Some(text) = &self.text_column {
            if !definition.declares(text) {
                definition.push_column(Column::new(text.as_str(), DataKind::Text));
            }
        }

        tracing::debug!("meta-columns ensured for {}", table_name);
        true
    }

    pub fn has_meta_columns(&self, table_name: &str) -> bool {
        self.meta_applied.contains(table_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accumulator() -> SchemaAccumulator {
        SchemaAccumulator::new(&MappingConfig::default())
    }

    #[test]
    fn test_ids_start_at_one_per_table() {
        let mut acc = accumulator();
        assert_eq!(acc.next_id("A"), 1);
        assert_eq!(acc.next_id("B"), 1);
        assert_eq!(acc.next_id("A"), 2);
        assert_eq!(acc.next_id("A"), 3);
        assert_eq!(acc.next_id("B"), 2);
        assert_eq!(acc.issued_ids("A"), 3);
        assert_eq!(acc.issued_ids("C"), 0);
    }

    #[test]
    fn test_register_is_a_union() {
        let mut acc = accumulator();
        acc.register_attribute("A", "x").unwrap();
        acc.register_attribute("A", "y").unwrap();
        acc.register_attribute("A", "x").unwrap();
        assert_eq!(acc.columns("A"), &["x".to_string(), "y".to_string()]);
        assert!(acc.columns("missing").is_empty());
    }

    #[test]
    fn test_column_names_differing_by_case_collide() {
        let mut acc = accumulator();
        acc.register_attribute("A", "x").unwrap();
        acc.register_attribute("B", "X").unwrap();
        assert!(matches!(
            acc.register_attribute("A", "X"),
            Err(Error::NamingCollision { .. })
        ));
        assert_eq!(acc.columns("A"), &["x".to_string()]);
    }

    #[test]
    fn test_meta_columns_for_child_table() {
        let mut acc = accumulator();
        let mut definition = TableDefinition::new("Shop_Item");

        assert!(acc.ensure_meta_columns("Shop_Item", &mut definition));
        let names: Vec<_> = definition.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["_id", "_parentId", "_text"]);

        let fk = definition.column("_parentId").unwrap().foreign_key().unwrap();
        assert_eq!(fk.referenced_table, "Shop");
        assert_eq!(fk.referenced_column, "_id");
        assert_eq!(definition.primary_key(), Some("_id"));
    }

    #[test]
    fn test_meta_columns_for_root_table() {
        let mut acc = accumulator();
        let mut definition = TableDefinition::new("Shop");
        acc.ensure_meta_columns("Shop", &mut definition);
        assert!(!definition.declares("_parentId"));
        assert!(definition.declares("_id"));
    }

    #[test]
    fn test_meta_columns_are_idempotent() {
        let mut acc = accumulator();
        let mut definition = TableDefinition::new("Shop");
        assert!(acc.ensure_meta_columns("Shop", &mut definition));
        assert!(!acc.ensure_meta_columns("Shop", &mut definition));
        assert_eq!(definition.columns().len(), 2);
        assert_eq!(definition.constraints().len(), 1);
    }

    #[test]
    fn test_disabled_meta_columns() {
        let config = MappingConfig {
            id_column_name: None,
            parent_reference_column_name: None,
            text_column_name: None,
            ..MappingConfig::default()
        };
        let mut acc = SchemaAccumulator::new(&config);
        let mut definition = TableDefinition::new("Shop_Item");
        acc.ensure_meta_columns("Shop_Item", &mut definition);
        assert!(definition.columns().is_empty());
        assert!(definition.constraints().is_empty());
    }

    #[test]
    fn test_declared_primary_key_is_kept() {
        let mut acc = accumulator();
        let mut definition = TableDefinition::new("Tags")
            .with_column(Column::new("Id", DataKind::Integer))
            .with_key(Key::primary_key("Id"));
        acc.ensure_meta_columns("Tags", &mut definition);
        assert_eq!(definition.primary_key(), Some("Id"));
        assert_eq!(definition.constraints().len(), 1);
    }

    #[test]
    fn test_case_insensitive_collision() {
        let mut acc = accumulator();
        acc.claim_table("Item").unwrap();
        acc.claim_table("Item").unwrap();
        assert!(matches!(
            acc.claim_table("ITEM"),
            Err(Error::NamingCollision { .. })
        ));
    }
}
