//! DDL/DML emission - turns the accumulated schema and staged rows into a script
//!
//! Statement order is fixed:
//! 1. `CREATE TABLE` for every table, in discovery order
//! 2. `INSERT` for every staged row, in staging order
//! 3. `CREATE [UNIQUE] INDEX` for every declared index
//!
//! Foreign keys are declared `DEFERRABLE INITIALLY DEFERRED` because discovery
//! order is not a parent-before-child order in general.

use super::accumulator::SchemaAccumulator;
use super::converter::StagedInsert;
use crate::column::{Column, DataKind, ForeignKey};
use crate::config::MappingConfig;
use crate::key::Key;
use crate::table::{TableCatalog, TableDefinition};
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::fmt;

/// A complete load script, split by phase.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Script {
    create_tables: Vec<String>,
    inserts: Vec<String>,
    create_indexes: Vec<String>,
}

impl Script {
    /// All statements in execution order, without trailing semicolons
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.create_tables
            .iter()
            .chain(&self.inserts)
            .chain(&self.create_indexes)
            .map(String::as_str)
    }

    pub fn create_tables(&self) -> &[String] {
        &self.create_tables
    }

    pub fn inserts(&self) -> &[String] {
        &self.inserts
    }

    pub fn create_indexes(&self) -> &[String] {
        &self.create_indexes
    }

    pub fn len(&self) -> usize {
        self.create_tables.len() + self.inserts.len() + self.create_indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in self.statements() {
            writeln!(f, "{};", statement)?;
        }
        Ok(())
    }
}

/// Build the load script. Fails before producing anything if any table
/// resolves to zero columns or a key names a column the table lacks.
pub fn emit(
    config: &MappingConfig,
    catalog: &TableCatalog,
    accumulator: &SchemaAccumulator,
    staged: &[StagedInsert],
) -> Result<Script> {
    let mut script = Script::default();

    for definition in catalog.iter() {
        let columns = resolve_columns(config, definition, accumulator)?;
        script.create_tables.push(create_table(definition.name(), &columns));

        for key in definition.constraints() {
            let (columns_set, unique) = match key {
                Key::Index { columns } => (columns, false),
                Key::UniqueIndex { columns } => (columns, true),
                Key::PrimaryKey { .. } | Key::ForeignKey(_) => continue,
            };
            for column in columns_set {
                if !columns.iter().any(|c| &c.name == column) {
                    return Err(Error::ColumnNotFound {
                        table: definition.name().to_string(),
                        column: column.clone(),
                    });
                }
            }
            let ordinal = script.create_indexes.len() + 1;
            script
                .create_indexes
                .push(create_index(definition.name(), columns_set, unique, ordinal));
        }
        tracing::debug!("table {} resolved to {} columns", definition.name(), columns.len());
    }

    script.inserts = staged.iter().map(insert).collect();

    tracing::info!(
        "emitted {} tables, {} rows, {} indexes",
        script.create_tables.len(),
        script.inserts.len(),
        script.create_indexes.len()
    );
    Ok(script)
}

/// Column as it appears in a `CREATE TABLE` statement
#[derive(Debug)]
struct ColumnSpec {
    name: String,
    kind: DataKind,
    primary_key: bool,
    unique: bool,
    references: Option<ForeignKey>,
}

impl From<&Column> for ColumnSpec {
    fn from(column: &Column) -> Self {
        Self {
            name: column.name().to_string(),
            kind: column.kind(),
            primary_key: false,
            unique: false,
            references: column.foreign_key().cloned(),
        }
    }
}

impl ColumnSpec {
    fn render(&self) -> String {
        let mut sql = format!("{} {}", quote_identifier(&self.name), self.kind.as_sql());
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(fk) = &self.references {
            sql.push_str(&format!(
                " REFERENCES {} ({}) DEFERRABLE INITIALLY DEFERRED",
                quote_identifier(&fk.referenced_table),
                quote_identifier(&fk.referenced_column)
            ));
        }
        sql
    }
}

/// Declared columns in declaration order, then inferred ones as text
fn resolve_columns(
    config: &MappingConfig,
    definition: &TableDefinition,
    accumulator: &SchemaAccumulator,
) -> Result<Vec<ColumnSpec>> {
    let table = definition.name();
    let mut columns: Vec<ColumnSpec> = definition.columns().iter().map(ColumnSpec::from).collect();

    for name in accumulator.columns(table) {
        if !columns.iter().any(|c| &c.name == name) {
            columns.push(ColumnSpec::from(&Column::inferred(name.as_str())));
        }
    }

    if columns.is_empty() {
        return Err(Error::SchemaResolution {
            table: table.to_string(),
        });
    }

    let mut primary: Option<&str> = None;
    for key in definition.constraints() {
        match key {
            Key::PrimaryKey { column } => {
                if let Some(previous) = primary.replace(column) {
                    return Err(Error::Config(format!(
                        "table {} declares primary keys on both {} and {}",
                        table, previous, column
                    )));
                }
                column_mut(&mut columns, table, column)?.primary_key = true;
            }
            Key::ForeignKey(fk) => {
                column_mut(&mut columns, table, &fk.local_column)?.references = Some(fk.clone());
            }
            Key::Index { .. } | Key::UniqueIndex { .. } => {}
        }
    }

    // A displaced synthetic id must stay a valid reference target
    if let (Some(id), Some(primary)) = (config.id_column(), primary) {
        if primary != id {
            if let Some(spec) = columns.iter_mut().find(|c| c.name == id) {
                spec.unique = true;
            }
        }
    }

    Ok(columns)
}

fn column_mut<'a>(columns: &'a mut [ColumnSpec], table: &str, name: &str) -> Result<&'a mut ColumnSpec> {
    columns
        .iter_mut()
        .find(|c| c.name == name)
        .ok_or_else(|| Error::ColumnNotFound {
            table: table.to_string(),
            column: name.to_string(),
        })
}

fn create_table(table: &str, columns: &[ColumnSpec]) -> String {
    let columns: Vec<String> = columns.iter().map(ColumnSpec::render).collect();
    format!("CREATE TABLE {} ({})", quote_identifier(table), columns.join(", "))
}

/// Index names derive from the table and the sorted column names
/// Index names end in the script-wide ordinal, so table and column names that
/// join to the same text still get distinct indexes
pub fn index_name(table: &str, columns: &BTreeSet<String>, ordinal: usize) -> String {
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    format!("idx_{}_{}_{}", table, columns.join("_"), ordinal)
}

fn create_index(table: &str, columns: &BTreeSet<String>, unique: bool, ordinal: usize) -> String {
    let quoted: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if unique { "UNIQUE " } else { "" },
        quote_identifier(&index_name(table, columns, ordinal)),
        quote_identifier(table),
        quoted.join(", ")
    )
}

fn insert(staged: &StagedInsert) -> String {
    if staged.values.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", quote_identifier(&staged.table));
    }
    let (columns, values): (Vec<String>, Vec<&str>) = staged
        .values
        .iter()
        .map(|(column, literal)| (quote_identifier(column), literal.as_str()))
        .unzip();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(&staged.table),
        columns.join(", "),
        values.join(", ")
    )
}

pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-line quoted literal: quotes doubled, line breaks spliced in with `char()`
pub(crate) fn text_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => literal.push_str("''"),
            '\n' => literal.push_str("' || char(10) || '"),
            '\r' => literal.push_str("' || char(13) || '"),
            _ => literal.push(ch),
        }
    }
    literal.push('\'');
    literal
}

/// Literal for `value` in a column of `kind`.
///
/// Numeric kinds take the raw value only when it is a finite number; an empty
/// value becomes NULL. `None` means the value cannot be stored as that kind.
pub(crate) fn sql_literal(kind: DataKind, value: &str) -> Option<String> {
    if kind.is_textual() {
        return Some(text_literal(value));
    }
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some("NULL".to_string());
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(trimmed.to_string()),
        _ => None,
    }
}
