//! Forward conversion - walks the document once and stages every row
//!
//! The top-level element is the document envelope and is not mapped; each of
//! its children starts a root table. Every other element becomes one staged
//! insert into the table named after its ancestor path.
//!
//! Nothing is written to the engine here: the full column set of a table is
//! only known once the whole document has been read.

use super::accumulator::SchemaAccumulator;
use super::emitter;
use super::naming;
use super::Envelope;
use crate::column::Column;
use crate::config::MappingConfig;
use crate::source::{Element, EventKind, EventSource};
use crate::table::TableCatalog;
use crate::{Error, Result};

/// A row waiting for its table to be created.
///
/// Values are SQL literals, already quoted and escaped for their column kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedInsert {
    pub table: String,
    pub values: Vec<(String, String)>,
}

impl StagedInsert {
    /// Literal staged for a column, if the element had it
    pub fn value(&self, column: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, literal)| literal.as_str())
    }
}

/// Everything the emitter needs once the walk is over
#[derive(Debug)]
pub struct Conversion {
    pub envelope: Envelope,
    pub catalog: TableCatalog,
    pub accumulator: SchemaAccumulator,
    pub staged: Vec<StagedInsert>,
}

/// Streaming depth-first converter from element events to staged rows.
pub struct ForwardConverter {
    config: MappingConfig,
    catalog: TableCatalog,
    accumulator: SchemaAccumulator,
    staged: Vec<StagedInsert>,
}

impl ForwardConverter {
    /// Create a converter over caller-declared tables
    pub fn new(config: &MappingConfig, catalog: TableCatalog) -> Result<Self> {
        config.validate()?;
        let mut accumulator = SchemaAccumulator::new(config);
        for definition in catalog.iter() {
            accumulator.claim_table(definition.name())?;
            for column in definition.columns() {
                match config.meta_column(column.name()) {
                    Some(meta) if meta != column.name() => {
                        return Err(Error::NamingCollision {
                            name: format!("{}.{}", definition.name(), column.name()),
                            detail: format!("collides with meta-column {}", meta),
                        })
                    }
                    _ => {}
                }
            }
        }

        Ok(Self {
            config: config.clone(),
            catalog,
            accumulator,
            staged: Vec::new(),
        })
    }

    /// Walk a whole document, returning the unmapped envelope element
    pub fn convert<S: EventSource>(&mut self, source: &mut S) -> Result<Envelope> {
        let root = match source.next_event()? {
            Some((EventKind::Start, root)) => root,
            Some((EventKind::End, element)) => {
                return Err(Error::SourceParse(format!(
                    "document starts with closing tag </{}>",
                    element.tag
                )))
            }
            None => return Err(Error::SourceParse("document has no root element".to_string())),
        };

        self.walk_children(source, &root.tag, "", None)?;

        if let Some((_, element)) = source.next_event()? {
            return Err(Error::SourceParse(format!(
                "unexpected <{}> after the root element",
                element.tag
            )));
        }

        tracing::info!(
            "converted <{}>: {} rows staged across {} tables",
            root.tag,
            self.staged.len(),
            self.catalog.len()
        );

        Ok(Envelope {
            tag: root.tag,
            attributes: root.attributes,
        })
    }

    /// Consume child events until the end tag of the element being walked
    fn walk_children<S: EventSource>(
        &mut self,
        source: &mut S,
        tag: &str,
        scope: &str,
        parent_id: Option<i64>,
    ) -> Result<()> {
        loop {
            match source.next_event()? {
                Some((EventKind::End, element)) if element.tag == tag => return Ok(()),
                Some((EventKind::End, element)) => {
                    return Err(Error::SourceParse(format!(
                        "unexpected </{}> inside <{}>",
                        element.tag, tag
                    )))
                }
                Some((EventKind::Start, child)) => {
                    self.map_element(source, child, scope, parent_id)?
                }
                None => {
                    return Err(Error::SourceParse(format!(
                        "document ended inside <{}>",
                        tag
                    )))
                }
            }
        }
    }

    fn map_element<S: EventSource>(
        &mut self,
        source: &mut S,
        element: Element,
        scope: &str,
        parent_id: Option<i64>,
    ) -> Result<()> {
        let Element {
            tag,
            attributes,
            text,
        } = element;

        let table_name = naming::table_name(scope, &tag, &self.config.separator)?;
        self.accumulator.claim_table(&table_name)?;

        if let Some((name, _)) = attributes
            .iter()
            .find(|(name, _)| self.config.is_meta_column(name))
        {
            return Err(Error::ReservedColumn {
                table: table_name,
                column: name.clone(),
            });
        }

        let id = self.accumulator.next_id(&table_name);
        let mut row = attributes;
        if let Some(column) = self.config.id_column() {
            row.push((column.to_string(), id.to_string()));
        }
        if let (Some(column), Some(parent_id)) = (self.config.parent_column(), parent_id) {
            row.push((column.to_string(), parent_id.to_string()));
        }
        if let (Some(column), Some(text)) = (self.config.text_column(), text) {
            row.push((column.to_string(), text));
        }

        let definition = self.catalog.get_or_insert(&table_name);
        self.accumulator.ensure_meta_columns(&table_name, definition);

        let mut values = Vec::with_capacity(row.len());
        for (column, value) in &row {
            let declared = definition
                .columns()
                .iter()
                .find(|c| c.name().eq_ignore_ascii_case(column));
            if let Some(declared) = declared.filter(|c| c.name() != column.as_str()) {
                return Err(Error::NamingCollision {
                    name: format!("{}.{}", table_name, column),
                    detail: format!("collides with declared column {}", declared.name()),
                });
            }
            let kind = declared.map(Column::kind).unwrap_or_default();
            let literal = emitter::sql_literal(kind, value).ok_or_else(|| Error::InvalidLiteral {
                table: table_name.clone(),
                column: column.clone(),
                value: value.clone(),
            })?;
            values.push((column.clone(), literal));
        }

        for (column, _) in &row {
            self.accumulator.register_attribute(&table_name, column)?;
        }
        self.staged.push(StagedInsert {
            table: table_name.clone(),
            values,
        });

        // Only the open ancestor chain stays in memory while children stream by
        drop(row);
        self.walk_children(source, &tag, &table_name, Some(id))
    }

    /// Close the walk: declared tables that never matched an element still get
    /// their meta-columns so they can be created.
    pub fn finish(mut self, envelope: Envelope) -> Conversion {
        let names: Vec<String> = self.catalog.names().map(str::to_string).collect();
        for name in names {
            if let Some(definition) = self.catalog.get_mut(&name) {
                self.accumulator.ensure_meta_columns(&name, definition);
            }
        }

        Conversion {
            envelope,
            catalog: self.catalog,
            accumulator: self.accumulator,
            staged: self.staged,
        }
    }
}
