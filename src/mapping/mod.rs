//! Mapping Layer - XML tree ↔ relational tables
//!
//! Forward: events → `ForwardConverter` → `Conversion` → `emit` → `Script`
//! Reverse: engine → `TableHierarchy` → `synchronize` → XML text

pub mod naming;
pub mod accumulator;
pub mod converter;
pub mod emitter;
pub mod synchronizer;

pub use accumulator::SchemaAccumulator;
pub use converter::{Conversion, ForwardConverter, StagedInsert};
pub use emitter::{emit, Script};
pub use synchronizer::{synchronize, TableHierarchy};

use crate::config::MappingConfig;
use crate::source::EventSource;
use crate::table::TableCatalog;
use crate::Result;

/// The top-level document element. It is not mapped to a table, only kept so
/// the reconstructed tree can be wrapped in it again.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

/// Convert a whole document into its load script
pub fn convert<S: EventSource>(
    source: &mut S,
    catalog: TableCatalog,
    config: &MappingConfig,
) -> Result<(Envelope, Script)> {
    let mut converter = ForwardConverter::new(config, catalog)?;
    let envelope = converter.convert(source)?;
    let conversion = converter.finish(envelope);
    let script = emit(
        config,
        &conversion.catalog,
        &conversion.accumulator,
        &conversion.staged,
    )?;
    Ok((conversion.envelope, script))
}
