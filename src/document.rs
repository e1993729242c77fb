//! XML document session
//!
//! Converts a document, loads it into a fresh SQLite engine, lets callers
//! query and modify the tables, and writes the tables back out as XML.

use crate::config::MappingConfig;
use crate::mapping::{self, synchronize, Envelope, TableHierarchy};
use crate::source::{EventSource, XmlEventReader};
use crate::storage::{QueryRows, RelationalEngine, SqliteStore};
use crate::table::{TableCatalog, TableDefinition};
use crate::{Error, Result};
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A document mapped onto relational tables
pub struct XmlDocument {
    store: SqliteStore,
    envelope: Envelope,
    config: MappingConfig,
    path: Option<PathBuf>,
}

impl XmlDocument {
    /// Open and load an XML file
    pub fn open(path: &Path, tables: Vec<TableDefinition>, config: MappingConfig) -> Result<Self> {
        let mut source = XmlEventReader::from_path(path)?;
        let mut document = Self::load(&mut source, tables, config)?;
        document.path = Some(path.to_path_buf());
        tracing::info!("opened {}", path.display());
        Ok(document)
    }

    pub fn from_reader<R: BufRead>(
        reader: R,
        tables: Vec<TableDefinition>,
        config: MappingConfig,
    ) -> Result<Self> {
        Self::load(&mut XmlEventReader::new(reader), tables, config)
    }

    pub fn from_xml(xml: &str, tables: Vec<TableDefinition>, config: MappingConfig) -> Result<Self> {
        Self::load(&mut XmlEventReader::from_xml(xml), tables, config)
    }

    /// The engine is only opened once the whole document converted cleanly
    fn load<S: EventSource>(
        source: &mut S,
        tables: Vec<TableDefinition>,
        config: MappingConfig,
    ) -> Result<Self> {
        let catalog = TableCatalog::from_definitions(tables)?;
        let (envelope, script) = mapping::convert(source, catalog, &config)?;

        let mut store = if config.use_in_memory_store {
            SqliteStore::open_in_memory()?
        } else {
            SqliteStore::open_temporary()?
        };
        store.load_script(&script)?;

        Ok(Self {
            store,
            envelope,
            config,
            path: None,
        })
    }

    /// Connection for statements beyond `query`/`execute`
    pub fn connection(&self) -> &rusqlite::Connection {
        self.store.connection()
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn query(&self, sql: &str) -> Result<QueryRows> {
        self.store.query(sql)
    }

    pub fn execute(&self, sql: &str) -> Result<()> {
        self.store.execute(sql)
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Source file, if the document was opened from one
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current table hierarchy as seen by the engine
    pub fn hierarchy(&self) -> Result<TableHierarchy> {
        TableHierarchy::discover(&self.store, &self.config)
    }

    pub fn write_xml<W: Write>(&self, out: &mut W) -> Result<()> {
        let hierarchy = self.hierarchy()?;
        synchronize(&self.store, &self.envelope, &hierarchy, &self.config, out)
    }

    pub fn to_xml_string(&self) -> Result<String> {
        let mut out = Vec::new();
        self.write_xml(&mut out)?;
        String::from_utf8(out).map_err(|e| Error::SourceParse(e.to_string()))
    }

    /// Write the tables back to the source file
    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.save_as(path),
            None => Err(Error::Config(
                "document was not opened from a file; use save_as".to_string(),
            )),
        }
    }

    /// Replace `path` with the reconstructed document
    pub fn save_as(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let file = tempfile::NamedTempFile::new_in(dir)?;
        let mut out = BufWriter::new(file);
        self.write_xml(&mut out)?;
        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.persist(path).map_err(|e| e.error)?;

        tracing::info!("saved {}", path.display());
        Ok(())
    }

    /// End the session, saving first when `persist_changes` is set
    pub fn close(self) -> Result<()> {
        if self.config.persist_changes {
            self.save()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{Column, DataKind};
    use crate::storage::CellValue;
    use std::fs;
    use tempfile::TempDir;

    const SIMPLE: &str = r#"
<XML>
    <RootTable first="1" second="2">
        <Child>Hello</Child>
        <Child third="3"></Child>
    </RootTable>
    <RootTable />
    <RootTableSecond>Hi</RootTableSecond>
</XML>"#;

    fn in_memory() -> MappingConfig {
        MappingConfig::in_memory()
    }

    #[test]
    fn test_declared_integer_column_is_numeric() {
        let tables = vec![TableDefinition::new("RootTable")
            .with_column(Column::new("first", DataKind::Integer))];
        let doc = XmlDocument::from_xml(SIMPLE, tables, in_memory()).unwrap();

        let rows = doc
            .query("SELECT first, second FROM RootTable WHERE _id = 1")
            .unwrap();
        assert_eq!(
            rows.rows[0],
            vec![CellValue::Integer(1), CellValue::Text("2".into())]
        );
    }

    #[test]
    fn test_example_document_rows() {
        let doc = XmlDocument::from_xml(
            "<XML><RootTable first=\"1\"/><RootTable/><RootTableSecond/></XML>",
            vec![],
            in_memory(),
        )
        .unwrap();

        let rows = doc.query("SELECT _id, first FROM RootTable ORDER BY _id").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.rows[0], vec![CellValue::Integer(1), CellValue::Text("1".into())]);
        assert_eq!(rows.rows[1], vec![CellValue::Integer(2), CellValue::Null]);

        let second = doc.query("SELECT _id FROM RootTableSecond").unwrap();
        assert_eq!(second.rows, vec![vec![CellValue::Integer(1)]]);

        let names: Vec<_> = doc.hierarchy().unwrap().iter().map(|t| t.name.clone()).collect();
        assert!(!names.iter().any(|n| n == "RootTable_Child"));
    }

    #[test]
    fn test_child_rows_join_parents() {
        let doc = XmlDocument::from_xml(SIMPLE, vec![], in_memory()).unwrap();
        let rows = doc
            .query(
                "SELECT c._text FROM RootTable_Child c \
                 JOIN RootTable r ON c._parentId = r._id \
                 WHERE r.first = '1' ORDER BY c._id",
            )
            .unwrap();
        assert_eq!(
            rows.rows,
            vec![vec![CellValue::Text("Hello".into())], vec![CellValue::Null]]
        );
    }

    #[test]
    fn test_modifications_are_written_back() {
        let doc = XmlDocument::from_xml(SIMPLE, vec![], in_memory()).unwrap();
        doc.execute("UPDATE RootTableSecond SET _text = 'Bye'").unwrap();
        doc.execute("INSERT INTO RootTable_Child (_parentId, third) VALUES (2, 'new')")
            .unwrap();

        let xml = doc.to_xml_string().unwrap();
        assert!(xml.contains("<RootTableSecond>Bye</RootTableSecond>"));
        assert!(xml.contains("<Child third=\"new\"/>"));
    }

    #[test]
    fn test_tags_starting_with_sqlite_are_written_back() {
        let doc = XmlDocument::from_xml(
            r#"<XML><SqliteInfo a="1"/><Other b="2"/></XML>"#,
            vec![],
            in_memory(),
        )
        .unwrap();
        assert_eq!(
            doc.to_xml_string().unwrap(),
            "<XML>\n  <SqliteInfo a=\"1\"/>\n  <Other b=\"2\"/>\n</XML>\n"
        );
    }

    #[test]
    fn test_attribute_whitespace_survives_save() {
        let doc = XmlDocument::from_xml(
            r#"<XML><A v="line1&#10;line2&#9;end"/></XML>"#,
            vec![],
            in_memory(),
        )
        .unwrap();
        let xml = doc.to_xml_string().unwrap();
        assert!(xml.contains(r#"<A v="line1&#10;line2&#9;end"/>"#));

        let again = XmlDocument::from_xml(&xml, vec![], in_memory()).unwrap();
        let rows = again.query("SELECT v FROM A").unwrap();
        assert_eq!(rows.rows[0][0], CellValue::Text("line1\nline2\tend".into()));
    }

    #[test]
    fn test_failed_conversion_loads_nothing() {
        let result = XmlDocument::from_xml("<XML><A></XML>", vec![], in_memory());
        assert!(matches!(result, Err(Error::SourceParse(_))));
    }

    #[test]
    fn test_save_without_source_fails() {
        let doc = XmlDocument::from_xml("<XML/>", vec![], in_memory()).unwrap();
        assert!(matches!(doc.save(), Err(Error::Config(_))));
    }

    #[test]
    fn test_file_backed_store_by_default() {
        let doc = XmlDocument::from_xml("<XML><A/></XML>", vec![], MappingConfig::default()).unwrap();
        assert!(doc.store().path().is_some());
    }

    #[test]
    fn test_close_persists_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.xml");
        fs::write(&path, SIMPLE).unwrap();

        let config = MappingConfig {
            persist_changes: true,
            ..in_memory()
        };
        let doc = XmlDocument::open(&path, vec![], config.clone()).unwrap();
        doc.execute("DELETE FROM RootTable_Child WHERE third = '3'").unwrap();
        doc.close().unwrap();

        let reopened = XmlDocument::open(&path, vec![], config).unwrap();
        let rows = reopened.query("SELECT COUNT(*) FROM RootTable_Child").unwrap();
        assert_eq!(rows.rows[0][0], CellValue::Integer(1));
        let text = reopened
            .query("SELECT _text FROM RootTable_Child")
            .unwrap();
        assert_eq!(text.rows[0][0], CellValue::Text("Hello".into()));
    }

    #[test]
    fn test_close_without_persist_keeps_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.xml");
        fs::write(&path, SIMPLE).unwrap();

        let doc = XmlDocument::open(&path, vec![], in_memory()).unwrap();
        doc.execute("DELETE FROM RootTable_Child").unwrap();
        doc.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), SIMPLE);
    }

    #[test]
    fn test_save_as_writes_new_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.xml");
        let doc = XmlDocument::from_xml(SIMPLE, vec![], in_memory()).unwrap();
        doc.save_as(&target).unwrap();

        let again = XmlDocument::open(&target, vec![], in_memory()).unwrap();
        assert_eq!(again.envelope().tag, "XML");
        let rows = again.query("SELECT COUNT(*) FROM RootTable").unwrap();
        assert_eq!(rows.rows[0][0], CellValue::Integer(2));
    }
}
