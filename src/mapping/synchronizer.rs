//! Reverse synchronization - rebuilds the XML tree from the loaded tables
//!
//! The hierarchy comes from the live engine schema, not from declarations:
//! a table is a child when it has the parent-reference column, and its parent
//! is the prefix of its name before the last separator.

use super::naming;
use super::Envelope;
use crate::config::MappingConfig;
use crate::storage::{CellValue, QueryRows, RelationalEngine};
use crate::Result;
use quick_xml::escape::{escape, partial_escape};
use std::io::Write;

/// One engine table and its place in the hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyTable {
    pub name: String,
    /// Element tag the rows are written as
    pub tag: String,
    pub columns: Vec<String>,
    pub parent: Option<String>,
}

/// Tables of a loaded document, in creation order.
#[derive(Debug, Clone, Default)]
pub struct TableHierarchy {
    tables: Vec<HierarchyTable>,
}

impl TableHierarchy {
    /// Classify every engine table as root or child
    pub fn discover<E: RelationalEngine + ?Sized>(engine: &E, config: &MappingConfig) -> Result<Self> {
        let names = engine.table_names()?;
        let mut tables = Vec::with_capacity(names.len());

        for name in &names {
            let columns = engine.column_names(name)?;
            let linked = config
                .parent_column()
                .is_some_and(|parent| columns.iter().any(|c| c == parent));

            let parent = if linked {
                match naming::parent_table(name, &config.separator) {
                    Some(parent) if names.iter().any(|n| n == parent) => Some(parent.to_string()),
                    _ => {
                        tracing::warn!("table {} has no parent table; treating it as a root", name);
                        None
                    }
                }
            } else {
                None
            };

            let tag = match parent {
                Some(_) => naming::tag_of(name, &config.separator).to_string(),
                None => name.clone(),
            };
            tables.push(HierarchyTable {
                name: name.clone(),
                tag,
                columns,
                parent,
            });
        }

        tracing::debug!("discovered {} tables", tables.len());
        Ok(Self { tables })
    }

    pub fn get(&self, name: &str) -> Option<&HierarchyTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HierarchyTable> {
        self.tables.iter()
    }

    pub fn roots(&self) -> impl Iterator<Item = &HierarchyTable> {
        self.tables.iter().filter(|t| t.parent.is_none())
    }

    pub fn children_of<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a HierarchyTable> {
        self.tables
            .iter()
            .filter(move |t| t.parent.as_deref() == Some(table))
    }

    /// Number of ancestors of a table; roots are at depth 0
    pub fn depth(&self, table: &str) -> usize {
        let mut depth = 0;
        let mut current = self.get(table).and_then(|t| t.parent.as_deref());
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent).and_then(|t| t.parent.as_deref());
        }
        depth
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Write the reconstructed document wrapped in its envelope
pub fn synchronize<E, W>(
    engine: &E,
    envelope: &Envelope,
    hierarchy: &TableHierarchy,
    config: &MappingConfig,
    out: &mut W,
) -> Result<()>
where
    E: RelationalEngine + ?Sized,
    W: Write,
{
    let mut writer = TreeWriter {
        engine,
        hierarchy,
        config,
        out,
    };

    write!(writer.out, "<{}", envelope.tag)?;
    for (name, value) in &envelope.attributes {
        write!(writer.out, " {}=\"{}\"", name, escape_attribute(value))?;
    }

    let mut elements = 0;
    for root in hierarchy.roots() {
        let rows = writer.rows_of(root, None)?;
        for row in 0..rows.len() {
            if elements == 0 {
                write!(writer.out, ">")?;
            }
            writer.write_element(root, &rows, row, 1)?;
            elements += 1;
        }
    }

    if elements == 0 {
        writeln!(writer.out, "/>")?;
    } else {
        writeln!(writer.out, "\n</{}>", envelope.tag)?;
    }
    tracing::info!("synchronized {} top-level elements into <{}>", elements, envelope.tag);
    Ok(())
}

struct TreeWriter<'a, E: ?Sized, W> {
    engine: &'a E,
    hierarchy: &'a TableHierarchy,
    config: &'a MappingConfig,
    out: &'a mut W,
}

impl<'a, E: RelationalEngine + ?Sized, W: Write> TreeWriter<'a, E, W> {
    fn rows_of(&self, table: &HierarchyTable, parent_id: Option<i64>) -> Result<QueryRows> {
        let filter = match (self.config.parent_column(), parent_id) {
            (Some(column), Some(id)) => Some((column, id)),
            _ => None,
        };
        let order_by = self
            .config
            .id_column()
            .filter(|id| table.columns.iter().any(|c| c == id));
        self.engine.fetch_rows(&table.name, filter, order_by)
    }

    /// Elements open lazily: the start tag stays unterminated until text or a
    /// child row shows up, and self-closes if neither does.
    fn write_element(
        &mut self,
        table: &HierarchyTable,
        rows: &QueryRows,
        row: usize,
        depth: usize,
    ) -> Result<()> {
        let indent = self.config.indent_unit.repeat(depth);
        let cells = &rows.rows[row];

        write!(self.out, "\n{}<{}", indent, table.tag)?;
        for (column, cell) in rows.columns.iter().zip(cells) {
            if self.config.is_meta_column(column) {
                continue;
            }
            if let Some(value) = cell.as_text() {
                write!(self.out, " {}=\"{}\"", column, escape_attribute(&value))?;
            }
        }

        let mut open = false;
        let text = self
            .config
            .text_column()
            .and_then(|column| rows.get(row, column))
            .and_then(CellValue::as_text);
        if let Some(text) = text {
            write!(self.out, ">{}", escape_text(&text))?;
            open = true;
        }

        let mut has_children = false;
        let id = self
            .config
            .id_column()
            .and_then(|column| rows.get(row, column))
            .and_then(CellValue::as_integer);
        if let (Some(id), Some(_)) = (id, self.config.parent_column()) {
            let hierarchy = self.hierarchy;
            for child in hierarchy.children_of(&table.name) {
                let child_rows = self.rows_of(child, Some(id))?;
                if child_rows.is_empty() {
                    continue;
                }
                if !open {
                    write!(self.out, ">")?;
                    open = true;
                }
                has_children = true;
                for child_row in 0..child_rows.len() {
                    self.write_element(child, &child_rows, child_row, depth + 1)?;
                }
            }
        }

        if has_children {
            write!(self.out, "\n{}</{}>", indent, table.tag)?;
        } else if open {
            write!(self.out, "</{}>", table.tag)?;
        } else {
            write!(self.out, "/>")?;
        }
        Ok(())
    }
}

/// Attribute values keep tabs and line breaks as character references;
/// parsers would normalize raw ones to spaces
fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in escape(value).chars() {
        match c {
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Carriage returns in character data would be folded into line feeds
fn escape_text(text: &str) -> String {
    partial_escape(text).replace('\r', "&#13;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{Column, DataKind};
    use crate::mapping;
    use crate::source::{EventKind, EventSource, XmlEventReader};
    use crate::storage::SqliteStore;
    use crate::table::{TableCatalog, TableDefinition};

    const SIMPLE: &str = r#"
<XML>
    <RootTable first="1" second="2">
        <Child>Hello</Child>
        <Child third="3"></Child>
    </RootTable>
    <RootTable />
    <RootTableSecond>Hi</RootTableSecond>
</XML>"#;

    #[derive(Debug)]
    struct Node {
        tag: String,
        attributes: Vec<(String, String)>,
        text: Option<String>,
        children: Vec<Node>,
    }

    fn parse(xml: &str) -> Node {
        let mut reader = XmlEventReader::from_xml(xml);
        let mut stack: Vec<Node> = Vec::new();
        while let Some((kind, element)) = reader.next_event().unwrap() {
            match kind {
                EventKind::Start => stack.push(Node {
                    tag: element.tag,
                    attributes: element.attributes,
                    text: element.text,
                    children: Vec::new(),
                }),
                EventKind::End => {
                    let node = stack.pop().unwrap();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => return node,
                    }
                }
            }
        }
        panic!("unterminated document");
    }

    fn load(xml: &str, config: &MappingConfig, tables: Vec<TableDefinition>) -> (SqliteStore, Envelope) {
        let catalog = TableCatalog::from_definitions(tables).unwrap();
        let (envelope, script) =
            mapping::convert(&mut XmlEventReader::from_xml(xml), catalog, config).unwrap();
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.load_script(&script).unwrap();
        (store, envelope)
    }

    fn write_back(store: &SqliteStore, envelope: &Envelope, config: &MappingConfig) -> String {
        let hierarchy = TableHierarchy::discover(store, config).unwrap();
        let mut out = Vec::new();
        synchronize(store, envelope, &hierarchy, config, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn round_trip(xml: &str, config: &MappingConfig) -> String {
        let (store, envelope) = load(xml, config, vec![]);
        write_back(&store, &envelope, config)
    }

    fn attr(name: &str, value: &str) -> (String, String) {
        (name.to_string(), value.to_string())
    }

    #[test]
    fn test_preserves_structure() {
        let root = parse(&round_trip(SIMPLE, &MappingConfig::default()));
        assert_eq!(root.tag, "XML");
        assert!(root.attributes.is_empty());

        let tags: Vec<_> = root.children.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(tags, vec!["RootTable", "RootTable", "RootTableSecond"]);

        let first = &root.children[0];
        assert_eq!(first.attributes, vec![attr("first", "1"), attr("second", "2")]);
        assert_eq!(first.children.len(), 2);

        let hello = &first.children[0];
        assert_eq!(hello.tag, "Child");
        assert!(hello.attributes.is_empty());
        assert_eq!(hello.text.as_deref(), Some("Hello"));
        assert!(hello.children.is_empty());

        let third = &first.children[1];
        assert_eq!(third.attributes, vec![attr("third", "3")]);
        assert_eq!(third.text, None);

        let second = &root.children[1];
        assert!(second.children.is_empty());
        assert!(second.attributes.is_empty());

        let hi = &root.children[2];
        assert!(hi.children.is_empty());
        assert_eq!(hi.text.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_output_layout() {
        let xml = r#"<XML v="1"><A x="1"><B>t</B><B/></A><C/></XML>"#;
        assert_eq!(
            round_trip(xml, &MappingConfig::default()),
            "<XML v=\"1\">\n  <A x=\"1\">\n    <B>t</B>\n    <B/>\n  </A>\n  <C/>\n</XML>\n"
        );
    }

    #[test]
    fn test_custom_indent_unit() {
        let config = MappingConfig {
            indent_unit: "\t".to_string(),
            ..MappingConfig::default()
        };
        assert_eq!(
            round_trip("<XML><A><B/></A></XML>", &config),
            "<XML>\n\t<A>\n\t\t<B/>\n\t</A>\n</XML>\n"
        );
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(round_trip("<XML/>", &MappingConfig::default()), "<XML/>\n");
    }

    #[test]
    fn test_double_quote_serialized_as_entity() {
        let out = round_trip(r#"<XML><A v='say "hi"'/></XML>"#, &MappingConfig::default());
        assert!(out.contains(r#"<A v="say &quot;hi&quot;"/>"#));
        let root = parse(&out);
        assert_eq!(root.children[0].attributes, vec![attr("v", "say \"hi\"")]);
    }

    #[test]
    fn test_attribute_line_breaks_serialized_as_references() {
        let xml = r#"<XML note="a&#9;b"><A v="line1&#10;line2&#13;"/></XML>"#;
        let out = round_trip(xml, &MappingConfig::default());
        assert!(out.starts_with(r#"<XML note="a&#9;b">"#));
        assert!(out.contains(r#"<A v="line1&#10;line2&#13;"/>"#));

        let root = parse(&out);
        assert_eq!(root.attributes, vec![attr("note", "a\tb")]);
        assert_eq!(root.children[0].attributes, vec![attr("v", "line1\nline2\r")]);
    }

    #[test]
    fn test_text_restored_as_character_data() {
        let xml = "<XML><Note kind=\"memo\">a &amp; b &lt;c&gt;\nit's</Note></XML>";
        let out = round_trip(xml, &MappingConfig::default());
        assert!(out.contains("<Note kind=\"memo\">a &amp; b &lt;c&gt;\nit's</Note>"));

        let note = &parse(&out).children[0];
        assert_eq!(note.text.as_deref(), Some("a & b <c>\nit's"));
        assert!(note.attributes.iter().all(|(name, _)| name != "_text"));
    }

    #[test]
    fn test_deep_nesting_round_trip() {
        let xml = "<XML><p1><p2><p3 leaf=\"y\"/></p2></p1><p1><p2/></p1></XML>";
        let root = parse(&round_trip(xml, &MappingConfig::default()));
        assert_eq!(root.children.len(), 2);
        let leaf = &root.children[0].children[0].children[0];
        assert_eq!(leaf.tag, "p3");
        assert_eq!(leaf.attributes, vec![attr("leaf", "y")]);
        assert!(root.children[1].children[0].children.is_empty());
    }

    #[test]
    fn test_sibling_order_follows_ids() {
        let xml = "<XML><L><I n=\"a\"/><I n=\"b\"/><I n=\"c\"/></L></XML>";
        let root = parse(&round_trip(xml, &MappingConfig::default()));
        let names: Vec<_> = root.children[0]
            .children
            .iter()
            .map(|c| c.attributes[0].1.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_declared_columns_read_back() {
        let tables = vec![TableDefinition::new("RootTable")
            .with_column(Column::new("first", DataKind::Integer))];
        let (store, envelope) = load(SIMPLE, &MappingConfig::default(), tables);
        let root = parse(&write_back(&store, &envelope, &MappingConfig::default()));
        assert_eq!(
            root.children[0].attributes,
            vec![attr("first", "1"), attr("second", "2")]
        );
    }

    #[test]
    fn test_hierarchy_classification() {
        let (store, _) = load(SIMPLE, &MappingConfig::default(), vec![]);
        let hierarchy = TableHierarchy::discover(&store, &MappingConfig::default()).unwrap();

        let roots: Vec<_> = hierarchy.roots().map(|t| t.name.as_str()).collect();
        assert_eq!(roots, vec!["RootTable", "RootTableSecond"]);

        let children: Vec<_> = hierarchy.children_of("RootTable").collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "RootTable_Child");
        assert_eq!(children[0].tag, "Child");
        assert_eq!(hierarchy.depth("RootTable_Child"), 1);
        assert_eq!(hierarchy.depth("RootTable"), 0);
    }

    #[test]
    fn test_without_parent_references_every_table_is_a_root() {
        let config = MappingConfig {
            parent_reference_column_name: None,
            ..MappingConfig::default()
        };
        let (store, _) = load("<XML><A><B/></A></XML>", &config, vec![]);
        let hierarchy = TableHierarchy::discover(&store, &config).unwrap();
        let roots: Vec<_> = hierarchy.roots().map(|t| t.tag.as_str()).collect();
        assert_eq!(roots, vec!["A", "A_B"]);
    }

    #[test]
    fn test_element_without_child_rows_self_closes() {
        let (store, envelope) = load(SIMPLE, &MappingConfig::default(), vec![]);
        store.execute("DELETE FROM RootTable_Child").unwrap();
        let out = write_back(&store, &envelope, &MappingConfig::default());
        assert!(out.contains("<RootTable first=\"1\" second=\"2\"/>"));
    }
}
