use crate::config::MappingConfig;
use crate::mapping::TableHierarchy;
use crate::storage::QueryRows;
use crate::ui::theme;
use owo_colors::OwoColorize;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

/// Render a result set; NULL cells are shown dimmed
pub fn rows_table(rows: &QueryRows) -> String {
    if rows.columns.is_empty() {
        return String::new();
    }

    let mut builder = Builder::default();
    builder.push_record(rows.columns.iter().map(|c| c.style(theme().header.clone()).to_string()));
    for row in &rows.rows {
        builder.push_record(row.iter().map(|cell| match cell.as_text() {
            Some(text) => text,
            None => "NULL".style(theme().muted.clone()).to_string(),
        }));
    }

    builder.build().with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct HierarchyRow {
    #[tabled(rename = "Table")]
    table: String,
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Parent")]
    parent: String,
    #[tabled(rename = "Columns")]
    columns: String,
}

/// Render the table hierarchy, meta-columns styled apart from attributes
pub fn hierarchy_table(hierarchy: &TableHierarchy, config: &MappingConfig) -> String {
    let rows: Vec<HierarchyRow> = hierarchy
        .iter()
        .map(|table| HierarchyRow {
            table: table.name.clone(),
            tag: table.tag.clone(),
            parent: table.parent.clone().unwrap_or_else(|| "-".to_string()),
            columns: table
                .columns
                .iter()
                .map(|c| {
                    if config.is_meta_column(c) {
                        c.style(theme().meta.clone()).to_string()
                    } else {
                        c.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();

    if rows.is_empty() {
        return String::new();
    }
    Table::new(&rows).with(Style::rounded()).to_string()
}
