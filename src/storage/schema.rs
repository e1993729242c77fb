//! Introspection and housekeeping SQL

use crate::mapping::emitter::quote_identifier;

/// Enforce declared references (checked at commit for deferrable keys)
pub const ENABLE_FOREIGN_KEYS: &str = "PRAGMA foreign_keys = ON";

/// User tables in creation order. `_` is a LIKE wildcard, so it is escaped
/// to keep tags such as `SqliteInfo` visible.
pub const LIST_TABLES: &str = r#"
SELECT name FROM sqlite_master
WHERE type = 'table' AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
ORDER BY rowid
"#;

/// Columns of the table bound to ?1, in declaration order
pub const LIST_COLUMNS: &str = "SELECT name FROM pragma_table_info(?1) ORDER BY cid";

/// Row fetch for one table; the parent filter binds its id to ?1
pub fn select_rows(table: &str, parent_column: Option<&str>, order_by: Option<&str>) -> String {
    let mut sql = format!("SELECT * FROM {}", quote_identifier(table));
    if let Some(column) = parent_column {
        sql.push_str(&format!(" WHERE {} = ?1", quote_identifier(column)));
    }
    match order_by {
        Some(column) => sql.push_str(&format!(" ORDER BY {}", quote_identifier(column))),
        None => sql.push_str(" ORDER BY rowid"),
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_rows() {
        assert_eq!(
            select_rows("Shop_Item", Some("_parentId"), Some("_id")),
            "SELECT * FROM \"Shop_Item\" WHERE \"_parentId\" = ?1 ORDER BY \"_id\""
        );
        assert_eq!(select_rows("Shop", None, None), "SELECT * FROM \"Shop\" ORDER BY rowid");
    }
}
