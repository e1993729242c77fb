//! Table naming - the hierarchy is encoded in table names
//!
//! A mapped element's table is `scope + separator + tag`, where `scope` is the
//! table of its nearest mapped ancestor. Root tables (direct children of the
//! document envelope) have an empty scope and are named by their tag alone.
//! The parent of any table is therefore whatever precedes its last separator.

use crate::{Error, Result};

/// Canonical table name for an element with `tag` under `scope`.
///
/// Fails when the separator could be found inside the tag (including a match
/// that straddles the joint), since the parent could then no longer be
/// recovered from the name.
pub fn table_name(scope: &str, tag: &str, separator: &str) -> Result<String> {
    let joint = format!("{}{}", separator, tag);
    if joint.rfind(separator) != Some(0) {
        return Err(Error::NamingCollision {
            name: tag.to_string(),
            detail: format!("tag contains the table separator {:?}", separator),
        });
    }
    if scope.is_empty() {
        Ok(tag.to_string())
    } else {
        Ok(format!("{}{}{}", scope, separator, tag))
    }
}

/// Name of the parent table, `None` for root tables
pub fn parent_table<'a>(table: &'a str, separator: &str) -> Option<&'a str> {
    table.rsplit_once(separator).map(|(parent, _)| parent)
}

/// Tag component of a table name (everything after the last separator)
pub fn tag_of<'a>(table: &'a str, separator: &str) -> &'a str {
    table
        .rsplit_once(separator)
        .map(|(_, tag)| tag)
        .unwrap_or(table)
}

/// Key under which the engine compares identifiers (ASCII case only)
pub(crate) fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_table_has_no_prefix() {
        assert_eq!(table_name("", "RootTable", "_").unwrap(), "RootTable");
    }

    #[test]
    fn test_nested_path_joins_tags() {
        let a = table_name("", "p1", "_").unwrap();
        let b = table_name(&a, "p2", "_").unwrap();
        let c = table_name(&b, "p3", "_").unwrap();
        assert_eq!(c, "p1_p2_p3");
        assert_eq!(parent_table(&c, "_"), Some("p1_p2"));
        assert_eq!(tag_of(&c, "_"), "p3");
    }

    #[test]
    fn test_parent_of_root_is_none() {
        assert_eq!(parent_table("RootTable", "_"), None);
        assert_eq!(tag_of("RootTable", "_"), "RootTable");
    }

    #[test]
    fn test_separator_in_tag_is_rejected() {
        let err = table_name("Shop", "first_name", "_").unwrap_err();
        assert!(matches!(err, Error::NamingCollision { .. }));
    }

    #[test]
    fn test_multi_char_separator() {
        let name = table_name("shop", "first_name", "__").unwrap();
        assert_eq!(name, "shop__first_name");
        assert_eq!(parent_table(&name, "__"), Some("shop"));
        assert_eq!(tag_of(&name, "__"), "first_name");
    }

    #[test]
    fn test_separator_straddling_joint_is_rejected() {
        assert!(table_name("shop", "_item", "__").is_err());
        assert!(table_name("shop", "item_", "__").is_ok());
    }
}
