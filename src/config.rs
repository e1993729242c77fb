use crate::table::TableDefinition;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ID_COLUMN: &str = "_id";
pub const DEFAULT_PARENT_COLUMN: &str = "_parentId";
pub const DEFAULT_TEXT_COLUMN: &str = "_text";
pub const DEFAULT_SEPARATOR: &str = "_";
pub const DEFAULT_INDENT: &str = "  ";

/// Options that control how a document is mapped onto tables and back.
///
/// In config files an empty string disables a meta-column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    #[serde(with = "optional_name")]
    pub id_column_name: Option<String>,
    #[serde(with = "optional_name")]
    pub parent_reference_column_name: Option<String>,
    #[serde(with = "optional_name")]
    pub text_column_name: Option<String>,
    pub indent_unit: String,
    pub separator: String,
    pub use_in_memory_store: bool,
    pub persist_changes: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            id_column_name: Some(DEFAULT_ID_COLUMN.to_string()),
            parent_reference_column_name: Some(DEFAULT_PARENT_COLUMN.to_string()),
            text_column_name: Some(DEFAULT_TEXT_COLUMN.to_string()),
            indent_unit: DEFAULT_INDENT.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            use_in_memory_store: false,
            persist_changes: false,
        }
    }
}

impl MappingConfig {
    /// Default options backed by an in-memory store
    pub fn in_memory() -> Self {
        Self {
            use_in_memory_store: true,
            ..Self::default()
        }
    }

    pub fn id_column(&self) -> Option<&str> {
        self.id_column_name.as_deref()
    }

    pub fn parent_column(&self) -> Option<&str> {
        self.parent_reference_column_name.as_deref()
    }

    pub fn text_column(&self) -> Option<&str> {
        self.text_column_name.as_deref()
    }

    /// Whether `column` names one of the enabled meta-columns. The engine
    /// ignores ASCII case in identifiers, so `_ID` counts as `_id`.
    pub fn is_meta_column(&self, column: &str) -> bool {
        self.meta_column(column).is_some()
    }

    /// Enabled meta-column that `column` resolves to in the engine
    pub fn meta_column(&self, column: &str) -> Option<&str> {
        [self.id_column(), self.parent_column(), self.text_column()]
            .into_iter()
            .flatten()
            .find(|name| name.eq_ignore_ascii_case(column))
    }

    pub fn validate(&self) -> Result<()> {
        if self.parent_reference_column_name.is_some() && self.id_column_name.is_none() {
            return Err(Error::Config(
                "parent_reference_column_name requires id_column_name".to_string(),
            ));
        }
        if self.separator.is_empty() {
            return Err(Error::Config("separator must not be empty".to_string()));
        }
        if self.separator.contains('"') {
            return Err(Error::Config(
                "separator must not contain a double quote".to_string(),
            ));
        }

        let names: Vec<&str> = [self.id_column(), self.parent_column(), self.text_column()]
            .into_iter()
            .flatten()
            .collect();
        for (i, name) in names.iter().enumerate() {
            if names[i + 1..].iter().any(|other| other.eq_ignore_ascii_case(name)) {
                return Err(Error::Config(format!(
                    "meta-column name {} is used twice",
                    name
                )));
            }
        }
        Ok(())
    }
}

mod optional_name {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(if value.is_empty() { None } else { Some(value) })
    }
}

/// Contents of an `xmlsql.toml` file: mapping options plus declared tables.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub tables: Vec<TableDefinition>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("xmlsql.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ProjectConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ProjectConfig = toml::from_str(&contents)?;
    config.mapping.validate()?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &ProjectConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
