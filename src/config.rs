//! Configuration for eventtable
//!
//! Per-table settings with sensible defaults, plus the key/value reader the
//! hosting engine passes to `init`.

use std::collections::HashMap;

use crate::error::{Result, TableError};

/// Settings for one table instance
#[derive(Debug, Clone)]
pub struct TableConfig {
    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------
    /// Fixed element id. When `None`, one is generated from the app's
    /// id generator at init and kept for the table's lifetime.
    pub element_id: Option<String>,

    /// Prefix for generated element ids ("{prefix}-{n}")
    pub element_id_prefix: String,

    // -------------------------------------------------------------------------
    // Query Compilation
    // -------------------------------------------------------------------------
    /// Let compiled predicates use primary-key and secondary indexes.
    /// When false every predicate is a full scan.
    pub index_lookups: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            element_id: None,
            element_id_prefix: "InMemoryTable".to_string(),
            index_lookups: true,
        }
    }
}

impl TableConfig {
    pub const ELEMENT_ID_KEY: &'static str = "element.id";
    pub const ELEMENT_ID_PREFIX_KEY: &'static str = "element.id.prefix";
    pub const INDEX_LOOKUPS_KEY: &'static str = "index.lookups";

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Read settings from an extension-config reader; absent keys keep defaults
    pub fn from_reader(reader: &ConfigReader) -> Result<Self> {
        let mut config = Self::default();

        if let Some(id) = reader.get(Self::ELEMENT_ID_KEY) {
            if id.trim().is_empty() {
                return Err(TableError::Config(format!(
                    "'{}' must not be empty",
                    Self::ELEMENT_ID_KEY
                )));
            }
            config.element_id = Some(id.to_string());
        }
        if let Some(prefix) = reader.get(Self::ELEMENT_ID_PREFIX_KEY) {
            config.element_id_prefix = prefix.to_string();
        }
        if let Some(raw) = reader.get(Self::INDEX_LOOKUPS_KEY) {
            config.index_lookups = raw.trim().parse().map_err(|_| {
                TableError::Config(format!(
                    "'{}' expects true or false, got '{}'",
                    Self::INDEX_LOOKUPS_KEY,
                    raw
                ))
            })?;
        }

        Ok(config)
    }
}

/// Builder for TableConfig
#[derive(Default)]
pub struct ConfigBuilder {
    config: TableConfig,
}

impl ConfigBuilder {
    /// Pin the element id instead of generating one
    pub fn element_id(mut self, id: impl Into<String>) -> Self {
        self.config.element_id = Some(id.into());
        self
    }

    pub fn element_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.element_id_prefix = prefix.into();
        self
    }

    /// Enable or disable index-backed predicates
    pub fn index_lookups(mut self, enabled: bool) -> Self {
        self.config.index_lookups = enabled;
        self
    }

    pub fn build(self) -> TableConfig {
        self.config
    }
}

/// String key/value view over the engine's extension configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigReader {
    values: HashMap<String, String>,
}

impl ConfigReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value for `key`, or `default` when unset
    pub fn read_config(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }
}
