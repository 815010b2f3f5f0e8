//! TOML configuration for leaf indexes and the inspect tool.
//!
//! ```toml
//! [store]
//! page_size = 4096
//!
//! [index]
//! unique = false
//! check_invariants = true
//!
//! [log]
//! filter = "sombra_btree_leaf=info"
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::primitives::pager::{validate_page_size, DEFAULT_PAGE_SIZE};
use crate::storage::btree::IndexOptions;
use crate::types::{Result, SombraError};

/// Log filter used when neither the config nor the environment sets one.
pub const DEFAULT_LOG_FILTER: &str = "sombra_btree_leaf=info";

/// Complete configuration file.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LeafConfig {
    /// Page store settings.
    #[serde(default)]
    pub store: StoreSection,
    /// Index behaviour.
    #[serde(default)]
    pub index: IndexSection,
    /// Logging.
    #[serde(default)]
    pub log: LogSection,
}

/// `[store]` table.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Page size in bytes.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// `[index]` table; unset keys fall back to [`IndexOptions::default`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct IndexSection {
    /// Reject duplicate non-NULL keys.
    pub unique: Option<bool>,
    /// Re-check page invariants after each mutation.
    pub check_invariants: Option<bool>,
}

/// `[log]` table.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    /// `tracing_subscriber::EnvFilter` directive string.
    pub filter: Option<String>,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl LeafConfig {
    /// Loads `path`, returning defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents).map_err(|err| match err {
                SombraError::Config(msg) => {
                    SombraError::Config(format!("{}: {msg}", path.display()))
                }
                other => other,
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|err| SombraError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| SombraError::Config(err.to_string()))
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        validate_page_size(self.store.page_size)
    }

    /// Configured page size.
    pub fn page_size(&self) -> usize {
        self.store.page_size
    }

    /// Index options with unset keys taken from the defaults.
    pub fn index_options(&self) -> IndexOptions {
        let defaults = IndexOptions::default();
        IndexOptions {
            unique: self.index.unique.unwrap_or(defaults.unique),
            check_invariants: self
                .index
                .check_invariants
                .unwrap_or(defaults.check_invariants),
        }
    }

    /// Log filter directive, falling back to [`DEFAULT_LOG_FILTER`].
    pub fn log_filter(&self) -> &str {
        self.log.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}
