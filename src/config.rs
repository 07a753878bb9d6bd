//! Configuration for minisql
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Filename of the catalog snapshot inside the data directory
pub const CATALOG_FILENAME: &str = "catalog.bin";

/// Subdirectory of the data directory holding table record files
pub const TABLES_DIR: &str = "tables";

/// Main configuration for a minisql instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files.
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── catalog.bin      (catalog + index snapshot)
    ///     └── tables/          (one record file per table)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Minimum branching factor t of every B+-tree index.
    /// Nodes hold at most 2t-1 keys; non-root nodes hold at least t-1.
    pub btree_degree: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./minisql_data"),
            btree_degree: 3,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Path of the catalog snapshot file
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(CATALOG_FILENAME)
    }

    /// Path of the table-file directory
    pub fn tables_dir(&self) -> PathBuf {
        self.data_dir.join(TABLES_DIR)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the B+-tree minimum branching factor
    pub fn btree_degree(mut self, degree: usize) -> Self {
        self.config.btree_degree = degree;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
