//! Table catalog
//!
//! Process-wide table and index metadata: per-table schemas, column maps,
//! the primary index, secondary indexes (including the implicit ones backing
//! `unique` columns), and the index-name registry.
//!
//! ## Persistence
//!
//! The whole catalog — schemas and every index's contents — is serialized
//! with bincode as one snapshot and rewritten wholesale after every mutating
//! engine call. A full-state rewrite per mutation is a documented
//! scalability limitation of this engine, not a bug.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::btree::BPlusTree;
use crate::codec;
use crate::config::Config;
use crate::error::{DbError, Result};
use crate::types::{ColumnDef, ColumnKind, Value};

/// Index over column values
pub type Index = BPlusTree<Value>;

/// Deterministic registry name of the index backing a `unique` column
pub fn unique_index_name(table: &str, column: &str) -> String {
    format!("__unique_{}_{}", table, column)
}

// =============================================================================
// Table
// =============================================================================

/// Metadata and indexes of one table
#[derive(Debug, Serialize, Deserialize)]
pub struct Table {
    /// Table name
    pub name: String,

    /// Ordered column schemas, primary-key marker already stripped
    schemas: Vec<ColumnDef>,

    /// Column name → position in the schema order
    columns: HashMap<String, usize>,

    /// Name of the primary key column
    pub primary_key: String,

    /// Index over the primary key column
    pub primary_index: Index,

    /// Column name → secondary index
    secondary: HashMap<String, Index>,

    /// Column name → uniqueness flag
    unique: HashMap<String, bool>,

    /// Number of live records
    pub record_count: u64,
}

impl Table {
    /// Validate a `create table` schema list and build the table
    ///
    /// Exactly one `PrimaryKey` marker must be present, naming an existing
    /// column; every `unique` column (other than the primary key, which the
    /// primary index already covers) gets a backing secondary index.
    pub fn create(name: &str, schemas: Vec<ColumnDef>, degree: usize) -> Result<Self> {
        let mut primary_key: Option<String> = None;
        let mut columns_defs = Vec::with_capacity(schemas.len());
        for schema in schemas {
            if schema.kind == ColumnKind::PrimaryKey {
                if primary_key.is_some() {
                    return Err(DbError::Schema(format!(
                        "Table '{}' declares more than one primary key",
                        name
                    )));
                }
                primary_key = Some(schema.name);
            } else {
                columns_defs.push(schema);
            }
        }
        let primary_key = primary_key.ok_or_else(|| {
            DbError::Schema(format!("Table '{}' declares no primary key", name))
        })?;

        let mut columns = HashMap::new();
        for (i, def) in columns_defs.iter().enumerate() {
            if columns.insert(def.name.clone(), i).is_some() {
                return Err(DbError::Schema(format!(
                    "Duplicate column '{}' in table '{}'",
                    def.name, name
                )));
            }
        }
        if !columns.contains_key(&primary_key) {
            return Err(DbError::Schema(format!(
                "Primary key references unknown column '{}'",
                primary_key
            )));
        }

        let unique: HashMap<String, bool> = columns_defs
            .iter()
            .map(|d| (d.name.clone(), d.unique))
            .collect();
        let secondary: HashMap<String, Index> = columns_defs
            .iter()
            .filter(|d| d.unique && d.name != primary_key)
            .map(|d| (d.name.clone(), Index::new(degree)))
            .collect();

        Ok(Self {
            name: name.to_string(),
            schemas: columns_defs,
            columns,
            primary_key,
            primary_index: Index::new(degree),
            secondary,
            unique,
            record_count: 0,
        })
    }

    /// Ordered column schemas (marker stripped)
    pub fn schemas(&self) -> &[ColumnDef] {
        &self.schemas
    }

    /// Position of a column in the schema order
    pub fn column_position(&self, column: &str) -> Result<usize> {
        self.columns.get(column).copied().ok_or_else(|| {
            DbError::NotFound(format!("Column '{}' in table '{}'", column, self.name))
        })
    }

    /// Schema entry of a column
    pub fn column_def(&self, column: &str) -> Result<&ColumnDef> {
        let i = self.column_position(column)?;
        Ok(&self.schemas[i])
    }

    /// Fixed byte width of one record
    pub fn record_width(&self) -> usize {
        codec::record_width(&self.schemas)
    }

    /// Whether a column carries a uniqueness constraint
    pub fn is_unique(&self, column: &str) -> bool {
        self.unique.get(column).copied().unwrap_or(false)
    }

    /// Whether a column has a secondary index
    pub fn has_secondary(&self, column: &str) -> bool {
        self.secondary.contains_key(column)
    }

    /// The index covering a column, if any (primary or secondary)
    pub fn index(&self, column: &str) -> Option<&Index> {
        if column == self.primary_key {
            Some(&self.primary_index)
        } else {
            self.secondary.get(column)
        }
    }

    /// Mutable access to the index covering a column
    pub fn index_mut(&mut self, column: &str) -> Option<&mut Index> {
        if column == self.primary_key {
            Some(&mut self.primary_index)
        } else {
            self.secondary.get_mut(column)
        }
    }

    /// Every indexed column, primary key first
    pub fn indexed_columns(&self) -> Vec<String> {
        let mut columns = vec![self.primary_key.clone()];
        // schema order keeps the listing deterministic
        for def in &self.schemas {
            if def.name != self.primary_key && self.secondary.contains_key(&def.name) {
                columns.push(def.name.clone());
            }
        }
        columns
    }

    pub(crate) fn add_secondary(&mut self, column: &str, index: Index) {
        self.secondary.insert(column.to_string(), index);
    }

    pub(crate) fn remove_secondary(&mut self, column: &str) {
        self.secondary.remove(column);
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Registry entry: which table and column an index name refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRef {
    pub table: String,
    pub column: String,
}

/// Outcome of `create_index`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateIndexOutcome {
    /// A fresh index was created; the caller must backfill it from storage
    Created,

    /// The name was registered as an alias of an existing unique-backing
    /// index; no rebuild is needed
    Aliased,
}

/// Process-wide table and index state
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Table name → table
    tables: HashMap<String, Table>,

    /// Index name → (table, column). Covers secondary indexes; the primary
    /// index is implicit in its table and cannot be dropped by name.
    indexes: HashMap<String, IndexRef>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the snapshot at `path`, or start empty if none exists
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let bytes = fs::read(path)?;
        bincode::deserialize(&bytes)
            .map_err(|e| DbError::Serialization(format!("Catalog snapshot: {}", e)))
    }

    /// Rewrite the full snapshot at `path`
    ///
    /// Written to a sibling temp file and renamed into place; the rename is
    /// the only atomicity this engine relies on.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| DbError::Serialization(format!("Catalog snapshot: {}", e)))?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| DbError::NotFound(format!("Table '{}'", name)))
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| DbError::NotFound(format!("Table '{}'", name)))
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Registry entry for an index name
    pub fn index_ref(&self, name: &str) -> Option<&IndexRef> {
        self.indexes.get(name)
    }

    /// Create a table, its primary index, and a backing index per `unique`
    /// column registered under a deterministic internal name
    pub fn create_table(
        &mut self,
        name: &str,
        schemas: Vec<ColumnDef>,
        config: &Config,
    ) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(DbError::DuplicateKey(format!("Table '{}'", name)));
        }
        let table = Table::create(name, schemas, config.btree_degree)?;
        for def in table.schemas() {
            if def.unique && def.name != table.primary_key {
                self.indexes.insert(
                    unique_index_name(name, &def.name),
                    IndexRef {
                        table: name.to_string(),
                        column: def.name.clone(),
                    },
                );
            }
        }
        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    /// Remove a table and every index name referencing it
    pub fn drop_table(&mut self, name: &str) -> Result<Table> {
        let table = self
            .tables
            .remove(name)
            .ok_or_else(|| DbError::NotFound(format!("Table '{}'", name)))?;
        self.indexes.retain(|_, r| r.table != name);
        Ok(table)
    }

    /// Register an index name over `table.column`
    ///
    /// A column already backing a `unique` constraint gets the new name as
    /// an alias of its existing index; any other already-indexed column is
    /// rejected. A `Created` outcome means the caller must backfill the
    /// fresh index from the table's live records.
    pub fn create_index(
        &mut self,
        table_name: &str,
        index_name: &str,
        column: &str,
        config: &Config,
    ) -> Result<CreateIndexOutcome> {
        if self.indexes.contains_key(index_name) {
            return Err(DbError::DuplicateKey(format!("Index '{}'", index_name)));
        }
        let degree = config.btree_degree;
        let table = self.table_mut(table_name)?;
        table.column_position(column)?;

        if column == table.primary_key {
            return Err(DbError::DuplicateKey(format!(
                "Column '{}' is the primary key of '{}' and already indexed",
                column, table_name
            )));
        }

        let reference = IndexRef {
            table: table_name.to_string(),
            column: column.to_string(),
        };
        if table.has_secondary(column) {
            if table.is_unique(column) {
                // alias the unique-backing index; no rebuild
                self.indexes.insert(index_name.to_string(), reference);
                return Ok(CreateIndexOutcome::Aliased);
            }
            return Err(DbError::DuplicateKey(format!(
                "Column '{}' of '{}' already has an index",
                column, table_name
            )));
        }

        table.add_secondary(column, Index::new(degree));
        self.indexes.insert(index_name.to_string(), reference);
        Ok(CreateIndexOutcome::Created)
    }

    /// Remove an index name; the underlying index is torn down only when no
    /// other name refers to it and no `unique` constraint still needs it
    pub fn drop_index(&mut self, index_name: &str) -> Result<()> {
        let reference = self
            .indexes
            .remove(index_name)
            .ok_or_else(|| DbError::NotFound(format!("Index '{}'", index_name)))?;

        let still_named = self.indexes.values().any(|r| *r == reference);
        let table = match self.tables.get_mut(&reference.table) {
            Some(table) => table,
            None => return Ok(()),
        };
        if !still_named && !table.is_unique(&reference.column) {
            table.remove_secondary(&reference.column);
        }
        Ok(())
    }
}
