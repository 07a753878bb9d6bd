//! Engine Module
//!
//! The query engine coordinating catalog, storage, codec, and indexes.
//!
//! ## Responsibilities
//! - Route parsed statements to their handlers
//! - Plan predicate evaluation against indexes, with residual filtering
//! - Keep every index consistent across insert and delete
//! - Rewrite the catalog snapshot after every mutating call
//!
//! ## Execution Model
//!
//! Single-threaded and synchronous: every operation runs to completion
//! before the next begins. There are no transactions and no rollback — a
//! failure between the storage append and the index updates leaves the
//! catalog inconsistent, a documented limitation of this engine.

use std::collections::HashSet;
use std::fs;

use tracing::{debug, info};

use crate::btree::Position;
use crate::catalog::{Catalog, CreateIndexOutcome};
use crate::codec;
use crate::config::Config;
use crate::error::{DbError, Result};
use crate::parser;
use crate::statement::{CompareOp, Condition, Projection, Statement};
use crate::storage::StorageManager;
use crate::types::Value;

// =============================================================================
// Results
// =============================================================================

/// One selected row: projected column names with their typed values, in
/// projection order, optionally carrying the record's storage position
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
    position: Option<Position>,
}

impl Row {
    /// Value of a column by name
    pub fn get(&self, column: &str) -> Option<&Value> {
        let i = self.columns.iter().position(|c| c == column)?;
        Some(&self.values[i])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Storage position, present only when selected on behalf of delete
    pub fn position(&self) -> Option<Position> {
        self.position
    }
}

/// Outcome of one executed statement
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// DDL or insert acknowledgement
    Done,

    /// Number of rows removed by a delete
    Deleted(usize),

    /// Selected rows, in storage order
    Rows(Vec<Row>),
}

// =============================================================================
// Engine
// =============================================================================

/// The query engine
///
/// Owns the catalog and the storage manager; the catalog (indexes included)
/// is loaded from its snapshot at startup and rewritten wholesale after
/// every mutating call.
pub struct Engine {
    config: Config,
    catalog: Catalog,
    storage: StorageManager,
}

impl Engine {
    /// Open or create an engine with the given config
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let catalog = Catalog::load(&config.catalog_path())?;
        let storage = StorageManager::open(&config.tables_dir())?;
        info!(data_dir = %config.data_dir.display(), "engine opened");
        Ok(Self {
            config,
            catalog,
            storage,
        })
    }

    /// Parse and execute one `;`-terminated statement
    pub fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        let statement = parser::parse(sql)?;
        self.run(statement)
    }

    /// Execute an already-parsed statement
    pub fn run(&mut self, statement: Statement) -> Result<QueryResult> {
        match statement {
            Statement::CreateTable { table, schemas } => {
                self.catalog.create_table(&table, schemas, &self.config)?;
                self.snapshot()?;
                info!(table = %table, "created table");
                Ok(QueryResult::Done)
            }
            Statement::DropTable { table } => {
                self.catalog.drop_table(&table)?;
                self.storage.remove(&table)?;
                self.snapshot()?;
                info!(table = %table, "dropped table");
                Ok(QueryResult::Done)
            }
            Statement::CreateIndex {
                table,
                index,
                column,
            } => {
                self.create_index(&table, &index, &column)?;
                self.snapshot()?;
                info!(table = %table, index = %index, column = %column, "created index");
                Ok(QueryResult::Done)
            }
            Statement::DropIndex { index } => {
                self.catalog.drop_index(&index)?;
                self.snapshot()?;
                info!(index = %index, "dropped index");
                Ok(QueryResult::Done)
            }
            Statement::Insert { table, values } => {
                self.insert(&table, &values)?;
                self.snapshot()?;
                Ok(QueryResult::Done)
            }
            Statement::Select {
                table,
                columns,
                conditions,
            } => {
                let rows = self.select_rows(&table, &columns, &conditions, false)?;
                Ok(QueryResult::Rows(rows))
            }
            Statement::Delete { table, conditions } => {
                let removed = self.delete(&table, &conditions)?;
                self.snapshot()?;
                Ok(QueryResult::Deleted(removed))
            }
        }
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Coerce, check uniqueness, append, index
    ///
    /// Every unique column's index (and the primary index) is probed before
    /// the record is appended, so a duplicate fails before any durable
    /// write. A failure after the append leaves the record bytes orphaned;
    /// no index will ever resolve them.
    fn insert(&mut self, table_name: &str, literals: &[String]) -> Result<()> {
        let table = self.catalog.table(table_name)?;
        let schemas = table.schemas();
        if literals.len() != schemas.len() {
            return Err(DbError::Arity {
                expected: schemas.len(),
                actual: literals.len(),
            });
        }
        let values: Vec<Value> = literals
            .iter()
            .zip(schemas)
            .map(|(literal, def)| codec::coerce_literal(literal, def.kind))
            .collect::<Result<_>>()?;

        let pk_position = table.column_position(&table.primary_key)?;
        if table.primary_index.contains(&values[pk_position]) {
            return Err(DbError::DuplicateKey(format!(
                "Primary key value '{}' in table '{}'",
                values[pk_position], table_name
            )));
        }
        for (i, def) in schemas.iter().enumerate() {
            if !def.unique || def.name == table.primary_key {
                continue;
            }
            if let Some(index) = table.index(&def.name) {
                if index.contains(&values[i]) {
                    return Err(DbError::DuplicateKey(format!(
                        "Unique value '{}' for column '{}' in table '{}'",
                        values[i], def.name, table_name
                    )));
                }
            }
        }

        let bytes = codec::encode(&values, schemas)?;
        let indexed = table.indexed_columns();
        let position = self.storage.append(table_name, &bytes)?;

        let table = self.catalog.table_mut(table_name)?;
        for column in &indexed {
            let i = table.column_position(column)?;
            let value = values[i].clone();
            if let Some(index) = table.index_mut(column) {
                index.insert(value, position);
            }
        }
        table.record_count += 1;
        debug!(table = %table_name, position, "inserted record");
        Ok(())
    }

    // =========================================================================
    // Select
    // =========================================================================

    /// Plan and evaluate a select
    ///
    /// Planning starts from the full position set (everything in the primary
    /// index). Each condition on an indexed column narrows it with an index
    /// probe: `=` and `<=`/`>=` intersect a point or closed-range lookup,
    /// while `<>` and the strict `<`/`>` subtract the complementing point or
    /// closed range. Conditions on unindexed columns become residual filters
    /// applied to the decoded candidate rows.
    fn select_rows(
        &mut self,
        table_name: &str,
        projection: &Projection,
        conditions: &[Condition],
        with_positions: bool,
    ) -> Result<Vec<Row>> {
        let table = self.catalog.table(table_name)?;
        let schemas = table.schemas();

        let projected: Vec<String> = match projection {
            Projection::All => schemas.iter().map(|d| d.name.clone()).collect(),
            Projection::Columns(columns) => {
                for column in columns {
                    table.column_position(column)?;
                }
                columns.clone()
            }
        };

        let mut candidates: HashSet<Position> =
            table.primary_index.positions(None, None).into_iter().collect();
        let mut residual: Vec<(usize, CompareOp, Value)> = Vec::new();

        for condition in conditions {
            let def = table.column_def(&condition.column)?;
            let value = codec::coerce_literal(&condition.literal, def.kind)?;
            let column_index = table.column_position(&condition.column)?;

            let Some(index) = table.index(&condition.column) else {
                residual.push((column_index, condition.op, value));
                continue;
            };

            match condition.op {
                CompareOp::Eq => {
                    let matched: HashSet<Position> = index
                        .search(&value)
                        .map(|p| p.iter().copied().collect())
                        .unwrap_or_default();
                    candidates.retain(|p| matched.contains(p));
                }
                CompareOp::Le => {
                    let matched: HashSet<Position> =
                        index.positions(None, Some(&value)).into_iter().collect();
                    candidates.retain(|p| matched.contains(p));
                }
                CompareOp::Ge => {
                    let matched: HashSet<Position> =
                        index.positions(Some(&value), None).into_iter().collect();
                    candidates.retain(|p| matched.contains(p));
                }
                CompareOp::Ne => {
                    let matched: HashSet<Position> = index
                        .search(&value)
                        .map(|p| p.iter().copied().collect())
                        .unwrap_or_default();
                    candidates.retain(|p| !matched.contains(p));
                }
                CompareOp::Lt => {
                    // complement of the closed range at and above the bound
                    let matched: HashSet<Position> =
                        index.positions(Some(&value), None).into_iter().collect();
                    candidates.retain(|p| !matched.contains(p));
                }
                CompareOp::Gt => {
                    // complement of the closed range at and below the bound
                    let matched: HashSet<Position> =
                        index.positions(None, Some(&value)).into_iter().collect();
                    candidates.retain(|p| !matched.contains(p));
                }
            }
        }

        // storage order: positions are append offsets
        let mut positions: Vec<Position> = candidates.into_iter().collect();
        positions.sort_unstable();

        let width = table.record_width();
        let projected_positions: Vec<usize> = projected
            .iter()
            .map(|c| table.column_position(c))
            .collect::<Result<_>>()?;

        let mut rows = Vec::new();
        for position in positions {
            let bytes = self.storage.read(table_name, position, width)?;
            let values = codec::decode(&bytes, schemas)?;
            let keep = residual
                .iter()
                .all(|(i, op, value)| op.matches(values[*i].cmp(value)));
            if !keep {
                continue;
            }
            rows.push(Row {
                columns: projected.clone(),
                values: projected_positions.iter().map(|&i| values[i].clone()).collect(),
                position: with_positions.then_some(position),
            });
        }
        Ok(rows)
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Find matching rows with their positions, then unhook them from every
    /// covering index. Record bytes stay in the file; no index will resolve
    /// their positions again.
    fn delete(&mut self, table_name: &str, conditions: &[Condition]) -> Result<usize> {
        let indexed = self.catalog.table(table_name)?.indexed_columns();
        let projection = Projection::Columns(indexed.clone());
        let rows = self.select_rows(table_name, &projection, conditions, true)?;

        let table = self.catalog.table_mut(table_name)?;
        for row in &rows {
            let Some(position) = row.position() else {
                continue;
            };
            for column in &indexed {
                let Some(value) = row.get(column).cloned() else {
                    continue;
                };
                if let Some(index) = table.index_mut(column) {
                    index.remove(&value, position);
                }
            }
        }
        table.record_count = table.record_count.saturating_sub(rows.len() as u64);
        debug!(table = %table_name, removed = rows.len(), "deleted records");
        Ok(rows.len())
    }

    // =========================================================================
    // Index Backfill
    // =========================================================================

    /// Create an index; a fresh one is backfilled by pairing every live
    /// record's column value with its position via the primary index
    fn create_index(&mut self, table_name: &str, index_name: &str, column: &str) -> Result<()> {
        let outcome = self
            .catalog
            .create_index(table_name, index_name, column, &self.config)?;
        if outcome == CreateIndexOutcome::Aliased {
            return Ok(());
        }

        let table = self.catalog.table(table_name)?;
        let width = table.record_width();
        let column_position = table.column_position(column)?;
        let schemas = table.schemas().to_vec();
        let positions = table.primary_index.positions(None, None);

        let mut entries = Vec::with_capacity(positions.len());
        for position in positions {
            let bytes = self.storage.read(table_name, position, width)?;
            let values = codec::decode(&bytes, &schemas)?;
            entries.push((values[column_position].clone(), position));
        }

        let table = self.catalog.table_mut(table_name)?;
        if let Some(index) = table.index_mut(column) {
            for (value, position) in entries {
                index.insert(value, position);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Rewrite the full catalog snapshot (schemas and index contents)
    fn snapshot(&self) -> Result<()> {
        self.catalog.save(&self.config.catalog_path())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
