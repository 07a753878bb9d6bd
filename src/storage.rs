//! Table storage manager
//!
//! One append-only byte stream per table, keyed by table name.
//!
//! ## Responsibilities
//! - Open-or-create a record file per table under the tables directory
//! - Cache open handles across calls (a file is opened once per process)
//! - Append records, returning their byte position
//! - Read fixed-width records back by position
//! - Delete a table's stream when the table is dropped
//!
//! Record bytes are never reclaimed: deleting rows only removes their index
//! entries, and the positions of deleted records are never reused.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::btree::Position;
use crate::error::Result;

/// Manages the per-table record files
pub struct StorageManager {
    /// Directory where table files are stored
    data_dir: PathBuf,

    /// Open handles, kept for the life of the process (closed on drop_table)
    files: HashMap<String, File>,
}

impl StorageManager {
    /// Open or create storage in the given directory
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;
        Ok(Self {
            data_dir: path.to_path_buf(),
            files: HashMap::new(),
        })
    }

    /// Append record bytes to a table's stream, returning their position
    pub fn append(&mut self, table: &str, bytes: &[u8]) -> Result<Position> {
        let file = self.file(table)?;
        // append mode: the write lands at the end regardless of the cursor
        let position = file.seek(SeekFrom::End(0))?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(position)
    }

    /// Read `len` record bytes at `position` from a table's stream
    pub fn read(&mut self, table: &str, position: Position, len: usize) -> Result<Vec<u8>> {
        let file = self.file(table)?;
        file.seek(SeekFrom::Start(position))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Delete a table's stream and evict its cached handle
    pub fn remove(&mut self, table: &str) -> Result<()> {
        self.files.remove(table);
        let path = self.table_path(table);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Cached open-or-create of a table's file
    fn file(&mut self, table: &str) -> Result<&mut File> {
        if !self.files.contains_key(table) {
            let file = OpenOptions::new()
                .read(true)
                .append(true)
                .create(true)
                .open(self.table_path(table))?;
            self.files.insert(table.to_string(), file);
        }
        Ok(self
            .files
            .get_mut(table)
            .expect("handle inserted just above"))
    }

    /// Generate the file path for a table's record stream
    fn table_path(&self, table: &str) -> PathBuf {
        self.data_dir.join(format!("{}.tbl", table))
    }
}
