//! Typed values and column definitions
//!
//! Defines the three storable value kinds (int, float, fixed-length char)
//! and the column schema entries the catalog and codec operate on.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Values
// =============================================================================

/// A single typed cell value
///
/// Values are used both as decoded record fields and as B+-tree keys, so
/// they carry a total order: floats compare via `f32::total_cmp`. Values of
/// different kinds never meet inside one column; the cross-kind ordering
/// (Int < Float < Char) only exists so `Ord` is total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Int(i32),
    Float(f32),
    Char(String),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Int(_) => 0,
            Value::Float(_) => 1,
            Value::Char(_) => 2,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Char(a), Value::Char(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
        }
    }
}

// =============================================================================
// Column Schemas
// =============================================================================

/// Kind of a column as declared in `create table`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// 32-bit signed integer
    Int,

    /// 32-bit float
    Float,

    /// Fixed-length string of at most `n` bytes
    Char(usize),

    /// Marker entry naming the primary key column.
    /// Exists only in `create table` schema lists; the catalog strips it
    /// before the codec ever sees the schema.
    PrimaryKey,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Int => write!(f, "int"),
            ColumnKind::Float => write!(f, "float"),
            ColumnKind::Char(n) => write!(f, "char({})", n),
            ColumnKind::PrimaryKey => write!(f, "primary key"),
        }
    }
}

/// One entry of a `create table` schema list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name (for a `PrimaryKey` entry: the referenced column)
    pub name: String,

    /// Declared kind
    pub kind: ColumnKind,

    /// Whether the column carries a uniqueness constraint
    pub unique: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marker entry for `primary key(column)`
    pub fn primary_key(column: impl Into<String>) -> Self {
        Self {
            name: column.into(),
            kind: ColumnKind::PrimaryKey,
            unique: false,
        }
    }
}
