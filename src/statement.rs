//! Operation descriptors
//!
//! The structured form of every operation the engine executes. The parser
//! produces these; the engine never looks at SQL text itself.

use std::cmp::Ordering;
use std::fmt;

use crate::types::ColumnDef;

/// One parsed operation
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `create table T (col kind [unique], ..., primary key(col))`
    CreateTable {
        table: String,
        schemas: Vec<ColumnDef>,
    },

    /// `drop table T`
    DropTable { table: String },

    /// `create index I on T (col)`
    CreateIndex {
        table: String,
        index: String,
        column: String,
    },

    /// `drop index I`
    DropIndex { index: String },

    /// `insert into T values (lit, ...)` — literals still in text form
    Insert { table: String, values: Vec<String> },

    /// `select cols from T [where ...]`
    Select {
        table: String,
        columns: Projection,
        conditions: Vec<Condition>,
    },

    /// `delete from T [where ...]`
    Delete {
        table: String,
        conditions: Vec<Condition>,
    },
}

/// Column list of a select
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// `*` — every schema column in declared order
    All,

    /// Explicit column names
    Columns(Vec<String>),
}

/// One `column op literal` predicate; a where-clause is the implicit AND
/// of its conditions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub column: String,
    pub op: CompareOp,
    pub literal: String,
}

/// Comparison operator of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Parse the SQL spelling of an operator
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "=" => Some(CompareOp::Eq),
            "<>" => Some(CompareOp::Ne),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            _ => None,
        }
    }

    /// Whether a `left cmp right` ordering satisfies this operator
    pub fn matches(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        write!(f, "{}", text)
    }
}
