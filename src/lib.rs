//! # minisql
//!
//! A minimal single-process relational storage engine with:
//! - Fixed-schema tables persisted as flat binary records
//! - Multi-value B+-tree indexes with leaf chaining
//! - Predicate pushdown into indexes, with residual filtering
//! - A whole-catalog snapshot rewritten after every mutation
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SQL Tokenizer                           │
//! │                 (text → Statement)                           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Query Engine                              │
//! │         (planning, residual filters, projection)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼────────────────┐
//!          │            │                │
//!          ▼            ▼                ▼
//!   ┌─────────────┐ ┌──────────┐ ┌─────────────┐
//!   │   Catalog   │ │  Codec   │ │   Storage   │
//!   │ (+ B+-trees)│ │ (records)│ │ (table files)│
//!   └─────────────┘ └──────────┘ └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod types;
pub mod codec;
pub mod btree;
pub mod storage;
pub mod catalog;
pub mod statement;
pub mod parser;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use engine::{Engine, QueryResult, Row};
pub use error::{DbError, Result};
pub use types::Value;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of minisql
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
