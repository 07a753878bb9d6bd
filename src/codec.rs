//! Record codec
//!
//! Translates between a table's typed column schema and the fixed-width
//! byte layout records are stored in.
//!
//! ## Record Format
//!
//! Fields are laid out back to back in schema order, little-endian:
//! ```text
//! ┌─────────────┬─────────────┬─────────────────────────┐
//! │ int (4, i32)│ float (4)   │ char(n) (n, NUL-padded) │
//! └─────────────┴─────────────┴─────────────────────────┘
//! ```
//! The total width is fixed per table and computed once from the schema, so
//! a record position plus the schema is enough to read any row back.

use crate::error::{DbError, Result};
use crate::types::{ColumnDef, ColumnKind, Value};

/// Byte width of one field of the given kind
pub fn field_width(kind: ColumnKind) -> usize {
    match kind {
        ColumnKind::Int => 4,
        ColumnKind::Float => 4,
        ColumnKind::Char(n) => n,
        // stripped before the codec sees a schema; contributes nothing
        ColumnKind::PrimaryKey => 0,
    }
}

/// Total byte width of one record under the given schema
pub fn record_width(schema: &[ColumnDef]) -> usize {
    schema.iter().map(|c| field_width(c.kind)).sum()
}

/// Coerce a literal from its SQL text form to a typed value
///
/// Int and float literals are parsed as numbers; char literals must be
/// quoted (`'...'`) and fit the declared field length.
pub fn coerce_literal(literal: &str, kind: ColumnKind) -> Result<Value> {
    let coercion_err = || DbError::ValueCoercion {
        literal: literal.to_string(),
        kind: kind.to_string(),
    };

    match kind {
        ColumnKind::Int => literal
            .trim()
            .parse::<i32>()
            .map(Value::Int)
            .map_err(|_| coercion_err()),
        ColumnKind::Float => literal
            .trim()
            .parse::<f32>()
            .map(Value::Float)
            .map_err(|_| coercion_err()),
        ColumnKind::Char(n) => {
            let trimmed = literal.trim();
            let inner = trimmed
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
                .ok_or_else(coercion_err)?;
            if inner.len() > n {
                return Err(coercion_err());
            }
            Ok(Value::Char(inner.to_string()))
        }
        ColumnKind::PrimaryKey => Err(coercion_err()),
    }
}

/// Encode one record to its fixed-width byte form
///
/// Fails with an arity error if the value count does not match the schema,
/// and with a coercion error if a value's kind does not match its column.
pub fn encode(values: &[Value], schema: &[ColumnDef]) -> Result<Vec<u8>> {
    if values.len() != schema.len() {
        return Err(DbError::Arity {
            expected: schema.len(),
            actual: values.len(),
        });
    }

    let mut bytes = Vec::with_capacity(record_width(schema));
    for (value, column) in values.iter().zip(schema) {
        match (value, column.kind) {
            (Value::Int(v), ColumnKind::Int) => {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            (Value::Float(v), ColumnKind::Float) => {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            (Value::Char(v), ColumnKind::Char(n)) => {
                if v.len() > n {
                    return Err(DbError::ValueCoercion {
                        literal: v.clone(),
                        kind: column.kind.to_string(),
                    });
                }
                bytes.extend_from_slice(v.as_bytes());
                bytes.resize(bytes.len() + (n - v.len()), 0);
            }
            (other, kind) => {
                return Err(DbError::ValueCoercion {
                    literal: other.to_string(),
                    kind: kind.to_string(),
                });
            }
        }
    }

    Ok(bytes)
}

/// Decode one record from its fixed-width byte form
///
/// Char fields come back with their trailing NUL padding stripped.
pub fn decode(bytes: &[u8], schema: &[ColumnDef]) -> Result<Vec<Value>> {
    let width = record_width(schema);
    if bytes.len() < width {
        return Err(DbError::Storage(format!(
            "Record truncated: expected {} bytes, got {}",
            width,
            bytes.len()
        )));
    }

    let mut values = Vec::with_capacity(schema.len());
    let mut offset = 0;
    for column in schema {
        let end = offset + field_width(column.kind);
        let field = &bytes[offset..end];
        let value = match column.kind {
            ColumnKind::Int => {
                Value::Int(i32::from_le_bytes([field[0], field[1], field[2], field[3]]))
            }
            ColumnKind::Float => {
                Value::Float(f32::from_le_bytes([field[0], field[1], field[2], field[3]]))
            }
            ColumnKind::Char(_) => {
                let trimmed = match field.iter().rposition(|&b| b != 0) {
                    Some(last) => &field[..=last],
                    None => &[],
                };
                let text = std::str::from_utf8(trimmed).map_err(|e| {
                    DbError::Serialization(format!("Invalid UTF-8 in char field: {}", e))
                })?;
                Value::Char(text.to_string())
            }
            ColumnKind::PrimaryKey => {
                return Err(DbError::Schema(
                    "Primary key marker reached the codec".to_string(),
                ));
            }
        };
        values.push(value);
        offset = end;
    }

    Ok(values)
}
