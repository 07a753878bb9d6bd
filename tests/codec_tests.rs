//! Tests for the record codec
//!
//! These tests verify:
//! - Fixed record widths per schema
//! - Literal coercion (numeric parsing, char quoting, length bounds)
//! - Encode/decode round-trips with exact string preservation

use minisql::codec::{coerce_literal, decode, encode, record_width};
use minisql::error::DbError;
use minisql::types::{ColumnDef, ColumnKind, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn student_schema() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("sno", ColumnKind::Char(8)),
        ColumnDef::new("sname", ColumnKind::Char(16)).unique(),
        ColumnDef::new("sage", ColumnKind::Int),
        ColumnDef::new("sgpa", ColumnKind::Float),
    ]
}

// =============================================================================
// Widths
// =============================================================================

#[test]
fn test_record_width() {
    assert_eq!(record_width(&student_schema()), 8 + 16 + 4 + 4);
    assert_eq!(record_width(&[]), 0);
    assert_eq!(record_width(&[ColumnDef::new("n", ColumnKind::Int)]), 4);
}

// =============================================================================
// Literal Coercion
// =============================================================================

#[test]
fn test_coerce_int_and_float() {
    assert_eq!(coerce_literal("22", ColumnKind::Int).unwrap(), Value::Int(22));
    assert_eq!(
        coerce_literal("-7", ColumnKind::Int).unwrap(),
        Value::Int(-7)
    );
    assert_eq!(
        coerce_literal("3.5", ColumnKind::Float).unwrap(),
        Value::Float(3.5)
    );
}

#[test]
fn test_coerce_char_requires_quotes() {
    assert_eq!(
        coerce_literal("'wy1'", ColumnKind::Char(8)).unwrap(),
        Value::Char("wy1".to_string())
    );

    let err = coerce_literal("wy1", ColumnKind::Char(8)).unwrap_err();
    assert!(matches!(err, DbError::ValueCoercion { .. }));
}

#[test]
fn test_coerce_failures() {
    assert!(matches!(
        coerce_literal("abc", ColumnKind::Int),
        Err(DbError::ValueCoercion { .. })
    ));
    assert!(matches!(
        coerce_literal("1.2.3", ColumnKind::Float),
        Err(DbError::ValueCoercion { .. })
    ));
    // literal longer than the declared field
    assert!(matches!(
        coerce_literal("'abcdef'", ColumnKind::Char(4)),
        Err(DbError::ValueCoercion { .. })
    ));
}

// =============================================================================
// Encode / Decode
// =============================================================================

#[test]
fn test_round_trip() {
    let schema = student_schema();
    let values = vec![
        Value::Char("12345678".to_string()),
        Value::Char("wy1".to_string()),
        Value::Int(22),
        Value::Float(3.9),
    ];

    let bytes = encode(&values, &schema).unwrap();
    assert_eq!(bytes.len(), record_width(&schema));

    let decoded = decode(&bytes, &schema).unwrap();
    assert_eq!(decoded, values);
}

#[test]
fn test_char_padding_is_invisible() {
    let schema = vec![ColumnDef::new("s", ColumnKind::Char(16))];
    let values = vec![Value::Char("abc".to_string())];

    let bytes = encode(&values, &schema).unwrap();
    assert_eq!(bytes.len(), 16);
    assert_eq!(&bytes[..3], b"abc");
    assert!(bytes[3..].iter().all(|&b| b == 0));

    let decoded = decode(&bytes, &schema).unwrap();
    assert_eq!(decoded, vec![Value::Char("abc".to_string())]);
}

#[test]
fn test_empty_and_full_char_fields() {
    let schema = vec![ColumnDef::new("s", ColumnKind::Char(4))];

    let empty = encode(&[Value::Char(String::new())], &schema).unwrap();
    assert_eq!(decode(&empty, &schema).unwrap(), vec![Value::Char(String::new())]);

    let full = encode(&[Value::Char("abcd".to_string())], &schema).unwrap();
    assert_eq!(
        decode(&full, &schema).unwrap(),
        vec![Value::Char("abcd".to_string())]
    );
}

#[test]
fn test_negative_and_extreme_numbers() {
    let schema = vec![
        ColumnDef::new("i", ColumnKind::Int),
        ColumnDef::new("f", ColumnKind::Float),
    ];
    let values = vec![Value::Int(i32::MIN), Value::Float(-0.0)];
    let decoded = decode(&encode(&values, &schema).unwrap(), &schema).unwrap();
    assert_eq!(decoded, values);
}

#[test]
fn test_encode_arity_mismatch() {
    let schema = student_schema();
    let err = encode(&[Value::Int(1)], &schema).unwrap_err();
    assert!(matches!(
        err,
        DbError::Arity {
            expected: 4,
            actual: 1
        }
    ));
}

#[test]
fn test_encode_kind_mismatch() {
    let schema = vec![ColumnDef::new("n", ColumnKind::Int)];
    let err = encode(&[Value::Char("x".to_string())], &schema).unwrap_err();
    assert!(matches!(err, DbError::ValueCoercion { .. }));
}

#[test]
fn test_decode_truncated_record() {
    let schema = vec![ColumnDef::new("n", ColumnKind::Int)];
    let err = decode(&[1, 2], &schema).unwrap_err();
    assert!(matches!(err, DbError::Storage(_)));
}
