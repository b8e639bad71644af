/*!
 * Conversion between JSON values and SQLite column values.
 */

use anyhow::{Result, anyhow};
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};

use crate::fields::FieldKind;

/// Convert a JSON value into a column value
pub fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Convert a column value back into JSON, using the field kind to restore
/// booleans and floats
pub fn from_sql(kind: &FieldKind, value: ValueRef<'_>) -> Result<Value> {
    let value = match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => match kind {
            FieldKind::Boolean => Value::Bool(i != 0),
            FieldKind::Float => Number::from_f64(i as f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            _ if kind.is_text() => Value::String(i.to_string()),
            _ => Value::from(i),
        },
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(_) => return Err(anyhow!("Unexpected BLOB column value")),
    };
    Ok(value)
}
