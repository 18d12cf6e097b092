//! Row mapping traits and utilities

use std::sync::Arc;

use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// One result row: shared column names plus the row's values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value of a column.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// Try to get a column value, returning `OrmError::Decode` on failure.
    pub fn try_get<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .value(column)
            .ok_or_else(|| OrmError::decode(column, "no such column in row"))?;
        T::from_value(value).map_err(|message| OrmError::decode(column, message))
    }

    /// Typed access by position.
    pub fn try_get_index<T: FromValue>(&self, idx: usize) -> OrmResult<T> {
        let column = self
            .columns
            .get(idx)
            .map(String::as_str)
            .unwrap_or("<out of range>");
        let value = self
            .values
            .get(idx)
            .ok_or_else(|| OrmError::decode(column, format!("no column at index {idx}")))?;
        T::from_value(value).map_err(|message| OrmError::decode(column, message))
    }
}

/// Conversion from a stored [`Value`].
///
/// Errors are plain messages; [`Row::try_get`] attaches the column name.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, String>;
}

fn mismatch(expected: &str, value: &Value) -> String {
    format!("expected {expected}, found {}", value.type_name())
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        value.as_i64().ok_or_else(|| mismatch("INTEGER", value))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, String> {
        let v = i64::from_value(value)?;
        i32::try_from(v).map_err(|_| format!("integer {v} out of range for i32"))
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> Result<Self, String> {
        let v = i64::from_value(value)?;
        u32::try_from(v).map_err(|_| format!("integer {v} out of range for u32"))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        value.as_f64().ok_or_else(|| mismatch("REAL", value))
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            Value::Integer(v) => Err(format!("integer {v} is not a boolean")),
            other => Err(mismatch("INTEGER 0/1", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, String> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("TEXT", value))
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Blob(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            other => Err(mismatch("BLOB", other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Text(s) => serde_json::from_str(s).map_err(|e| e.to_string()),
            Value::Integer(v) => Ok(serde_json::Value::from(*v)),
            Value::Real(v) => Ok(serde_json::Value::from(*v)),
            other => Err(mismatch("JSON text", other)),
        }
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => uuid::Uuid::parse_str(s).map_err(|e| e.to_string()),
            Value::Blob(b) => uuid::Uuid::from_slice(b).map_err(|e| e.to_string()),
            other => Err(mismatch("UUID text", other)),
        }
    }
}

impl FromValue for chrono::DateTime<chrono::Utc> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .map_err(|e| e.to_string()),
            Value::Integer(secs) => chrono::DateTime::from_timestamp(*secs, 0)
                .ok_or_else(|| format!("timestamp {secs} out of range")),
            other => Err(mismatch("RFC 3339 text", other)),
        }
    }
}

/// Trait for types that can be created from a database row.
///
/// ```ignore
/// impl FromRow for Todo {
///     fn from_row(row: &Row) -> OrmResult<Self> {
///         Ok(Self { id: row.try_get("id")?, label: row.try_get("label")? })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(row.clone())
    }
}
