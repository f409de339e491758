use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A single bound parameter or returned cell, independent of the backend.
///
/// The same enum is used for parameters and results so helper code never
/// branches on driver types:
/// ```rust
/// use sql_gateway::prelude::*;
///
/// let values = vec![
///     DatabaseValue::Int(1),
///     DatabaseValue::from("alice"),
///     DatabaseValue::from(true),
///     DatabaseValue::from(None::<i64>),
/// ];
/// assert!(values[3].is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatabaseValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    Json(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl DatabaseValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let DatabaseValue::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let DatabaseValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Booleans come back as integers from backends without a native bool
    /// type, so `0` and `1` are accepted too.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DatabaseValue::Bool(value) => Some(*value),
            DatabaseValue::Int(1) => Some(true),
            DatabaseValue::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let DatabaseValue::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            DatabaseValue::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            DatabaseValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let DatabaseValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&JsonValue> {
        if let DatabaseValue::Json(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Short type label used in log lines and error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            DatabaseValue::Int(_) => "int",
            DatabaseValue::Float(_) => "float",
            DatabaseValue::Text(_) => "text",
            DatabaseValue::Bool(_) => "bool",
            DatabaseValue::Timestamp(_) => "timestamp",
            DatabaseValue::Null => "null",
            DatabaseValue::Json(_) => "json",
            DatabaseValue::Blob(_) => "blob",
        }
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int(value)
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Int(i64::from(value))
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Float(value)
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::Text(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::Text(value.to_owned())
    }
}

impl From<NaiveDateTime> for DatabaseValue {
    fn from(value: NaiveDateTime) -> Self {
        DatabaseValue::Timestamp(value)
    }
}

impl From<JsonValue> for DatabaseValue {
    fn from(value: JsonValue) -> Self {
        DatabaseValue::Json(value)
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(value: Vec<u8>) -> Self {
        DatabaseValue::Blob(value)
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(DatabaseValue::Null, Into::into)
    }
}

/// The backend families this crate knows a dialect for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `PostgreSQL` database
    Postgres,
    /// `MySQL` / `MariaDB` database
    #[value(name = "mysql")]
    #[serde(rename = "mysql")]
    MySql,
    /// `SQLite` database
    Sqlite,
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DatabaseType::Postgres => "postgres",
            DatabaseType::MySql => "mysql",
            DatabaseType::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}
