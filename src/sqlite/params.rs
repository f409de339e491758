use rusqlite::types::Value;

use crate::types::DatabaseValue;

/// Format used for timestamps stored as `SQLite` text.
pub const TIMESTAMP_FORMAT: &str = "%F %T%.f";

/// Convert a single `DatabaseValue` to a rusqlite `Value`.
#[must_use]
pub fn database_value_to_sqlite_value(value: &DatabaseValue) -> Value {
    match value {
        DatabaseValue::Int(i) => Value::Integer(*i),
        DatabaseValue::Float(f) => Value::Real(*f),
        DatabaseValue::Text(s) => Value::Text(s.clone()),
        DatabaseValue::Bool(b) => Value::Integer(i64::from(*b)),
        DatabaseValue::Timestamp(dt) => Value::Text(dt.format(TIMESTAMP_FORMAT).to_string()),
        DatabaseValue::Null => Value::Null,
        DatabaseValue::Json(json) => Value::Text(json.to_string()),
        DatabaseValue::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Owned `SQLite` values for one statement.
pub struct Params(pub Vec<Value>);

impl Params {
    #[must_use]
    pub fn convert(values: &[DatabaseValue]) -> Self {
        Params(values.iter().map(database_value_to_sqlite_value).collect())
    }

    #[must_use]
    pub fn as_values(&self) -> &[Value] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn converts_non_native_types_to_storage_classes() {
        let ts = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_milli_opt(8, 30, 0, 250)
            .unwrap();
        let params = Params::convert(&[
            DatabaseValue::Bool(true),
            DatabaseValue::Timestamp(ts),
            DatabaseValue::Json(json!({"k": 1})),
            DatabaseValue::Null,
        ]);
        assert_eq!(
            params.as_values(),
            &[
                Value::Integer(1),
                Value::Text("2024-02-29 08:30:00.250".into()),
                Value::Text("{\"k\":1}".into()),
                Value::Null,
            ]
        );
    }
}
