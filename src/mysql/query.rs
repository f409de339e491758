use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::{MySql, MySqlArguments, MySqlPool, MySqlRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::error::DbError;
use crate::results::{DatabaseRow, RowSetBuilder};
use crate::types::DatabaseValue;

type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

fn bind_value<'q>(query: MySqlQuery<'q>, value: &'q DatabaseValue) -> MySqlQuery<'q> {
    match value {
        DatabaseValue::Int(i) => query.bind(*i),
        DatabaseValue::Float(f) => query.bind(*f),
        DatabaseValue::Text(s) => query.bind(s.as_str()),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Timestamp(dt) => query.bind(*dt),
        DatabaseValue::Null => query.bind(None::<String>),
        DatabaseValue::Json(json) => query.bind(Json(json)),
        DatabaseValue::Blob(bytes) => query.bind(bytes.as_slice()),
    }
}

/// Run one compiled statement on the pool.
///
/// # Errors
/// Returns `DbError::MySqlError` for driver failures and decoding errors.
pub async fn run_statement(
    pool: &MySqlPool,
    sql: &str,
    values: &[DatabaseValue],
) -> Result<Vec<DatabaseRow>, DbError> {
    let query = values.iter().fold(sqlx::query(sql), bind_value);
    let rows = query.fetch_all(pool).await?;
    build_rows(&rows)
}

/// # Errors
/// Returns decoding errors.
pub fn build_rows(rows: &[MySqlRow]) -> Result<Vec<DatabaseRow>, DbError> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let column_names: Vec<String> = first
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let mut builder = RowSetBuilder::with_capacity(column_names, rows.len())?;
    let column_count = builder.column_count();

    for row in rows {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(mysql_extract_value(row, idx)?);
        }
        builder.push(values)?;
    }
    Ok(builder.finish())
}

/// How a column is decoded, chosen from the type name sqlx reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Signed,
    Unsigned,
    Float,
    Double,
    DateTime,
    Date,
    Time,
    Json,
    Bytes,
    Text,
}

fn column_kind(type_name: &str) -> ColumnKind {
    match type_name.to_ascii_uppercase().as_str() {
        "BOOLEAN" => ColumnKind::Bool,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => ColumnKind::Signed,
        name if name.ends_with("UNSIGNED") => ColumnKind::Unsigned,
        "FLOAT" => ColumnKind::Float,
        "DOUBLE" => ColumnKind::Double,
        "DATETIME" | "TIMESTAMP" => ColumnKind::DateTime,
        "DATE" => ColumnKind::Date,
        "TIME" => ColumnKind::Time,
        "JSON" => ColumnKind::Json,
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" | "BIT" => {
            ColumnKind::Bytes
        }
        // VARCHAR, CHAR, TEXT, DECIMAL, ENUM and SET are sent as strings.
        _ => ColumnKind::Text,
    }
}

/// Decode one column by its reported type name.
///
/// # Errors
/// Returns `DbError::MySqlError` if the column cannot be decoded, or
/// `DbError::ExecutionError` for an unsigned value above `i64::MAX`.
pub fn mysql_extract_value(row: &MySqlRow, idx: usize) -> Result<DatabaseValue, DbError> {
    if row.try_get_raw(idx)?.is_null() {
        return Ok(DatabaseValue::Null);
    }

    let value = match column_kind(row.columns()[idx].type_info().name()) {
        ColumnKind::Bool => DatabaseValue::Bool(row.try_get::<bool, _>(idx)?),
        // YEAR shares the integer encodings.
        ColumnKind::Signed => DatabaseValue::Int(row.try_get_unchecked::<i64, _>(idx)?),
        ColumnKind::Unsigned => {
            let raw = row.try_get_unchecked::<u64, _>(idx)?;
            DatabaseValue::Int(i64::try_from(raw).map_err(|e| {
                DbError::ExecutionError(format!("unsigned value {raw} does not fit in i64: {e}"))
            })?)
        }
        ColumnKind::Float => DatabaseValue::Float(f64::from(row.try_get::<f32, _>(idx)?)),
        ColumnKind::Double => DatabaseValue::Float(row.try_get::<f64, _>(idx)?),
        ColumnKind::DateTime => DatabaseValue::Timestamp(row.try_get::<NaiveDateTime, _>(idx)?),
        ColumnKind::Date => DatabaseValue::Timestamp(
            row.try_get::<NaiveDate, _>(idx)?.and_time(NaiveTime::MIN),
        ),
        // Binary protocol encoding; rendered as `HH:MM:SS[.f]`.
        ColumnKind::Time => DatabaseValue::Text(row.try_get::<NaiveTime, _>(idx)?.to_string()),
        ColumnKind::Json => DatabaseValue::Json(row.try_get::<Json<serde_json::Value>, _>(idx)?.0),
        ColumnKind::Bytes => DatabaseValue::Blob(row.try_get::<Vec<u8>, _>(idx)?),
        ColumnKind::Text => DatabaseValue::Text(row.try_get_unchecked::<String, _>(idx)?),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use sqlx::{Arguments, Execute};

    use super::*;

    #[test]
    fn column_kinds_follow_reported_type_names() {
        let expected = [
            ("BOOLEAN", ColumnKind::Bool),
            ("INT", ColumnKind::Signed),
            ("YEAR", ColumnKind::Signed),
            ("BIGINT UNSIGNED", ColumnKind::Unsigned),
            ("DOUBLE", ColumnKind::Double),
            ("datetime", ColumnKind::DateTime),
            ("TIME", ColumnKind::Time),
            ("DECIMAL", ColumnKind::Text),
            ("ENUM", ColumnKind::Text),
            ("VARBINARY", ColumnKind::Bytes),
            ("JSON", ColumnKind::Json),
        ];
        for (name, kind) in expected {
            assert_eq!(column_kind(name), kind, "{name}");
        }
    }

    #[test]
    fn every_value_is_bound_as_an_argument() {
        let values = vec![
            DatabaseValue::Int(1),
            DatabaseValue::Float(1.5),
            DatabaseValue::from("ada"),
            DatabaseValue::Bool(true),
            DatabaseValue::Timestamp(NaiveDateTime::default()),
            DatabaseValue::Null,
            DatabaseValue::Json(serde_json::json!({ "k": 1 })),
            DatabaseValue::Blob(vec![0, 1]),
        ];
        let mut query = values
            .iter()
            .fold(sqlx::query("SELECT ?, ?, ?, ?, ?, ?, ?, ?"), bind_value);
        let arguments = query.take_arguments().unwrap().unwrap();
        assert_eq!(arguments.len(), values.len());
    }
}
