use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use deadpool_postgres::Pool;
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_postgres::Statement;
use tokio_postgres::types::FromSql;
use uuid::Uuid;

use super::params::Params;
use crate::error::DbError;
use crate::results::{DatabaseRow, RowSetBuilder};
use crate::types::DatabaseValue;

/// Run one compiled statement on a pooled client.
///
/// # Errors
/// Returns pool, prepare, execution or decoding errors.
pub async fn run_statement(
    pool: &Pool,
    sql: &str,
    values: &[DatabaseValue],
) -> Result<Vec<DatabaseRow>, DbError> {
    let client = pool.get().await?;
    let stmt = client.prepare_cached(sql).await?;
    let params = Params::convert(values);
    let rows = client.query(&stmt, params.as_refs()).await?;
    build_rows(&stmt, &rows)
}

/// Decode rows using the statement's column metadata.
///
/// # Errors
/// Returns errors from value extraction.
pub fn build_rows(
    stmt: &Statement,
    rows: &[tokio_postgres::Row],
) -> Result<Vec<DatabaseRow>, DbError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let mut builder = RowSetBuilder::with_capacity(column_names, rows.len())?;
    let column_count = builder.column_count();

    for row in rows {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(postgres_extract_value(row, idx)?);
        }
        builder.push(values)?;
    }

    Ok(builder.finish())
}

/// Extracts a `DatabaseValue` from a `tokio_postgres` Row at the given index.
///
/// # Errors
/// Returns `DbError` if the column cannot be decoded.
pub fn postgres_extract_value(
    row: &tokio_postgres::Row,
    idx: usize,
) -> Result<DatabaseValue, DbError> {
    let column = &row.columns()[idx];
    let type_name = column.type_().name();

    let value = match type_name {
        "int2" => {
            let val: Option<i16> = row.try_get(idx)?;
            val.map(|v| DatabaseValue::Int(i64::from(v)))
        }
        "int4" => {
            let val: Option<i32> = row.try_get(idx)?;
            val.map(|v| DatabaseValue::Int(i64::from(v)))
        }
        "int8" => {
            let val: Option<i64> = row.try_get(idx)?;
            val.map(DatabaseValue::Int)
        }
        "float4" => {
            let val: Option<f32> = row.try_get(idx)?;
            val.map(|v| DatabaseValue::Float(f64::from(v)))
        }
        "float8" => {
            let val: Option<f64> = row.try_get(idx)?;
            val.map(DatabaseValue::Float)
        }
        "bool" => {
            let val: Option<bool> = row.try_get(idx)?;
            val.map(DatabaseValue::Bool)
        }
        "timestamp" => {
            let val: Option<NaiveDateTime> = row.try_get(idx)?;
            val.map(DatabaseValue::Timestamp)
        }
        "timestamptz" => {
            let val: Option<chrono::DateTime<chrono::Utc>> = row.try_get(idx)?;
            val.map(|v| DatabaseValue::Timestamp(v.naive_utc()))
        }
        "date" => {
            let val: Option<NaiveDate> = row.try_get(idx)?;
            val.map(|v| DatabaseValue::Timestamp(v.and_time(NaiveTime::MIN)))
        }
        "json" | "jsonb" => {
            let val: Option<Value> = row.try_get(idx)?;
            val.map(DatabaseValue::Json)
        }
        "bytea" => {
            let val: Option<Vec<u8>> = row.try_get(idx)?;
            val.map(DatabaseValue::Blob)
        }
        // Exact decimals keep their digits as text.
        "numeric" => {
            let val: Option<Decimal> = row.try_get(idx)?;
            val.map(|v| DatabaseValue::Text(v.to_string()))
        }
        "uuid" => {
            let val: Option<Uuid> = row.try_get(idx)?;
            val.map(|v| DatabaseValue::Text(v.to_string()))
        }
        "time" => {
            let val: Option<NaiveTime> = row.try_get(idx)?;
            val.map(|v| DatabaseValue::Text(v.to_string()))
        }
        "oid" => {
            let val: Option<u32> = row.try_get(idx)?;
            val.map(|v| DatabaseValue::Int(i64::from(v)))
        }
        "char" => {
            let val: Option<i8> = row.try_get(idx)?;
            val.map(|v| DatabaseValue::Int(i64::from(v)))
        }
        _ if <String as FromSql>::accepts(column.type_()) => {
            let val: Option<String> = row.try_get(idx)?;
            val.map(DatabaseValue::Text)
        }
        _ => {
            return Err(DbError::ExecutionError(format!(
                "column {} has unsupported postgres type {type_name}",
                column.name()
            )));
        }
    };

    Ok(value.unwrap_or(DatabaseValue::Null))
}
