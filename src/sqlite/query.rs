use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use super::params::Params;
use crate::error::DbError;
use crate::results::{DatabaseRow, RowSetBuilder};
use crate::types::DatabaseValue;

/// Extract a `DatabaseValue` from a `SQLite` row.
///
/// `SQLite` reports storage classes, so booleans come back as integers and
/// timestamps as text.
///
/// # Errors
/// Returns `DbError` if the value cannot be read.
pub fn sqlite_extract_value(row: &rusqlite::Row, idx: usize) -> Result<DatabaseValue, DbError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => DatabaseValue::Null,
        Value::Integer(i) => DatabaseValue::Int(i),
        Value::Real(f) => DatabaseValue::Float(f),
        Value::Text(s) => DatabaseValue::Text(s),
        Value::Blob(b) => DatabaseValue::Blob(b),
    })
}

/// Run one compiled statement and collect its rows.
///
/// Statements that produce no rows (DDL, DML without `RETURNING`) still run
/// and yield an empty list. The text must hold a single statement; trailing
/// statements are rejected by rusqlite with `MultipleStatement` before
/// anything runs.
///
/// # Errors
/// Returns `DbError::SqliteError` if preparation, binding or stepping fails.
pub fn run_statement(
    conn: &Connection,
    sql: &str,
    values: &[DatabaseValue],
) -> Result<Vec<DatabaseRow>, DbError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let column_names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_owned)
        .collect();
    let mut builder = RowSetBuilder::new(column_names)?;
    let column_count = builder.column_count();

    let params = Params::convert(values);
    let mut rows = stmt.query(params_from_iter(params.as_values()))?;
    while let Some(row) = rows.next()? {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(sqlite_extract_value(row, idx)?);
        }
        builder.push(row_values)?;
    }

    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_numbered_placeholders() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER, name TEXT);")
            .unwrap();
        run_statement(
            &conn,
            "INSERT INTO t (id, name) VALUES (?1, ?2)",
            &[DatabaseValue::Int(1), DatabaseValue::Text("one".into())],
        )
        .unwrap();

        let rows = run_statement(&conn, "SELECT id, name FROM t WHERE id = ?1", &[DatabaseValue::Int(1)])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].column_names(), ["id", "name"]);
        assert_eq!(rows[0].get("name"), Some(&DatabaseValue::Text("one".into())));
    }

    #[test]
    fn driver_errors_surface_as_sqlite_errors() {
        let conn = Connection::open_in_memory().unwrap();
        let err = run_statement(&conn, "SELECT * FROM missing", &[]).unwrap_err();
        assert!(matches!(err, DbError::SqliteError(_)));
    }

    #[test]
    fn trailing_statements_are_rejected_before_running() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER);").unwrap();
        let err = run_statement(&conn, "INSERT INTO t VALUES (1); INSERT INTO t VALUES (2)", &[])
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::SqliteError(rusqlite::Error::MultipleStatement)
        ));

        let rows = run_statement(&conn, "SELECT COUNT(*) AS n FROM t", &[]).unwrap();
        assert_eq!(rows[0].get("n"), Some(&DatabaseValue::Int(0)));
    }
}
