//! Behaviour that must hold before any server is contacted.

mod common;

use sql_gateway::prelude::*;
use sql_gateway::translation::{compile_placeholders, count_placeholders};
use sql_gateway::grammar_for;

#[test]
fn test6_placeholders_compile_per_dialect() {
    let sql = "SELECT * FROM t WHERE a = ? AND b = '?' AND c = ? -- ?";
    let expected = [
        (DatabaseType::Postgres, "SELECT * FROM t WHERE a = $1 AND b = '?' AND c = $2 -- ?"),
        (DatabaseType::MySql, sql),
        (DatabaseType::Sqlite, "SELECT * FROM t WHERE a = ?1 AND b = '?' AND c = ?2 -- ?"),
    ];
    for (dialect, compiled) in expected {
        assert_eq!(count_placeholders(sql, dialect), 2);
        assert_eq!(compile_placeholders(sql, grammar_for(dialect)).sql, compiled);
    }
}

#[cfg(feature = "postgres")]
#[test]
fn test6_postgres_rejects_mismatch_without_a_server() -> Result<(), Box<dyn std::error::Error>> {
    let harness = common::Harness::new(1)?;
    // Nothing listens here; the pool is lazy, so only a real query would notice.
    let options = PostgresOptions::new("127.0.0.1", 1, "nowhere").credentials("nobody", "nothing");
    let db = DatabaseConfig::Postgres(options).connect(&harness.event_loop(), &harness.threads)?;

    let err = db
        .run_raw_query("SELECT ? + ?", vec![DatabaseValue::Int(1)])
        .wait()
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::ParameterCountMismatch {
            expected: 2,
            actual: 1
        }
    ));

    let unreachable = db.run_raw("SELECT 1").wait().unwrap_err();
    assert_eq!(unreachable.kind(), ErrorKind::BackendExecution);

    db.shutdown().wait()?;
    harness.shutdown()?;
    Ok(())
}

#[cfg(feature = "postgres")]
#[test]
fn test6_incomplete_postgres_options_are_config_errors() -> Result<(), Box<dyn std::error::Error>> {
    let harness = common::Harness::new(1)?;
    let config = DatabaseConfig::from_json_str(r#"{"backend": "postgres", "host": "localhost"}"#)?;
    let err = config
        .connect(&harness.event_loop(), &harness.threads)
        .err()
        .ok_or("connect should fail")?;
    assert_eq!(err.kind(), ErrorKind::Configuration);
    harness.shutdown()?;
    Ok(())
}

#[cfg(feature = "mysql")]
#[test]
fn test6_mysql_rejects_mismatch_without_a_server() -> Result<(), Box<dyn std::error::Error>> {
    let harness = common::Harness::new(1)?;
    let options = MySqlOptions::new("127.0.0.1", "nowhere", "nobody").port(1);
    let db = DatabaseConfig::MySql(options).connect(&harness.event_loop(), &harness.threads)?;
    assert_eq!(db.database_type(), DatabaseType::MySql);

    let compiled = db
        .query()
        .sql("SELECT * FROM ")
        .identifier("order")
        .sql(" WHERE id = ")
        .push_bind(5)
        .compile()?;
    assert_eq!(compiled.sql, "SELECT * FROM `order` WHERE id = ?");

    let err = db.run_raw_query("SELECT ?", Vec::new()).wait().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ParameterCountMismatch);

    db.shutdown().wait()?;
    harness.shutdown()?;
    Ok(())
}
