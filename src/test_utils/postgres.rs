use postgresql_embedded::PostgreSQL;
use tokio::runtime::Runtime;
use tracing::info;

use crate::postgres::PostgresOptions;
use crate::postgres::config::create_pool;

/// A running embedded `PostgreSQL` instance.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub database_url: String,
    /// Options that connect to the created database.
    pub options: PostgresOptions,
}

/// Start an embedded server and create `dbname` on it.
///
/// # Errors
/// Returns an error if the server cannot be installed or started, the
/// database cannot be created, or the post-start connectivity check fails.
pub fn setup_postgres_embedded(
    dbname: &str,
) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    let runtime = Runtime::new()?;
    runtime.block_on(async {
        let mut postgresql = PostgreSQL::default();
        postgresql.setup().await?;
        postgresql.start().await?;
        postgresql.create_database(dbname).await?;

        let settings = postgresql.settings();
        let options = PostgresOptions::new(settings.host.clone(), settings.port, dbname)
            .credentials(settings.username.clone(), settings.password.clone());
        let database_url = format!(
            "postgres://{}@{}:{}/{dbname}",
            settings.username, settings.host, settings.port
        );

        // Quick connection test
        let pool = create_pool(&options)?;
        let client = pool.get().await?;
        client.simple_query("SELECT 1").await?;
        drop(client);
        pool.close();

        info!(port = settings.port, %database_url, "embedded postgres started");
        Ok::<_, Box<dyn std::error::Error>>(EmbeddedPostgres {
            postgresql,
            database_url,
            options,
        })
    })
}

/// Stop a previously started embedded instance.
pub fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres { postgresql, .. } = postgres;
    if let Ok(runtime) = Runtime::new() {
        runtime.block_on(async move {
            let _ = postgresql.stop().await;
        });
    }
}
