// PostgreSQL backend
//
// - config: connection options and pool construction
// - params: binding `DatabaseValue`s through `ToSql`
// - query: statement execution and row decoding
// - database: the `Database` implementation

pub mod config;
mod database;
pub mod params;
pub mod query;

pub use config::PostgresOptions;
pub use database::PostgresDatabase;
pub use params::Params;
