// MySQL backend (sqlx)
//
// - config: connection options
// - query: binding, execution and row decoding
// - database: the `Database` implementation

pub mod config;
mod database;
pub mod query;

pub use config::MySqlOptions;
pub use database::MySqlDatabase;
