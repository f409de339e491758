// SQLite backend
//
// - config: file/in-memory options and connection setup
// - params: conversion from `DatabaseValue` to rusqlite values
// - query: statement execution and row decoding
// - database: the `Database` implementation, offloading to a `ThreadPool`

pub mod config;
mod database;
pub mod params;
pub mod query;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use database::SqliteDatabase;
pub use params::Params;
