//! SQLite persistence for askc: the query log and usage aggregates.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
