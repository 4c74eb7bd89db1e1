//! Local persistence layer for Stockroom

mod connection;
mod migrations;
mod table;

pub use connection::Database;
pub use table::{LibSqlTable, LocalStore, LocalTable, TableLock};
