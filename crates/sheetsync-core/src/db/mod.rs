//! Database layer for sheetsync

mod connection;
mod migrations;

pub use connection::Database;
