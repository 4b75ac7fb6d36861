//! Infrastructure layer for the robots fleet tool.
//!
//! Contains implementations of the traits defined in `robots-core`: the
//! SQLite and JSON file fleet repositories, the ssh/rsync transport, and the
//! configuration loader.

pub mod config;
pub mod json;
pub mod sqlite;
pub mod store;
pub mod transport;
