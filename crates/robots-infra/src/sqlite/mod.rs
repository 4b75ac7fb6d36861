//! SQLite storage layer.
//!
//! Fleet repository backed by SQLite with WAL mode and split read/write
//! connection pools.

pub mod fleet;
pub mod pool;
