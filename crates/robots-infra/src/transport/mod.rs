//! Remote session and file transfer implementations.

pub mod ssh;
