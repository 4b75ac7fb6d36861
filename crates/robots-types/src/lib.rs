//! Shared domain types for the robots fleet tool.
//!
//! Robot and Fleet, the attribute value model, error enums and the
//! configuration file types. No infrastructure dependencies -- only serde and
//! thiserror.

pub mod config;
pub mod error;
pub mod fleet;
pub mod robot;
