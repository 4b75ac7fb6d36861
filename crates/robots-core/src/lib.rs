//! Business logic and port definitions for the robots fleet tool.
//!
//! This crate defines the "ports" (repository and transport traits) that the
//! infrastructure layer implements, plus the backend-agnostic fleet logic:
//! aspect registry operations, the query engine, and the `FleetManager`
//! orchestrator. It depends only on `robots-types` -- never on
//! `robots-infra` or any database/IO crate.

pub mod aspect;
pub mod query;
pub mod repository;
pub mod service;
pub mod transport;
