//! Observability setup for the robots fleet tool.

pub mod tracing_setup;
