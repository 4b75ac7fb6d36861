//! HTTP request handlers for the REST API.

pub mod aspect;
pub mod robot;
