//! Remote session and file transfer trait (port).
//!
//! The ssh/rsync implementation lives in robots-infra. The manager only
//! resolves `name -> hostname`; callers hand the hostname to a `Transport`.

use std::fmt;

use robots_types::error::TransportError;
use serde::{Deserialize, Serialize};

/// Which way files move relative to the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    /// Local -> robot.
    Push,
    /// Robot -> local.
    Pull,
}

impl TransferDirection {
    /// Preposition used in progress and error messages ("to host", "from host").
    pub fn preposition(&self) -> &'static str {
        match self {
            TransferDirection::Push => "to",
            TransferDirection::Pull => "from",
        }
    }
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::Push => write!(f, "push"),
            TransferDirection::Pull => write!(f, "pull"),
        }
    }
}

/// Opens sessions on and moves files to/from a robot's host.
///
/// Failures are reported, never retried.
pub trait Transport: Send + Sync {
    /// Open an interactive session, or run `command` remotely if given.
    fn connect(
        &self,
        hostname: &str,
        command: Option<&str>,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Copy `source` to `dest`; the remote side is chosen by `direction`.
    fn transfer(
        &self,
        hostname: &str,
        source: &str,
        dest: &str,
        direction: TransferDirection,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}
