use thiserror::Error;

/// Errors surfaced by fleet operations.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("robot '{0}' not found")]
    NotFound(String),

    #[error("robot '{0}' already exists")]
    AlreadyExists(String),

    #[error("invalid aspect: {0}")]
    InvalidAspect(String),

    #[error("invalid value for '{attribute}': {reason}")]
    InvalidValue { attribute: String, reason: String },

    #[error("invalid robot name: {0}")]
    InvalidName(String),

    #[error("robot '{0}' has no hostname")]
    MissingHostname(String),

    #[error("no robots registered")]
    NoRobots,

    #[error("no robots match the specified filters")]
    NoMatches,

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Errors from repository operations (used by trait definitions in robots-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for FleetError {
    fn from(e: RepositoryError) -> Self {
        FleetError::StorageError(e.to_string())
    }
}

/// Errors from the remote session / file transfer collaborator.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    #[error("failed to connect to {host}: {reason}")]
    ConnectError { host: String, reason: String },

    #[error("failed to transfer files {direction} {host}: {reason}")]
    TransferError {
        host: String,
        direction: String,
        reason: String,
    },
}
