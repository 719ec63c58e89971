//! Error types for the pfdns system
//!
//! This module defines all error types used throughout the crate.
//!
//! The variants fall into four families:
//! - **Validation** (`NameFormat`, `UnsupportedRecordType`, `TargetCount`, `InvalidInput`):
//!   the request is rejected before any remote call.
//! - **Remote phase** (`RemoteFetch`, `RemotePersist`, `RemoteReconfigure`): which step of
//!   the change pipeline failed.
//! - **Transport** (`Rpc`, `Http`, `Authentication`): raised by remote store
//!   implementations and wrapped into a remote phase error by the engine.
//! - **Ambient** (`Config`, `Json`).

use thiserror::Error;

/// Result type alias for pfdns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the pfdns system
#[derive(Error, Debug)]
pub enum Error {
    /// A record name cannot be split into (host, domain) or joined back
    #[error("Invalid record name: {0}")]
    NameFormat(String),

    /// Record type outside of the supported set
    #[error("Unsupported record type: {0} (supported: A, TXT)")]
    UnsupportedRecordType(String),

    /// Wrong number of targets for the record type
    #[error("Record {name} of type {record_type} needs exactly one target, got {count}")]
    TargetCount {
        /// Record name
        name: String,
        /// Record type
        record_type: String,
        /// Number of targets supplied
        count: usize,
    },

    /// Malformed inbound payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Fetching the remote section failed; remote state is untouched
    #[error("Failed to fetch remote section: {0}")]
    RemoteFetch(String),

    /// Writing the section back failed; remote state is unknown
    #[error("Failed to persist remote section: {0}")]
    RemotePersist(String),

    /// Section was written but a reconfigure trigger failed
    #[error("Failed to reconfigure remote services: {0}")]
    RemoteReconfigure(String),

    /// Remote procedure call errors (faults, malformed responses)
    #[error("RPC error: {0}")]
    Rpc(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a name format error
    pub fn name_format(msg: impl Into<String>) -> Self {
        Self::NameFormat(msg.into())
    }

    /// Create an unsupported record type error
    pub fn unsupported_record_type(record_type: impl Into<String>) -> Self {
        Self::UnsupportedRecordType(record_type.into())
    }

    /// Create a target count error
    pub fn target_count(name: impl Into<String>, record_type: impl Into<String>, count: usize) -> Self {
        Self::TargetCount {
            name: name.into(),
            record_type: record_type.into(),
            count,
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a remote fetch error
    pub fn remote_fetch(msg: impl Into<String>) -> Self {
        Self::RemoteFetch(msg.into())
    }

    /// Create a remote persist error
    pub fn remote_persist(msg: impl Into<String>) -> Self {
        Self::RemotePersist(msg.into())
    }

    /// Create a remote reconfigure error
    pub fn remote_reconfigure(msg: impl Into<String>) -> Self {
        Self::RemoteReconfigure(msg.into())
    }

    /// Create an RPC error
    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::Rpc(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error means the caller sent something unusable.
    ///
    /// Validation errors are raised before any remote call is made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NameFormat(_)
                | Self::UnsupportedRecordType(_)
                | Self::TargetCount { .. }
                | Self::InvalidInput(_)
        )
    }
}
