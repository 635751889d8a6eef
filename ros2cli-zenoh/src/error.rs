//! Error types for ros2cli-zenoh.
//!
//! Wraps Zenoh failures and the transport-independent errors of
//! `ros2cli-core`.

use thiserror::Error;

/// Result type for ros2cli-zenoh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the ROS graph over Zenoh.
#[derive(Debug, Error)]
pub enum Error {
    /// Graph, name or QoS error from ros2cli-core
    #[error(transparent)]
    Core(#[from] ros2cli_core::Error),

    /// Zenoh session error
    #[error("Zenoh error: {0}")]
    Zenoh(#[from] zenoh::Error),

    /// A query reply carried an error instead of a sample
    #[error("Service replied with an error: {0}")]
    Reply(String),

    /// CDR encoding or decoding error
    #[error("CDR error: {0}")]
    Cdr(String),

    /// Invalid attachment
    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    /// Reply without the mandatory attachment
    #[error("Missing attachment in service reply")]
    MissingAttachment,

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Service not available
    #[error("Service not available: {0}")]
    ServiceNotAvailable(String),

    /// A service exists but with another type than the one requested
    #[error("Service '{service}' has type '{actual}', expected '{expected}'")]
    ServiceTypeMismatch {
        /// Service name
        service: String,
        /// Type the caller speaks
        expected: String,
        /// Type the server announces
        actual: String,
    },

    /// Timeout waiting for response
    #[error("Timeout")]
    Timeout,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Parameter file or value could not be used
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
