//! Error types for the `ros2` tool.
//!
//! Every verb returns its failure instead of printing it; the dispatcher
//! prints it once and turns it into the process exit code.

use crate::extension::LoadError;
use thiserror::Error;

/// Result type for command and verb extensions.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum Error {
    /// Graph, name or QoS error
    #[error(transparent)]
    Core(#[from] ros2cli_core::Error),

    /// Session, service or parameter file error
    #[error(transparent)]
    Zenoh(#[from] ros2cli_zenoh::Error),

    /// An extension could not be loaded
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Arguments did not match what the extension declared
    #[error(transparent)]
    Args(#[from] clap::Error),

    /// Invalid `--filter` expression
    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    /// Filesystem or process error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A command failed with a message for the user
    #[error("{0}")]
    Command(String),

    /// A command failed after reporting on its own; carries the exit code
    #[error("exit status {0}")]
    Exit(i32),
}

impl Error {
    /// Build a [`Error::Command`].
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command(message.into())
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exit(code) => *code,
            _ => 1,
        }
    }
}
