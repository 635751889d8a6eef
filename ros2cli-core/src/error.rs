//! Error types for ros2cli-core.

use thiserror::Error;

/// Result type for ros2cli-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while interpreting graph data, names or QoS options.
#[derive(Debug, Error)]
pub enum Error {
    /// A ROS name failed validation.
    #[error("Invalid {kind} name '{name}': {reason}")]
    InvalidName {
        /// What the name was supposed to be (topic, node, namespace...)
        kind: &'static str,
        /// The offending name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Unknown short key for a QoS preset or policy.
    #[error("Unknown {policy} short key '{key}', expected one of: {expected}")]
    UnknownShortKey {
        /// Policy (or `profile`) the key was given for
        policy: &'static str,
        /// The key as given
        key: String,
        /// Comma separated list of accepted keys
        expected: String,
    },

    /// A liveliness token did not follow the rmw_zenoh grammar.
    #[error("Malformed liveliness token '{0}'")]
    MalformedToken(String),

    /// A QoS string embedded in a liveliness token could not be decoded.
    #[error("Malformed QoS key expression '{0}'")]
    MalformedQos(String),

    /// A topic or service carries more than one type.
    #[error("'{name}' contains more than one type: [{types}]")]
    AmbiguousType {
        /// Topic or service name
        name: String,
        /// Comma separated list of types
        types: String,
    },
}
