//! Transport-independent building blocks for the `ros2` command-line tool.
//!
//! The command-line verbs never talk to the middleware directly through this
//! crate. It only holds what every verb shares:
//!
//! - [`graph`] - the ROS graph as seen through rmw_zenoh liveliness tokens
//! - [`keyexpr`] - the liveliness token grammar and name mangling
//! - [`qos`] - QoS profiles, presets and their command-line short keys
//! - [`names`] - ROS name helpers (hidden names, expansion, node FQNs)
//! - [`logger`] - one-shot tracing initialisation for the CLI

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod graph;
pub mod keyexpr;
#[cfg(feature = "logging")]
pub mod logger;
pub mod names;
pub mod qos;

pub use error::{Error, Result};
pub use graph::{EntityInfo, GraphCache, GraphEvent, NamesAndTypes, NodeName};
pub use keyexpr::EntityKind;
pub use qos::{
    DurabilityPolicy, HistoryPolicy, LivelinessPolicy, Profile, QosOverrides, ReliabilityPolicy,
};
