//! rmw_zenoh access for the `ros2` command-line tool.
//!
//! The tool is a pure observer of the ROS graph: it reads liveliness tokens,
//! subscribes to raw payloads and queries a fixed set of well-known services.
//! It speaks the same wire conventions as `rmw_zenoh_cpp` so it can talk to
//! standard ROS2 nodes running on the Zenoh RMW.
//!
//! # Architecture
//!
//! The implementation follows the [rmw_zenoh design](https://github.com/ros2/rmw_zenoh/blob/rolling/docs/design.md):
//!
//! - A [`Context`] maps to a Zenoh session and reads graph snapshots
//! - [`CallbackSubscription`] receives undecoded samples
//! - [`Client`] queries services through Zenoh queryables
//! - [`msgs`] binds the lifecycle, parameter and composition interfaces
//!
//! # Example
//!
//! ```ignore
//! use ros2cli_zenoh::{Context, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = Context::open(&SessionConfig::default()).await?;
//!     let graph = ctx.graph().await?;
//!     for node in graph.node_names() {
//!         println!("{}", node.full_name);
//!     }
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod attachment;
pub mod cdr;
mod client;
mod context;
mod error;
pub mod msgs;
pub mod param_file;
mod subscriber;

// Re-exports
pub use client::Client;
pub use context::{
    Context, DEFAULT_ROUTER_ENDPOINT, RMW_IMPLEMENTATION, ROS_DOMAIN_ID, SessionConfig,
    ZENOH_SESSION_CONFIG_URI,
};
pub use error::{Error, Result};
pub use subscriber::{CallbackSubscription, RawSample};

// Re-export core types
pub use ros2cli_core::{GraphCache, Profile};
