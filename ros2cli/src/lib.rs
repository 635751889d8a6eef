//! The `ros2` command-line tool.
//!
//! A dispatcher over an extension registry: commands (`node`, `topic`,
//! `param`, ...) and their verbs are entry points that are loaded lazily and
//! run with error isolation. The built-in commands observe a ROS 2 graph
//! running on `rmw_zenoh_cpp` through [`ros2cli_zenoh`].
//!
//! # Example
//!
//! ```ignore
//! use ros2cli::{cli::dispatch, extension::Registry};
//!
//! let code = dispatch(Registry::builtin(), ["ros2", "node", "list"]);
//! std::process::exit(code);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod ament;
pub mod cli;
pub mod commands;
pub mod error;
pub mod extension;
pub mod qos;
pub mod table;

pub use error::{Error, Result};
