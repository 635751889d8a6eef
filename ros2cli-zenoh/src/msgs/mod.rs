//! Hand-written bindings for the well-known ROS interfaces the CLI needs.
//!
//! The command-line verbs only ever talk to a fixed set of services
//! (lifecycle, parameters, composition) and read a couple of fixed action
//! introspection messages. Those are bound here directly on top of [`crate::cdr`].

use crate::cdr::{CdrDecode, CdrEncode};

/// A ROS service type with its request and response messages.
pub trait ServiceType {
    /// ROS type name, e.g. `lifecycle_msgs/srv/GetState`.
    const TYPE_NAME: &'static str;
    /// Request message.
    type Request: CdrEncode;
    /// Response message.
    type Response: CdrDecode;
}

/// Declare a service type marker.
macro_rules! service {
    ($(#[$meta:meta])* $name:ident, $type_name:literal, $req:ty, $resp:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl $crate::msgs::ServiceType for $name {
            const TYPE_NAME: &'static str = $type_name;
            type Request = $req;
            type Response = $resp;
        }
    };
}

pub(crate) use service;

pub mod action;
pub mod composition;
pub mod lifecycle;
pub mod parameter;
