//! Built-in commands and their verbs.
//!
//! Each module registers its command under [`COMMAND_GROUP`], declares the
//! extension point of its verbs and registers them there.

pub mod action;
pub mod component;
pub mod doctor;
pub mod extensions;
pub mod interface;
pub mod lifecycle;
pub mod node;
pub mod param;
pub mod service;
pub mod topic;

use crate::{
    error::{Error, Result},
    extension::{COMMAND_GROUP, Registry},
};
use ros2cli_core::GraphCache;
use ros2cli_zenoh::Context;
use std::time::Duration;

/// Register every built-in extension point and entry point.
pub fn register_builtins(registry: &mut Registry) {
    registry.add_extension_point(COMMAND_GROUP, "Extension point for 'ros2' command extensions");
    action::register(registry);
    component::register(registry);
    doctor::register(registry);
    extensions::register(registry);
    interface::register(registry);
    lifecycle::register(registry);
    node::register(registry);
    param::register(registry);
    service::register(registry);
    topic::register(registry);
}

/// Types joined the way every listing prints them.
pub(crate) fn join_types(types: &[String]) -> String {
    types.join(", ")
}

/// Fail with `message` unless the node is part of the graph.
pub(crate) fn require_node(graph: &GraphCache, node_fqn: &str, message: &str) -> Result<()> {
    if graph.node_exists(node_fqn) {
        Ok(())
    } else {
        Err(Error::command(message))
    }
}

/// Close `context` and hand back `result`.
pub(crate) async fn finish<T>(context: Context, result: Result<T>) -> Result<T> {
    if let Err(err) = context.close().await {
        tracing::debug!(%err, "closing session failed");
    }
    result
}

/// Call `tick` every `period` until Ctrl-C.
pub(crate) async fn every_until_ctrl_c(period: Duration, mut tick: impl FnMut()) -> Result<()> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    // the first tick fires immediately; nothing has been received yet
    interval.tick().await;
    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result?;
                return Ok(());
            }
            _ = interval.tick() => tick(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use ros2cli_core::{GraphCache, GraphEvent};

    /// A graph made of the given liveliness tokens.
    pub(crate) fn graph(tokens: &[&str]) -> GraphCache {
        let mut graph = GraphCache::new();
        for token in tokens {
            graph.handle_liveliness_token(token, GraphEvent::Put);
        }
        graph
    }

    /// Liveliness token of a node.
    pub(crate) fn node(id: u32, namespace: &str, name: &str) -> String {
        format!("@ros2_lv/0/sess/{id}/0/NN/%/{}/{name}", mangle(namespace))
    }

    /// Liveliness token of an endpoint (`kind` is `MP`, `MS`, `SS` or `SC`).
    pub(crate) fn endpoint(
        id: u32,
        entity: u32,
        kind: &str,
        node: &str,
        name: &str,
        dds_type: &str,
    ) -> String {
        format!(
            "@ros2_lv/0/sess/{id}/{entity}/{kind}/%/%/{node}/{}/{dds_type}/RIHS01_00/::,10:,:,:,,",
            mangle(name)
        )
    }

    fn mangle(name: &str) -> String {
        if name.is_empty() || name == "/" {
            "%".to_string()
        } else {
            name.replace('/', "%")
        }
    }
}
