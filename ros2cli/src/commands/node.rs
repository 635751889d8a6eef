//! `ros2 node`: list nodes and show what they publish, subscribe and serve.

use crate::{
    cli::CliContext,
    error::{Error, Result},
    extension::{COMMAND_GROUP, EntryPoint, Registry, Verb, VerbCommand, verb},
};
use clap::Args;
use ros2cli_core::{GraphCache, NamesAndTypes, NodeName, names::absolute_node_name};

/// Extension point of the node verbs.
pub const VERB_GROUP: &str = "ros2node.verb";

const DUPLICATE_NODES_WARNING: &str = "WARNING: Be aware that there are nodes in the graph that \
     share an exact name, which can have unintended side effects.";

pub(crate) fn register(registry: &mut Registry) {
    registry.add_extension_point(VERB_GROUP, "Extension point for 'node' verb extensions");
    registry.add(EntryPoint::new(
        COMMAND_GROUP,
        "node",
        "Various node related sub-commands",
        || Ok(VerbCommand::plugin("node", VERB_GROUP)),
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "list",
        "Output a list of available nodes",
        verb::<ListVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "info",
        "Output information about a node",
        verb::<InfoVerb>,
    ));
}

/// Nodes to show, without hidden ones unless asked for.
pub(crate) fn visible_nodes(graph: &GraphCache, include_hidden: bool) -> Vec<NodeName> {
    graph
        .node_names()
        .into_iter()
        .filter(|node| include_hidden || !node.name.starts_with('_'))
        .collect()
}

fn has_duplicates(graph: &GraphCache, nodes: &[NodeName]) -> bool {
    nodes
        .iter()
        .any(|node| graph.count_nodes_named(&node.full_name) > 1)
}

#[derive(Debug, Args)]
pub(crate) struct ListArgs {
    /// Display all nodes even hidden ones
    #[arg(short, long)]
    all: bool,

    /// Only display the number of nodes discovered
    #[arg(short, long = "count-nodes")]
    count_nodes: bool,
}

#[derive(Default)]
pub(crate) struct ListVerb;

impl Verb for ListVerb {
    type Args = ListArgs;

    fn main(&self, cli: &CliContext, args: ListArgs) -> Result<()> {
        let graph = cli.graph()?;
        let nodes = visible_nodes(&graph, args.all);
        if args.count_nodes {
            println!("{}", nodes.len());
        } else {
            for node in &nodes {
                println!("{}", node.full_name);
            }
        }
        if has_duplicates(&graph, &nodes) {
            eprintln!("{DUPLICATE_NODES_WARNING}");
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub(crate) struct InfoArgs {
    /// Node name to request information
    node_name: String,

    /// Display hidden topics, services, and actions as well
    #[arg(long)]
    include_hidden: bool,
}

#[derive(Default)]
pub(crate) struct InfoVerb;

fn push_section(out: &mut Vec<String>, title: &str, entries: &NamesAndTypes) {
    out.push(format!("  {title}:"));
    for (name, types) in entries {
        out.push(format!("    {name}: {}", super::join_types(types)));
    }
}

/// Lines of `ros2 node info` for a node known to exist.
pub(crate) fn node_info(graph: &GraphCache, node_fqn: &str, include_hidden: bool) -> Vec<String> {
    let hide = |entries: NamesAndTypes| -> NamesAndTypes {
        entries
            .into_iter()
            .filter(|(name, _)| include_hidden || !ros2cli_core::names::is_hidden_name(name))
            .collect()
    };

    let mut out = Vec::new();
    let count = graph.count_nodes_named(node_fqn);
    if count > 1 {
        out.push(format!(
            "There are {count} nodes in the graph with the exact name \"{node_fqn}\". \
             You are seeing information about only one of them."
        ));
    }
    out.push(node_fqn.to_string());
    push_section(
        &mut out,
        "Subscribers",
        &graph.subscriber_names_and_types_by_node(node_fqn, include_hidden),
    );
    push_section(
        &mut out,
        "Publishers",
        &graph.publisher_names_and_types_by_node(node_fqn, include_hidden),
    );
    push_section(
        &mut out,
        "Service Servers",
        &graph.service_names_and_types_by_node(node_fqn, include_hidden),
    );
    push_section(
        &mut out,
        "Service Clients",
        &graph.client_names_and_types_by_node(node_fqn, include_hidden),
    );
    push_section(
        &mut out,
        "Action Servers",
        &hide(graph.action_server_names_and_types_by_node(node_fqn)),
    );
    push_section(
        &mut out,
        "Action Clients",
        &hide(graph.action_client_names_and_types_by_node(node_fqn)),
    );
    out
}

impl Verb for InfoVerb {
    type Args = InfoArgs;

    fn main(&self, cli: &CliContext, args: InfoArgs) -> Result<()> {
        let graph = cli.graph()?;
        let node_fqn = absolute_node_name(&args.node_name);
        if !graph.node_exists(&node_fqn) {
            return Err(Error::command(format!(
                "Unable to find node '{}'",
                args.node_name
            )));
        }
        for line in node_info(&graph, &node_fqn, args.include_hidden) {
            println!("{line}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{endpoint, graph, node};

    fn talker_graph() -> GraphCache {
        graph(&[
            &node(0, "/", "talker"),
            &node(1, "/", "_hidden"),
            &endpoint(0, 1, "MP", "talker", "/chatter", "std_msgs::msg::dds_::String_"),
            &endpoint(
                0,
                2,
                "SS",
                "talker",
                "/talker/_private",
                "std_srvs::srv::dds_::Empty_",
            ),
            &endpoint(
                0,
                3,
                "SS",
                "talker",
                "/fibonacci/_action/send_goal",
                "example_interfaces::action::dds_::Fibonacci_SendGoal_",
            ),
        ])
    }

    #[test]
    fn test_hidden_nodes_need_all() {
        let graph = talker_graph();
        let names: Vec<String> = visible_nodes(&graph, false)
            .into_iter()
            .map(|n| n.full_name)
            .collect();
        assert_eq!(names, ["/talker"]);
        assert_eq!(visible_nodes(&graph, true).len(), 2);
        assert!(!has_duplicates(&graph, &visible_nodes(&graph, true)));
    }

    #[test]
    fn test_duplicates_are_detected() {
        let graph = graph(&[&node(0, "/", "talker"), &node(1, "/", "talker")]);
        let nodes = visible_nodes(&graph, false);
        assert_eq!(nodes.len(), 1);
        assert!(has_duplicates(&graph, &nodes));
        let info = node_info(&graph, "/talker", false);
        assert!(info[0].starts_with("There are 2 nodes in the graph"));
    }

    #[test]
    fn test_node_info_sections() {
        let info = node_info(&talker_graph(), "/talker", false);
        assert_eq!(info[0], "/talker");
        let publishers = info.iter().position(|l| l == "  Publishers:").unwrap();
        assert_eq!(info[publishers + 1], "    /chatter: std_msgs/msg/String");
        assert!(!info.iter().any(|l| l.contains("_private")));
        let servers = info.iter().position(|l| l == "  Action Servers:").unwrap();
        assert_eq!(
            info[servers + 1],
            "    /fibonacci: example_interfaces/action/Fibonacci"
        );
        assert_eq!(info.last().unwrap(), "  Action Clients:");

        let hidden = node_info(&talker_graph(), "/talker", true);
        assert!(hidden.iter().any(|l| l.contains("/talker/_private")));
    }
}
