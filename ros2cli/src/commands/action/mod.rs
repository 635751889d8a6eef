//! `ros2 action`: list actions, show who serves them and echo their traffic.

mod echo;

use crate::{
    cli::CliContext,
    error::{Error, Result},
    extension::{COMMAND_GROUP, EntryPoint, Registry, Verb, VerbCommand, verb},
};
use clap::Args;
use ros2cli_core::{GraphCache, NamesAndTypes, names::absolute_topic_name};

use echo::EchoVerb;

/// Extension point of the action verbs.
pub const VERB_GROUP: &str = "ros2action.verb";

pub(crate) fn register(registry: &mut Registry) {
    registry.add_extension_point(VERB_GROUP, "Extension point for 'action' verb extensions");
    registry.add(EntryPoint::new(
        COMMAND_GROUP,
        "action",
        "Various action related sub-commands",
        || Ok(VerbCommand::plugin("action", VERB_GROUP)),
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "list",
        "Output a list of action names",
        verb::<ListVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "info",
        "Print information about an action",
        verb::<InfoVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "type",
        "Print a action's type",
        verb::<TypeVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "echo",
        "Echo a action",
        verb::<EchoVerb>,
    ));
}

fn with_types(name: &str, types: &[String], show_types: bool) -> String {
    if show_types {
        format!("{name} [{}]", super::join_types(types))
    } else {
        name.to_string()
    }
}

#[derive(Debug, Args)]
pub(crate) struct ListArgs {
    /// Additionally show the action type
    #[arg(short = 't', long)]
    show_types: bool,

    /// Only display the number of actions discovered
    #[arg(short = 'c', long = "count-actions")]
    count_actions: bool,
}

#[derive(Default)]
pub(crate) struct ListVerb;

/// Lines of `ros2 action list`.
pub(crate) fn action_list(graph: &GraphCache, show_types: bool, count: bool) -> Vec<String> {
    let actions = graph.action_names_and_types();
    if count {
        return vec![actions.len().to_string()];
    }
    actions
        .iter()
        .map(|(name, types)| with_types(name, types, show_types))
        .collect()
}

impl Verb for ListVerb {
    type Args = ListArgs;

    fn main(&self, cli: &CliContext, args: ListArgs) -> Result<()> {
        for line in action_list(&cli.graph()?, args.show_types, args.count_actions) {
            println!("{line}");
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub(crate) struct InfoArgs {
    /// Name of the ROS action to get info (e.g. '/fibonacci')
    action_name: String,

    /// Additionally show the action type
    #[arg(short = 't', long)]
    show_types: bool,

    /// Only display the number of action clients and action servers
    #[arg(short, long)]
    count: bool,
}

#[derive(Default)]
pub(crate) struct InfoVerb;

/// Lines of `ros2 action info`.
pub(crate) fn action_info(
    graph: &GraphCache,
    action: &str,
    show_types: bool,
    count: bool,
) -> Vec<String> {
    let section = |out: &mut Vec<String>, title: &str, nodes: NamesAndTypes| {
        out.push(format!("{title}: {}", nodes.len()));
        if !count {
            for (node, types) in &nodes {
                out.push(format!("    {}", with_types(node, types, show_types)));
            }
        }
    };
    let mut out = vec![format!("Action: {action}")];
    section(&mut out, "Action clients", graph.action_clients(action));
    section(&mut out, "Action servers", graph.action_servers(action));
    out
}

impl Verb for InfoVerb {
    type Args = InfoArgs;

    fn main(&self, cli: &CliContext, args: InfoArgs) -> Result<()> {
        let action = absolute_topic_name(&args.action_name);
        for line in action_info(&cli.graph()?, &action, args.show_types, args.count) {
            println!("{line}");
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub(crate) struct TypeArgs {
    /// Name of the ROS action to get type (e.g. '/fibonacci')
    action_name: String,
}

#[derive(Default)]
pub(crate) struct TypeVerb;

/// Types announced for an action.
pub(crate) fn action_types(graph: &GraphCache, action: &str) -> Vec<String> {
    graph
        .action_names_and_types()
        .into_iter()
        .find(|(name, _)| name == action)
        .map(|(_, types)| types)
        .unwrap_or_default()
}

impl Verb for TypeVerb {
    type Args = TypeArgs;

    fn main(&self, cli: &CliContext, args: TypeArgs) -> Result<()> {
        let types = action_types(&cli.graph()?, &absolute_topic_name(&args.action_name));
        if types.is_empty() {
            return Err(Error::Exit(1));
        }
        for ty in types {
            println!("{ty}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{endpoint, graph, node};

    const SEND_GOAL: &str = "example_interfaces::action::dds_::Fibonacci_SendGoal_";

    fn fibonacci_graph() -> GraphCache {
        graph(&[
            &node(0, "/", "server"),
            &node(1, "/", "client"),
            &endpoint(0, 1, "SS", "server", "/fibonacci/_action/send_goal", SEND_GOAL),
            &endpoint(1, 1, "SC", "client", "/fibonacci/_action/send_goal", SEND_GOAL),
        ])
    }

    #[test]
    fn test_list() {
        let graph = fibonacci_graph();
        assert_eq!(action_list(&graph, false, false), ["/fibonacci"]);
        assert_eq!(
            action_list(&graph, true, false),
            ["/fibonacci [example_interfaces/action/Fibonacci]"]
        );
        assert_eq!(action_list(&graph, false, true), ["1"]);
    }

    #[test]
    fn test_info() {
        let graph = fibonacci_graph();
        assert_eq!(
            action_info(&graph, "/fibonacci", false, false),
            [
                "Action: /fibonacci",
                "Action clients: 1",
                "    /client",
                "Action servers: 1",
                "    /server",
            ]
        );
        assert_eq!(
            action_info(&graph, "/fibonacci", true, true),
            ["Action: /fibonacci", "Action clients: 1", "Action servers: 1"]
        );
        assert_eq!(
            action_info(&graph, "/fibonacci", true, false)[2],
            "    /client [example_interfaces/action/Fibonacci]"
        );
    }

    #[test]
    fn test_type() {
        let graph = fibonacci_graph();
        assert_eq!(
            action_types(&graph, "/fibonacci"),
            ["example_interfaces/action/Fibonacci"]
        );
        assert!(action_types(&graph, "/missing").is_empty());
    }
}
