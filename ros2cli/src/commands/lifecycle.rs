//! `ros2 lifecycle`: query and drive managed nodes.

use crate::{
    cli::{CliContext, SERVICE_TIMEOUT},
    commands::finish,
    error::{Error, Result},
    extension::{COMMAND_GROUP, EntryPoint, Registry, Verb, VerbCommand, verb},
};
use clap::Args;
use ros2cli_core::{GraphCache, names::absolute_node_name};
use ros2cli_zenoh::{
    Client, Context,
    cdr::Empty,
    msgs::lifecycle::{
        ChangeState, ChangeStateRequest, GetAvailableTransitions, GetState, State, Transition,
        TransitionDescription,
    },
};

/// Extension point of the lifecycle verbs.
pub const VERB_GROUP: &str = "ros2lifecycle.verb";

pub(crate) fn register(registry: &mut Registry) {
    registry.add_extension_point(VERB_GROUP, "Extension point for 'lifecycle' verb extensions");
    registry.add(EntryPoint::new(
        COMMAND_GROUP,
        "lifecycle",
        "Various lifecycle related sub-commands",
        || Ok(VerbCommand::plugin("lifecycle", VERB_GROUP)),
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "nodes",
        "Output a list of nodes with lifecycle",
        verb::<NodesVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "get",
        "Get lifecycle state for one or more nodes",
        verb::<GetVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "list",
        "Output a list of available transitions",
        verb::<ListVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "set",
        "Trigger lifecycle state transition",
        verb::<SetVerb>,
    ));
}

/// Full names of the managed nodes, sorted.
pub(crate) fn lifecycle_node_names(graph: &GraphCache, include_hidden: bool) -> Vec<String> {
    let mut names: Vec<String> = graph
        .lifecycle_nodes()
        .into_iter()
        .filter(|n| include_hidden || !n.name.starts_with('_'))
        .map(|n| n.full_name)
        .collect();
    names.sort();
    names.dedup();
    names
}

async fn get_state(context: &Context, graph: &GraphCache, node: &str) -> Result<State> {
    let client = Client::<GetState>::new(context, graph, &format!("{node}/get_state"))?;
    Ok(client.call(&Empty, SERVICE_TIMEOUT).await?.current_state)
}

async fn transitions(
    context: &Context,
    graph: &GraphCache,
    node: &str,
    all: bool,
) -> Result<Vec<TransitionDescription>> {
    // the full graph is served with the same type under another name
    let service = if all {
        format!("{node}/get_transition_graph")
    } else {
        format!("{node}/get_available_transitions")
    };
    let client = Client::<GetAvailableTransitions>::new(context, graph, &service)?;
    Ok(client
        .call(&Empty, SERVICE_TIMEOUT)
        .await?
        .available_transitions)
}

#[derive(Debug, Args)]
pub(crate) struct NodesArgs {
    /// Display all nodes even hidden ones
    #[arg(short, long)]
    all: bool,

    /// Only display the number of nodes discovered
    #[arg(short, long)]
    count_nodes: bool,
}

#[derive(Default)]
pub(crate) struct NodesVerb;

impl Verb for NodesVerb {
    type Args = NodesArgs;

    fn main(&self, cli: &CliContext, args: NodesArgs) -> Result<()> {
        let names = lifecycle_node_names(&cli.graph()?, args.all);
        if args.count_nodes {
            println!("{}", names.len());
        } else {
            for name in names {
                println!("{name}");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub(crate) struct GetArgs {
    /// Name of the ROS node. If no name is provided, then get the state for all nodes.
    node_name: Option<String>,

    /// Consider hidden nodes as well
    #[arg(long)]
    include_hidden_nodes: bool,
}

#[derive(Default)]
pub(crate) struct GetVerb;

/// How `ros2 lifecycle get` prints a state.
pub(crate) fn state_line(node: Option<&str>, state: &State) -> String {
    match node {
        Some(node) => format!("{node}: {} [{}]", state.label, state.id),
        None => format!("{} [{}]", state.label, state.id),
    }
}

async fn get(context: &Context, args: &GetArgs) -> Result<()> {
    let graph = context.graph().await?;
    let known = lifecycle_node_names(&graph, args.include_hidden_nodes);
    let queried = match &args.node_name {
        Some(name) => {
            let node = absolute_node_name(name);
            if !known.contains(&node) {
                return Err(Error::command("Node not found"));
            }
            vec![node]
        }
        None => known,
    };

    for node in &queried {
        match get_state(context, &graph, node).await {
            Ok(state) => {
                let prefix = args.node_name.is_none().then_some(node.as_str());
                println!("{}", state_line(prefix, &state));
            }
            Err(err) => {
                eprintln!("Exception while calling service of node '{node}': {err}");
                if args.node_name.is_some() {
                    return Err(Error::Exit(1));
                }
            }
        }
    }
    Ok(())
}

impl Verb for GetVerb {
    type Args = GetArgs;

    fn main(&self, cli: &CliContext, args: GetArgs) -> Result<()> {
        cli.block_on(async {
            let context = cli.connect().await?;
            let result = get(&context, &args).await;
            finish(context, result).await
        })
    }
}

#[derive(Debug, Args)]
pub(crate) struct ListArgs {
    /// Name of the ROS node
    node_name: String,

    /// Display all existing transitions
    #[arg(short, long)]
    all: bool,
}

#[derive(Default)]
pub(crate) struct ListVerb;

/// Lines of `ros2 lifecycle list`.
pub(crate) fn transition_lines(transitions: &[TransitionDescription]) -> Vec<String> {
    transitions
        .iter()
        .map(|t| {
            format!(
                "- {} [{}]\n\tStart: {}\n\tGoal: {}",
                t.transition.label, t.transition.id, t.start_state.label, t.goal_state.label
            )
        })
        .collect()
}

async fn with_managed_node<T>(
    cli: &CliContext,
    node_name: &str,
    f: impl AsyncFnOnce(&Context, &GraphCache, &str) -> Result<T>,
) -> Result<T> {
    let node = absolute_node_name(node_name);
    let context = cli.connect().await?;
    let result = async {
        let graph = context.graph().await?;
        if !lifecycle_node_names(&graph, true).contains(&node) {
            return Err(Error::command("Node not found"));
        }
        f(&context, &graph, &node).await
    }
    .await;
    finish(context, result).await
}

impl Verb for ListVerb {
    type Args = ListArgs;

    fn main(&self, cli: &CliContext, args: ListArgs) -> Result<()> {
        let all = args.all;
        let available = cli.block_on(with_managed_node(
            cli,
            &args.node_name,
            async move |context, graph, node| transitions(context, graph, node, all).await,
        ))?;
        for line in transition_lines(&available) {
            println!("{line}");
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub(crate) struct SetArgs {
    /// Name of the ROS node
    node_name: String,

    /// The lifecycle transition, given by label or id
    transition: String,
}

#[derive(Default)]
pub(crate) struct SetVerb;

/// The available transition named by `requested`, a label or a numeric id.
pub(crate) fn select_transition(
    available: &[TransitionDescription],
    requested: &str,
) -> Result<Transition> {
    let id = requested.parse::<u8>().ok();
    available
        .iter()
        .map(|t| &t.transition)
        .find(|t| t.label == requested || Some(t.id) == id)
        .cloned()
        .ok_or_else(|| {
            let mut message = "Unknown transition requested, available ones are:".to_string();
            for t in available {
                message.push_str(&format!("\n- {} [{}]", t.transition.label, t.transition.id));
            }
            Error::command(message)
        })
}

impl Verb for SetVerb {
    type Args = SetArgs;

    fn main(&self, cli: &CliContext, args: SetArgs) -> Result<()> {
        let requested = args.transition.clone();
        let success = cli.block_on(with_managed_node(
            cli,
            &args.node_name,
            async move |context, graph, node| {
                let available = transitions(context, graph, node, false).await?;
                let transition = select_transition(&available, &requested)?;
                let client =
                    Client::<ChangeState>::new(context, graph, &format!("{node}/change_state"))?;
                let response = client
                    .call(&ChangeStateRequest { transition }, SERVICE_TIMEOUT)
                    .await?;
                Ok(response.success)
            },
        ))?;
        if success {
            println!("Transitioning successful");
            Ok(())
        } else {
            Err(Error::command("Transitioning failed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{endpoint, graph, node};

    const GET_STATE: &str = "lifecycle_msgs::srv::dds_::GetState_";

    fn description(id: u8, label: &str, start: &str, goal: &str) -> TransitionDescription {
        TransitionDescription {
            transition: Transition {
                id,
                label: label.to_string(),
            },
            start_state: State {
                id: 1,
                label: start.to_string(),
            },
            goal_state: State {
                id: 2,
                label: goal.to_string(),
            },
        }
    }

    #[test]
    fn test_lifecycle_node_names() {
        let graph = graph(&[
            &node(0, "/", "managed"),
            &node(1, "/", "plain"),
            &node(2, "/", "_hidden"),
            &endpoint(0, 1, "SS", "managed", "/managed/get_state", GET_STATE),
            &endpoint(2, 1, "SS", "_hidden", "/_hidden/get_state", GET_STATE),
        ]);
        assert_eq!(lifecycle_node_names(&graph, false), ["/managed"]);
        assert_eq!(lifecycle_node_names(&graph, true), ["/_hidden", "/managed"]);
    }

    #[test]
    fn test_state_line() {
        let state = State {
            id: 3,
            label: "active".to_string(),
        };
        assert_eq!(state_line(None, &state), "active [3]");
        assert_eq!(state_line(Some("/talker"), &state), "/talker: active [3]");
    }

    #[test]
    fn test_transition_lines() {
        let lines = transition_lines(&[description(1, "configure", "unconfigured", "configuring")]);
        assert_eq!(
            lines,
            ["- configure [1]\n\tStart: unconfigured\n\tGoal: configuring"]
        );
    }

    #[test]
    fn test_select_transition() {
        let available = [
            description(1, "configure", "unconfigured", "configuring"),
            description(5, "shutdown", "unconfigured", "shuttingdown"),
        ];
        assert_eq!(select_transition(&available, "configure").unwrap().id, 1);
        assert_eq!(select_transition(&available, "5").unwrap().label, "shutdown");
        let err = select_transition(&available, "activate").unwrap_err().to_string();
        assert_eq!(
            err,
            "Unknown transition requested, available ones are:\n- configure [1]\n- shutdown [5]"
        );
    }
}
