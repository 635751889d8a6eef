//! `ros2 topic`: inspect topics and measure the traffic on them.

mod bw;
mod hz;

use crate::{
    cli::CliContext,
    error::{Error, Result},
    extension::{COMMAND_GROUP, EntryPoint, Registry, Verb, VerbCommand, verb},
    qos::QosArgs,
    table::plural,
};
use clap::Args;
use ros2cli_core::{EntityInfo, GraphCache, NamesAndTypes, Profile, names::absolute_topic_name};
use ros2cli_zenoh::{CallbackSubscription, Context, RawSample};

use bw::BwVerb;
use hz::HzVerb;

/// Extension point of the topic verbs.
pub const VERB_GROUP: &str = "ros2topic.verb";

pub(crate) fn register(registry: &mut Registry) {
    registry.add_extension_point(VERB_GROUP, "Extension point for 'topic' verb extensions");
    registry.add(EntryPoint::new(
        COMMAND_GROUP,
        "topic",
        "Various topic related sub-commands",
        || Ok(VerbCommand::plugin("topic", VERB_GROUP)),
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "list",
        "Output a list of available topics",
        verb::<ListVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "info",
        "Print information about a topic",
        verb::<InfoVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "type",
        "Print a topic's type",
        verb::<TypeVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "find",
        "Output a list of available topics of a given type",
        verb::<FindVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "bw",
        "Display bandwidth used by topic",
        verb::<BwVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "hz",
        "Print the average receiving rate to screen",
        verb::<HzVerb>,
    ));
}

/// Parse a strictly positive window size.
pub(crate) fn positive_int(text: &str) -> std::result::Result<usize, String> {
    match text.parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err("value must be a positive integer".to_string()),
    }
}

/// Clear the terminal before redrawing a multi-topic table.
pub(crate) fn clear_terminal() {
    print!("\x1b[2J\x1b[H");
}

/// Topics to monitor: the given names made absolute, or every topic with
/// `all`.
pub(crate) fn select_topics(
    graph: &GraphCache,
    names: &[String],
    all: bool,
    include_hidden: bool,
) -> Result<Vec<String>> {
    match (all, names.is_empty()) {
        (false, true) => Err(Error::command(
            "Either specify topic names or use --all/-a option",
        )),
        (true, false) => Err(Error::command(
            "Cannot specify both --all/-a and topic names",
        )),
        (true, true) => Ok(graph
            .topic_names_and_types(include_hidden)
            .into_iter()
            .map(|(name, _)| name)
            .collect()),
        (false, false) => Ok(names.iter().map(|n| absolute_topic_name(n)).collect()),
    }
}

/// QoS announced by the publishers of a topic.
pub(crate) fn publisher_profiles(graph: &GraphCache, topic: &str) -> Vec<Profile> {
    graph
        .get_publishers_info(topic)
        .into_iter()
        .filter_map(|info| info.qos.clone())
        .collect()
}

/// Raw subscriptions of a monitoring verb and the topics they cover.
pub(crate) struct Monitored {
    pub topics: Vec<String>,
    _subscriptions: Vec<CallbackSubscription>,
}

/// Subscribe `callback` to every topic whose type is known. Topics without
/// a type are reported and dropped; failing when none is left.
pub(crate) fn subscribe_raw<F>(
    context: &Context,
    graph: &GraphCache,
    topics: Vec<String>,
    qos: &QosArgs,
    default_preset: &str,
    callback: F,
) -> Result<Monitored>
where
    F: Fn(RawSample) + Clone + Send + Sync + 'static,
{
    let mut subscribed = Vec::new();
    let mut subscriptions = Vec::new();
    for topic in topics {
        if graph.topic_types(&topic).is_empty() {
            println!("WARNING: failed to find message type for topic [{topic}]");
            continue;
        }
        let choice = qos.choose(default_preset, &publisher_profiles(graph, &topic))?;
        for notice in &choice.notices {
            println!("{notice}");
        }
        subscriptions.push(CallbackSubscription::new(
            context,
            &topic,
            &choice.profile,
            callback.clone(),
        )?);
        println!("Subscribed to [{topic}]");
        subscribed.push(topic);
    }
    if subscribed.is_empty() {
        return Err(Error::Exit(1));
    }
    Ok(Monitored {
        topics: subscribed,
        _subscriptions: subscriptions,
    })
}

#[derive(Debug, Args)]
pub(crate) struct ListArgs {
    /// Additionally show the topic type
    #[arg(short = 't', long)]
    show_types: bool,

    /// Only display the number of topics discovered
    #[arg(short = 'c', long = "count-topics")]
    count_topics: bool,

    /// List full details about each topic
    #[arg(short, long)]
    verbose: bool,

    /// Consider hidden topics as well
    #[arg(long)]
    include_hidden_topics: bool,
}

#[derive(Default)]
pub(crate) struct ListVerb;

fn type_list(types: &[String]) -> String {
    format!("[{}]", super::join_types(types))
}

/// Lines of `ros2 topic list`.
pub(crate) fn topic_list(graph: &GraphCache, args: &ListArgs) -> Vec<String> {
    let topics = graph.topic_names_and_types(args.include_hidden_topics);
    if args.count_topics {
        return vec![topics.len().to_string()];
    }
    if args.verbose {
        let mut out = vec!["Published topics:".to_string()];
        let section = |out: &mut Vec<String>, topics: &NamesAndTypes, publishers: bool| {
            for (name, types) in topics {
                let (count, noun) = if publishers {
                    (graph.count_publishers(name), "publisher")
                } else {
                    (graph.count_subscribers(name), "subscriber")
                };
                if count > 0 {
                    out.push(format!(" * {name} {} {}", type_list(types), plural(count, noun)));
                }
            }
        };
        section(&mut out, &topics, true);
        out.push(String::new());
        out.push("Subscribed topics:".to_string());
        section(&mut out, &topics, false);
        out.push(String::new());
        return out;
    }
    topics
        .into_iter()
        .map(|(name, types)| {
            if args.show_types {
                format!("{name} {}", type_list(&types))
            } else {
                name
            }
        })
        .collect()
}

impl Verb for ListVerb {
    type Args = ListArgs;

    fn main(&self, cli: &CliContext, args: ListArgs) -> Result<()> {
        let graph = cli.graph()?;
        for line in topic_list(&graph, &args) {
            println!("{line}");
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub(crate) struct InfoArgs {
    /// Name of the ROS topic to get info (e.g. '/chatter')
    topic_name: String,

    /// Prints detailed information like the node name, node namespace,
    /// topic type, topic type hash, endpoint type and QoS profile of the
    /// publishers and subscribers to this topic
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Default)]
pub(crate) struct InfoVerb;

fn endpoint_block(out: &mut Vec<String>, info: &EntityInfo, endpoint_type: &str) {
    out.push(format!("Node name: {}", info.node_name));
    out.push(format!("Node namespace: {}", info.display_namespace()));
    out.push(format!("Topic type: {}", info.ros_type().unwrap_or_default()));
    out.push(format!(
        "Topic type hash: {}",
        info.type_hash.as_deref().unwrap_or("UNKNOWN")
    ));
    out.push(format!("Endpoint type: {endpoint_type}"));
    match &info.qos {
        Some(qos) => out.extend(qos.to_string().lines().map(str::to_string)),
        None => out.push("QoS profile: UNKNOWN".to_string()),
    }
    out.push(String::new());
}

/// Lines of `ros2 topic info`.
pub(crate) fn topic_info(graph: &GraphCache, topic: &str, verbose: bool) -> Result<Vec<String>> {
    let types = graph.topic_types(topic);
    if types.is_empty() {
        return Err(Error::command(format!("Unknown topic '{topic}'")));
    }
    let publishers = graph.get_publishers_info(topic);
    let subscribers = graph.get_subscribers_info(topic);

    let mut out = vec![format!("Type: {}", super::join_types(&types))];
    if verbose {
        out.push(String::new());
    }
    out.push(format!("Publisher count: {}", publishers.len()));
    if verbose {
        out.push(String::new());
        for info in &publishers {
            endpoint_block(&mut out, info, "PUBLISHER");
        }
    }
    out.push(format!("Subscription count: {}", subscribers.len()));
    if verbose {
        out.push(String::new());
        for info in &subscribers {
            endpoint_block(&mut out, info, "SUBSCRIPTION");
        }
    }
    Ok(out)
}

impl Verb for InfoVerb {
    type Args = InfoArgs;

    fn main(&self, cli: &CliContext, args: InfoArgs) -> Result<()> {
        let graph = cli.graph()?;
        let topic = absolute_topic_name(&args.topic_name);
        for line in topic_info(&graph, &topic, args.verbose)? {
            println!("{line}");
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub(crate) struct TypeArgs {
    /// Name of the ROS topic to get type (e.g. '/chatter')
    topic_name: String,
}

#[derive(Default)]
pub(crate) struct TypeVerb;

impl Verb for TypeVerb {
    type Args = TypeArgs;

    fn main(&self, cli: &CliContext, args: TypeArgs) -> Result<()> {
        let graph = cli.graph()?;
        let types = graph.topic_types(&absolute_topic_name(&args.topic_name));
        if types.is_empty() {
            return Err(Error::Exit(1));
        }
        for ty in types {
            println!("{ty}");
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub(crate) struct FindArgs {
    /// Name of the ROS topic type to filter for (e.g. 'std_msgs/msg/String')
    topic_type: String,

    /// Only display the number of topics discovered
    #[arg(short = 'c', long = "count-topics")]
    count_topics: bool,

    /// Consider hidden topics as well
    #[arg(long)]
    include_hidden_topics: bool,
}

#[derive(Default)]
pub(crate) struct FindVerb;

/// Topics carrying `ty`.
pub(crate) fn topics_of_type(graph: &GraphCache, ty: &str, include_hidden: bool) -> Vec<String> {
    graph
        .topic_names_and_types(include_hidden)
        .into_iter()
        .filter(|(_, types)| types.iter().any(|t| t == ty))
        .map(|(name, _)| name)
        .collect()
}

impl Verb for FindVerb {
    type Args = FindArgs;

    fn main(&self, cli: &CliContext, args: FindArgs) -> Result<()> {
        let graph = cli.graph()?;
        let topics = topics_of_type(&graph, &args.topic_type, args.include_hidden_topics);
        if args.count_topics {
            println!("{}", topics.len());
        } else {
            for topic in topics {
                println!("{topic}");
            }
        }
        Ok(())
    }
}
