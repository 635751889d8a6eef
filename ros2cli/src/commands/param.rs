//! `ros2 param`: inspect and change node parameters through the
//! `rcl_interfaces` parameter services every node serves.

use crate::{
    cli::{CliContext, SERVICE_TIMEOUT},
    commands::{finish, require_node},
    error::{Error, Result},
    extension::{COMMAND_GROUP, EntryPoint, Registry, Verb, VerbCommand, verb},
};
use clap::Args;
use regex::Regex;
use ros2cli_core::{GraphCache, names::absolute_node_name};
use ros2cli_zenoh::{
    Client, Context,
    msgs::parameter::{
        GetParameters, GetParametersRequest, ListParameters, ListParametersRequest, Parameter,
        ParameterValue, SetParameters, SetParametersRequest, SetParametersResult,
    },
    param_file::{dump_parameters, load_parameter_file},
};
use std::path::PathBuf;

/// Extension point of the param verbs.
pub const VERB_GROUP: &str = "ros2param.verb";

const NODE_NOT_FOUND: &str = "Node not found";

pub(crate) fn register(registry: &mut Registry) {
    registry.add_extension_point(VERB_GROUP, "Extension point for 'param' verb extensions");
    registry.add(EntryPoint::new(
        COMMAND_GROUP,
        "param",
        "Various param related sub-commands",
        || Ok(VerbCommand::plugin("param", VERB_GROUP)),
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "list",
        "Output a list of available parameters",
        verb::<ListVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "get",
        "Get parameter",
        verb::<GetVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "set",
        "Set parameter",
        verb::<SetVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "delete",
        "Delete parameter",
        verb::<DeleteVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "dump",
        "Show all of the parameters of a node in a YAML file format",
        verb::<DumpVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "load",
        "Load parameter file for a node",
        verb::<LoadVerb>,
    ));
}

/// Calls the parameter services of one node.
struct ParamClient<'a> {
    context: &'a Context,
    graph: &'a GraphCache,
    node: &'a str,
}

impl<'a> ParamClient<'a> {
    fn new(context: &'a Context, graph: &'a GraphCache, node: &'a str) -> Self {
        Self {
            context,
            graph,
            node,
        }
    }

    fn service(&self, name: &str) -> String {
        format!("{}/{name}", self.node)
    }

    async fn set(&self, parameters: Vec<Parameter>) -> Result<Vec<SetParametersResult>> {
        let client = Client::<SetParameters>::new(
            self.context,
            self.graph,
            &self.service("set_parameters"),
        )?;
        Ok(client
            .call(&SetParametersRequest { parameters }, SERVICE_TIMEOUT)
            .await?
            .results)
    }
}

/// The parameter calls `ros2 param list` makes on each node.
trait ParameterSource {
    async fn list(&self, prefixes: Vec<String>) -> Result<Vec<String>>;
    async fn get(&self, names: Vec<String>) -> Result<Vec<ParameterValue>>;
}

impl ParameterSource for ParamClient<'_> {
    async fn list(&self, prefixes: Vec<String>) -> Result<Vec<String>> {
        let client = Client::<ListParameters>::new(
            self.context,
            self.graph,
            &self.service("list_parameters"),
        )?;
        // depth 0 means unlimited
        let request = ListParametersRequest { prefixes, depth: 0 };
        let mut names = client.call(&request, SERVICE_TIMEOUT).await?.names;
        names.sort();
        Ok(names)
    }

    async fn get(&self, names: Vec<String>) -> Result<Vec<ParameterValue>> {
        let client = Client::<GetParameters>::new(
            self.context,
            self.graph,
            &self.service("get_parameters"),
        )?;
        let expected = names.len();
        let values = client
            .call(&GetParametersRequest { names }, SERVICE_TIMEOUT)
            .await?
            .values;
        if values.len() != expected {
            return Err(Error::command(format!(
                "Expected {expected} parameter values, got {}",
                values.len()
            )));
        }
        Ok(values)
    }
}

/// Open a session, check the node is there and run `f` against it.
fn with_node<T>(
    cli: &CliContext,
    node_name: &str,
    f: impl AsyncFnOnce(&ParamClient<'_>) -> Result<T>,
) -> Result<T> {
    let node = absolute_node_name(node_name);
    cli.block_on(async {
        let context = cli.connect().await?;
        let result = async {
            let graph = context.graph().await?;
            require_node(&graph, &node, NODE_NOT_FOUND)?;
            f(&ParamClient::new(&context, &graph, &node)).await
        }
        .await;
        finish(context, result).await
    })
}

fn set_outcome(
    result: &SetParametersResult,
    success: &str,
    failure: &str,
) -> std::result::Result<String, String> {
    if result.successful {
        Ok(success.to_string())
    } else if result.reason.is_empty() {
        Err(failure.to_string())
    } else {
        Err(format!("{failure}: {}", result.reason))
    }
}

#[derive(Debug, Args)]
pub(crate) struct ListArgs {
    /// Name of the ROS node
    node_name: Option<String>,

    /// Consider hidden nodes as well
    #[arg(long)]
    include_hidden_nodes: bool,

    /// Only list parameters with the provided prefixes
    #[arg(long, num_args = 1.., value_name = "PREFIX")]
    param_prefixes: Vec<String>,

    /// Print parameter types with parameter names
    #[arg(long)]
    param_type: bool,

    /// Only list parameters whose name matches the regular expression
    #[arg(long, value_name = "FILTER")]
    filter: Option<String>,
}

#[derive(Default)]
pub(crate) struct ListVerb;

/// Lines of one node's block in `ros2 param list`.
pub(crate) fn list_lines(
    header: Option<&str>,
    names: &[String],
    types: Option<&[ParameterValue]>,
    filter: Option<&Regex>,
) -> Vec<String> {
    let mut out: Vec<String> = header.map(|node| format!("{node}:")).into_iter().collect();
    for (i, name) in names.iter().enumerate() {
        if filter.is_some_and(|re| !re.is_match(name)) {
            continue;
        }
        match types.and_then(|types| types.get(i)) {
            Some(value) => out.push(format!("  {name} (type: {})", value.type_name())),
            None => out.push(format!("  {name}")),
        }
    }
    out
}

async fn list(context: &Context, args: &ListArgs, filter: Option<&Regex>) -> Result<()> {
    let graph = context.graph().await?;
    let node_names: Vec<String> = match &args.node_name {
        Some(name) => {
            let node = absolute_node_name(name);
            require_node(&graph, &node, NODE_NOT_FOUND)?;
            vec![node]
        }
        None => {
            let mut nodes: Vec<String> = graph
                .node_names()
                .into_iter()
                .filter(|n| args.include_hidden_nodes || !n.name.starts_with('_'))
                .map(|n| n.full_name)
                .collect();
            nodes.sort();
            nodes.dedup();
            nodes
        }
    };

    let mut sources = Vec::new();
    for node in &node_names {
        let service = format!("{node}/list_parameters");
        if !graph.is_service_available(&service) {
            tracing::debug!(%node, "no parameter services");
            continue;
        }
        sources.push((node.as_str(), ParamClient::new(context, &graph, node)));
    }
    let (lines, errors) = list_output(&sources, args, filter).await;
    for error in errors {
        eprintln!("{error}");
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

/// Output of `ros2 param list` and the errors to report. A node whose
/// calls fail is reported and skipped; the other nodes are still listed.
async fn list_output(
    sources: &[(&str, impl ParameterSource)],
    args: &ListArgs,
    filter: Option<&Regex>,
) -> (Vec<String>, Vec<String>) {
    let mut lines = Vec::new();
    let mut errors = Vec::new();
    for (node, params) in sources {
        let listing = async {
            let names = params.list(args.param_prefixes.clone()).await?;
            let types = if args.param_type {
                Some(params.get(names.clone()).await?)
            } else {
                None
            };
            Ok::<_, Error>((names, types))
        };
        match listing.await {
            Ok((names, types)) => {
                let header = args.node_name.is_none().then_some(*node);
                lines.extend(list_lines(header, &names, types.as_deref(), filter));
            }
            Err(err) => {
                errors.push(format!("Exception while calling service of node '{node}': {err}"));
            }
        }
    }
    (lines, errors)
}

impl Verb for ListVerb {
    type Args = ListArgs;

    fn main(&self, cli: &CliContext, args: ListArgs) -> Result<()> {
        let filter = args.filter.as_deref().map(Regex::new).transpose()?;
        cli.block_on(async {
            let context = cli.connect().await?;
            let result = list(&context, &args, filter.as_ref()).await;
            finish(context, result).await
        })
    }
}

#[derive(Debug, Args)]
pub(crate) struct GetArgs {
    /// Name of the ROS node
    node_name: String,

    /// Names of the parameters
    #[arg(required = true)]
    parameter_names: Vec<String>,

    /// Hide the type information
    #[arg(long)]
    hide_type: bool,
}

#[derive(Default)]
pub(crate) struct GetVerb;

/// Lines of `ros2 param get`.
pub(crate) fn get_lines(
    names: &[String],
    values: &[ParameterValue],
    hide_type: bool,
) -> Vec<String> {
    let render = |value: &ParameterValue| {
        if hide_type && *value != ParameterValue::NotSet {
            value.to_string()
        } else {
            value.describe()
        }
    };
    if let ([_], [value]) = (names, values) {
        return vec![render(value)];
    }
    names
        .iter()
        .zip(values)
        .map(|(name, value)| format!("{name}: {}", render(value)))
        .collect()
}

impl Verb for GetVerb {
    type Args = GetArgs;

    fn main(&self, cli: &CliContext, args: GetArgs) -> Result<()> {
        let names = args.parameter_names.clone();
        let values = with_node(cli, &args.node_name, async move |params| params.get(names).await)?;
        for line in get_lines(&args.parameter_names, &values, args.hide_type) {
            println!("{line}");
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub(crate) struct SetArgs {
    /// Name of the ROS node
    node_name: String,

    /// Parameter names and values, alternating (e.g. 'rate 10 use_sim_time true')
    #[arg(required = true, num_args = 2.., value_name = "NAME VALUE")]
    parameters: Vec<String>,
}

#[derive(Default)]
pub(crate) struct SetVerb;

/// Pair up `name value name value ...`.
pub(crate) fn parse_assignments(words: &[String]) -> Result<Vec<Parameter>> {
    if words.len() % 2 != 0 {
        return Err(Error::command(
            "Parameter names and values must come in pairs",
        ));
    }
    Ok(words
        .chunks(2)
        .map(|pair| Parameter::new(pair[0].clone(), ParameterValue::from_cli(&pair[1])))
        .collect())
}

fn report_set(
    names: &[String],
    results: &[SetParametersResult],
    success: &str,
    failure: &str,
) -> Result<()> {
    let mut failed = false;
    for (name, result) in names.iter().zip(results) {
        let prefixed = |text: &str| {
            if names.len() == 1 {
                text.to_string()
            } else {
                format!("{text} {name}")
            }
        };
        match set_outcome(result, &prefixed(success), &prefixed(failure)) {
            Ok(line) => println!("{line}"),
            Err(line) => {
                eprintln!("{line}");
                failed = true;
            }
        }
    }
    if failed { Err(Error::Exit(1)) } else { Ok(()) }
}

impl Verb for SetVerb {
    type Args = SetArgs;

    fn main(&self, cli: &CliContext, args: SetArgs) -> Result<()> {
        let parameters = parse_assignments(&args.parameters)?;
        let names: Vec<String> = parameters.iter().map(|p| p.name.clone()).collect();
        let results = with_node(cli, &args.node_name, async move |params| {
            params.set(parameters).await
        })?;
        report_set(&names, &results, "Set parameter successful", "Set parameter failed")
    }
}

#[derive(Debug, Args)]
pub(crate) struct DeleteArgs {
    /// Name of the ROS node
    node_name: String,

    /// Names of the parameters
    #[arg(required = true)]
    parameter_names: Vec<String>,
}

#[derive(Default)]
pub(crate) struct DeleteVerb;

impl Verb for DeleteVerb {
    type Args = DeleteArgs;

    fn main(&self, cli: &CliContext, args: DeleteArgs) -> Result<()> {
        let parameters = args
            .parameter_names
            .iter()
            .map(|name| Parameter::new(name.clone(), ParameterValue::NotSet))
            .collect();
        let results = with_node(cli, &args.node_name, async move |params| {
            params.set(parameters).await
        })?;
        report_set(
            &args.parameter_names,
            &results,
            "Deleted parameter successfully",
            "Deleting parameter failed",
        )
    }
}

#[derive(Debug, Args)]
pub(crate) struct DumpArgs {
    /// Name of the ROS node
    node_name: String,
}

#[derive(Default)]
pub(crate) struct DumpVerb;

impl Verb for DumpVerb {
    type Args = DumpArgs;

    fn main(&self, cli: &CliContext, args: DumpArgs) -> Result<()> {
        let node = absolute_node_name(&args.node_name);
        let parameters = with_node(cli, &args.node_name, async move |params| {
            let names = params.list(Vec::new()).await?;
            let values = params.get(names.clone()).await?;
            Ok(names
                .into_iter()
                .zip(values)
                .map(|(name, value)| Parameter::new(name, value))
                .collect::<Vec<_>>())
        })?;
        print!("{}", dump_parameters(&node, &parameters)?);
        Ok(())
    }
}

#[derive(Debug, Args)]
pub(crate) struct LoadArgs {
    /// Name of the ROS node
    node_name: String,

    /// Parameter file
    parameter_file: PathBuf,

    /// Do not load parameters in the '/**' namespace into the node
    #[arg(long)]
    no_use_wildcard: bool,
}

#[derive(Default)]
pub(crate) struct LoadVerb;

impl Verb for LoadVerb {
    type Args = LoadArgs;

    fn main(&self, cli: &CliContext, args: LoadArgs) -> Result<()> {
        let node = absolute_node_name(&args.node_name);
        let parameters = load_parameter_file(&args.parameter_file, &node, !args.no_use_wildcard)?;
        if parameters.is_empty() {
            return Err(Error::command(format!(
                "Param file does not contain parameters for {node}"
            )));
        }
        let names: Vec<String> = parameters.iter().map(|p| p.name.clone()).collect();
        let results = with_node(cli, &args.node_name, async move |params| {
            params.set(parameters).await
        })?;
        let mut failed = false;
        for (name, result) in names.iter().zip(&results) {
            let success = format!("Set parameter {name} successful");
            let failure = format!("Set parameter {name} failed");
            match set_outcome(result, &success, &failure) {
                Ok(line) => println!("{line}"),
                Err(line) => {
                    eprintln!("{line}");
                    failed = true;
                }
            }
        }
        if failed { Err(Error::Exit(1)) } else { Ok(()) }
    }
}
