//! `ros2 component`: inspect component containers and load or unload
//! components into them.

use crate::{
    ament::AmentIndex,
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
    msgs::{
        composition::{ListNodes, LoadNode, LoadNodeRequest, UnloadNode, UnloadNodeRequest},
        parameter::Parameter,
    },
};
use std::collections::BTreeMap;

/// Extension point of the component verbs.
pub const VERB_GROUP: &str = "ros2component.verb";

/// Resource type under which packages register their components.
pub const COMPONENTS_RESOURCE: &str = "rclcpp_components";

const LIST_NODES_TYPE: &str = "composition_interfaces/srv/ListNodes";
const LIST_NODES_SUFFIX: &str = "/_container/list_nodes";

pub(crate) fn register(registry: &mut Registry) {
    registry.add_extension_point(VERB_GROUP, "Extension point for 'component' verb extensions");
    registry.add(EntryPoint::new(
        COMMAND_GROUP,
        "component",
        "Various component related sub-commands",
        || Ok(VerbCommand::plugin("component", VERB_GROUP)),
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "types",
        "Output a list of components registered in the ament index",
        verb::<TypesVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "list",
        "Output a list of running containers and components",
        verb::<ListVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "load",
        "Load a component into a container node",
        verb::<LoadVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "unload",
        "Unload a component from a container",
        verb::<UnloadVerb>,
    ));
}

/// Component classes per package. Each resource line reads
/// `<plugin>;<library path>`.
pub(crate) fn component_types(index: &AmentIndex) -> BTreeMap<String, Vec<String>> {
    let mut types = BTreeMap::new();
    for package in index.resources(COMPONENTS_RESOURCE).into_keys() {
        let Some((content, _)) = index.resource(COMPONENTS_RESOURCE, &package) else {
            continue;
        };
        let plugins: Vec<String> = content
            .lines()
            .filter_map(|line| line.split(';').next())
            .map(str::trim)
            .filter(|plugin| !plugin.is_empty())
            .map(str::to_string)
            .collect();
        types.insert(package, plugins);
    }
    types
}

#[derive(Debug, Args)]
pub(crate) struct TypesArgs {}

#[derive(Default)]
pub(crate) struct TypesVerb;

impl Verb for TypesVerb {
    type Args = TypesArgs;

    fn main(&self, _cli: &CliContext, _args: TypesArgs) -> Result<()> {
        for (package, plugins) in component_types(&AmentIndex::from_env()?) {
            println!("{package}");
            for plugin in plugins {
                println!("  {plugin}");
            }
        }
        Ok(())
    }
}

/// Nodes serving `_container/list_nodes`, sorted.
pub(crate) fn container_names(graph: &GraphCache) -> Vec<String> {
    let mut names: Vec<String> = graph
        .service_names_and_types(true)
        .into_iter()
        .filter(|(_, types)| types.iter().any(|t| t == LIST_NODES_TYPE))
        .filter_map(|(service, _)| service.strip_suffix(LIST_NODES_SUFFIX).map(str::to_string))
        .filter(|node| graph.node_exists(node))
        .collect();
    names.sort();
    names.dedup();
    names
}

fn require_container(graph: &GraphCache, container: &str) -> Result<()> {
    if container_names(graph).iter().any(|c| c == container) {
        Ok(())
    } else {
        Err(Error::command(format!(
            "Unable to find container node '{container}'"
        )))
    }
}

async fn list_components(
    context: &Context,
    graph: &GraphCache,
    container: &str,
) -> Result<Vec<(u64, String)>> {
    let client =
        Client::<ListNodes>::new(context, graph, &format!("{container}{LIST_NODES_SUFFIX}"))?;
    let response = client.call(&Empty, SERVICE_TIMEOUT).await?;
    Ok(response
        .unique_ids
        .into_iter()
        .zip(response.full_node_names)
        .collect())
}

/// Lines listing the components of a container.
pub(crate) fn component_lines(components: &[(u64, String)]) -> Vec<String> {
    components
        .iter()
        .map(|(id, name)| format!("  {id}  {name}"))
        .collect()
}

#[derive(Debug, Args)]
pub(crate) struct ListArgs {
    /// Name of the container node to list components from
    container_node_name: Option<String>,

    /// List found containers nodes only
    #[arg(short, long)]
    containers_only: bool,
}

#[derive(Default)]
pub(crate) struct ListVerb;

async fn list(context: &Context, args: &ListArgs) -> Result<()> {
    let graph = context.graph().await?;
    if let Some(name) = &args.container_node_name {
        let container = absolute_node_name(name);
        require_container(&graph, &container)?;
        for line in component_lines(&list_components(context, &graph, &container).await?) {
            println!("{line}");
        }
        return Ok(());
    }

    for container in container_names(&graph) {
        println!("{container}");
        if args.containers_only {
            continue;
        }
        match list_components(context, &graph, &container).await {
            Ok(components) => {
                for line in component_lines(&components) {
                    println!("{line}");
                }
            }
            Err(err) => eprintln!("Failed to list components of '{container}': {err}"),
        }
    }
    Ok(())
}

impl Verb for ListVerb {
    type Args = ListArgs;

    fn main(&self, cli: &CliContext, args: ListArgs) -> Result<()> {
        cli.block_on(async {
            let context = cli.connect().await?;
            let result = list(&context, &args).await;
            finish(context, result).await
        })
    }
}

fn parse_parameters(assignments: &[String]) -> Result<Vec<Parameter>> {
    assignments
        .iter()
        .map(|assignment| {
            Parameter::from_assignment(assignment).ok_or_else(|| {
                Error::command(format!(
                    "Invalid parameter '{assignment}', expected 'name:=value'"
                ))
            })
        })
        .collect()
}

#[derive(Debug, Args)]
pub(crate) struct LoadArgs {
    /// Container node name to load component into
    container_node_name: String,

    /// Name of the package where the component is to be found
    package_name: String,

    /// Type name of the component to be loaded
    plugin_name: String,

    /// Component node name
    #[arg(short, long)]
    node_name: Option<String>,

    /// Component node namespace
    #[arg(long)]
    node_namespace: Option<String>,

    /// Component node log level
    #[arg(long, default_value_t = 0)]
    log_level: u8,

    /// Component node remapping rules, in the 'from:=to' form
    #[arg(short, long = "remap-rule", value_name = "REMAP_RULE")]
    remap_rules: Vec<String>,

    /// Component node parameters, in the 'name:=value' form
    #[arg(short, long = "parameter", value_name = "PARAMETER")]
    parameters: Vec<String>,

    /// Extra arguments for the container, in the 'name:=value' form
    #[arg(short, long = "extra-argument", value_name = "EXTRA_ARGUMENT")]
    extra_arguments: Vec<String>,
}

#[derive(Default)]
pub(crate) struct LoadVerb;

impl LoadArgs {
    fn request(&self) -> Result<LoadNodeRequest> {
        if let Some(rule) = self.remap_rules.iter().find(|r| !r.contains(":=")) {
            return Err(Error::command(format!(
                "Invalid remap rule '{rule}', expected 'from:=to'"
            )));
        }
        Ok(LoadNodeRequest {
            package_name: self.package_name.clone(),
            plugin_name: self.plugin_name.clone(),
            node_name: self.node_name.clone().unwrap_or_default(),
            node_namespace: self.node_namespace.clone().unwrap_or_default(),
            log_level: self.log_level,
            remap_rules: self.remap_rules.clone(),
            parameters: parse_parameters(&self.parameters)?,
            extra_arguments: parse_parameters(&self.extra_arguments)?,
        })
    }
}

async fn load(context: &Context, container: &str, request: LoadNodeRequest) -> Result<()> {
    let graph = context.graph().await?;
    require_container(&graph, container)?;
    let client = Client::<LoadNode>::new(
        context,
        &graph,
        &format!("{container}/_container/load_node"),
    )?;
    let response = client.call(&request, SERVICE_TIMEOUT).await?;
    if !response.success {
        return Err(Error::command(format!(
            "Failed to load component into '{container}' container node\n    {}",
            response.error_message
        )));
    }
    println!(
        "Loaded component {} into '{container}' container node as '{}'",
        response.unique_id, response.full_node_name
    );
    Ok(())
}

impl Verb for LoadVerb {
    type Args = LoadArgs;

    fn main(&self, cli: &CliContext, args: LoadArgs) -> Result<()> {
        let request = args.request()?;
        let container = absolute_node_name(&args.container_node_name);
        cli.block_on(async {
            let context = cli.connect().await?;
            let result = load(&context, &container, request).await;
            finish(context, result).await
        })
    }
}

#[derive(Debug, Args)]
pub(crate) struct UnloadArgs {
    /// Container node name to unload component from
    container_node_name: String,

    /// Unique IDs of the components to be unloaded
    #[arg(required = true)]
    component_uid: Vec<u64>,
}

#[derive(Default)]
pub(crate) struct UnloadVerb;

async fn unload(context: &Context, container: &str, ids: &[u64]) -> Result<()> {
    let graph = context.graph().await?;
    require_container(&graph, container)?;
    let client =
        Client::<UnloadNode>::new(context, &graph, &format!("{container}/_container/unload_node"))?;
    let mut failed = false;
    for &unique_id in ids {
        let response = client
            .call(&UnloadNodeRequest { unique_id }, SERVICE_TIMEOUT)
            .await?;
        if response.success {
            println!("Unloaded component {unique_id} from '{container}' container node");
        } else {
            eprintln!(
                "Failed to unload component {unique_id} from '{container}' container node\n    {}",
                response.error_message
            );
            failed = true;
        }
    }
    if failed { Err(Error::Exit(1)) } else { Ok(()) }
}

impl Verb for UnloadVerb {
    type Args = UnloadArgs;

    fn main(&self, cli: &CliContext, args: UnloadArgs) -> Result<()> {
        let container = absolute_node_name(&args.container_node_name);
        cli.block_on(async {
            let context = cli.connect().await?;
            let result = unload(&context, &container, &args.component_uid).await;
            finish(context, result).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{endpoint, graph, node};
    use ros2cli_zenoh::msgs::parameter::ParameterValue;
    use std::fs;

    #[test]
    fn test_container_names() {
        let graph = graph(&[
            &node(0, "/", "container"),
            &node(1, "/", "talker"),
            &endpoint(
                0,
                1,
                "SS",
                "container",
                "/container/_container/list_nodes",
                "composition_interfaces::srv::dds_::ListNodes_",
            ),
            &endpoint(
                1,
                1,
                "SS",
                "talker",
                "/talker/_container/list_nodes",
                "std_srvs::srv::dds_::Trigger_",
            ),
        ]);
        assert_eq!(container_names(&graph), ["/container"]);
        assert!(require_container(&graph, "/container").is_ok());
        assert_eq!(
            require_container(&graph, "/talker").unwrap_err().to_string(),
            "Unable to find container node '/talker'"
        );
    }

    #[test]
    fn test_component_types() {
        let prefix = tempfile::tempdir().unwrap();
        let dir = prefix
            .path()
            .join("share/ament_index/resource_index")
            .join(COMPONENTS_RESOURCE);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("demo_nodes_cpp"),
            "demo_nodes_cpp::Talker;lib/libtalker.so\ndemo_nodes_cpp::Listener;lib/liblistener.so\n",
        )
        .unwrap();
        let index = AmentIndex::new(vec![prefix.path().to_path_buf()]);
        let types = component_types(&index);
        assert_eq!(
            types["demo_nodes_cpp"],
            ["demo_nodes_cpp::Talker", "demo_nodes_cpp::Listener"]
        );
    }

    #[test]
    fn test_component_lines() {
        assert_eq!(
            component_lines(&[(1, "/talker".to_string()), (2, "/listener".to_string())]),
            ["  1  /talker", "  2  /listener"]
        );
    }

    #[test]
    fn test_load_request() {
        let args = LoadArgs {
            container_node_name: "/container".to_string(),
            package_name: "demo_nodes_cpp".to_string(),
            plugin_name: "demo_nodes_cpp::Talker".to_string(),
            node_name: Some("talker".to_string()),
            node_namespace: None,
            log_level: 0,
            remap_rules: vec!["chatter:=chat".to_string()],
            parameters: vec!["rate:=10".to_string()],
            extra_arguments: vec!["use_intra_process_comms:=true".to_string()],
        };
        let request = args.request().unwrap();
        assert_eq!(request.node_name, "talker");
        assert_eq!(request.node_namespace, "");
        assert_eq!(
            request.parameters,
            [Parameter::new("rate", ParameterValue::Integer(10))]
        );
        assert_eq!(
            request.extra_arguments,
            [Parameter::new("use_intra_process_comms", ParameterValue::Bool(true))]
        );

        let bad = LoadArgs {
            parameters: vec!["rate=10".to_string()],
            ..args
        };
        assert!(bad.request().is_err());
    }
}
