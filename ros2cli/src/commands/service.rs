//! `ros2 service`: list services and look up their types.

use crate::{
    cli::CliContext,
    error::{Error, Result},
    extension::{COMMAND_GROUP, EntryPoint, Registry, Verb, VerbCommand, verb},
};
use clap::Args;
use ros2cli_core::{GraphCache, names::absolute_topic_name};

/// Extension point of the service verbs.
pub const VERB_GROUP: &str = "ros2service.verb";

pub(crate) fn register(registry: &mut Registry) {
    registry.add_extension_point(VERB_GROUP, "Extension point for 'service' verb extensions");
    registry.add(EntryPoint::new(
        COMMAND_GROUP,
        "service",
        "Various service related sub-commands",
        || Ok(VerbCommand::plugin("service", VERB_GROUP)),
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "list",
        "Output a list of available services",
        verb::<ListVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "type",
        "Output a service's type",
        verb::<TypeVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "find",
        "Output a list of available services of a given type",
        verb::<FindVerb>,
    ));
}

#[derive(Debug, Args)]
pub(crate) struct ListArgs {
    /// Additionally show the service type
    #[arg(short = 't', long)]
    show_types: bool,

    /// Only display the number of services discovered
    #[arg(short = 'c', long = "count-services")]
    count_services: bool,

    /// Consider hidden services as well
    #[arg(long)]
    include_hidden_services: bool,
}

#[derive(Default)]
pub(crate) struct ListVerb;

/// Lines of `ros2 service list`.
pub(crate) fn service_list(graph: &GraphCache, args: &ListArgs) -> Vec<String> {
    let services = graph.service_names_and_types(args.include_hidden_services);
    if args.count_services {
        return vec![services.len().to_string()];
    }
    services
        .into_iter()
        .map(|(name, types)| {
            if args.show_types {
                format!("{name} [{}]", super::join_types(&types))
            } else {
                name
            }
        })
        .collect()
}

impl Verb for ListVerb {
    type Args = ListArgs;

    fn main(&self, cli: &CliContext, args: ListArgs) -> Result<()> {
        for line in service_list(&cli.graph()?, &args) {
            println!("{line}");
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub(crate) struct TypeArgs {
    /// Name of the ROS service to get type (e.g. '/add_two_ints')
    service_name: String,
}

#[derive(Default)]
pub(crate) struct TypeVerb;

impl Verb for TypeVerb {
    type Args = TypeArgs;

    fn main(&self, cli: &CliContext, args: TypeArgs) -> Result<()> {
        let types = cli
            .graph()?
            .service_types(&absolute_topic_name(&args.service_name));
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
    /// Name of the ROS service type to filter for (e.g. 'rcl_interfaces/srv/ListParameters')
    service_type: String,

    /// Only display the number of services discovered
    #[arg(short = 'c', long = "count-services")]
    count_services: bool,

    /// Consider hidden services as well
    #[arg(long)]
    include_hidden_services: bool,
}

#[derive(Default)]
pub(crate) struct FindVerb;

/// Services speaking `ty`.
pub(crate) fn services_of_type(graph: &GraphCache, ty: &str, include_hidden: bool) -> Vec<String> {
    graph
        .service_names_and_types(include_hidden)
        .into_iter()
        .filter(|(_, types)| types.iter().any(|t| t == ty))
        .map(|(name, _)| name)
        .collect()
}

impl Verb for FindVerb {
    type Args = FindArgs;

    fn main(&self, cli: &CliContext, args: FindArgs) -> Result<()> {
        let services = services_of_type(
            &cli.graph()?,
            &args.service_type,
            args.include_hidden_services,
        );
        if args.count_services {
            println!("{}", services.len());
        } else {
            for service in services {
                println!("{service}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{endpoint, graph, node};

    const LIST_PARAMETERS: &str = "rcl_interfaces::srv::dds_::ListParameters_";

    fn services_graph() -> GraphCache {
        graph(&[
            &node(0, "/", "talker"),
            &endpoint(0, 1, "SS", "talker", "/talker/list_parameters", LIST_PARAMETERS),
            &endpoint(
                0,
                2,
                "SS",
                "talker",
                "/add_two_ints",
                "example_interfaces::srv::dds_::AddTwoInts_",
            ),
            &endpoint(0, 3, "SC", "talker", "/_private/list", LIST_PARAMETERS),
        ])
    }

    #[test]
    fn test_list() {
        let graph = services_graph();
        let args = ListArgs {
            show_types: false,
            count_services: false,
            include_hidden_services: false,
        };
        assert_eq!(
            service_list(&graph, &args),
            ["/add_two_ints", "/talker/list_parameters"]
        );

        let args = ListArgs {
            show_types: true,
            ..args
        };
        assert_eq!(
            service_list(&graph, &args)[0],
            "/add_two_ints [example_interfaces/srv/AddTwoInts]"
        );

        let args = ListArgs {
            count_services: true,
            include_hidden_services: true,
            ..args
        };
        assert_eq!(service_list(&graph, &args), ["3"]);
    }

    #[test]
    fn test_find() {
        let graph = services_graph();
        assert_eq!(
            services_of_type(&graph, "rcl_interfaces/srv/ListParameters", false),
            ["/talker/list_parameters"]
        );
        assert_eq!(
            services_of_type(&graph, "rcl_interfaces/srv/ListParameters", true).len(),
            2
        );
    }
}
