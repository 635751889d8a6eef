use super::{DoctorContext, DoctorReport, Report, checks::IGNORED_TOPICS};
use crate::{error::Result, table::plural};
use phf::phf_map;
use ros2cli_core::GraphCache;
use ros2cli_zenoh::RMW_IMPLEMENTATION;
use std::{env, fs};

const ROS_ENVIRONMENT_VARIABLES: &[&str] = &[
    "RCL_LOGGING_SPDLOG_EXPERIMENTAL_OLD_FLUSHING_BEHAVIOR",
    "RMW_IMPLEMENTATION",
    "ROS_AUTOMATIC_DISCOVERY_RANGE",
    "ROS_DISABLE_LOANED_MESSAGES",
    "ROS_DISTRO",
    "ROS_DOMAIN_ID",
    "ROS_HOME",
    "ROS_LOG_DIR",
    "ROS_SECURITY_ENABLE",
    "ROS_SECURITY_ENCLAVE_OVERRIDE",
    "ROS_SECURITY_KEYSTORE",
    "ROS_SECURITY_STRATEGY",
    "ROS_STATIC_PEERS",
    "ROS_TRACE_DIR",
    "TRACETOOLS_RUNTIME_DISABLE",
];

const RCUTILS_ENVIRONMENT_VARIABLES: &[&str] = &[
    "RCUTILS_COLORIZED_OUTPUT",
    "RCUTILS_CONSOLE_OUTPUT_FORMAT",
    "RCUTILS_CONSOLE_STDOUT_LINE_BUFFERED",
    "RCUTILS_LOGGING_BUFFERED_STREAM",
    "RCUTILS_LOGGING_USE_STDOUT",
];

const RMW_CONNEXTDDS: &[&str] = &[
    "RMW_CONNEXT_CYCLONE_COMPATIBILITY_MODE",
    "RMW_CONNEXT_DISABLE_FAST_ENDPOINT_DISCOVERY",
    "RMW_CONNEXT_DISABLE_LARGE_DATA_OPTIMIZATIONS",
    "RMW_CONNEXT_DISABLE_RELIABILITY_OPTIMIZATIONS",
    "RMW_CONNEXT_ENDPOINT_QOS_OVERRIDE_POLICY",
    "RMW_CONNEXT_ENV_UDP_INTERFACE",
    "RMW_CONNEXT_INITIAL_PEERS",
    "RMW_CONNEXT_OLD_RMW_COMPATIBILITY_MODE",
    "RMW_CONNEXT_PARTICIPANT_QOS_OVERRIDE_POLICY",
    "RMW_CONNEXT_REQUEST_REPLY_MAPPING",
    "RMW_CONNEXT_SECURITY_LOG_FILE",
    "RMW_CONNEXT_SECURITY_LOG_PUBLISH",
    "RMW_CONNEXT_SECURITY_LOG_VERBOSITY",
    "RMW_CONNEXT_USE_DEFAULT_PUBLISH_MODE",
];

const RMW_CYCLONEDDS: &[&str] = &["CYCLONEDDS_URI"];

const RMW_FASTRTPS: &[&str] = &[
    "FASTDDS_BUILTIN_TRANSPORTS",
    "FASTRTPS_DEFAULT_PROFILES_FILE",
    "RMW_FASTRTPS_PUBLICATION_MODE",
    "RMW_FASTRTPS_USE_QOS_FROM_XML",
];

const RMW_ZENOH_CPP: &[&str] = &[
    "RUST_LOG",
    "ZENOH_CONFIG_OVERRIDE",
    "ZENOH_ROUTER_CHECK_ATTEMPTS",
    "ZENOH_ROUTER_CONFIG_URI",
    "ZENOH_SESSION_CONFIG_URI",
];

/// Variables each middleware reads.
static RMW_ENVIRONMENT_VARIABLES: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "rmw_connextdds" => RMW_CONNEXTDDS,
    "rmw_cyclonedds_cpp" => RMW_CYCLONEDDS,
    "rmw_fastrtps_cpp" => RMW_FASTRTPS,
    "rmw_fastrtps_dynamic_cpp" => RMW_FASTRTPS,
    "rmw_zenoh_cpp" => RMW_ZENOH_CPP,
};

/// The middleware in use: `RMW_IMPLEMENTATION` when set, this tool's own
/// otherwise.
fn rmw_name() -> String {
    env::var("RMW_IMPLEMENTATION")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| RMW_IMPLEMENTATION.to_string())
}

/// Operating system description.
pub struct PlatformReport;

impl DoctorReport for PlatformReport {
    fn category(&self) -> &'static str {
        "platform"
    }

    fn report(&self, _ctx: &DoctorContext<'_>) -> Result<Report> {
        let mut report = Report::new("PLATFORM INFORMATION");
        report.add_to_report("system", env::consts::OS);
        report.add_to_report("family", env::consts::FAMILY);
        report.add_to_report("architecture", env::consts::ARCH);
        if let Ok(release) = fs::read_to_string("/proc/sys/kernel/osrelease") {
            report.add_to_report("release", release.trim());
        }
        Ok(report)
    }
}

/// `NAME=value` pairs of the variables in `keys`, sorted by name.
fn matching(vars: &[(String, String)], keys: &[&str]) -> String {
    vars.iter()
        .filter(|(key, _)| keys.contains(&key.as_str()))
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the environment report out of `vars`.
pub(crate) fn environment_report(mut vars: Vec<(String, String)>, rmw: &str) -> Report {
    vars.sort();
    let mut report = Report::new("ROS ENVIRONMENT");
    report.add_to_report(
        "ROS environment variables",
        matching(&vars, ROS_ENVIRONMENT_VARIABLES),
    );
    report.add_to_report(
        "rcutils environment variables",
        matching(&vars, RCUTILS_ENVIRONMENT_VARIABLES),
    );
    if let Some(keys) = RMW_ENVIRONMENT_VARIABLES.get(rmw) {
        report.add_to_report("rmw environment variables", matching(&vars, keys));
    }
    report
}

/// ROS, rcutils and middleware environment variables.
pub struct EnvironmentReport;

impl DoctorReport for EnvironmentReport {
    fn category(&self) -> &'static str {
        "environment"
    }

    fn report(&self, _ctx: &DoctorContext<'_>) -> Result<Report> {
        Ok(environment_report(env::vars().collect(), &rmw_name()))
    }
}

/// How this tool reaches the graph.
pub struct MiddlewareReport;

impl DoctorReport for MiddlewareReport {
    fn category(&self) -> &'static str {
        "middleware"
    }

    fn report(&self, ctx: &DoctorContext<'_>) -> Result<Report> {
        let config = ctx.cli().config();
        let mut report = Report::new("RMW MIDDLEWARE");
        report.add_to_report("middleware name", rmw_name());
        report.add_to_report("domain id", config.domain_id);
        match &config.zenoh_config {
            Some(path) => report.add_to_report("session config", path.display()),
            None => report.add_to_report("router", &config.router),
        }
        let graph = ctx.graph()?;
        report.add_to_report(
            "discovered nodes",
            plural(graph.node_names().len(), "node"),
        );
        Ok(report)
    }
}

/// Topics with their publisher and subscriber counts.
pub(crate) fn topic_report(graph: &GraphCache) -> Report {
    let mut report = Report::new("TOPIC LIST");
    let topics: Vec<String> = graph
        .topic_names_and_types(true)
        .into_iter()
        .map(|(topic, _)| topic)
        .filter(|topic| !IGNORED_TOPICS.contains(&topic.as_str()))
        .collect();
    if topics.is_empty() {
        report.add_to_report("topic", "none");
        report.add_to_report("publisher count", 0);
        report.add_to_report("subscriber count", 0);
    }
    for topic in topics {
        let publishers = graph.count_publishers(&topic);
        let subscribers = graph.count_subscribers(&topic);
        report.add_to_report("topic", topic);
        report.add_to_report("publisher count", publishers);
        report.add_to_report("subscriber count", subscribers);
    }
    report
}

/// Services with their server and client counts.
pub(crate) fn service_report(graph: &GraphCache) -> Report {
    let mut report = Report::new("SERVICE LIST");
    let services = graph.service_names_and_types(true);
    if services.is_empty() {
        report.add_to_report("service", "none");
        report.add_to_report("service count", 0);
        report.add_to_report("client count", 0);
    }
    for (service, _) in services {
        let servers = graph.count_services(&service);
        let clients = graph.count_clients(&service);
        report.add_to_report("service", service);
        report.add_to_report("service count", servers);
        report.add_to_report("client count", clients);
    }
    report
}

/// Actions with their server and client counts.
pub(crate) fn action_report(graph: &GraphCache) -> Report {
    let mut report = Report::new("ACTION LIST");
    let actions = graph.action_names_and_types();
    if actions.is_empty() {
        report.add_to_report("action", "none");
        report.add_to_report("action server count", 0);
        report.add_to_report("action client count", 0);
    }
    for (action, _) in actions {
        let servers = graph.action_servers(&action).len();
        let clients = graph.action_clients(&action).len();
        report.add_to_report("action", action);
        report.add_to_report("action server count", servers);
        report.add_to_report("action client count", clients);
    }
    report
}

/// Topic endpoint counts.
pub struct TopicReport;

impl DoctorReport for TopicReport {
    fn category(&self) -> &'static str {
        "topic"
    }

    fn report(&self, ctx: &DoctorContext<'_>) -> Result<Report> {
        Ok(topic_report(ctx.graph()?))
    }
}

/// Service endpoint counts.
pub struct ServiceReport;

impl DoctorReport for ServiceReport {
    fn category(&self) -> &'static str {
        "service"
    }

    fn report(&self, ctx: &DoctorContext<'_>) -> Result<Report> {
        Ok(service_report(ctx.graph()?))
    }
}

/// Action endpoint counts.
pub struct ActionReport;

impl DoctorReport for ActionReport {
    fn category(&self) -> &'static str {
        "action"
    }

    fn report(&self, ctx: &DoctorContext<'_>) -> Result<Report> {
        Ok(action_report(ctx.graph()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{endpoint, graph, node};

    const STRING: &str = "std_msgs::msg::dds_::String_";
    const ADD: &str = "example_interfaces::srv::dds_::AddTwoInts_";

    fn items(report: &Report) -> Vec<(&str, &str)> {
        report
            .items
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_environment_report() {
        let vars = vec![
            ("ROS_DOMAIN_ID".to_string(), "4".to_string()),
            ("ROS_DISTRO".to_string(), "jazzy".to_string()),
            ("RCUTILS_COLORIZED_OUTPUT".to_string(), "0".to_string()),
            ("ZENOH_ROUTER_CHECK_ATTEMPTS".to_string(), "10".to_string()),
            ("CYCLONEDDS_URI".to_string(), "<xml/>".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ];
        let report = environment_report(vars.clone(), "rmw_zenoh_cpp");
        assert_eq!(report.name, "ROS ENVIRONMENT");
        assert_eq!(
            items(&report),
            [
                (
                    "ROS environment variables",
                    "ROS_DISTRO=jazzy, ROS_DOMAIN_ID=4"
                ),
                ("rcutils environment variables", "RCUTILS_COLORIZED_OUTPUT=0"),
                ("rmw environment variables", "ZENOH_ROUTER_CHECK_ATTEMPTS=10"),
            ]
        );

        let report = environment_report(vars, "rmw_unknown");
        assert_eq!(report.items.len(), 2);
    }

    #[test]
    fn test_environment_report_fastrtps_dynamic() {
        let vars = vec![(
            "FASTDDS_BUILTIN_TRANSPORTS".to_string(),
            "UDPv6".to_string(),
        )];
        let report = environment_report(vars, "rmw_fastrtps_dynamic_cpp");
        assert_eq!(report.items.len(), 3);
        assert_eq!(
            items(&report)[2],
            ("rmw environment variables", "FASTDDS_BUILTIN_TRANSPORTS=UDPv6")
        );
    }

    #[test]
    fn test_topic_report() {
        assert_eq!(
            items(&topic_report(&GraphCache::new())),
            [
                ("topic", "none"),
                ("publisher count", "0"),
                ("subscriber count", "0")
            ]
        );

        let graph = graph(&[
            &node(0, "/", "talker"),
            &endpoint(0, 1, "MP", "talker", "/chatter", STRING),
            &endpoint(0, 2, "MP", "talker", "/rosout", STRING),
        ]);
        assert_eq!(
            items(&topic_report(&graph)),
            [
                ("topic", "/chatter"),
                ("publisher count", "1"),
                ("subscriber count", "0")
            ]
        );
    }

    #[test]
    fn test_service_report() {
        let graph = graph(&[
            &node(0, "/", "server"),
            &node(1, "/", "client"),
            &endpoint(0, 1, "SS", "server", "/add_two_ints", ADD),
            &endpoint(1, 1, "SC", "client", "/add_two_ints", ADD),
        ]);
        assert_eq!(
            items(&service_report(&graph)),
            [
                ("service", "/add_two_ints"),
                ("service count", "1"),
                ("client count", "1")
            ]
        );
    }

    #[test]
    fn test_action_report_empty() {
        assert_eq!(
            items(&action_report(&GraphCache::new())),
            [
                ("action", "none"),
                ("action server count", "0"),
                ("action client count", "0")
            ]
        );
    }
}
