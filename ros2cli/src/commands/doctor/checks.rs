use super::{CheckResult, DoctorCheck, DoctorContext, doctor_error, doctor_warn};
use crate::error::Result;
use ros2cli_core::GraphCache;
use ros2cli_zenoh::RMW_IMPLEMENTATION;
use std::env;

/// Topics every node carries; they never need a counterpart.
pub(crate) const IGNORED_TOPICS: [&str; 2] = ["/parameter_events", "/rosout"];

/// Problems in the ROS environment variables.
pub(crate) fn environment_problems(
    distro: Option<&str>,
    rmw: Option<&str>,
) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    match distro {
        None | Some("") => errors.push("ROS_DISTRO is not set.".to_string()),
        Some(_) => {}
    }
    if let Some(rmw) = rmw.filter(|rmw| !rmw.is_empty() && *rmw != RMW_IMPLEMENTATION) {
        warnings.push(format!(
            "RMW_IMPLEMENTATION is set to '{rmw}', only {RMW_IMPLEMENTATION} graphs are visible."
        ));
    }
    (errors, warnings)
}

/// Checks the distribution and middleware selection.
pub struct EnvironmentCheck;

impl DoctorCheck for EnvironmentCheck {
    fn category(&self) -> &'static str {
        "environment"
    }

    fn check(&self, _ctx: &DoctorContext<'_>) -> Result<CheckResult> {
        let distro = env::var("ROS_DISTRO").ok();
        let rmw = env::var("RMW_IMPLEMENTATION").ok();
        let (errors, warnings) = environment_problems(distro.as_deref(), rmw.as_deref());
        let mut result = CheckResult::default();
        for error in errors {
            doctor_error(&error);
            result.add_error();
        }
        for warning in warnings {
            doctor_warn(&warning);
            result.add_warning();
        }
        Ok(result)
    }
}

/// Topics with publishers and no subscribers, or the other way round.
pub(crate) fn topic_warnings(graph: &GraphCache) -> Vec<String> {
    graph
        .topic_names_and_types(true)
        .into_iter()
        .filter(|(topic, _)| !IGNORED_TOPICS.contains(&topic.as_str()))
        .filter_map(|(topic, _)| {
            let publishers = graph.count_publishers(&topic);
            let subscribers = graph.count_subscribers(&topic);
            if publishers > 0 && subscribers == 0 {
                Some(format!("Publisher without subscriber detected on {topic}."))
            } else if subscribers > 0 && publishers == 0 {
                Some(format!("Subscriber without publisher detected on {topic}."))
            } else {
                None
            }
        })
        .collect()
}

/// Checks that every topic has both ends connected.
pub struct TopicCheck;

impl DoctorCheck for TopicCheck {
    fn category(&self) -> &'static str {
        "topic"
    }

    fn check(&self, ctx: &DoctorContext<'_>) -> Result<CheckResult> {
        let mut result = CheckResult::default();
        for warning in topic_warnings(ctx.graph()?) {
            doctor_warn(&warning);
            result.add_warning();
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{endpoint, graph, node};

    const STRING: &str = "std_msgs::msg::dds_::String_";

    #[test]
    fn test_environment_problems() {
        let (errors, warnings) = environment_problems(None, None);
        assert_eq!(errors, ["ROS_DISTRO is not set."]);
        assert!(warnings.is_empty());

        let (errors, warnings) = environment_problems(Some("jazzy"), Some(RMW_IMPLEMENTATION));
        assert!(errors.is_empty());
        assert!(warnings.is_empty());

        let (errors, warnings) = environment_problems(Some("jazzy"), Some("rmw_fastrtps_cpp"));
        assert!(errors.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("rmw_fastrtps_cpp"));
    }

    #[test]
    fn test_topic_warnings() {
        let graph = graph(&[
            &node(0, "/", "talker"),
            &node(1, "/", "listener"),
            &endpoint(0, 1, "MP", "talker", "/chatter", STRING),
            &endpoint(1, 1, "MS", "listener", "/chatter", STRING),
            &endpoint(0, 2, "MP", "talker", "/lonely", STRING),
            &endpoint(1, 2, "MS", "listener", "/waiting", STRING),
            &endpoint(0, 3, "MP", "talker", "/rosout", STRING),
        ]);
        assert_eq!(
            topic_warnings(&graph),
            [
                "Publisher without subscriber detected on /lonely.",
                "Subscriber without publisher detected on /waiting.",
            ]
        );
    }
}
