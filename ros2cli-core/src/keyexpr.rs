//! Liveliness token grammar used by rmw_zenoh for graph discovery.
//!
//! # Reference
//!
//! See [rmw_zenoh design - Graph Cache](https://github.com/ros2/rmw_zenoh/blob/rolling/docs/design.md#graph-cache)
//!
//! Node token:
//! `@ros2_lv/<domain_id>/<session_id>/<node_id>/<node_id>/NN/<enclave>/<namespace>/<node_name>`
//!
//! Entity token:
//! `@ros2_lv/<domain_id>/<session_id>/<node_id>/<entity_id>/<kind>/<enclave>/<namespace>/<node_name>/<name>/<type>/<hash>/<qos>`

use crate::{
    error::{Error, Result},
    qos::{DurabilityPolicy, HistoryPolicy, LivelinessPolicy, Profile, ReliabilityPolicy},
};
use std::time::Duration;

/// Prefix for ROS2 liveliness tokens (hermetic namespace).
pub const LIVELINESS_PREFIX: &str = "@ros2_lv";

/// Entity kinds for liveliness tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Node entity
    Node,
    /// Message publisher
    Publisher,
    /// Message subscriber
    Subscriber,
    /// Service server
    ServiceServer,
    /// Service client
    ServiceClient,
}

impl EntityKind {
    /// Returns the two-character code for this entity kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "NN",
            Self::Publisher => "MP",
            Self::Subscriber => "MS",
            Self::ServiceServer => "SS",
            Self::ServiceClient => "SC",
        }
    }

    /// Parse a two-character code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "NN" => Some(Self::Node),
            "MP" => Some(Self::Publisher),
            "MS" => Some(Self::Subscriber),
            "SS" => Some(Self::ServiceServer),
            "SC" => Some(Self::ServiceClient),
            _ => None,
        }
    }
}

/// Key expression matching every liveliness token of a domain.
pub fn liveliness_domain_keyexpr(domain_id: u32) -> String {
    format!("{LIVELINESS_PREFIX}/{domain_id}/**")
}

/// Build a topic/service key expression.
///
/// Format: `<domain_id>/<fully_qualified_name>/<type_name>/<type_hash>`
pub fn topic_keyexpr(domain_id: u32, fq_name: &str, type_name: &str, type_hash: &str) -> String {
    let name = fq_name.strip_prefix('/').unwrap_or(fq_name);
    format!("{domain_id}/{name}/{type_name}/{type_hash}")
}

/// Key expression matching a topic regardless of its type.
pub fn topic_wildcard_keyexpr(domain_id: u32, fq_name: &str) -> String {
    let name = fq_name.strip_prefix('/').unwrap_or(fq_name);
    format!("{domain_id}/{name}/*/*")
}

/// Mangle a name by replacing `/` with `%`.
///
/// Empty names become just `%`.
pub fn mangle_name(name: &str) -> String {
    if name.is_empty() {
        "%".to_string()
    } else {
        name.replace('/', "%")
    }
}

/// Unmangle a name by replacing `%` with `/`.
///
/// A single `%` becomes an empty string.
pub fn unmangle_name(mangled: &str) -> String {
    if mangled == "%" {
        String::new()
    } else {
        mangled.replace('%', "/")
    }
}

/// Convert a ROS type name (`std_msgs/msg/String`) to its DDS form
/// (`std_msgs::msg::dds_::String_`).
pub fn ros_type_to_dds(ros_type: &str) -> String {
    let parts: Vec<&str> = ros_type.split('/').collect();
    match parts.as_slice() {
        [package, kind, name] => format!("{package}::{kind}::dds_::{name}_"),
        _ => ros_type.to_string(),
    }
}

/// Convert a DDS type name (`std_msgs::msg::dds_::String_`) back to the ROS form
/// (`std_msgs/msg/String`). Names that do not follow the convention are returned unchanged.
pub fn dds_type_to_ros(dds_type: &str) -> String {
    let parts: Vec<&str> = dds_type.split("::").collect();
    match parts.as_slice() {
        [package, kind, "dds_", name] => {
            let name = name.strip_suffix('_').unwrap_or(name);
            format!("{package}/{kind}/{name}")
        }
        _ => dds_type.to_string(),
    }
}

// Default QoS values as defined in rmw_zenoh_cpp/src/detail/qos.cpp
const DEFAULT_RELIABILITY: u8 = 1;
const DEFAULT_DURABILITY: u8 = 2;
const DEFAULT_HISTORY: u8 = 1;
const DEFAULT_DEPTH: usize = 42;
const DEFAULT_LIVELINESS: u8 = 1;

fn reliability_to_u8(policy: ReliabilityPolicy) -> u8 {
    match policy {
        ReliabilityPolicy::SystemDefault => 0,
        ReliabilityPolicy::Reliable => 1,
        ReliabilityPolicy::BestEffort => 2,
        ReliabilityPolicy::Unknown => 3,
        ReliabilityPolicy::BestAvailable => 4,
    }
}

fn reliability_from_u8(value: u8) -> ReliabilityPolicy {
    match value {
        0 => ReliabilityPolicy::SystemDefault,
        1 => ReliabilityPolicy::Reliable,
        2 => ReliabilityPolicy::BestEffort,
        4 => ReliabilityPolicy::BestAvailable,
        _ => ReliabilityPolicy::Unknown,
    }
}

fn durability_to_u8(policy: DurabilityPolicy) -> u8 {
    match policy {
        DurabilityPolicy::SystemDefault => 0,
        DurabilityPolicy::TransientLocal => 1,
        DurabilityPolicy::Volatile => 2,
        DurabilityPolicy::Unknown => 3,
        DurabilityPolicy::BestAvailable => 4,
    }
}

fn durability_from_u8(value: u8) -> DurabilityPolicy {
    match value {
        0 => DurabilityPolicy::SystemDefault,
        1 => DurabilityPolicy::TransientLocal,
        2 => DurabilityPolicy::Volatile,
        4 => DurabilityPolicy::BestAvailable,
        _ => DurabilityPolicy::Unknown,
    }
}

fn history_to_u8(policy: HistoryPolicy) -> u8 {
    match policy {
        HistoryPolicy::SystemDefault => 0,
        HistoryPolicy::KeepLast => 1,
        HistoryPolicy::KeepAll => 2,
        HistoryPolicy::Unknown => 3,
    }
}

fn history_from_u8(value: u8) -> HistoryPolicy {
    match value {
        0 => HistoryPolicy::SystemDefault,
        1 => HistoryPolicy::KeepLast,
        2 => HistoryPolicy::KeepAll,
        _ => HistoryPolicy::Unknown,
    }
}

fn liveliness_to_u8(policy: LivelinessPolicy) -> u8 {
    match policy {
        LivelinessPolicy::SystemDefault => 0,
        LivelinessPolicy::Automatic => 1,
        LivelinessPolicy::ManualByTopic => 2,
        LivelinessPolicy::Unknown => 3,
        LivelinessPolicy::BestAvailable => 4,
    }
}

fn liveliness_from_u8(value: u8) -> LivelinessPolicy {
    match value {
        0 => LivelinessPolicy::SystemDefault,
        1 => LivelinessPolicy::Automatic,
        2 => LivelinessPolicy::ManualByTopic,
        4 => LivelinessPolicy::BestAvailable,
        _ => LivelinessPolicy::Unknown,
    }
}

fn push_if(keyexpr: &mut String, value: u64, default: u64) {
    if value != default {
        keyexpr.push_str(&value.to_string());
    }
}

fn push_duration(keyexpr: &mut String, duration: Duration) {
    if !duration.is_zero() {
        keyexpr.push_str(&duration.as_secs().to_string());
    }
    keyexpr.push(',');
    if !duration.is_zero() {
        keyexpr.push_str(&duration.subsec_nanos().to_string());
    }
}

/// Encode a QoS profile to the compact key expression form.
///
/// Format: `<Reliability>:<Durability>:<History>,<Depth>:<DeadlineSec>,<DeadlineNSec>:<LifespanSec>,<LifespanNSec>:<Liveliness>,<LivelinessSec>,<LivelinessNSec>`
///
/// Values equal to the rmw_zenoh defaults are left empty.
pub fn qos_to_keyexpr(qos: &Profile) -> String {
    let mut keyexpr = String::new();

    push_if(
        &mut keyexpr,
        reliability_to_u8(qos.reliability).into(),
        DEFAULT_RELIABILITY.into(),
    );
    keyexpr.push(':');
    push_if(
        &mut keyexpr,
        durability_to_u8(qos.durability).into(),
        DEFAULT_DURABILITY.into(),
    );
    keyexpr.push(':');
    push_if(
        &mut keyexpr,
        history_to_u8(qos.history).into(),
        DEFAULT_HISTORY.into(),
    );
    keyexpr.push(',');
    push_if(&mut keyexpr, qos.depth as u64, DEFAULT_DEPTH as u64);
    keyexpr.push(':');
    push_duration(&mut keyexpr, qos.deadline);
    keyexpr.push(':');
    push_duration(&mut keyexpr, qos.lifespan);
    keyexpr.push(':');
    push_if(
        &mut keyexpr,
        liveliness_to_u8(qos.liveliness).into(),
        DEFAULT_LIVELINESS.into(),
    );
    keyexpr.push(',');
    push_duration(&mut keyexpr, qos.liveliness_lease_duration);

    keyexpr
}

/// Decode the compact QoS key expression written by [`qos_to_keyexpr`]
/// (and by rmw_zenoh_cpp). Empty fields take the rmw_zenoh defaults.
pub fn qos_from_keyexpr(keyexpr: &str) -> Result<Profile> {
    let malformed = || Error::MalformedQos(keyexpr.to_string());
    let sections: Vec<&str> = keyexpr.split(':').collect();
    if sections.len() != 6 {
        return Err(malformed());
    }

    fn field<T: std::str::FromStr>(s: &str, default: T) -> Option<T> {
        if s.is_empty() {
            Some(default)
        } else {
            s.parse().ok()
        }
    }

    fn duration(section: &str) -> Option<Duration> {
        let (secs, nanos) = section.split_once(',')?;
        let secs: u64 = field(secs, 0)?;
        let nanos: u32 = field(nanos, 0)?;
        Some(Duration::new(secs, nanos))
    }

    let reliability = field(sections[0], DEFAULT_RELIABILITY).ok_or_else(malformed)?;
    let durability = field(sections[1], DEFAULT_DURABILITY).ok_or_else(malformed)?;
    let (history, depth) = sections[2].split_once(',').ok_or_else(malformed)?;
    let history = field(history, DEFAULT_HISTORY).ok_or_else(malformed)?;
    let depth = field(depth, DEFAULT_DEPTH).ok_or_else(malformed)?;
    let deadline = duration(sections[3]).ok_or_else(malformed)?;
    let lifespan = duration(sections[4]).ok_or_else(malformed)?;
    let (liveliness, lease) = sections[5].split_once(',').ok_or_else(malformed)?;
    let liveliness = field(liveliness, DEFAULT_LIVELINESS).ok_or_else(malformed)?;
    let lease = duration(lease).ok_or_else(malformed)?;

    Ok(Profile {
        history: history_from_u8(history),
        depth,
        reliability: reliability_from_u8(reliability),
        durability: durability_from_u8(durability),
        deadline,
        lifespan,
        liveliness: liveliness_from_u8(liveliness),
        liveliness_lease_duration: lease,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mangle_unmangle() {
        assert_eq!(mangle_name("/robot1/cmd_vel"), "%robot1%cmd_vel");
        assert_eq!(mangle_name(""), "%");
        assert_eq!(mangle_name("simple"), "simple");

        assert_eq!(unmangle_name("%robot1%cmd_vel"), "/robot1/cmd_vel");
        assert_eq!(unmangle_name("%"), "");
    }

    #[test]
    fn test_topic_keyexpr_with_namespace() {
        let key = topic_keyexpr(
            0,
            "/robot1/chatter",
            "std_msgs::msg::dds_::String_",
            "RIHS01_df668c740482bbd48fb39d76a70dfd4bd59db1288021743503259e948f6b1a18",
        );
        assert_eq!(
            key,
            "0/robot1/chatter/std_msgs::msg::dds_::String_/RIHS01_df668c740482bbd48fb39d76a70dfd4bd59db1288021743503259e948f6b1a18"
        );
        assert_eq!(topic_wildcard_keyexpr(3, "/chatter"), "3/chatter/*/*");
    }

    #[test]
    fn test_type_name_conversion() {
        assert_eq!(
            dds_type_to_ros("std_msgs::msg::dds_::String_"),
            "std_msgs/msg/String"
        );
        assert_eq!(
            dds_type_to_ros("example_interfaces::action::dds_::Fibonacci_FeedbackMessage_"),
            "example_interfaces/action/Fibonacci_FeedbackMessage"
        );
        assert_eq!(
            ros_type_to_dds("lifecycle_msgs/srv/GetState"),
            "lifecycle_msgs::srv::dds_::GetState_"
        );
        assert_eq!(dds_type_to_ros("weird"), "weird");
    }

    #[test]
    fn test_default_qos_from_design_doc() {
        // `::,10:,:,:,,` is what a default publisher with depth 10 announces.
        let qos = qos_from_keyexpr("::,10:,:,:,,").unwrap();
        assert_eq!(qos.reliability, ReliabilityPolicy::Reliable);
        assert_eq!(qos.durability, DurabilityPolicy::Volatile);
        assert_eq!(qos.history, HistoryPolicy::KeepLast);
        assert_eq!(qos.depth, 10);
        assert_eq!(qos.liveliness, LivelinessPolicy::Automatic);
        assert!(qos.deadline.is_zero());
    }

    #[test]
    fn test_qos_keyexpr_encoding() {
        let profile = Profile {
            reliability: ReliabilityPolicy::BestEffort,
            durability: DurabilityPolicy::TransientLocal,
            depth: 5,
            liveliness: LivelinessPolicy::Automatic,
            deadline: Duration::new(1, 500),
            ..Default::default()
        };
        let encoded = qos_to_keyexpr(&profile);
        assert_eq!(encoded, "2:1:,5:1,500:,:,,");
        assert_eq!(qos_from_keyexpr(&encoded).unwrap(), profile);
    }

    #[test]
    fn test_malformed_qos() {
        assert!(qos_from_keyexpr("qos").is_err());
        assert!(qos_from_keyexpr("x::,10:,:,:,,").is_err());
        assert!(qos_from_keyexpr("::10:,:,:,,").is_err());
    }
}
