//! Graph cache for entity discovery.
//!
//! Tracks nodes, publishers, subscribers, services, and clients in the ROS2 graph
//! using Zenoh liveliness tokens, and answers the queries the command-line verbs
//! need (names and types, per-node endpoints, counts, actions, lifecycle nodes).
//!
//! Actions are not first-class entities in rmw_zenoh: an action `/fibonacci`
//! shows up as the services `/fibonacci/_action/{send_goal,cancel_goal,get_result}`
//! and the topics `/fibonacci/_action/{feedback,status}`. Action queries are
//! derived from the `send_goal` service.
//!
//! # Reference
//!
//! See [rmw_zenoh design - Graph Cache](https://github.com/ros2/rmw_zenoh/blob/rolling/docs/design.md#graph-cache)

use crate::{
    keyexpr::{EntityKind, LIVELINESS_PREFIX, dds_type_to_ros, qos_from_keyexpr, unmangle_name},
    names::{build_node_fqn, is_hidden_name},
    qos::Profile,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Infix separating an action name from its hidden services and topics.
pub const ACTION_INFIX: &str = "/_action/";

const SEND_GOAL_SUFFIX: &str = "/_action/send_goal";
const SEND_GOAL_TYPE_SUFFIX: &str = "_SendGoal";
const GET_STATE_TYPE: &str = "lifecycle_msgs/srv/GetState";

/// Names and their (ROS) types, sorted by name.
pub type NamesAndTypes = Vec<(String, Vec<String>)>;

/// Liveliness sample kind, independent of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEvent {
    /// Token appeared
    Put,
    /// Token was dropped
    Delete,
}

/// Information about a discovered entity.
#[derive(Debug, Clone)]
pub struct EntityInfo {
    /// Domain ID
    pub domain_id: u32,
    /// Session ID (hex)
    pub session_id: String,
    /// Node ID
    pub node_id: u32,
    /// Entity ID
    pub entity_id: u32,
    /// Entity kind
    pub kind: EntityKind,
    /// SROS enclave
    pub enclave: String,
    /// Node namespace
    pub namespace: String,
    /// Node name
    pub node_name: String,
    /// Topic/service name (empty for nodes)
    pub topic_name: Option<String>,
    /// DDS type name (empty for nodes)
    pub type_name: Option<String>,
    /// Type hash (empty for nodes)
    pub type_hash: Option<String>,
    /// Endpoint QoS, when the token carried a decodable one
    pub qos: Option<Profile>,
}

impl EntityInfo {
    /// Fully qualified name of the node owning this entity.
    pub fn node_fqn(&self) -> String {
        build_node_fqn(&self.namespace, &self.node_name)
    }

    /// Type name in ROS form (`std_msgs/msg/String`).
    pub fn ros_type(&self) -> Option<String> {
        self.type_name.as_deref().map(dds_type_to_ros)
    }

    /// Namespace as ROS prints it (`/` for the root namespace).
    pub fn display_namespace(&self) -> &str {
        if self.namespace.is_empty() {
            "/"
        } else {
            &self.namespace
        }
    }
}

/// A node's name split the way `ros2 node list` needs it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeName {
    /// Fully qualified name (`/ns/name`); first so ordering follows it
    pub full_name: String,
    /// Base name
    pub name: String,
    /// Namespace (`/` for the root namespace)
    pub namespace: String,
}

impl From<&EntityInfo> for NodeName {
    fn from(info: &EntityInfo) -> Self {
        Self {
            full_name: info.node_fqn(),
            name: info.node_name.clone(),
            namespace: info.display_namespace().to_string(),
        }
    }
}

/// Graph cache storing discovered entities.
#[derive(Debug, Clone, Default)]
pub struct GraphCache {
    /// All discovered entities, keyed by liveliness token.
    entities: HashMap<String, EntityInfo>,
}

impl GraphCache {
    /// Create a new empty graph cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a liveliness token event.
    pub fn handle_liveliness_token(&mut self, key_expr: &str, event: GraphEvent) {
        match event {
            GraphEvent::Put => match Self::parse_liveliness_token(key_expr) {
                Some(info) => {
                    self.entities.insert(key_expr.to_string(), info);
                }
                None => tracing::debug!(key_expr, "ignoring unparseable liveliness token"),
            },
            GraphEvent::Delete => {
                self.entities.remove(key_expr);
            }
        }
    }

    /// Number of known entities (nodes included).
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True if nothing has been discovered.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Parse a liveliness token key expression.
    ///
    /// Format for nodes:
    /// `@ros2_lv/<domain_id>/<session_id>/<node_id>/<node_id>/<entity_kind>/<enclave>/<namespace>/<node_name>`
    ///
    /// Format for entities:
    /// `@ros2_lv/<domain_id>/<session_id>/<node_id>/<entity_id>/<entity_kind>/<enclave>/<namespace>/<node_name>/<topic>/<type>/<hash>/<qos>`
    pub fn parse_liveliness_token(key_expr: &str) -> Option<EntityInfo> {
        let parts: Vec<&str> = key_expr.split('/').collect();

        // @ros2_lv + domain + session + node_id + entity_id + kind + enclave + ns + name
        if parts.len() < 9 || parts[0] != LIVELINESS_PREFIX {
            return None;
        }

        let domain_id: u32 = parts[1].parse().ok()?;
        let session_id = parts[2].to_string();
        let node_id: u32 = parts[3].parse().ok()?;
        let entity_id: u32 = parts[4].parse().ok()?;
        let kind = EntityKind::from_code(parts[5])?;
        let enclave = unmangle_name(parts[6]);
        let namespace = unmangle_name(parts[7]);
        let node_name = parts[8].to_string();

        let (topic_name, type_name, type_hash, qos) = if kind == EntityKind::Node {
            (None, None, None, None)
        } else if parts.len() >= 12 {
            (
                Some(unmangle_name(parts[9])),
                Some(parts[10].to_string()),
                Some(parts[11].to_string()),
                parts.get(12).and_then(|q| qos_from_keyexpr(q).ok()),
            )
        } else {
            return None;
        };

        Some(EntityInfo {
            domain_id,
            session_id,
            node_id,
            entity_id,
            kind,
            enclave,
            namespace,
            node_name,
            topic_name,
            type_name,
            type_hash,
            qos,
        })
    }

    fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &EntityInfo> {
        self.entities.values().filter(move |e| e.kind == kind)
    }

    fn on_name<'a>(
        &'a self,
        kind: EntityKind,
        name: &str,
    ) -> impl Iterator<Item = &'a EntityInfo> {
        self.of_kind(kind)
            .filter(move |e| e.topic_name.as_deref() == Some(name))
    }

    fn collect_names_and_types<'a>(
        entities: impl Iterator<Item = &'a EntityInfo>,
        include_hidden: bool,
    ) -> NamesAndTypes {
        let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for entity in entities {
            let (Some(name), Some(ty)) = (&entity.topic_name, entity.ros_type()) else {
                continue;
            };
            if !include_hidden && is_hidden_name(name) {
                continue;
            }
            map.entry(name.clone()).or_default().insert(ty);
        }
        map.into_iter()
            .map(|(name, types)| (name, types.into_iter().collect()))
            .collect()
    }

    /// All nodes, sorted by fully qualified name.
    pub fn node_names(&self) -> Vec<NodeName> {
        let names: BTreeSet<NodeName> = self
            .of_kind(EntityKind::Node)
            .map(NodeName::from)
            .collect();
        names.into_iter().collect()
    }

    /// True if a node with this fully qualified name is alive.
    pub fn node_exists(&self, node_fqn: &str) -> bool {
        self.of_kind(EntityKind::Node).any(|e| e.node_fqn() == node_fqn)
    }

    /// Number of live nodes sharing this fully qualified name.
    pub fn count_nodes_named(&self, node_fqn: &str) -> usize {
        self.of_kind(EntityKind::Node)
            .filter(|e| e.node_fqn() == node_fqn)
            .count()
    }

    /// Every topic with a publisher or subscriber.
    pub fn topic_names_and_types(&self, include_hidden: bool) -> NamesAndTypes {
        Self::collect_names_and_types(
            self.entities
                .values()
                .filter(|e| matches!(e.kind, EntityKind::Publisher | EntityKind::Subscriber)),
            include_hidden,
        )
    }

    /// Every service with a server or client.
    pub fn service_names_and_types(&self, include_hidden: bool) -> NamesAndTypes {
        Self::collect_names_and_types(
            self.entities.values().filter(|e| {
                matches!(e.kind, EntityKind::ServiceServer | EntityKind::ServiceClient)
            }),
            include_hidden,
        )
    }

    /// Types announced on a topic (usually exactly one).
    pub fn topic_types(&self, topic: &str) -> Vec<String> {
        self.topic_names_and_types(true)
            .into_iter()
            .find(|(name, _)| name == topic)
            .map(|(_, types)| types)
            .unwrap_or_default()
    }

    /// Types announced on a service.
    pub fn service_types(&self, service: &str) -> Vec<String> {
        self.service_names_and_types(true)
            .into_iter()
            .find(|(name, _)| name == service)
            .map(|(_, types)| types)
            .unwrap_or_default()
    }

    fn by_node(&self, kind: EntityKind, node_fqn: &str, include_hidden: bool) -> NamesAndTypes {
        Self::collect_names_and_types(
            self.of_kind(kind).filter(|e| e.node_fqn() == node_fqn),
            include_hidden,
        )
    }

    /// Topics a node publishes.
    pub fn publisher_names_and_types_by_node(
        &self,
        node_fqn: &str,
        include_hidden: bool,
    ) -> NamesAndTypes {
        self.by_node(EntityKind::Publisher, node_fqn, include_hidden)
    }

    /// Topics a node subscribes to.
    pub fn subscriber_names_and_types_by_node(
        &self,
        node_fqn: &str,
        include_hidden: bool,
    ) -> NamesAndTypes {
        self.by_node(EntityKind::Subscriber, node_fqn, include_hidden)
    }

    /// Services a node serves.
    pub fn service_names_and_types_by_node(
        &self,
        node_fqn: &str,
        include_hidden: bool,
    ) -> NamesAndTypes {
        self.by_node(EntityKind::ServiceServer, node_fqn, include_hidden)
    }

    /// Services a node is a client of.
    pub fn client_names_and_types_by_node(
        &self,
        node_fqn: &str,
        include_hidden: bool,
    ) -> NamesAndTypes {
        self.by_node(EntityKind::ServiceClient, node_fqn, include_hidden)
    }

    /// Count publishers for a topic.
    pub fn count_publishers(&self, topic: &str) -> usize {
        self.on_name(EntityKind::Publisher, topic).count()
    }

    /// Count subscribers for a topic.
    pub fn count_subscribers(&self, topic: &str) -> usize {
        self.on_name(EntityKind::Subscriber, topic).count()
    }

    /// Count servers for a service.
    pub fn count_services(&self, service: &str) -> usize {
        self.on_name(EntityKind::ServiceServer, service).count()
    }

    /// Count clients for a service.
    pub fn count_clients(&self, service: &str) -> usize {
        self.on_name(EntityKind::ServiceClient, service).count()
    }

    fn sorted_info(&self, kind: EntityKind, name: &str) -> Vec<&EntityInfo> {
        let mut infos: Vec<&EntityInfo> = self.on_name(kind, name).collect();
        infos.sort_by(|a, b| {
            (a.node_fqn(), a.entity_id).cmp(&(b.node_fqn(), b.entity_id))
        });
        infos
    }

    /// Get publishers info for a topic, sorted by node.
    pub fn get_publishers_info(&self, topic: &str) -> Vec<&EntityInfo> {
        self.sorted_info(EntityKind::Publisher, topic)
    }

    /// Get subscribers info for a topic, sorted by node.
    pub fn get_subscribers_info(&self, topic: &str) -> Vec<&EntityInfo> {
        self.sorted_info(EntityKind::Subscriber, topic)
    }

    /// Get servers info for a service, sorted by node.
    pub fn get_servers_info(&self, service: &str) -> Vec<&EntityInfo> {
        self.sorted_info(EntityKind::ServiceServer, service)
    }

    /// Check if a service is available.
    pub fn is_service_available(&self, service_name: &str) -> bool {
        self.on_name(EntityKind::ServiceServer, service_name).next().is_some()
    }

    fn action_of(entity: &EntityInfo) -> Option<(String, String)> {
        let action = entity.topic_name.as_deref()?.strip_suffix(SEND_GOAL_SUFFIX)?;
        let ty = entity.ros_type()?;
        let ty = ty.strip_suffix(SEND_GOAL_TYPE_SUFFIX).unwrap_or(&ty).to_string();
        Some((action.to_string(), ty))
    }

    fn collect_actions<'a>(entities: impl Iterator<Item = &'a EntityInfo>) -> NamesAndTypes {
        let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (action, ty) in entities.filter_map(Self::action_of) {
            map.entry(action).or_default().insert(ty);
        }
        map.into_iter()
            .map(|(name, types)| (name, types.into_iter().collect()))
            .collect()
    }

    /// Every action with a server or client.
    pub fn action_names_and_types(&self) -> NamesAndTypes {
        Self::collect_actions(self.entities.values().filter(|e| {
            matches!(e.kind, EntityKind::ServiceServer | EntityKind::ServiceClient)
        }))
    }

    fn action_nodes(&self, kind: EntityKind, action: &str) -> NamesAndTypes {
        let send_goal = format!("{action}{SEND_GOAL_SUFFIX}");
        let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for entity in self.on_name(kind, &send_goal) {
            if let Some((_, ty)) = Self::action_of(entity) {
                map.entry(entity.node_fqn()).or_default().insert(ty);
            }
        }
        map.into_iter()
            .map(|(node, types)| (node, types.into_iter().collect()))
            .collect()
    }

    /// Nodes serving an action, with the action types they serve.
    pub fn action_servers(&self, action: &str) -> NamesAndTypes {
        self.action_nodes(EntityKind::ServiceServer, action)
    }

    /// Nodes holding a client for an action.
    pub fn action_clients(&self, action: &str) -> NamesAndTypes {
        self.action_nodes(EntityKind::ServiceClient, action)
    }

    /// Actions a node serves.
    pub fn action_server_names_and_types_by_node(&self, node_fqn: &str) -> NamesAndTypes {
        Self::collect_actions(
            self.of_kind(EntityKind::ServiceServer)
                .filter(|e| e.node_fqn() == node_fqn),
        )
    }

    /// Actions a node is a client of.
    pub fn action_client_names_and_types_by_node(&self, node_fqn: &str) -> NamesAndTypes {
        Self::collect_actions(
            self.of_kind(EntityKind::ServiceClient)
                .filter(|e| e.node_fqn() == node_fqn),
        )
    }

    /// Nodes exposing the lifecycle `get_state` service.
    pub fn lifecycle_nodes(&self) -> Vec<NodeName> {
        let managed: BTreeSet<String> = self
            .of_kind(EntityKind::ServiceServer)
            .filter(|e| e.ros_type().as_deref() == Some(GET_STATE_TYPE))
            .filter(|e| {
                e.topic_name.as_deref() == Some(format!("{}/get_state", e.node_fqn()).as_str())
            })
            .map(EntityInfo::node_fqn)
            .collect();
        self.node_names()
            .into_iter()
            .filter(|n| managed.contains(&n.full_name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qos::{DurabilityPolicy, ReliabilityPolicy};

    fn cache_with(tokens: &[&str]) -> GraphCache {
        let mut cache = GraphCache::new();
        for token in tokens {
            cache.handle_liveliness_token(token, GraphEvent::Put);
        }
        cache
    }

    // Based on: https://github.com/ros2/rmw_zenoh/blob/rolling/docs/design.md#graph-cache

    #[test]
    fn test_parse_listener_node_from_design_doc() {
        let token = "@ros2_lv/2/aac3178e146ba6f1fc6e6a4085e77f21/0/0/NN/%/%/listener";
        let info = GraphCache::parse_liveliness_token(token).unwrap();

        assert_eq!(info.domain_id, 2);
        assert_eq!(info.session_id, "aac3178e146ba6f1fc6e6a4085e77f21");
        assert_eq!(info.node_id, 0);
        assert_eq!(info.entity_id, 0);
        assert_eq!(info.kind, EntityKind::Node);
        assert_eq!(info.enclave, "");
        assert_eq!(info.namespace, "");
        assert_eq!(info.node_name, "listener");
        assert_eq!(info.node_fqn(), "/listener");
        assert!(info.topic_name.is_none());
    }

    #[test]
    fn test_parse_node_with_namespace_and_enclave() {
        let token = "@ros2_lv/0/sess/0/0/NN/%secure_enclave/%ns/secure_node";
        let info = GraphCache::parse_liveliness_token(token).unwrap();

        assert_eq!(info.enclave, "/secure_enclave");
        assert_eq!(info.namespace, "/ns");
        assert_eq!(info.node_fqn(), "/ns/secure_node");
    }

    #[test]
    fn test_parse_talker_publisher_from_design_doc() {
        let token = "@ros2_lv/2/8b20917502ee955ac4476e0266340d5c/0/10/MP/%/%/talker/%chatter/std_msgs::msg::dds_::String_/RIHS01_df668c740482bbd48fb39d76a70dfd4bd59db1288021743503259e948f6b1a18/::,7:,:,:,,";
        let info = GraphCache::parse_liveliness_token(token).unwrap();

        assert_eq!(info.kind, EntityKind::Publisher);
        assert_eq!(info.entity_id, 10);
        assert_eq!(info.topic_name.as_deref(), Some("/chatter"));
        assert_eq!(info.ros_type().as_deref(), Some("std_msgs/msg/String"));
        let qos = info.qos.unwrap();
        assert_eq!(qos.depth, 7);
        assert_eq!(qos.reliability, ReliabilityPolicy::Reliable);
        assert_eq!(qos.durability, DurabilityPolicy::Volatile);
    }

    #[test]
    fn test_parse_service_server_from_design_doc() {
        let token = "@ros2_lv/2/f9980ee0495eaafb3e38f0d19e2eae12/0/10/SS/%/%/add_two_ints_server/%add_two_ints/example_interfaces::srv::dds_::AddTwoInts_/RIHS01_e118de6bf5eeb66a2491b5bda11202e7b68f198d6f67922cf30364858239c81a/::,10:,:,:,,";
        let info = GraphCache::parse_liveliness_token(token).unwrap();

        assert_eq!(info.kind, EntityKind::ServiceServer);
        assert_eq!(info.node_name, "add_two_ints_server");
        assert_eq!(info.topic_name.as_deref(), Some("/add_two_ints"));
        assert_eq!(
            info.ros_type().as_deref(),
            Some("example_interfaces/srv/AddTwoInts")
        );
    }

    #[test]
    fn test_parse_invalid_tokens() {
        assert!(
            GraphCache::parse_liveliness_token("@invalid/0/abc123/0/0/NN/%/%/my_node").is_none()
        );
        assert!(GraphCache::parse_liveliness_token("@ros2_lv/0/abc123").is_none());
        assert!(
            GraphCache::parse_liveliness_token("@ros2_lv/0/abc123/0/0/XX/%/%/my_node").is_none()
        );
        assert!(
            GraphCache::parse_liveliness_token("@ros2_lv/not_a_number/abc123/0/0/NN/%/%/my_node")
                .is_none()
        );
        // publisher without topic/type/hash
        assert!(
            GraphCache::parse_liveliness_token("@ros2_lv/0/abc123/0/1/MP/%/%/my_node").is_none()
        );
    }

    #[test]
    fn test_unparseable_qos_is_tolerated() {
        let token = "@ros2_lv/0/sess1/0/10/MP/%/%/node1/%chatter/std_msgs::msg::dds_::String_/RIHS01_abc/qos";
        let info = GraphCache::parse_liveliness_token(token).unwrap();
        assert!(info.qos.is_none());
    }

    #[test]
    fn test_handle_liveliness_put_and_delete() {
        let token = "@ros2_lv/0/abc123/0/0/NN/%/%/my_node";
        let mut cache = cache_with(&[token]);
        assert_eq!(cache.node_names().len(), 1);
        assert!(cache.node_exists("/my_node"));

        cache.handle_liveliness_token(token, GraphEvent::Delete);
        assert!(cache.node_names().is_empty());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_node_names_sorted_with_namespace() {
        let cache = cache_with(&[
            "@ros2_lv/0/sess/2/2/NN/%/%robot1%arm/node3",
            "@ros2_lv/0/sess/0/0/NN/%/%/node1",
            "@ros2_lv/0/sess/1/1/NN/%/%robot1/node2",
        ]);

        let names = cache.node_names();
        let full: Vec<&str> = names.iter().map(|n| n.full_name.as_str()).collect();
        assert_eq!(full, ["/node1", "/robot1/arm/node3", "/robot1/node2"]);
        assert_eq!(names[0].namespace, "/");
        assert_eq!(names[2].namespace, "/robot1");
        assert_eq!(names[2].name, "node2");
    }

    #[test]
    fn test_duplicate_node_names() {
        let cache = cache_with(&[
            "@ros2_lv/0/sess1/0/0/NN/%/%/talker",
            "@ros2_lv/0/sess2/0/0/NN/%/%/talker",
            "@ros2_lv/0/sess2/1/1/NN/%/%/listener",
        ]);

        assert_eq!(cache.node_names().len(), 2);
        assert_eq!(cache.count_nodes_named("/talker"), 2);
        assert_eq!(cache.count_nodes_named("/listener"), 1);
        assert_eq!(cache.count_nodes_named("/missing"), 0);
    }

    #[test]
    fn test_counts() {
        let cache = cache_with(&[
            "@ros2_lv/0/sess1/0/10/MP/%/%/node1/%chatter/std_msgs::msg::dds_::String_/RIHS01_abc/::,10:,:,:,,",
            "@ros2_lv/0/sess2/0/10/MP/%/%/node2/%chatter/std_msgs::msg::dds_::String_/RIHS01_abc/::,10:,:,:,,",
            "@ros2_lv/0/sess3/0/11/MS/%/%/node3/%chatter/std_msgs::msg::dds_::String_/RIHS01_abc/::,10:,:,:,,",
            "@ros2_lv/0/sess/0/12/SS/%/%/server/%add_two_ints/example_interfaces::srv::dds_::AddTwoInts_/RIHS01_abc/::,10:,:,:,,",
        ]);

        assert_eq!(cache.count_publishers("/chatter"), 2);
        assert_eq!(cache.count_subscribers("/chatter"), 1);
        assert_eq!(cache.count_publishers("/nonexistent"), 0);
        assert_eq!(cache.count_services("/add_two_ints"), 1);
        assert_eq!(cache.count_clients("/add_two_ints"), 0);
        assert!(cache.is_service_available("/add_two_ints"));
        assert_eq!(cache.get_publishers_info("/chatter")[0].node_name, "node1");
    }

    #[test]
    fn test_topic_names_and_types_hides_hidden() {
        let cache = cache_with(&[
            "@ros2_lv/0/s/0/10/MP/%/%/talker/%chatter/std_msgs::msg::dds_::String_/RIHS01_abc/::,10:,:,:,,",
            "@ros2_lv/0/s/0/11/MP/%/%/talker/%_hidden/std_msgs::msg::dds_::Empty_/RIHS01_abc/::,10:,:,:,,",
            "@ros2_lv/0/s/0/12/MS/%/%/talker/%chatter/std_msgs::msg::dds_::String_/RIHS01_abc/::,10:,:,:,,",
        ]);

        let visible = cache.topic_names_and_types(false);
        assert_eq!(
            visible,
            vec![("/chatter".to_string(), vec!["std_msgs/msg/String".to_string()])]
        );
        assert_eq!(cache.topic_names_and_types(true).len(), 2);
        assert_eq!(cache.topic_types("/chatter"), ["std_msgs/msg/String"]);
        assert!(cache.topic_types("/missing").is_empty());
    }

    #[test]
    fn test_endpoints_by_node() {
        let cache = cache_with(&[
            "@ros2_lv/0/s/0/0/NN/%/%ns/talker",
            "@ros2_lv/0/s/0/10/MP/%/%ns/talker/%ns%chatter/std_msgs::msg::dds_::String_/RIHS01_abc/::,10:,:,:,,",
            "@ros2_lv/0/s/0/11/SS/%/%ns/talker/%ns%talker%get_parameters/rcl_interfaces::srv::dds_::GetParameters_/RIHS01_abc/::,10:,:,:,,",
            "@ros2_lv/0/s/1/12/MP/%/%/other/%chatter/std_msgs::msg::dds_::String_/RIHS01_abc/::,10:,:,:,,",
        ]);

        let pubs = cache.publisher_names_and_types_by_node("/ns/talker", false);
        assert_eq!(pubs.len(), 1);
        assert_eq!(pubs[0].0, "/ns/chatter");
        let services = cache.service_names_and_types_by_node("/ns/talker", false);
        assert_eq!(services[0].1, ["rcl_interfaces/srv/GetParameters"]);
        assert!(cache.subscriber_names_and_types_by_node("/ns/talker", false).is_empty());
        assert!(cache.client_names_and_types_by_node("/ns/talker", false).is_empty());
    }

    #[test]
    fn test_actions_derived_from_send_goal() {
        let cache = cache_with(&[
            "@ros2_lv/0/s/0/10/SS/%/%/fib_server/%fibonacci%_action%send_goal/example_interfaces::action::dds_::Fibonacci_SendGoal_/RIHS01_abc/::,10:,:,:,,",
            "@ros2_lv/0/s/0/11/SS/%/%/fib_server/%fibonacci%_action%cancel_goal/action_msgs::srv::dds_::CancelGoal_/RIHS01_abc/::,10:,:,:,,",
            "@ros2_lv/0/t/0/10/SC/%/%/fib_client/%fibonacci%_action%send_goal/example_interfaces::action::dds_::Fibonacci_SendGoal_/RIHS01_abc/::,10:,:,:,,",
        ]);

        assert_eq!(
            cache.action_names_and_types(),
            vec![(
                "/fibonacci".to_string(),
                vec!["example_interfaces/action/Fibonacci".to_string()]
            )]
        );
        assert_eq!(cache.action_servers("/fibonacci")[0].0, "/fib_server");
        assert_eq!(cache.action_clients("/fibonacci")[0].0, "/fib_client");
        assert_eq!(cache.action_server_names_and_types_by_node("/fib_server").len(), 1);
        assert!(cache.action_client_names_and_types_by_node("/fib_server").is_empty());
        // action services are hidden
        assert!(cache.service_names_and_types(false).is_empty());
    }

    #[test]
    fn test_lifecycle_nodes() {
        let cache = cache_with(&[
            "@ros2_lv/0/s/0/0/NN/%/%/managed",
            "@ros2_lv/0/s/1/1/NN/%/%/plain",
            "@ros2_lv/0/s/0/10/SS/%/%/managed/%managed%get_state/lifecycle_msgs::srv::dds_::GetState_/RIHS01_abc/::,10:,:,:,,",
        ]);

        let nodes = cache.lifecycle_nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].full_name, "/managed");
    }
}
