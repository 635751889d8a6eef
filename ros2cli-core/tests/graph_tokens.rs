//! Graph queries over tokens built the way rmw_zenoh announces entities.

use ros2cli_core::{
    GraphCache, GraphEvent, Profile,
    keyexpr::{LIVELINESS_PREFIX, mangle_name, qos_to_keyexpr, ros_type_to_dds},
};

fn node_token(id: u32, namespace: &str, name: &str) -> String {
    format!(
        "{LIVELINESS_PREFIX}/0/session{id}/{id}/{id}/NN/%/{}/{name}",
        mangle_name(namespace)
    )
}

fn endpoint_token(
    id: u32,
    entity: u32,
    kind: &str,
    namespace: &str,
    node: &str,
    topic: &str,
    ros_type: &str,
    qos: &Profile,
) -> String {
    format!(
        "{LIVELINESS_PREFIX}/0/session{id}/{id}/{entity}/{kind}/%/{}/{node}/{}/{}/RIHS01_00/{}",
        mangle_name(namespace),
        mangle_name(topic),
        ros_type_to_dds(ros_type),
        qos_to_keyexpr(qos)
    )
}

#[test]
fn test_graph_from_built_tokens() {
    let mut cache = GraphCache::new();
    let sensor = Profile::sensor_data();
    let tokens = [
        node_token(1, "", "talker"),
        node_token(2, "/robot", "listener"),
        endpoint_token(1, 10, "MP", "", "talker", "/chatter", "std_msgs/msg/String", &sensor),
        endpoint_token(
            2,
            10,
            "MS",
            "/robot",
            "listener",
            "/chatter",
            "std_msgs/msg/String",
            &Profile::default(),
        ),
    ];
    for token in &tokens {
        cache.handle_liveliness_token(token, GraphEvent::Put);
    }

    let nodes: Vec<String> = cache.node_names().into_iter().map(|n| n.full_name).collect();
    assert_eq!(nodes, ["/robot/listener", "/talker"]);

    let pubs = cache.get_publishers_info("/chatter");
    assert_eq!(pubs.len(), 1);
    assert_eq!(pubs[0].qos.as_ref(), Some(&sensor));
    assert_eq!(
        cache.subscriber_names_and_types_by_node("/robot/listener", false)[0].0,
        "/chatter"
    );

    cache.handle_liveliness_token(&tokens[2], GraphEvent::Delete);
    assert_eq!(cache.count_publishers("/chatter"), 0);
    assert_eq!(cache.count_subscribers("/chatter"), 1);
}
