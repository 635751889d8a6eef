//! Resource lookups over install prefixes laid out on disk.

use ros2cli::ament::AmentIndex;
use std::{env, fs, path::Path};
use tempfile::TempDir;

fn add_resource(prefix: &Path, resource_type: &str, name: &str, content: &str) {
    let dir = prefix.join("share/ament_index/resource_index").join(resource_type);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

fn prefixes() -> (TempDir, TempDir) {
    let overlay = tempfile::tempdir().unwrap();
    let underlay = tempfile::tempdir().unwrap();
    add_resource(overlay.path(), "packages", "demo_nodes", "");
    add_resource(overlay.path(), "rosidl_interfaces", "demo_msgs", "msg/Overlay.msg\n");
    add_resource(underlay.path(), "packages", "demo_nodes", "");
    add_resource(underlay.path(), "packages", "std_msgs", "");
    add_resource(underlay.path(), "packages", ".hidden", "");
    add_resource(underlay.path(), "rosidl_interfaces", "demo_msgs", "msg/Underlay.msg\n");
    (overlay, underlay)
}

#[test]
fn test_first_prefix_wins() {
    let (overlay, underlay) = prefixes();
    let index = AmentIndex::new(vec![overlay.path().into(), underlay.path().into()]);

    let packages = index.resources("packages");
    let names: Vec<&str> = packages.keys().map(String::as_str).collect();
    assert_eq!(names, ["demo_nodes", "std_msgs"]);
    assert_eq!(packages["demo_nodes"], overlay.path());
    assert_eq!(packages["std_msgs"], underlay.path());

    let (content, prefix) = index.resource("rosidl_interfaces", "demo_msgs").unwrap();
    assert_eq!(content, "msg/Overlay.msg\n");
    assert_eq!(prefix, overlay.path());
}

#[test]
fn test_package_lookup() {
    let (overlay, underlay) = prefixes();
    let index = AmentIndex::new(vec![overlay.path().into(), underlay.path().into()]);

    assert!(index.has_package("std_msgs"));
    assert!(!index.has_package("missing_pkg"));
    assert_eq!(
        index.package_share_directory("std_msgs"),
        Some(underlay.path().join("share").join("std_msgs"))
    );
    assert_eq!(index.package_share_directory("missing_pkg"), None);
}

#[test]
fn test_path_list_order() {
    let (overlay, underlay) = prefixes();
    let list = env::join_paths([overlay.path(), underlay.path()]).unwrap();
    let index = AmentIndex::from_path_list(&list);
    assert_eq!(index.prefixes(), [overlay.path(), underlay.path()]);
    assert_eq!(
        index.resource("rosidl_interfaces", "demo_msgs").unwrap().0,
        "msg/Overlay.msg\n"
    );
}
