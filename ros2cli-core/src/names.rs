//! ROS name helpers used by the command-line verbs.
//!
//! Names typed on the command line are usually relative (`chatter`,
//! `talker`). The graph only ever stores fully qualified names, so every verb
//! normalises its arguments through [`expand_topic_name`] or
//! [`build_node_fqn`] before looking anything up.
//!
//! Naming rules follow
//! [ROS2 Topic and Service Names](https://design.ros2.org/articles/topic_and_service_names.html).

use crate::error::{Error, Result};

/// Check if a character is valid for ROS2 names
///
/// Valid characters are alphanumeric characters and underscores.
#[inline]
#[must_use]
pub fn is_valid_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn invalid(kind: &'static str, name: &str, reason: impl Into<String>) -> Error {
    Error::InvalidName {
        kind,
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Shared token rules for topics and namespaces: `/`-separated tokens of
/// `[A-Za-z0-9_]`, no token starting with a digit, no `//` and no `__`.
fn validate_tokens(kind: &'static str, name: &str, body: &str) -> Result<()> {
    if body.ends_with('/') {
        return Err(invalid(kind, name, "name must not end with a forward slash (/)"));
    }
    if body.contains("__") {
        return Err(invalid(kind, name, "name must not contain repeated underscores (__)"));
    }
    for token in body.split('/') {
        if token.is_empty() {
            return Err(invalid(kind, name, "name must not contain repeated forward slashes (//)"));
        }
        if token.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(invalid(kind, name, "token must not start with a numeric character"));
        }
        if let Some(c) = token.chars().find(|c| !is_valid_name_char(*c)) {
            return Err(invalid(kind, name, format!("invalid character '{c}'")));
        }
    }
    Ok(())
}

/// Validate a topic or service name as typed by a user.
///
/// Accepts absolute (`/a/b`), relative (`a/b`) and private (`~`, `~/a`) forms.
/// Substitutions are not accepted on the command line.
pub fn validate_topic_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid("topic", name, "name must not be empty"));
    }
    if name == "~" || name == "/" {
        return Ok(());
    }
    let body = if let Some(rest) = name.strip_prefix("~/") {
        rest
    } else if name.starts_with('~') {
        return Err(invalid("topic", name, "tilde (~) must be followed by a forward slash (/)"));
    } else {
        name.strip_prefix('/').unwrap_or(name)
    };
    validate_tokens("topic", name, body)
}

/// Validate a node base name (no namespace).
pub fn validate_node_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid("node", name, "name must not be empty"));
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(invalid("node", name, "name must not start with a numeric character"));
    }
    if let Some(c) = name.chars().find(|c| !is_valid_name_char(*c)) {
        return Err(invalid("node", name, format!("invalid character '{c}'")));
    }
    Ok(())
}

/// Validate an absolute namespace (`/` is the root namespace).
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace == "/" {
        return Ok(());
    }
    let Some(body) = namespace.strip_prefix('/') else {
        return Err(invalid(
            "namespace",
            namespace,
            "namespace must start with a forward slash (/)",
        ));
    };
    validate_tokens("namespace", namespace, body)
}

/// Check if a name is hidden (contains a token starting with '_')
///
/// Any topic or service name that contains tokens starting with an underscore
/// is considered hidden.
#[must_use]
pub fn is_hidden_name(name: &str) -> bool {
    name.split('/').any(|token| token.starts_with('_'))
}

/// Build the fully qualified node name from namespace and node name
///
/// An empty namespace is treated as the root namespace, which is how
/// rmw_zenoh announces nodes launched without one.
#[must_use]
pub fn build_node_fqn(namespace: &str, node_name: &str) -> String {
    if namespace.is_empty() || namespace == "/" {
        format!("/{node_name}")
    } else {
        format!("{namespace}/{node_name}")
    }
}

/// Expand a topic name to its fully qualified form, relative to a node.
///
/// - absolute names are returned as-is
/// - `~` is replaced with the node's FQN
/// - relative names are prefixed with the node's namespace
pub fn expand_topic_name(
    node_namespace: &str,
    node_name: &str,
    topic_name: &str,
) -> Result<String> {
    validate_namespace(node_namespace)?;
    validate_node_name(node_name)?;
    validate_topic_name(topic_name)?;

    let expanded = if topic_name.starts_with('/') {
        topic_name.to_string()
    } else if let Some(rest) = topic_name.strip_prefix('~') {
        format!("{}{rest}", build_node_fqn(node_namespace, node_name))
    } else if node_namespace == "/" {
        format!("/{topic_name}")
    } else {
        format!("{node_namespace}/{topic_name}")
    };
    Ok(expanded)
}

/// Make a user supplied node name absolute (`talker` -> `/talker`).
#[must_use]
pub fn absolute_node_name(name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    }
}

/// Make a user supplied topic, service or action name absolute.
///
/// Relative names resolve against the root namespace, like the command-line
/// tool's own anonymous node does.
#[must_use]
pub fn absolute_topic_name(name: &str) -> String {
    absolute_node_name(name)
}

/// Extract the namespace from a fully qualified node name
///
/// # Examples
///
/// ```
/// use ros2cli_core::names::extract_namespace;
///
/// assert_eq!(extract_namespace("/my_ns/my_node"), "/my_ns");
/// assert_eq!(extract_namespace("/my_node"), "/");
/// ```
#[must_use]
pub fn extract_namespace(node_fqn: &str) -> &str {
    match node_fqn.rfind('/') {
        Some(0) | None => "/",
        Some(pos) => &node_fqn[..pos],
    }
}

/// Extract the base name from a fully qualified node name
#[must_use]
pub fn extract_base_name(node_fqn: &str) -> &str {
    match node_fqn.rfind('/') {
        Some(pos) => &node_fqn[pos + 1..],
        None => node_fqn,
    }
}
