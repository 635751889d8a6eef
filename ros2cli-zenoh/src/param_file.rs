//! ROS2 parameter YAML files, as written by `param dump` and read by
//! `param load`.
//!
//! The expected structure is:
//! ```yaml
//! /node_name:
//!   ros__parameters:
//!     param1: value1
//!     nested:
//!       param2: value2
//! ```
//!
//! Nested mappings flatten into dotted names (`nested.param2`). Node keys may
//! be wildcards:
//! - `*` matches a single token delimited by slashes (`/`)
//! - `**` matches zero or more tokens delimited by slashes

use crate::{
    error::{Error, Result},
    msgs::parameter::{Parameter, ParameterValue},
};
use std::{fs, path::Path};
use yaml_rust2::{Yaml, YamlEmitter, YamlLoader, yaml::Hash};

const ROS_PARAMETERS: &str = "ros__parameters";

/// Read the parameters that apply to `node_fqn` from a parameter file.
pub fn load_parameter_file<P: AsRef<Path>>(
    path: P,
    node_fqn: &str,
    use_wildcard: bool,
) -> Result<Vec<Parameter>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::InvalidParameter(format!("cannot read '{}': {e}", path.display()))
    })?;
    parameters_for_node(&content, node_fqn, use_wildcard)
}

/// Extract the parameters for `node_fqn` from parameter file content.
///
/// Wildcard sections apply first so that a section naming the node exactly
/// overrides them. With `use_wildcard` off only the exact section is read.
pub fn parameters_for_node(
    content: &str,
    node_fqn: &str,
    use_wildcard: bool,
) -> Result<Vec<Parameter>> {
    let docs = YamlLoader::load_from_str(content)
        .map_err(|e| Error::InvalidParameter(format!("invalid YAML: {e}")))?;
    let Some(doc) = docs.first() else {
        return Ok(Vec::new());
    };
    let root = doc.as_hash().ok_or_else(|| {
        Error::InvalidParameter("root element must be a mapping".to_string())
    })?;

    let mut wildcard = Vec::new();
    let mut exact = Vec::new();
    for (node_key, node_value) in root {
        let node_name = node_key
            .as_str()
            .ok_or_else(|| Error::InvalidParameter("node name must be a string".to_string()))?;
        let target = if node_name.contains('*') {
            if !use_wildcard || !match_wildcard_pattern(node_name, node_fqn) {
                continue;
            }
            &mut wildcard
        } else if absolute(node_name) == node_fqn {
            &mut exact
        } else {
            continue;
        };

        let params = node_value
            .as_hash()
            .and_then(|h| h.get(&Yaml::String(ROS_PARAMETERS.to_string())))
            .and_then(Yaml::as_hash)
            .ok_or_else(|| {
                Error::InvalidParameter(format!(
                    "node '{node_name}' must have a '{ROS_PARAMETERS}' mapping"
                ))
            })?;
        flatten("", params, target)?;
    }

    let mut merged: Vec<Parameter> = Vec::new();
    for param in wildcard.into_iter().chain(exact) {
        match merged.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => existing.value = param.value,
            None => merged.push(param),
        }
    }
    Ok(merged)
}

fn absolute(name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    }
}

fn flatten(prefix: &str, hash: &Hash, out: &mut Vec<Parameter>) -> Result<()> {
    for (key, value) in hash {
        let key = match key {
            Yaml::String(s) => s.clone(),
            Yaml::Integer(i) => i.to_string(),
            _ => return Err(Error::InvalidParameter("parameter name must be a string".into())),
        };
        let name = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Yaml::Hash(inner) => flatten(&name, inner, out)?,
            other => {
                let value = ParameterValue::from_yaml(other).ok_or_else(|| {
                    Error::InvalidParameter(format!("unsupported value for '{name}'"))
                })?;
                out.push(Parameter::new(name, value));
            }
        }
    }
    Ok(())
}

/// Match a node name against a wildcard pattern
///
/// # Examples
///
/// ```
/// # use ros2cli_zenoh::param_file::match_wildcard_pattern;
/// assert!(match_wildcard_pattern("/**", "/foo/bar/baz"));
/// assert!(match_wildcard_pattern("/foo/*", "/foo/bar"));
/// assert!(!match_wildcard_pattern("/foo/*", "/foo/bar/baz"));
/// ```
#[must_use]
pub fn match_wildcard_pattern(pattern: &str, node_name: &str) -> bool {
    let pattern_parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let name_parts: Vec<&str> = node_name.split('/').filter(|s| !s.is_empty()).collect();
    match_parts(&pattern_parts, &name_parts)
}

fn match_parts(pattern: &[&str], name: &[&str]) -> bool {
    match pattern.split_first() {
        None => name.is_empty(),
        Some((&"**", rest)) => (0..=name.len()).any(|i| match_parts(rest, &name[i..])),
        Some((&"*", rest)) => !name.is_empty() && match_parts(rest, &name[1..]),
        Some((token, rest)) => name.first() == Some(token) && match_parts(rest, &name[1..]),
    }
}

fn insert_nested(hash: &mut Hash, path: &[&str], value: Yaml) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };
    let key = Yaml::String((*first).to_string());
    if rest.is_empty() {
        hash.insert(key, value);
        return;
    }
    let entry = hash
        .entry(key)
        .or_insert_with(|| Yaml::Hash(Hash::new()));
    if let Yaml::Hash(inner) = entry {
        insert_nested(inner, rest, value);
        return;
    }
    // the prefix already holds a value, keep the rest under a flat key
    hash.insert(Yaml::String(path.join(".")), value);
}

/// Render parameters as a parameter file for `node_fqn`, names sorted and
/// dotted names nested.
pub fn dump_parameters(node_fqn: &str, parameters: &[Parameter]) -> Result<String> {
    let mut sorted: Vec<&Parameter> = parameters.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut params = Hash::new();
    for param in sorted {
        let path: Vec<&str> = param.name.split('.').collect();
        insert_nested(&mut params, &path, param.value.to_yaml());
    }

    let mut node = Hash::new();
    node.insert(Yaml::String(ROS_PARAMETERS.to_string()), Yaml::Hash(params));
    let mut root = Hash::new();
    root.insert(Yaml::String(node_fqn.to_string()), Yaml::Hash(node));

    let mut out = String::new();
    YamlEmitter::new(&mut out)
        .dump(&Yaml::Hash(root))
        .map_err(|e| Error::InvalidParameter(format!("cannot render YAML: {e:?}")))?;
    let mut out = out.strip_prefix("---\n").unwrap_or(&out).to_string();
    out.push('\n');
    Ok(out)
}
