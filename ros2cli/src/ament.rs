//! Read-only access to the ament resource index.
//!
//! Installed packages advertise resources as marker files under
//! `<prefix>/share/ament_index/resource_index/<resource type>/<name>`; the
//! file content is resource specific. Prefixes come from `AMENT_PREFIX_PATH`
//! and the first prefix providing a resource wins.

use crate::error::{Error, Result};
use std::{
    collections::BTreeMap,
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

/// Environment variable listing install prefixes.
pub const AMENT_PREFIX_PATH: &str = "AMENT_PREFIX_PATH";

const RESOURCE_INDEX_SUBFOLDER: &str = "share/ament_index/resource_index";

/// An ament resource index spread over install prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmentIndex {
    prefixes: Vec<PathBuf>,
}

impl AmentIndex {
    /// Index over explicit prefixes, highest priority first.
    pub fn new(prefixes: Vec<PathBuf>) -> Self {
        Self { prefixes }
    }

    /// Index over a `PATH`-like list of prefixes.
    pub fn from_path_list(list: &OsStr) -> Self {
        Self::new(
            std::env::split_paths(list)
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
        )
    }

    /// Index over `AMENT_PREFIX_PATH`.
    ///
    /// # Errors
    ///
    /// Fails when the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        let list = std::env::var_os(AMENT_PREFIX_PATH).unwrap_or_default();
        let index = Self::from_path_list(&list);
        if index.prefixes.is_empty() {
            return Err(Error::command(format!(
                "Environment variable '{AMENT_PREFIX_PATH}' is not set or empty"
            )));
        }
        Ok(index)
    }

    /// Install prefixes, highest priority first.
    pub fn prefixes(&self) -> &[PathBuf] {
        &self.prefixes
    }

    fn resource_dir(prefix: &Path, resource_type: &str) -> PathBuf {
        prefix.join(RESOURCE_INDEX_SUBFOLDER).join(resource_type)
    }

    /// Every resource of a type, with the prefix providing it.
    pub fn resources(&self, resource_type: &str) -> BTreeMap<String, PathBuf> {
        let mut resources = BTreeMap::new();
        for prefix in &self.prefixes {
            let Ok(entries) = fs::read_dir(Self::resource_dir(prefix, resource_type)) else {
                continue;
            };
            for entry in entries.filter_map(|e| e.ok()) {
                let Ok(name) = entry.file_name().into_string() else {
                    continue;
                };
                // editors and tools leave dot files behind
                if name.starts_with('.') || !entry.path().is_file() {
                    continue;
                }
                resources.entry(name).or_insert_with(|| prefix.clone());
            }
        }
        resources
    }

    /// Content of one resource and the prefix providing it.
    pub fn resource(&self, resource_type: &str, name: &str) -> Option<(String, PathBuf)> {
        self.prefixes.iter().find_map(|prefix| {
            let path = Self::resource_dir(prefix, resource_type).join(name);
            let content = fs::read_to_string(path).ok()?;
            Some((content, prefix.clone()))
        })
    }

    /// True if a package is registered in the `packages` resource type.
    pub fn has_package(&self, package: &str) -> bool {
        self.resource("packages", package).is_some()
    }

    /// `<prefix>/share/<package>` of an installed package.
    pub fn package_share_directory(&self, package: &str) -> Option<PathBuf> {
        let (_, prefix) = self.resource("packages", package)?;
        Some(prefix.join("share").join(package))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_list_skips_empty_entries() {
        let index = AmentIndex::from_path_list(OsStr::new("/opt/a::/opt/b"));
        assert_eq!(
            index.prefixes(),
            [PathBuf::from("/opt/a"), PathBuf::from("/opt/b")]
        );
        assert!(AmentIndex::from_path_list(OsStr::new("")).prefixes().is_empty());
    }

    #[test]
    fn test_missing_prefix_is_empty() {
        let index = AmentIndex::new(vec![PathBuf::from("/nonexistent/prefix")]);
        assert!(index.resources("packages").is_empty());
        assert!(index.resource("packages", "std_msgs").is_none());
        assert!(!index.has_package("std_msgs"));
    }
}
