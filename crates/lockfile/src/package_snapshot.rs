use crate::ResolvedDependencyMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of an entry of the `packages` map.
///
/// Only the dependency maps and the `name`/`version` overrides are interpreted. The
/// descriptive fields are carried as they are.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engines: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_bin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_build: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_dependencies: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<ResolvedDependencyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_dependencies: Option<ResolvedDependencyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitive_peer_dependencies: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}
