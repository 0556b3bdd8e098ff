use crate::DependencyReference;
use pnbundle_package_manifest::DependencyGroup;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Map of resolved dependencies stored in a [`ProjectSnapshot`].
///
/// The keys are the names the project requires its dependencies by.
pub type ResolvedDependencyMap = BTreeMap<String, DependencyReference>;

/// Snapshot of a single project.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specifiers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<ResolvedDependencyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_dependencies: Option<ResolvedDependencyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_dependencies: Option<ResolvedDependencyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies_meta: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_directory: Option<String>,
}

impl ProjectSnapshot {
    /// Lookup dependency map according to group.
    pub fn get_map_by_group(&self, group: DependencyGroup) -> Option<&'_ ResolvedDependencyMap> {
        match group {
            DependencyGroup::Prod => self.dependencies.as_ref(),
            DependencyGroup::Optional => self.optional_dependencies.as_ref(),
            DependencyGroup::Dev => self.dev_dependencies.as_ref(),
        }
    }

    /// Iterate over combination of dependency maps according to groups.
    pub fn dependencies_by_groups(
        &self,
        groups: impl IntoIterator<Item = DependencyGroup>,
    ) -> impl Iterator<Item = (&'_ str, &'_ DependencyReference)> {
        groups
            .into_iter()
            .flat_map(|group| self.get_map_by_group(group))
            .flat_map(|map| map.iter())
            .map(|(name, reference)| (name.as_str(), reference))
    }
}
