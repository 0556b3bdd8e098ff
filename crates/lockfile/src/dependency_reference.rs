use crate::DependencyPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a dependency map in a version 5 lockfile.
///
/// Syntax:
/// * Workspace package: `link:{relative path}`
/// * Full dependency path: any string containing `/`, e.g. `/@babel/core/7.22.5`
/// * Version of a registry package: `{version}` or `{version}_{peers}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum DependencyReference {
    Link(String),
    Path(DependencyPath),
    Version(String),
}

impl DependencyReference {
    /// Classify a raw reference string.
    pub fn parse(reference: &str) -> Self {
        if let Some(path) = reference.strip_prefix("link:") {
            DependencyReference::Link(path.to_string())
        } else if reference.contains('/') {
            DependencyReference::Path(reference.into())
        } else {
            DependencyReference::Version(reference.to_string())
        }
    }

    /// Key of the `packages` entry this reference points at, for a dependency called `name`.
    ///
    /// Returns `None` for workspace links.
    pub fn dependency_path(&self, name: &str) -> Option<DependencyPath> {
        match self {
            DependencyReference::Link(_) => None,
            DependencyReference::Path(path) => Some(path.clone()),
            DependencyReference::Version(version) => Some(format!("/{name}/{version}").into()),
        }
    }

    /// The other way to read a reference that contains `/` without being a dependency path
    /// of its own, such as a version string with a slash in its peer suffix.
    pub fn alternative_dependency_path(&self, name: &str) -> Option<DependencyPath> {
        match self {
            DependencyReference::Path(path) if !path.as_str().starts_with('/') => {
                Some(format!("/{name}/{path}").into())
            }
            DependencyReference::Link(_)
            | DependencyReference::Path(_)
            | DependencyReference::Version(_) => None,
        }
    }
}

impl From<String> for DependencyReference {
    fn from(value: String) -> Self {
        DependencyReference::parse(&value)
    }
}

impl fmt::Display for DependencyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyReference::Link(path) => write!(f, "link:{path}"),
            DependencyReference::Path(path) => write!(f, "{path}"),
            DependencyReference::Version(version) => f.write_str(version),
        }
    }
}

impl From<DependencyReference> for String {
    fn from(value: DependencyReference) -> Self {
        value.to_string()
    }
}
