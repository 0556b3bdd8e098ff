use crate::{ParsePkgNameError, PkgName};
use derive_more::{Display, Error, From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of the `packages` map of a version 5 lockfile.
///
/// Syntax:
/// * Registry package: `/{name}/{version}`, e.g. `/@babel/core/7.22.5`
/// * Package from another registry: `{host}/{name}/{version}`
/// * Peer-resolved variant: `/{name}/{version}_{peers}`, e.g. `/react-dom/17.0.2_react@17.0.2`
#[derive(
    Debug,
    Display,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    From,
    Into,
    Deserialize,
    Serialize,
)]
#[serde(transparent)]
pub struct DependencyPath(String);

/// Package name and version, as identified by a snapshot or its dependency path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgNameVer {
    pub name: PkgName,
    pub version: String,
}

impl fmt::Display for PkgNameVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Error when a [`DependencyPath`] has no recognizable `{name}/{version}` part.
#[derive(Debug, Display, Error)]
pub enum ParseDependencyPathError {
    #[display("Dependency path {_0:?} has no version part")]
    MissingVersion(#[error(not(source))] String),
    #[display("Dependency path {path:?} has an invalid package name: {error}")]
    InvalidName {
        path: String,
        #[error(source)]
        error: ParsePkgNameError,
    },
}

impl DependencyPath {
    pub fn as_str(&self) -> &'_ str {
        &self.0
    }

    /// Extract name and version from the path.
    ///
    /// A leading `/` or a leading registry host is dropped. The version is the last
    /// segment without its `_` peer suffix, the name is everything before it.
    pub fn parse_name_ver(&self) -> Result<PkgNameVer, ParseDependencyPathError> {
        let path = self.as_str();
        let without_registry = match path.strip_prefix('/') {
            Some(rest) => rest,
            None => path.split_once('/').map_or("", |(_, rest)| rest),
        };
        let (name, version_peer) = without_registry
            .rsplit_once('/')
            .filter(|(_, version_peer)| !version_peer.is_empty())
            .ok_or_else(|| ParseDependencyPathError::MissingVersion(path.to_string()))?;
        let version = version_peer.split_once('_').map_or(version_peer, |(version, _)| version);
        let name = PkgName::parse(name).map_err(|error| ParseDependencyPathError::InvalidName {
            path: path.to_string(),
            error,
        })?;
        Ok(PkgNameVer { name, version: version.to_string() })
    }
}

impl AsRef<str> for DependencyPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DependencyPath {
    fn from(value: &str) -> Self {
        DependencyPath(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_name_ver() {
        macro_rules! case {
            ($input:expr => $output:expr) => {{
                let input = $input;
                eprintln!("CASE: {input:?}");
                let received = DependencyPath::from(input).parse_name_ver().unwrap();
                assert_eq!(received.to_string(), $output);
            }};
        }

        case!("/left-pad/1.0.0" => "left-pad@1.0.0");
        case!("/@babel/core/7.22.5" => "@babel/core@7.22.5");
        case!("/react-dom/17.0.2_react@17.0.2" => "react-dom@17.0.2");
        case!("/@emotion/react/11.0.0_@types+react@17.0.49+react@17.0.2" => "@emotion/react@11.0.0");
        case!("registry.example.com/foo/1.0.0" => "foo@1.0.0");
        case!("registry.example.com/@scope/foo/2.0.0-rc.1" => "@scope/foo@2.0.0-rc.1");
    }

    #[test]
    fn parse_name_ver_err() {
        macro_rules! case {
            ($input:expr => $pattern:pat) => {{
                let input = $input;
                eprintln!("CASE: {input:?}");
                let error = DependencyPath::from(input).parse_name_ver().unwrap_err();
                dbg!(&error);
                assert!(matches!(error, $pattern));
            }};
        }

        case!("/left-pad" => ParseDependencyPathError::MissingVersion(_));
        case!("/left-pad/" => ParseDependencyPathError::MissingVersion(_));
        case!("left-pad" => ParseDependencyPathError::MissingVersion(_));
        case!("/@scope/1.0.0" => ParseDependencyPathError::InvalidName { .. });
    }

    #[test]
    fn deserialize_as_map_key() {
        let yaml = "/left-pad/1.0.0: 1\n/@babel/core/7.22.5: 2\n";
        let map: std::collections::BTreeMap<DependencyPath, u8> =
            serde_yaml::from_str(yaml).unwrap();
        let keys: Vec<_> = map.keys().map(DependencyPath::as_str).collect();
        assert_eq!(keys, ["/@babel/core/7.22.5", "/left-pad/1.0.0"]);
    }
}
