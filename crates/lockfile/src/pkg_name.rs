use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use split_first_char::SplitFirstChar;
use std::{fmt, str::FromStr};

/// Name of an npm package, as found in a dependency path or a snapshot.
///
/// Syntax:
/// * Without scope: `{name}`
/// * With scope: `@{scope}/{name}`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct PkgName {
    /// Name of the scope (if any) without the `@` prefix.
    pub scope: Option<String>,
    /// Name of the package.
    pub name: String,
}

/// Error when parsing [`PkgName`] from a string input.
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum ParsePkgNameError {
    #[display("Name is empty")]
    EmptyName,
    #[display("Scope is empty")]
    EmptyScope,
    #[display("Missing name part of the scoped package")]
    MissingName,
    #[display("Package name {_0:?} contains a path separator")]
    UnexpectedSlash(#[error(not(source))] String),
}

impl PkgName {
    /// Parse [`PkgName`] from a string input.
    pub fn parse(input: &str) -> Result<Self, ParsePkgNameError> {
        let (scope, name) = match input.split_first_char() {
            None => return Err(ParsePkgNameError::EmptyName),
            Some(('@', rest)) => {
                let (scope, name) = rest.split_once('/').ok_or(ParsePkgNameError::MissingName)?;
                if scope.is_empty() {
                    return Err(ParsePkgNameError::EmptyScope);
                }
                (Some(scope.to_string()), name)
            }
            Some(_) => (None, input),
        };
        if name.is_empty() {
            return Err(ParsePkgNameError::MissingName);
        }
        if name.contains('/') {
            return Err(ParsePkgNameError::UnexpectedSlash(input.to_string()));
        }
        Ok(PkgName { scope, name: name.to_string() })
    }
}

impl TryFrom<String> for PkgName {
    type Error = ParsePkgNameError;
    fn try_from(input: String) -> Result<Self, Self::Error> {
        PkgName::parse(&input)
    }
}

impl FromStr for PkgName {
    type Err = ParsePkgNameError;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        PkgName::parse(input)
    }
}

impl fmt::Display for PkgName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "@{scope}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl From<PkgName> for String {
    fn from(value: PkgName) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scoped(scope: &str, name: &str) -> PkgName {
        PkgName { scope: Some(scope.to_string()), name: name.to_string() }
    }

    fn unscoped(name: &str) -> PkgName {
        PkgName { scope: None, name: name.to_string() }
    }

    #[test]
    fn parse_and_display() {
        macro_rules! case {
            ($input:expr => $output:expr) => {{
                let input = $input;
                eprintln!("CASE: {input:?}");
                let received: PkgName = input.parse().unwrap();
                assert_eq!(&received, &$output);
                assert_eq!(received.to_string(), input);
            }};
        }

        case!("left-pad" => unscoped("left-pad"));
        case!("@babel/core" => scoped("babel", "core"));
    }

    #[test]
    fn parse_err() {
        macro_rules! case {
            ($input:expr => $error:expr) => {{
                let input = $input;
                eprintln!("CASE: {input:?}");
                assert_eq!(input.parse::<PkgName>().unwrap_err(), $error);
            }};
        }

        case!("" => ParsePkgNameError::EmptyName);
        case!("@babel" => ParsePkgNameError::MissingName);
        case!("@babel/" => ParsePkgNameError::MissingName);
        case!("@/core" => ParsePkgNameError::EmptyScope);
        case!("foo/bar" => ParsePkgNameError::UnexpectedSlash("foo/bar".to_string()));
    }

    #[test]
    fn deserialize() {
        let received: PkgName = serde_yaml::from_str("'@types/node'").unwrap();
        assert_eq!(received, scoped("types", "node"));
    }
}
