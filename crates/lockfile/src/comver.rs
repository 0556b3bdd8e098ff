use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::{num::ParseIntError, str::FromStr};

/// Version struct used in a lockfile.
///
/// It contains only major and minor.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[display("{major}.{minor}")]
#[serde(try_from = "ComVerRepr", into = "String")]
pub struct ComVer {
    pub major: u16,
    pub minor: u16,
}

impl ComVer {
    /// Create a comver struct.
    pub fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

/// Error when parsing [`ComVer`] from a string.
#[derive(Debug, Display, Error)]
pub enum ParseComVerError {
    #[display("Dot is missing")]
    MissingDot,
    #[display("Major is not a valid number: {_0}")]
    InvalidMajor(ParseIntError),
    #[display("Minor is not a valid number: {_0}")]
    InvalidMinor(ParseIntError),
}

impl FromStr for ComVer {
    type Err = ParseComVerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s.split_once('.').ok_or(ParseComVerError::MissingDot)?;
        let major = major.parse::<u16>().map_err(ParseComVerError::InvalidMajor)?;
        let minor = minor.parse::<u16>().map_err(ParseComVerError::InvalidMinor)?;
        Ok(ComVer::new(major, minor))
    }
}

/// Older lockfiles write `lockfileVersion: 5.4` as a bare YAML number.
#[derive(Deserialize)]
#[serde(untagged)]
enum ComVerRepr {
    Text(String),
    Number(f64),
}

impl TryFrom<ComVerRepr> for ComVer {
    type Error = ParseComVerError;
    fn try_from(value: ComVerRepr) -> Result<Self, Self::Error> {
        match value {
            ComVerRepr::Text(text) => text.parse(),
            ComVerRepr::Number(number) => format!("{number:?}").parse(),
        }
    }
}

impl From<ComVer> for String {
    fn from(value: ComVer) -> Self {
        value.to_string()
    }
}
