use std::{path::PathBuf, str::FromStr};

use serde::{de, Deserialize, Deserializer};

pub fn default_modules_dir() -> PathBuf {
    PathBuf::from("node_modules")
}

pub fn default_virtual_store_dir() -> PathBuf {
    PathBuf::from("node_modules/.pnpm")
}

pub fn default_virtual_store_dir_max_length() -> usize {
    pnbundle_dep_path::DEFAULT_MAX_LENGTH
}

/// INI values are plain strings, so numbers are parsed by hand.
pub fn deserialize_usize<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    usize::from_str(s.trim()).map_err(de::Error::custom)
}

/// Keep the path as written. Relative paths are resolved later against the directory they
/// belong to.
pub fn deserialize_pathbuf<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.trim();
    if s.is_empty() {
        return Err(de::Error::custom("path must not be empty"));
    }
    Ok(PathBuf::from(s))
}

pub fn deserialize_optional_pathbuf<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_pathbuf(deserializer).map(Some)
}
