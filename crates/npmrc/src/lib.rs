mod custom_deserializer;

use pnbundle_diagnostics::tracing;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::custom_deserializer::{
    default_modules_dir, default_virtual_store_dir, default_virtual_store_dir_max_length,
    deserialize_optional_pathbuf, deserialize_pathbuf, deserialize_usize,
};

/// Settings of `.npmrc` that decide where the installed workspace lives on disk.
///
/// Keys that are not listed here are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Npmrc {
    /// The directory that holds `pnpm-lock.yaml`. Relative to the workspace directory.
    ///
    /// Defaults to the workspace directory itself.
    #[serde(default, deserialize_with = "deserialize_optional_pathbuf")]
    pub lockfile_dir: Option<PathBuf>,

    /// The directory with links to the store. All direct and indirect dependencies of the
    /// project are linked into this directory. Relative to the lockfile directory.
    #[serde(default = "default_virtual_store_dir", deserialize_with = "deserialize_pathbuf")]
    pub virtual_store_dir: PathBuf,

    /// The directory in which dependencies are installed, relative to each project.
    #[serde(default = "default_modules_dir", deserialize_with = "deserialize_pathbuf")]
    pub modules_dir: PathBuf,

    /// Maximum length of a directory name inside the virtual store.
    #[serde(
        default = "default_virtual_store_dir_max_length",
        deserialize_with = "deserialize_usize"
    )]
    pub virtual_store_dir_max_length: usize,
}

impl Npmrc {
    /// Base file name of the configuration file.
    pub const FILE_NAME: &'static str = ".npmrc";

    pub fn new() -> Self {
        Npmrc {
            lockfile_dir: None,
            virtual_store_dir: default_virtual_store_dir(),
            modules_dir: default_modules_dir(),
            virtual_store_dir_max_length: default_virtual_store_dir_max_length(),
        }
    }

    /// Parse the content of an `.npmrc` file.
    pub fn from_ini(text: &str) -> Result<Self, serde_ini::de::Error> {
        serde_ini::from_str(text)
    }

    /// Load `.npmrc` from `workspace_dir`, falling back to the one in the home directory.
    ///
    /// A file that can't be read or parsed is skipped with a warning.
    pub fn load(workspace_dir: &Path) -> Self {
        let workspace_file = workspace_dir.join(Npmrc::FILE_NAME);
        let home_file = home::home_dir().map(|dir| dir.join(Npmrc::FILE_NAME));
        Npmrc::load_first([Some(workspace_file), home_file].into_iter().flatten())
    }

    /// Use the first of `candidates` that exists and parses.
    pub fn load_first(candidates: impl IntoIterator<Item = PathBuf>) -> Self {
        for path in candidates {
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => continue,
                Err(error) => {
                    tracing::warn!(target: "pnbundle::config", ?path, %error, "Failed to read");
                    continue;
                }
            };
            match Npmrc::from_ini(&text) {
                Ok(npmrc) => {
                    tracing::debug!(target: "pnbundle::config", ?path, ?npmrc, "Loaded");
                    return npmrc;
                }
                Err(error) => {
                    tracing::warn!(target: "pnbundle::config", ?path, %error, "Failed to parse");
                }
            }
        }
        tracing::debug!(target: "pnbundle::config", "Using default configuration");
        Npmrc::new()
    }

    /// Absolute or workspace-relative location of the lockfile directory.
    pub fn lockfile_dir(&self, workspace_dir: &Path) -> PathBuf {
        match &self.lockfile_dir {
            Some(dir) => workspace_dir.join(dir),
            None => workspace_dir.to_path_buf(),
        }
    }
}

impl Default for Npmrc {
    fn default() -> Self {
        Self::new()
    }
}
