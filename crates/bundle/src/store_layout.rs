use crate::relative_path;
use derive_more::{Display, Error};
use pnbundle_dep_path::dep_path_to_filename;
use pnbundle_diagnostics::miette::{self, Diagnostic};
use pnbundle_npmrc::Npmrc;
use std::{
    collections::{btree_map::Entry, BTreeMap},
    path::{Component, Path, PathBuf},
};

/// Name of the directory inside a store entry that holds the package and its siblings.
pub const STORE_MODULES_DIR: &str = "node_modules";

/// Where things live, both on disk and inside the archive.
///
/// Archive paths are `/`-separated and relative to the lockfile directory, which becomes
/// the archive root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    /// Directory that holds `pnpm-lock.yaml`. Importer ids are relative to it.
    pub lockfile_dir: PathBuf,
    /// Normalized `virtual-store-dir`, relative to [`lockfile_dir`](Self::lockfile_dir).
    pub virtual_store_dir: String,
    /// Normalized `modules-dir`, relative to each project.
    pub modules_dir: String,
    /// Maximum length of a store entry name.
    pub max_length: usize,
}

/// Error type of [`StoreLayout::from_config`].
#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum StoreLayoutError {
    #[display("virtual-store-dir {path:?} is not inside the lockfile directory {lockfile_dir:?}")]
    #[diagnostic(code(pnbundle_bundle::virtual_store_outside_lockfile_dir))]
    VirtualStoreOutsideLockfileDir {
        #[error(not(source))]
        path: PathBuf,
        lockfile_dir: PathBuf,
    },

    #[display("modules-dir {_0:?} must be a relative path inside the project")]
    #[diagnostic(code(pnbundle_bundle::invalid_modules_dir))]
    InvalidModulesDir(#[error(not(source))] PathBuf),

    #[display("Path {_0:?} is not valid UTF-8")]
    #[diagnostic(code(pnbundle_bundle::non_utf8_path))]
    NonUtf8Path(#[error(not(source))] PathBuf),
}

/// Two distinct dependency paths that would share one store entry.
#[derive(Debug, Display, Error, Diagnostic)]
#[display("{first} and {second} both map to the store entry {name:?}")]
#[diagnostic(
    code(pnbundle_bundle::store_entry_collision),
    help("Try a larger virtual-store-dir-max-length")
)]
pub struct StoreEntryCollision {
    #[error(not(source))]
    pub name: String,
    pub first: String,
    pub second: String,
}

impl StoreLayout {
    /// Derive the layout of the workspace at `workspace_dir` from its configuration.
    pub fn from_config(workspace_dir: &Path, config: &Npmrc) -> Result<Self, StoreLayoutError> {
        let lockfile_dir = config.lockfile_dir(workspace_dir);

        let virtual_store_dir = &config.virtual_store_dir;
        let virtual_store_dir = match virtual_store_dir.strip_prefix(&lockfile_dir) {
            Ok(inside) => inside,
            Err(_) => virtual_store_dir,
        };
        let virtual_store_dir = lexical_unix_path(virtual_store_dir)?
            .and_then(|path| relative_path::normalize(&path))
            .ok_or_else(|| StoreLayoutError::VirtualStoreOutsideLockfileDir {
                path: config.virtual_store_dir.clone(),
                lockfile_dir: lockfile_dir.clone(),
            })?;

        let modules_dir = lexical_unix_path(&config.modules_dir)?
            .and_then(|path| relative_path::normalize(&path))
            .filter(|path| path != ".")
            .ok_or_else(|| StoreLayoutError::InvalidModulesDir(config.modules_dir.clone()))?;

        Ok(StoreLayout {
            lockfile_dir,
            virtual_store_dir,
            modules_dir,
            max_length: config.virtual_store_dir_max_length,
        })
    }

    /// Name of the store entry of `dependency_path`.
    pub fn store_entry_name(&self, dependency_path: &str) -> String {
        dep_path_to_filename(dependency_path, self.max_length)
    }

    /// Archive path of the store entry of `dependency_path`.
    pub fn store_entry_dir(&self, dependency_path: &str) -> String {
        relative_path::join(&self.virtual_store_dir, &self.store_entry_name(dependency_path))
    }

    /// Archive path of the directory that holds a store entry's package and its siblings.
    pub fn store_modules_dir(&self, dependency_path: &str) -> String {
        relative_path::join(&self.store_entry_dir(dependency_path), STORE_MODULES_DIR)
    }

    /// Archive path of the package called `name` inside the store entry of `dependency_path`.
    pub fn store_package_dir(&self, dependency_path: &str, name: &str) -> String {
        relative_path::join(&self.store_modules_dir(dependency_path), name)
    }

    /// Location on disk of an archive path.
    pub fn source_path(&self, archive_path: &str) -> PathBuf {
        archive_path
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .fold(self.lockfile_dir.clone(), |path, segment| path.join(segment))
    }
}

/// Convert a relative path into a `/`-separated string.
///
/// Returns `Ok(None)` for absolute paths.
fn lexical_unix_path(path: &Path) -> Result<Option<String>, StoreLayoutError> {
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return Ok(None),
            Component::CurDir => {}
            Component::ParentDir => segments.push(".."),
            Component::Normal(segment) => {
                let segment = segment
                    .to_str()
                    .ok_or_else(|| StoreLayoutError::NonUtf8Path(path.to_path_buf()))?;
                segments.push(segment);
            }
        }
    }
    Ok(Some(segments.join("/")))
}

/// Store entry names handed out during one run, with the dependency path that claimed each.
#[derive(Debug, Default)]
pub struct StoreEntryClaims {
    claims: BTreeMap<String, String>,
}

impl StoreEntryClaims {
    pub fn new() -> Self {
        StoreEntryClaims::default()
    }

    /// Reserve the store entry of `dependency_path` and return its archive path.
    ///
    /// Claiming the same dependency path twice is fine. A different dependency path that
    /// encodes to an already claimed name is an error.
    pub fn claim(
        &mut self,
        layout: &StoreLayout,
        dependency_path: &str,
    ) -> Result<String, StoreEntryCollision> {
        let name = layout.store_entry_name(dependency_path);
        match self.claims.entry(name) {
            Entry::Vacant(entry) => {
                let name = entry.key().clone();
                entry.insert(dependency_path.to_string());
                Ok(relative_path::join(&layout.virtual_store_dir, &name))
            }
            Entry::Occupied(entry) if entry.get() == dependency_path => {
                Ok(relative_path::join(&layout.virtual_store_dir, entry.key()))
            }
            Entry::Occupied(entry) => Err(StoreEntryCollision {
                name: entry.key().clone(),
                first: entry.get().clone(),
                second: dependency_path.to_string(),
            }),
        }
    }

    /// Number of distinct store entries claimed so far.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}
