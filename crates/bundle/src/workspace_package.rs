use pnbundle_lockfile::DependencyPath;
use std::{collections::BTreeMap, path::PathBuf};

/// A workspace package that takes part in the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePackage {
    /// Importer id, relative to the lockfile directory.
    pub id: String,
    /// Directory of the package on disk.
    pub source_dir: PathBuf,
    /// Archive path the files of the package are placed under.
    ///
    /// `.` for the target package. Other workspace packages are relocated into the virtual
    /// store under a `file:{id}` store entry.
    pub archive_code_dir: String,
    /// Archive path of the directory that holds the dependency symlinks of the package.
    pub archive_modules_dir: String,
    /// Dependencies of the package keyed by the name they are required by.
    pub dependencies: BTreeMap<String, ResolvedDependency>,
}

/// Where a dependency of a [`WorkspacePackage`] points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub kind: DependencyKind,
    /// Target of the symlink at `{archive_modules_dir}/{name}`, relative to the directory
    /// that contains the symlink.
    pub relative_symlink_target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyKind {
    /// Another package of the workspace, identified by its importer id.
    Workspace { importer_id: String },
    /// A package from the `packages` map of the lockfile.
    External { dependency_path: DependencyPath },
}

/// Workspace packages of a bundle keyed by importer id.
pub type WorkspacePackageMap = BTreeMap<String, WorkspacePackage>;
