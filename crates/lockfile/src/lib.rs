mod comver;
mod dependency_path;
mod dependency_reference;
mod filter_lockfile;
mod load_lockfile;
mod lockfile_version;
mod name_ver_from_snapshot;
mod package_snapshot;
mod pkg_name;
mod project_snapshot;
mod root_project_snapshot;

pub use comver::{ComVer, ParseComVerError};
pub use dependency_path::{DependencyPath, ParseDependencyPathError, PkgNameVer};
pub use dependency_reference::DependencyReference;
pub use filter_lockfile::{FilterLockfileError, FilterPolicy};
pub use load_lockfile::LoadLockfileError;
pub use lockfile_version::{LockfileVersion, LockfileVersionError};
pub use name_ver_from_snapshot::NameVerFromSnapshotError;
pub use package_snapshot::PackageSnapshot;
pub use pkg_name::{ParsePkgNameError, PkgName};
pub use project_snapshot::{ProjectSnapshot, ResolvedDependencyMap};
pub use root_project_snapshot::{RootProjectSnapshot, ROOT_IMPORTER_ID};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Map of package snapshots keyed by dependency path.
pub type PackageSnapshotMap = BTreeMap<DependencyPath, PackageSnapshot>;

/// Content of a `pnpm-lock.yaml` file of version 5.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(from = "LockfileSerde", into = "LockfileSerde")]
pub struct Lockfile {
    pub lockfile_version: LockfileVersion<5>,
    pub project_snapshot: RootProjectSnapshot,
    pub packages: Option<PackageSnapshotMap>,
}

impl Lockfile {
    /// Base file name of the lockfile.
    pub const FILE_NAME: &'static str = "pnpm-lock.yaml";

    /// Snapshot of the importer with id `importer_id`.
    pub fn importer(&self, importer_id: &str) -> Option<&'_ ProjectSnapshot> {
        self.project_snapshot.get(importer_id)
    }

    /// Snapshot of the package at `dependency_path`.
    pub fn package(&self, dependency_path: &DependencyPath) -> Option<&'_ PackageSnapshot> {
        self.packages.as_ref()?.get(dependency_path)
    }

    /// Whether the `packages` map has an entry for `dependency_path`.
    pub fn has_package(&self, dependency_path: &DependencyPath) -> bool {
        self.package(dependency_path).is_some()
    }
}

/// On-disk shape of [`Lockfile`].
///
/// A lockfile either has an `importers` map, or keeps the dependency maps of its only
/// project at the top level.
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct LockfileSerde {
    lockfile_version: LockfileVersion<5>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    importers: Option<BTreeMap<String, ProjectSnapshot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    specifiers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dependencies: Option<ResolvedDependencyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    optional_dependencies: Option<ResolvedDependencyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dev_dependencies: Option<ResolvedDependencyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dependencies_meta: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    packages: Option<PackageSnapshotMap>,
}

impl From<LockfileSerde> for Lockfile {
    fn from(value: LockfileSerde) -> Self {
        let LockfileSerde {
            lockfile_version,
            importers,
            specifiers,
            dependencies,
            optional_dependencies,
            dev_dependencies,
            dependencies_meta,
            packages,
        } = value;
        let project_snapshot = match importers {
            Some(importers) => RootProjectSnapshot::Multi(importers),
            None => RootProjectSnapshot::Single(ProjectSnapshot {
                specifiers,
                dependencies,
                optional_dependencies,
                dev_dependencies,
                dependencies_meta,
                publish_directory: None,
            }),
        };
        Lockfile { lockfile_version, project_snapshot, packages }
    }
}

impl From<Lockfile> for LockfileSerde {
    fn from(value: Lockfile) -> Self {
        let Lockfile { lockfile_version, project_snapshot, packages } = value;
        match project_snapshot {
            RootProjectSnapshot::Multi(importers) => LockfileSerde {
                lockfile_version,
                importers: Some(importers),
                specifiers: None,
                dependencies: None,
                optional_dependencies: None,
                dev_dependencies: None,
                dependencies_meta: None,
                packages,
            },
            RootProjectSnapshot::Single(snapshot) => LockfileSerde {
                lockfile_version,
                importers: None,
                specifiers: snapshot.specifiers,
                dependencies: snapshot.dependencies,
                optional_dependencies: snapshot.optional_dependencies,
                dev_dependencies: snapshot.dev_dependencies,
                dependencies_meta: snapshot.dependencies_meta,
                packages,
            },
        }
    }
}
