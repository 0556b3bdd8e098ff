use crate::{
    DependencyPath, Lockfile, ParseDependencyPathError, ParsePkgNameError, PkgName, PkgNameVer,
};
use derive_more::{Display, Error};
use pnbundle_diagnostics::miette::{self, Diagnostic};

/// Error type of [`Lockfile::name_ver_from_snapshot`].
#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum NameVerFromSnapshotError {
    #[display("The lockfile has no snapshot for {_0}")]
    #[diagnostic(code(pnbundle_lockfile::missing_snapshot))]
    MissingSnapshot(#[error(not(source))] DependencyPath),

    #[display("The snapshot of {dependency_path} has an invalid name: {error}")]
    #[diagnostic(code(pnbundle_lockfile::invalid_snapshot_name))]
    InvalidSnapshotName {
        dependency_path: DependencyPath,
        #[error(source)]
        error: ParsePkgNameError,
    },

    #[display("{_0}")]
    #[diagnostic(code(pnbundle_lockfile::parse_dependency_path))]
    ParseDependencyPath(#[error(source)] ParseDependencyPathError),
}

impl Lockfile {
    /// Published name and version of the package at `dependency_path`.
    ///
    /// The `name` and `version` of the snapshot take precedence. Without them, both are
    /// read from the dependency path itself.
    pub fn name_ver_from_snapshot(
        &self,
        dependency_path: &DependencyPath,
    ) -> Result<PkgNameVer, NameVerFromSnapshotError> {
        let snapshot = self
            .package(dependency_path)
            .ok_or_else(|| NameVerFromSnapshotError::MissingSnapshot(dependency_path.clone()))?;

        let Some(name) = snapshot.name.as_deref() else {
            return dependency_path
                .parse_name_ver()
                .map_err(NameVerFromSnapshotError::ParseDependencyPath);
        };

        let name = PkgName::parse(name).map_err(|error| {
            NameVerFromSnapshotError::InvalidSnapshotName {
                dependency_path: dependency_path.clone(),
                error,
            }
        })?;
        let version = match &snapshot.version {
            Some(version) => version.clone(),
            None => dependency_path
                .parse_name_ver()
                .map(|name_ver| name_ver.version)
                .unwrap_or_default(),
        };
        Ok(PkgNameVer { name, version })
    }
}
