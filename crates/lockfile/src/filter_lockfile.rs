use crate::{
    DependencyPath, DependencyReference, Lockfile, PackageSnapshot, PackageSnapshotMap,
};
use derive_more::{Display, Error};
use pnbundle_diagnostics::{
    miette::{self, Diagnostic},
    tracing,
};
use pnbundle_package_manifest::DependencyGroup;

/// Which dependencies survive [`Lockfile::filter_by_importers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterPolicy {
    pub include_prod: bool,
    pub include_dev: bool,
    pub include_optional: bool,
    /// Fail when a dependency has no snapshot instead of skipping it.
    pub fail_on_missing: bool,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        FilterPolicy {
            include_prod: true,
            include_dev: false,
            include_optional: true,
            fail_on_missing: true,
        }
    }
}

impl FilterPolicy {
    /// Dependency groups of a project that the policy lets through.
    pub fn dependency_groups(&self) -> impl Iterator<Item = DependencyGroup> + Clone {
        [
            (self.include_prod, DependencyGroup::Prod),
            (self.include_optional, DependencyGroup::Optional),
            (self.include_dev, DependencyGroup::Dev),
        ]
        .into_iter()
        .filter_map(|(included, group)| included.then_some(group))
    }
}

/// Error type of [`Lockfile::filter_by_importers`].
#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum FilterLockfileError {
    #[display("{dependent} depends on {name} ({reference}) which has no snapshot in the lockfile")]
    #[diagnostic(
        code(pnbundle_lockfile::missing_dependency),
        help("The lockfile may be outdated, run `pnpm install` to refresh it")
    )]
    MissingDependency {
        #[error(not(source))]
        dependent: String,
        name: String,
        reference: DependencyReference,
    },
}

impl Lockfile {
    /// Find the `packages` entry a dependency called `name` refers to.
    ///
    /// When the reference has no snapshot under its natural reading but does under the
    /// alternative one, the alternative is used and a warning is logged. Workspace links
    /// and references without any snapshot give `None`.
    pub fn locate_package(
        &self,
        name: &str,
        reference: &DependencyReference,
    ) -> Option<DependencyPath> {
        let dependency_path = reference.dependency_path(name)?;
        if self.has_package(&dependency_path) {
            return Some(dependency_path);
        }
        let alternative = reference.alternative_dependency_path(name)?;
        if !self.has_package(&alternative) {
            return None;
        }
        tracing::warn!(
            target: "pnbundle::lockfile",
            %name,
            %reference,
            %alternative,
            "Reference has no snapshot of its own, using the alternative reading",
        );
        Some(alternative)
    }

    /// Build a lockfile that only contains `importer_ids` and the packages they need.
    ///
    /// Packages are reached through the project dependency groups the policy allows, then
    /// through the `dependencies` (and, with [`FilterPolicy::include_optional`], the
    /// `optionalDependencies`) of every reached package. Importers that the lockfile does not
    /// list are left out.
    pub fn filter_by_importers<'a>(
        &self,
        importer_ids: impl IntoIterator<Item = &'a str>,
        policy: &FilterPolicy,
    ) -> Result<Lockfile, FilterLockfileError> {
        let importer_ids: Vec<&str> = importer_ids.into_iter().collect();
        let mut pending = Vec::<DependencyPath>::new();

        for &importer_id in &importer_ids {
            let Some(snapshot) = self.importer(importer_id) else {
                continue;
            };
            for (name, reference) in snapshot.dependencies_by_groups(policy.dependency_groups()) {
                self.enqueue(importer_id, name, reference, policy, &mut pending)?;
            }
        }

        let mut packages = PackageSnapshotMap::new();
        while let Some(dependency_path) = pending.pop() {
            if packages.contains_key(&dependency_path) {
                continue;
            }
            let Some(snapshot) = self.package(&dependency_path) else {
                continue;
            };
            for (name, reference) in package_edges(snapshot, policy) {
                self.enqueue(dependency_path.as_str(), name, reference, policy, &mut pending)?;
            }
            packages.insert(dependency_path, snapshot.clone());
        }

        Ok(Lockfile {
            lockfile_version: self.lockfile_version,
            project_snapshot: self.project_snapshot.retain(importer_ids),
            packages: Some(packages),
        })
    }

    fn enqueue(
        &self,
        dependent: &str,
        name: &str,
        reference: &DependencyReference,
        policy: &FilterPolicy,
        pending: &mut Vec<DependencyPath>,
    ) -> Result<(), FilterLockfileError> {
        if let DependencyReference::Link(_) = reference {
            return Ok(());
        }
        if let Some(dependency_path) = self.locate_package(name, reference) {
            pending.push(dependency_path);
            return Ok(());
        }
        if policy.fail_on_missing {
            return Err(FilterLockfileError::MissingDependency {
                dependent: dependent.to_string(),
                name: name.to_string(),
                reference: reference.clone(),
            });
        }
        tracing::warn!(
            target: "pnbundle::lockfile",
            %dependent,
            %name,
            %reference,
            "Skipping a dependency without snapshot",
        );
        Ok(())
    }
}

fn package_edges<'a>(
    snapshot: &'a PackageSnapshot,
    policy: &FilterPolicy,
) -> impl Iterator<Item = (&'a str, &'a DependencyReference)> {
    let optional = policy.include_optional.then_some(&snapshot.optional_dependencies);
    [Some(&snapshot.dependencies), optional]
        .into_iter()
        .flatten()
        .flatten()
        .flatten()
        .map(|(name, reference)| (name.as_str(), reference))
}
