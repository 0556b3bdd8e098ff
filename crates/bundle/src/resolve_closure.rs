use crate::{
    relative_path, DependencyKind, ResolvedDependency, StoreEntryClaims, StoreEntryCollision,
    StoreLayout, WorkspacePackage, WorkspacePackageMap,
};
use derive_more::{Display, Error};
use pnbundle_dep_path::importer_dep_path;
use pnbundle_diagnostics::miette::{self, Diagnostic};
use pnbundle_lockfile::{
    DependencyReference, Lockfile, NameVerFromSnapshotError, ParsePkgNameError, PkgName,
};
use pnbundle_package_manifest::{DependencyGroup, PackageManifest, PackageManifestError};
use pipe_trait::Pipe;
use std::collections::BTreeMap;

/// This subroutine walks the lockfile from one importer and decides where every workspace
/// package it needs lands in the archive, and what each of their dependency symlinks points to.
#[must_use]
pub struct ResolveClosure<'a, DependencyGroupList> {
    pub lockfile: &'a Lockfile,
    pub layout: &'a StoreLayout,
    pub target_importer_id: &'a str,
    pub dependency_groups: DependencyGroupList,
}

/// Result of [`ResolveClosure`].
#[derive(Debug)]
pub struct Closure {
    pub packages: WorkspacePackageMap,
    /// Store entries the closure occupies.
    pub store_entries: StoreEntryClaims,
}

/// Error type of [`ResolveClosure`].
#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum ResolveClosureError {
    #[display("Importer id {_0:?} is outside of the lockfile directory")]
    #[diagnostic(code(pnbundle_bundle::invalid_target_importer_id))]
    InvalidTargetImporterId(#[error(not(source))] String),

    #[display("{dependent} links {name} to {link:?} which is outside of the lockfile directory")]
    #[diagnostic(code(pnbundle_bundle::link_outside_lockfile_dir))]
    LinkOutsideLockfileDir {
        #[error(not(source))]
        dependent: String,
        name: String,
        link: String,
    },

    #[display("Failed to read the manifest of workspace package {importer_id:?}: {error}")]
    #[diagnostic(code(pnbundle_bundle::read_workspace_manifest))]
    ReadManifest {
        importer_id: String,
        #[error(source)]
        error: PackageManifestError,
    },

    #[display("Workspace package {importer_id:?} has an invalid name: {error}")]
    #[diagnostic(code(pnbundle_bundle::invalid_workspace_package_name))]
    InvalidManifestName {
        importer_id: String,
        #[error(source)]
        error: ParsePkgNameError,
    },

    #[display("{dependent} depends on {name} ({reference}) which has no snapshot in the lockfile")]
    #[diagnostic(
        code(pnbundle_bundle::missing_snapshot),
        help("The lockfile may be outdated, run `pnpm install` to refresh it")
    )]
    MissingSnapshot {
        #[error(not(source))]
        dependent: String,
        name: String,
        reference: DependencyReference,
    },

    #[diagnostic(transparent)]
    NameVer(#[error(source)] NameVerFromSnapshotError),

    #[diagnostic(transparent)]
    StoreEntryCollision(#[error(source)] StoreEntryCollision),
}

impl<'a, DependencyGroupList> ResolveClosure<'a, DependencyGroupList>
where
    DependencyGroupList: IntoIterator<Item = DependencyGroup>,
{
    /// Execute the subroutine.
    pub fn run(self) -> Result<Closure, ResolveClosureError> {
        let ResolveClosure { lockfile, layout, target_importer_id, dependency_groups } = self;
        let dependency_groups: Vec<DependencyGroup> = dependency_groups.into_iter().collect();

        let target_id = relative_path::normalize(target_importer_id).ok_or_else(|| {
            ResolveClosureError::InvalidTargetImporterId(target_importer_id.to_string())
        })?;

        let mut store_entries = StoreEntryClaims::new();
        let mut packages = WorkspacePackageMap::new();
        packages.insert(target_id.clone(), WorkspacePackage {
            id: target_id.clone(),
            source_dir: layout.source_path(&target_id),
            archive_code_dir: ".".to_string(),
            archive_modules_dir: layout.modules_dir.clone(),
            dependencies: BTreeMap::new(),
        });

        let mut pending = vec![target_id];
        while let Some(importer_id) = pending.pop() {
            let Some(snapshot) = lockfile.importer(&importer_id) else {
                tracing::debug!(
                    target: "pnbundle::resolve",
                    %importer_id,
                    "Importer has no snapshot",
                );
                continue;
            };
            let modules_dir = match packages.get(&importer_id) {
                Some(package) => package.archive_modules_dir.clone(),
                None => continue,
            };
            tracing::debug!(target: "pnbundle::resolve", %importer_id, "Resolve dependencies");

            let mut dependencies = BTreeMap::new();
            let groups = dependency_groups.iter().copied();
            for (name, reference) in snapshot.dependencies_by_groups(groups) {
                let (kind, target_dir) = match reference {
                    DependencyReference::Link(link) => {
                        let dependency_id = relative_path::join(&importer_id, link);
                        let dependency_id = relative_path::normalize(&dependency_id)
                            .ok_or_else(|| ResolveClosureError::LinkOutsideLockfileDir {
                                dependent: importer_id.clone(),
                                name: name.to_string(),
                                link: link.clone(),
                            })?;
                        if !packages.contains_key(&dependency_id) {
                            let package =
                                relocate(layout, &mut store_entries, dependency_id.clone())?;
                            packages.insert(dependency_id.clone(), package);
                            pending.push(dependency_id.clone());
                        }
                        let target_dir = packages
                            .get(&dependency_id)
                            .map(|package| package.archive_code_dir.clone())
                            .unwrap_or_default();
                        (DependencyKind::Workspace { importer_id: dependency_id }, target_dir)
                    }
                    DependencyReference::Path(_) | DependencyReference::Version(_) => {
                        let dependency_path = lockfile
                            .locate_package(name, reference)
                            .ok_or_else(|| ResolveClosureError::MissingSnapshot {
                                dependent: importer_id.clone(),
                                name: name.to_string(),
                                reference: reference.clone(),
                            })?;
                        let package_name = lockfile
                            .name_ver_from_snapshot(&dependency_path)
                            .map_err(ResolveClosureError::NameVer)?
                            .name
                            .to_string();
                        store_entries
                            .claim(layout, dependency_path.as_str())
                            .map_err(ResolveClosureError::StoreEntryCollision)?;
                        let target_dir =
                            layout.store_package_dir(dependency_path.as_str(), &package_name);
                        (DependencyKind::External { dependency_path }, target_dir)
                    }
                };

                let symlink_dir = relative_path::parent(&relative_path::join(&modules_dir, name));
                let relative_symlink_target = relative_path::relative(&symlink_dir, &target_dir);
                dependencies
                    .insert(name.to_string(), ResolvedDependency { kind, relative_symlink_target });
            }

            if let Some(package) = packages.get_mut(&importer_id) {
                package.dependencies = dependencies;
            }
        }

        Ok(Closure { packages, store_entries })
    }
}

/// Place a workspace package other than the target into its own store entry.
fn relocate(
    layout: &StoreLayout,
    store_entries: &mut StoreEntryClaims,
    importer_id: String,
) -> Result<WorkspacePackage, ResolveClosureError> {
    let source_dir = layout.source_path(&importer_id);
    let manifest = PackageManifest::from_dir(&source_dir).map_err(|error| {
        ResolveClosureError::ReadManifest { importer_id: importer_id.clone(), error }
    })?;
    let name = manifest
        .name()
        .map_err(|error| ResolveClosureError::ReadManifest {
            importer_id: importer_id.clone(),
            error,
        })?
        .pipe(PkgName::parse)
        .map_err(|error| ResolveClosureError::InvalidManifestName {
            importer_id: importer_id.clone(),
            error,
        })?
        .to_string();

    let dependency_path = importer_dep_path(&importer_id);
    store_entries
        .claim(layout, &dependency_path)
        .map_err(ResolveClosureError::StoreEntryCollision)?;
    let archive_modules_dir = layout.store_modules_dir(&dependency_path);
    let archive_code_dir = layout.store_package_dir(&dependency_path, &name);
    tracing::debug!(
        target: "pnbundle::resolve",
        %importer_id,
        %archive_code_dir,
        "Relocate workspace package",
    );

    Ok(WorkspacePackage {
        id: importer_id,
        source_dir,
        archive_code_dir,
        archive_modules_dir,
        dependencies: BTreeMap::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnbundle_lockfile::{DependencyPath, FilterPolicy};
    use pnbundle_npmrc::Npmrc;
    use pnbundle_testing_utils::fixture::WorkspaceFixture;
    use pretty_assertions::assert_eq;
    use text_block_macros::text_block_fnl;

    fn resolve(
        fixture: &WorkspaceFixture,
        target_importer_id: &str,
        dependency_groups: impl IntoIterator<Item = DependencyGroup>,
    ) -> Result<Closure, ResolveClosureError> {
        let lockfile = Lockfile::load_from_dir(fixture.workspace()).unwrap();
        let layout = StoreLayout::from_config(fixture.workspace(), &Npmrc::default()).unwrap();
        ResolveClosure {
            lockfile: &lockfile,
            layout: &layout,
            target_importer_id,
            dependency_groups,
        }
        .run()
    }

    fn default_groups() -> impl Iterator<Item = DependencyGroup> {
        FilterPolicy::default().dependency_groups()
    }

    fn targets(package: &WorkspacePackage) -> Vec<(&str, &str)> {
        package
            .dependencies
            .iter()
            .map(|(name, dependency)| (name.as_str(), dependency.relative_symlink_target.as_str()))
            .collect()
    }

    fn external(dependency_path: &str) -> DependencyKind {
        DependencyKind::External { dependency_path: DependencyPath::from(dependency_path) }
    }

    fn workspace(importer_id: &str) -> DependencyKind {
        DependencyKind::Workspace { importer_id: importer_id.to_string() }
    }

    #[cfg(unix)]
    #[test]
    fn sample_workspace() {
        let fixture = WorkspaceFixture::sample();
        let Closure { packages, store_entries } = resolve(&fixture, ".", default_groups()).unwrap();
        assert_eq!(packages.keys().collect::<Vec<_>>(), [".", "libs/util"]);
        assert_eq!(store_entries.len(), 3);

        let root = &packages["."];
        assert_eq!(root.source_dir, fixture.workspace());
        assert_eq!(root.archive_code_dir, ".");
        assert_eq!(root.archive_modules_dir, "node_modules");
        assert_eq!(targets(root), [
            ("left-pad", ".pnpm/left-pad@1.0.0/node_modules/left-pad"),
            ("util", ".pnpm/file+libs+util/node_modules/util"),
        ]);
        assert_eq!(root.dependencies["left-pad"].kind, external("/left-pad/1.0.0"));
        assert_eq!(root.dependencies["util"].kind, workspace("libs/util"));

        let util = &packages["libs/util"];
        assert_eq!(util.source_dir, fixture.path("libs/util"));
        assert_eq!(util.archive_code_dir, "node_modules/.pnpm/file+libs+util/node_modules/util");
        assert_eq!(util.archive_modules_dir, "node_modules/.pnpm/file+libs+util/node_modules");
        assert_eq!(targets(util), [("lodash", "../../lodash@4.0.0/node_modules/lodash")]);
    }

    #[cfg(unix)]
    #[test]
    fn dev_dependencies_follow_the_groups() {
        let fixture = WorkspaceFixture::sample();

        eprintln!("CASE: default groups");
        let closure = resolve(&fixture, ".", default_groups()).unwrap();
        assert!(!closure.packages["."].dependencies.contains_key("jest"));

        eprintln!("CASE: with dev");
        let groups = [DependencyGroup::Prod, DependencyGroup::Dev];
        let closure = resolve(&fixture, ".", groups).unwrap();
        assert_eq!(
            closure.packages["."].dependencies["jest"].relative_symlink_target,
            ".pnpm/jest@29.0.0/node_modules/jest",
        );
    }

    #[cfg(unix)]
    #[test]
    fn resolution_is_deterministic() {
        let fixture = WorkspaceFixture::sample();
        let first = resolve(&fixture, ".", default_groups()).unwrap().packages;
        let second = resolve(&fixture, ".", default_groups()).unwrap().packages;
        assert_eq!(first, second);
    }

    #[test]
    fn non_root_target() {
        let fixture = WorkspaceFixture::new();
        fixture
            .lockfile(text_block_fnl! {
                "lockfileVersion: 5.4"
                "importers:"
                "  .:"
                "    specifiers: {}"
                "  libs/util:"
                "    specifiers: {}"
                "    dependencies:"
                "      lodash: 4.0.0"
                "packages:"
                "  /lodash/4.0.0:"
                "    resolution: {integrity: sha512-lodash}"
            })
            .file("libs/util/package.json", r#"{ "name": "util" }"#);

        let packages = resolve(&fixture, "./libs/util/", default_groups()).unwrap().packages;
        assert_eq!(packages.keys().collect::<Vec<_>>(), ["libs/util"]);
        let util = &packages["libs/util"];
        assert_eq!(util.archive_code_dir, ".");
        assert_eq!(util.source_dir, fixture.path("libs/util"));
        assert_eq!(targets(util), [("lodash", ".pnpm/lodash@4.0.0/node_modules/lodash")]);
    }

    #[test]
    fn reference_falls_back_to_alternative_reading() {
        let fixture = WorkspaceFixture::new();
        fixture.lockfile(text_block_fnl! {
            "lockfileVersion: 5.4"
            "specifiers:"
            "  foo: ^1.0.0"
            "dependencies:"
            "  foo: registry.example.com/foo/1.0.0"
            "packages:"
            "  /foo/registry.example.com/foo/1.0.0:"
            "    resolution: {integrity: sha512-foo}"
            "    name: foo"
            "    version: 1.0.0"
        });

        let packages = resolve(&fixture, ".", default_groups()).unwrap().packages;
        let root = &packages["."];
        assert_eq!(root.dependencies["foo"].kind, external("/foo/registry.example.com/foo/1.0.0"));
        assert_eq!(targets(root), [(
            "foo",
            ".pnpm/foo+registry.example.com+foo@1.0.0/node_modules/foo",
        )]);
    }

    #[test]
    fn shared_workspace_package_is_resolved_once() {
        let fixture = WorkspaceFixture::new();
        fixture
            .lockfile(text_block_fnl! {
                "lockfileVersion: 5.4"
                "importers:"
                "  .:"
                "    specifiers: {}"
                "    dependencies:"
                "      a: link:packages/a"
                "      b: link:packages/b"
                "  packages/a:"
                "    specifiers: {}"
                "    dependencies:"
                "      shared: link:../shared"
                "  packages/b:"
                "    specifiers: {}"
                "    dependencies:"
                "      '@org/shared': link:../shared"
                "  packages/shared:"
                "    specifiers: {}"
                "    dependencies:"
                "      a: link:../a"
            })
            .file("packages/a/package.json", r#"{ "name": "a" }"#)
            .file("packages/b/package.json", r#"{ "name": "b" }"#)
            .file("packages/shared/package.json", r#"{ "name": "@org/shared" }"#);

        let Closure { packages, store_entries } = resolve(&fixture, ".", default_groups()).unwrap();
        assert_eq!(
            packages.keys().collect::<Vec<_>>(),
            [".", "packages/a", "packages/b", "packages/shared"],
        );
        assert_eq!(store_entries.len(), 3);
        assert_eq!(
            packages["packages/shared"].archive_code_dir,
            "node_modules/.pnpm/file+packages+shared/node_modules/@org/shared",
        );
        assert_eq!(targets(&packages["packages/a"]), [(
            "shared",
            "../../file+packages+shared/node_modules/@org/shared"
        )]);
        assert_eq!(targets(&packages["packages/b"]), [(
            "@org/shared",
            "../../../file+packages+shared/node_modules/@org/shared"
        )]);
        assert_eq!(targets(&packages["packages/shared"]), [(
            "a",
            "../../file+packages+a/node_modules/a"
        )]);
    }

    #[test]
    fn external_names_come_from_snapshots() {
        let fixture = WorkspaceFixture::new();
        fixture.lockfile(text_block_fnl! {
            "lockfileVersion: 5.4"
            "specifiers: {}"
            "dependencies:"
            "  '@scope/tool': 1.0.0_react@17.0.2"
            "  alias: /real-name/2.0.0"
            "  git-dep: github.com/foo/bar/abcdef"
            "packages:"
            "  /@scope/tool/1.0.0_react@17.0.2:"
            "    resolution: {integrity: sha512-tool}"
            "  /real-name/2.0.0:"
            "    resolution: {integrity: sha512-real}"
            "  github.com/foo/bar/abcdef:"
            "    resolution:"
            "      tarball: https://codeload.github.com/foo/bar/tar.gz/abcdef"
            "    name: bar"
            "    version: 1.2.3"
        });

        let packages = resolve(&fixture, ".", default_groups()).unwrap().packages;
        assert_eq!(targets(&packages["."]), [
            ("@scope/tool", "../.pnpm/@scope+tool@1.0.0_react@17.0.2/node_modules/@scope/tool"),
            ("alias", ".pnpm/real-name@2.0.0/node_modules/real-name"),
            ("git-dep", ".pnpm/github.com+foo+bar@abcdef/node_modules/bar"),
        ]);
    }

    #[test]
    fn errors() {
        macro_rules! case {
            ($title:literal, $dependencies:literal => $pattern:pat) => {{
                eprintln!("CASE: {}", $title);
                let fixture = WorkspaceFixture::new();
                fixture.lockfile(&format!(
                    "lockfileVersion: 5.4\nspecifiers: {{}}\ndependencies:\n{}\n",
                    $dependencies,
                ));
                let error = resolve(&fixture, ".", default_groups()).unwrap_err();
                eprintln!("ERROR: {error}");
                assert!(matches!(error, $pattern));
            }};
        }

        case!("missing snapshot", "  left-pad: 1.0.0" => ResolveClosureError::MissingSnapshot { .. });
        case!("missing manifest", "  util: link:libs/util" => ResolveClosureError::ReadManifest { .. });
        case!("link outside", "  outside: link:../outside" => ResolveClosureError::LinkOutsideLockfileDir { .. });
    }

    #[test]
    fn invalid_target() {
        let fixture = WorkspaceFixture::new();
        fixture.lockfile("lockfileVersion: 5.4\nspecifiers: {}\n");
        let error = resolve(&fixture, "../elsewhere", default_groups()).unwrap_err();
        assert!(matches!(error, ResolveClosureError::InvalidTargetImporterId(_)));
    }

    #[test]
    fn invalid_workspace_package_name() {
        let fixture = WorkspaceFixture::new();
        fixture
            .lockfile(text_block_fnl! {
                "lockfileVersion: 5.4"
                "specifiers: {}"
                "dependencies:"
                "  util: link:libs/util"
            })
            .file("libs/util/package.json", r#"{ "name": "../escape" }"#);
        let error = resolve(&fixture, ".", default_groups()).unwrap_err();
        assert!(matches!(error, ResolveClosureError::InvalidManifestName { .. }));
    }
}
