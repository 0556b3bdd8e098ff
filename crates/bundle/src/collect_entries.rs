use crate::{
    ArchiveEntry, DependencyKind, ListExternalFiles, ListExternalFilesError, ListWorkspaceFiles,
    ListWorkspaceFilesError, StoreEntryClaims, StoreEntryCollision, StoreLayout,
    WorkspacePackageMap,
};
use derive_more::{Display, Error};
use futures_util::future;
use pipe_trait::Pipe;
use pnbundle_diagnostics::miette::{self, Diagnostic};
use pnbundle_fs::IoGate;
use pnbundle_lockfile::Lockfile;
use std::collections::BTreeSet;

/// Archive paths of the store entries a bundle ships.
///
/// These are the store entries the workspace packages link to directly, plus the entry of
/// every package in `filtered_lockfile`, so that the symlinks between store entries stay
/// inside the archive.
pub fn external_store_entries(
    layout: &StoreLayout,
    packages: &WorkspacePackageMap,
    filtered_lockfile: &Lockfile,
    store_entries: &mut StoreEntryClaims,
) -> Result<BTreeSet<String>, StoreEntryCollision> {
    let direct = packages
        .values()
        .flat_map(|package| package.dependencies.values())
        .filter_map(|dependency| match &dependency.kind {
            DependencyKind::External { dependency_path } => Some(dependency_path),
            DependencyKind::Workspace { .. } => None,
        });
    let transitive = filtered_lockfile.packages.iter().flat_map(|packages| packages.keys());

    let mut dirs = BTreeSet::new();
    for dependency_path in direct.chain(transitive) {
        dirs.insert(store_entries.claim(layout, dependency_path.as_str())?);
    }
    Ok(dirs)
}

/// This subroutine lists every entry of the archive.
///
/// Store entries and workspace packages are listed concurrently, every filesystem access
/// going through [`io_gate`](Self::io_gate). Entries of store entries come first, in the order
/// of `store_entry_dirs`, followed by those of workspace packages in importer id order.
#[must_use]
pub struct CollectEntries<'a> {
    pub io_gate: &'a IoGate,
    pub layout: &'a StoreLayout,
    pub packages: &'a WorkspacePackageMap,
    pub store_entry_dirs: &'a BTreeSet<String>,
}

/// Error type of [`CollectEntries`].
#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum CollectEntriesError {
    #[diagnostic(transparent)]
    ListExternalFiles(#[error(source)] ListExternalFilesError),

    #[diagnostic(transparent)]
    ListWorkspaceFiles(#[error(source)] ListWorkspaceFilesError),
}

impl<'a> CollectEntries<'a> {
    /// Execute the subroutine.
    pub async fn run(self) -> Result<Vec<ArchiveEntry>, CollectEntriesError> {
        let CollectEntries { io_gate, layout, packages, store_entry_dirs } = self;

        let external = store_entry_dirs
            .iter()
            .map(|dir| ListExternalFiles { io_gate, layout, dir }.run())
            .pipe(future::try_join_all);
        let workspace = packages
            .values()
            .map(|package| ListWorkspaceFiles { io_gate, package }.run())
            .pipe(future::try_join_all);

        let (external, workspace) = tokio::try_join!(
            async { external.await.map_err(CollectEntriesError::ListExternalFiles) },
            async { workspace.await.map_err(CollectEntriesError::ListWorkspaceFiles) },
        )?;

        tracing::debug!(
            target: "pnbundle::collect",
            store_entries = external.len(),
            workspace_packages = workspace.len(),
            "Listed every source",
        );

        external.into_iter().chain(workspace).flatten().collect::<Vec<_>>().pipe(Ok)
    }
}
