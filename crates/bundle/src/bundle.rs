use crate::{
    external_store_entries, ArchiveSummary, BuildArchive, BuildArchiveError, Closure,
    CollectEntries, CollectEntriesError, ResolveClosure, ResolveClosureError, StoreEntryCollision,
    StoreLayout, StoreLayoutError,
};
use derive_more::{Display, Error};
use pnbundle_diagnostics::miette::{self, Diagnostic};
use pnbundle_fs::IoGate;
use pnbundle_lockfile::{FilterLockfileError, FilterPolicy, LoadLockfileError, Lockfile};
use pnbundle_npmrc::Npmrc;
use std::path::Path;

/// This subroutine does everything `pnbundle` is supposed to do.
///
/// 1. Derive the store layout from the configuration.
/// 2. Load the lockfile.
/// 3. Resolve the workspace packages the target needs.
/// 4. Narrow the lockfile down to those packages.
/// 5. List every file and symlink to ship.
/// 6. Write the archive.
#[must_use]
pub struct Bundle<'a> {
    pub config: &'a Npmrc,
    pub workspace_dir: &'a Path,
    pub target_importer_id: &'a str,
    pub output: &'a Path,
    pub policy: FilterPolicy,
    /// Maximum number of filesystem operations in flight.
    pub io_concurrency: usize,
}

/// Outcome of a successful [`Bundle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleReport {
    pub workspace_packages: usize,
    pub store_entries: usize,
    pub archive: ArchiveSummary,
}

/// Error type of [`Bundle`].
#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum BundleError {
    #[diagnostic(transparent)]
    StoreLayout(#[error(source)] StoreLayoutError),

    #[diagnostic(transparent)]
    LoadLockfile(#[error(source)] LoadLockfileError),

    #[diagnostic(transparent)]
    ResolveClosure(#[error(source)] ResolveClosureError),

    #[diagnostic(transparent)]
    FilterLockfile(#[error(source)] FilterLockfileError),

    #[diagnostic(transparent)]
    StoreEntryCollision(#[error(source)] StoreEntryCollision),

    #[diagnostic(transparent)]
    CollectEntries(#[error(source)] CollectEntriesError),

    #[diagnostic(transparent)]
    BuildArchive(#[error(source)] BuildArchiveError),
}

/// Broad classes of [`BundleError`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum BundleErrorKind {
    /// The configuration or the lockfile could not be used.
    #[display("configuration")]
    Configuration,
    /// The lockfile or the workspace disagree with each other.
    #[display("graph inconsistency")]
    GraphInconsistency,
    /// A source could not be read.
    #[display("file system")]
    FileSystem,
    /// The archive could not be written.
    #[display("archive write")]
    ArchiveWrite,
}

impl BundleError {
    pub fn kind(&self) -> BundleErrorKind {
        match self {
            BundleError::StoreLayout(_) | BundleError::LoadLockfile(_) => {
                BundleErrorKind::Configuration
            }
            BundleError::ResolveClosure(_)
            | BundleError::FilterLockfile(_)
            | BundleError::StoreEntryCollision(_) => BundleErrorKind::GraphInconsistency,
            BundleError::CollectEntries(_) => BundleErrorKind::FileSystem,
            BundleError::BuildArchive(error) if error.is_read_error() => {
                BundleErrorKind::FileSystem
            }
            BundleError::BuildArchive(_) => BundleErrorKind::ArchiveWrite,
        }
    }
}

impl<'a> Bundle<'a> {
    /// Execute the subroutine.
    #[tracing::instrument(skip_all, fields(target_importer_id = self.target_importer_id))]
    pub async fn run(self) -> Result<BundleReport, BundleError> {
        let Bundle { config, workspace_dir, target_importer_id, output, policy, io_concurrency } =
            self;

        let layout =
            StoreLayout::from_config(workspace_dir, config).map_err(BundleError::StoreLayout)?;
        tracing::debug!(target: "pnbundle::config", ?layout, "Store layout");

        let lockfile =
            Lockfile::load_from_dir(&layout.lockfile_dir).map_err(BundleError::LoadLockfile)?;

        let Closure { packages, mut store_entries } = ResolveClosure {
            lockfile: &lockfile,
            layout: &layout,
            target_importer_id,
            dependency_groups: policy.dependency_groups(),
        }
        .run()
        .map_err(BundleError::ResolveClosure)?;
        tracing::info!(
            target: "pnbundle::resolve",
            workspace_packages = packages.len(),
            importers = ?packages.keys().collect::<Vec<_>>(),
            "Resolved workspace packages",
        );

        let filtered_lockfile = lockfile
            .filter_by_importers(packages.keys().map(String::as_str), &policy)
            .map_err(BundleError::FilterLockfile)?;
        let store_entry_dirs =
            external_store_entries(&layout, &packages, &filtered_lockfile, &mut store_entries)
                .map_err(BundleError::StoreEntryCollision)?;
        tracing::info!(
            target: "pnbundle::resolve",
            store_entries = store_entry_dirs.len(),
            "Resolved external packages",
        );

        let io_gate = IoGate::new(io_concurrency);
        let entries = CollectEntries {
            io_gate: &io_gate,
            layout: &layout,
            packages: &packages,
            store_entry_dirs: &store_entry_dirs,
        }
        .run()
        .await
        .map_err(BundleError::CollectEntries)?;
        tracing::info!(target: "pnbundle::collect", entries = entries.len(), "Collected entries");

        let archive = BuildArchive { io_gate: &io_gate, entries, output }
            .run()
            .await
            .map_err(BundleError::BuildArchive)?;

        Ok(BundleReport {
            workspace_packages: packages.len(),
            store_entries: store_entry_dirs.len(),
            archive,
        })
    }
}
