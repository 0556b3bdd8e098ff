mod archive_entry;
mod build_archive;
mod bundle;
mod collect_entries;
mod list_external_files;
mod list_workspace_files;
mod relative_path;
mod resolve_closure;
mod store_layout;
mod workspace_package;

pub use archive_entry::{ArchiveEntry, FileSource};
pub use build_archive::{ArchiveSummary, BuildArchive, BuildArchiveError, ARCHIVE_ROOT};
pub use bundle::{Bundle, BundleError, BundleErrorKind, BundleReport};
pub use collect_entries::{external_store_entries, CollectEntries, CollectEntriesError};
pub use list_external_files::{ListExternalFiles, ListExternalFilesError};
pub use list_workspace_files::{ListWorkspaceFiles, ListWorkspaceFilesError};
pub use resolve_closure::{Closure, ResolveClosure, ResolveClosureError};
pub use store_layout::{
    StoreEntryClaims, StoreEntryCollision, StoreLayout, StoreLayoutError, STORE_MODULES_DIR,
};
pub use workspace_package::{
    DependencyKind, ResolvedDependency, WorkspacePackage, WorkspacePackageMap,
};
