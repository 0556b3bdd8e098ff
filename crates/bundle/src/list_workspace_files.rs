use crate::{relative_path, ArchiveEntry, FileSource, WorkspacePackage};
use derive_more::{Display, Error};
use pipe_trait::Pipe;
use pnbundle_diagnostics::miette::{self, Diagnostic};
use pnbundle_fs::IoGate;
use pnbundle_package_manifest::{PackageManifest, PackageManifestError};
use pnbundle_packlist::{list_publishable_files, ListPublishableFilesError};
use std::io;

/// This subroutine lists what a workspace package contributes to the archive.
///
/// * Every publishable file, placed under [`WorkspacePackage::archive_code_dir`].
/// * Its `package.json`, rewritten to declare its dependencies as bundled.
/// * One symlink per dependency inside [`WorkspacePackage::archive_modules_dir`].
#[must_use]
pub struct ListWorkspaceFiles<'a> {
    pub io_gate: &'a IoGate,
    pub package: &'a WorkspacePackage,
}

/// Error type of [`ListWorkspaceFiles`].
#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum ListWorkspaceFilesError {
    #[display("Failed to read the manifest of workspace package {importer_id:?}: {error}")]
    #[diagnostic(code(pnbundle_bundle::read_workspace_manifest))]
    ReadManifest {
        importer_id: String,
        #[error(source)]
        error: PackageManifestError,
    },

    #[display("Failed to list the files of workspace package {importer_id:?}: {error}")]
    #[diagnostic(code(pnbundle_bundle::list_publishable_files))]
    ListPublishableFiles {
        importer_id: String,
        #[error(source)]
        error: ListPublishableFilesError,
    },

    #[display("Failed to rewrite the manifest of workspace package {importer_id:?}: {error}")]
    #[diagnostic(code(pnbundle_bundle::rewrite_manifest))]
    RewriteManifest {
        importer_id: String,
        #[error(source)]
        error: PackageManifestError,
    },

    #[display("Failed to run the file listing of workspace package {importer_id:?}: {error}")]
    #[diagnostic(code(pnbundle_bundle::blocking_task))]
    BlockingTask {
        importer_id: String,
        #[error(source)]
        error: io::Error,
    },
}

impl<'a> ListWorkspaceFiles<'a> {
    /// Execute the subroutine.
    pub async fn run(self) -> Result<Vec<ArchiveEntry>, ListWorkspaceFilesError> {
        let ListWorkspaceFiles { io_gate, package } = self;
        let WorkspacePackage {
            id,
            source_dir,
            archive_code_dir,
            archive_modules_dir,
            dependencies,
        } = package;

        let (manifest, files) = {
            let importer_id = id.clone();
            let source_dir = source_dir.clone();
            io_gate
                .run_blocking(move || {
                    let manifest = PackageManifest::from_dir(&source_dir).map_err(|error| {
                        ListWorkspaceFilesError::ReadManifest {
                            importer_id: importer_id.clone(),
                            error,
                        }
                    })?;
                    let files = list_publishable_files(&source_dir, &manifest).map_err(|error| {
                        ListWorkspaceFilesError::ListPublishableFiles { importer_id, error }
                    })?;
                    Ok((manifest, files))
                })
                .await
                .map_err(|error| ListWorkspaceFilesError::BlockingTask {
                    importer_id: id.clone(),
                    error,
                })??
        };

        let mut entries = Vec::with_capacity(files.len() + dependencies.len());
        for file in files {
            let archive_path = relative_path::join(archive_code_dir, &file);
            let source = if file == PackageManifest::FILE_NAME {
                manifest
                    .clone()
                    .into_bundled()
                    .to_json_bytes()
                    .map_err(|error| ListWorkspaceFilesError::RewriteManifest {
                        importer_id: id.clone(),
                        error,
                    })?
                    .pipe(FileSource::Inline)
            } else {
                source_dir.join(&file).pipe(FileSource::Copy)
            };
            entries.push(ArchiveEntry::File { archive_path, source });
        }

        for (name, dependency) in dependencies {
            entries.push(ArchiveEntry::Symlink {
                archive_path: relative_path::join(archive_modules_dir, name),
                link_target: dependency.relative_symlink_target.clone(),
            });
        }

        tracing::debug!(
            target: "pnbundle::collect",
            importer_id = %id,
            entries = entries.len(),
            "Listed workspace package",
        );
        Ok(entries)
    }
}
