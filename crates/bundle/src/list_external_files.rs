use crate::{relative_path, ArchiveEntry, FileSource, StoreLayout};
use async_recursion::async_recursion;
use derive_more::{Display, Error};
use futures_util::future;
use pipe_trait::Pipe;
use pnbundle_diagnostics::miette::{self, Diagnostic};
use pnbundle_fs::IoGate;
use std::{io, path::PathBuf};

/// This subroutine lists a directory of the virtual store recursively.
///
/// Regular files become copy entries. Symlinks are recorded with their link text and never
/// followed, including a store entry that is itself a symlink.
#[must_use]
pub struct ListExternalFiles<'a> {
    pub io_gate: &'a IoGate,
    pub layout: &'a StoreLayout,
    /// Archive path of the directory to list.
    pub dir: &'a str,
}

/// Error type of [`ListExternalFiles`].
#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum ListExternalFilesError {
    #[display("Failed to query {path:?}: {error}")]
    #[diagnostic(code(pnbundle_bundle::symlink_metadata))]
    SymlinkMetadata {
        path: PathBuf,
        #[error(source)]
        error: io::Error,
    },

    #[display("Failed to read directory {path:?}: {error}")]
    #[diagnostic(code(pnbundle_bundle::read_dir))]
    ReadDir {
        path: PathBuf,
        #[error(source)]
        error: io::Error,
    },

    #[display("Failed to read symlink {path:?}: {error}")]
    #[diagnostic(code(pnbundle_bundle::read_link))]
    ReadLink {
        path: PathBuf,
        #[error(source)]
        error: io::Error,
    },

    #[display("Path {_0:?} is not valid UTF-8")]
    #[diagnostic(code(pnbundle_bundle::non_utf8_path))]
    NonUtf8Path(#[error(not(source))] PathBuf),
}

impl<'a> ListExternalFiles<'a> {
    /// Execute the subroutine.
    pub async fn run(self) -> Result<Vec<ArchiveEntry>, ListExternalFilesError> {
        let path = self.layout.source_path(self.dir);
        let metadata = self
            .io_gate
            .symlink_metadata(&path)
            .await
            .map_err(|error| ListExternalFilesError::SymlinkMetadata { path, error })?;

        if metadata.file_type().is_symlink() {
            return self.symlink(self.dir.to_string()).await.map(|entry| vec![entry]);
        }
        if !metadata.is_dir() {
            return Ok(vec![self.file(self.dir.to_string())]);
        }
        self.list_dir(self.dir.to_string()).await
    }

    #[async_recursion]
    async fn list_dir(&self, dir: String) -> Result<Vec<ArchiveEntry>, ListExternalFilesError> {
        let source_dir = self.layout.source_path(&dir);
        let children = self.io_gate.read_dir(&source_dir).await.map_err(|error| {
            ListExternalFilesError::ReadDir { path: source_dir.clone(), error }
        })?;

        let dir = &dir;
        let source_dir = &source_dir;
        children
            .into_iter()
            .map(|child| async move {
                let name = child.name.to_str().ok_or_else(|| {
                    ListExternalFilesError::NonUtf8Path(source_dir.join(&child.name))
                })?;
                let archive_path = relative_path::join(dir, name);
                if child.file_type.is_symlink() {
                    self.symlink(archive_path).await.map(|entry| vec![entry])
                } else if child.file_type.is_dir() {
                    self.list_dir(archive_path).await
                } else {
                    Ok(vec![self.file(archive_path)])
                }
            })
            .pipe(future::try_join_all)
            .await?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .pipe(Ok)
    }

    async fn symlink(&self, archive_path: String) -> Result<ArchiveEntry, ListExternalFilesError> {
        let path = self.layout.source_path(&archive_path);
        let link_target = self
            .io_gate
            .read_link(&path)
            .await
            .map_err(|error| ListExternalFilesError::ReadLink { path: path.clone(), error })?
            .into_os_string()
            .into_string()
            .map_err(|_| ListExternalFilesError::NonUtf8Path(path))?;
        Ok(ArchiveEntry::Symlink { archive_path, link_target })
    }

    fn file(&self, archive_path: String) -> ArchiveEntry {
        let source = self.layout.source_path(&archive_path).pipe(FileSource::Copy);
        ArchiveEntry::File { archive_path, source }
    }
}
