use crate::{relative_path, ArchiveEntry, FileSource};
use derive_more::{Display, Error};
use futures_util::{stream, StreamExt};
use pnbundle_diagnostics::miette::{self, Diagnostic};
use pnbundle_fs::{is_executable, FileContent, IoGate, EXEC_MODE, FILE_MODE, SYMLINK_MODE};
use std::{
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tar::{EntryType, Header};
use tempfile::NamedTempFile;
use tokio::{sync::mpsc, task::JoinError};

/// Top-level directory of every archive path.
pub const ARCHIVE_ROOT: &str = "package";

/// Number of entries whose content may be read ahead of the writer.
const PREPARE_LOOK_AHEAD: usize = 64;

/// Number of prepared entries that may wait for the writer.
const WRITE_QUEUE_CAPACITY: usize = 16;

/// This subroutine writes a tar archive at [`output`](Self::output).
///
/// Entries are written in order, under [`ARCHIVE_ROOT`]. The archive is first written to a
/// temporary file beside `output` and only moved into place once complete, so a failure
/// never leaves a partial archive at `output`.
#[must_use]
pub struct BuildArchive<'a> {
    pub io_gate: &'a IoGate,
    pub entries: Vec<ArchiveEntry>,
    pub output: &'a Path,
}

/// Counts of what [`BuildArchive`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub files: usize,
    pub symlinks: usize,
}

/// Error type of [`BuildArchive`].
#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum BuildArchiveError {
    #[display("Failed to read {path:?}: {error}")]
    #[diagnostic(code(pnbundle_bundle::read_source))]
    ReadSource {
        path: PathBuf,
        #[error(source)]
        error: io::Error,
    },

    #[display("Failed to create a temporary file in {dir:?}: {error}")]
    #[diagnostic(code(pnbundle_bundle::create_temp_file))]
    CreateTempFile {
        dir: PathBuf,
        #[error(source)]
        error: io::Error,
    },

    #[display("Failed to write {archive_path:?} into the archive: {error}")]
    #[diagnostic(code(pnbundle_bundle::write_entry))]
    WriteEntry {
        archive_path: String,
        #[error(source)]
        error: io::Error,
    },

    #[display("Failed to finish the archive: {_0}")]
    #[diagnostic(code(pnbundle_bundle::finish_archive))]
    Finish(#[error(source)] io::Error),

    #[display("Failed to move the archive to {path:?}: {error}")]
    #[diagnostic(code(pnbundle_bundle::persist_archive))]
    Persist {
        path: PathBuf,
        #[error(source)]
        error: io::Error,
    },

    #[display("The archive writer stopped unexpectedly: {_0}")]
    #[diagnostic(code(pnbundle_bundle::writer_task))]
    WriterTask(#[error(source)] JoinError),
}

impl BuildArchiveError {
    /// Whether the error comes from reading a source rather than from writing the archive.
    pub fn is_read_error(&self) -> bool {
        matches!(self, BuildArchiveError::ReadSource { .. })
    }
}

/// An entry whose content is in memory.
#[derive(Debug)]
enum PreparedEntry {
    File { archive_path: String, bytes: Vec<u8>, mode: u32 },
    Symlink { archive_path: String, link_target: String },
}

impl<'a> BuildArchive<'a> {
    /// Execute the subroutine.
    pub async fn run(self) -> Result<ArchiveSummary, BuildArchiveError> {
        let BuildArchive { io_gate, entries, output } = self;

        let output_dir = match output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let temp = tempfile::Builder::new()
            .prefix(".pnbundle-")
            .suffix(".tar.tmp")
            .tempfile_in(output_dir)
            .map_err(|error| BuildArchiveError::CreateTempFile {
                dir: output_dir.to_path_buf(),
                error,
            })?;

        let (sender, receiver) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        let writer = tokio::task::spawn_blocking(move || write_archive(temp, receiver));

        let mut prepared = stream::iter(entries)
            .map(|entry| prepare_entry(io_gate, entry))
            .buffered(PREPARE_LOOK_AHEAD);
        while let Some(entry) = prepared.next().await {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    drop(sender);
                    // The temporary file is removed when the writer drops it.
                    match writer.await {
                        Ok(Ok(_)) => {}
                        Ok(Err(writer_error)) => tracing::debug!(
                            target: "pnbundle::archive",
                            error = %writer_error,
                            "Writer failed after a source could not be read",
                        ),
                        Err(join_error) => tracing::debug!(
                            target: "pnbundle::archive",
                            error = %join_error,
                            "Writer task failed after a source could not be read",
                        ),
                    }
                    return Err(error);
                }
            };
            if sender.send(entry).await.is_err() {
                // The writer failed, its error is reported below.
                break;
            }
        }
        drop(sender);

        let (temp, summary) = writer.await.map_err(BuildArchiveError::WriterTask)??;
        temp.persist(output).map_err(|error| BuildArchiveError::Persist {
            path: output.to_path_buf(),
            error: error.error,
        })?;

        tracing::info!(
            target: "pnbundle::archive",
            ?output,
            files = summary.files,
            symlinks = summary.symlinks,
            "Wrote archive",
        );
        Ok(summary)
    }
}

async fn prepare_entry(
    io_gate: &IoGate,
    entry: ArchiveEntry,
) -> Result<PreparedEntry, BuildArchiveError> {
    match entry {
        ArchiveEntry::File { archive_path, source: FileSource::Inline(bytes) } => {
            Ok(PreparedEntry::File { archive_path, bytes, mode: FILE_MODE })
        }
        ArchiveEntry::File { archive_path, source: FileSource::Copy(path) } => {
            let FileContent { bytes, mode } = io_gate
                .read_file(&path)
                .await
                .map_err(|error| BuildArchiveError::ReadSource { path, error })?;
            let mode = if is_executable(mode) { EXEC_MODE } else { FILE_MODE };
            Ok(PreparedEntry::File { archive_path, bytes, mode })
        }
        ArchiveEntry::Symlink { archive_path, link_target } => {
            Ok(PreparedEntry::Symlink { archive_path, link_target })
        }
    }
}

/// Append every received entry to a tar stream over `temp`, then finish the stream.
fn write_archive(
    mut temp: NamedTempFile,
    mut receiver: mpsc::Receiver<PreparedEntry>,
) -> Result<(NamedTempFile, ArchiveSummary), BuildArchiveError> {
    let mut summary = ArchiveSummary { files: 0, symlinks: 0 };
    let mut builder = tar::Builder::new(BufWriter::new(temp.as_file_mut()));

    while let Some(entry) = receiver.blocking_recv() {
        match entry {
            PreparedEntry::File { archive_path, bytes, mode } => {
                let mut header = new_header(EntryType::Regular, mode);
                header.set_size(bytes.len() as u64);
                let path = relative_path::join(ARCHIVE_ROOT, &archive_path);
                builder
                    .append_data(&mut header, path, bytes.as_slice())
                    .map_err(|error| BuildArchiveError::WriteEntry { archive_path, error })?;
                summary.files += 1;
            }
            PreparedEntry::Symlink { archive_path, link_target } => {
                let mut header = new_header(EntryType::Symlink, SYMLINK_MODE);
                header.set_size(0);
                let path = relative_path::join(ARCHIVE_ROOT, &archive_path);
                builder
                    .append_link(&mut header, path, &link_target)
                    .map_err(|error| BuildArchiveError::WriteEntry { archive_path, error })?;
                summary.symlinks += 1;
            }
        }
    }

    builder
        .into_inner()
        .and_then(|mut writer| writer.flush())
        .map_err(BuildArchiveError::Finish)?;
    temp.as_file().sync_all().map_err(BuildArchiveError::Finish)?;
    Ok((temp, summary))
}

/// GNU header without timestamps or owners.
fn new_header(entry_type: EntryType, mode: u32) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mode(mode);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header
}
