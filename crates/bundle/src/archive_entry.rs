use std::path::PathBuf;

/// One record of the archive, before the archive root prefix is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveEntry {
    File { archive_path: String, source: FileSource },
    /// The link text is stored as is, it is never resolved.
    Symlink { archive_path: String, link_target: String },
}

/// Where the bytes of an [`ArchiveEntry::File`] come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Copy the file at this path.
    Copy(PathBuf),
    /// Synthesized content.
    Inline(Vec<u8>),
}

impl ArchiveEntry {
    pub fn archive_path(&self) -> &'_ str {
        match self {
            ArchiveEntry::File { archive_path, .. }
            | ArchiveEntry::Symlink { archive_path, .. } => archive_path,
        }
    }
}
