use std::{fs::File, io::Read, path::Path};
use tar::{Archive, EntryType};

/// Content of one archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveItem {
    File { content: Vec<u8>, mode: u32 },
    Symlink { target: String },
}

impl ArchiveItem {
    /// Content of a file entry as text.
    pub fn text(&self) -> &'_ str {
        match self {
            ArchiveItem::File { content, .. } => {
                std::str::from_utf8(content).expect("file content is UTF-8")
            }
            ArchiveItem::Symlink { target } => panic!("expected a file, found symlink to {target}"),
        }
    }

    /// Link text of a symlink entry.
    pub fn link_target(&self) -> &'_ str {
        match self {
            ArchiveItem::Symlink { target } => target,
            ArchiveItem::File { .. } => panic!("expected a symlink, found a file"),
        }
    }
}

/// Read every entry of a tar archive, in archive order.
///
/// Panics on entries other than regular files and symlinks, and on headers that carry a
/// modification time or an owner.
pub fn read_archive(path: &Path) -> Vec<(String, ArchiveItem)> {
    let file = File::open(path).expect("open archive");
    let mut archive = Archive::new(file);
    let mut items = Vec::new();

    for entry in archive.entries().expect("list archive entries") {
        let mut entry = entry.expect("read archive entry");
        let entry_path = entry
            .path()
            .expect("read entry path")
            .to_str()
            .expect("entry path is UTF-8")
            .to_string();
        let header = entry.header();
        assert_eq!(header.mtime().expect("read mtime"), 0, "mtime of {entry_path}");
        assert_eq!(header.uid().expect("read uid"), 0, "uid of {entry_path}");
        assert_eq!(header.gid().expect("read gid"), 0, "gid of {entry_path}");
        let mode = header.mode().expect("read mode");

        let item = match header.entry_type() {
            EntryType::Regular => {
                let mut content = Vec::new();
                entry.read_to_end(&mut content).expect("read entry content");
                ArchiveItem::File { content, mode }
            }
            EntryType::Symlink => {
                let target = entry
                    .link_name()
                    .expect("read link name")
                    .expect("symlink has a link name")
                    .to_str()
                    .expect("link name is UTF-8")
                    .to_string();
                ArchiveItem::Symlink { target }
            }
            other => panic!("unexpected entry type {other:?} at {entry_path}"),
        };
        items.push((entry_path, item));
    }

    items
}

/// Paths of every entry of a tar archive, in archive order.
pub fn archive_paths(path: &Path) -> Vec<String> {
    read_archive(path).into_iter().map(|(path, _)| path).collect()
}
