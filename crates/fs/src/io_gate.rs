use pipe_trait::Pipe;
use std::{
    ffi::OsString,
    fs::{FileType, Metadata},
    future::IntoFuture,
    io,
    path::{Path, PathBuf},
};
use tokio::{fs, io::AsyncReadExt, sync::Semaphore};

/// Admission queue in front of every filesystem read.
///
/// Each operation holds one permit of a [`Semaphore`] while it runs, so the number of
/// simultaneously open file descriptors never exceeds [`capacity`](IoGate::capacity).
/// Waiters are admitted in FIFO order. A permit is released when the operation completes,
/// whether it succeeded or not.
#[derive(Debug)]
pub struct IoGate {
    semaphore: Semaphore,
    capacity: usize,
}

/// Name and type of a directory entry, as reported without following symlinks.
#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub name: OsString,
    pub file_type: FileType,
}

/// Bytes of a regular file and its permission bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub bytes: Vec<u8>,
    pub mode: u32,
}

impl IoGate {
    /// Default number of simultaneous operations.
    pub const DEFAULT_CAPACITY: usize = 1000;

    /// Create a gate admitting at most `capacity` operations at once.
    ///
    /// A `capacity` of `0` is raised to `1`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let semaphore = Semaphore::new(capacity);
        IoGate { semaphore, capacity }
    }

    /// Maximum number of simultaneous operations.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of operations that could be admitted right now.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Acquire a permit and run `proc` while holding it.
    pub async fn run_with_permit<Proc, ProcFuture>(&self, proc: Proc) -> ProcFuture::Output
    where
        Proc: FnOnce() -> ProcFuture,
        ProcFuture: IntoFuture,
    {
        let permit =
            self.semaphore.acquire().await.expect("semaphore shouldn't have been closed this soon");
        let result = proc().await;
        drop(permit);
        result
    }

    /// Run blocking work (such as a synchronous directory walk) on the blocking pool
    /// while holding a permit.
    pub async fn run_blocking<Work, Output>(&self, work: Work) -> io::Result<Output>
    where
        Work: FnOnce() -> Output + Send + 'static,
        Output: Send + 'static,
    {
        self.run_with_permit(|| tokio::task::spawn_blocking(work))
            .await
            .map_err(io::Error::other)
    }

    /// Query metadata of `path` without following a final symlink.
    pub async fn symlink_metadata(&self, path: &Path) -> io::Result<Metadata> {
        self.run_with_permit(|| fs::symlink_metadata(path)).await
    }

    /// List a directory. Entries are sorted by name so that listings are reproducible.
    pub async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = self
            .run_with_permit(|| async {
                let mut reader = fs::read_dir(path).await?;
                let mut entries = Vec::new();
                while let Some(entry) = reader.next_entry().await? {
                    let file_type = entry.file_type().await?;
                    entries.push(DirEntryInfo { name: entry.file_name(), file_type });
                }
                Ok::<_, io::Error>(entries)
            })
            .await?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Read the target of a symlink without resolving it.
    pub async fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.run_with_permit(|| fs::read_link(path)).await
    }

    /// Read the whole content of a file together with its permission bits.
    pub async fn read_file(&self, path: &Path) -> io::Result<FileContent> {
        self.run_with_permit(|| async {
            let mut file = fs::File::open(path).await?;
            let mode = file.metadata().await?.pipe_ref(permission_bits);
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes).await?;
            Ok::<_, io::Error>(FileContent { bytes, mode })
        })
        .await
    }
}

impl Default for IoGate {
    fn default() -> Self {
        IoGate::new(IoGate::DEFAULT_CAPACITY)
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        crate::FILE_MODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future;
    use pretty_assertions::assert_eq;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use tempfile::tempdir;

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let gate = IoGate::new(0);
        assert_eq!(gate.capacity(), 1);
        assert_eq!(gate.available_permits(), 1);
    }

    #[tokio::test]
    async fn in_flight_operations_never_exceed_capacity() {
        let gate = IoGate::new(3);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..32).map(|_| {
            let gate = &gate;
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                gate.run_with_permit(|| async {
                    let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(current, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                })
                .await
            }
        });
        future::join_all(tasks).await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(gate.available_permits(), 3);
    }

    #[tokio::test]
    async fn permit_is_released_on_failure() {
        let gate = IoGate::new(1);
        let dir = tempdir().unwrap();
        gate.read_file(&dir.path().join("missing")).await.unwrap_err();
        assert_eq!(gate.available_permits(), 1);
    }

    #[tokio::test]
    async fn read_dir_is_sorted_and_does_not_follow_symlinks() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("c")).unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink("c", dir.path().join("d")).unwrap();

        let entries = IoGate::default().read_dir(dir.path()).await.unwrap();
        let names: Vec<_> =
            entries.iter().map(|entry| entry.name.to_string_lossy().into_owned()).collect();

        #[cfg(unix)]
        {
            assert_eq!(names, ["a.txt", "b.txt", "c", "d"]);
            assert!(entries[3].file_type.is_symlink());
        }
        #[cfg(not(unix))]
        assert_eq!(names, ["a.txt", "b.txt", "c"]);
        assert!(entries[0].file_type.is_file());
        assert!(entries[2].file_type.is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn read_link_returns_raw_target() {
        let dir = tempdir().unwrap();
        std::os::unix::fs::symlink("../does/not/exist", dir.path().join("link")).unwrap();
        let target = IoGate::default().read_link(&dir.path().join("link")).await.unwrap();
        assert_eq!(target, PathBuf::from("../does/not/exist"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn read_file_reports_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join("bin.js");
        std::fs::write(&path, "#!/usr/bin/env node").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let content = IoGate::default().read_file(&path).await.unwrap();
        assert_eq!(content, FileContent { bytes: b"#!/usr/bin/env node".to_vec(), mode: 0o755 });
    }
}
