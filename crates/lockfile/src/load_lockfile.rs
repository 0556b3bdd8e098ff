use crate::Lockfile;
use derive_more::{Display, Error};
use pipe_trait::Pipe;
use pnbundle_diagnostics::miette::{self, Diagnostic};
use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

/// Error when reading lockfile the filesystem.
#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum LoadLockfileError {
    #[display("No lockfile was found at {_0:?}")]
    #[diagnostic(
        code(pnbundle_lockfile::not_found),
        help("Run `pnpm install` in the workspace to create the lockfile")
    )]
    NotFound(#[error(not(source))] PathBuf),

    #[display("Failed to read lockfile content from {path:?}: {error}")]
    #[diagnostic(code(pnbundle_lockfile::read_file))]
    ReadFile {
        path: PathBuf,
        #[error(source)]
        error: io::Error,
    },

    #[display("Failed to parse lockfile content as YAML: {_0}")]
    #[diagnostic(code(pnbundle_lockfile::parse_yaml))]
    ParseYaml(#[error(source)] serde_yaml::Error),
}

impl Lockfile {
    /// Load the lockfile that sits in `lockfile_dir`.
    pub fn load_from_dir(lockfile_dir: &Path) -> Result<Self, LoadLockfileError> {
        let file_path = lockfile_dir.join(Lockfile::FILE_NAME);
        let content = match fs::read_to_string(&file_path) {
            Ok(content) => content,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return file_path.pipe(LoadLockfileError::NotFound).pipe(Err);
            }
            Err(error) => return Err(LoadLockfileError::ReadFile { path: file_path, error }),
        };
        content.pipe_as_ref(serde_yaml::from_str).map_err(LoadLockfileError::ParseYaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn load_from_dir() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(Lockfile::FILE_NAME),
            "lockfileVersion: 5.4\nimporters:\n  .:\n    specifiers: {}\n",
        )
        .unwrap();
        let lockfile = Lockfile::load_from_dir(dir.path()).unwrap();
        assert_eq!(lockfile.project_snapshot.importer_ids(), ["."]);
        assert_eq!(lockfile.packages, None);
    }

    #[test]
    fn missing_lockfile() {
        let dir = tempdir().unwrap();
        let error = Lockfile::load_from_dir(dir.path()).unwrap_err();
        assert!(matches!(
            error,
            LoadLockfileError::NotFound(path) if path.ends_with(Lockfile::FILE_NAME)
        ));
    }

    #[test]
    fn invalid_yaml() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(Lockfile::FILE_NAME), "lockfileVersion: [").unwrap();
        let error = Lockfile::load_from_dir(dir.path()).unwrap_err();
        assert!(matches!(error, LoadLockfileError::ParseYaml(_)));
    }
}
