//! List the files of a package that a registry publish step would upload.

use derive_more::{Display, Error};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use pipe_trait::Pipe;
use pnbundle_diagnostics::miette::{self, Diagnostic};
use pnbundle_package_manifest::PackageManifest;
use std::{
    collections::BTreeSet,
    fs, io,
    path::{Component, Path, PathBuf},
};

/// Directories that never take part in a package, wherever they are.
const ALWAYS_EXCLUDED_DIRS: &[&str] = &["node_modules", ".git", ".svn", ".hg", "CVS"];

/// File name patterns that never take part in a package.
const ALWAYS_EXCLUDED_FILES: &[&str] = &[
    ".DS_Store",
    "._*",
    ".npmignore",
    ".gitignore",
    ".npmrc",
    "npm-debug.log",
    "*.orig",
    ".*.swp",
    ".lock-wscript",
    ".wafpickle-*",
    "config.gypi",
    "package-lock.json",
    "pnpm-lock.yaml",
];

/// Case-insensitive prefixes of top-level files that are always part of a package.
const ALWAYS_INCLUDED_PREFIXES: &[&str] = &["readme", "license", "licence", "changelog"];

const NPM_IGNORE: &str = ".npmignore";

/// Error type of [`list_publishable_files`].
#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum ListPublishableFilesError {
    #[display("Failed to walk the package directory: {_0}")]
    #[diagnostic(code(pnbundle_packlist::walk))]
    Walk(#[error(source)] ignore::Error),

    #[display("Failed to read directory {path:?}: {error}")]
    #[diagnostic(code(pnbundle_packlist::read_dir))]
    ReadDir {
        path: PathBuf,
        #[error(source)]
        error: io::Error,
    },

    #[display("Invalid file pattern {pattern:?}: {error}")]
    #[diagnostic(code(pnbundle_packlist::invalid_pattern))]
    InvalidPattern {
        pattern: String,
        #[error(source)]
        error: globset::Error,
    },

    #[display("Path {_0:?} is not valid UTF-8")]
    #[diagnostic(code(pnbundle_packlist::non_utf8_path))]
    NonUtf8Path(#[error(not(source))] PathBuf),
}

/// List the publishable files of the package in `package_dir`.
///
/// * With a `files` field in the manifest, only the matching paths are kept. A pattern that
///   names a directory keeps its whole subtree.
/// * Otherwise `.npmignore` files are honored, or `.gitignore` files when the package root
///   has no `.npmignore`.
/// * Version control directories, `node_modules` and a few well-known junk files are always
///   left out. Symlinks are skipped.
/// * `package.json`, readme, license and changelog files at the root are always kept, and
///   so are the files named by `main`, `browser` and `bin`.
///
/// The result is sorted, with `/` as the separator.
pub fn list_publishable_files(
    package_dir: &Path,
    manifest: &PackageManifest,
) -> Result<Vec<String>, ListPublishableFilesError> {
    let excluded_files = ALWAYS_EXCLUDED_FILES.iter().map(|pattern| pattern.to_string());
    let excluded_files = compile_globset(excluded_files)?;
    let included_patterns = manifest.files().map(files_field_globset).transpose()?;

    let mut walker = WalkBuilder::new(package_dir);
    walker
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            let is_dir = entry.file_type().is_some_and(|file_type| file_type.is_dir());
            let excluded = entry
                .file_name()
                .to_str()
                .is_some_and(|name| ALWAYS_EXCLUDED_DIRS.contains(&name));
            entry.depth() == 0 || !(is_dir && excluded)
        });
    if included_patterns.is_none() {
        if package_dir.join(NPM_IGNORE).is_file() {
            walker.add_custom_ignore_filename(NPM_IGNORE);
        } else {
            walker.git_ignore(true).require_git(false);
        }
    }

    let mut files = BTreeSet::new();
    for entry in walker.build() {
        let entry = entry.map_err(ListPublishableFilesError::Walk)?;
        if !entry.file_type().is_some_and(|file_type| file_type.is_file()) {
            continue;
        }
        if excluded_files.is_match(entry.file_name()) {
            continue;
        }
        let relative = relative_unix_path(package_dir, entry.path())?;
        if let Some(patterns) = &included_patterns {
            if !patterns.is_match(&relative) {
                continue;
            }
        }
        files.insert(relative);
    }

    files.extend(always_included_files(package_dir, manifest)?);
    Ok(files.into_iter().collect())
}

fn compile_globset(
    patterns: impl IntoIterator<Item = String>,
) -> Result<GlobSet, ListPublishableFilesError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map_err(|error| ListPublishableFilesError::InvalidPattern { pattern, error })?;
        builder.add(glob);
    }
    builder.build().map_err(|error| ListPublishableFilesError::InvalidPattern {
        pattern: String::new(),
        error,
    })
}

/// Every `files` entry matches itself and everything beneath it.
///
/// Like a gitignore line, an entry with a leading or inner slash is anchored at the package
/// root and one without matches at any depth.
fn files_field_globset(patterns: Vec<&str>) -> Result<GlobSet, ListPublishableFilesError> {
    patterns
        .into_iter()
        .filter_map(|pattern| {
            let anchored = pattern.trim_end_matches('/').contains('/');
            let pattern = normalize_pattern(pattern);
            match (pattern.is_empty(), anchored) {
                (true, _) => None,
                (false, true) => Some(pattern.to_string()),
                (false, false) => Some(format!("**/{pattern}")),
            }
        })
        .flat_map(|pattern| [format!("{pattern}/**"), pattern])
        .pipe(compile_globset)
}

fn normalize_pattern(pattern: &str) -> &str {
    let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
    pattern.trim_start_matches('/').trim_end_matches('/')
}

fn relative_unix_path(base: &Path, path: &Path) -> Result<String, ListPublishableFilesError> {
    let relative = path.strip_prefix(base).unwrap_or(path);
    let mut segments = Vec::new();
    for component in relative.components() {
        let segment = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| ListPublishableFilesError::NonUtf8Path(path.to_path_buf()))?;
        segments.push(segment);
    }
    Ok(segments.join("/"))
}

fn always_included_files(
    package_dir: &Path,
    manifest: &PackageManifest,
) -> Result<Vec<String>, ListPublishableFilesError> {
    let read_dir_error = |error: io::Error| ListPublishableFilesError::ReadDir {
        path: package_dir.to_path_buf(),
        error,
    };
    let mut found = Vec::new();

    for entry in fs::read_dir(package_dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        if !entry.file_type().map_err(read_dir_error)?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let lowercase = name.to_ascii_lowercase();
        let always_included = name == PackageManifest::FILE_NAME
            || ALWAYS_INCLUDED_PREFIXES.iter().any(|prefix| lowercase.starts_with(prefix));
        if always_included {
            found.push(name);
        }
    }

    let entry_points = manifest.main().into_iter().chain(manifest.browser());
    for path in entry_points.chain(manifest.bin_paths()).map(normalize_pattern) {
        let path = Path::new(path);
        let inside = path.components().all(|component| matches!(component, Component::Normal(_)));
        if inside && package_dir.join(path).is_file() {
            found.push(relative_unix_path(Path::new(""), path)?);
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn write(dir: &Path, path: &str, content: &str) {
        let path = dir.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn list(dir: &Path) -> Vec<String> {
        let manifest = PackageManifest::from_dir(dir).unwrap();
        list_publishable_files(dir, &manifest).unwrap()
    }

    #[test]
    fn default_rules() {
        let dir = tempdir().unwrap();
        let dir = dir.path();
        write(dir, "package.json", r#"{ "name": "util" }"#);
        write(dir, "index.js", "");
        write(dir, "lib/a.js", "");
        write(dir, "lib/.DS_Store", "");
        write(dir, "node_modules/dep/index.js", "");
        write(dir, ".git/HEAD", "");
        write(dir, ".npmrc", "");
        write(dir, "file.orig", "");
        write(dir, ".hidden.js", "");
        write(dir, "README.md", "");

        assert_eq!(list(dir), [".hidden.js", "README.md", "index.js", "lib/a.js", "package.json"]);
    }

    #[test]
    fn npmignore_wins_over_gitignore() {
        let dir = tempdir().unwrap();
        let dir = dir.path();
        write(dir, "package.json", r#"{ "name": "util" }"#);
        write(dir, ".gitignore", "dist\n");
        write(dir, ".npmignore", "test\n*.log\n");
        write(dir, "dist/index.js", "");
        write(dir, "test/index.test.js", "");
        write(dir, "debug.log", "");
        write(dir, "src/index.js", "");

        assert_eq!(list(dir), ["dist/index.js", "package.json", "src/index.js"]);
    }

    #[test]
    fn gitignore_without_npmignore() {
        let dir = tempdir().unwrap();
        let dir = dir.path();
        write(dir, "package.json", r#"{ "name": "util" }"#);
        write(dir, ".gitignore", "dist\n");
        write(dir, "lib/.gitignore", "*.tmp\n");
        write(dir, "dist/index.js", "");
        write(dir, "lib/keep.js", "");
        write(dir, "lib/drop.tmp", "");

        assert_eq!(list(dir), ["lib/keep.js", "package.json"]);
    }

    #[test]
    fn files_field() {
        let dir = tempdir().unwrap();
        let dir = dir.path();
        write(
            dir,
            "package.json",
            r#"{ "name": "util", "main": "./main.js", "files": ["lib/", "bin/*.js"] }"#,
        );
        write(dir, "main.js", "");
        write(dir, "lib/a.js", "");
        write(dir, "lib/deep/b.js", "");
        write(dir, "bin/cli.js", "");
        write(dir, "bin/nested/skip.js", "");
        write(dir, "src/skip.js", "");
        write(dir, "LICENSE", "");
        write(dir, "CHANGELOG.md", "");

        assert_eq!(
            list(dir),
            [
                "CHANGELOG.md",
                "LICENSE",
                "bin/cli.js",
                "lib/a.js",
                "lib/deep/b.js",
                "main.js",
                "package.json",
            ],
        );
    }

    #[test]
    fn entry_points_are_always_kept() {
        let dir = tempdir().unwrap();
        let dir = dir.path();
        write(
            dir,
            "package.json",
            r#"{ "name": "util", "files": ["lib"], "browser": "browser.js", "bin": { "util": "./bin/cli.js" } }"#,
        );
        write(dir, "lib/a.js", "");
        write(dir, "bin/cli.js", "");
        write(dir, "browser.js", "");
        write(dir, "other.js", "");

        assert_eq!(list(dir), ["bin/cli.js", "browser.js", "lib/a.js", "package.json"]);

        eprintln!("CASE: bin as a string");
        write(dir, "package.json", r#"{ "name": "util", "files": ["lib"], "bin": "cli.js" }"#);
        write(dir, "cli.js", "");
        assert_eq!(list(dir), ["cli.js", "lib/a.js", "package.json"]);
    }

    #[test]
    fn files_pattern_anchoring() {
        let dir = tempdir().unwrap();
        let dir = dir.path();
        write(
            dir,
            "package.json",
            r#"{ "name": "util", "files": ["*.js", "docs/*.md", "/root.txt", "./top.txt"] }"#,
        );
        write(dir, "index.js", "");
        write(dir, "root.txt", "");
        write(dir, "lib/root.txt", "");
        write(dir, "top.txt", "");
        write(dir, "lib/top.txt", "");
        write(dir, "lib/a.js", "");
        write(dir, "lib/deep/b.js", "");
        write(dir, "lib/c.ts", "");
        write(dir, "docs/guide.md", "");
        write(dir, "docs/api/deep.md", "");

        assert_eq!(
            list(dir),
            [
                "docs/guide.md",
                "index.js",
                "lib/a.js",
                "lib/deep/b.js",
                "package.json",
                "root.txt",
                "top.txt",
            ],
        );
    }

    #[test]
    fn main_outside_package_is_ignored() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "pkg/package.json",
            r#"{ "name": "util", "main": "../outside.js", "files": [] }"#,
        );
        write(dir.path(), "outside.js", "");
        assert_eq!(list(&dir.path().join("pkg")), ["package.json"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped() {
        let dir = tempdir().unwrap();
        let dir = dir.path();
        write(dir, "package.json", r#"{ "name": "util" }"#);
        write(dir, "real.js", "");
        std::os::unix::fs::symlink("real.js", dir.join("alias.js")).unwrap();
        assert_eq!(list(dir), ["package.json", "real.js"]);
    }
}
