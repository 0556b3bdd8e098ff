use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::{tempdir, TempDir};
use text_block_macros::text_block_fnl;
use walkdir::WalkDir;

/// Lockfile of [`WorkspaceFixture::sample`].
pub const SAMPLE_LOCKFILE: &str = text_block_fnl! {
    "lockfileVersion: 5.4"
    ""
    "importers:"
    ""
    "  .:"
    "    specifiers:"
    "      jest: ^29.0.0"
    "      left-pad: ^1.0.0"
    "      util: workspace:*"
    "    dependencies:"
    "      left-pad: 1.0.0"
    "      util: link:libs/util"
    "    devDependencies:"
    "      jest: 29.0.0"
    ""
    "  libs/util:"
    "    specifiers:"
    "      lodash: ^4.0.0"
    "    dependencies:"
    "      lodash: 4.0.0"
    ""
    "packages:"
    ""
    "  /jest/29.0.0:"
    "    resolution: {integrity: sha512-jest}"
    "    dev: true"
    ""
    "  /left-pad/1.0.0:"
    "    resolution: {integrity: sha512-left}"
    "    dev: false"
    ""
    "  /lodash/4.0.0:"
    "    resolution: {integrity: sha512-lodash}"
    "    dev: false"
};

/// Manifest of the root package of [`WorkspaceFixture::sample`].
pub const SAMPLE_ROOT_MANIFEST: &str = text_block_fnl! {
    r#"{"#
    r#"  "name": "app","#
    r#"  "version": "1.0.0","#
    r#"  "main": "index.js","#
    r#"  "files": ["/index.js"],"#
    r#"  "dependencies": {"#
    r#"    "left-pad": "^1.0.0","#
    r#"    "util": "workspace:*""#
    r#"  },"#
    r#"  "devDependencies": {"#
    r#"    "jest": "^29.0.0""#
    r#"  },"#
    r#"  "scripts": {"#
    r#"    "start": "node index.js""#
    r#"  }"#
    r#"}"#
};

/// A workspace inside a temporary directory.
///
/// The workspace sits at `{root}/workspace` so that tests can place files beside it.
pub struct WorkspaceFixture {
    root: TempDir,
    workspace: PathBuf,
}

impl WorkspaceFixture {
    /// Create an empty workspace.
    pub fn new() -> Self {
        let root = tempdir().expect("create temporary directory");
        let workspace = root.path().join("workspace");
        fs::create_dir(&workspace).expect("create temporary workspace");
        WorkspaceFixture { root, workspace }
    }

    /// Temporary directory that contains the workspace.
    pub fn root(&self) -> &'_ Path {
        self.root.path()
    }

    /// Directory of the workspace.
    pub fn workspace(&self) -> &'_ Path {
        &self.workspace
    }

    /// Absolute path of `path` inside the workspace.
    pub fn path(&self, path: &str) -> PathBuf {
        self.workspace.join(path)
    }

    /// Write a file, creating its parent directories.
    pub fn file(&self, path: &str, content: impl AsRef<[u8]>) -> &'_ Self {
        let path = self.path(path);
        let parent = path.parent().expect("file path has a parent");
        fs::create_dir_all(parent).expect("create parent directory");
        fs::write(&path, content).expect("write file");
        self
    }

    /// Write a file with mode `0o755`.
    #[cfg(unix)]
    pub fn executable(&self, path: &str, content: impl AsRef<[u8]>) -> &'_ Self {
        use std::os::unix::fs::PermissionsExt;
        self.file(path, content);
        fs::set_permissions(self.path(path), fs::Permissions::from_mode(0o755))
            .expect("make file executable");
        self
    }

    /// Create a symlink at `path` whose link text is `target`.
    #[cfg(unix)]
    pub fn symlink(&self, path: &str, target: &str) -> &'_ Self {
        let path = self.path(path);
        let parent = path.parent().expect("symlink path has a parent");
        fs::create_dir_all(parent).expect("create parent directory");
        std::os::unix::fs::symlink(target, path).expect("create symlink");
        self
    }

    /// Write `pnpm-lock.yaml` at the root of the workspace.
    pub fn lockfile(&self, yaml: &str) -> &'_ Self {
        self.file("pnpm-lock.yaml", yaml)
    }

    /// Paths of every file and symlink of the workspace, `/`-separated and sorted.
    pub fn list_files(&self) -> Vec<String> {
        WalkDir::new(&self.workspace)
            .sort_by_file_name()
            .into_iter()
            .map(|entry| entry.expect("access entry"))
            .filter(|entry| !entry.file_type().is_dir())
            .map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.workspace)
                    .expect("strip prefix from path")
                    .to_str()
                    .expect("convert path to UTF-8")
                    .replace('\\', "/")
            })
            .collect()
    }

    /// An installed workspace.
    ///
    /// * The root package `app` depends on `left-pad@1.0.0` and on the workspace package
    ///   `libs/util`, and has `jest@29.0.0` as a dev dependency.
    /// * `libs/util` depends on `lodash@4.0.0`.
    /// * The virtual store at `node_modules/.pnpm` holds every external package, the way
    ///   `pnpm install` leaves it.
    #[cfg(unix)]
    pub fn sample() -> Self {
        let fixture = WorkspaceFixture::new();
        fixture
            .lockfile(SAMPLE_LOCKFILE)
            .file("package.json", SAMPLE_ROOT_MANIFEST)
            .file("index.js", "require('left-pad'); require('util');\n")
            .file("libs/util/package.json", r#"{"name":"util","version":"0.1.0","dependencies":{"lodash":"^4.0.0"}}"#)
            .file("libs/util/index.js", "module.exports = require('lodash');\n")
            .symlink("libs/util/node_modules/lodash", "../../../node_modules/.pnpm/lodash@4.0.0/node_modules/lodash")
            .symlink("node_modules/left-pad", ".pnpm/left-pad@1.0.0/node_modules/left-pad")
            .symlink("node_modules/util", "../libs/util")
            .symlink("node_modules/jest", ".pnpm/jest@29.0.0/node_modules/jest")
            .file("node_modules/.pnpm/left-pad@1.0.0/node_modules/left-pad/package.json", r#"{"name":"left-pad","version":"1.0.0"}"#)
            .file("node_modules/.pnpm/left-pad@1.0.0/node_modules/left-pad/index.js", "module.exports = leftPad;\n")
            .symlink("node_modules/.pnpm/left-pad@1.0.0/node_modules/left-pad/bin/left-pad", "../index.js")
            .file("node_modules/.pnpm/lodash@4.0.0/node_modules/lodash/package.json", r#"{"name":"lodash","version":"4.0.0"}"#)
            .file("node_modules/.pnpm/lodash@4.0.0/node_modules/lodash/lodash.js", "module.exports = {};\n")
            .executable("node_modules/.pnpm/lodash@4.0.0/node_modules/lodash/cli.js", "#!/usr/bin/env node\n")
            .file("node_modules/.pnpm/jest@29.0.0/node_modules/jest/package.json", r#"{"name":"jest","version":"29.0.0"}"#)
            .file("node_modules/.pnpm/jest@29.0.0/node_modules/jest/index.js", "module.exports = jest;\n");
        fixture
    }
}

impl Default for WorkspaceFixture {
    fn default() -> Self {
        WorkspaceFixture::new()
    }
}
