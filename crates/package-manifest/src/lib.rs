use std::{
    fs, io,
    path::{Path, PathBuf},
};

use derive_more::{Display, Error};
use miette::Diagnostic;
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use strum::IntoStaticStr;

/// Error type of [`PackageManifest`].
#[derive(Debug, Display, Error, Diagnostic)]
#[non_exhaustive]
pub enum PackageManifestError {
    #[display("No package.json was found in {_0:?}")]
    #[diagnostic(code(pnbundle_package_manifest::no_manifest_found))]
    NoManifestFound(#[error(not(source))] PathBuf),

    #[display("Failed to read {path:?}: {error}")]
    #[diagnostic(code(pnbundle_package_manifest::read_file))]
    ReadFile {
        path: PathBuf,
        #[error(source)]
        error: io::Error,
    },

    #[display("Failed to parse {path:?}: {error}")]
    #[diagnostic(code(pnbundle_package_manifest::parse_json))]
    ParseJson {
        path: PathBuf,
        #[error(source)]
        error: serde_json::Error,
    },

    #[display("Expecting {path:?} to contain a JSON object")]
    #[diagnostic(code(pnbundle_package_manifest::not_an_object))]
    NotAnObject {
        #[error(not(source))]
        path: PathBuf,
    },

    #[display("The manifest at {path:?} has no `name` field")]
    #[diagnostic(
        code(pnbundle_package_manifest::missing_name),
        help("Every workspace package that takes part in a bundle needs a name")
    )]
    MissingName {
        #[error(not(source))]
        path: PathBuf,
    },

    #[display("Failed to serialize the manifest: {_0}")]
    #[diagnostic(code(pnbundle_package_manifest::serialize))]
    Serialize(#[error(source)] serde_json::Error),
}

/// Dependency fields of a manifest, named by their JSON key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum DependencyGroup {
    #[strum(serialize = "dependencies")]
    Prod,
    #[strum(serialize = "devDependencies")]
    Dev,
    #[strum(serialize = "optionalDependencies")]
    Optional,
}

/// Content of the `package.json` files and its path.
#[derive(Debug, Clone)]
pub struct PackageManifest {
    path: PathBuf,
    value: Value,
}

impl PackageManifest {
    /// File name of a manifest inside a package directory.
    pub const FILE_NAME: &'static str = "package.json";

    /// Number of spaces a nesting level is indented by when a manifest is written out.
    pub const INDENT: &'static [u8] = b"    ";

    pub fn from_path(path: PathBuf) -> Result<PackageManifest, PackageManifestError> {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(PackageManifestError::NoManifestFound(path));
            }
            Err(error) => return Err(PackageManifestError::ReadFile { path, error }),
        };
        PackageManifest::from_json(path, &text)
    }

    /// Load `package.json` from a package directory.
    pub fn from_dir(dir: &Path) -> Result<PackageManifest, PackageManifestError> {
        PackageManifest::from_path(dir.join(PackageManifest::FILE_NAME))
    }

    /// Parse manifest text that was already read from `path`.
    pub fn from_json(path: PathBuf, text: &str) -> Result<PackageManifest, PackageManifestError> {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(error) => return Err(PackageManifestError::ParseJson { path, error }),
        };
        if !value.is_object() {
            return Err(PackageManifestError::NotAnObject { path });
        }
        Ok(PackageManifest { path, value })
    }

    pub fn name(&self) -> Result<&'_ str, PackageManifestError> {
        self.value
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| PackageManifestError::MissingName { path: self.path.clone() })
    }

    /// Value of the `main` field.
    pub fn main(&self) -> Option<&'_ str> {
        self.value.get("main").and_then(Value::as_str)
    }

    /// Patterns of the `files` field, or `None` when the field is absent.
    ///
    /// Non-string items are ignored.
    pub fn files(&self) -> Option<Vec<&'_ str>> {
        self.value
            .get("files")
            .and_then(Value::as_array)
            .map(|patterns| patterns.iter().filter_map(Value::as_str).collect())
    }

    /// Value of the `browser` field when it names a single file.
    pub fn browser(&self) -> Option<&'_ str> {
        self.value.get("browser").and_then(Value::as_str)
    }

    /// Paths of the executables declared by the `bin` field.
    pub fn bin_paths(&self) -> Vec<&'_ str> {
        match self.value.get("bin") {
            Some(Value::String(path)) => vec![path.as_str()],
            Some(Value::Object(map)) => map.values().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Turn this manifest into the one shipped inside a bundle.
    ///
    /// The `dependencies` field and any `bundleDependencies` list are removed and
    /// `bundledDependencies` is set to `true`. Every other key keeps its position.
    #[must_use]
    pub fn into_bundled(mut self) -> PackageManifest {
        if let Some(map) = self.value.as_object_mut() {
            map.shift_remove(<&str>::from(DependencyGroup::Prod));
            map.shift_remove("bundleDependencies");
            map.insert("bundledDependencies".to_string(), Value::Bool(true));
        }
        self
    }

    /// Serialize the manifest with a four-space indent and no trailing newline.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, PackageManifestError> {
        let mut bytes = Vec::new();
        let formatter = PrettyFormatter::with_indent(PackageManifest::INDENT);
        let mut serializer = Serializer::with_formatter(&mut bytes, formatter);
        self.value.serialize(&mut serializer).map_err(PackageManifestError::Serialize)?;
        Ok(bytes)
    }
}
