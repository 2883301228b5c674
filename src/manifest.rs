//! Project manifest read/write.
//!
//! The manifest is a JSON object on disk (`./package.json` by default)
//! holding at least a project `name` and a `major.minor.revision` `version`.
//! All other fields are carried through a read/write round trip untouched.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value};
use thiserror::Error;

use crate::version::{Version, VersionError};

/// Errors produced while reading or writing the manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The file could not be read
    #[error("{path} could not be read: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON
    #[error("{path} could not be parsed; make sure it is a valid JSON document")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The file parsed, but the top level is not an object
    #[error("{path} does not contain a JSON object")]
    NotAnObject { path: PathBuf },

    /// The manifest has no usable `name` field
    #[error("manifest is missing a string \"name\" field")]
    MissingName,

    /// The manifest has no usable `version` field
    #[error("manifest is missing a string \"version\" field")]
    MissingVersion,

    /// The `version` field does not parse
    #[error(transparent)]
    Version(#[from] VersionError),

    /// The document could not be serialized back to JSON
    #[error("{path} could not be serialized: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The file could not be written
    #[error("{path} could not be written: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `init` refused to overwrite an existing manifest
    #[error("{path} already exists")]
    AlreadyExists { path: PathBuf },
}

/// The project manifest, bound to its file path.
///
/// Fields other than `name` and `version` are opaque payload: they are
/// preserved exactly and written back on save.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    doc: Map<String, Value>,
}

impl Manifest {
    /// Read and parse the manifest at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref().to_path_buf();

        let text = fs::read_to_string(&path)
            .map_err(|source| ManifestError::Read { path: path.clone(), source })?;

        let value: Value = serde_json::from_str(&text)
            .map_err(|source| ManifestError::Parse { path: path.clone(), source })?;

        match value {
            Value::Object(doc) => Ok(Self { path, doc }),
            _ => Err(ManifestError::NotAnObject { path }),
        }
    }

    /// Create a fresh manifest on disk with the given name and version.
    ///
    /// Refuses to overwrite an existing file.
    pub fn create(
        path: impl AsRef<Path>,
        name: &str,
        version: Version,
    ) -> Result<Self, ManifestError> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            return Err(ManifestError::AlreadyExists { path });
        }

        let mut doc = Map::new();
        doc.insert("name".to_string(), Value::String(name.to_string()));
        doc.insert("version".to_string(), Value::String(version.to_string()));

        let manifest = Self { path, doc };
        manifest.save()?;
        Ok(manifest)
    }

    /// Path this manifest was loaded from and will be saved to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Project name.
    pub fn name(&self) -> Result<&str, ManifestError> {
        self.doc
            .get("name")
            .and_then(Value::as_str)
            .ok_or(ManifestError::MissingName)
    }

    /// Parsed project version.
    pub fn version(&self) -> Result<Version, ManifestError> {
        let raw = self
            .doc
            .get("version")
            .and_then(Value::as_str)
            .ok_or(ManifestError::MissingVersion)?;
        Ok(raw.parse()?)
    }

    /// Replace the version field.
    pub fn set_version(&mut self, version: Version) {
        self.doc
            .insert("version".to_string(), Value::String(version.to_string()));
    }

    /// Serialize the manifest back to its path with 4-space indentation,
    /// replacing the file contents entirely.
    pub fn save(&self) -> Result<(), ManifestError> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = Serializer::with_formatter(&mut buf, formatter);

        // Map serialization over an in-memory buffer does not fail.
        self.doc
            .serialize(&mut ser)
            .map_err(|source| ManifestError::Serialize { path: self.path.clone(), source })?;
        buf.push(b'\n');

        fs::write(&self.path, buf)
            .map_err(|source| ManifestError::Write { path: self.path.clone(), source })
    }
}
