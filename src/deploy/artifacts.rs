// ABOUTME: The set of files to publish, keyed by relative path.
// ABOUTME: Paths are validated so nothing can escape the deployment directory.

use std::collections::BTreeMap;
use std::path::Path;

use super::DeployError;

/// Files to publish: relative `/`-separated path to content.
///
/// Keys are unique and iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    files: BTreeMap<String, Vec<u8>>,
}

impl Artifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any previous content at the same path.
    pub fn insert(
        &mut self,
        path: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Result<(), DeployError> {
        let path = path.into();
        validate_path(&path)?;
        self.files.insert(path, content.into());
        Ok(())
    }

    /// Builder form of [`Artifacts::insert`].
    pub fn with(
        mut self,
        path: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Result<Self, DeployError> {
        self.insert(path, content)?;
        Ok(self)
    }

    /// Load every regular file beneath `dir`. `.git` directories are skipped.
    pub fn from_dir(dir: &Path) -> Result<Self, DeployError> {
        let mut artifacts = Self::new();
        collect(dir, "", &mut artifacts)?;
        Ok(artifacts)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

fn collect(dir: &Path, prefix: &str, artifacts: &mut Artifacts) -> Result<(), DeployError> {
    let io_err = |source| DeployError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = std::fs::read_dir(dir)
        .map_err(io_err)?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(io_err)?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        let path = entry.path();
        let file_type = entry.file_type().map_err(|source| DeployError::Io {
            path: path.clone(),
            source,
        })?;

        if file_type.is_dir() {
            if name != ".git" {
                collect(&path, &rel, artifacts)?;
            }
        } else if file_type.is_file() {
            let content =
                std::fs::read(&path).map_err(|source| DeployError::Io { path, source })?;
            artifacts.insert(rel, content)?;
        } else {
            tracing::debug!("skipping non-regular file {}", path.display());
        }
    }
    Ok(())
}

/// Reject paths that are empty, absolute, climb upward or touch `.git`.
pub fn validate_path(path: &str) -> Result<(), DeployError> {
    let invalid = |reason| {
        Err(DeployError::ArtifactPathInvalid {
            path: path.to_string(),
            reason,
        })
    };

    if path.is_empty() {
        return invalid("path is empty");
    }
    if path.starts_with('/') || Path::new(path).is_absolute() {
        return invalid("path is absolute");
    }
    if path.contains('\\') {
        return invalid("use '/' as the separator");
    }
    for component in path.split('/') {
        match component {
            "" => return invalid("empty path component"),
            "." | ".." => return invalid("relative path components are not allowed"),
            ".git" => return invalid("version-control metadata cannot be published"),
            _ => {}
        }
    }
    Ok(())
}
