//! Dependency lists from `pyproject.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("failed to parse {}: {source}", path.display())]
  Parse { path: PathBuf, source: toml::de::Error },
}

#[derive(Debug, Default, Deserialize)]
struct PyProject {
  project: Option<ProjectTable>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectTable {
  dependencies: Option<Vec<String>>,
}

/// Read `[project].dependencies` from the manifest at `path`.
///
/// Returns `Ok(None)` if the table or the key is absent. A missing file is an
/// error; callers decide beforehand whether the manifest is optional.
pub fn dependencies_from_pyproject(path: &Path) -> Result<Option<Vec<String>>, ManifestError> {
  let content = fs::read_to_string(path).map_err(|e| ManifestError::Read {
    path: path.to_path_buf(),
    source: e,
  })?;
  let manifest: PyProject = toml::from_str(&content).map_err(|e| ManifestError::Parse {
    path: path.to_path_buf(),
    source: e,
  })?;

  let dependencies = manifest.project.and_then(|project| project.dependencies);
  debug!(path = %path.display(), ?dependencies, "read dependencies");
  Ok(dependencies)
}
