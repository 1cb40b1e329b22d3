//! Starter files for container roots and components.
//!
//! This module provides the core logic behind the `new` commands, which
//! copy a named template into a target directory:
//! - `containers/python-uv-container-root`: uv-based Python image
//! - `containers/generic-container-root`: plain Dockerfile image
//! - `components/python-function-component`: a function-based component
//! - `components/shell-script-component`: a script-based component

mod catalog;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

pub use catalog::TemplateFile;

/// Errors that can occur while installing a template.
#[derive(Debug, Error)]
pub enum TemplateError {
  #[error(
    "files {files:?} already exist in target directory {}. Specify the `--force` parameter to force overwrite.",
    directory.display()
  )]
  Conflict { directory: PathBuf, files: Vec<String> },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to write file {}: {source}", path.display())]
  WriteFile { path: PathBuf, source: std::io::Error },
}

/// The templates shipped with the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
  PythonUvContainerRoot,
  GenericContainerRoot,
  PythonFunctionComponent,
  ShellScriptComponent,
}

impl Template {
  pub const ALL: [Template; 4] = [
    Template::PythonUvContainerRoot,
    Template::GenericContainerRoot,
    Template::PythonFunctionComponent,
    Template::ShellScriptComponent,
  ];

  /// Template identifier, e.g. `containers/generic-container-root`.
  pub fn id(self) -> &'static str {
    match self {
      Template::PythonUvContainerRoot => "containers/python-uv-container-root",
      Template::GenericContainerRoot => "containers/generic-container-root",
      Template::PythonFunctionComponent => "components/python-function-component",
      Template::ShellScriptComponent => "components/shell-script-component",
    }
  }

  pub fn files(self) -> &'static [TemplateFile] {
    match self {
      Template::PythonUvContainerRoot => catalog::PYTHON_UV_CONTAINER_ROOT_FILES,
      Template::GenericContainerRoot => catalog::GENERIC_CONTAINER_ROOT_FILES,
      Template::PythonFunctionComponent => catalog::PYTHON_FUNCTION_COMPONENT_FILES,
      Template::ShellScriptComponent => catalog::SHELL_SCRIPT_COMPONENT_FILES,
    }
  }
}

impl fmt::Display for Template {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.id())
  }
}

/// Result of a successful installation.
#[derive(Debug)]
pub struct InstallResult {
  pub directory: PathBuf,
  /// Paths written, in template order
  pub written: Vec<PathBuf>,
  /// Names of files that existed and were overwritten (only with `force`)
  pub overwritten: Vec<String>,
}

/// Copy every file of `template` into `directory`.
///
/// All conflicts are collected before anything is written, so without
/// `force` a conflicting target is left untouched. An I/O failure part way
/// through leaves the files written so far in place.
///
/// # Errors
///
/// Returns an error if:
/// - any template file already exists in `directory` and `force` is false
/// - the directory cannot be created
/// - a file cannot be written
pub fn install(template: Template, directory: &Path, force: bool) -> Result<InstallResult, TemplateError> {
  let files = template.files();

  let conflicts: Vec<String> = files
    .iter()
    .filter(|file| directory.join(file.name).exists())
    .map(|file| file.name.to_string())
    .collect();

  if !conflicts.is_empty() && !force {
    return Err(TemplateError::Conflict {
      directory: directory.to_path_buf(),
      files: conflicts,
    });
  }

  fs::create_dir_all(directory).map_err(|e| TemplateError::CreateDir {
    path: directory.to_path_buf(),
    source: e,
  })?;

  let mut written = Vec::with_capacity(files.len());
  for file in files {
    let path = directory.join(file.name);
    debug!(template = %template, path = %path.display(), "writing template file");
    fs::write(&path, file.content).map_err(|e| TemplateError::WriteFile {
      path: path.clone(),
      source: e,
    })?;
    written.push(path);
  }

  info!(template = %template, directory = %directory.display(), files = written.len(), "installed template");

  Ok(InstallResult {
    directory: directory.to_path_buf(),
    written,
    overwritten: conflicts,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn every_template_has_files() {
    for template in Template::ALL {
      assert!(!template.files().is_empty(), "{} should ship files", template);
      for file in template.files() {
        assert!(!file.content.is_empty(), "{}/{} should not be empty", template, file.name);
      }
    }
  }

  #[test]
  fn install_writes_all_files() {
    let temp = TempDir::new().unwrap();

    let result = install(Template::PythonUvContainerRoot, temp.path(), false).unwrap();

    assert_eq!(result.written.len(), 5);
    assert!(result.overwritten.is_empty());
    for file in Template::PythonUvContainerRoot.files() {
      let content = fs::read_to_string(temp.path().join(file.name)).unwrap();
      assert_eq!(content, file.content);
    }
  }

  #[test]
  fn install_creates_missing_directory() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("nested").join("component");

    install(Template::PythonFunctionComponent, &target, false).unwrap();

    assert!(target.join("component.py").exists());
  }

  #[test]
  fn install_refuses_to_overwrite_without_force() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("Dockerfile"), "FROM scratch\n").unwrap();

    let err = install(Template::GenericContainerRoot, temp.path(), false).unwrap_err();

    assert!(matches!(&err, TemplateError::Conflict { files, .. } if files == &vec!["Dockerfile".to_string()]));
    assert!(err.to_string().contains("--force"));
    assert_eq!(fs::read_to_string(temp.path().join("Dockerfile")).unwrap(), "FROM scratch\n");
    // Nothing else was written either.
    assert!(!temp.path().join(".dockerignore").exists());
  }

  #[test]
  fn install_overwrites_with_force() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("component.py"), "# mine\n").unwrap();

    let result = install(Template::PythonFunctionComponent, temp.path(), true).unwrap();

    assert_eq!(result.overwritten, vec!["component.py".to_string()]);
    let content = fs::read_to_string(temp.path().join("component.py")).unwrap();
    assert_eq!(content, Template::PythonFunctionComponent.files()[0].content);
  }

  #[test]
  fn unrelated_files_are_not_conflicts() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("README.md"), "hello").unwrap();

    install(Template::ShellScriptComponent, temp.path(), false).unwrap();

    assert_eq!(fs::read_to_string(temp.path().join("README.md")).unwrap(), "hello");
  }
}
