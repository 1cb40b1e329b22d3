//! Regenerating `component.yaml` from a Python function.
//!
//! [`regenerate`] resolves the base image, describes the module statically,
//! selects the component function, reads dependencies from `pyproject.toml`,
//! attaches provenance (including git state when available) and writes the
//! component spec as YAML.

pub mod annotations;
mod program;
pub mod spec;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{COMPONENT_MODULE_FILE_NAME, COMPONENT_YAML_FILE_NAME, PYPROJECT_FILE_NAME};
use crate::git;
use crate::python::{self, Discovery, ManifestError, PythonVersion, ScanError};
use crate::settings::Settings;
use crate::sidecar::{self, SidecarError};

pub use annotations::{Annotations, provenance};
pub use spec::ComponentSpec;

#[derive(Debug, Error)]
pub enum RegenerateError {
  #[error("--container-image and --container-image-from cannot be specified at the same time")]
  ConflictingImageSources,

  #[error("container image file {} does not exist", path.display())]
  ImageSourceMissing { path: PathBuf },

  #[error(transparent)]
  ImageSource(#[from] SidecarError),

  #[error("failed to read module {}: {source}", path.display())]
  ReadModule { path: PathBuf, source: std::io::Error },

  #[error("unable to load module {}: {source}", path.display())]
  LoadModule { path: PathBuf, source: ScanError },

  #[error("function '{name}' not found in {}; available functions: [{}]", path.display(), available.join(", "))]
  FunctionNotFound {
    name: String,
    path: PathBuf,
    available: Vec<String>,
  },

  #[error("could not find any functions in module {}. Please specify --function-name <name>.", path.display())]
  NoFunctions { path: PathBuf },

  #[error(
    "found multiple functions in module {}. Please specify --function-name <name>. Functions: [{}]",
    path.display(),
    candidates.join(", ")
  )]
  AmbiguousFunction { path: PathBuf, candidates: Vec<String> },

  #[error("function '{function}' is async; component functions must be synchronous")]
  AsyncFunction { function: String },

  #[error("parameter '{parameter}' of function '{function}' is variadic; components need named parameters")]
  UnsupportedParameter { function: String, parameter: String },

  #[error(
    "default value `{default}` of parameter '{parameter}' in function '{function}' is not a literal; use a constant value or None"
  )]
  UnsupportedDefault {
    function: String,
    parameter: String,
    default: String,
  },

  #[error("dependency {dependency:?} cannot be passed to pip through a shell")]
  InvalidDependency { dependency: String },

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error("failed to serialize component spec: {0}")]
  Serialize(#[source] serde_yaml::Error),

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to write {}: {source}", path.display())]
  Write { path: PathBuf, source: std::io::Error },
}

/// Inputs of a regeneration. Relative paths are resolved against `directory`.
#[derive(Debug, Clone)]
pub struct RegenerateOptions {
  pub directory: PathBuf,
  pub container_image: Option<String>,
  /// YAML file with a `container_image_name` key, e.g. a container root's sidecar
  pub container_image_from: Option<PathBuf>,
  pub module_path: PathBuf,
  pub function_name: Option<String>,
  /// `pyproject.toml` to read dependencies from; defaults to the one in `directory` if present
  pub dependencies_from: Option<PathBuf>,
  pub output_component_yaml_path: PathBuf,
}

impl Default for RegenerateOptions {
  fn default() -> Self {
    Self {
      directory: PathBuf::from("."),
      container_image: None,
      container_image_from: None,
      module_path: PathBuf::from(COMPONENT_MODULE_FILE_NAME),
      function_name: None,
      dependencies_from: None,
      output_component_yaml_path: PathBuf::from(COMPONENT_YAML_FILE_NAME),
    }
  }
}

/// What was generated.
#[derive(Debug)]
pub struct RegenerateOutcome {
  pub output_path: PathBuf,
  pub function_name: String,
  pub image: String,
}

/// Pick the base image: explicit, read from a YAML file, or `python:<major>.<minor>`.
pub fn resolve_base_image(settings: &Settings, options: &RegenerateOptions) -> Result<String, RegenerateError> {
  let explicit = options.container_image.as_deref().filter(|image| !image.is_empty());
  let from_file = match &options.container_image_from {
    Some(_) if explicit.is_some() => return Err(RegenerateError::ConflictingImageSources),
    Some(path) => {
      let path = options.directory.join(path);
      if !path.exists() {
        return Err(RegenerateError::ImageSourceMissing { path });
      }
      let image = sidecar::read_image_name_from(&path)?;
      debug!(path = %path.display(), ?image, "read container image from file");
      image
    }
    None => None,
  };

  if let Some(image) = explicit.map(str::to_string).or(from_file).filter(|i| !i.is_empty()) {
    return Ok(image);
  }

  let image = PythonVersion::detect(&settings.python).default_base_image();
  debug!(%image, "using default base image");
  Ok(image)
}

fn resolve_dependencies(options: &RegenerateOptions) -> Result<Option<Vec<String>>, RegenerateError> {
  let manifest = match &options.dependencies_from {
    Some(path) => options.directory.join(path),
    None => {
      let candidate = options.directory.join(PYPROJECT_FILE_NAME);
      if !candidate.exists() {
        debug!(path = %candidate.display(), "no dependency manifest");
        return Ok(None);
      }
      candidate
    }
  };
  Ok(python::dependencies_from_pyproject(&manifest)?)
}

fn select_function<'a>(
  module: &'a python::ModuleDescriptor,
  name: Option<&str>,
  path: &Path,
) -> Result<&'a python::FunctionDescriptor, RegenerateError> {
  let unreadable = |function: &python::UnreadableFunction| RegenerateError::LoadModule {
    path: path.to_path_buf(),
    source: function.error.clone(),
  };

  if let Some(name) = name {
    if let Some(function) = module.unreadable_function(name) {
      return Err(unreadable(function));
    }
    return module.function(name).ok_or_else(|| RegenerateError::FunctionNotFound {
      name: name.to_string(),
      path: path.to_path_buf(),
      available: module.function_names().into_iter().map(str::to_string).collect(),
    });
  }

  // Discovery can't tell whether an unreadable public function is a candidate.
  if let Some(function) = module.unreadable.iter().find(|f| !f.name.starts_with('_')) {
    return Err(unreadable(function));
  }

  match python::discover(module) {
    Discovery::Found(function) => {
      debug!(name = %function.name, "discovered component function");
      Ok(function)
    }
    Discovery::None => Err(RegenerateError::NoFunctions {
      path: path.to_path_buf(),
    }),
    Discovery::Ambiguous(candidates) => Err(RegenerateError::AmbiguousFunction {
      path: path.to_path_buf(),
      candidates,
    }),
  }
}

/// Generate the component spec without writing it.
pub fn generate(settings: &Settings, options: &RegenerateOptions) -> Result<(ComponentSpec, String), RegenerateError> {
  let image = resolve_base_image(settings, options)?;

  let module_path = options.directory.join(&options.module_path);
  let source = fs::read_to_string(&module_path).map_err(|e| RegenerateError::ReadModule {
    path: module_path.clone(),
    source: e,
  })?;
  let module = python::describe_module(&source).map_err(|e| RegenerateError::LoadModule {
    path: module_path.clone(),
    source: e,
  })?;
  let function = select_function(&module, options.function_name.as_deref(), &module_path)?;

  let dependencies = resolve_dependencies(options)?;

  let git = match git::probe(&options.directory) {
    Ok(info) => info,
    Err(e) => {
      debug!(error = %e, "skipping git provenance");
      None
    }
  };
  let annotations = provenance(&source, dependencies.as_deref(), git.as_ref());

  let spec = spec::build(
    function,
    &module,
    &image,
    dependencies.as_deref().unwrap_or_default(),
    annotations,
  )?;
  Ok((spec, function.name.clone()))
}

/// Regenerate the component spec and write it to the output path.
///
/// # Errors
///
/// Every failure is reported immediately; a partially written output file is
/// left in place.
pub fn regenerate(settings: &Settings, options: &RegenerateOptions) -> Result<RegenerateOutcome, RegenerateError> {
  let (spec, function_name) = generate(settings, options)?;
  let yaml = serde_yaml::to_string(&spec).map_err(RegenerateError::Serialize)?;

  let output_path = options.directory.join(&options.output_component_yaml_path);
  if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent).map_err(|e| RegenerateError::CreateDir {
      path: parent.to_path_buf(),
      source: e,
    })?;
  }
  fs::write(&output_path, yaml).map_err(|e| RegenerateError::Write {
    path: output_path.clone(),
    source: e,
  })?;
  info!(path = %output_path.display(), function = %function_name, "wrote component spec");

  Ok(RegenerateOutcome {
    output_path,
    function_name,
    image: spec.implementation.container.image,
  })
}
