//! Environment-driven configuration.
//!
//! Every setting has a built-in default; the environment only overrides it:
//! - `OASIS_CONTAINER_ENGINE`: container engine binary (`podman`)
//! - `OASIS_BUILD_PLATFORM`: target platform for image builds (`linux/amd64`)
//! - `OASIS_PYTHON`: interpreter whose version picks the default base image (`python3`)

use std::path::PathBuf;

pub const CONTAINER_ENGINE_ENV: &str = "OASIS_CONTAINER_ENGINE";
pub const BUILD_PLATFORM_ENV: &str = "OASIS_BUILD_PLATFORM";
pub const PYTHON_ENV: &str = "OASIS_PYTHON";

pub const DEFAULT_CONTAINER_ENGINE: &str = "podman";
pub const DEFAULT_BUILD_PLATFORM: &str = "linux/amd64";
pub const DEFAULT_PYTHON: &str = "python3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
  /// Binary used for `build` and `push`.
  pub container_engine: PathBuf,
  /// Platform passed to `build --platform` when none is given on the command line.
  pub build_platform: String,
  /// Python interpreter probed for the default `python:<major>.<minor>` image.
  pub python: PathBuf,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      container_engine: PathBuf::from(DEFAULT_CONTAINER_ENGINE),
      build_platform: DEFAULT_BUILD_PLATFORM.to_string(),
      python: PathBuf::from(DEFAULT_PYTHON),
    }
  }
}

impl Settings {
  /// Load settings from the process environment.
  ///
  /// Empty variables are treated as unset.
  pub fn from_env() -> Self {
    let defaults = Self::default();
    Self {
      container_engine: env_non_empty(CONTAINER_ENGINE_ENV)
        .map(PathBuf::from)
        .unwrap_or(defaults.container_engine),
      build_platform: env_non_empty(BUILD_PLATFORM_ENV).unwrap_or(defaults.build_platform),
      python: env_non_empty(PYTHON_ENV).map(PathBuf::from).unwrap_or(defaults.python),
    }
  }
}

fn env_non_empty(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
