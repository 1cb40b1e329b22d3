//! Interpreter version used for the default base image.

use std::fmt;
use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};

/// Used when the configured interpreter can't be run.
pub const FALLBACK_VERSION: PythonVersion = PythonVersion { major: 3, minor: 12 };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PythonVersion {
  pub major: u32,
  pub minor: u32,
}

impl PythonVersion {
  /// Parse `python --version` output such as `Python 3.12.4`.
  pub fn parse(output: &str) -> Option<Self> {
    let version = output.trim().strip_prefix("Python")?.trim();
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor: String = parts.next()?.chars().take_while(char::is_ascii_digit).collect();
    Some(Self {
      major,
      minor: minor.parse().ok()?,
    })
  }

  /// Run `<python> --version`, falling back to [`FALLBACK_VERSION`].
  pub fn detect(python: &Path) -> Self {
    let output = match Command::new(python).arg("--version").output() {
      Ok(output) => output,
      Err(e) => {
        warn!(python = %python.display(), error = %e, "failed to run python, assuming {}", FALLBACK_VERSION);
        return FALLBACK_VERSION;
      }
    };

    // Python 2 printed its version on stderr.
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    match Self::parse(&stdout).or_else(|| Self::parse(&stderr)) {
      Some(version) if output.status.success() => {
        debug!(python = %python.display(), %version, "detected python version");
        version
      }
      _ => {
        warn!(
          python = %python.display(),
          "could not determine python version, assuming {}",
          FALLBACK_VERSION
        );
        FALLBACK_VERSION
      }
    }
  }

  /// `python:<major>.<minor>`
  pub fn default_base_image(self) -> String {
    format!("python:{}", self)
  }
}

impl fmt::Display for PythonVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.major, self.minor)
  }
}
