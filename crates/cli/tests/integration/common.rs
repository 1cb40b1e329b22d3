//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

pub const DIGEST: &str = "sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

/// Isolated test environment.
///
/// Each test gets its own temporary directory, and the binary is pointed at
/// a fake container engine and a fake Python inside it.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Read a file relative to the temp directory.
  pub fn read_file(&self, relative_path: &str) -> String {
    let path = self.temp.path().join(relative_path);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
  }

  /// Write an executable shell script relative to the temp directory.
  #[cfg(unix)]
  pub fn write_script(&self, relative_path: &str, content: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = self.write_file(relative_path, content);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }

  /// A podman-like engine that logs its arguments to `engine.log` and
  /// writes [`DIGEST`] to the `--digestfile` path on push.
  #[cfg(unix)]
  pub fn fake_engine(&self) -> PathBuf {
    self.write_script(
      "bin/fake-engine",
      &format!(
        r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/engine.log"
if [ "$1" = "push" ]; then
  printf '%s\n' '{}' > "$3"
fi
"#,
        DIGEST
      ),
    )
  }

  /// Lines logged by [`TestEnv::fake_engine`].
  pub fn engine_log(&self) -> Vec<String> {
    self.read_file("bin/engine.log").lines().map(str::to_string).collect()
  }

  /// Get a pre-configured Command for the oasis binary.
  ///
  /// Sets environment variables for isolated testing:
  /// - `OASIS_CONTAINER_ENGINE`: the fake engine (Unix) or a missing binary
  /// - `OASIS_PYTHON`: a missing interpreter, so the default image is predictable
  /// - `RUST_LOG`: unset so `--verbose` decides the log level
  pub fn oasis_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("oasis");
    #[cfg(unix)]
    cmd.env("OASIS_CONTAINER_ENGINE", self.fake_engine());
    #[cfg(not(unix))]
    cmd.env("OASIS_CONTAINER_ENGINE", self.temp.path().join("missing-engine"));
    cmd.env("OASIS_PYTHON", self.temp.path().join("missing-python"));
    cmd.env_remove("OASIS_BUILD_PLATFORM");
    cmd.env_remove("RUST_LOG");
    cmd
  }
}
