//! Container engines driven as child processes.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::BuildError;

/// What to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
  pub context: PathBuf,
  pub dockerfile: PathBuf,
  /// Full image name to tag the result with, e.g. `ghcr.io/org/app:v1`
  pub image: String,
  pub platform: String,
}

/// A container engine able to build images and push them to a registry.
pub trait ContainerEngine {
  fn build(&self, request: &BuildRequest) -> Result<(), BuildError>;

  /// Push `image` and return the content digest reported by the registry.
  fn push(&self, image: &str) -> Result<String, BuildError>;
}

/// Command-line dialect of the engine binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
  /// `push --digestfile <path>` writes the digest to a file
  Podman,
  /// The digest is only printed as part of the push output
  Docker,
}

impl EngineKind {
  /// Guess the dialect from the binary name; anything not named docker is treated as podman.
  pub fn detect(program: &Path) -> Self {
    let name = program
      .file_stem()
      .map(|s| s.to_string_lossy().to_ascii_lowercase())
      .unwrap_or_default();
    if name.contains("docker") {
      EngineKind::Docker
    } else {
      EngineKind::Podman
    }
  }
}

/// Engine backed by the `podman` or `docker` CLI.
///
/// Both steps block until the child exits; there is no timeout.
#[derive(Debug, Clone)]
pub struct CliEngine {
  program: PathBuf,
  kind: EngineKind,
}

impl CliEngine {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    let program = program.into();
    let kind = EngineKind::detect(&program);
    Self { program, kind }
  }

  pub fn kind(&self) -> EngineKind {
    self.kind
  }

  fn describe(&self, args: &[String]) -> String {
    format!("{} {}", self.program.display(), args.join(" "))
  }

  fn run(&self, args: Vec<String>) -> Result<(), BuildError> {
    let command = self.describe(&args);
    info!(command = %command, "running container engine");

    let status = Command::new(&self.program)
      .args(&args)
      .status()
      .map_err(|e| BuildError::Spawn {
        program: self.program.clone(),
        source: e,
      })?;

    if !status.success() {
      return Err(BuildError::CommandFailed {
        command,
        code: status.code(),
      });
    }
    Ok(())
  }

  fn push_with_digest_file(&self, image: &str) -> Result<String, BuildError> {
    let digest_file = tempfile::NamedTempFile::new().map_err(BuildError::TempFile)?;
    let args = vec![
      "push".to_string(),
      "--digestfile".to_string(),
      digest_file.path().display().to_string(),
      image.to_string(),
    ];
    self.run(args)?;

    std::fs::read_to_string(digest_file.path()).map_err(|e| BuildError::ReadDigest {
      path: digest_file.path().to_path_buf(),
      source: e,
    })
  }

  fn push_parsing_output(&self, image: &str) -> Result<String, BuildError> {
    let args = vec!["push".to_string(), image.to_string()];
    let command = self.describe(&args);
    info!(command = %command, "running container engine");

    let output = Command::new(&self.program)
      .args(&args)
      .stdin(Stdio::null())
      .stderr(Stdio::inherit())
      .output()
      .map_err(|e| BuildError::Spawn {
        program: self.program.clone(),
        source: e,
      })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    // Captured to find the digest; pass it through so the user still sees progress.
    eprint!("{}", stdout);

    if !output.status.success() {
      return Err(BuildError::CommandFailed {
        command,
        code: output.status.code(),
      });
    }

    digest_from_push_output(&stdout).ok_or(BuildError::DigestNotReported { command })
  }
}

impl ContainerEngine for CliEngine {
  fn build(&self, request: &BuildRequest) -> Result<(), BuildError> {
    let args = vec![
      "build".to_string(),
      "-f".to_string(),
      request.dockerfile.display().to_string(),
      "-t".to_string(),
      request.image.clone(),
      "--platform".to_string(),
      request.platform.clone(),
      request.context.display().to_string(),
    ];
    self.run(args)
  }

  fn push(&self, image: &str) -> Result<String, BuildError> {
    let digest = match self.kind {
      EngineKind::Podman => self.push_with_digest_file(image)?,
      EngineKind::Docker => self.push_parsing_output(image)?,
    };
    debug!(image, digest = %digest.trim(), "push reported digest");
    Ok(digest)
  }
}

/// Find the digest in `docker push` output (`<tag>: digest: sha256:... size: 1234`).
pub fn digest_from_push_output(output: &str) -> Option<String> {
  output.lines().rev().find_map(|line| {
    let (_, rest) = line.split_once("digest: ")?;
    rest.split_whitespace().next().map(str::to_string)
  })
}
