//! Building and pushing container images.
//!
//! A build resolves the image name, runs `build` then `push` through a
//! [`ContainerEngine`], and records `repository@digest` in the directory's
//! sidecar. The sidecar is only written after both steps succeed.

mod engine;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{CONTAINER_IMAGE_NAME_KEY, CONTAINER_INFO_FILE_NAME, DOCKERFILE_NAME};
use crate::image::{ImageRef, ImageRefError};
use crate::sidecar::{self, SidecarError};

pub use engine::{BuildRequest, CliEngine, ContainerEngine, EngineKind, digest_from_push_output};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error(
    "must specify the `repository` parameter or have {} specified in {} file",
    CONTAINER_IMAGE_NAME_KEY,
    CONTAINER_INFO_FILE_NAME
  )]
  NoRepository,

  #[error("invalid image reference: {0}")]
  InvalidImage(#[from] ImageRefError),

  #[error(transparent)]
  Sidecar(#[from] SidecarError),

  #[error("failed to run {}: {source}", program.display())]
  Spawn { program: PathBuf, source: std::io::Error },

  #[error("command failed with exit code {}: {command}", code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
  CommandFailed { command: String, code: Option<i32> },

  #[error("failed to create digest file: {0}")]
  TempFile(#[source] std::io::Error),

  #[error("failed to read digest file {}: {source}", path.display())]
  ReadDigest { path: PathBuf, source: std::io::Error },

  #[error("push did not report an image digest: {command}")]
  DigestNotReported { command: String },
}

/// Options for building a container root.
#[derive(Debug, Clone)]
pub struct BuildOptions {
  /// Directory holding the Dockerfile and the sidecar; also the build context
  pub directory: PathBuf,
  pub repository: Option<String>,
  pub tag: Option<String>,
  pub platform: String,
}

/// Result of a successful build and push.
#[derive(Debug)]
pub struct BuildOutcome {
  /// The `repository[:tag]` that was built and pushed
  pub built: ImageRef,
  /// The `repository@digest` now recorded in the sidecar
  pub pushed: ImageRef,
}

/// Decide which image to build.
///
/// An explicit repository wins. Otherwise the sidecar reference is used with
/// its digest dropped, and an explicit `tag` replaces the stored one.
pub fn resolve_image(directory: &Path, repository: Option<&str>, tag: Option<&str>) -> Result<ImageRef, BuildError> {
  let tag = tag.filter(|t| !t.is_empty()).map(str::to_string);

  if let Some(repository) = repository.filter(|r| !r.is_empty()) {
    debug!(repository, "using repository from arguments");
    return Ok(ImageRef::new(repository, tag));
  }

  let stored = sidecar::read_image_name(directory)?.ok_or(BuildError::NoRepository)?;
  let stored: ImageRef = stored.parse()?;
  debug!(image = %stored, "using repository from sidecar");

  let mut image = stored.without_digest();
  if tag.is_some() {
    image.tag = tag;
  }
  Ok(image)
}

/// Build `options.directory`, push it, and record the pushed digest.
///
/// # Errors
///
/// Returns an error if no repository can be resolved, if either engine step
/// fails, or if the reported digest is malformed. Nothing is rolled back.
pub fn build_and_push(engine: &dyn ContainerEngine, options: &BuildOptions) -> Result<BuildOutcome, BuildError> {
  let directory = &options.directory;
  let built = resolve_image(directory, options.repository.as_deref(), options.tag.as_deref())?;

  let request = BuildRequest {
    context: directory.clone(),
    dockerfile: directory.join(DOCKERFILE_NAME),
    image: built.to_string(),
    platform: options.platform.clone(),
  };
  engine.build(&request)?;

  let digest = engine.push(&request.image)?;
  let pushed = built.pinned(&digest)?;

  sidecar::write_image_name(directory, &pushed.to_string())?;
  info!(image = %pushed, "recorded pushed image");

  Ok(BuildOutcome { built, pushed })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;
  use tempfile::TempDir;

  const DIGEST: &str = "sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

  #[derive(Default)]
  struct FakeEngine {
    builds: RefCell<Vec<BuildRequest>>,
    pushes: RefCell<Vec<String>>,
    digest: String,
    fail_build: bool,
  }

  impl FakeEngine {
    fn with_digest(digest: &str) -> Self {
      Self {
        digest: digest.to_string(),
        ..Default::default()
      }
    }
  }

  impl ContainerEngine for FakeEngine {
    fn build(&self, request: &BuildRequest) -> Result<(), BuildError> {
      self.builds.borrow_mut().push(request.clone());
      if self.fail_build {
        return Err(BuildError::CommandFailed {
          command: "fake build".to_string(),
          code: Some(125),
        });
      }
      Ok(())
    }

    fn push(&self, image: &str) -> Result<String, BuildError> {
      self.pushes.borrow_mut().push(image.to_string());
      Ok(self.digest.clone())
    }
  }

  fn options(directory: &Path, repository: Option<&str>, tag: Option<&str>) -> BuildOptions {
    BuildOptions {
      directory: directory.to_path_buf(),
      repository: repository.map(str::to_string),
      tag: tag.map(str::to_string),
      platform: "linux/amd64".to_string(),
    }
  }

  #[test]
  fn explicit_repository_and_tag() {
    let temp = TempDir::new().unwrap();
    let image = resolve_image(temp.path(), Some("ghcr.io/org/app"), Some("v3")).unwrap();
    assert_eq!(image.to_string(), "ghcr.io/org/app:v3");
  }

  #[test]
  fn sidecar_digest_is_stripped_and_tag_applied() {
    let temp = TempDir::new().unwrap();
    sidecar::write_image_name(temp.path(), &format!("ghcr.io/org/app@{}", DIGEST)).unwrap();

    let image = resolve_image(temp.path(), None, Some("v4")).unwrap();
    assert_eq!(image.to_string(), "ghcr.io/org/app:v4");

    let image = resolve_image(temp.path(), None, None).unwrap();
    assert_eq!(image.to_string(), "ghcr.io/org/app");
  }

  #[test]
  fn stored_tag_is_kept_without_explicit_tag() {
    let temp = TempDir::new().unwrap();
    sidecar::write_image_name(temp.path(), "ghcr.io/org/app:stable").unwrap();

    let image = resolve_image(temp.path(), None, None).unwrap();
    assert_eq!(image.to_string(), "ghcr.io/org/app:stable");
  }

  #[test]
  fn no_repository_anywhere() {
    let temp = TempDir::new().unwrap();
    let err = resolve_image(temp.path(), None, Some("v1")).unwrap_err();
    assert!(matches!(err, BuildError::NoRepository));
    assert!(err.to_string().contains(CONTAINER_INFO_FILE_NAME));
  }

  #[test]
  fn build_push_and_record_digest() {
    let temp = TempDir::new().unwrap();
    sidecar::write_image_name(temp.path(), "ghcr.io/org/app:v1").unwrap();
    let engine = FakeEngine::with_digest(&format!("{}\n", DIGEST));

    let outcome = build_and_push(&engine, &options(temp.path(), None, None)).unwrap();

    let builds = engine.builds.borrow();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].image, "ghcr.io/org/app:v1");
    assert_eq!(builds[0].dockerfile, temp.path().join("Dockerfile"));
    assert_eq!(builds[0].platform, "linux/amd64");
    assert_eq!(*engine.pushes.borrow(), vec!["ghcr.io/org/app:v1".to_string()]);

    let expected = format!("ghcr.io/org/app@{}", DIGEST);
    assert_eq!(outcome.pushed.to_string(), expected);
    assert_eq!(sidecar::read_image_name(temp.path()).unwrap(), Some(expected));
  }

  #[test]
  fn failed_build_leaves_sidecar_alone() {
    let temp = TempDir::new().unwrap();
    sidecar::write_image_name(temp.path(), "ghcr.io/org/app:v1").unwrap();
    let engine = FakeEngine {
      fail_build: true,
      ..FakeEngine::with_digest(DIGEST)
    };

    let err = build_and_push(&engine, &options(temp.path(), None, None)).unwrap_err();

    assert!(matches!(err, BuildError::CommandFailed { code: Some(125), .. }));
    assert!(engine.pushes.borrow().is_empty());
    assert_eq!(
      sidecar::read_image_name(temp.path()).unwrap().as_deref(),
      Some("ghcr.io/org/app:v1")
    );
  }

  #[test]
  fn malformed_digest_is_rejected() {
    let temp = TempDir::new().unwrap();
    let engine = FakeEngine::with_digest("garbage");

    let err = build_and_push(&engine, &options(temp.path(), Some("app"), None)).unwrap_err();

    assert!(matches!(err, BuildError::InvalidImage(ImageRefError::InvalidDigest(_))));
    assert_eq!(sidecar::read_image_name(temp.path()).unwrap(), None);
  }
}
