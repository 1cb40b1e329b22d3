//! Implementation of the `oasis containers` commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use oasis_lib::container::{BuildOptions, CliEngine, build_and_push};
use oasis_lib::settings::Settings;
use oasis_lib::sidecar;
use oasis_lib::templates::{self, Template};

use crate::output::{print_info, print_stat, print_success, print_warning};

/// Execute `containers new <template>`.
///
/// Installs the template and records `image_name` in the directory's sidecar.
pub fn cmd_containers_new(template: Template, image_name: &str, directory: &Path, force: bool) -> Result<()> {
  let result = templates::install(template, directory, force)
    .with_context(|| format!("Failed to create {} in {}", template, directory.display()))?;

  if !result.overwritten.is_empty() {
    print_warning(&format!("Overwrote {}", result.overwritten.join(", ")));
  }

  sidecar::write_image_name(directory, image_name).context("Failed to record container image name")?;

  print_success(&format!("Created {} in {}", template, result.directory.display()));
  print_stat("Image", image_name);
  print_stat("Files", result.written.len());
  Ok(())
}

/// Execute `containers build`.
///
/// Builds and pushes through the configured engine, then records the pushed
/// digest in the directory's sidecar.
pub fn cmd_containers_build(
  settings: &Settings,
  repository: Option<String>,
  tag: Option<String>,
  directory: PathBuf,
  platform: Option<String>,
) -> Result<()> {
  let engine = CliEngine::new(settings.container_engine.clone());
  let options = BuildOptions {
    directory,
    repository,
    tag,
    platform: platform.unwrap_or_else(|| settings.build_platform.clone()),
  };
  debug!(?options, "resolved build options");

  print_info(&format!(
    "Building {} with {}",
    options.directory.display(),
    settings.container_engine.display()
  ));

  let outcome = build_and_push(&engine, &options)
    .with_context(|| format!("Failed to build container root {}", options.directory.display()))?;

  print_success(&format!("Pushed {}", outcome.built));
  print_stat("Image", &outcome.pushed);
  Ok(())
}
