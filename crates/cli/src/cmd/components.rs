//! Implementation of the `oasis components` commands.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use oasis_lib::component::{RegenerateOptions, regenerate};
use oasis_lib::settings::Settings;
use oasis_lib::templates::{self, Template};

use crate::output::{print_stat, print_success, print_warning};

/// Execute `components new <template>`.
pub fn cmd_components_new(template: Template, directory: &Path, force: bool) -> Result<()> {
  let result = templates::install(template, directory, force)
    .with_context(|| format!("Failed to create {} in {}", template, directory.display()))?;

  if !result.overwritten.is_empty() {
    print_warning(&format!("Overwrote {}", result.overwritten.join(", ")));
  }

  print_success(&format!("Created {} in {}", template, result.directory.display()));
  for path in &result.written {
    print_stat("File", path.display());
  }
  Ok(())
}

/// Execute `components regenerate python-function-component`.
pub fn cmd_components_regenerate(settings: &Settings, options: &RegenerateOptions) -> Result<()> {
  debug!(?options, ?settings, "regenerating component");
  let outcome = regenerate(settings, options).with_context(|| {
    format!(
      "Failed to regenerate component from {}",
      options.directory.join(&options.module_path).display()
    )
  })?;

  print_success(&format!("Wrote {}", outcome.output_path.display()));
  print_stat("Function", &outcome.function_name);
  print_stat("Image", &outcome.image);
  Ok(())
}
