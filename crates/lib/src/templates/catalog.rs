//! Template content embedded at compile time.

macro_rules! template_file {
  ($template:literal, $name:literal) => {
    TemplateFile {
      name: $name,
      content: include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/", $template, "/", $name)),
    }
  };
}

/// A single file written by a template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateFile {
  /// File name relative to the target directory
  pub name: &'static str,
  pub content: &'static str,
}

pub const PYTHON_UV_CONTAINER_ROOT_FILES: &[TemplateFile] = &[
  template_file!("containers/python-uv-container-root", "Dockerfile"),
  template_file!("containers/python-uv-container-root", ".dockerignore"),
  template_file!("containers/python-uv-container-root", "pyproject.toml"),
  template_file!("containers/python-uv-container-root", "uv.lock"),
  template_file!("containers/python-uv-container-root", ".python-version"),
];

pub const GENERIC_CONTAINER_ROOT_FILES: &[TemplateFile] = &[
  template_file!("containers/generic-container-root", "Dockerfile"),
  template_file!("containers/generic-container-root", ".dockerignore"),
];

pub const PYTHON_FUNCTION_COMPONENT_FILES: &[TemplateFile] =
  &[template_file!("components/python-function-component", "component.py")];

pub const SHELL_SCRIPT_COMPONENT_FILES: &[TemplateFile] =
  &[template_file!("components/shell-script-component", "component.yaml")];
