/// Sidecar file recording the current container image of a directory.
pub const CONTAINER_INFO_FILE_NAME: &str = "oasis.pipeline_component_root.yaml";

/// Sidecar key holding the image reference.
pub const CONTAINER_IMAGE_NAME_KEY: &str = "container_image_name";

pub const DOCKERFILE_NAME: &str = "Dockerfile";

pub const COMPONENT_YAML_FILE_NAME: &str = "component.yaml";

pub const COMPONENT_MODULE_FILE_NAME: &str = "component.py";

pub const PYPROJECT_FILE_NAME: &str = "pyproject.toml";
