//! oasis-lib: Core logic for the `oasis` pipeline component tool
//!
//! This crate provides everything behind the CLI:
//! - `templates`: starter files for container roots and components
//! - `sidecar`: the per-directory record of the current container image
//! - `container`: building and pushing images through podman or docker
//! - `component`: regenerating `component.yaml` from a Python function
//! - `git`: provenance lookup for the enclosing repository

pub mod component;
pub mod consts;
pub mod container;
pub mod git;
pub mod image;
pub mod python;
pub mod settings;
pub mod sidecar;
pub mod templates;
