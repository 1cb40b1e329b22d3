//! The container image sidecar file.
//!
//! A directory that roots a container image carries
//! `oasis.pipeline_component_root.yaml`, a YAML mapping whose
//! `container_image_name` key holds the current image reference:
//!
//! ```yaml
//! container_image_name: ghcr.io/org/components@sha256:...
//! ```
//!
//! Updates only touch that key; anything else in the file is kept.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::debug;

use crate::consts::{CONTAINER_IMAGE_NAME_KEY, CONTAINER_INFO_FILE_NAME};

#[derive(Debug, Error)]
pub enum SidecarError {
  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to write {}: {source}", path.display())]
  Write { path: PathBuf, source: io::Error },

  #[error("failed to lock {}: {source}", path.display())]
  Lock { path: PathBuf, source: io::Error },

  #[error("failed to parse {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_yaml::Error },

  #[error("{} must contain a YAML mapping", path.display())]
  NotAMapping { path: PathBuf },

  #[error("failed to serialize {}: {source}", path.display())]
  Serialize { path: PathBuf, source: serde_yaml::Error },
}

/// Path of the sidecar file inside `directory`.
pub fn sidecar_path(directory: &Path) -> PathBuf {
  directory.join(CONTAINER_INFO_FILE_NAME)
}

/// Read the image reference recorded in `directory`.
///
/// Returns `Ok(None)` if the sidecar doesn't exist or has no image set.
pub fn read_image_name(directory: &Path) -> Result<Option<String>, SidecarError> {
  read_image_name_from(&sidecar_path(directory))
}

/// Read `container_image_name` from an arbitrary sidecar-style YAML file.
///
/// Returns `Ok(None)` if the file doesn't exist or the key is missing.
pub fn read_image_name_from(path: &Path) -> Result<Option<String>, SidecarError> {
  let content = match std::fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
    Err(e) => {
      return Err(SidecarError::Read {
        path: path.to_path_buf(),
        source: e,
      });
    }
  };

  let mapping = parse_mapping(path, &content)?;
  Ok(image_name(&mapping))
}

/// Record `image_name` in the sidecar of `directory`.
///
/// Creates the file if needed. The read-modify-write happens under an
/// exclusive lock on the sidecar so concurrent writers don't interleave.
pub fn write_image_name(directory: &Path, image_name: &str) -> Result<(), SidecarError> {
  let path = sidecar_path(directory);

  let mut file = OpenOptions::new()
    .read(true)
    .write(true)
    .create(true)
    .truncate(false)
    .open(&path)
    .map_err(|e| SidecarError::Write {
      path: path.clone(),
      source: e,
    })?;

  lock_exclusive(&file).map_err(|e| SidecarError::Lock {
    path: path.clone(),
    source: e,
  })?;

  let mut content = String::new();
  file.read_to_string(&mut content).map_err(|e| SidecarError::Read {
    path: path.clone(),
    source: e,
  })?;

  let mut mapping = parse_mapping(&path, &content)?;
  mapping.insert(
    Value::String(CONTAINER_IMAGE_NAME_KEY.to_string()),
    Value::String(image_name.to_string()),
  );

  let serialized = serde_yaml::to_string(&mapping).map_err(|e| SidecarError::Serialize {
    path: path.clone(),
    source: e,
  })?;

  rewrite(&mut file, serialized.as_bytes()).map_err(|e| SidecarError::Write {
    path: path.clone(),
    source: e,
  })?;

  debug!(path = %path.display(), image = image_name, "updated container image sidecar");
  // The lock is released when `file` is dropped.
  Ok(())
}

fn parse_mapping(path: &Path, content: &str) -> Result<Mapping, SidecarError> {
  if content.trim().is_empty() {
    return Ok(Mapping::new());
  }

  let value: Value = serde_yaml::from_str(content).map_err(|e| SidecarError::Parse {
    path: path.to_path_buf(),
    source: e,
  })?;

  match value {
    Value::Mapping(mapping) => Ok(mapping),
    Value::Null => Ok(Mapping::new()),
    _ => Err(SidecarError::NotAMapping {
      path: path.to_path_buf(),
    }),
  }
}

fn image_name(mapping: &Mapping) -> Option<String> {
  mapping
    .get(CONTAINER_IMAGE_NAME_KEY)
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|name| !name.is_empty())
    .map(str::to_string)
}

fn rewrite(file: &mut File, content: &[u8]) -> io::Result<()> {
  file.set_len(0)?;
  file.seek(SeekFrom::Start(0))?;
  file.write_all(content)?;
  file.flush()
}

#[cfg(unix)]
fn lock_exclusive(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::LockExclusive).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn lock_exclusive(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized.
  // LockFileEx is safe to call with a valid file handle and zeroed OVERLAPPED.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(handle, LOCKFILE_EXCLUSIVE_LOCK, 0, 1, 0, &mut overlapped)
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}
