//! Container image references.
//!
//! A reference is `repository[:tag][@digest]`. The tag separator is the last
//! `:` after the last `/`, so a registry port (`localhost:5000/app`) is part
//! of the repository.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageRefError {
  #[error("image reference is empty")]
  Empty,

  #[error("image reference '{0}' has no repository")]
  MissingRepository(String),

  #[error("invalid digest '{0}': expected '<algorithm>:<hex>'")]
  InvalidDigest(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
  pub repository: String,
  pub tag: Option<String>,
  pub digest: Option<String>,
}

impl ImageRef {
  pub fn new(repository: impl Into<String>, tag: Option<String>) -> Self {
    Self {
      repository: repository.into(),
      tag,
      digest: None,
    }
  }

  /// The same repository pinned to `digest`, dropping any tag.
  pub fn pinned(&self, digest: &str) -> Result<Self, ImageRefError> {
    let digest = validate_digest(digest)?;
    Ok(Self {
      repository: self.repository.clone(),
      tag: None,
      digest: Some(digest.to_string()),
    })
  }

  /// The same reference without a digest qualifier.
  pub fn without_digest(&self) -> Self {
    Self {
      repository: self.repository.clone(),
      tag: self.tag.clone(),
      digest: None,
    }
  }
}

impl FromStr for ImageRef {
  type Err = ImageRefError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if s.is_empty() {
      return Err(ImageRefError::Empty);
    }

    let (name, digest) = match s.split_once('@') {
      Some((name, digest)) => (name, Some(digest.to_string())),
      None => (s, None),
    };

    let last_slash = name.rfind('/').map(|i| i + 1).unwrap_or(0);
    let (repository, tag) = match name[last_slash..].rfind(':') {
      Some(i) => {
        let colon = last_slash + i;
        (&name[..colon], Some(name[colon + 1..].to_string()))
      }
      None => (name, None),
    };

    if repository.is_empty() {
      return Err(ImageRefError::MissingRepository(s.to_string()));
    }

    Ok(Self {
      repository: repository.to_string(),
      tag: tag.filter(|t| !t.is_empty()),
      digest,
    })
  }
}

impl fmt::Display for ImageRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.repository)?;
    if let Some(tag) = &self.tag {
      write!(f, ":{}", tag)?;
    }
    if let Some(digest) = &self.digest {
      write!(f, "@{}", digest)?;
    }
    Ok(())
  }
}

/// Check that `digest` looks like `sha256:<hex>` and return it trimmed.
pub fn validate_digest(digest: &str) -> Result<&str, ImageRefError> {
  let trimmed = digest.trim();
  let valid = trimmed.split_once(':').is_some_and(|(algorithm, hex)| {
    !algorithm.is_empty()
      && algorithm
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '.' | '_' | '-'))
      && hex.len() >= 32
      && hex.chars().all(|c| c.is_ascii_hexdigit())
  });

  if valid {
    Ok(trimmed)
  } else {
    Err(ImageRefError::InvalidDigest(digest.to_string()))
  }
}
