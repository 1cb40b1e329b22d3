//! Provenance lookup for the git repository enclosing a directory.
//!
//! The probe is read-only: it discovers the repository upward from the
//! directory, reads HEAD and the branch's tracking configuration, and never
//! touches the network or the worktree.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GitError {
  #[error("failed to resolve path '{path}': {source}")]
  CanonicalizePath {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to open repository for '{path}': {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: Box<gix::discover::Error>,
  },

  #[error("failed to resolve HEAD: {0}")]
  ResolveHead(#[source] Box<gix::reference::find::existing::Error>),
}

/// Git state of a directory, as recorded in component provenance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitInfo {
  /// Directory relative to the worktree root, `/`-separated (`.` for the root)
  pub relative_dir: Option<String>,
  pub local_branch: Option<String>,
  pub local_sha: Option<String>,
  pub remote_url: Option<String>,
  pub remote_branch: Option<String>,
  pub remote_sha: Option<String>,
}

impl GitInfo {
  /// Provenance annotation keys paired with the fields that are present.
  pub fn annotations(&self) -> Vec<(&'static str, &str)> {
    [
      ("git_relative_dir", &self.relative_dir),
      ("git_local_branch", &self.local_branch),
      ("git_local_sha", &self.local_sha),
      ("git_remote_url", &self.remote_url),
      ("git_remote_branch", &self.remote_branch),
      ("git_remote_sha", &self.remote_sha),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
    .collect()
  }
}

/// Inspect the repository that contains `directory`.
///
/// Returns `Ok(None)` if `directory` is not inside a git worktree.
/// Remote fields are only filled when the current branch has an upstream
/// (`branch.<name>.remote` and `branch.<name>.merge`).
pub fn probe(directory: &Path) -> Result<Option<GitInfo>, GitError> {
  let directory = dunce::canonicalize(directory).map_err(|e| GitError::CanonicalizePath {
    path: directory.to_path_buf(),
    source: e,
  })?;

  let repo = match gix::discover(&directory) {
    Ok(repo) => repo,
    Err(gix::discover::Error::Discover(e)) => {
      debug!(path = %directory.display(), reason = %e, "not inside a git repository");
      return Ok(None);
    }
    Err(e) => {
      return Err(GitError::Open {
        path: directory,
        source: Box::new(e),
      });
    }
  };

  let Some(workdir) = repo.workdir() else {
    debug!(path = %directory.display(), "repository has no worktree");
    return Ok(None);
  };
  let workdir = dunce::canonicalize(workdir).map_err(|e| GitError::CanonicalizePath {
    path: workdir.to_path_buf(),
    source: e,
  })?;

  let head = repo.head().map_err(|e| GitError::ResolveHead(Box::new(e)))?;
  let local_branch = head.referent_name().map(|name| name.shorten().to_string());

  let mut info = GitInfo {
    relative_dir: directory.strip_prefix(&workdir).ok().map(posix_relative),
    local_branch: local_branch.clone(),
    local_sha: head.id().map(|id| id.to_string()),
    ..Default::default()
  };

  if let Some(branch) = local_branch {
    fill_tracking(&repo, &branch, &mut info);
  }

  debug!(?info, "collected git info");
  Ok(Some(info))
}

fn fill_tracking(repo: &gix::Repository, branch: &str, info: &mut GitInfo) {
  let config = repo.config_snapshot();
  let remote = config.string(format!("branch.{}.remote", branch).as_str());
  let merge = config.string(format!("branch.{}.merge", branch).as_str());

  let (Some(remote), Some(merge)) = (remote, merge) else {
    return;
  };
  let remote = remote.to_string();
  // "." tracks another local branch, which has no remote side.
  if remote == "." {
    return;
  }

  let merge = merge.to_string();
  let remote_branch = merge.strip_prefix("refs/heads/").unwrap_or(&merge).to_string();

  info.remote_sha = repo
    .find_reference(format!("refs/remotes/{}/{}", remote, remote_branch).as_str())
    .ok()
    .and_then(|reference| reference.inner.target.try_id().map(|id| id.to_string()));
  info.remote_url = config
    .string(format!("remote.{}.url", remote).as_str())
    .map(|url| url.to_string());
  info.remote_branch = Some(remote_branch);
}

fn posix_relative(path: &Path) -> String {
  let parts: Vec<String> = path
    .components()
    .filter_map(|component| match component {
      Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
      _ => None,
    })
    .collect();

  if parts.is_empty() {
    ".".to_string()
  } else {
    parts.join("/")
  }
}
