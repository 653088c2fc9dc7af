//! Network acquisition collaborators.
//!
//! Three operations cover everything the pipeline fetches: an HTTP mirror
//! with fetch-if-newer semantics for release tarballs, a fresh clone of the
//! development branch, and a revision-pinned checkout from centralized
//! source control. All of them block until done; failures surface
//! immediately with no retries.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from network acquisition.
#[derive(Debug, Error)]
pub enum NetError {
  /// The HTTP request itself failed.
  #[error("failed to fetch {url}: {source}")]
  Request {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  /// The server answered with an unexpected status.
  #[error("unexpected HTTP status {status} fetching {url}")]
  HttpStatus { url: String, status: u16 },

  /// Writing the downloaded file failed.
  #[error("failed to write {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Cloning the repository failed.
  #[error("failed to clone repository {url}: {source}")]
  Clone {
    url: String,
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// The fresh clone has no resolvable head commit.
  #[error("failed to resolve head of {url}: {message}")]
  ResolveHead { url: String, message: String },

  /// The checkout tool could not be started.
  #[error("failed to run svn: {source}")]
  CheckoutSpawn {
    #[source]
    source: std::io::Error,
  },

  /// The checkout ran and failed.
  #[error("checkout of {url} failed with exit code {code:?}: {stderr}")]
  CheckoutFailed {
    url: String,
    code: Option<i32>,
    stderr: String,
  },

  /// The checkout succeeded but its output named no revision.
  #[error("could not determine the revision checked out from {url}")]
  RevisionUnknown { url: String },
}

/// What a mirror call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirrored {
  /// The remote was newer (or the destination absent) and was downloaded.
  Downloaded,
  /// The destination is already current; nothing was written.
  UpToDate,
}

/// Blocking network acquisition.
pub trait Network {
  /// Fetch `url` into `dest`, overwriting only when the remote resource is
  /// newer than the local file or the local file is absent.
  fn mirror(&self, url: &str, dest: &Path) -> Result<Mirrored, NetError>;

  /// Clone the repository's development branch into `dest` and return the
  /// head commit it resolved to.
  fn clone_branch(&self, url: &str, dest: &Path) -> Result<String, NetError>;

  /// Check out `revision` (or the head, for the `"HEAD"` sentinel) of a
  /// centralized repository into `dest`; returns the concrete revision.
  fn checkout(&self, url: &str, revision: &str, dest: &Path) -> Result<String, NetError>;
}

/// The real collaborators: reqwest for HTTP, gix for clones, the `svn`
/// binary for checkouts.
pub struct SystemNetwork;

impl Network for SystemNetwork {
  fn mirror(&self, url: &str, dest: &Path) -> Result<Mirrored, NetError> {
    let client = reqwest::blocking::Client::new();
    let mut request = client.get(url);

    if let Ok(modified) = fs::metadata(dest).and_then(|meta| meta.modified()) {
      debug!(url, "local copy present, fetching only if newer");
      request = request.header(reqwest::header::IF_MODIFIED_SINCE, http_date(modified));
    }

    let response = request.send().map_err(|e| NetError::Request {
      url: url.to_string(),
      source: e,
    })?;

    if response.status() == reqwest::StatusCode::NOT_MODIFIED {
      info!(url, "remote not newer, keeping local copy");
      return Ok(Mirrored::UpToDate);
    }

    if !response.status().is_success() {
      return Err(NetError::HttpStatus {
        url: url.to_string(),
        status: response.status().as_u16(),
      });
    }

    let bytes = response.bytes().map_err(|e| NetError::Request {
      url: url.to_string(),
      source: e,
    })?;

    fs::write(dest, &bytes).map_err(|e| NetError::Write {
      path: dest.to_path_buf(),
      source: e,
    })?;

    info!(url, path = %dest.display(), size = bytes.len(), "download complete");
    Ok(Mirrored::Downloaded)
  }

  fn clone_branch(&self, url: &str, dest: &Path) -> Result<String, NetError> {
    info!(url, path = %dest.display(), "cloning repository");

    let mut prepared = gix::prepare_clone(url, dest).map_err(|e| NetError::Clone {
      url: url.to_string(),
      source: Box::new(e),
    })?;

    let (mut checkout, _outcome) = prepared
      .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
      .map_err(|e| NetError::Clone {
        url: url.to_string(),
        source: Box::new(e),
      })?;

    let (repo, _outcome) = checkout
      .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
      .map_err(|e| NetError::Clone {
        url: url.to_string(),
        source: Box::new(e),
      })?;

    let mut head = repo.head().map_err(|e| NetError::ResolveHead {
      url: url.to_string(),
      message: e.to_string(),
    })?;

    let commit = head.peel_to_commit().map_err(|e| NetError::ResolveHead {
      url: url.to_string(),
      message: e.to_string(),
    })?;

    let head_rev = commit.id.to_string();
    debug!(url, rev = %head_rev, "clone resolved");
    Ok(head_rev)
  }

  fn checkout(&self, url: &str, revision: &str, dest: &Path) -> Result<String, NetError> {
    info!(url, revision, path = %dest.display(), "checking out");

    let mut command = Command::new("svn");
    command.arg("checkout");
    if revision != "HEAD" {
      command.arg("-r").arg(revision);
    }
    command.arg(url).arg(dest);

    let output = command
      .output()
      .map_err(|e| NetError::CheckoutSpawn { source: e })?;

    if !output.status.success() {
      return Err(NetError::CheckoutFailed {
        url: url.to_string(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
      });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    match parse_checked_out_revision(&stdout) {
      Some(resolved) => {
        debug!(url, rev = %resolved, "checkout resolved");
        Ok(resolved)
      }
      // A pinned request is its own answer even if the tool's chatter
      // changes shape; only a HEAD checkout has nothing to fall back on.
      None if revision != "HEAD" => Ok(revision.to_string()),
      None => Err(NetError::RevisionUnknown {
        url: url.to_string(),
      }),
    }
  }
}

/// Format a filesystem timestamp as an HTTP date for `If-Modified-Since`.
fn http_date(time: SystemTime) -> String {
  let time: DateTime<Utc> = time.into();
  time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Pull the revision number out of a checkout tool's report, e.g.
/// `Checked out revision 45822.`
fn parse_checked_out_revision(stdout: &str) -> Option<String> {
  stdout.lines().rev().find_map(|line| {
    let rest = line.trim().strip_prefix("Checked out revision ")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    (!digits.is_empty()).then_some(digits)
  })
}
