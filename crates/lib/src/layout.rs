//! Directory layout derivation.
//!
//! Every directory and file proto touches is derived from a single root path.
//! Derivation is a pure function of that root: no I/O happens here, and all
//! descendants are computed with platform-correct joins.

use std::path::{Component, Path, PathBuf};

use crate::consts::CONFIG_FILE_NAME;

/// The fixed directory tree proto manages under one root.
///
/// ```text
/// <root>/
///   lib/              installed Perl 6 modules
///   cache/            downloaded release archives
///   build/<target>/   per-target build trees
///   install/<target>/ per-target install trees
///   state/            settings file and other bookkeeping
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
  root: PathBuf,
}

impl Layout {
  /// Derive the layout from a root path.
  pub fn derive(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Directory holding installed Perl 6 modules.
  pub fn library_dir(&self) -> PathBuf {
    self.root.join("lib")
  }

  /// Directory holding downloaded release archives and project sources.
  pub fn cache_dir(&self) -> PathBuf {
    self.root.join("cache")
  }

  /// Directory holding the settings file and other bookkeeping.
  pub fn state_dir(&self) -> PathBuf {
    self.root.join("state")
  }

  /// Location of the settings file.
  pub fn config_file(&self) -> PathBuf {
    self.state_dir().join(CONFIG_FILE_NAME)
  }

  /// Build tree for the named target.
  pub fn build_dir_for(&self, target: &str) -> PathBuf {
    self.root.join("build").join(target)
  }

  /// Install tree for the named target.
  pub fn install_dir_for(&self, target: &str) -> PathBuf {
    self.root.join("install").join(target)
  }
}

/// Rewrite `path` so that no component contains whitespace, substituting a
/// canonical 8.3-style abbreviation for any component that does.
///
/// Some platforms' build tooling mishandles unquoted whitespace in command
/// arguments. The transform is lossy: the result is only suitable for
/// composing arguments passed to external tools, never for paths proto
/// itself reads or writes.
pub fn shortened_for_tools(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();

  for component in path.components() {
    match component {
      Component::Normal(segment) => {
        let segment = segment.to_string_lossy();
        if segment.chars().any(char::is_whitespace) {
          out.push(shorten_segment(&segment));
        } else {
          out.push(segment.as_ref());
        }
      }
      other => out.push(other.as_os_str()),
    }
  }

  out
}

/// 8.3-style abbreviation of one path segment: whitespace stripped, upper
/// cased, stem truncated to six characters plus a `~1` suffix, extension
/// truncated to three.
fn shorten_segment(segment: &str) -> String {
  let (stem, ext) = match segment.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
    _ => (segment, None),
  };

  let squeeze = |part: &str, limit: usize| -> String {
    part
      .chars()
      .filter(|c| !c.is_whitespace() && *c != '.')
      .flat_map(char::to_uppercase)
      .take(limit)
      .collect()
  };

  let mut short = squeeze(stem, 6);
  short.push_str("~1");

  if let Some(ext) = ext {
    let ext = squeeze(ext, 3);
    if !ext.is_empty() {
      short.push('.');
      short.push_str(&ext);
    }
  }

  short
}
