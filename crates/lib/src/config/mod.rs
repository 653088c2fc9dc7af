//! The proto settings file.
//!
//! A small line-oriented format, deliberately human-editable:
//!
//! ```text
//! # Free-form comment lines for the file as a whole.
//! ---
//!
//! # Comment lines belonging to the next key.
//! Parrot version: 2.3.0
//! ```
//!
//! `#` starts a comment line, `---` ends the whole-file comment block, and
//! `key: value` (first colon-space wins) sets a key, claiming the comment
//! lines collected since the previous setting or the separator. Blank lines
//! are skipped. Values run verbatim to end of line, so they cannot contain
//! a colon-space sequence or embedded newlines; that is a documented
//! limitation of the format, not an escape bug.
//!
//! `save` emits keys in sorted order while `load` preserves file order:
//! a round trip preserves content and comment association, not ordering.

mod defaults;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::layout::Layout;
use crate::util::fs::{DirError, ensure_dir_tree};

/// Errors that can occur loading, saving, or creating the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The settings file does not exist where it is required to.
  #[error("settings file not found: {}", path.display())]
  NotFound { path: PathBuf },

  /// Refusing to create a settings file over an existing one.
  #[error("settings file already exists: {}", path.display())]
  AlreadyExists { path: PathBuf },

  /// A line that is not a comment, separator, blank, or `key: value`.
  #[error("malformed line {line} in {}: {content:?}", path.display())]
  Parse {
    path: PathBuf,
    line: usize,
    content: String,
  },

  /// The same key appeared twice.
  #[error("duplicate key {key:?} at line {line} in {}", path.display())]
  DuplicateKey {
    path: PathBuf,
    line: usize,
    key: String,
  },

  /// A key the orchestrator needs is absent from the loaded settings.
  #[error("settings are missing required key {key:?}")]
  MissingKey { key: String },

  /// Reading or writing the file failed.
  #[error("failed to access settings file {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Could not create the directory holding the settings file.
  #[error(transparent)]
  Dir(#[from] DirError),
}

/// An ordered mapping from setting name to value. Keys are unique and the
/// order of first insertion (file order, after a load) is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
  entries: Vec<(String, String)>,
}

impl Settings {
  pub fn new() -> Self {
    Self::default()
  }

  /// Set a key, replacing the value in place if the key already exists.
  pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
    let key = key.into();
    let value = value.into();
    match self.entries.iter_mut().find(|(k, _)| *k == key) {
      Some(entry) => entry.1 = value,
      None => self.entries.push((key, value)),
    }
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self
      .entries
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v.as_str())
  }

  /// Look up a key the orchestrator cannot run without.
  ///
  /// A missing key is a fatal configuration error; values are never
  /// defaulted at read time.
  pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
    self.get(key).ok_or_else(|| ConfigError::MissingKey {
      key: key.to_string(),
    })
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(k, _)| k.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Free-text comment lines, attached to the file as a whole or to one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
  file: Vec<String>,
  keyed: HashMap<String, Vec<String>>,
}

impl Comments {
  pub fn new() -> Self {
    Self::default()
  }

  /// Comment lines for the file as a whole.
  pub fn file(&self) -> &[String] {
    &self.file
  }

  /// Comment lines attached to one key.
  pub fn for_key(&self, key: &str) -> &[String] {
    self.keyed.get(key).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn set_file(&mut self, lines: Vec<String>) {
    self.file = lines;
  }

  pub fn set_for_key(&mut self, key: impl Into<String>, lines: Vec<String>) {
    self.keyed.insert(key.into(), lines);
  }
}

/// Outcome of creating a fresh settings file.
///
/// Distinguished so callers halt and let the user review the file before
/// any build proceeds.
#[derive(Debug)]
pub struct ConfigCreated {
  pub path: PathBuf,
}

/// Load the settings file at `path`.
pub fn load(path: &Path) -> Result<(Settings, Comments), ConfigError> {
  let text = match fs::read_to_string(path) {
    Ok(text) => text,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      return Err(ConfigError::NotFound {
        path: path.to_path_buf(),
      });
    }
    Err(e) => {
      return Err(ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
      });
    }
  };

  let mut settings = Settings::new();
  let mut comments = Comments::new();
  let mut pending: Vec<String> = Vec::new();

  for (index, raw) in text.lines().enumerate() {
    let line = index + 1;

    if let Some(rest) = raw.strip_prefix('#') {
      pending.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
      continue;
    }

    if raw.trim_end() == "---" {
      comments.file.append(&mut pending);
      continue;
    }

    if raw.trim().is_empty() {
      continue;
    }

    if let Some((key, value)) = raw.split_once(": ") {
      if settings.get(key).is_some() {
        return Err(ConfigError::DuplicateKey {
          path: path.to_path_buf(),
          line,
          key: key.to_string(),
        });
      }
      if !pending.is_empty() {
        comments.keyed.insert(key.to_string(), std::mem::take(&mut pending));
      }
      settings.set(key, value);
      continue;
    }

    return Err(ConfigError::Parse {
      path: path.to_path_buf(),
      line,
      content: raw.to_string(),
    });
  }

  debug!(path = %path.display(), keys = settings.len(), "loaded settings");
  Ok((settings, comments))
}

/// Save settings and comments to `path`.
///
/// Keys are written in sorted order regardless of their order in memory;
/// each key is preceded by a blank line and its comment block. This is a
/// property of save, not of the data.
pub fn save(path: &Path, settings: &Settings, comments: &Comments) -> Result<(), ConfigError> {
  let mut out = String::new();

  for line in comments.file() {
    out.push_str("# ");
    out.push_str(line);
    out.push('\n');
  }
  out.push_str("---\n");

  let mut keys: Vec<&str> = settings.keys().collect();
  keys.sort_unstable();

  for key in keys {
    out.push('\n');
    for line in comments.for_key(key) {
      out.push_str("# ");
      out.push_str(line);
      out.push('\n');
    }
    out.push_str(key);
    out.push_str(": ");
    // Settings only ever holds values for keys it contains.
    out.push_str(settings.get(key).unwrap_or_default());
    out.push('\n');
  }

  fs::write(path, out).map_err(|e| ConfigError::Io {
    path: path.to_path_buf(),
    source: e,
  })?;

  debug!(path = %path.display(), keys = settings.len(), "saved settings");
  Ok(())
}

/// Create a fresh settings file at `path`, populated from the layout and
/// fixed defaults.
///
/// Fails if the file already exists. On success the caller must halt the
/// surrounding workflow: the user is expected to review the file before
/// any build proceeds.
pub fn create_default(path: &Path, layout: &Layout) -> Result<ConfigCreated, ConfigError> {
  if path.exists() {
    return Err(ConfigError::AlreadyExists {
      path: path.to_path_buf(),
    });
  }

  if let Some(parent) = path.parent() {
    ensure_dir_tree(parent)?;
  }

  let settings = defaults::default_settings(layout);
  let comments = defaults::default_comments();
  save(path, &settings, &comments)?;

  info!(path = %path.display(), "created default settings");
  Ok(ConfigCreated {
    path: path.to_path_buf(),
  })
}
