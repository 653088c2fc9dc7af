//! Directory creation and the small filesystem probes the pipeline uses.
//!
//! Directory chains are created one segment at a time: a single recursive
//! create call spanning a new drive-relative root is rejected on some
//! platforms, while per-segment creation degrades correctly everywhere.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors from directory creation or removal.
#[derive(Debug, Error)]
pub enum DirError {
  /// A missing segment of the chain could not be created.
  #[error("failed to create directory {}: {source}", path.display())]
  Create {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Something that is not a directory already occupies a segment.
  #[error("cannot create {}: {} exists and is not a directory", path.display(), segment.display())]
  NotADirectory { path: PathBuf, segment: PathBuf },

  /// A tree could not be removed.
  #[error("failed to remove {}: {source}", path.display())]
  Remove {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Idempotently create `path` and every missing ancestor, shortest prefix
/// first. The first unsatisfiable segment fails with the full offending
/// path; nothing is ever silently skipped.
pub fn ensure_dir_tree(path: &Path) -> Result<(), DirError> {
  if path.is_dir() {
    return Ok(());
  }

  let mut current = PathBuf::new();
  for component in path.components() {
    current.push(component);
    if current.is_dir() {
      continue;
    }
    if current.exists() {
      return Err(DirError::NotADirectory {
        path: path.to_path_buf(),
        segment: current,
      });
    }
    fs::create_dir(&current).map_err(|e| DirError::Create {
      path: current.clone(),
      source: e,
    })?;
  }

  debug!(path = %path.display(), "created directory chain");
  Ok(())
}

/// Remove a directory tree if it exists; absent trees are not an error.
pub fn remove_tree(path: &Path) -> Result<(), DirError> {
  if !path.exists() {
    return Ok(());
  }

  fs::remove_dir_all(path).map_err(|e| DirError::Remove {
    path: path.to_path_buf(),
    source: e,
  })?;

  debug!(path = %path.display(), "removed tree");
  Ok(())
}

/// True when `path` is a directory containing at least one entry.
pub fn dir_is_populated(path: &Path) -> bool {
  fs::read_dir(path)
    .map(|mut entries| entries.next().is_some())
    .unwrap_or(false)
}

/// True when `path` is a regular file with nonzero length.
pub fn file_is_nonzero(path: &Path) -> bool {
  fs::metadata(path)
    .map(|meta| meta.is_file() && meta.len() > 0)
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn ensure_creates_the_whole_chain() {
    let temp = TempDir::new().unwrap();
    let deep = temp.path().join("a").join("b").join("c");

    ensure_dir_tree(&deep).unwrap();
    assert!(deep.is_dir());
  }

  #[test]
  fn ensure_is_a_noop_on_existing_directories() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("existing");
    fs::create_dir(&dir).unwrap();

    ensure_dir_tree(&dir).unwrap();
    ensure_dir_tree(&dir).unwrap();
    assert!(dir.is_dir());
  }

  #[test]
  fn ensure_creates_only_the_missing_suffix() {
    let temp = TempDir::new().unwrap();
    let existing = temp.path().join("a");
    fs::create_dir(&existing).unwrap();
    let marker = existing.join("keep.txt");
    fs::write(&marker, "kept").unwrap();

    ensure_dir_tree(&existing.join("b").join("c")).unwrap();
    assert!(marker.exists());
    assert!(existing.join("b").join("c").is_dir());
  }

  #[test]
  fn ensure_fails_when_a_segment_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("occupied");
    fs::write(&file, "not a directory").unwrap();

    let err = ensure_dir_tree(&file.join("child")).unwrap_err();
    match err {
      DirError::NotADirectory { segment, .. } => assert_eq!(segment, file),
      other => panic!("expected NotADirectory, got {other:?}"),
    }
  }

  #[test]
  fn remove_tree_tolerates_absent_paths() {
    let temp = TempDir::new().unwrap();
    remove_tree(&temp.path().join("never-created")).unwrap();
  }

  #[test]
  fn remove_tree_deletes_recursively() {
    let temp = TempDir::new().unwrap();
    let tree = temp.path().join("tree");
    fs::create_dir_all(tree.join("nested")).unwrap();
    fs::write(tree.join("nested").join("file"), "x").unwrap();

    remove_tree(&tree).unwrap();
    assert!(!tree.exists());
  }

  #[test]
  fn populated_probe() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("d");
    fs::create_dir(&dir).unwrap();

    assert!(!dir_is_populated(&dir));
    fs::write(dir.join("entry"), "x").unwrap();
    assert!(dir_is_populated(&dir));
    assert!(!dir_is_populated(&temp.path().join("missing")));
  }

  #[test]
  fn nonzero_file_probe() {
    let temp = TempDir::new().unwrap();
    let empty = temp.path().join("empty");
    let full = temp.path().join("full");
    fs::write(&empty, "").unwrap();
    fs::write(&full, "bytes").unwrap();

    assert!(!file_is_nonzero(&empty));
    assert!(file_is_nonzero(&full));
    assert!(!file_is_nonzero(temp.path()));
  }
}
