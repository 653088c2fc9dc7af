//! Stage satisfaction probes.
//!
//! Each pipeline stage has a cheap, filesystem-only predicate deciding
//! whether its result is already present and valid. The probes are the
//! whole persistence model: nothing else records how far a previous run
//! got, so an interrupted run resumes wherever the filesystem says it
//! stopped.

use std::fs;
use std::path::{Path, PathBuf};

use crate::consts::{BUILD_CONTROL_FILE, REVISION_STAMP_FILE};
use crate::util::fs::{dir_is_populated, file_is_nonzero};
use crate::version::AcquisitionStrategy;

use super::target::BuildTarget;

/// Acquire is done when the release archive sits in the cache with
/// nonzero size, or when the checkout/clone tree is populated.
pub fn acquire_satisfied(target: &BuildTarget, cache_dir: &Path) -> bool {
  match target.archive_path(cache_dir) {
    Some(archive) => file_is_nonzero(&archive),
    None => dir_is_populated(&target.build_dir),
  }
}

/// Unpack is done when the extracted tree carries a revision stamp for the
/// expected version. A stamp from a different version never satisfies.
/// Checkout strategies have nothing to unpack and are always satisfied.
pub fn unpack_satisfied(target: &BuildTarget) -> bool {
  match &target.strategy {
    AcquisitionStrategy::ReleaseTarball { version, .. } => {
      read_revision_stamp(&target.build_dir).as_deref() == Some(version.as_str())
    }
    _ => true,
  }
}

/// Configure is done when the generated build-control file exists.
pub fn configure_satisfied(target: &BuildTarget) -> bool {
  target.build_dir.join(BUILD_CONTROL_FILE).is_file()
}

/// Compile is done when the expected artifact exists at its install path.
pub fn compile_satisfied(target: &BuildTarget) -> bool {
  target.artifact.is_file()
}

/// Location of the revision stamp inside a build tree.
pub fn revision_stamp_path(build_dir: &Path) -> PathBuf {
  build_dir.join(REVISION_STAMP_FILE)
}

/// The version or revision a build tree was produced from, if stamped.
pub fn read_revision_stamp(build_dir: &Path) -> Option<String> {
  fs::read_to_string(revision_stamp_path(build_dir))
    .ok()
    .map(|text| text.trim().to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipeline::target::ReleaseStyle;
  use crate::version::ReleaseChannel;
  use tempfile::TempDir;

  fn tarball_target(build_dir: &Path, version: &str) -> BuildTarget {
    BuildTarget {
      name: "parrot".to_string(),
      version_spec: version.to_string(),
      strategy: AcquisitionStrategy::ReleaseTarball {
        version: version.to_string(),
        channel: ReleaseChannel::Supported,
      },
      build_dir: build_dir.to_path_buf(),
      install_dir: None,
      depends_on: None,
      release_base_url: "http://example.org/releases".to_string(),
      release_style: ReleaseStyle::Channeled,
      checkout_url: "svn://example.org/trunk".to_string(),
      clone_url: "https://example.org/repo.git".to_string(),
      artifact: build_dir.join("bin").join("parrot"),
      configure_args: vec!["Configure.pl".to_string()],
      verify_args: vec!["-e".to_string(), "print 'ok'".to_string()],
    }
  }

  fn checkout_target(build_dir: &Path) -> BuildTarget {
    let mut target = tarball_target(build_dir, "45822");
    target.strategy = AcquisitionStrategy::SourceRevision {
      revision: "45822".to_string(),
    };
    target
  }

  #[test]
  fn acquire_probe_checks_the_cached_archive_for_releases() {
    let temp = TempDir::new().unwrap();
    let cache = temp.path().join("cache");
    fs::create_dir(&cache).unwrap();
    let target = tarball_target(&temp.path().join("build"), "2.3.0");

    assert!(!acquire_satisfied(&target, &cache));
    fs::write(cache.join("parrot-2.3.0.tar.gz"), "bytes").unwrap();
    assert!(acquire_satisfied(&target, &cache));
  }

  #[test]
  fn acquire_probe_rejects_an_empty_archive() {
    let temp = TempDir::new().unwrap();
    let cache = temp.path().join("cache");
    fs::create_dir(&cache).unwrap();
    fs::write(cache.join("parrot-2.3.0.tar.gz"), "").unwrap();

    let target = tarball_target(&temp.path().join("build"), "2.3.0");
    assert!(!acquire_satisfied(&target, &cache));
  }

  #[test]
  fn acquire_probe_checks_the_tree_for_checkouts() {
    let temp = TempDir::new().unwrap();
    let build = temp.path().join("build");
    let target = checkout_target(&build);

    assert!(!acquire_satisfied(&target, temp.path()));
    fs::create_dir(&build).unwrap();
    assert!(!acquire_satisfied(&target, temp.path()), "empty tree is not acquired");
    fs::write(build.join("README"), "x").unwrap();
    assert!(acquire_satisfied(&target, temp.path()));
  }

  #[test]
  fn unpack_probe_wants_a_matching_stamp() {
    let temp = TempDir::new().unwrap();
    let build = temp.path().join("build");
    fs::create_dir(&build).unwrap();
    let target = tarball_target(&build, "2.3.0");

    assert!(!unpack_satisfied(&target));
    fs::write(revision_stamp_path(&build), "2.2.0\n").unwrap();
    assert!(!unpack_satisfied(&target), "stale stamp must not satisfy");
    fs::write(revision_stamp_path(&build), "2.3.0\n").unwrap();
    assert!(unpack_satisfied(&target));
  }

  #[test]
  fn unpack_probe_is_a_noop_for_checkouts() {
    let temp = TempDir::new().unwrap();
    let target = checkout_target(&temp.path().join("never-created"));
    assert!(unpack_satisfied(&target));
  }

  #[test]
  fn configure_probe_looks_for_the_build_control_file() {
    let temp = TempDir::new().unwrap();
    let build = temp.path().join("build");
    fs::create_dir(&build).unwrap();
    let target = checkout_target(&build);

    assert!(!configure_satisfied(&target));
    fs::write(build.join(BUILD_CONTROL_FILE), "all:\n").unwrap();
    assert!(configure_satisfied(&target));
  }

  #[test]
  fn compile_probe_looks_for_the_artifact() {
    let temp = TempDir::new().unwrap();
    let build = temp.path().join("build");
    fs::create_dir_all(build.join("bin")).unwrap();
    let target = checkout_target(&build);

    assert!(!compile_satisfied(&target));
    fs::write(&target.artifact, "\x7fELF").unwrap();
    assert!(compile_satisfied(&target));
  }

  #[test]
  fn stamp_round_trip() {
    let temp = TempDir::new().unwrap();
    assert_eq!(read_revision_stamp(temp.path()), None);
    fs::write(revision_stamp_path(temp.path()), "45822\n").unwrap();
    assert_eq!(read_revision_stamp(temp.path()), Some("45822".to_string()));
  }
}
