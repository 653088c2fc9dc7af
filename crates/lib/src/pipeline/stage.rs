//! Stage execution.
//!
//! One [`StageRunner`] executes individual pipeline stages for a target,
//! against the filesystem and through the process/network collaborators.
//! Execution never decides *whether* to run; the orchestrator does that
//! from the satisfaction probes.

use std::fmt;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, Settings};
use crate::consts::VERIFY_EXPECTED_OUTPUT;
use crate::net::{NetError, Network};
use crate::process::{Invocation, ProcessError, ProcessRunner};
use crate::util::fs::{DirError, ensure_dir_tree, remove_tree};
use crate::version::AcquisitionStrategy;

use super::probe;
use super::target::BuildTarget;

/// The ordered pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Acquire,
  Unpack,
  Configure,
  Compile,
  Verify,
}

impl Stage {
  /// Pipeline order; targets always advance through these front to back.
  pub const PIPELINE: [Stage; 5] = [
    Stage::Acquire,
    Stage::Unpack,
    Stage::Configure,
    Stage::Compile,
    Stage::Verify,
  ];

  pub fn slug(self) -> &'static str {
    match self {
      Stage::Acquire => "acquire",
      Stage::Unpack => "unpack",
      Stage::Configure => "configure",
      Stage::Compile => "compile",
      Stage::Verify => "verify",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.slug())
  }
}

/// Errors from executing a stage.
#[derive(Debug, Error)]
pub enum StageError {
  #[error(transparent)]
  Net(#[from] NetError),

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error(transparent)]
  Dir(#[from] DirError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  /// Extracting the release archive failed.
  #[error("failed to extract {}: {source}", archive.display())]
  Extract {
    archive: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The revision stamp could not be written.
  #[error("failed to write revision stamp {}: {source}", path.display())]
  Stamp {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The built artifact did not produce the expected verify output.
  #[error("verify output mismatch for {target}: expected {expected:?}, got {actual:?}")]
  VerifyMismatch {
    target: String,
    expected: String,
    actual: String,
  },

  /// A stage executed without error yet its probe still reports the result
  /// missing; the result on disk cannot be trusted.
  #[error("{stage} stage ran for {target} but left its result unsatisfied")]
  StillUnsatisfied { target: String, stage: Stage },

  /// An inherited version reached acquisition without being resolved to a
  /// concrete revision first.
  #[error("target {target} reached acquisition with an unresolved inherited version")]
  InheritanceUnresolved { target: String },
}

/// Executes pipeline stages for build targets.
pub struct StageRunner<'a> {
  make: String,
  cache_dir: PathBuf,
  runner: &'a dyn ProcessRunner,
  net: &'a dyn Network,
}

impl std::fmt::Debug for StageRunner<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StageRunner")
      .field("make", &self.make)
      .field("cache_dir", &self.cache_dir)
      .finish_non_exhaustive()
  }
}

impl<'a> StageRunner<'a> {
  /// Tooling settings are read once, up front; a missing key fails here
  /// rather than mid-pipeline.
  pub fn new(
    settings: &Settings,
    runner: &'a dyn ProcessRunner,
    net: &'a dyn Network,
  ) -> Result<Self, ConfigError> {
    Ok(Self {
      make: settings.require("Make utility")?.to_string(),
      cache_dir: PathBuf::from(settings.require("Proto projects cache")?),
      runner,
      net,
    })
  }

  /// Whether a stage's result is already present and valid on disk.
  ///
  /// Verify has no filesystem result and never reports satisfied; the
  /// orchestrator runs it exactly when compile ran.
  pub fn is_satisfied(&self, target: &BuildTarget, stage: Stage) -> bool {
    match stage {
      Stage::Acquire => probe::acquire_satisfied(target, &self.cache_dir),
      Stage::Unpack => probe::unpack_satisfied(target),
      Stage::Configure => probe::configure_satisfied(target),
      Stage::Compile => probe::compile_satisfied(target),
      Stage::Verify => false,
    }
  }

  pub fn execute(&self, target: &BuildTarget, stage: Stage) -> Result<(), StageError> {
    info!(target = %target.name, %stage, "executing stage");
    match stage {
      Stage::Acquire => self.acquire(target),
      Stage::Unpack => self.unpack(target),
      Stage::Configure => self.configure(target),
      Stage::Compile => self.compile(target),
      Stage::Verify => self.verify(target),
    }
  }

  fn acquire(&self, target: &BuildTarget) -> Result<(), StageError> {
    match &target.strategy {
      AcquisitionStrategy::ReleaseTarball { version, channel } => {
        ensure_dir_tree(&self.cache_dir)?;
        let url = target.release_url(version, *channel);
        let archive = self.cache_dir.join(target.archive_file(version));
        self.net.mirror(&url, &archive)?;
        Ok(())
      }
      AcquisitionStrategy::SourceRevision { revision } => {
        self.ensure_build_parent(target)?;
        let resolved = self.net.checkout(&target.checkout_url, revision, &target.build_dir)?;
        write_revision_stamp(&target.build_dir, &resolved)
      }
      AcquisitionStrategy::RollingBranch => {
        // Never update in place; a rolling acquisition starts from nothing.
        remove_tree(&target.build_dir)?;
        self.ensure_build_parent(target)?;
        let head = self.net.clone_branch(&target.clone_url, &target.build_dir)?;
        write_revision_stamp(&target.build_dir, &head)
      }
      AcquisitionStrategy::InheritedFromDependency => Err(StageError::InheritanceUnresolved {
        target: target.name.clone(),
      }),
    }
  }

  fn unpack(&self, target: &BuildTarget) -> Result<(), StageError> {
    let AcquisitionStrategy::ReleaseTarball { version, .. } = &target.strategy else {
      debug!(target = %target.name, "checkout strategy, nothing to unpack");
      return Ok(());
    };

    let archive = self.cache_dir.join(target.archive_file(version));

    // Extract into a clean tree so nothing from another version survives.
    remove_tree(&target.build_dir)?;
    ensure_dir_tree(&target.build_dir)?;
    extract_tarball(&archive, &target.build_dir)?;
    write_revision_stamp(&target.build_dir, version)
  }

  fn configure(&self, target: &BuildTarget) -> Result<(), StageError> {
    let mut invocation = Invocation::new("perl", &target.build_dir)
      .log_to(target.build_dir.join("proto-configure.log"));
    for arg in &target.configure_args {
      invocation = invocation.arg(arg);
    }
    self.runner.run(&invocation)?;
    Ok(())
  }

  fn compile(&self, target: &BuildTarget) -> Result<(), StageError> {
    let build = Invocation::new(&self.make, &target.build_dir)
      .log_to(target.build_dir.join("proto-build.log"));
    self.runner.run(&build)?;

    if target.install_dir.is_some() {
      let install = Invocation::new(&self.make, &target.build_dir)
        .arg("install")
        .log_to(target.build_dir.join("proto-install.log"));
      self.runner.run(&install)?;
    }

    Ok(())
  }

  fn verify(&self, target: &BuildTarget) -> Result<(), StageError> {
    let mut invocation =
      Invocation::new(target.artifact.to_string_lossy().into_owned(), &target.build_dir);
    for arg in &target.verify_args {
      invocation = invocation.arg(arg);
    }

    let actual = self.runner.run_capturing_stdout(&invocation)?;
    if actual != VERIFY_EXPECTED_OUTPUT {
      return Err(StageError::VerifyMismatch {
        target: target.name.clone(),
        expected: VERIFY_EXPECTED_OUTPUT.to_string(),
        actual,
      });
    }

    info!(target = %target.name, artifact = %target.artifact.display(), "verified");
    Ok(())
  }

  fn ensure_build_parent(&self, target: &BuildTarget) -> Result<(), DirError> {
    match target.build_dir.parent() {
      Some(parent) => ensure_dir_tree(parent),
      None => Ok(()),
    }
  }
}

/// Extract a gzipped tarball into `dest`, stripping the archive's leading
/// path component (release tarballs wrap everything in `name-version/`).
fn extract_tarball(archive_path: &Path, dest: &Path) -> Result<(), StageError> {
  let extract = || -> std::io::Result<()> {
    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let mut archive = Archive::new(decoder);

    for entry in archive.entries()? {
      let mut entry = entry?;
      let path = entry.path()?;

      let stripped: PathBuf = path.components().skip(1).collect();
      if stripped.as_os_str().is_empty() {
        continue;
      }

      let dest_path = dest.join(&stripped);
      if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent)?;
      }

      entry.unpack(&dest_path)?;
    }

    Ok(())
  };

  extract().map_err(|e| StageError::Extract {
    archive: archive_path.to_path_buf(),
    source: e,
  })?;

  debug!(archive = %archive_path.display(), dest = %dest.display(), "extracted");
  Ok(())
}

/// Record the version or revision a build tree was produced from.
fn write_revision_stamp(build_dir: &Path, value: &str) -> Result<(), StageError> {
  let path = probe::revision_stamp_path(build_dir);
  fs::write(&path, format!("{value}\n")).map_err(|e| StageError::Stamp { path, source: e })
}
