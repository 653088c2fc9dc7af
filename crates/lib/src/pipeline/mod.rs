//! Build orchestration.
//!
//! Drives each target through the staged pipeline
//! `acquire -> unpack -> configure -> compile -> verify`, executing only the
//! stages whose results are not already present on disk. A failure anywhere
//! halts the whole run; whatever partial state is on disk becomes the resume
//! point of the next run. The base target is always driven to `Verified`
//! before its dependent's pipeline begins.

pub mod probe;
pub mod stage;
pub mod target;

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::{ConfigError, Settings};
use crate::net::Network;
use crate::process::ProcessRunner;
use crate::util::fs::{DirError, remove_tree};
use crate::version::{self, AcquisitionStrategy};

pub use stage::{Stage, StageError, StageRunner};
pub use target::{BuildTarget, TargetError};

/// Every settings key the orchestrator reads. All of them must exist before
/// any stage runs; nothing is defaulted at read time.
const REQUIRED_KEYS: [&str; 9] = [
  "Perl 6 library",
  "Proto projects cache",
  "Rakudo build directory",
  "Rakudo version",
  "Parrot build directory",
  "Parrot install directory",
  "Parrot version",
  "Perl 6 executable",
  "Make utility",
];

/// Progress of one target through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
  NotStarted,
  Acquired,
  Unpacked,
  Configured,
  Built,
  Verified,
  Failed,
}

impl TargetState {
  /// The state a target is in once `stage` is satisfied.
  pub fn after(stage: Stage) -> Self {
    match stage {
      Stage::Acquire => TargetState::Acquired,
      Stage::Unpack => TargetState::Unpacked,
      Stage::Configure => TargetState::Configured,
      Stage::Compile => TargetState::Built,
      Stage::Verify => TargetState::Verified,
    }
  }
}

/// Errors from an orchestration run.
#[derive(Debug, Error)]
pub enum OrchestrationError {
  #[error(transparent)]
  Target(#[from] TargetError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Dir(#[from] DirError),

  /// A stage failed; the run halted here.
  #[error("{stage} stage failed for target {target}: {source}")]
  Stage {
    target: String,
    stage: Stage,
    #[source]
    source: StageError,
  },

  /// Upgrade was asked for a target that was never installed.
  #[error("target {target} is not installed; nothing to upgrade")]
  NotInstalled { target: String },

  /// A version deferral sentinel on a target with no dependency.
  #[error("target {target} defers its version to a dependency but declares none")]
  NoDependencyToInherit { target: String },

  /// The dependency never recorded which revision it was built from.
  #[error("dependency {dependency} has no revision stamp at {}", path.display())]
  MissingDependencyStamp { dependency: String, path: PathBuf },

  /// The dependency's stamp is not something a checkout can pin.
  #[error("dependency {dependency} pinned {value:?}, which is not a usable revision")]
  InheritedRevisionUnusable { dependency: String, value: String },

  /// The installed artifact could not be removed during an upgrade.
  #[error("failed to remove artifact {}: {source}", path.display())]
  RemoveArtifact {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Sequences stage execution for a target and its dependency chain.
pub struct Orchestrator<'a> {
  settings: &'a Settings,
  runner: &'a dyn ProcessRunner,
  net: &'a dyn Network,
}

impl<'a> Orchestrator<'a> {
  pub fn new(settings: &'a Settings, runner: &'a dyn ProcessRunner, net: &'a dyn Network) -> Self {
    Self {
      settings,
      runner,
      net,
    }
  }

  /// Drive the named target (and its dependency first) to `Verified`.
  ///
  /// Rerunning is safe: stages whose results already exist are skipped, so
  /// an interrupted run resumes wherever it stopped.
  pub fn install(&self, name: &str) -> Result<(), OrchestrationError> {
    self.require_settings()?;

    let mut chain = self.chain_for(name)?;
    let stage_runner = StageRunner::new(self.settings, self.runner, self.net)?;

    for index in 0..chain.len() {
      let (done, rest) = chain.split_at_mut(index);
      let target = &mut rest[0];
      self.resolve_inherited(target, done)?;
      let state = drive(&stage_runner, target)?;
      info!(target = %target.name, ?state, "target pipeline complete");
    }

    Ok(())
  }

  /// Re-resolve the named target's version and rebuild it from a clean
  /// build tree. Requires a prior install.
  pub fn upgrade(&self, name: &str) -> Result<(), OrchestrationError> {
    self.require_settings()?;

    let target = BuildTarget::from_settings(name, self.settings)?;
    if !target.artifact.is_file() {
      return Err(OrchestrationError::NotInstalled {
        target: target.name,
      });
    }

    info!(target = %target.name, version = %target.version_spec, "upgrading from a clean tree");
    remove_tree(&target.build_dir)?;
    if target.artifact.exists() {
      // In-place artifacts went with the build tree; installed ones are
      // removed so the compile stage cannot be satisfied by the old build.
      fs::remove_file(&target.artifact).map_err(|e| OrchestrationError::RemoveArtifact {
        path: target.artifact.clone(),
        source: e,
      })?;
    }

    self.install(name)
  }

  fn require_settings(&self) -> Result<(), ConfigError> {
    for key in REQUIRED_KEYS {
      self.settings.require(key)?;
    }
    Ok(())
  }

  /// The targets to drive, dependency first.
  fn chain_for(&self, name: &str) -> Result<Vec<BuildTarget>, OrchestrationError> {
    let target = BuildTarget::from_settings(name, self.settings)?;
    match target.depends_on.as_deref() {
      Some(dependency) => {
        let dependency = BuildTarget::from_settings(dependency, self.settings)?;
        Ok(vec![dependency, target])
      }
      None => Ok(vec![target]),
    }
  }

  /// Replace an inherited version with the revision the dependency's build
  /// tree is stamped with. The dependency has already been driven, so the
  /// stamp exists for anything a checkout or clone produced.
  fn resolve_inherited(
    &self,
    target: &mut BuildTarget,
    done: &[BuildTarget],
  ) -> Result<(), OrchestrationError> {
    if !matches!(target.strategy, AcquisitionStrategy::InheritedFromDependency) {
      return Ok(());
    }

    let dependency = target
      .depends_on
      .as_deref()
      .and_then(|name| done.iter().find(|t| t.name == name))
      .ok_or_else(|| OrchestrationError::NoDependencyToInherit {
        target: target.name.clone(),
      })?;

    let value = probe::read_revision_stamp(&dependency.build_dir).ok_or_else(|| {
      OrchestrationError::MissingDependencyStamp {
        dependency: dependency.name.clone(),
        path: probe::revision_stamp_path(&dependency.build_dir),
      }
    })?;

    match version::classify(&value) {
      Ok(AcquisitionStrategy::SourceRevision { revision }) => {
        info!(
          target = %target.name,
          dependency = %dependency.name,
          %revision,
          "adopting dependency's pinned revision"
        );
        target.adopt_revision(revision);
        Ok(())
      }
      _ => Err(OrchestrationError::InheritedRevisionUnusable {
        dependency: dependency.name.clone(),
        value,
      }),
    }
  }
}

/// Run one target's pipeline front to back.
fn drive(stage_runner: &StageRunner, target: &BuildTarget) -> Result<TargetState, OrchestrationError> {
  info!(target = %target.name, version = %target.version_spec, "driving pipeline");

  let mut state = TargetState::NotStarted;
  let mut compiled_this_run = false;
  debug!(target = %target.name, ?state, "pipeline start");

  for stage in Stage::PIPELINE {
    let must_run = match stage {
      // Verify has no on-disk result: it runs exactly when compile did.
      Stage::Verify => compiled_this_run,
      _ => !stage_runner.is_satisfied(target, stage),
    };

    if must_run {
      if let Err(source) = stage_runner.execute(target, stage) {
        error!(target = %target.name, %stage, state = ?TargetState::Failed, error = %source, "stage failed, halting run");
        return Err(OrchestrationError::Stage {
          target: target.name.clone(),
          stage,
          source,
        });
      }

      // Execution alone proves nothing; the probe has to agree or the
      // result on disk cannot be trusted.
      if stage != Stage::Verify && !stage_runner.is_satisfied(target, stage) {
        error!(target = %target.name, %stage, state = ?TargetState::Failed, "stage executed but probe still unsatisfied");
        return Err(OrchestrationError::Stage {
          target: target.name.clone(),
          stage,
          source: StageError::StillUnsatisfied {
            target: target.name.clone(),
            stage,
          },
        });
      }

      if stage == Stage::Compile {
        compiled_this_run = true;
      }
    } else {
      debug!(target = %target.name, %stage, "already satisfied, skipping");
    }

    state = TargetState::after(stage);
  }

  Ok(state)
}
