//! Build target construction from settings.
//!
//! Targets are built fresh from the loaded settings at the start of every
//! orchestration run; nothing about them is persisted. Every settings key
//! a target needs must be present, or construction fails.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{ConfigError, Settings};
use crate::consts;
use crate::layout::shortened_for_tools;
use crate::version::{self, AcquisitionStrategy, ReleaseChannel, VersionError};

#[cfg(windows)]
const PARROT_BINARY: &str = "parrot.exe";
#[cfg(not(windows))]
const PARROT_BINARY: &str = "parrot";

#[cfg(windows)]
const PARROT_CONFIG_BINARY: &str = "parrot_config.exe";
#[cfg(not(windows))]
const PARROT_CONFIG_BINARY: &str = "parrot_config";

/// Trivial program each target's verify stage runs; both print `ok`.
const PARROT_VERIFY_PROGRAM: &str = ".sub main :main\n  print \"ok\"\n.end";
const RAKUDO_VERIFY_PROGRAM: &str = "print 'ok'";

/// Errors constructing a build target.
#[derive(Debug, Error)]
pub enum TargetError {
  /// No target with that name exists.
  #[error("unknown build target {name:?}")]
  Unknown { name: String },

  /// A settings key the target needs is missing.
  #[error(transparent)]
  Config(#[from] ConfigError),

  /// The target's version setting matched no known shape.
  #[error("invalid value for {key:?}: {source}")]
  Version {
    key: String,
    #[source]
    source: VersionError,
  },
}

/// How a target's release tarballs are laid out on the distribution server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStyle {
  /// `<base>/<channel>/<version>/<name>-<version>.tar.gz`
  Channeled,
  /// `<base>/<name>-<version>.tar.gz`
  Flat,
}

/// One layer of the toolchain: everything needed to acquire, build,
/// install and verify it.
#[derive(Debug, Clone)]
pub struct BuildTarget {
  pub name: String,
  pub version_spec: String,
  pub strategy: AcquisitionStrategy,
  pub build_dir: PathBuf,
  /// Targets without an install tree build and run in place.
  pub install_dir: Option<PathBuf>,
  /// Target whose pinned revision this one may inherit.
  pub depends_on: Option<String>,
  pub release_base_url: String,
  pub release_style: ReleaseStyle,
  pub checkout_url: String,
  pub clone_url: String,
  /// The executable whose presence marks the compile stage satisfied.
  pub artifact: PathBuf,
  /// Arguments to the configure step's `perl` invocation.
  pub configure_args: Vec<String>,
  /// Arguments the verify stage passes to the artifact.
  pub verify_args: Vec<String>,
}

impl BuildTarget {
  /// Construct the named target from settings.
  pub fn from_settings(name: &str, settings: &Settings) -> Result<Self, TargetError> {
    match name {
      "parrot" => parrot(settings),
      "rakudo" => rakudo(settings),
      _ => Err(TargetError::Unknown {
        name: name.to_string(),
      }),
    }
  }

  /// File name of the release archive for a version.
  pub fn archive_file(&self, version: &str) -> String {
    format!("{}-{}.tar.gz", self.name, version)
  }

  /// Where the release archive lands in the download cache, for tarball
  /// strategies.
  pub fn archive_path(&self, cache_dir: &Path) -> Option<PathBuf> {
    match &self.strategy {
      AcquisitionStrategy::ReleaseTarball { version, .. } => {
        Some(cache_dir.join(self.archive_file(version)))
      }
      _ => None,
    }
  }

  /// Distribution URL of a release archive, channel sub-path included.
  pub fn release_url(&self, version: &str, channel: ReleaseChannel) -> String {
    match self.release_style {
      ReleaseStyle::Channeled => format!(
        "{}/{}/{}/{}",
        self.release_base_url,
        channel.subpath(),
        version,
        self.archive_file(version)
      ),
      ReleaseStyle::Flat => {
        format!("{}/{}", self.release_base_url, self.archive_file(version))
      }
    }
  }

  /// Download URL for the resolved strategy, for tarball strategies.
  pub fn download_url(&self) -> Option<String> {
    match &self.strategy {
      AcquisitionStrategy::ReleaseTarball { version, channel } => {
        Some(self.release_url(version, *channel))
      }
      _ => None,
    }
  }

  /// Replace the resolved strategy, used when inheriting a dependency's
  /// pinned revision.
  pub fn adopt_revision(&mut self, revision: String) {
    self.strategy = AcquisitionStrategy::SourceRevision { revision };
  }
}

fn classify_key(settings: &Settings, key: &str) -> Result<(String, AcquisitionStrategy), TargetError> {
  let spec = settings.require(key)?;
  let strategy = version::classify(spec).map_err(|e| TargetError::Version {
    key: key.to_string(),
    source: e,
  })?;
  Ok((spec.to_string(), strategy))
}

fn parrot(settings: &Settings) -> Result<BuildTarget, TargetError> {
  let (version_spec, strategy) = classify_key(settings, "Parrot version")?;
  let build_dir = PathBuf::from(settings.require("Parrot build directory")?);
  let install_dir = PathBuf::from(settings.require("Parrot install directory")?);

  let prefix = shortened_for_tools(&install_dir);

  Ok(BuildTarget {
    name: "parrot".to_string(),
    version_spec,
    strategy,
    build_dir,
    artifact: install_dir.join("bin").join(PARROT_BINARY),
    install_dir: Some(install_dir),
    depends_on: None,
    release_base_url: consts::PARROT_RELEASE_BASE_URL.to_string(),
    release_style: ReleaseStyle::Channeled,
    checkout_url: consts::PARROT_SVN_URL.to_string(),
    clone_url: consts::PARROT_GIT_URL.to_string(),
    configure_args: vec![
      "Configure.pl".to_string(),
      format!("--prefix={}", prefix.display()),
    ],
    verify_args: vec!["-e".to_string(), PARROT_VERIFY_PROGRAM.to_string()],
  })
}

fn rakudo(settings: &Settings) -> Result<BuildTarget, TargetError> {
  let (version_spec, strategy) = classify_key(settings, "Rakudo version")?;
  let build_dir = PathBuf::from(settings.require("Rakudo build directory")?);
  let artifact = PathBuf::from(settings.require("Perl 6 executable")?);
  let parrot_install = PathBuf::from(settings.require("Parrot install directory")?);

  let parrot_config = shortened_for_tools(&parrot_install.join("bin").join(PARROT_CONFIG_BINARY));

  Ok(BuildTarget {
    name: "rakudo".to_string(),
    version_spec,
    strategy,
    build_dir,
    install_dir: None,
    depends_on: Some("parrot".to_string()),
    release_base_url: consts::RAKUDO_RELEASE_BASE_URL.to_string(),
    release_style: ReleaseStyle::Flat,
    checkout_url: consts::RAKUDO_SVN_URL.to_string(),
    clone_url: consts::RAKUDO_GIT_URL.to_string(),
    artifact,
    configure_args: vec![
      "Configure.pl".to_string(),
      format!("--parrot-config={}", parrot_config.display()),
    ],
    verify_args: vec!["-e".to_string(), RAKUDO_VERIFY_PROGRAM.to_string()],
  })
}
