//! Test doubles for the process and network collaborators.
//!
//! `ScriptedRunner` and `ScriptedNetwork` record every call into one shared
//! log (so tests can assert cross-collaborator ordering) and leave behind
//! the same filesystem traces the real tools would, which is what the
//! satisfaction probes look at.

use std::cell::RefCell;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::config::Settings;
use crate::net::{Mirrored, NetError, Network};
use crate::process::{Invocation, ProcessError, ProcessRunner};

pub type CallLog = Rc<RefCell<Vec<String>>>;

pub fn new_call_log() -> CallLog {
  Rc::new(RefCell::new(Vec::new()))
}

/// Settings equivalent to a freshly created config under `root`, with the
/// two version keys parametrized.
pub fn settings_for_root(root: &Path, parrot_version: &str, rakudo_version: &str) -> Settings {
  let path = |p: PathBuf| p.to_string_lossy().into_owned();

  let mut settings = Settings::new();
  settings.set("Perl 6 library", path(root.join("lib")));
  settings.set("Proto projects cache", path(root.join("cache")));
  settings.set("Rakudo build directory", path(root.join("build").join("rakudo")));
  settings.set("Rakudo version", rakudo_version);
  settings.set("Parrot build directory", path(root.join("build").join("parrot")));
  settings.set("Parrot install directory", path(root.join("install").join("parrot")));
  settings.set("Parrot version", parrot_version);
  settings.set(
    "Perl 6 executable",
    path(root.join("build").join("rakudo").join("perl6")),
  );
  settings.set("Make utility", "make");
  settings
}

/// A `ProcessRunner` that records instead of spawning.
///
/// Registered effects create files when a matching command runs, mimicking
/// what the real tool would have produced; an optional failure matcher
/// makes one command exit nonzero.
pub struct ScriptedRunner {
  pub log: CallLog,
  pub invocations: RefCell<Vec<Invocation>>,
  pub capture_output: String,
  effects: Vec<(String, PathBuf)>,
  fail_matching: Option<String>,
}

impl ScriptedRunner {
  pub fn new(log: CallLog) -> Self {
    Self {
      log,
      invocations: RefCell::new(Vec::new()),
      capture_output: "ok".to_string(),
      effects: Vec::new(),
      fail_matching: None,
    }
  }

  /// When a command line containing `matcher` runs, create `file`.
  pub fn with_effect(mut self, matcher: impl Into<String>, file: PathBuf) -> Self {
    self.effects.push((matcher.into(), file));
    self
  }

  /// Make any command line containing `matcher` fail with exit code 2.
  pub fn failing_on(mut self, matcher: impl Into<String>) -> Self {
    self.fail_matching = Some(matcher.into());
    self
  }

  fn record(&self, invocation: &Invocation) -> String {
    let line = format!("{} @ {}", invocation.display_line(), invocation.cwd.display());
    self.log.borrow_mut().push(line.clone());
    self.invocations.borrow_mut().push(invocation.clone());
    line
  }

  fn check_failure(&self, line: &str) -> Result<(), ProcessError> {
    if let Some(matcher) = &self.fail_matching {
      if line.contains(matcher.as_str()) {
        return Err(ProcessError::CommandFailed {
          command: line.to_string(),
          code: Some(2),
          log: None,
        });
      }
    }
    Ok(())
  }

  fn apply_effects(&self, line: &str) {
    for (matcher, file) in &self.effects {
      if line.contains(matcher.as_str()) {
        if let Some(parent) = file.parent() {
          fs::create_dir_all(parent).unwrap();
        }
        fs::write(file, "stub\n").unwrap();
      }
    }
  }
}

impl ProcessRunner for ScriptedRunner {
  fn run(&self, invocation: &Invocation) -> Result<(), ProcessError> {
    let line = self.record(invocation);
    self.check_failure(&line)?;
    self.apply_effects(&line);
    Ok(())
  }

  fn run_capturing_stdout(&self, invocation: &Invocation) -> Result<String, ProcessError> {
    let line = self.record(invocation);
    self.check_failure(&line)?;
    Ok(self.capture_output.clone())
  }
}

/// A `Network` that records calls and materializes believable results: a
/// real (tiny) tarball for mirrors, a populated tree for clones and
/// checkouts.
pub struct ScriptedNetwork {
  pub log: CallLog,
  pub head_rev: String,
}

impl ScriptedNetwork {
  pub fn new(log: CallLog) -> Self {
    Self {
      log,
      head_rev: "3adbd65f255e1d04bbea21a6e47a6bb22244b175".to_string(),
    }
  }

  fn populate(dest: &Path) {
    fs::create_dir_all(dest).unwrap();
    fs::write(dest.join("README"), "scripted checkout\n").unwrap();
    fs::write(dest.join("Configure.pl"), "# scripted\n").unwrap();
  }
}

impl Network for ScriptedNetwork {
  fn mirror(&self, url: &str, dest: &Path) -> Result<Mirrored, NetError> {
    self
      .log
      .borrow_mut()
      .push(format!("mirror {} @ {}", url, dest.display()));

    if dest.is_file() {
      return Ok(Mirrored::UpToDate);
    }

    // Mirror a plausible release archive: a top-level directory named
    // after the archive, which unpack strips away.
    let stem = dest
      .file_name()
      .unwrap()
      .to_string_lossy()
      .trim_end_matches(".tar.gz")
      .to_string();
    let readme = format!("{stem}/README");
    let configure = format!("{stem}/Configure.pl");
    write_fake_tarball(dest, &[readme.as_str(), configure.as_str()]);
    Ok(Mirrored::Downloaded)
  }

  fn clone_branch(&self, url: &str, dest: &Path) -> Result<String, NetError> {
    self
      .log
      .borrow_mut()
      .push(format!("clone {} @ {}", url, dest.display()));
    Self::populate(dest);
    Ok(self.head_rev.clone())
  }

  fn checkout(&self, url: &str, revision: &str, dest: &Path) -> Result<String, NetError> {
    self
      .log
      .borrow_mut()
      .push(format!("checkout {} {} @ {}", revision, url, dest.display()));
    Self::populate(dest);
    Ok(if revision == "HEAD" {
      "46000".to_string()
    } else {
      revision.to_string()
    })
  }
}

/// Write a gzipped tarball containing the given entries, each a small
/// regular file.
pub fn write_fake_tarball(dest: &Path, entries: &[&str]) {
  let file = File::create(dest).unwrap();
  let encoder = GzEncoder::new(file, Compression::default());
  let mut builder = tar::Builder::new(encoder);

  for entry in entries {
    let data = b"stub\n";
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, entry, &data[..]).unwrap();
  }

  builder.into_inner().unwrap().finish().unwrap();
}
