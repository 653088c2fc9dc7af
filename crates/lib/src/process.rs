//! External process execution.
//!
//! Build tools are invoked through the [`ProcessRunner`] trait so the
//! pipeline can be driven against a scripted stub in tests. The system
//! implementation blocks for the full duration of every command; any
//! nonzero exit is a failure.

use std::fs::File;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, info};

/// Errors from running an external command.
#[derive(Debug, Error)]
pub enum ProcessError {
  /// The program could not be started at all.
  #[error("failed to start {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// The per-stage log file could not be created.
  #[error("failed to create log file {}: {source}", path.display())]
  LogFile {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The command ran and exited nonzero.
  #[error("command failed with exit code {code:?}: {command}")]
  CommandFailed {
    command: String,
    code: Option<i32>,
    log: Option<PathBuf>,
  },
}

/// One external command: program, arguments, working directory, and an
/// optional log file its stdout and stderr are redirected into.
#[derive(Debug, Clone)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: PathBuf,
  pub log: Option<PathBuf>,
}

impl Invocation {
  pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: cwd.into(),
      log: None,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn log_to(mut self, path: PathBuf) -> Self {
    self.log = Some(path);
    self
  }

  /// The command as one display line, for logs and error messages.
  pub fn display_line(&self) -> String {
    let mut line = self.program.clone();
    for arg in &self.args {
      line.push(' ');
      line.push_str(arg);
    }
    line
  }
}

/// Blocking executor for external commands.
pub trait ProcessRunner {
  /// Run to completion, failing on nonzero exit. Output goes to the
  /// invocation's log file when one is set.
  fn run(&self, invocation: &Invocation) -> Result<(), ProcessError>;

  /// Run to completion and return captured stdout verbatim.
  fn run_capturing_stdout(&self, invocation: &Invocation) -> Result<String, ProcessError>;
}

/// The real thing: `std::process::Command`, blocking.
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
  fn run(&self, invocation: &Invocation) -> Result<(), ProcessError> {
    info!(command = %invocation.display_line(), cwd = %invocation.cwd.display(), "running command");

    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args).current_dir(&invocation.cwd);

    if let Some(log) = &invocation.log {
      let out = File::create(log).map_err(|e| ProcessError::LogFile {
        path: log.clone(),
        source: e,
      })?;
      let err = out.try_clone().map_err(|e| ProcessError::LogFile {
        path: log.clone(),
        source: e,
      })?;
      command.stdout(Stdio::from(out)).stderr(Stdio::from(err));
      debug!(log = %log.display(), "redirecting command output");
    }

    let status = command.status().map_err(|e| ProcessError::Spawn {
      program: invocation.program.clone(),
      source: e,
    })?;

    if !status.success() {
      return Err(ProcessError::CommandFailed {
        command: invocation.display_line(),
        code: status.code(),
        log: invocation.log.clone(),
      });
    }

    Ok(())
  }

  fn run_capturing_stdout(&self, invocation: &Invocation) -> Result<String, ProcessError> {
    info!(command = %invocation.display_line(), cwd = %invocation.cwd.display(), "running command (capturing)");

    let output = Command::new(&invocation.program)
      .args(&invocation.args)
      .current_dir(&invocation.cwd)
      .output()
      .map_err(|e| ProcessError::Spawn {
        program: invocation.program.clone(),
        source: e,
      })?;

    if !output.status.success() {
      return Err(ProcessError::CommandFailed {
        command: invocation.display_line(),
        code: output.status.code(),
        log: None,
      });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  fn sh(cwd: &std::path::Path, script: &str) -> Invocation {
    Invocation::new("/bin/sh", cwd).arg("-c").arg(script)
  }

  #[test]
  fn run_succeeds_on_zero_exit() {
    let temp = TempDir::new().unwrap();
    SystemRunner.run(&sh(temp.path(), "true")).unwrap();
  }

  #[test]
  fn run_reports_nonzero_exit() {
    let temp = TempDir::new().unwrap();
    let err = SystemRunner.run(&sh(temp.path(), "exit 3")).unwrap_err();
    assert!(matches!(err, ProcessError::CommandFailed { code: Some(3), .. }));
  }

  #[test]
  fn run_redirects_both_streams_to_the_log() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("stage.log");

    SystemRunner
      .run(&sh(temp.path(), "echo out; echo err >&2").log_to(log.clone()))
      .unwrap();

    let text = fs::read_to_string(&log).unwrap();
    assert!(text.contains("out"));
    assert!(text.contains("err"));
  }

  #[test]
  fn run_respects_the_working_directory() {
    let temp = TempDir::new().unwrap();
    SystemRunner.run(&sh(temp.path(), "touch marker")).unwrap();
    assert!(temp.path().join("marker").exists());
  }

  #[test]
  fn capture_returns_stdout_verbatim() {
    let temp = TempDir::new().unwrap();
    let out = SystemRunner
      .run_capturing_stdout(&sh(temp.path(), "printf ok"))
      .unwrap();
    assert_eq!(out, "ok");
  }

  #[test]
  fn spawn_failure_names_the_program() {
    let temp = TempDir::new().unwrap();
    let invocation = Invocation::new("/no/such/binary", temp.path());
    let err = SystemRunner.run(&invocation).unwrap_err();
    assert!(matches!(err, ProcessError::Spawn { program, .. } if program == "/no/such/binary"));
  }

  #[test]
  fn display_line_joins_program_and_args() {
    let invocation = Invocation::new("make", "/b").arg("install");
    assert_eq!(invocation.display_line(), "make install");
  }
}
