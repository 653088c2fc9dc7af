//! Implementation of the `proto install` command.

use std::path::Path;

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;
use tracing::info;

use proto_lib::config;
use proto_lib::layout::Layout;
use proto_lib::net::SystemNetwork;
use proto_lib::pipeline::{BuildTarget, Orchestrator};
use proto_lib::platform::paths::root_dir;
use proto_lib::process::SystemRunner;

use crate::output::symbols;

/// When set, names the Perl 6 executable directly; the runtime target then
/// needs no version resolution and no build at all.
pub const PERL6_EXE_OVERRIDE: &str = "PROTO_PERL6_EXE";

/// Execute the install command.
///
/// Refuses when the target's artifact is already present and executable;
/// `proto upgrade` is the way to rebuild.
pub fn cmd_install(target: &str) -> Result<()> {
  if target == "rakudo" {
    if let Ok(exe) = std::env::var(PERL6_EXE_OVERRIDE) {
      println!(
        "{} {} names {} directly; nothing to install",
        symbols::INFO.cyan(),
        PERL6_EXE_OVERRIDE,
        exe
      );
      return Ok(());
    }
  }

  let layout = Layout::derive(root_dir());
  let (settings, _comments) = config::load(&layout.config_file())
    .context("Failed to load settings; run 'proto configure' first")?;

  let requested = BuildTarget::from_settings(target, &settings)?;
  if is_installed(&requested.artifact) {
    bail!(
      "{} is already installed at {}; use 'proto upgrade {}' to rebuild",
      target,
      requested.artifact.display(),
      target
    );
  }

  let runner = SystemRunner;
  let net = SystemNetwork;
  Orchestrator::new(&settings, &runner, &net)
    .install(target)
    .with_context(|| format!("Installing {target} failed"))?;

  info!(target, "install complete");
  println!(
    "{} {}",
    symbols::SUCCESS.green(),
    format!("Installed {target}").green().bold()
  );
  println!(
    "  {} {}",
    symbols::ARROW.cyan(),
    requested.artifact.display()
  );

  Ok(())
}

/// Installed means present *and* executable; a half-written artifact from a
/// killed run does not count.
fn is_installed(artifact: &Path) -> bool {
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(artifact)
      .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
      .unwrap_or(false)
  }

  #[cfg(not(unix))]
  {
    artifact.is_file()
  }
}
