//! Implementation of the `proto upgrade` command.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tracing::info;

use proto_lib::config;
use proto_lib::layout::Layout;
use proto_lib::net::SystemNetwork;
use proto_lib::pipeline::Orchestrator;
use proto_lib::platform::paths::root_dir;
use proto_lib::process::SystemRunner;

use crate::output::symbols;

use super::install::PERL6_EXE_OVERRIDE;

/// Execute the upgrade command.
///
/// Re-resolves the target's version setting and rebuilds from a clean
/// tree. Requires the target to have been installed before.
pub fn cmd_upgrade(target: &str) -> Result<()> {
  if target == "rakudo" {
    if let Ok(exe) = std::env::var(PERL6_EXE_OVERRIDE) {
      println!(
        "{} {} names {} directly; nothing to upgrade",
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

  let runner = SystemRunner;
  let net = SystemNetwork;
  Orchestrator::new(&settings, &runner, &net)
    .upgrade(target)
    .with_context(|| format!("Upgrading {target} failed"))?;

  info!(target, "upgrade complete");
  println!(
    "{} {}",
    symbols::SUCCESS.green(),
    format!("Upgraded {target}").green().bold()
  );

  Ok(())
}
