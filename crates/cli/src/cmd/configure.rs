//! Implementation of the `proto configure` command.
//!
//! Scaffolds the settings file from the derived layout and then stops: the
//! user is expected to review the file before any build runs.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use proto_lib::config;
use proto_lib::layout::Layout;
use proto_lib::platform::paths::root_dir;

use crate::output::symbols;

/// Execute the configure command.
///
/// # Errors
///
/// Returns an error if the settings file already exists or cannot be
/// written.
pub fn cmd_configure() -> Result<()> {
  let layout = Layout::derive(root_dir());
  let created = config::create_default(&layout.config_file(), &layout)
    .context("Failed to create the settings file")?;

  println!(
    "{} {}",
    symbols::SUCCESS.green(),
    "Wrote a fresh settings file.".green().bold()
  );
  println!();
  println!(
    "  {} Settings: {}",
    symbols::INFO.cyan(),
    created.path.display()
  );
  println!();
  println!("{}", "Next steps:".bold());
  println!(
    "  1. Review {} and adjust directories or versions",
    created.path.display().to_string().cyan()
  );
  println!("  2. Run: {}", "proto install rakudo".cyan());

  Ok(())
}
