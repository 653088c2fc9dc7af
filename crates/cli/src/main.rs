use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

/// proto - bootstrap the Parrot VM and Rakudo Perl 6 from nothing
#[derive(Parser)]
#[command(name = "proto")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Write a fresh settings file and stop so it can be reviewed
  Configure,

  /// Download, build and install a target (parrot or rakudo)
  Install {
    /// Target name
    target: String,
  },

  /// Re-resolve a target's version and rebuild it from a clean tree
  Upgrade {
    /// Target name
    target: String,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    // An unrecognized command gets the help text and a success exit; only
    // real failures exit nonzero.
    Err(err) if err.kind() == clap::error::ErrorKind::InvalidSubcommand => {
      Cli::command().print_help()?;
      return Ok(());
    }
    Err(err) => err.exit(),
  };

  match cli.command {
    Some(Commands::Configure) => cmd::cmd_configure(),
    Some(Commands::Install { target }) => cmd::cmd_install(&target),
    Some(Commands::Upgrade { target }) => cmd::cmd_upgrade(&target),
    None => {
      Cli::command().print_help()?;
      Ok(())
    }
  }
}
