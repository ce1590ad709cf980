//! `marquee`: manage a catalog of happenings from the command line.
//!
//! Reads `marquee.toml` (or the path given with `--config`) and `MARQUEE_*`
//! environment variables, loads the catalog, runs one command and saves the
//! catalog back if the command changed it.

mod commands;
mod settings;

use std::{io, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use marquee_core::{catalog::Catalog, delivery::DeliveryScheduler, person::LogTransport};
use marquee_json::JsonCodec;
use tokio::runtime::Handle;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{
  commands::{Command, Context},
  settings::Settings,
};

#[derive(Parser)]
#[command(author, version, about = "Marquee happening catalog")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "marquee.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;
  let path = settings.catalog_path.clone();

  let codec = if settings.pretty {
    JsonCodec::new()
  } else {
    JsonCodec::compact()
  };
  let catalog = Catalog::with_codec(codec);
  catalog
    .load(&path)
    .with_context(|| format!("failed to load catalog from {path:?}"))?;

  let ctx = Context {
    catalog,
    scheduler: DeliveryScheduler::new(Handle::current())
      .with_latency(settings.delivery_latency()),
    transport: Arc::new(LogTransport),
  };

  let mutated = commands::run(cli.command, &ctx, &mut io::stdout()).await?;
  if mutated {
    ctx
      .catalog
      .save(&path)
      .with_context(|| format!("failed to save catalog to {path:?}"))?;
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory as _;

  use super::*;

  #[test]
  fn cli_definition_is_consistent() { Cli::command().debug_assert(); }

  #[test]
  fn create_parses_every_date_layout() {
    for at in ["2030-06-01T09:30", "2030-06-01 09:30", "01/06/2030 09:30"] {
      let cli = Cli::try_parse_from([
        "marquee", "create", "gathering", "--name", "Tech Talk", "--venue", "Room 4",
        "--at", at, "--capacity", "2", "--topic", "AI", "--speaker", "Dr. X",
      ])
      .unwrap();
      assert!(matches!(cli.command, Command::Create(_)));
    }
  }

  #[test]
  fn zero_capacity_is_rejected_by_the_parser() {
    let parsed = Cli::try_parse_from([
      "marquee", "create", "performance", "--name", "x", "--venue", "v",
      "--at", "2030-01-01 10:00", "--capacity", "0", "--performer", "p", "--genre", "g",
    ]);
    assert!(parsed.is_err());
  }

  #[test]
  fn window_needs_both_ends() {
    assert!(Cli::try_parse_from(["marquee", "list", "--from", "2030-01-01 00:00"]).is_err());
  }
}
