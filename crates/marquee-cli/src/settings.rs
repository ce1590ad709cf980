//! Runtime settings: a TOML file overlaid with `MARQUEE_*` environment
//! variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Where the catalog document lives. A leading `~/` is expanded.
  pub catalog_path:        PathBuf,
  /// Artificial delay before each notification is delivered.
  pub delivery_latency_ms: u64,
  /// Indent the catalog document.
  pub pretty:              bool,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      catalog_path:        PathBuf::from("~/.local/share/marquee/catalog.json"),
      delivery_latency_ms: 0,
      pretty:              true,
    }
  }
}

impl Settings {
  /// Read `file` (if it exists) and the environment.
  pub fn load(file: &Path) -> anyhow::Result<Self> {
    let mut settings: Self = config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(config::Environment::with_prefix("MARQUEE").try_parsing(true))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise settings")?;

    settings.catalog_path = expand_tilde(&settings.catalog_path);
    Ok(settings)
  }

  pub fn delivery_latency(&self) -> Duration {
    Duration::from_millis(self.delivery_latency_ms)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
