//! Error type for `marquee-json`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("i/o error on {}: {source}", .path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The document as a whole is not a JSON object.
  #[error("malformed document: {0}")]
  Document(#[from] serde_json::Error),

  /// One top-level entry could not be rebuilt.
  #[error("entry {entry:?}: {reason}")]
  Entry { entry: String, reason: String },

  #[error(transparent)]
  Core(#[from] marquee_core::Error),
}

impl Error {
  pub(crate) fn entry(entry: &str, reason: impl Into<String>) -> Self {
    Self::Entry {
      entry:  entry.to_owned(),
      reason: reason.into(),
    }
  }
}

impl From<Error> for marquee_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Io { path, source } => Self::Io { path, source },
      Error::Document(e) => Self::decode(None, e.to_string()),
      Error::Entry { entry, reason } => Self::Decode {
        entry:  Some(entry),
        reason,
      },
      Error::Core(e) => e,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
