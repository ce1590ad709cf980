//! Error types for `marquee-core`.

use std::path::PathBuf;

use thiserror::Error;

use crate::{
  happening::HappeningKind,
  id::{HappeningId, PersonId},
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("a happening with id {0} already exists")]
  DuplicateId(HappeningId),

  #[error("happening {happening} is full ({capacity} attendees)")]
  CapacityExceeded {
    happening: HappeningId,
    capacity:  u32,
  },

  #[error("person {person} is already registered for happening {happening}")]
  AlreadyRegistered {
    happening: HappeningId,
    person:    PersonId,
  },

  #[error("happening {happening} is not a {expected}")]
  VariantMismatch {
    happening: HappeningId,
    expected:  HappeningKind,
  },

  #[error("no persistence codec configured")]
  NoCodecConfigured,

  #[error("i/o error on {}: {source}", .path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// `entry` is the offending top-level key when the failure is local to one
  /// entry; `None` when the document as a whole is unreadable.
  #[error(
    "decode error{}: {reason}",
    .entry.as_deref().map(|e| format!(" in entry {e:?}")).unwrap_or_default()
  )]
  Decode {
    entry:  Option<String>,
    reason: String,
  },

  #[error("delivery failed: {0}")]
  DeliveryFailed(String),
}

impl Error {
  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io { path: path.into(), source }
  }

  pub fn decode(entry: Option<&str>, reason: impl Into<String>) -> Self {
    Self::Decode {
      entry:  entry.map(str::to_owned),
      reason: reason.into(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
