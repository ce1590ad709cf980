//! The `Codec` trait: how a catalog is written to and read from storage.
//!
//! Implemented by encoding backends (e.g. `marquee-json`). The
//! [`Catalog`](crate::catalog::Catalog) depends on this abstraction only.

use std::{collections::HashMap, path::Path};

use crate::{Result, happening::Happening, id::HappeningId};

/// A subtype-preserving encoding for a set of happenings.
///
/// Implementations must:
/// - write all-or-nothing: a failed `serialize` leaves `destination` as it was;
/// - create missing parent directories of `destination`;
/// - treat a missing or zero-length `source` as an empty catalog;
/// - fail the whole `deserialize` with [`Error::Decode`](crate::Error::Decode)
///   rather than dropping an entry they cannot rebuild.
///
/// Watchers are never persisted.
pub trait Codec: Send + Sync {
  fn serialize(&self, happenings: &[&Happening], destination: &Path) -> Result<()>;

  fn deserialize(&self, source: &Path) -> Result<HashMap<HappeningId, Happening>>;
}
