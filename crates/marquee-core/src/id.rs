//! Opaque identifiers for happenings and people.
//!
//! Both are random (v4) UUIDs wrapped in newtypes so the two id spaces cannot
//! be mixed up. Serialised as the plain hyphenated UUID string.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a [`Happening`](crate::happening::Happening).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct HappeningId(Uuid);

/// Identifies a [`Person`](crate::person::Person). Also the identity of the
/// watcher that wraps that person.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PersonId(Uuid);

impl HappeningId {
  /// A fresh id, never previously handed out by this process.
  pub fn generate() -> Self { Self(Uuid::new_v4()) }

  pub fn from_uuid(id: Uuid) -> Self { Self(id) }

  pub fn as_uuid(&self) -> Uuid { self.0 }
}

impl PersonId {
  pub fn generate() -> Self { Self(Uuid::new_v4()) }

  pub fn from_uuid(id: Uuid) -> Self { Self(id) }

  pub fn as_uuid(&self) -> Uuid { self.0 }
}

impl fmt::Display for HappeningId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.0.hyphenated(), f)
  }
}

impl fmt::Display for PersonId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.0.hyphenated(), f)
  }
}

impl FromStr for HappeningId {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self(Uuid::parse_str(s)?)) }
}

impl FromStr for PersonId {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self(Uuid::parse_str(s)?)) }
}
