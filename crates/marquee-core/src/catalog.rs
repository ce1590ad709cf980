//! The [`Catalog`], a keyed store of happenings.
//!
//! A catalog is constructed explicitly and handed to whatever drives it;
//! there is no global instance. It is the only thing that adds happenings to
//! or removes them from the collection. Persistence is delegated to a
//! [`Codec`].

use std::{collections::HashMap, path::Path, sync::Arc};

use parking_lot::{Mutex, RwLock};

use crate::{
  Error, Result,
  codec::Codec,
  happening::Happening,
  id::HappeningId,
};

/// A happening as stored in the catalog. Lock it to read or mutate.
pub type SharedHappening = Arc<Mutex<Happening>>;

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Thread-safe store of happenings keyed by id.
///
/// Reads share the map lock; `add`, `remove`, `cancel` and `load` take it
/// exclusively. `save` and `load` are additionally serialized against each
/// other. `load` holds the exclusive lock for the whole decode-and-swap, so
/// no reader ever sees a half-loaded catalog.
///
/// The map lock is never held while a happening is locked. Together with
/// [`Announcement`](crate::notify::Announcement)s being sent after the
/// happening is unlocked, this lets watchers call back into the catalog.
#[derive(Default)]
pub struct Catalog {
  happenings: RwLock<HashMap<HappeningId, SharedHappening>>,
  codec:      RwLock<Option<Arc<dyn Codec>>>,
  persist:    Mutex<()>,
}

impl Catalog {
  /// An empty catalog with no codec.
  pub fn new() -> Self { Self::default() }

  /// An empty catalog that saves and loads through `codec`.
  pub fn with_codec(codec: impl Codec + 'static) -> Self {
    let catalog = Self::new();
    catalog.set_codec(codec);
    catalog
  }

  pub fn set_codec(&self, codec: impl Codec + 'static) {
    *self.codec.write() = Some(Arc::new(codec));
  }

  // ── Mutations ─────────────────────────────────────────────────────────

  /// Store `happening` under its id and return the shared handle.
  ///
  /// Fails with [`Error::DuplicateId`] if the id is taken; the catalog is
  /// left unchanged.
  pub fn add(&self, happening: Happening) -> Result<SharedHappening> {
    let id = happening.id();
    let mut happenings = self.happenings.write();
    if happenings.contains_key(&id) {
      return Err(Error::DuplicateId(id));
    }
    let shared = Arc::new(Mutex::new(happening));
    happenings.insert(id, shared.clone());
    tracing::debug!(happening = %id, "added happening");
    Ok(shared)
  }

  /// Remove the happening with `id`, without telling its watchers. Unknown
  /// ids are ignored.
  pub fn remove(&self, id: HappeningId) -> Option<SharedHappening> {
    let removed = self.happenings.write().remove(&id);
    if removed.is_some() {
      tracing::debug!(happening = %id, "removed happening");
    }
    removed
  }

  /// Broadcast the cancellation of `id` to its watchers, then remove it.
  /// Unknown ids are ignored.
  pub fn cancel(&self, id: HappeningId) -> Option<SharedHappening> {
    let removed = self.happenings.write().remove(&id)?;
    let announcement = removed.lock().cancel();
    let notified = announcement.send();
    tracing::info!(happening = %id, notified, "cancelled happening");
    Some(removed)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub fn find(&self, id: HappeningId) -> Option<SharedHappening> {
    self.happenings.read().get(&id).cloned()
  }

  /// Every happening whose name contains `needle`, ignoring case.
  pub fn find_by_name_contains(
    &self,
    needle: &str,
  ) -> HashMap<HappeningId, SharedHappening> {
    let needle = needle.to_lowercase();
    self
      .snapshot()
      .into_iter()
      .filter(|(_, h)| h.lock().name().to_lowercase().contains(&needle))
      .collect()
  }

  /// An independent copy of the id → happening map. Adding to or removing
  /// from the copy does not touch the catalog.
  pub fn snapshot(&self) -> HashMap<HappeningId, SharedHappening> {
    self.happenings.read().clone()
  }

  pub fn len(&self) -> usize { self.happenings.read().len() }

  pub fn is_empty(&self) -> bool { self.happenings.read().is_empty() }

  // ── Persistence ───────────────────────────────────────────────────────

  fn codec(&self) -> Result<Arc<dyn Codec>> {
    self.codec.read().clone().ok_or(Error::NoCodecConfigured)
  }

  /// Write every happening to `destination` through the configured codec.
  pub fn save(&self, destination: &Path) -> Result<()> {
    let codec = self.codec()?;
    let _persist = self.persist.lock();

    let happenings = self.snapshot();
    let guards: Vec<_> = happenings.values().map(|h| h.lock()).collect();
    let refs: Vec<&Happening> = guards.iter().map(|g| &**g).collect();

    codec.serialize(&refs, destination)?;
    tracing::info!(
      count = refs.len(),
      path = %destination.display(),
      "saved catalog"
    );
    Ok(())
  }

  /// Replace the whole catalog with the contents of `source` and return how
  /// many happenings were loaded. On failure the catalog keeps its previous
  /// contents.
  pub fn load(&self, source: &Path) -> Result<usize> {
    let codec = self.codec()?;
    let _persist = self.persist.lock();

    let mut happenings = self.happenings.write();
    let loaded = codec.deserialize(source)?;
    *happenings = loaded
      .into_iter()
      .map(|(id, h)| (id, Arc::new(Mutex::new(h))))
      .collect();

    tracing::info!(
      count = happenings.len(),
      path = %source.display(),
      "loaded catalog"
    );
    Ok(happenings.len())
  }
}
