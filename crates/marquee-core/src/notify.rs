//! The per-happening notification fabric.
//!
//! Every [`Happening`](crate::happening::Happening) owns a shared
//! [`WatcherSet`]. Changes to a happening produce an [`Announcement`], which
//! the caller sends once it has let go of the happening. The registry lock is
//! released before any watcher runs, so a watcher may unsubscribe itself (or
//! anyone else) from inside [`Watcher::receive`].

use std::{collections::HashMap, fmt, ptr, sync::Arc};

use parking_lot::Mutex;

use crate::id::{HappeningId, PersonId};

// ─── Capability ──────────────────────────────────────────────────────────────

/// Anything that can be told about a change.
///
/// Identity is [`Watcher::id`]: two watchers with the same id are the same
/// subscriber as far as a [`WatcherSet`] is concerned.
pub trait Watcher: Send + Sync {
  fn id(&self) -> PersonId;

  /// Runs on the thread that sends the announcement. The catalog sends with
  /// no lock held, and callers are expected to drop the happening's lock
  /// before [`Announcement::send`]; `receive` may then call back into either.
  fn receive(&self, message: &str);

  /// Called after [`Happening::subscribe`](crate::happening::Happening::subscribe)
  /// added this watcher to `happening`.
  fn attached(&self, _happening: HappeningId) {}

  /// Called after this watcher was taken off `happening` by
  /// [`Happening::unsubscribe`](crate::happening::Happening::unsubscribe) or
  /// displaced by [`WatcherSet::replace`].
  fn detached(&self, _happening: HappeningId) {}
}

fn same_watcher(a: &Arc<dyn Watcher>, b: &dyn Watcher) -> bool {
  ptr::addr_eq(Arc::as_ptr(a), b)
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// A deduplicated set of watchers with snapshot broadcast.
#[derive(Default)]
pub struct WatcherSet {
  watchers: Mutex<HashMap<PersonId, Arc<dyn Watcher>>>,
}

impl WatcherSet {
  pub fn new() -> Self { Self::default() }

  /// Add `watcher`. Returns `false` if a watcher with the same id was already
  /// subscribed, in which case nothing changes.
  pub fn subscribe(&self, watcher: Arc<dyn Watcher>) -> bool {
    let mut watchers = self.watchers.lock();
    if watchers.contains_key(&watcher.id()) {
      return false;
    }
    watchers.insert(watcher.id(), watcher);
    true
  }

  /// Put `watcher` in the set, displacing any other watcher with the same id.
  /// Returns the displaced watcher; `None` if the slot was empty or already
  /// held `watcher` itself.
  pub fn replace(&self, watcher: Arc<dyn Watcher>) -> Option<Arc<dyn Watcher>> {
    self
      .watchers
      .lock()
      .insert(watcher.id(), watcher.clone())
      .filter(|prior| !same_watcher(prior, watcher.as_ref()))
  }

  /// Remove the watcher with `id`. Unknown ids are ignored.
  pub fn unsubscribe(&self, id: PersonId) -> bool { self.remove(id).is_some() }

  /// Remove and return the watcher with `id`.
  pub fn remove(&self, id: PersonId) -> Option<Arc<dyn Watcher>> {
    self.watchers.lock().remove(&id)
  }

  /// Remove `watcher` only if it is the one subscribed under its id.
  pub fn remove_exact(&self, watcher: &dyn Watcher) -> bool {
    let mut watchers = self.watchers.lock();
    match watchers.get(&watcher.id()) {
      Some(held) if same_watcher(held, watcher) => {
        watchers.remove(&watcher.id());
        true
      }
      _ => false,
    }
  }

  pub fn contains(&self, id: PersonId) -> bool {
    self.watchers.lock().contains_key(&id)
  }

  pub fn len(&self) -> usize { self.watchers.lock().len() }

  pub fn is_empty(&self) -> bool { self.watchers.lock().is_empty() }

  /// Deliver `message` to every watcher subscribed when the call starts.
  ///
  /// Subscriptions changed by a watcher during delivery take effect for the
  /// next broadcast. Returns the number of watchers reached.
  pub fn broadcast(&self, message: &str) -> usize {
    let snapshot: Vec<Arc<dyn Watcher>> =
      self.watchers.lock().values().cloned().collect();

    tracing::trace!(watchers = snapshot.len(), message, "broadcast");
    for watcher in &snapshot {
      watcher.receive(message);
    }
    snapshot.len()
  }
}

// ─── Announcement ────────────────────────────────────────────────────────────

/// A change message bound for a happening's watchers.
///
/// Mutating a happening returns one of these instead of delivering straight
/// away, so watchers never run while the happening is locked:
///
/// ```ignore
/// let announcement = shared.lock().rename("Late Show");
/// announcement.send();
/// ```
#[must_use = "watchers are only told once the announcement is sent"]
pub struct Announcement {
  watchers: Arc<WatcherSet>,
  message:  String,
}

impl Announcement {
  pub(crate) fn new(watchers: &Arc<WatcherSet>, message: String) -> Self {
    Self {
      watchers: watchers.clone(),
      message,
    }
  }

  pub fn message(&self) -> &str { &self.message }

  /// Broadcast to the watchers subscribed now. Returns how many were reached.
  pub fn send(self) -> usize { self.watchers.broadcast(&self.message) }
}

impl fmt::Debug for Announcement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Announcement")
      .field("message", &self.message)
      .finish_non_exhaustive()
  }
}

impl fmt::Debug for WatcherSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let ids: Vec<PersonId> = self.watchers.lock().keys().copied().collect();
    f.debug_struct("WatcherSet").field("watchers", &ids).finish()
  }
}
