//! Happenings, the scheduled things people attend.
//!
//! A happening is one of a closed set of variants ([`Details`]). Base fields
//! live on [`Happening`]; variant fields live in the [`Details`] payload. All
//! state changes that matter to watchers go through methods on [`Happening`],
//! which hand back an [`Announcement`] for the happening's [`WatcherSet`].

use std::{fmt::Write as _, num::NonZeroU32, sync::Arc};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{
  Error, Result,
  id::HappeningId,
  notify::{Announcement, Watcher, WatcherSet},
  person::Person,
  schedule,
};

// ─── Variants ────────────────────────────────────────────────────────────────

/// The discriminant of [`Details`]; also the `kind` tag of the persisted form.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HappeningKind {
  Performance,
  Gathering,
}

/// A ticketed performance by a named act.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceDetails {
  pub performer: String,
  pub genre:     String,
}

/// A topic-based gathering with an ordered list of speakers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatheringDetails {
  pub topic:    String,
  pub speakers: Vec<String>,
}

impl GatheringDetails {
  pub fn new(topic: impl Into<String>) -> Self {
    Self {
      topic:    topic.into(),
      speakers: Vec::new(),
    }
  }
}

/// Variant-specific payload of a happening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Details {
  Performance(PerformanceDetails),
  Gathering(GatheringDetails),
}

impl Details {
  pub fn kind(&self) -> HappeningKind {
    match self {
      Self::Performance(_) => HappeningKind::Performance,
      Self::Gathering(_) => HappeningKind::Gathering,
    }
  }
}

// ─── NewHappening ────────────────────────────────────────────────────────────

/// Input to [`Happening::new`]. The id is always assigned by the constructor.
#[derive(Debug, Clone)]
pub struct NewHappening {
  pub name:         String,
  pub scheduled_at: NaiveDateTime,
  pub venue:        String,
  pub capacity:     NonZeroU32,
  pub details:      Details,
}

// ─── Happening ───────────────────────────────────────────────────────────────

/// A scheduled happening with a capped, ordered attendee list.
///
/// Invariants: `attendees.len() <= capacity`, no attendee appears twice, and
/// the id never changes. Watchers are live, in-process relationships and are
/// not part of equality or persistence.
#[derive(Debug)]
pub struct Happening {
  id:           HappeningId,
  name:         String,
  scheduled_at: NaiveDateTime,
  venue:        String,
  capacity:     NonZeroU32,
  attendees:    Vec<Person>,
  details:      Details,
  watchers:     Arc<WatcherSet>,
}

impl Happening {
  /// Create a happening with a fresh id, no attendees, and no watchers.
  pub fn new(input: NewHappening) -> Self {
    Self {
      id:           HappeningId::generate(),
      name:         input.name,
      scheduled_at: input.scheduled_at,
      venue:        input.venue,
      capacity:     input.capacity,
      attendees:    Vec::new(),
      details:      input.details,
      watchers:     Arc::new(WatcherSet::new()),
    }
  }

  /// Rebuild a previously persisted happening, keeping its id and attendee
  /// order. Fails with [`Error::Decode`] if the attendee list breaks the
  /// capacity or uniqueness invariant.
  pub fn restore(
    id: HappeningId,
    input: NewHappening,
    attendees: Vec<Person>,
  ) -> Result<Self> {
    let entry = id.to_string();
    if attendees.len() > input.capacity.get() as usize {
      return Err(Error::decode(
        Some(&entry),
        format!(
          "{} attendees exceed capacity {}",
          attendees.len(),
          input.capacity
        ),
      ));
    }
    for (i, person) in attendees.iter().enumerate() {
      if attendees[..i].contains(person) {
        return Err(Error::decode(
          Some(&entry),
          format!("attendee {} listed twice", person.id()),
        ));
      }
    }

    let mut happening = Self::new(input);
    happening.id = id;
    happening.attendees = attendees;
    Ok(happening)
  }

  // ── Accessors ─────────────────────────────────────────────────────────

  pub fn id(&self) -> HappeningId { self.id }

  pub fn name(&self) -> &str { &self.name }

  pub fn scheduled_at(&self) -> NaiveDateTime { self.scheduled_at }

  pub fn venue(&self) -> &str { &self.venue }

  pub fn capacity(&self) -> NonZeroU32 { self.capacity }

  /// Registered attendees in registration order.
  pub fn attendees(&self) -> &[Person] { &self.attendees }

  pub fn is_full(&self) -> bool { self.attendees.len() >= self.capacity.get() as usize }

  pub fn details(&self) -> &Details { &self.details }

  pub fn kind(&self) -> HappeningKind { self.details.kind() }

  /// The shared notification fabric. Watchers may keep a clone of this to
  /// manage their own subscription.
  pub fn watchers(&self) -> &Arc<WatcherSet> { &self.watchers }

  /// Add `watcher` unless one with the same id is already subscribed, and
  /// let it know through [`Watcher::attached`].
  pub fn subscribe(&self, watcher: Arc<dyn Watcher>) -> bool {
    if !self.watchers.subscribe(watcher.clone()) {
      return false;
    }
    watcher.attached(self.id);
    true
  }

  /// Remove whichever watcher holds `watcher`'s id and let it know through
  /// [`Watcher::detached`].
  pub fn unsubscribe(&self, watcher: &dyn Watcher) -> bool {
    match self.watchers.remove(watcher.id()) {
      Some(removed) => {
        removed.detached(self.id);
        true
      }
      None => false,
    }
  }

  // ── Registration ──────────────────────────────────────────────────────

  /// Append `person` to the attendee list. The returned announcement tells
  /// every watcher.
  ///
  /// Capacity is checked before duplicates. A failed call changes nothing.
  pub fn register(&mut self, person: Person) -> Result<Announcement> {
    if self.is_full() {
      return Err(Error::CapacityExceeded {
        happening: self.id,
        capacity:  self.capacity.get(),
      });
    }
    if self.attendees.contains(&person) {
      return Err(Error::AlreadyRegistered {
        happening: self.id,
        person:    person.id(),
      });
    }

    let message = format!("person {} added to happening {}", person.name, self.name);
    self.attendees.push(person);
    Ok(self.announce(message))
  }

  /// Announce that the happening is off. Removal from a catalog is the
  /// caller's business.
  pub fn cancel(&self) -> Announcement {
    self.announce(format!("happening {} was cancelled", self.name))
  }

  fn announce(&self, message: String) -> Announcement {
    Announcement::new(&self.watchers, message)
  }

  // ── Base setters ──────────────────────────────────────────────────────

  pub fn rename(&mut self, name: impl Into<String>) -> Announcement {
    let name = name.into();
    let message = format!("happening {} renamed to {name}", self.name);
    self.name = name;
    self.announce(message)
  }

  pub fn relocate(&mut self, venue: impl Into<String>) -> Announcement {
    self.venue = venue.into();
    self.announce(format!("happening {} moved to {}", self.name, self.venue))
  }

  pub fn reschedule(&mut self, scheduled_at: NaiveDateTime) -> Announcement {
    self.scheduled_at = scheduled_at;
    self.announce(format!(
      "happening {} rescheduled to {}",
      self.name,
      schedule::display(scheduled_at)
    ))
  }

  // ── Variant setters ───────────────────────────────────────────────────
  //
  // A variant mismatch fails before anything changes.

  pub fn set_performer(&mut self, performer: impl Into<String>) -> Result<Announcement> {
    let performer = performer.into();
    let message =
      format!("performer of happening {} changed to {performer}", self.name);
    self.performance_mut()?.performer = performer;
    Ok(self.announce(message))
  }

  pub fn set_genre(&mut self, genre: impl Into<String>) -> Result<Announcement> {
    let genre = genre.into();
    let message = format!("genre of happening {} changed to {genre}", self.name);
    self.performance_mut()?.genre = genre;
    Ok(self.announce(message))
  }

  pub fn set_topic(&mut self, topic: impl Into<String>) -> Result<Announcement> {
    let topic = topic.into();
    let message = format!("topic of happening {} changed to {topic}", self.name);
    self.gathering_mut()?.topic = topic;
    Ok(self.announce(message))
  }

  pub fn add_speaker(&mut self, speaker: impl Into<String>) -> Result<Announcement> {
    let speaker = speaker.into();
    let message = format!("speaker {speaker} added to happening {}", self.name);
    self.gathering_mut()?.speakers.push(speaker);
    Ok(self.announce(message))
  }

  fn performance_mut(&mut self) -> Result<&mut PerformanceDetails> {
    match &mut self.details {
      Details::Performance(p) => Ok(p),
      Details::Gathering(_) => Err(Error::VariantMismatch {
        happening: self.id,
        expected:  HappeningKind::Performance,
      }),
    }
  }

  fn gathering_mut(&mut self) -> Result<&mut GatheringDetails> {
    match &mut self.details {
      Details::Gathering(g) => Ok(g),
      Details::Performance(_) => Err(Error::VariantMismatch {
        happening: self.id,
        expected:  HappeningKind::Gathering,
      }),
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// True if the happening starts strictly after `now`.
  pub fn is_upcoming(&self, now: NaiveDateTime) -> bool { self.scheduled_at > now }

  /// True if the happening starts within `[start, end]`.
  pub fn is_within(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
    start <= self.scheduled_at && self.scheduled_at <= end
  }

  /// Multi-line human-readable summary.
  pub fn describe(&self) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "Happening: {}", self.name);
    let _ = writeln!(out, "Date: {}", schedule::display(self.scheduled_at));
    let _ = writeln!(out, "Venue: {}", self.venue);
    let _ = writeln!(out, "Capacity: {}", self.capacity);
    let _ = writeln!(out, "Attendees: {}", self.attendees.len());
    match &self.details {
      Details::Performance(p) => {
        let _ = writeln!(out, "Type: Performance");
        let _ = writeln!(out, "Performer: {}", p.performer);
        let _ = writeln!(out, "Genre: {}", p.genre);
      }
      Details::Gathering(g) => {
        let _ = writeln!(out, "Type: Gathering");
        let _ = writeln!(out, "Topic: {}", g.topic);
        let _ = writeln!(out, "Speakers:");
        for speaker in &g.speakers {
          let _ = writeln!(out, "- {speaker}");
        }
      }
    }
    out
  }
}

/// Compares every persisted field. Watchers are ignored.
impl PartialEq for Happening {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
      && self.name == other.name
      && self.scheduled_at == other.scheduled_at
      && self.venue == other.venue
      && self.capacity == other.capacity
      && self.details == other.details
      && self.attendees.len() == other.attendees.len()
      && self.attendees.iter().zip(&other.attendees).all(|(a, b)| {
        a.id() == b.id() && a.name == b.name && a.contact == b.contact
      })
  }
}

#[cfg(test)]
pub(crate) mod test_helpers {
  use std::num::NonZeroU32;

  use chrono::{NaiveDate, NaiveDateTime};

  use super::*;

  pub(crate) fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
      .unwrap()
      .and_hms_opt(h, min, 0)
      .unwrap()
  }

  pub(crate) fn performance(name: &str, capacity: u32) -> Happening {
    Happening::new(NewHappening {
      name:         name.into(),
      scheduled_at: at(2026, 5, 1, 20, 0),
      venue:        "Main Hall".into(),
      capacity:     NonZeroU32::new(capacity).unwrap(),
      details:      Details::Performance(PerformanceDetails {
        performer: "Artiste Test".into(),
        genre:     "Rock".into(),
      }),
    })
  }

  pub(crate) fn gathering(name: &str, capacity: u32, topic: &str) -> Happening {
    Happening::new(NewHappening {
      name:         name.into(),
      scheduled_at: at(2026, 6, 1, 9, 30),
      venue:        "Room 4".into(),
      capacity:     NonZeroU32::new(capacity).unwrap(),
      details:      Details::Gathering(GatheringDetails::new(topic)),
    })
  }
}
