//! People: the attendee record and the two watcher roles built on it.
//!
//! A [`Person`] is plain data; it is what gets registered on a happening and
//! persisted. To hear about changes a person is wrapped in an [`Attendee`] or
//! [`Organizer`]; both implement [`Watcher`], format the message for their
//! role and hand it to a [`Transport`].

use std::{collections::BTreeSet, fmt, sync::Arc};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
  happening::Happening,
  id::{HappeningId, PersonId},
  notify::Watcher,
};

// ─── Person ──────────────────────────────────────────────────────────────────

/// Someone who can attend a happening. Equality is by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
  id:          PersonId,
  pub name:    String,
  pub contact: String,
}

impl Person {
  pub fn new(name: impl Into<String>, contact: impl Into<String>) -> Self {
    Self::with_id(PersonId::generate(), name, contact)
  }

  /// Rebuild a person whose id was assigned earlier (e.g. when loading).
  pub fn with_id(
    id: PersonId,
    name: impl Into<String>,
    contact: impl Into<String>,
  ) -> Self {
    Self {
      id,
      name: name.into(),
      contact: contact.into(),
    }
  }

  pub fn id(&self) -> PersonId { self.id }

  pub fn rename(&mut self, name: impl Into<String>) { self.name = name.into(); }

  pub fn set_contact(&mut self, contact: impl Into<String>) {
    self.contact = contact.into();
  }
}

impl PartialEq for Person {
  fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for Person {}

impl std::hash::Hash for Person {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) { self.id.hash(state); }
}

impl fmt::Display for Person {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.name, self.contact)
  }
}

// ─── Transport ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
  #[default]
  Normal,
  High,
}

/// A formatted message on its way to a person.
#[derive(Debug, Clone)]
pub struct Notice {
  pub priority: Priority,
  pub body:     String,
}

/// The last hop to a real person (email, SMS, ...).
pub trait Transport: Send + Sync {
  fn send(&self, recipient: &Person, notice: Notice);
}

/// Writes every notice to the `tracing` log. The default transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
  fn send(&self, recipient: &Person, notice: Notice) {
    tracing::info!(
      recipient = %recipient.id(),
      priority = ?notice.priority,
      "{}",
      notice.body
    );
  }
}

// ─── Attendee ────────────────────────────────────────────────────────────────

/// A plain person listening for changes.
pub struct Attendee {
  person:    Person,
  transport: Arc<dyn Transport>,
}

impl Attendee {
  pub fn new(person: Person, transport: Arc<dyn Transport>) -> Arc<Self> {
    Arc::new(Self { person, transport })
  }

  pub fn person(&self) -> &Person { &self.person }
}

impl Watcher for Attendee {
  fn id(&self) -> PersonId { self.person.id() }

  fn receive(&self, message: &str) {
    let body = format!(
      "notification to {} ({}): {message}",
      self.person.name, self.person.contact
    );
    self.transport.send(
      &self.person,
      Notice {
        priority: Priority::Normal,
        body,
      },
    );
  }
}

// ─── Organizer ───────────────────────────────────────────────────────────────

/// A person who follows happenings and gets priority notices about them.
///
/// The followed set mirrors the organizer's presence in each happening's
/// watcher set: it changes through [`Organizer::follow`] and
/// [`Organizer::unfollow`] as well as through [`Happening::subscribe`] and
/// [`Happening::unsubscribe`].
pub struct Organizer {
  person:    Person,
  transport: Arc<dyn Transport>,
  followed:  Mutex<BTreeSet<HappeningId>>,
}

impl Organizer {
  pub fn new(person: Person, transport: Arc<dyn Transport>) -> Arc<Self> {
    Arc::new(Self {
      person,
      transport,
      followed: Mutex::new(BTreeSet::new()),
    })
  }

  pub fn person(&self) -> &Person { &self.person }

  /// Watch `happening` as this organizer and record it as followed.
  ///
  /// Any other watcher for the same person (say, their plain [`Attendee`])
  /// is displaced, so the person hears about the happening once, at organizer
  /// priority. Following twice is a no-op and returns `false`.
  pub fn follow(self: &Arc<Self>, happening: &Happening) -> bool {
    if !self.followed.lock().insert(happening.id()) {
      return false;
    }
    if let Some(displaced) = happening.watchers().replace(self.clone()) {
      displaced.detached(happening.id());
    }
    true
  }

  /// Stop watching `happening` and forget it. Returns `false` if it was not
  /// followed. A different watcher subscribed under the same person is left
  /// in place.
  pub fn unfollow(&self, happening: &Happening) -> bool {
    if !self.followed.lock().remove(&happening.id()) {
      return false;
    }
    happening.watchers().remove_exact(self);
    true
  }

  pub fn follows(&self, id: HappeningId) -> bool { self.followed.lock().contains(&id) }

  /// Followed happening ids, in id order.
  pub fn followed(&self) -> Vec<HappeningId> {
    self.followed.lock().iter().copied().collect()
  }
}

impl Watcher for Organizer {
  fn id(&self) -> PersonId { self.person.id() }

  fn receive(&self, message: &str) {
    let body = format!(
      "PRIORITY notification to organizer {} ({}): {message}",
      self.person.name, self.person.contact
    );
    self.transport.send(
      &self.person,
      Notice {
        priority: Priority::High,
        body,
      },
    );
  }

  fn attached(&self, happening: HappeningId) { self.followed.lock().insert(happening); }

  fn detached(&self, happening: HappeningId) { self.followed.lock().remove(&happening); }
}


#[cfg(test)]
mod tests {
  use std::num::NonZeroU32;

  use chrono::NaiveDate;

  use super::{test_helpers::Outbox, *};
  use crate::happening::{Details, NewHappening, PerformanceDetails};

  fn concert() -> Happening {
    Happening::new(NewHappening {
      name:         "Concert Test Observer".into(),
      scheduled_at: NaiveDate::from_ymd_opt(2026, 7, 14)
        .unwrap()
        .and_hms_opt(21, 0, 0)
        .unwrap(),
      venue:        "Salle de test".into(),
      capacity:     NonZeroU32::new(50).unwrap(),
      details:      Details::Performance(PerformanceDetails {
        performer: "Artiste Test".into(),
        genre:     "Jazz".into(),
      }),
    })
  }

  #[test]
  fn equality_is_by_id_only() {
    let a = Person::new("Jean", "jean@test.com");
    let mut b = a.clone();
    b.rename("Jean-Pierre");
    b.set_contact("jp@test.com");
    assert_eq!(a, b);

    let c = Person::new("Jean", "jean@test.com");
    assert_ne!(a, c);
  }

  #[test]
  fn attendee_and_organizer_format_differently() {
    let outbox = Arc::new(Outbox::default());
    let attendee = Attendee::new(Person::new("Ann", "ann@x.org"), outbox.clone());
    let organizer = Organizer::new(Person::new("Olga", "olga@x.org"), outbox.clone());

    attendee.receive("hi");
    organizer.receive("hi");

    let sent = outbox.sent.lock();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].1.priority, Priority::Normal);
    assert_eq!(sent[0].1.body, "notification to Ann (ann@x.org): hi");
    assert_eq!(sent[1].1.priority, Priority::High);
    assert_eq!(
      sent[1].1.body,
      "PRIORITY notification to organizer Olga (olga@x.org): hi"
    );
  }

  #[test]
  fn follow_and_unfollow_keep_both_sides_in_step() {
    let outbox = Arc::new(Outbox::default());
    let organizer = Organizer::new(Person::new("Olga", "olga@x.org"), outbox.clone());
    let happening = concert();

    assert!(organizer.follow(&happening));
    assert!(!organizer.follow(&happening));
    assert!(organizer.follows(happening.id()));
    assert!(happening.watchers().contains(organizer.id()));
    assert_eq!(happening.watchers().len(), 1);

    happening.cancel().send();
    assert_eq!(outbox.sent.lock().len(), 1);

    assert!(organizer.unfollow(&happening));
    assert!(!organizer.unfollow(&happening));
    assert!(!organizer.follows(happening.id()));
    assert!(!happening.watchers().contains(organizer.id()));
    assert!(organizer.followed().is_empty());

    happening.cancel().send();
    assert_eq!(outbox.sent.lock().len(), 1);
  }

  #[test]
  fn following_takes_over_from_the_same_persons_attendee() {
    let outbox = Arc::new(Outbox::default());
    let olga = Person::new("Olga", "olga@x.org");
    let as_attendee = Attendee::new(olga.clone(), outbox.clone());
    let as_organizer = Organizer::new(olga.clone(), outbox.clone());
    let happening = concert();

    assert!(happening.subscribe(as_attendee.clone()));
    assert!(as_organizer.follow(&happening));
    assert!(as_organizer.follows(happening.id()));
    assert_eq!(happening.watchers().len(), 1);

    happening.cancel().send();
    {
      let sent = outbox.sent.lock();
      assert_eq!(sent.len(), 1);
      assert_eq!(sent[0].1.priority, Priority::High);
    }

    assert!(as_organizer.unfollow(&happening));
    assert!(happening.watchers().is_empty());
  }

  #[test]
  fn unfollow_leaves_a_namesake_watcher_subscribed() {
    let outbox = Arc::new(Outbox::default());
    let olga = Person::new("Olga", "olga@x.org");
    let first = Organizer::new(olga.clone(), outbox.clone());
    let second = Organizer::new(olga.clone(), outbox.clone());
    let happening = concert();

    assert!(first.follow(&happening));
    assert!(second.follow(&happening));
    assert!(!first.follows(happening.id()));

    assert!(!first.unfollow(&happening));
    assert!(second.unfollow(&happening));
    assert!(happening.watchers().is_empty());
  }

  #[test]
  fn subscribing_an_organizer_directly_keeps_the_mirror() {
    let outbox = Arc::new(Outbox::default());
    let organizer = Organizer::new(Person::new("Olga", "olga@x.org"), outbox);
    let happening = concert();

    assert!(happening.subscribe(organizer.clone()));
    assert_eq!(organizer.followed(), vec![happening.id()]);

    assert!(happening.unsubscribe(organizer.as_ref()));
    assert!(organizer.followed().is_empty());

    assert!(organizer.follow(&happening));
    assert!(happening.watchers().contains(organizer.id()));
  }
}
