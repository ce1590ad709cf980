//! Subcommands and their execution against a loaded catalog.

use std::{io::Write, num::NonZeroU32, sync::Arc};

use anyhow::{Context as _, bail};
use chrono::{Local, NaiveDateTime};
use clap::{Args, Subcommand};
use marquee_core::{
  catalog::{Catalog, SharedHappening},
  delivery::DeliveryScheduler,
  happening::{Details, GatheringDetails, Happening, NewHappening, PerformanceDetails},
  id::HappeningId,
  notify::{Announcement, Watcher},
  person::{Attendee, Organizer, Person, Transport},
  schedule,
};

fn when(input: &str) -> Result<NaiveDateTime, String> {
  schedule::parse(input).map_err(|e| format!("unrecognised date-time {input:?}: {e}"))
}

// ─── Arguments ───────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Add a happening to the catalog.
  #[command(subcommand)]
  Create(Create),

  /// List happenings, soonest first.
  List {
    /// Only happenings that have not started yet.
    #[arg(long)]
    upcoming: bool,
    #[arg(long, value_parser = when, requires = "to")]
    from:     Option<NaiveDateTime>,
    #[arg(long, value_parser = when, requires = "from")]
    to:       Option<NaiveDateTime>,
  },

  /// Find happenings whose name contains TEXT (case-insensitive).
  Search { text: String },

  /// Print everything about one happening.
  Show { id: HappeningId },

  /// Drop a happening without telling anyone.
  Remove { id: HappeningId },

  /// Tell everyone watching a happening that it is off, then drop it.
  Cancel { id: HappeningId },

  /// Register a person on a happening and send them a confirmation.
  Register {
    id:        HappeningId,
    #[arg(long)]
    name:      String,
    #[arg(long)]
    contact:   String,
    /// Confirm with an organizer's priority notice.
    #[arg(long)]
    organizer: bool,
  },

  /// Append a speaker to a gathering.
  AddSpeaker { id: HappeningId, speaker: String },

  Rename { id: HappeningId, name: String },

  Relocate { id: HappeningId, venue: String },

  Reschedule {
    id:   HappeningId,
    #[arg(value_parser = when)]
    when: NaiveDateTime,
  },
}

#[derive(Debug, Args)]
pub struct Common {
  #[arg(long)]
  name:     String,
  #[arg(long)]
  venue:    String,
  /// `YYYY-MM-DD HH:MM`, `YYYY-MM-DDTHH:MM[:SS]` or `DD/MM/YYYY HH:MM`.
  #[arg(long, value_parser = when)]
  at:       NaiveDateTime,
  #[arg(long)]
  capacity: NonZeroU32,
}

#[derive(Debug, Subcommand)]
pub enum Create {
  Performance {
    #[command(flatten)]
    common:    Common,
    #[arg(long)]
    performer: String,
    #[arg(long)]
    genre:     String,
  },
  Gathering {
    #[command(flatten)]
    common:   Common,
    #[arg(long)]
    topic:    String,
    /// Repeat for each speaker, in speaking order.
    #[arg(long = "speaker")]
    speakers: Vec<String>,
  },
}

impl Create {
  fn into_new_happening(self) -> NewHappening {
    let (common, details) = match self {
      Self::Performance {
        common,
        performer,
        genre,
      } => (
        common,
        Details::Performance(PerformanceDetails { performer, genre }),
      ),
      Self::Gathering {
        common,
        topic,
        speakers,
      } => (
        common,
        Details::Gathering(GatheringDetails { topic, speakers }),
      ),
    };
    NewHappening {
      name: common.name,
      scheduled_at: common.at,
      venue: common.venue,
      capacity: common.capacity,
      details,
    }
  }
}

// ─── Execution ───────────────────────────────────────────────────────────────

/// Everything a command may touch.
pub struct Context {
  pub catalog:   Catalog,
  pub scheduler: DeliveryScheduler,
  pub transport: Arc<dyn Transport>,
}

fn find(catalog: &Catalog, id: HappeningId) -> anyhow::Result<SharedHappening> {
  catalog
    .find(id)
    .with_context(|| format!("no happening with id {id}"))
}

fn summary(h: &Happening) -> String {
  format!(
    "{}  {}  {:<11}  {} @ {} ({}/{})",
    h.id(),
    schedule::display(h.scheduled_at()),
    h.kind(),
    h.name(),
    h.venue(),
    h.attendees().len(),
    h.capacity()
  )
}

fn print_sorted(
  happenings: impl IntoIterator<Item = SharedHappening>,
  keep: impl Fn(&Happening) -> bool,
  out: &mut impl Write,
) -> anyhow::Result<()> {
  let mut rows: Vec<(NaiveDateTime, String, String)> = happenings
    .into_iter()
    .filter_map(|shared| {
      let h = shared.lock();
      if keep(&h) {
        Some((h.scheduled_at(), h.name().to_owned(), summary(&h)))
      } else {
        None
      }
    })
    .collect();
  rows.sort();

  if rows.is_empty() {
    writeln!(out, "no happenings")?;
  }
  for (_, _, line) in rows {
    writeln!(out, "{line}")?;
  }
  Ok(())
}

/// Run `command`, writing its report to `out`. Returns whether the catalog
/// changed and needs saving.
pub async fn run(
  command: Command,
  ctx: &Context,
  out: &mut impl Write,
) -> anyhow::Result<bool> {
  let catalog = &ctx.catalog;

  match command {
    Command::Create(create) => {
      let shared = catalog.add(Happening::new(create.into_new_happening()))?;
      writeln!(out, "created {}", shared.lock().id())?;
      Ok(true)
    }

    Command::List { upcoming, from, to } => {
      let now = Local::now().naive_local();
      let keep = |h: &Happening| {
        (!upcoming || h.is_upcoming(now))
          && match (from, to) {
            (Some(start), Some(end)) => h.is_within(start, end),
            _ => true,
          }
      };
      print_sorted(catalog.snapshot().into_values(), keep, out)?;
      Ok(false)
    }

    Command::Search { text } => {
      print_sorted(catalog.find_by_name_contains(&text).into_values(), |_| true, out)?;
      Ok(false)
    }

    Command::Show { id } => {
      let shared = find(catalog, id)?;
      let h = shared.lock();
      write!(out, "{}", h.describe())?;
      for person in h.attendees() {
        writeln!(out, "  * {person}")?;
      }
      Ok(false)
    }

    Command::Remove { id } => {
      if catalog.remove(id).is_none() {
        bail!("no happening with id {id}");
      }
      writeln!(out, "removed {id}")?;
      Ok(true)
    }

    Command::Cancel { id } => {
      if catalog.cancel(id).is_none() {
        bail!("no happening with id {id}");
      }
      writeln!(out, "cancelled {id}")?;
      Ok(true)
    }

    Command::Register {
      id,
      name,
      contact,
      organizer,
    } => {
      let person = Person::new(name, contact);
      let shared = find(catalog, id)?;
      let (announcement, confirmation) = {
        let mut h = shared.lock();
        let announcement = h
          .register(person.clone())
          .with_context(|| format!("could not register {person}"))?;
        let confirmation = format!(
          "you are registered for {} on {}",
          h.name(),
          schedule::display(h.scheduled_at())
        );
        (announcement, confirmation)
      };
      announcement.send();

      let watcher: Arc<dyn Watcher> = if organizer {
        Organizer::new(person.clone(), ctx.transport.clone())
      } else {
        Attendee::new(person.clone(), ctx.transport.clone())
      };
      ctx.scheduler.notify_async(watcher, confirmation).await?;

      writeln!(out, "registered {} as {}", person, person.id())?;
      Ok(true)
    }

    Command::AddSpeaker { id, speaker } => {
      let announcement = find(catalog, id)?.lock().add_speaker(speaker)?;
      updated(id, announcement, out)
    }

    Command::Rename { id, name } => {
      let announcement = find(catalog, id)?.lock().rename(name);
      updated(id, announcement, out)
    }

    Command::Relocate { id, venue } => {
      let announcement = find(catalog, id)?.lock().relocate(venue);
      updated(id, announcement, out)
    }

    Command::Reschedule { id, when } => {
      let announcement = find(catalog, id)?.lock().reschedule(when);
      updated(id, announcement, out)
    }
  }
}

/// Send an edit's announcement, with the happening already unlocked, and
/// report it.
fn updated(
  id: HappeningId,
  announcement: Announcement,
  out: &mut impl Write,
) -> anyhow::Result<bool> {
  let notified = announcement.send();
  writeln!(out, "updated {id} ({notified} notified)")?;
  Ok(true)
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use marquee_core::{
    Error as CoreError,
    happening::HappeningKind,
    person::{Notice, Priority},
  };
  use tokio::runtime::Handle;

  use super::*;

  #[derive(Default)]
  struct Outbox {
    sent: Mutex<Vec<Notice>>,
  }

  impl Transport for Outbox {
    fn send(&self, _recipient: &Person, notice: Notice) {
      self.sent.lock().unwrap().push(notice);
    }
  }

  fn context(outbox: Arc<Outbox>) -> Context {
    Context {
      catalog:   Catalog::new(),
      scheduler: DeliveryScheduler::new(Handle::current()),
      transport: outbox,
    }
  }

  fn at(s: &str) -> NaiveDateTime { schedule::parse(s).unwrap() }

  fn common(name: &str, at_: &str, capacity: u32) -> Common {
    Common {
      name:     name.into(),
      venue:    "Main Hall".into(),
      at:       at(at_),
      capacity: NonZeroU32::new(capacity).unwrap(),
    }
  }

  async fn create_talk(ctx: &Context, name: &str, when: &str, capacity: u32) -> HappeningId {
    let mut out = Vec::new();
    let create = Create::Gathering {
      common:   common(name, when, capacity),
      topic:    "AI".into(),
      speakers: vec!["Dr. X".into()],
    };
    assert!(run(Command::Create(create), ctx, &mut out).await.unwrap());
    let text = String::from_utf8(out).unwrap();
    text.trim().trim_start_matches("created ").parse().unwrap()
  }

  async fn output(command: Command, ctx: &Context) -> (bool, String) {
    let mut out = Vec::new();
    let mutated = run(command, ctx, &mut out).await.unwrap();
    (mutated, String::from_utf8(out).unwrap())
  }

  #[tokio::test]
  async fn create_then_show() {
    let ctx = context(Arc::default());
    let id = create_talk(&ctx, "Tech Talk", "2030-06-01 09:30", 2).await;

    let h = ctx.catalog.find(id).unwrap();
    assert_eq!(h.lock().kind(), HappeningKind::Gathering);

    let (mutated, text) = output(Command::Show { id }, &ctx).await;
    assert!(!mutated);
    assert!(text.contains("Happening: Tech Talk"));
    assert!(text.contains("Date: 01/06/2030 09:30"));
    assert!(text.contains("- Dr. X"));
  }

  #[tokio::test]
  async fn list_sorts_by_date_and_filters() {
    let ctx = context(Arc::default());
    create_talk(&ctx, "Later", "2031-01-01 10:00", 5).await;
    create_talk(&ctx, "Sooner", "2030-01-01 10:00", 5).await;
    create_talk(&ctx, "Past", "2001-01-01 10:00", 5).await;

    let (_, all) = output(
      Command::List {
        upcoming: false,
        from:     None,
        to:       None,
      },
      &ctx,
    )
    .await;
    let order: Vec<usize> = ["Past", "Sooner", "Later"]
      .iter()
      .map(|n| all.find(n).unwrap())
      .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]));

    let (_, upcoming) = output(
      Command::List {
        upcoming: true,
        from:     None,
        to:       None,
      },
      &ctx,
    )
    .await;
    assert!(!upcoming.contains("Past"));
    assert!(upcoming.contains("Sooner"));

    let (_, window) = output(
      Command::List {
        upcoming: false,
        from:     Some(at("2029-12-31 00:00")),
        to:       Some(at("2030-12-31 00:00")),
      },
      &ctx,
    )
    .await;
    assert!(window.contains("Sooner"));
    assert_eq!(window.lines().count(), 1);
  }

  #[tokio::test]
  async fn search_reports_no_match() {
    let ctx = context(Arc::default());
    create_talk(&ctx, "Tech Talk", "2030-06-01 09:30", 2).await;

    let (_, hit) = output(Command::Search { text: "tech".into() }, &ctx).await;
    assert!(hit.contains("Tech Talk"));
    let (_, miss) = output(Command::Search { text: "opera".into() }, &ctx).await;
    assert_eq!(miss.trim(), "no happenings");
  }

  #[tokio::test]
  async fn register_confirms_through_the_transport() {
    let outbox = Arc::new(Outbox::default());
    let ctx = context(outbox.clone());
    let id = create_talk(&ctx, "Tech Talk", "2030-06-01 09:30", 1).await;

    let (mutated, _) = output(
      Command::Register {
        id,
        name: "Ada".into(),
        contact: "ada@x".into(),
        organizer: true,
      },
      &ctx,
    )
    .await;
    assert!(mutated);
    {
      let sent = outbox.sent.lock().unwrap();
      assert_eq!(sent.len(), 1);
      assert_eq!(sent[0].priority, Priority::High);
      assert!(sent[0].body.contains("you are registered for Tech Talk"));
    }

    let mut out = Vec::new();
    let err = run(
      Command::Register {
        id,
        name: "Grace".into(),
        contact: "grace@x".into(),
        organizer: false,
      },
      &ctx,
      &mut out,
    )
    .await
    .unwrap_err();
    assert!(matches!(
      err.downcast_ref::<CoreError>(),
      Some(CoreError::CapacityExceeded { .. })
    ));
    assert_eq!(outbox.sent.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn add_speaker_on_a_performance_is_refused() {
    let ctx = context(Arc::default());
    let mut out = Vec::new();
    let create = Create::Performance {
      common:    common("Test Concert", "2030-05-01 20:00", 100),
      performer: "Artiste Test".into(),
      genre:     "Rock".into(),
    };
    run(Command::Create(create), &ctx, &mut out).await.unwrap();
    let id = *ctx.catalog.snapshot().keys().next().unwrap();

    let err = run(
      Command::AddSpeaker {
        id,
        speaker: "Nobody".into(),
      },
      &ctx,
      &mut out,
    )
    .await
    .unwrap_err();
    assert!(matches!(
      err.downcast_ref::<CoreError>(),
      Some(CoreError::VariantMismatch { .. })
    ));
  }

  #[tokio::test]
  async fn unknown_ids_are_errors() {
    let ctx = context(Arc::default());
    let id = HappeningId::generate();
    let mut out = Vec::new();
    assert!(run(Command::Show { id }, &ctx, &mut out).await.is_err());
    assert!(run(Command::Remove { id }, &ctx, &mut out).await.is_err());
    assert!(run(Command::Cancel { id }, &ctx, &mut out).await.is_err());
  }

  #[tokio::test]
  async fn edits_are_reported_as_mutations() {
    let ctx = context(Arc::default());
    let id = create_talk(&ctx, "Tech Talk", "2030-06-01 09:30", 2).await;

    let (m1, _) = output(
      Command::Rename {
        id,
        name: "AI Talk".into(),
      },
      &ctx,
    )
    .await;
    let (m2, _) = output(
      Command::Reschedule {
        id,
        when: at("15/07/2030 18:00"),
      },
      &ctx,
    )
    .await;
    assert!(m1 && m2);

    let h = ctx.catalog.find(id).unwrap();
    let h = h.lock();
    assert_eq!(h.name(), "AI Talk");
    assert_eq!(schedule::display(h.scheduled_at()), "15/07/2030 18:00");
  }
}
