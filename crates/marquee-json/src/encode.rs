//! The on-disk record shapes and their conversion to and from
//! [`Happening`].
//!
//! A document is one JSON object keyed by happening id. Each entry carries a
//! `kind` tag naming its variant, the base fields in camelCase, and the
//! variant's own fields alongside them:
//!
//! ```json
//! {
//!   "5b0c…": {
//!     "kind": "performance",
//!     "id": "5b0c…",
//!     "name": "Test Concert",
//!     "scheduledAt": "2026-05-01T20:00:00",
//!     "venue": "Main Hall",
//!     "capacity": 100,
//!     "attendees": [{ "id": "…", "name": "Jean Test", "contact": "…" }],
//!     "performer": "Artiste Test",
//!     "genre": "Rock"
//!   }
//! }
//! ```

use std::{
  collections::{BTreeMap, HashSet},
  fmt,
  num::NonZeroU32,
  str::FromStr,
};

use chrono::NaiveDateTime;
use marquee_core::{
  happening::{
    Details, GatheringDetails, Happening, HappeningKind, NewHappening,
    PerformanceDetails,
  },
  id::HappeningId,
  person::Person,
};
use serde::{
  Deserialize, Deserializer, Serialize,
  de::{self, MapAccess, Visitor},
};
use serde_json::{Map, Value};

use crate::{Error, Result};

const KIND: &str = "kind";

// ─── Raw records ─────────────────────────────────────────────────────────────

/// Fields every entry has, whatever its kind.
///
/// `id` is optional on read; when present it must match the entry's key.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBase {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  id:           Option<HappeningId>,
  name:         String,
  scheduled_at: NaiveDateTime,
  venue:        String,
  capacity:     NonZeroU32,
  attendees:    Vec<Person>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawPerformance {
  #[serde(flatten)]
  base:      RawBase,
  performer: String,
  genre:     String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawGathering {
  #[serde(flatten)]
  base:     RawBase,
  topic:    String,
  speakers: Vec<String>,
}

/// What gets written. Reading dispatches on [`HappeningKind`] instead, so an
/// unknown or missing tag gets its own error.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RawEntry {
  Performance(RawPerformance),
  Gathering(RawGathering),
}

// ─── Encode ──────────────────────────────────────────────────────────────────

fn encode_entry(h: &Happening) -> RawEntry {
  let base = RawBase {
    id:           Some(h.id()),
    name:         h.name().to_owned(),
    scheduled_at: h.scheduled_at(),
    venue:        h.venue().to_owned(),
    capacity:     h.capacity(),
    attendees:    h.attendees().to_vec(),
  };
  match h.details() {
    Details::Performance(p) => RawEntry::Performance(RawPerformance {
      base,
      performer: p.performer.clone(),
      genre: p.genre.clone(),
    }),
    Details::Gathering(g) => RawEntry::Gathering(RawGathering {
      base,
      topic: g.topic.clone(),
      speakers: g.speakers.clone(),
    }),
  }
}

/// Render `happenings` as a document, entries ordered by id.
pub fn to_vec(happenings: &[&Happening], pretty: bool) -> serde_json::Result<Vec<u8>> {
  let document: BTreeMap<String, RawEntry> = happenings
    .iter()
    .map(|h| (h.id().to_string(), encode_entry(h)))
    .collect();

  if pretty {
    serde_json::to_vec_pretty(&document)
  } else {
    serde_json::to_vec(&document)
  }
}

// ─── Decode ──────────────────────────────────────────────────────────────────

/// The top-level object, in document order. A key that appears twice fails
/// the parse instead of overwriting the earlier entry.
struct Entries(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for Entries {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
      type Value = Entries;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object of happenings keyed by id")
      }

      fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Entries, A::Error> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
          if !seen.insert(key.clone()) {
            return Err(de::Error::custom(format_args!("duplicate entry {key:?}")));
          }
          entries.push((key, value));
        }
        Ok(Entries(entries))
      }
    }

    deserializer.deserialize_map(EntriesVisitor)
  }
}

fn decode_kind(key: &str, entry: &Map<String, Value>) -> Result<HappeningKind> {
  let tag = match entry.get(KIND) {
    None => return Err(Error::entry(key, "missing discriminator `kind`")),
    Some(Value::String(tag)) => tag,
    Some(other) => {
      return Err(Error::entry(
        key,
        format!("discriminator `kind` must be a string, found {other}"),
      ));
    }
  };
  HappeningKind::from_str(tag)
    .map_err(|_| Error::entry(key, format!("unknown discriminator {tag:?}")))
}

fn decode_fields<T: serde::de::DeserializeOwned>(key: &str, entry: Value) -> Result<T> {
  serde_json::from_value(entry).map_err(|e| Error::entry(key, e.to_string()))
}

fn decode_entry(key: &str, entry: Value) -> Result<Happening> {
  let id = HappeningId::from_str(key)
    .map_err(|e| Error::entry(key, format!("key is not a happening id: {e}")))?;

  let Value::Object(fields) = &entry else {
    return Err(Error::entry(key, "entry is not an object"));
  };

  let (base, details) = match decode_kind(key, fields)? {
    HappeningKind::Performance => {
      let raw: RawPerformance = decode_fields(key, entry)?;
      (
        raw.base,
        Details::Performance(PerformanceDetails {
          performer: raw.performer,
          genre:     raw.genre,
        }),
      )
    }
    HappeningKind::Gathering => {
      let raw: RawGathering = decode_fields(key, entry)?;
      (
        raw.base,
        Details::Gathering(GatheringDetails {
          topic:    raw.topic,
          speakers: raw.speakers,
        }),
      )
    }
  };

  if let Some(inner) = base.id
    && inner != id
  {
    return Err(Error::entry(
      key,
      format!("id field {inner} does not match the entry key"),
    ));
  }

  let input = NewHappening {
    name: base.name,
    scheduled_at: base.scheduled_at,
    venue: base.venue,
    capacity: base.capacity,
    details,
  };
  Ok(Happening::restore(id, input, base.attendees)?)
}

/// Rebuild every happening in `bytes`.
///
/// Entries are decoded independently; the first bad one fails the whole
/// document and is named in the error.
pub fn from_slice(bytes: &[u8]) -> Result<Vec<Happening>> {
  let Entries(entries) = serde_json::from_slice(bytes)?;
  entries
    .into_iter()
    .map(|(key, entry)| decode_entry(&key, entry))
    .collect()
}
