//! Date-time formatting and lenient parsing for happening schedules.
//!
//! Schedules are naive local date-times. The persisted form is ISO-8601
//! (chrono's serde default); humans see `dd/mm/yyyy hh:mm`.

use chrono::{NaiveDateTime, ParseResult};

/// Format used by [`display`] and [`Happening::describe`](crate::happening::Happening::describe).
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M";

const ACCEPTED: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%d %H:%M",
  DISPLAY_FORMAT,
];

pub fn display(at: NaiveDateTime) -> String { at.format(DISPLAY_FORMAT).to_string() }

/// Parse `input` in any of the accepted layouts (ISO-8601 with `T` or a
/// space, with or without seconds, or `dd/mm/yyyy hh:mm`). The error is the
/// one from the last layout tried.
pub fn parse(input: &str) -> ParseResult<NaiveDateTime> {
  let input = input.trim();
  ACCEPTED[1..].iter().fold(
    NaiveDateTime::parse_from_str(input, ACCEPTED[0]),
    |parsed, layout| parsed.or_else(|_| NaiveDateTime::parse_from_str(input, layout)),
  )
}
