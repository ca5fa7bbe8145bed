// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Parse spreadsheet timestamp cells using a fixed, ordered list of formats
// role: parsing/dates
// inputs: Raw cell text
// outputs: Option<NaiveDateTime>; hour deltas between two timestamps
// invariants:
// - Formats are attempted in TICKET_DATE_FORMATS order; the first clean parse wins
// - Four-digit-year formats reject years below 1000 so two-digit years reach the %y format
// - Pure: no logging, no clock
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Ordered formats for ticket timestamp cells. The first three are the sheet's
/// documented "M/D/Y T(24)" shapes plus ISO; the last two cover older exports.
pub const TICKET_DATE_FORMATS: [&str; 5] = [
  "%m/%d/%Y %H:%M:%S",
  "%m/%d/%Y %H:%M",
  "%Y-%m-%d %H:%M:%S",
  "%m/%d/%y %H:%M",
  "%Y-%m-%d",
];

/// Parse one timestamp cell. Empty or unparseable text yields `None`.
pub fn parse_ticket_timestamp(raw: &str) -> Option<NaiveDateTime> {
  let s = raw.trim();
  if s.is_empty() {
    return None;
  }

  TICKET_DATE_FORMATS.iter().find_map(|fmt| parse_with(s, fmt))
}

fn parse_with(s: &str, fmt: &str) -> Option<NaiveDateTime> {
  let parsed = if fmt.contains("%H") {
    NaiveDateTime::parse_from_str(s, fmt).ok()?
  } else {
    NaiveDate::parse_from_str(s, fmt).ok()?.and_hms_opt(0, 0, 0)?
  };

  if fmt.contains("%Y") && parsed.year() < 1000 {
    return None;
  }

  Some(parsed)
}

/// Signed hours from `start` to `end`.
pub fn hours_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
  (end - start).num_seconds() as f64 / 3600.0
}
